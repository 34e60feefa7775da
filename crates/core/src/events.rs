//! Status events and the bounded channel that carries them to the shell.

use std::fmt;
use std::time::Duration;

use chrono::{DateTime, Local};
use crossbeam_channel::{Receiver, Sender, TrySendError};

use crate::logger;

/// Default capacity of the status channel.
pub const DEFAULT_CAPACITY: usize = 256;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Info,
    Success,
    Warning,
    Error,
}

impl Level {
    pub fn as_str(self) -> &'static str {
        match self {
            Level::Info => "INFO",
            Level::Success => "OK",
            Level::Warning => "WARN",
            Level::Error => "ERROR",
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone)]
pub struct StatusEvent {
    pub timestamp: DateTime<Local>,
    pub message: String,
    pub level: Level,
}

impl StatusEvent {
    pub fn new(level: Level, message: impl Into<String>) -> Self {
        Self { timestamp: Local::now(), message: message.into(), level }
    }

    pub fn time(&self) -> String {
        self.timestamp.format("%H:%M:%S").to_string()
    }
}

/// Create a status channel holding at most `capacity` undelivered events.
pub fn channel(capacity: usize) -> (EventSink, EventStream) {
    let (tx, rx) = crossbeam_channel::bounded(capacity.max(1));
    (EventSink { tx, rx: rx.clone() }, EventStream { rx })
}

/// Producer side. Never blocks: when the buffer is full the oldest event is
/// discarded to make room.
#[derive(Clone)]
pub struct EventSink {
    tx: Sender<StatusEvent>,
    // Held so the sink can evict from a full buffer.
    rx: Receiver<StatusEvent>,
}

impl EventSink {
    pub fn emit(&self, event: StatusEvent) {
        logger::write_event(&event);
        let mut event = event;
        loop {
            match self.tx.try_send(event) {
                Ok(()) | Err(TrySendError::Disconnected(_)) => return,
                Err(TrySendError::Full(back)) => {
                    let _ = self.rx.try_recv();
                    event = back;
                }
            }
        }
    }

    pub fn info(&self, msg: impl Into<String>) {
        self.emit(StatusEvent::new(Level::Info, msg));
    }

    pub fn success(&self, msg: impl Into<String>) {
        self.emit(StatusEvent::new(Level::Success, msg));
    }

    pub fn warn(&self, msg: impl Into<String>) {
        self.emit(StatusEvent::new(Level::Warning, msg));
    }

    pub fn error(&self, msg: impl Into<String>) {
        self.emit(StatusEvent::new(Level::Error, msg));
    }
}

/// Consumer side, drained by the shell.
#[derive(Clone)]
pub struct EventStream {
    rx: Receiver<StatusEvent>,
}

impl EventStream {
    /// Everything currently buffered, oldest first.
    pub fn drain(&self) -> Vec<StatusEvent> {
        self.rx.try_iter().collect()
    }

    pub fn recv_timeout(&self, timeout: Duration) -> Option<StatusEvent> {
        self.rx.recv_timeout(timeout).ok()
    }

    pub fn is_empty(&self) -> bool {
        self.rx.is_empty()
    }
}
