use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::Path;
use std::sync::{Mutex, OnceLock};

use chrono::Local;

use crate::events::StatusEvent;

static LOGGER: OnceLock<Mutex<Logger>> = OnceLock::new();

struct Logger {
    file: File,
}

/// Initialize the global file logger. Clears the log file.
///
/// Calls before `init` (and in tests) are silently dropped.
pub fn init(log_dir: &Path) -> anyhow::Result<()> {
    fs::create_dir_all(log_dir)?;
    let log_path = log_dir.join("app.log");
    let file = OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(true)
        .open(&log_path)?;

    LOGGER.set(Mutex::new(Logger { file })).ok();
    Ok(())
}

fn write_log(level: &str, prefix: &str, ts: &str, msg: &str) {
    let line = if prefix.is_empty() {
        format!("[{}] [{}] {}", ts, level, msg)
    } else {
        format!("[{}] [{}] [{}] {}", ts, level, prefix, msg)
    };

    if let Some(logger) = LOGGER.get() {
        if let Ok(mut l) = logger.lock() {
            writeln!(l.file, "{}", line).ok();
        }
    }
}

fn now() -> String {
    Local::now().format("%H:%M:%S").to_string()
}

/// Mirror a status event into the log file.
pub fn write_event(event: &StatusEvent) {
    write_log(event.level.as_str(), "status", &event.time(), &event.message);
}

pub fn info(msg: &str) {
    write_log("INFO", "", &now(), msg);
}

pub fn warn(msg: &str) {
    write_log("WARN", "", &now(), msg);
}

pub fn error(msg: &str) {
    write_log("ERROR", "", &now(), msg);
}

pub fn info_p(prefix: &str, msg: &str) {
    write_log("INFO", prefix, &now(), msg);
}

pub fn warn_p(prefix: &str, msg: &str) {
    write_log("WARN", prefix, &now(), msg);
}

pub fn error_p(prefix: &str, msg: &str) {
    write_log("ERROR", prefix, &now(), msg);
}
