use std::collections::VecDeque;
use std::path::PathBuf;

use seeker_core::controller::Controller;
use seeker_core::events::{EventStream, Level, StatusEvent};
use seeker_core::logger;
use seeker_core::settings::{Config, FIELDS};

use crate::confirm::ConfirmDialog;

/// Number of status lines kept for the log panel.
pub const MAX_LOGS: usize = 200;

pub struct App {
    pub controller: Controller,
    pub events: EventStream,
    pub config: Config,
    pub config_path: PathBuf,
    pub selected: usize,
    pub editing: Option<String>,
    pub log_visible: bool,
    pub log_messages: VecDeque<StatusEvent>,
    pub log_scroll: usize, // scroll offset from bottom (0 = latest)
    pub confirm: Option<ConfirmDialog>,
    pub should_quit: bool,
}

impl App {
    pub fn new(controller: Controller, events: EventStream, config: Config, config_path: PathBuf) -> Self {
        Self {
            controller,
            events,
            config,
            config_path,
            selected: 0,
            editing: None,
            log_visible: true,
            log_messages: VecDeque::with_capacity(MAX_LOGS),
            log_scroll: 0,
            confirm: None,
            should_quit: false,
        }
    }

    pub fn drain_logs(&mut self) {
        self.controller.reap();
        for ev in self.events.drain() {
            self.push_log(ev);
        }
    }

    fn push_log(&mut self, ev: StatusEvent) {
        if self.log_messages.len() == MAX_LOGS {
            self.log_messages.pop_front();
        }
        self.log_messages.push_back(ev);
    }

    /// Shell-side message shown in the log panel next to automation events.
    pub fn note(&mut self, level: Level, msg: impl Into<String>) {
        let ev = StatusEvent::new(level, msg);
        logger::write_event(&ev);
        self.push_log(ev);
    }

    pub fn scroll_log_up(&mut self, n: usize) {
        self.log_scroll = self.log_scroll.saturating_add(n);
    }

    pub fn scroll_log_down(&mut self, n: usize) {
        self.log_scroll = self.log_scroll.saturating_sub(n);
    }

    pub fn move_up(&mut self) {
        if self.selected > 0 {
            self.selected -= 1;
        }
    }

    pub fn move_down(&mut self) {
        if self.selected + 1 < FIELDS.len() {
            self.selected += 1;
        }
    }

    pub fn selected_field(&self) -> &'static str {
        FIELDS[self.selected]
    }

    pub fn begin_edit(&mut self) {
        if self.controller.is_running() {
            self.note(Level::Warning, "stop automation before editing settings");
            return;
        }
        self.editing = Some(self.config.field(self.selected_field()).unwrap_or_default());
    }

    pub fn edit_push(&mut self, c: char) {
        if let Some(buf) = self.editing.as_mut() {
            buf.push(c);
        }
    }

    pub fn edit_pop(&mut self) {
        if let Some(buf) = self.editing.as_mut() {
            buf.pop();
        }
    }

    pub fn cancel_edit(&mut self) {
        self.editing = None;
    }

    /// Apply the edit buffer to the selected field and save the config file.
    pub fn commit_edit(&mut self) {
        let Some(text) = self.editing.take() else { return };
        let field = self.selected_field();
        let mut next = self.config.clone();
        if let Err(e) = next.set_field(field, &text) {
            self.note(Level::Error, e.to_string());
            return;
        }
        if let Err(e) = next.validate() {
            self.note(Level::Error, e.to_string());
            return;
        }
        self.config = next;
        match self.config.save(&self.config_path) {
            Ok(()) => {
                let value = self.config.field(field).unwrap_or_default();
                self.note(Level::Info, format!("{} = {}", field, value));
            }
            Err(e) => self.note(
                Level::Error,
                format!("failed to save {}: {}", self.config_path.display(), e),
            ),
        }
    }

    pub fn start_stop(&mut self) {
        let result = if self.controller.is_running() {
            self.controller.stop()
        } else {
            for path in self.config.missing_images() {
                let msg = format!("image file {} does not exist", path.display());
                self.note(Level::Warning, msg);
            }
            self.controller.start(self.config.clone())
        };
        if let Err(e) = result {
            let level = if e.is_benign() { Level::Info } else { Level::Error };
            self.note(level, e.to_string());
        }
    }

    pub fn toggle_log(&mut self) {
        self.log_visible = !self.log_visible;
    }

    pub fn request_quit(&mut self) {
        if self.controller.is_running() {
            self.confirm = Some(ConfirmDialog::new("Automation is running. Stop and quit?"));
        } else {
            self.quit();
        }
    }

    pub fn answer_confirm(&mut self, yes: bool) {
        if self.confirm.take().is_some() && yes {
            self.quit();
        }
    }

    pub fn quit(&mut self) {
        if self.controller.is_running() {
            self.controller.stop().ok();
        }
        self.controller.join_retired();
        self.should_quit = true;
    }
}
