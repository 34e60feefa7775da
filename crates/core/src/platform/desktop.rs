use enigo::{Button, Coordinate, Direction, Enigo, Mouse, Settings};
use xcap::Monitor;

use crate::error::{Error, Result};
use crate::logger;
use crate::types::{Frame, Point};
use super::Platform;

/// Real display capture (xcap) and pointer input (enigo).
pub struct DesktopPlatform {
    enigo: Option<Enigo>,
}

impl DesktopPlatform {
    pub fn new() -> Self {
        Self { enigo: None }
    }

    fn enigo(&mut self) -> Result<&mut Enigo> {
        if self.enigo.is_none() {
            let enigo = Enigo::new(&Settings::default())
                .map_err(|e| Error::InputFailed(format!("cannot open input connection: {}", e)))?;
            self.enigo = Some(enigo);
        }
        self.enigo
            .as_mut()
            .ok_or_else(|| Error::InputFailed("input connection unavailable".into()))
    }
}

impl Default for DesktopPlatform {
    fn default() -> Self {
        Self::new()
    }
}

fn capture_err(e: impl std::fmt::Display) -> Error {
    Error::CaptureFailed(e.to_string())
}

/// Display `index`, where 0 prefers the primary monitor.
fn select_monitor(index: usize) -> Result<Monitor> {
    let monitors = Monitor::all().map_err(capture_err)?;
    let pos = if index == 0 {
        match monitors.iter().position(|m| m.is_primary().unwrap_or(false)) {
            Some(p) => p,
            None => {
                logger::warn_p("desktop", "no primary display reported, using the first");
                0
            }
        }
    } else {
        index
    };
    monitors
        .into_iter()
        .nth(pos)
        .ok_or_else(|| Error::CaptureFailed(format!("no display {}", index)))
}

impl Platform for DesktopPlatform {
    fn name(&self) -> &str {
        "desktop"
    }

    fn capture_display(&mut self, index: usize) -> Result<Frame> {
        let monitor = select_monitor(index)?;
        let origin = Point::new(monitor.x().map_err(capture_err)?, monitor.y().map_err(capture_err)?);
        let image = monitor.capture_image().map_err(capture_err)?;
        let (w, h) = (image.width(), image.height());
        Ok(Frame::from_rgba(w, h, image.as_raw()).with_origin(origin))
    }

    fn move_cursor(&mut self, x: i32, y: i32) -> Result<()> {
        self.enigo()?
            .move_mouse(x, y, Coordinate::Abs)
            .map_err(|e| Error::InputFailed(e.to_string()))
    }

    fn click(&mut self) -> Result<()> {
        self.enigo()?
            .button(Button::Left, Direction::Click)
            .map_err(|e| {
                logger::error_p("desktop", &format!("click failed: {}", e));
                Error::InputFailed(e.to_string())
            })
    }
}
