use crate::error::{Error, Result};
use crate::logger;
use crate::types::{Frame, Rgb};
use super::Platform;

const WIDTH: u32 = 1280;
const HEIGHT: u32 = 720;

/// Synthetic display for running without a desktop session. Every other
/// capture shows a `#77604B` pixel at (11, 430) so both branches of the loop
/// get exercised; input actions are only logged.
pub struct StubPlatform {
    captures: u64,
}

impl StubPlatform {
    pub fn new() -> Self {
        Self { captures: 0 }
    }
}

impl Default for StubPlatform {
    fn default() -> Self {
        Self::new()
    }
}

impl Platform for StubPlatform {
    fn name(&self) -> &str {
        "stub"
    }

    fn capture_display(&mut self, index: usize) -> Result<Frame> {
        if index != 0 {
            return Err(Error::CaptureFailed(format!("stub has no display {}", index)));
        }
        self.captures += 1;
        let mut frame = Frame::filled(WIDTH, HEIGHT, Rgb::new(0x20, 0x20, 0x24));
        if self.captures % 2 == 1 {
            frame.set(11, 430, Rgb::from_hex(0x77604B));
        }
        logger::info_p("stub", &format!("capture_display({}) #{}", index, self.captures));
        Ok(frame)
    }

    fn move_cursor(&mut self, x: i32, y: i32) -> Result<()> {
        logger::info_p("stub", &format!("move_cursor({}, {})", x, y));
        Ok(())
    }

    fn click(&mut self) -> Result<()> {
        logger::info_p("stub", "click()");
        Ok(())
    }
}
