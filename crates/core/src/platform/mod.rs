pub mod desktop;
pub mod stub;

use std::sync::Arc;

use crate::error::Result;
use crate::logger;
use crate::types::Frame;

/// OS capabilities the automation loop depends on.
///
/// Implementations are created on the thread that uses them, so they need
/// not be `Send`.
pub trait Platform {
    fn name(&self) -> &str;
    /// Capture the full bounds of display `index` (0 = primary).
    fn capture_display(&mut self, index: usize) -> Result<Frame>;
    /// Move the pointer to absolute screen coordinates.
    fn move_cursor(&mut self, x: i32, y: i32) -> Result<()>;
    /// Single primary-button click at the current pointer position.
    fn click(&mut self) -> Result<()>;
}

/// Builds a fresh platform on the automation thread.
pub type PlatformFactory = Arc<dyn Fn() -> Result<Box<dyn Platform>> + Send + Sync>;

/// Create the platform appropriate for the current OS.
pub fn create_platform(force_stub: bool) -> Result<Box<dyn Platform>> {
    if force_stub {
        logger::info_p("stub", "using synthetic platform");
        return Ok(Box::new(stub::StubPlatform::new()));
    }
    logger::info_p("desktop", "using desktop capture and input");
    Ok(Box::new(desktop::DesktopPlatform::new()))
}

pub fn platform_factory(force_stub: bool) -> PlatformFactory {
    Arc::new(move || create_platform(force_stub))
}
