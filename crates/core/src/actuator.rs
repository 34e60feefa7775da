use crate::error::Result;
use crate::platform::Platform;
use crate::sleep;
use crate::types::Point;

/// Pause between moving the pointer and clicking.
pub const SETTLE_MS: u64 = 50;

/// Move the pointer to `point`, let it settle, then click once.
pub fn move_and_click(platform: &mut dyn Platform, point: Point) -> Result<()> {
    platform.move_cursor(point.x, point.y)?;
    sleep::sleep_ms(SETTLE_MS);
    platform.click()
}
