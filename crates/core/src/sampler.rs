//! Single-column color probe.

use crate::settings::Config;
use crate::types::{Frame, Rgb};

/// True when every channel of `p` is within `tolerance` of `q`.
pub fn color_match(p: Rgb, q: Rgb, tolerance: u32) -> bool {
    let near = |a: u8, b: u8| (a as i32 - b as i32).unsigned_abs() <= tolerance;
    near(p.r, q.r) && near(p.g, q.g) && near(p.b, q.b)
}

/// Scan column `color_x1` from `color_y1` to `color_y2` inclusive and return
/// the first row whose pixel matches the target color. Rows outside the frame
/// are skipped.
pub fn find_color(frame: &Frame, config: &Config) -> Option<i32> {
    let target = config.target();
    let x = config.color_x1;
    (config.color_y1..=config.color_y2).find(|&y| {
        frame
            .get(x, y)
            .is_some_and(|px| color_match(px, target, config.shade_variation))
    })
}
