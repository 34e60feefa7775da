//! Coarse-to-fine template search by summed absolute pixel difference.
//!
//! The coarse pass samples every `stride`-th position in both axes; the
//! refinement pass then visits every position within `radius` of the coarse
//! winner. Ties keep the first position in row-major order, and the refined
//! result is only taken when it strictly beats the coarse one.

use std::ops::RangeInclusive;
use std::path::Path;

use crate::error::{Error, Result};
use crate::types::{Frame, MatchResult, Point};

/// Decode an image file into an RGB frame.
pub fn load_template(path: &Path) -> Result<Frame> {
    let img = image::open(path).map_err(|e| Error::ImageDecodeFailed {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;
    let rgb = img.to_rgb8();
    let (w, h) = rgb.dimensions();
    Ok(Frame::new(w, h, rgb.into_raw()))
}

/// Similarity of `template` against the equally-sized region of `frame` whose
/// top-left is (x, y): `1 - diff / (w * h * 3 * 255)`.
///
/// The region must lie inside the frame.
pub fn similarity(frame: &Frame, template: &Frame, x: u32, y: u32) -> f64 {
    let mut diff: u64 = 0;
    for ty in 0..template.height {
        let a = frame.span(x, y + ty, template.width);
        let b = template.span(0, ty, template.width);
        diff += a
            .iter()
            .zip(b)
            .map(|(&p, &q)| p.abs_diff(q) as u64)
            .sum::<u64>();
    }
    let max = template.width as u64 * template.height as u64 * 3 * 255;
    1.0 - diff as f64 / max as f64
}

/// Find the best placement of `template` in `frame`.
pub fn locate(frame: &Frame, template: &Frame, coarse_stride: u32, refine_radius: u32) -> Result<MatchResult> {
    if template.width == 0 || template.height == 0 {
        return Err(Error::EmptyTemplate);
    }
    if template.width > frame.width || template.height > frame.height {
        return Err(Error::TemplateTooLarge {
            template_w: template.width,
            template_h: template.height,
            frame_w: frame.width,
            frame_h: frame.height,
        });
    }

    let max_x = frame.width - template.width;
    let max_y = frame.height - template.height;
    let mut search = Search { frame, template, comparisons: 0 };

    let (coarse_pos, coarse_score) = search.best(0..=max_x, 0..=max_y, coarse_stride.max(1));

    let (cx, cy) = (coarse_pos.x as u32, coarse_pos.y as u32);
    let xs = cx.saturating_sub(refine_radius)..=cx.saturating_add(refine_radius).min(max_x);
    let ys = cy.saturating_sub(refine_radius)..=cy.saturating_add(refine_radius).min(max_y);
    let (fine_pos, fine_score) = search.best(xs, ys, 1);

    let (position, score) = if fine_score > coarse_score {
        (fine_pos, fine_score)
    } else {
        (coarse_pos, coarse_score)
    };

    Ok(MatchResult {
        position,
        score,
        coarse_score,
        comparisons: search.comparisons,
    })
}

/// Center of a match in screen space.
pub fn click_point(frame: &Frame, template: &Frame, m: &MatchResult) -> Point {
    frame.origin.offset(
        m.position.x + (template.width / 2) as i32,
        m.position.y + (template.height / 2) as i32,
    )
}

struct Search<'a> {
    frame: &'a Frame,
    template: &'a Frame,
    comparisons: usize,
}

impl Search<'_> {
    fn best(&mut self, xs: RangeInclusive<u32>, ys: RangeInclusive<u32>, step: u32) -> (Point, f64) {
        let mut best_pos = Point::new(*xs.start() as i32, *ys.start() as i32);
        let mut best_score = -1.0;
        for y in ys.step_by(step as usize) {
            for x in xs.clone().step_by(step as usize) {
                let score = similarity(self.frame, self.template, x, y);
                self.comparisons += 1;
                if score > best_score {
                    best_score = score;
                    best_pos = Point::new(x as i32, y as i32);
                }
            }
        }
        (best_pos, best_score)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Rgb;

    /// Deterministic texture with no repeating blocks.
    fn noise_frame(w: u32, h: u32) -> Frame {
        let mut f = Frame::filled(w, h, Rgb::default());
        for y in 0..h {
            for x in 0..w {
                let mut v = (x as u64).wrapping_mul(0x9E37_79B9_7F4A_7C15) ^ (y as u64).wrapping_mul(0xC2B2_AE3D_27D4_EB4F);
                v ^= v >> 29;
                v = v.wrapping_mul(0xBF58_476D_1CE4_E5B9);
                v ^= v >> 32;
                f.set(x, y, Rgb::new(v as u8, (v >> 8) as u8, (v >> 16) as u8));
            }
        }
        f
    }

    fn crop(frame: &Frame, x: u32, y: u32, w: u32, h: u32) -> Frame {
        let mut out = Frame::filled(w, h, Rgb::default());
        for ty in 0..h {
            for tx in 0..w {
                out.set(tx, ty, frame.pixel(x + tx, y + ty));
            }
        }
        out
    }

    #[test]
    fn test_similarity_extremes() {
        let black = Frame::filled(4, 4, Rgb::new(0, 0, 0));
        let white = Frame::filled(4, 4, Rgb::new(255, 255, 255));
        assert_eq!(similarity(&black, &black, 0, 0), 1.0);
        assert_eq!(similarity(&black, &white, 0, 0), 0.0);

        let gray = Frame::filled(4, 4, Rgb::new(51, 51, 51));
        assert!((similarity(&black, &gray, 0, 0) - 0.8).abs() < 1e-12);
    }

    #[test]
    fn test_exact_copy_recovered_for_dividing_strides() {
        let frame = noise_frame(200, 160);
        let template = crop(&frame, 40, 60, 24, 16);
        for stride in [1, 2, 4, 5, 10, 20] {
            for radius in [stride, stride * 2] {
                let m = locate(&frame, &template, stride, radius).unwrap();
                assert_eq!(m.position, Point::new(40, 60), "stride {stride} radius {radius}");
                assert_eq!(m.score, 1.0);
            }
        }
    }

    #[test]
    fn test_refinement_finds_off_grid_match() {
        let mut frame = Frame::filled(160, 120, Rgb::new(10, 10, 10));
        let mut patch = Frame::filled(20, 20, Rgb::new(240, 200, 40));
        patch.set(5, 5, Rgb::new(0, 0, 255));
        frame.blit(&patch, 37, 53);

        let m = locate(&frame, &patch, 16, 24).unwrap();
        assert_eq!(m.position, Point::new(37, 53));
        assert_eq!(m.score, 1.0);
        assert!(m.coarse_score < 1.0);
    }

    #[test]
    fn test_refinement_never_regresses() {
        let frame = noise_frame(90, 70);
        let template = crop(&frame, 13, 29, 11, 9);
        for stride in [1, 3, 7, 16, 50] {
            for radius in [0, 1, 5, 24] {
                let m = locate(&frame, &template, stride, radius).unwrap();
                assert!(m.score >= m.coarse_score, "stride {stride} radius {radius}");
                assert!((0.0..=1.0).contains(&m.score));
            }
        }
    }

    #[test]
    fn test_ties_keep_first_in_scan_order() {
        let frame = Frame::filled(30, 20, Rgb::new(7, 7, 7));
        let template = Frame::filled(5, 5, Rgb::new(7, 7, 7));
        let m = locate(&frame, &template, 4, 3).unwrap();
        assert_eq!(m.position, Point::new(0, 0));
        assert_eq!(m.score, 1.0);
    }

    #[test]
    fn test_template_too_large() {
        let frame = Frame::filled(5, 10, Rgb::default());
        let wide = Frame::filled(6, 2, Rgb::default());
        let tall = Frame::filled(2, 11, Rgb::default());
        assert!(matches!(locate(&frame, &wide, 1, 1), Err(Error::TemplateTooLarge { .. })));
        assert!(matches!(locate(&frame, &tall, 1, 1), Err(Error::TemplateTooLarge { .. })));
    }

    #[test]
    fn test_template_same_size_as_frame() {
        let frame = noise_frame(8, 6);
        let m = locate(&frame, &frame.clone(), 16, 24).unwrap();
        assert_eq!(m.position, Point::new(0, 0));
        assert_eq!(m.score, 1.0);
        assert_eq!(m.comparisons, 2);
    }

    #[test]
    fn test_empty_template() {
        let frame = Frame::filled(5, 5, Rgb::default());
        let empty = Frame::new(0, 0, Vec::new());
        assert!(matches!(locate(&frame, &empty, 1, 1), Err(Error::EmptyTemplate)));
    }

    #[test]
    fn test_click_point_uses_center_and_origin() {
        let frame = Frame::filled(100, 100, Rgb::default()).with_origin(Point::new(1920, 0));
        let template = Frame::filled(10, 6, Rgb::default());
        let m = MatchResult { position: Point::new(40, 60), score: 1.0, coarse_score: 1.0, comparisons: 1 };
        assert_eq!(click_point(&frame, &template, &m), Point::new(1965, 63));
    }

    #[test]
    fn test_load_template() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("t.png");
        let img = image::RgbImage::from_fn(3, 2, |x, y| image::Rgb([x as u8 * 10, y as u8 * 20, 7]));
        img.save(&path).unwrap();

        let frame = load_template(&path).unwrap();
        assert_eq!((frame.width, frame.height), (3, 2));
        assert_eq!(frame.pixel(2, 1), Rgb::new(20, 20, 7));
        assert_eq!(frame.origin, Point::default());
    }

    #[test]
    fn test_load_template_failures() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing.png");
        assert!(matches!(load_template(&missing), Err(Error::ImageDecodeFailed { .. })));

        let garbage = dir.path().join("garbage.png");
        std::fs::write(&garbage, b"definitely not a png").unwrap();
        assert!(matches!(load_template(&garbage), Err(Error::ImageDecodeFailed { .. })));
    }
}
