use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::types::Rgb;

/// Automation settings, persisted as `config.json`.
///
/// `color_x2` is carried for file compatibility only; sampling scans the
/// single column `color_x1`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub color_x1: i32,
    pub color_y1: i32,
    pub color_x2: i32,
    pub color_y2: i32,
    pub target_color: u32,
    pub shade_variation: u32,
    pub good_image_path: PathBuf,
    pub bad_image_path: PathBuf,
    pub loop_delay_seconds: f64,
    pub match_threshold: f64,
    pub search_scale: u32,
    pub refine_radius: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            color_x1: 11,
            color_y1: 420,
            color_x2: 11,
            color_y2: 440,
            target_color: 0x77604B,
            shade_variation: 10,
            good_image_path: PathBuf::from("Good.png"),
            bad_image_path: PathBuf::from("bad.png"),
            loop_delay_seconds: 1.0,
            match_threshold: 0.80,
            search_scale: 16,
            refine_radius: 24,
        }
    }
}

/// Fields editable through `Config::set_field`, in display order.
pub const FIELDS: &[&str] = &[
    "color_x1",
    "color_x2",
    "color_y1",
    "color_y2",
    "target_color",
    "shade_variation",
    "good_image_path",
    "bad_image_path",
    "loop_delay_seconds",
    "match_threshold",
    "search_scale",
    "refine_radius",
];

impl Config {
    /// Read the config file. A missing or malformed file yields the defaults
    /// together with the reason they were used.
    pub fn load(path: &Path) -> (Self, Option<String>) {
        let text = match std::fs::read_to_string(path) {
            Ok(t) => t,
            Err(e) => return (Self::default(), Some(format!("{}: {}", path.display(), e))),
        };
        match serde_json::from_str::<Config>(&text) {
            Ok(cfg) => match cfg.validate() {
                Ok(()) => (cfg, None),
                Err(e) => (Self::default(), Some(e.to_string())),
            },
            Err(e) => (Self::default(), Some(format!("{}: {}", path.display(), e))),
        }
    }

    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    pub fn target(&self) -> Rgb {
        Rgb::from_hex(self.target_color)
    }

    pub fn validate(&self) -> Result<()> {
        if self.color_y1 > self.color_y2 {
            return Err(Error::ConfigInvalid(format!(
                "color_y1 ({}) is greater than color_y2 ({})",
                self.color_y1, self.color_y2
            )));
        }
        if self.target_color > 0xFF_FFFF {
            return Err(Error::ConfigInvalid(format!(
                "target_color {:#X} is not a 24-bit color",
                self.target_color
            )));
        }
        if !(0.0..=1.0).contains(&self.match_threshold) {
            return Err(Error::ConfigInvalid(format!(
                "match_threshold {} is outside 0..=1",
                self.match_threshold
            )));
        }
        if !(self.loop_delay_seconds > 0.0) || !self.loop_delay_seconds.is_finite() {
            return Err(Error::ConfigInvalid(format!(
                "loop_delay_seconds must be positive, got {}",
                self.loop_delay_seconds
            )));
        }
        if self.search_scale == 0 {
            return Err(Error::ConfigInvalid("search_scale must be at least 1".into()));
        }
        if self.good_image_path.as_os_str().is_empty() || self.bad_image_path.as_os_str().is_empty() {
            return Err(Error::ConfigInvalid("image paths must not be empty".into()));
        }
        Ok(())
    }

    /// Current value of a field, formatted the way `set_field` accepts it.
    pub fn field(&self, name: &str) -> Option<String> {
        let v = match name {
            "color_x1" => self.color_x1.to_string(),
            "color_x2" => self.color_x2.to_string(),
            "color_y1" => self.color_y1.to_string(),
            "color_y2" => self.color_y2.to_string(),
            "target_color" => format!("{:06X}", self.target_color),
            "shade_variation" => self.shade_variation.to_string(),
            "good_image_path" => self.good_image_path.display().to_string(),
            "bad_image_path" => self.bad_image_path.display().to_string(),
            "loop_delay_seconds" => self.loop_delay_seconds.to_string(),
            "match_threshold" => format!("{:.0}", self.match_threshold * 100.0),
            "search_scale" => self.search_scale.to_string(),
            "refine_radius" => self.refine_radius.to_string(),
            _ => return None,
        };
        Some(v)
    }

    /// Parse user input into a field. The threshold is entered in percent
    /// and clamped to 0..=100.
    pub fn set_field(&mut self, name: &str, text: &str) -> Result<()> {
        let text = text.trim();
        match name {
            "color_x1" => self.color_x1 = parse_int(name, text)?,
            "color_x2" => self.color_x2 = parse_int(name, text)?,
            "color_y1" => self.color_y1 = parse_int(name, text)?,
            "color_y2" => self.color_y2 = parse_int(name, text)?,
            "target_color" => self.target_color = parse_hex_color(text)?,
            "shade_variation" => self.shade_variation = parse_int(name, text)?,
            "good_image_path" => self.good_image_path = parse_path(name, text)?,
            "bad_image_path" => self.bad_image_path = parse_path(name, text)?,
            "loop_delay_seconds" => {
                let secs: f64 = parse_num(name, text)?;
                if !(secs > 0.0) || !secs.is_finite() {
                    return Err(Error::ConfigInvalid(format!("{name} must be positive")));
                }
                self.loop_delay_seconds = secs;
            }
            "match_threshold" => {
                let pct: f64 = parse_num(name, text)?;
                if pct.is_nan() {
                    return Err(Error::ConfigInvalid(format!("{name}: not a number")));
                }
                self.match_threshold = (pct / 100.0).clamp(0.0, 1.0);
            }
            "search_scale" => {
                let stride: u32 = parse_int(name, text)?;
                if stride == 0 {
                    return Err(Error::ConfigInvalid(format!("{name} must be at least 1")));
                }
                self.search_scale = stride;
            }
            "refine_radius" => self.refine_radius = parse_int(name, text)?,
            _ => return Err(Error::ConfigInvalid(format!("unknown field '{name}'"))),
        }
        Ok(())
    }

    /// Human-readable description of the active settings, one line each.
    pub fn summary(&self) -> Vec<String> {
        vec![
            format!(
                "search region: X={}-{}, Y={}-{} (sampling column X={})",
                self.color_x1, self.color_x2, self.color_y1, self.color_y2, self.color_x1
            ),
            format!("target color: {} (tolerance ±{})", self.target(), self.shade_variation),
            format!(
                "images: good={}, bad={}",
                self.good_image_path.display(),
                self.bad_image_path.display()
            ),
            format!(
                "delay: {}s, match threshold: {:.0}%, stride {}, refine radius {}",
                self.loop_delay_seconds,
                self.match_threshold * 100.0,
                self.search_scale,
                self.refine_radius
            ),
        ]
    }

    /// Image paths that do not exist on disk.
    pub fn missing_images(&self) -> Vec<PathBuf> {
        [&self.good_image_path, &self.bad_image_path]
            .into_iter()
            .filter(|p| !p.is_file())
            .cloned()
            .collect()
    }
}

/// Accepts `77604B`, `#77604B` and `0x77604B`.
pub fn parse_hex_color(text: &str) -> Result<u32> {
    let hex = text.trim();
    let hex = hex
        .strip_prefix('#')
        .or_else(|| hex.strip_prefix("0x"))
        .or_else(|| hex.strip_prefix("0X"))
        .unwrap_or(hex);
    if hex.is_empty() || hex.len() > 6 {
        return Err(Error::ConfigInvalid(format!("'{text}' is not a RRGGBB color")));
    }
    u32::from_str_radix(hex, 16)
        .map_err(|_| Error::ConfigInvalid(format!("'{text}' is not a RRGGBB color")))
}

fn parse_int<T: std::str::FromStr>(name: &str, text: &str) -> Result<T> {
    text.parse()
        .map_err(|_| Error::ConfigInvalid(format!("{name}: '{text}' is not a valid integer")))
}

fn parse_num(name: &str, text: &str) -> Result<f64> {
    text.parse()
        .map_err(|_| Error::ConfigInvalid(format!("{name}: '{text}' is not a number")))
}

fn parse_path(name: &str, text: &str) -> Result<PathBuf> {
    if text.is_empty() {
        return Err(Error::ConfigInvalid(format!("{name} must not be empty")));
    }
    Ok(PathBuf::from(text))
}
