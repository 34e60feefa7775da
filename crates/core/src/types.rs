use std::fmt;

/// 24-bit color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// `0xRRGGBB` -> Rgb. Bits above 24 are ignored.
    pub const fn from_hex(hex: u32) -> Self {
        Self {
            r: ((hex >> 16) & 0xFF) as u8,
            g: ((hex >> 8) & 0xFF) as u8,
            b: (hex & 0xFF) as u8,
        }
    }

    pub const fn to_hex(self) -> u32 {
        ((self.r as u32) << 16) | ((self.g as u32) << 8) | self.b as u32
    }
}

impl fmt::Display for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:06X}", self.to_hex())
    }
}

/// Screen or frame-local coordinate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    pub const fn offset(self, dx: i32, dy: i32) -> Self {
        Self { x: self.x + dx, y: self.y + dy }
    }
}

/// One still image of the display (or a decoded template), packed RGB.
#[derive(Debug, Clone)]
pub struct Frame {
    pub data: Vec<u8>,
    pub width: u32,
    pub height: u32,
    /// Screen-space position of pixel (0, 0). Zero for decoded templates.
    pub origin: Point,
}

impl Frame {
    /// Wrap packed RGB bytes. `data` must hold `width * height * 3` bytes.
    pub fn new(width: u32, height: u32, data: Vec<u8>) -> Self {
        debug_assert_eq!(data.len(), width as usize * height as usize * 3);
        Self { data, width, height, origin: Point::default() }
    }

    pub fn filled(width: u32, height: u32, color: Rgb) -> Self {
        let data = [color.r, color.g, color.b].repeat(width as usize * height as usize);
        Self::new(width, height, data)
    }

    /// Drop the alpha channel of an RGBA buffer.
    pub fn from_rgba(width: u32, height: u32, rgba: &[u8]) -> Self {
        let data = rgba
            .chunks_exact(4)
            .flat_map(|px| [px[0], px[1], px[2]])
            .collect();
        Self::new(width, height, data)
    }

    pub fn with_origin(mut self, origin: Point) -> Self {
        self.origin = origin;
        self
    }

    /// Bounds-checked read; `None` outside the frame.
    pub fn get(&self, x: i32, y: i32) -> Option<Rgb> {
        if x < 0 || y < 0 || x as u32 >= self.width || y as u32 >= self.height {
            return None;
        }
        Some(self.pixel(x as u32, y as u32))
    }

    /// Unchecked read. Panics outside the frame.
    pub fn pixel(&self, x: u32, y: u32) -> Rgb {
        let i = self.index(x, y);
        Rgb::new(self.data[i], self.data[i + 1], self.data[i + 2])
    }

    pub fn set(&mut self, x: u32, y: u32, color: Rgb) {
        let i = self.index(x, y);
        self.data[i..i + 3].copy_from_slice(&[color.r, color.g, color.b]);
    }

    /// Copy `other` into this frame with its top-left at (x, y), clipped.
    pub fn blit(&mut self, other: &Frame, x: u32, y: u32) {
        if x >= self.width || y >= self.height {
            return;
        }
        let w = other.width.min(self.width.saturating_sub(x));
        let h = other.height.min(self.height.saturating_sub(y));
        for row in 0..h {
            let src = other.index(0, row);
            let dst = self.index(x, y + row);
            let len = w as usize * 3;
            self.data[dst..dst + len].copy_from_slice(&other.data[src..src + len]);
        }
    }

    /// Packed bytes of `len` pixels starting at (x, y).
    pub(crate) fn span(&self, x: u32, y: u32, len: u32) -> &[u8] {
        let i = self.index(x, y);
        &self.data[i..i + len as usize * 3]
    }

    fn index(&self, x: u32, y: u32) -> usize {
        (y as usize * self.width as usize + x as usize) * 3
    }
}

/// Best placement of a template inside a frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MatchResult {
    /// Frame-local top-left of the matched region.
    pub position: Point,
    /// Similarity in [0, 1]; 1 means pixel-identical.
    pub score: f64,
    /// Best score of the coarse pass alone.
    pub coarse_score: f64,
    /// Number of full region comparisons performed.
    pub comparisons: usize,
}

/// Controller lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RunState {
    #[default]
    Idle,
    Running,
}
