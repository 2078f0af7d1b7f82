// Core value types shared by the gradient, the field simulator and the viewer.

use std::fmt;
use std::str::FromStr;

use num_complex::Complex64;
use serde::{Deserialize, Serialize};

/// An opaque 8-bit RGB colour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const BLACK: Rgb = Rgb::new(0, 0, 0);
    pub const WHITE: Rgb = Rgb::new(255, 255, 255);

    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Channel-wise linear blend; `t = 0` gives `self`, `t = 1` gives `other`.
    pub fn lerp(self, other: Rgb, t: f64) -> Rgb {
        let t = t.clamp(0.0, 1.0);
        let mix = |a: u8, b: u8| (a as f64 + (b as f64 - a as f64) * t).round() as u8;
        Rgb::new(mix(self.r, other.r), mix(self.g, other.g), mix(self.b, other.b))
    }

    /// Pack as 0x00RRGGBB, the layout minifb expects.
    #[inline]
    pub fn to_u32(self) -> u32 {
        ((self.r as u32) << 16) | ((self.g as u32) << 8) | self.b as u32
    }

    #[inline]
    pub fn from_u32(px: u32) -> Self {
        Rgb::new(((px >> 16) & 0xFF) as u8, ((px >> 8) & 0xFF) as u8, (px & 0xFF) as u8)
    }

    pub fn with_alpha(self, a: u8) -> Rgba {
        Rgba { r: self.r, g: self.g, b: self.b, a }
    }
}

impl fmt::Display for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

/// Error returned when a `#rrggbb` colour string cannot be parsed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid colour `{0}`; expected #rrggbb")]
pub struct ParseRgbError(pub String);

impl FromStr for Rgb {
    type Err = ParseRgbError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let hex = s.trim().strip_prefix('#').unwrap_or(s.trim());
        if hex.len() != 6 || !hex.is_ascii() {
            return Err(ParseRgbError(s.to_string()));
        }
        let channel = |i: usize| {
            u8::from_str_radix(&hex[i..i + 2], 16).map_err(|_| ParseRgbError(s.to_string()))
        };
        Ok(Rgb::new(channel(0)?, channel(2)?, channel(4)?))
    }
}

impl TryFrom<String> for Rgb {
    type Error = ParseRgbError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Rgb> for String {
    fn from(value: Rgb) -> Self {
        value.to_string()
    }
}

/// RGB plus an alpha byte; what the hue wheel hands out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Rgba {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Rgba {
    pub const fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    pub fn rgb(self) -> Rgb {
        Rgb::new(self.r, self.g, self.b)
    }
}

/// Dense 2D array addressed by signed coordinates.
///
/// The top-left cell sits at `(x_left, y_top)`, which may be negative; cell
/// `(x, y)` lives at `(x - x_left) + (y - y_top) * width` in the row-major
/// backing vector.
#[derive(Debug, Clone, PartialEq)]
pub struct Grid2D<T> {
    x_left: i32,
    y_top: i32,
    width: usize,
    height: usize,
    cells: Vec<T>,
}

impl<T: Clone> Grid2D<T> {
    /// Grid with its origin at `(0, 0)`, every cell set to `fill`.
    pub fn new(width: usize, height: usize, fill: T) -> Self {
        Self::with_origin(0, 0, width, height, fill)
    }

    pub fn with_origin(x_left: i32, y_top: i32, width: usize, height: usize, fill: T) -> Self {
        Self { x_left, y_top, width, height, cells: vec![fill; width * height] }
    }

    pub fn fill(&mut self, value: T) {
        self.cells.fill(value);
    }
}

impl<T> Grid2D<T> {
    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn x_left(&self) -> i32 {
        self.x_left
    }

    pub fn y_top(&self) -> i32 {
        self.y_top
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Backing index of `(x, y)`, or `None` when the point is outside the grid.
    #[inline]
    pub fn index_of(&self, x: i32, y: i32) -> Option<usize> {
        let dx = x as i64 - self.x_left as i64;
        let dy = y as i64 - self.y_top as i64;
        if dx < 0 || dy < 0 || dx >= self.width as i64 || dy >= self.height as i64 {
            return None;
        }
        Some(dx as usize + dy as usize * self.width)
    }

    pub fn get(&self, x: i32, y: i32) -> Option<&T> {
        self.index_of(x, y).map(|i| &self.cells[i])
    }

    pub fn get_mut(&mut self, x: i32, y: i32) -> Option<&mut T> {
        self.index_of(x, y).map(|i| &mut self.cells[i])
    }

    /// Write `value` at `(x, y)`; points outside the grid are ignored.
    #[inline]
    pub fn set(&mut self, x: i32, y: i32, value: T) {
        if let Some(i) = self.index_of(x, y) {
            self.cells[i] = value;
        }
    }

    /// Signed y coordinate of backing row `row`.
    #[inline]
    pub fn row_y(&self, row: usize) -> i32 {
        self.y_top + row as i32
    }

    /// Signed x coordinate of backing column `col`.
    #[inline]
    pub fn col_x(&self, col: usize) -> i32 {
        self.x_left + col as i32
    }

    pub fn as_slice(&self) -> &[T] {
        &self.cells
    }

    pub fn as_mut_slice(&mut self) -> &mut [T] {
        &mut self.cells
    }
}

/// Displayable frame; each cell is 0x00RRGGBB.
pub type PixelBuffer = Grid2D<u32>;

/// Per-pixel complex amplitude produced by the field simulator.
pub type ComplexField = Grid2D<Complex64>;

impl Grid2D<u32> {
    pub fn pixel(&self, x: i32, y: i32) -> Option<Rgb> {
        self.get(x, y).copied().map(Rgb::from_u32)
    }

    /// Copy into an `image::RgbaImage` with opaque alpha.
    pub fn to_rgba_image(&self) -> image::RgbaImage {
        let mut out = image::RgbaImage::new(self.width as u32, self.height as u32);
        for (i, px) in self.cells.iter().enumerate() {
            let c = Rgb::from_u32(*px);
            let x = (i % self.width) as u32;
            let y = (i / self.width) as u32;
            out.put_pixel(x, y, image::Rgba([c.r, c.g, c.b, 255]));
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hex_colours_parse_and_print() {
        let c: Rgb = "#1a2B3c".parse().unwrap();
        assert_eq!(c, Rgb::new(0x1a, 0x2b, 0x3c));
        assert_eq!(c.to_string(), "#1a2b3c");
        assert!("#12345".parse::<Rgb>().is_err());
        assert!("#zz0000".parse::<Rgb>().is_err());
    }

    #[test]
    fn packing_round_trips_through_u32() {
        let c = Rgb::new(1, 2, 3);
        assert_eq!(c.to_u32(), 0x00_01_02_03);
        assert_eq!(Rgb::from_u32(c.to_u32()), c);
    }

    #[test]
    fn lerp_hits_endpoints_and_midpoint() {
        let a = Rgb::new(0, 100, 200);
        let b = Rgb::new(200, 0, 100);
        assert_eq!(a.lerp(b, 0.0), a);
        assert_eq!(a.lerp(b, 1.0), b);
        assert_eq!(a.lerp(b, 0.5), Rgb::new(100, 50, 150));
    }

    #[test]
    fn negative_origin_addresses_map_into_buffer() {
        let mut grid = Grid2D::with_origin(-2, -1, 4, 3, 0u8);
        assert_eq!(grid.index_of(-2, -1), Some(0));
        assert_eq!(grid.index_of(1, -1), Some(3));
        assert_eq!(grid.index_of(-2, 0), Some(4));
        assert_eq!(grid.index_of(1, 1), Some(11));
        assert_eq!(grid.index_of(2, 0), None);
        assert_eq!(grid.index_of(-3, 0), None);
        assert_eq!(grid.index_of(0, 2), None);

        grid.set(0, 0, 7);
        assert_eq!(grid.get(0, 0), Some(&7));
        assert_eq!(grid.as_slice()[6], 7);
        grid.set(10, 10, 9);
        assert!(grid.as_slice().iter().all(|&v| v == 0 || v == 7));
    }

    #[test]
    fn rgba_image_matches_pixels() {
        let mut buf = PixelBuffer::new(2, 2, 0);
        buf.set(1, 0, Rgb::new(10, 20, 30).to_u32());
        let img = buf.to_rgba_image();
        assert_eq!(img.dimensions(), (2, 2));
        assert_eq!(img.get_pixel(1, 0).0, [10, 20, 30, 255]);
        assert_eq!(img.get_pixel(0, 1).0, [0, 0, 0, 255]);
    }
}
