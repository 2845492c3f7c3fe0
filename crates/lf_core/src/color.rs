//! Colors and dominant-palette extraction for drawn images.
//!
//! The installation tints each spawned creature with the "main color" of its
//! drawing. The palette is computed from a small mip of the image: the most
//! frequent solid colors are blended and then pushed to full saturation and
//! brightness, so a pale or dark drawing still produces a vivid tint.

use std::collections::HashMap;

use image::imageops::{self, FilterType};
use image::RgbaImage;
use serde::{Deserialize, Serialize};

/// Alpha above which a pixel counts as solid.
pub const SOLID_ALPHA: u8 = 128;

/// Linear RGBA color with components in `0.0..=1.0`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl Color {
    pub const BLACK: Color = Color::rgb(0.0, 0.0, 0.0);
    pub const WHITE: Color = Color::rgb(1.0, 1.0, 1.0);
    pub const TRANSPARENT: Color = Color::new(0.0, 0.0, 0.0, 0.0);

    pub const fn new(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self { r, g, b, a }
    }

    pub const fn rgb(r: f32, g: f32, b: f32) -> Self {
        Self::new(r, g, b, 1.0)
    }

    pub fn from_rgba8(px: [u8; 4]) -> Self {
        Self::new(
            px[0] as f32 / 255.0,
            px[1] as f32 / 255.0,
            px[2] as f32 / 255.0,
            px[3] as f32 / 255.0,
        )
    }

    pub fn to_rgba8(self) -> [u8; 4] {
        let q = |c: f32| (c.clamp(0.0, 1.0) * 255.0).round() as u8;
        [q(self.r), q(self.g), q(self.b), q(self.a)]
    }

    /// `#rrggbb`, alpha ignored.
    pub fn to_hex(self) -> String {
        let [r, g, b, _] = self.to_rgba8();
        format!("#{r:02x}{g:02x}{b:02x}")
    }

    /// Component-wise linear interpolation, `t` clamped to `0..=1`.
    pub fn lerp(self, other: Color, t: f32) -> Color {
        let t = t.clamp(0.0, 1.0);
        Color::new(
            self.r + (other.r - self.r) * t,
            self.g + (other.g - self.g) * t,
            self.b + (other.b - self.b) * t,
            self.a + (other.a - self.a) * t,
        )
    }

    /// Hue in degrees `0..360`. Achromatic colors report 0.
    pub fn hue(self) -> f32 {
        let max = self.r.max(self.g).max(self.b);
        let min = self.r.min(self.g).min(self.b);
        let delta = max - min;
        if delta <= f32::EPSILON {
            return 0.0;
        }
        let h = if max == self.r {
            ((self.g - self.b) / delta).rem_euclid(6.0)
        } else if max == self.g {
            (self.b - self.r) / delta + 2.0
        } else {
            (self.r - self.g) / delta + 4.0
        };
        (h * 60.0).rem_euclid(360.0)
    }

    /// Build an opaque color from hue (degrees), saturation and value.
    pub fn from_hsv(hue: f32, saturation: f32, value: f32) -> Color {
        let h = hue.rem_euclid(360.0) / 60.0;
        let s = saturation.clamp(0.0, 1.0);
        let v = value.clamp(0.0, 1.0);
        let c = v * s;
        let x = c * (1.0 - ((h % 2.0) - 1.0).abs());
        let m = v - c;
        let (r, g, b) = match h as u32 {
            0 => (c, x, 0.0),
            1 => (x, c, 0.0),
            2 => (0.0, c, x),
            3 => (0.0, x, c),
            4 => (x, 0.0, c),
            _ => (c, 0.0, x),
        };
        Color::rgb(r + m, g + m, b + m)
    }

    /// Same hue at full saturation and value.
    pub fn vivid(self) -> Color {
        Color::from_hsv(self.hue(), 1.0, 1.0)
    }

    pub fn approx_eq(self, other: Color, epsilon: f32) -> bool {
        (self.r - other.r).abs() <= epsilon
            && (self.g - other.g).abs() <= epsilon
            && (self.b - other.b).abs() <= epsilon
            && (self.a - other.a).abs() <= epsilon
    }
}

impl Default for Color {
    fn default() -> Self {
        Color::BLACK
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Palette {
    /// Blended, fully saturated tint.
    pub dominant: Color,
    /// The two most frequent solid colors, black when absent.
    pub top: [Color; 2],
}

impl Default for Palette {
    fn default() -> Self {
        Self {
            dominant: Color::BLACK,
            top: [Color::BLACK; 2],
        }
    }
}

/// Shrink the image to mip level `mip_level` (each level halves both sides)
/// with a triangle filter. The result never shrinks below 1x1.
pub fn downsample(image: &RgbaImage, mip_level: u32) -> RgbaImage {
    let (w, h) = image.dimensions();
    let shift = mip_level.min(31);
    let (nw, nh) = ((w >> shift).max(1), (h >> shift).max(1));
    if w == 0 || h == 0 || (nw, nh) == (w, h) {
        return image.clone();
    }
    imageops::resize(image, nw, nh, FilterType::Triangle)
}

/// Compute the palette of a pixel buffer.
///
/// Solid pixels (alpha > 128) are counted per exact RGBA value and ranked by
/// descending frequency, ties keeping first appearance. The first
/// `blend_top` colors are blended in equal proportion and the result is
/// forced to full saturation and value. With no solid pixels everything is
/// black.
pub fn extract_palette(pixels: &RgbaImage, blend_top: usize) -> Palette {
    let mut frequencies: HashMap<[u8; 4], (usize, usize)> = HashMap::new();
    for (order, px) in pixels.pixels().enumerate() {
        if px.0[3] <= SOLID_ALPHA {
            continue;
        }
        let entry = frequencies.entry(px.0).or_insert((0, order));
        entry.0 += 1;
    }

    if frequencies.is_empty() {
        return Palette::default();
    }

    let mut ranked: Vec<([u8; 4], usize, usize)> = frequencies
        .into_iter()
        .map(|(px, (count, first))| (px, count, first))
        .collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then(a.2.cmp(&b.2)));
    let ranked: Vec<Color> = ranked
        .into_iter()
        .map(|(px, _, _)| Color::from_rgba8(px))
        .collect();

    let mut blended = ranked[0];
    for (i, next) in ranked.iter().enumerate().take(blend_top.max(1)).skip(1) {
        blended = blended.lerp(*next, 1.0 / (i as f32 + 1.0));
    }

    Palette {
        dominant: blended.vivid(),
        top: [
            ranked[0],
            ranked.get(1).copied().unwrap_or(Color::BLACK),
        ],
    }
}
