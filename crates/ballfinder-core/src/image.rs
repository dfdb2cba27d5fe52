//! Working color space helpers.
//!
//! HSV follows the OpenCV 8-bit convention: hue in `[0, 180]` (degrees / 2),
//! saturation and value in `[0, 255]`. HSV frames are stored in an
//! [`RgbImage`] whose channels hold `(h, s, v)`.

use image::{GrayImage, Rgb, RgbImage};
use serde::{Deserialize, Serialize};

use crate::PixelBuffer;

/// One HSV triple in OpenCV 8-bit convention.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct Hsv {
    pub h: u8,
    pub s: u8,
    pub v: u8,
}

impl Hsv {
    pub const fn new(h: u8, s: u8, v: u8) -> Self {
        Self { h, s, v }
    }

    #[inline]
    pub fn from_rgb(rgb: [u8; 3]) -> Self {
        let [r, g, b] = rgb.map(|c| c as f32);
        let max = r.max(g).max(b);
        let min = r.min(g).min(b);
        let diff = max - min;

        let s = if max > 0.0 { 255.0 * diff / max } else { 0.0 };
        let mut h = if diff <= 0.0 {
            0.0
        } else if max == r {
            60.0 * (g - b) / diff
        } else if max == g {
            120.0 + 60.0 * (b - r) / diff
        } else {
            240.0 + 60.0 * (r - g) / diff
        };
        if h < 0.0 {
            h += 360.0;
        }

        Self {
            h: (h / 2.0).round().min(180.0) as u8,
            s: s.round() as u8,
            v: max as u8,
        }
    }

    #[inline]
    pub fn to_rgb(self) -> [u8; 3] {
        let v = self.v as f32 / 255.0;
        let s = self.s as f32 / 255.0;
        let h = (self.h as f32 * 2.0) % 360.0;

        let c = v * s;
        let hp = h / 60.0;
        let x = c * (1.0 - (hp % 2.0 - 1.0).abs());
        let (r1, g1, b1) = match hp as u32 {
            0 => (c, x, 0.0),
            1 => (x, c, 0.0),
            2 => (0.0, c, x),
            3 => (0.0, x, c),
            4 => (x, 0.0, c),
            _ => (c, 0.0, x),
        };
        let m = v - c;
        [r1, g1, b1].map(|ch| ((ch + m) * 255.0).round().clamp(0.0, 255.0) as u8)
    }

    /// Inclusive per-channel range test.
    #[inline]
    pub fn within(self, lower: Hsv, upper: Hsv) -> bool {
        (lower.h..=upper.h).contains(&self.h)
            && (lower.s..=upper.s).contains(&self.s)
            && (lower.v..=upper.v).contains(&self.v)
    }
}

/// Convert an RGB capture into the HSV working space.
///
/// This is the default one-time transform a frame source applies before
/// frames enter the pipeline.
pub fn rgb_to_hsv(img: &RgbImage) -> RgbImage {
    let mut out = RgbImage::new(img.width(), img.height());
    for (dst, src) in out.pixels_mut().zip(img.pixels()) {
        let hsv = Hsv::from_rgb(src.0);
        *dst = Rgb([hsv.h, hsv.s, hsv.v]);
    }
    out
}

/// Convert an HSV working-space image back to RGB for display.
pub fn hsv_to_rgb(img: &RgbImage) -> RgbImage {
    let mut out = RgbImage::new(img.width(), img.height());
    for (dst, src) in out.pixels_mut().zip(img.pixels()) {
        let [h, s, v] = src.0;
        *dst = Rgb(Hsv::new(h, s, v).to_rgb());
    }
    out
}

/// Expand a 1-channel mask into a gray RGB image.
pub fn mask_to_rgb(mask: &GrayImage) -> RgbImage {
    let mut out = RgbImage::new(mask.width(), mask.height());
    for (dst, src) in out.pixels_mut().zip(mask.pixels()) {
        let v = src.0[0];
        *dst = Rgb([v, v, v]);
    }
    out
}

/// Flip a buffer on both axes (180 degree rotation), used for cameras
/// mounted upside down.
pub fn flip_both_axes(pixels: &PixelBuffer) -> PixelBuffer {
    match pixels {
        PixelBuffer::Mask(img) => PixelBuffer::Mask(image::imageops::rotate180(img)),
        PixelBuffer::Color(img) => PixelBuffer::Color(image::imageops::rotate180(img)),
    }
}
