#![allow(dead_code)]

use ballfinder_core::PixelBuffer;
use image::{Rgb, RgbImage};

/// Saturated red in RGB; lands in the default red HSV range.
pub const RED: Rgb<u8> = Rgb([230, 20, 20]);
/// Low-saturation gray-green; outside every default range.
pub const GRAY: Rgb<u8> = Rgb([90, 110, 90]);

/// RGB scene with one red disk.
pub fn red_disk(width: u32, height: u32, cx: f32, cy: f32, r: f32) -> PixelBuffer {
    PixelBuffer::Color(RgbImage::from_fn(width, height, |x, y| {
        let (dx, dy) = (x as f32 - cx, y as f32 - cy);
        if dx * dx + dy * dy <= r * r {
            RED
        } else {
            GRAY
        }
    }))
}
