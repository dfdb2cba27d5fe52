#![allow(dead_code)]

use ballfinder_core::{PixelBuffer, Target, TimedFrame};
use ballfinder_detect::{Parameters, Strategy};
use image::{Rgb, RgbImage};

/// HSV value inside the default red range.
pub const IN_RANGE: Rgb<u8> = Rgb([5, 200, 200]);
/// HSV value outside every default range (dull green).
pub const BACKGROUND: Rgb<u8> = Rgb([60, 40, 120]);

/// HSV scene with filled disks `(cx, cy, r)` on a neutral background.
pub fn disk_scene(width: u32, height: u32, disks: &[(f32, f32, f32)]) -> RgbImage {
    RgbImage::from_fn(width, height, |x, y| {
        let inside = disks.iter().any(|&(cx, cy, r)| {
            let (dx, dy) = (x as f32 - cx, y as f32 - cy);
            dx * dx + dy * dy <= r * r
        });
        if inside {
            IN_RANGE
        } else {
            BACKGROUND
        }
    })
}

/// HSV scene with one filled axis-aligned ellipse.
pub fn ellipse_scene(width: u32, height: u32, center: (f32, f32), a: f32, b: f32) -> RgbImage {
    RgbImage::from_fn(width, height, |x, y| {
        let (dx, dy) = ((x as f32 - center.0) / a, (y as f32 - center.1) / b);
        if dx * dx + dy * dy <= 1.0 {
            IN_RANGE
        } else {
            BACKGROUND
        }
    })
}

pub fn color_frame(img: RgbImage) -> TimedFrame {
    TimedFrame::now(PixelBuffer::Color(img))
}

pub fn params_for(strategy: Strategy) -> Parameters {
    Parameters {
        strategy,
        ..Parameters::default()
    }
}

/// Assert that `target` is within `tol` pixels of `(cx, cy)` with size `size`.
pub fn assert_target_near(target: Option<Target>, cx: f32, cy: f32, size: f32, tol: f32) {
    let target = target.expect("expected a target");
    let (tx, ty) = target.center();
    assert!(
        (tx - cx).abs() <= tol && (ty - cy).abs() <= tol,
        "center ({tx}, {ty}) not within {tol} px of ({cx}, {cy})"
    );
    assert!(
        (target.size() - size).abs() <= tol,
        "size {} not within {tol} px of {size}",
        target.size()
    );
}
