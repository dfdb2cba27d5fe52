//! Overlay drawing for the annotated debug stage and the preview.

use ballfinder_core::{hsv_to_rgb, mask_to_rgb, PixelBuffer, Target};
use image::{Rgb, RgbImage};
use imageproc::drawing::{draw_cross_mut, draw_hollow_circle_mut, draw_line_segment_mut};

/// Outline color of the detected shape.
pub const SHAPE_COLOR: Rgb<u8> = Rgb([36, 255, 12]);
/// Center mark color.
pub const CENTER_COLOR: Rgb<u8> = Rgb([255, 0, 255]);

const ELLIPSE_SEGMENTS: usize = 72;

/// Displayable RGB copy of a working-space buffer.
///
/// Color buffers are assumed to hold HSV and are converted back to RGB;
/// masks are expanded to gray.
pub fn to_display_rgb(pixels: &PixelBuffer) -> RgbImage {
    match pixels {
        PixelBuffer::Color(hsv) => hsv_to_rgb(hsv),
        PixelBuffer::Mask(mask) => mask_to_rgb(mask),
    }
}

/// Draw `target` and its center mark onto `img`.
pub fn draw_target(img: &mut RgbImage, target: &Target) {
    match *target {
        Target::Circle { cx, cy, radius } => {
            let c = (cx.round() as i32, cy.round() as i32);
            let r = radius.round() as i32;
            // two passes for a 2 px outline
            draw_hollow_circle_mut(img, c, r, SHAPE_COLOR);
            draw_hollow_circle_mut(img, c, r + 1, SHAPE_COLOR);
        }
        Target::Ellipse {
            cx,
            cy,
            axis1,
            axis2,
            angle,
        } => {
            let (sin, cos) = angle.to_radians().sin_cos();
            let point = |k: usize| {
                let t = k as f32 * std::f32::consts::TAU / ELLIPSE_SEGMENTS as f32;
                let (ex, ey) = (axis1 * t.cos(), axis2 * t.sin());
                (cx + ex * cos - ey * sin, cy + ex * sin + ey * cos)
            };
            for k in 0..ELLIPSE_SEGMENTS {
                draw_line_segment_mut(img, point(k), point(k + 1), SHAPE_COLOR);
            }
        }
    }
    let (cx, cy) = target.center();
    draw_cross_mut(img, CENTER_COLOR, cx.round() as i32, cy.round() as i32);
}

/// Displayable copy of `pixels` with `target` drawn on it, when present.
pub fn annotated(pixels: &PixelBuffer, target: Option<&Target>) -> RgbImage {
    let mut img = to_display_rgb(pixels);
    if let Some(t) = target {
        draw_target(&mut img, t);
    }
    img
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::GrayImage;

    #[test]
    fn circle_outline_and_center_are_drawn() {
        let frame = PixelBuffer::Mask(GrayImage::new(100, 100));
        let img = annotated(
            &frame,
            Some(&Target::Circle {
                cx: 50.0,
                cy: 50.0,
                radius: 20.0,
            }),
        );
        assert_eq!(*img.get_pixel(70, 50), SHAPE_COLOR);
        assert_eq!(*img.get_pixel(50, 50), CENTER_COLOR);
        assert_eq!(*img.get_pixel(5, 5), Rgb([0, 0, 0]));
    }

    #[test]
    fn rotated_ellipse_reaches_its_major_axis_tip() {
        let frame = PixelBuffer::Mask(GrayImage::new(100, 100));
        let img = annotated(
            &frame,
            Some(&Target::Ellipse {
                cx: 50.0,
                cy: 50.0,
                axis1: 30.0,
                axis2: 10.0,
                angle: 90.0,
            }),
        );
        assert_eq!(*img.get_pixel(50, 80), SHAPE_COLOR);
        assert_eq!(*img.get_pixel(80, 50), Rgb([0, 0, 0]));
    }

    #[test]
    fn no_target_leaves_converted_frame() {
        let mut mask = GrayImage::new(4, 4);
        mask.put_pixel(1, 1, image::Luma([200]));
        let img = annotated(&PixelBuffer::Mask(mask), None);
        assert_eq!(*img.get_pixel(1, 1), Rgb([200, 200, 200]));
    }
}
