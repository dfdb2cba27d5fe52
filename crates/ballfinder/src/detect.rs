//! One-call detection from RGB images.

use std::path::Path;

use ballfinder_core::{rgb_to_hsv, FrameError, PixelBuffer, TimedFrame};
use ballfinder_detect::{DetectionResult, Detector, Parameters};
use ballfinder_pipeline::{bearing_angle, hsv_transform};
use image::RgbImage;

#[cfg(feature = "tracing")]
use tracing::instrument;

/// Errors produced by the facade helpers.
#[derive(thiserror::Error, Debug)]
pub enum DetectImageError {
    #[error(transparent)]
    Image(#[from] image::ImageError),
    #[error(transparent)]
    Frame(#[from] FrameError),
}

/// Stamp an RGB image as an HSV working-space frame.
pub fn hsv_frame(rgb: &RgbImage) -> TimedFrame {
    TimedFrame::now(PixelBuffer::Color(rgb_to_hsv(rgb)))
}

/// Detect the target in an RGB image.
#[cfg_attr(
    feature = "tracing",
    instrument(level = "info", skip(rgb, params), fields(width = rgb.width(), height = rgb.height()))
)]
pub fn detect_rgb(rgb: &RgbImage, params: &Parameters) -> DetectionResult {
    Detector::new().detect(Some(hsv_frame(rgb)), params)
}

/// Load an image file and detect the target in it.
pub fn detect_path(path: impl AsRef<Path>, params: &Parameters) -> Result<DetectionResult, DetectImageError> {
    let rgb = image::open(path.as_ref())?.to_rgb8();
    Ok(detect_rgb(&rgb, params))
}

/// Detect from a packed row-major RGB8 buffer.
pub fn detect_rgb_u8(
    width: u32,
    height: u32,
    pixels: &[u8],
    params: &Parameters,
) -> Result<DetectionResult, DetectImageError> {
    let pixels = hsv_transform(PixelBuffer::color_from_slice(width, height, pixels)?);
    Ok(Detector::new().detect(Some(TimedFrame::now(pixels)), params))
}

/// Horizontal bearing of the detected target in degrees, if any.
pub fn target_bearing(result: &DetectionResult, half_fov_rad: f32) -> Option<f32> {
    let target = result.target.as_ref()?;
    let width = result.frame.as_ref()?.width();
    Some(bearing_angle(target.center().0, width, half_fov_rad))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ballfinder_core::Target;
    use ballfinder_detect::Strategy;
    use ballfinder_pipeline::DEFAULT_HALF_FOV_RAD;
    use image::Rgb;

    fn red_disk(cx: f32, cy: f32, r: f32) -> RgbImage {
        RgbImage::from_fn(320, 240, |x, y| {
            let (dx, dy) = (x as f32 - cx, y as f32 - cy);
            if dx * dx + dy * dy <= r * r {
                Rgb([230, 20, 20])
            } else {
                Rgb([90, 110, 90])
            }
        })
    }

    #[test]
    fn finds_red_disk_in_rgb() {
        let params = Parameters {
            strategy: Strategy::Circle,
            ..Parameters::default()
        };
        let result = detect_rgb(&red_disk(100.0, 120.0, 40.0), &params);
        match result.target {
            Some(Target::Circle { cx, cy, radius }) => {
                assert!((cx - 100.0).abs() <= 3.0);
                assert!((cy - 120.0).abs() <= 3.0);
                assert!((radius - 40.0).abs() <= 3.0);
            }
            other => panic!("expected a circle, got {other:?}"),
        }
        let bearing = target_bearing(&result, DEFAULT_HALF_FOV_RAD).unwrap();
        assert!(bearing < 0.0);
    }

    #[test]
    fn gray_image_has_no_target() {
        let rgb = RgbImage::from_pixel(64, 48, Rgb([128, 128, 128]));
        let result = detect_rgb(&rgb, &Parameters::default());
        assert!(result.target.is_none());
        assert!(target_bearing(&result, DEFAULT_HALF_FOV_RAD).is_none());
    }

    #[test]
    fn raw_buffer_length_is_checked() {
        let err = detect_rgb_u8(4, 4, &[0u8; 10], &Parameters::default()).unwrap_err();
        assert!(matches!(err, DetectImageError::Frame(_)));

        let rgb = red_disk(160.0, 120.0, 40.0);
        let result = detect_rgb_u8(320, 240, rgb.as_raw(), &Parameters::default()).unwrap();
        let (cx, _) = result.target.unwrap().center();
        assert_abs_diff_eq!(cx, 160.0, epsilon = 3.0);
    }
}
