//! JPEG preview of the most recent accepted frame.

use std::io::Cursor;

use ballfinder_core::{mask_to_rgb, PixelBuffer};
use ballfinder_detect::annotate;
use image::codecs::jpeg::JpegEncoder;
use image::RgbImage;

use crate::error::PreviewError;
use crate::last_seen::LastSeenSnapshot;

pub const DEFAULT_JPEG_QUALITY: u8 = 80;

/// Image shown to the operator, before encoding.
///
/// The selected debug stage wins when present; it is already display-ready.
/// Otherwise the working-space frame is converted back to RGB and the
/// target is drawn on it. `None` when nothing has been seen yet or the
/// frame is all zero.
pub fn preview_image(snapshot: &LastSeenSnapshot) -> Option<RgbImage> {
    if let Some(debug) = &snapshot.debug_frame {
        return Some(match debug {
            PixelBuffer::Mask(mask) => mask_to_rgb(mask),
            PixelBuffer::Color(rgb) => rgb.clone(),
        });
    }
    let frame = snapshot.frame.as_ref()?;
    if frame.pixels.is_blank() {
        return None;
    }
    Some(annotate::annotated(&frame.pixels, snapshot.target.as_ref()))
}

/// [`preview_image`] encoded as JPEG.
pub fn render_preview(snapshot: &LastSeenSnapshot, quality: u8) -> Result<Option<Vec<u8>>, PreviewError> {
    let Some(img) = preview_image(snapshot) else {
        return Ok(None);
    };
    let mut out = Cursor::new(Vec::new());
    JpegEncoder::new_with_quality(&mut out, quality.clamp(1, 100)).encode_image(&img)?;
    Ok(Some(out.into_inner()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ballfinder_core::{Target, TimedFrame};
    use image::{GrayImage, Luma, Rgb};

    #[test]
    fn nothing_seen_yields_none() {
        assert!(render_preview(&LastSeenSnapshot::default(), 80).unwrap().is_none());
    }

    #[test]
    fn blank_frame_yields_none() {
        let snapshot = LastSeenSnapshot {
            frame: Some(TimedFrame::now(PixelBuffer::Mask(GrayImage::new(16, 16)))),
            ..Default::default()
        };
        assert!(preview_image(&snapshot).is_none());
    }

    #[test]
    fn annotated_frame_encodes_as_jpeg() {
        let mut mask = GrayImage::new(64, 48);
        mask.put_pixel(3, 3, Luma([255]));
        let snapshot = LastSeenSnapshot {
            frame: Some(TimedFrame::now(PixelBuffer::Mask(mask))),
            debug_frame: None,
            target: Some(Target::Circle {
                cx: 32.0,
                cy: 24.0,
                radius: 10.0,
            }),
        };
        let img = preview_image(&snapshot).unwrap();
        assert_eq!(*img.get_pixel(42, 24), annotate::SHAPE_COLOR);

        let bytes = render_preview(&snapshot, 90).unwrap().unwrap();
        assert_eq!(&bytes[..2], &[0xFF, 0xD8]);
        let decoded = image::load_from_memory(&bytes).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (64, 48));
    }

    #[test]
    fn debug_frame_takes_precedence() {
        let rgb = RgbImage::from_pixel(8, 8, Rgb([10, 20, 30]));
        let snapshot = LastSeenSnapshot {
            frame: None,
            debug_frame: Some(PixelBuffer::Color(rgb.clone())),
            target: None,
        };
        assert_eq!(preview_image(&snapshot).unwrap(), rgb);
    }
}
