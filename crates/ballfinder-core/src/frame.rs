use std::time::Instant;

use image::{GrayImage, RgbImage};

/// Errors produced when wrapping raw buffers into frames.
#[derive(thiserror::Error, Debug)]
pub enum FrameError {
    #[error("invalid frame buffer length (expected {expected} bytes, got {got})")]
    InvalidBuffer { expected: usize, got: usize },

    #[error("invalid frame dimensions (width={width}, height={height})")]
    InvalidDimensions { width: u32, height: u32 },
}

/// Pixel payload of a frame: a 1-channel mask or a 3-channel color image.
///
/// Color buffers are in whatever working color space the frame source
/// produced; the detector expects OpenCV-convention HSV.
#[derive(Clone, Debug, PartialEq)]
pub enum PixelBuffer {
    Mask(GrayImage),
    Color(RgbImage),
}

impl PixelBuffer {
    pub fn width(&self) -> u32 {
        match self {
            PixelBuffer::Mask(img) => img.width(),
            PixelBuffer::Color(img) => img.width(),
        }
    }

    pub fn height(&self) -> u32 {
        match self {
            PixelBuffer::Mask(img) => img.height(),
            PixelBuffer::Color(img) => img.height(),
        }
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width(), self.height())
    }

    /// True when every byte of the buffer is zero (nothing captured yet).
    pub fn is_blank(&self) -> bool {
        match self {
            PixelBuffer::Mask(img) => img.as_raw().iter().all(|&v| v == 0),
            PixelBuffer::Color(img) => img.as_raw().iter().all(|&v| v == 0),
        }
    }

    /// Build a 3-channel buffer from a raw interleaved slice.
    pub fn color_from_slice(width: u32, height: u32, pixels: &[u8]) -> Result<Self, FrameError> {
        let expected = checked_len(width, height, 3)?;
        if pixels.len() != expected {
            return Err(FrameError::InvalidBuffer {
                expected,
                got: pixels.len(),
            });
        }
        RgbImage::from_raw(width, height, pixels.to_vec())
            .map(PixelBuffer::Color)
            .ok_or(FrameError::InvalidDimensions { width, height })
    }

    /// Build a 1-channel mask buffer from a raw slice.
    pub fn mask_from_slice(width: u32, height: u32, pixels: &[u8]) -> Result<Self, FrameError> {
        let expected = checked_len(width, height, 1)?;
        if pixels.len() != expected {
            return Err(FrameError::InvalidBuffer {
                expected,
                got: pixels.len(),
            });
        }
        GrayImage::from_raw(width, height, pixels.to_vec())
            .map(PixelBuffer::Mask)
            .ok_or(FrameError::InvalidDimensions { width, height })
    }
}

fn checked_len(width: u32, height: u32, channels: usize) -> Result<usize, FrameError> {
    let w = usize::try_from(width).ok();
    let h = usize::try_from(height).ok();
    let Some((w, h)) = w.zip(h) else {
        return Err(FrameError::InvalidDimensions { width, height });
    };
    if w == 0 || h == 0 {
        return Err(FrameError::InvalidDimensions { width, height });
    }
    w.checked_mul(h)
        .and_then(|n| n.checked_mul(channels))
        .ok_or(FrameError::InvalidDimensions { width, height })
}

/// An image buffer tagged with its monotonic capture timestamp.
///
/// Frames are immutable once produced and move by value from stage to stage.
#[derive(Clone, Debug, PartialEq)]
pub struct TimedFrame {
    pub pixels: PixelBuffer,
    pub captured_at: Instant,
}

impl TimedFrame {
    pub fn new(pixels: PixelBuffer, captured_at: Instant) -> Self {
        Self {
            pixels,
            captured_at,
        }
    }

    /// Stamp a buffer with the current instant.
    pub fn now(pixels: PixelBuffer) -> Self {
        Self::new(pixels, Instant::now())
    }

    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    pub fn height(&self) -> u32 {
        self.pixels.height()
    }

    /// Replace the pixel payload, keeping the capture timestamp.
    pub fn map_pixels(self, f: impl FnOnce(PixelBuffer) -> PixelBuffer) -> Self {
        Self {
            pixels: f(self.pixels),
            captured_at: self.captured_at,
        }
    }
}
