//! Core types for the ballfinder vision front-end.
//!
//! This crate is intentionally small. It owns the frame representation that
//! flows through the pipeline, the detected target shapes, the HSV working
//! color space conversions, and logger setup. It knows nothing about how
//! targets are found.

mod frame;
mod image;
mod logger;
mod target;

pub use frame::{FrameError, PixelBuffer, TimedFrame};
pub use image::{flip_both_axes, hsv_to_rgb, mask_to_rgb, rgb_to_hsv, Hsv};
pub use target::{Target, TargetKind};

#[cfg(feature = "tracing")]
pub use logger::init_tracing;

pub use logger::init_with_level;
