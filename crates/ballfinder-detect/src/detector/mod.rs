//! Single-target detector.
//!
//! Both strategies share the color mask, morphological open and median blur
//! stages, then diverge:
//!
//! - [`Strategy::Circle`](crate::Strategy::Circle): Canny edges, circle
//!   transform, composite-score filter, largest radius wins;
//! - [`Strategy::Ellipse`](crate::Strategy::Ellipse): outer contours, ellipse
//!   fit, blob keypoint gating, largest contour area wins.

mod error;
mod pipeline;
mod result;
mod stages;
mod strategy;

pub use error::DetectError;
pub use pipeline::Detector;
pub use result::{DetectionResult, FrameAnalysis};
pub use stages::MaskStages;
