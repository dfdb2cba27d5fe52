//! Single colored-target detection.
//!
//! A frame in the HSV working space is reduced to a binary mask of the team
//! color, cleaned up with a morphological open and a median blur, and then
//! searched for one target with one of two strategies:
//!
//! - **circle**: Canny edges, a gradient-voting circle transform, and the
//!   composite ring-density / coverage filter from [`circle_score`];
//! - **ellipse** (default): outer contours, moment-based ellipse fits, and a
//!   blob keypoint that picks which contour is the target.
//!
//! ## Quickstart
//!
//! ```no_run
//! use ballfinder_core::{rgb_to_hsv, PixelBuffer, TimedFrame};
//! use ballfinder_detect::{Detector, Parameters};
//!
//! let rgb = image::open("frame.png").unwrap().to_rgb8();
//! let frame = TimedFrame::now(PixelBuffer::Color(rgb_to_hsv(&rgb)));
//! let result = Detector::new().detect(Some(frame), &Parameters::default());
//! println!("{:?}", result.target);
//! ```

pub mod annotate;
pub mod blob;
pub mod circle_score;
pub mod contour;
mod detector;
pub mod hough;
mod io;
pub mod mask;
mod params;

pub use circle_score::{composite_score, filter_by_composite_score, ScoredCircle};
pub use detector::{DetectError, DetectionResult, Detector, FrameAnalysis, MaskStages};
pub use hough::CircleCandidate;
pub use io::ParamsIoError;
pub use params::{
    BlobParams, ColorParams, CompositeScoreParams, DebugStage, EdgeParams, HoughParams, HsvRange,
    KernelShape, MorphologyParams, Orientation, Parameters, ParamsError, Strategy, TeamColor,
};
