//! Facade crate for the `ballfinder-*` workspace.
//!
//! This crate provides:
//! - re-exports of the core, detection and pipeline crates
//! - end-to-end helpers that take an RGB image, convert it to the HSV working
//!   space and run the [`Detector`]
//! - the `ballfinder` command-line tool (feature `cli`)
//!
//! ## Quickstart
//!
//! ```no_run
//! use ballfinder::{detect, Parameters};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let result = detect::detect_path("frame.png", &Parameters::default())?;
//! if let Some(target) = result.target {
//!     println!("target at {:?}", target.center());
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## API map
//! - `ballfinder::core`: frames, pixel buffers, targets, HSV conversion, logger.
//! - `ballfinder::detection`: parameters, mask stages, circle transform,
//!   composite scoring, contours and blobs, the [`Detector`].
//! - `ballfinder::pipeline`: drop-oldest queues, worker pool, dispatcher,
//!   telemetry sinks, parameter store, preview encoding.
//! - `ballfinder::detect`: one-call helpers from `image::RgbImage`.

pub use ballfinder_core as core;
pub use ballfinder_detect as detection;
pub use ballfinder_pipeline as pipeline;

pub use ballfinder_core::{PixelBuffer, Target, TargetKind, TimedFrame};
pub use ballfinder_detect::{DetectionResult, Detector, Parameters, Strategy};
pub use ballfinder_pipeline::{ParameterStore, Pipeline, PipelineConfig, TelemetryRecord};

pub mod detect;
