//! Concurrent frame pipeline for the ballfinder vision front-end.
//!
//! Frames flow from a [`FrameSource`] through a drop-oldest ingest queue to a
//! pool of detection workers, then through a drop-oldest ready queue to a
//! single [`ResultDispatcher`] that enforces monotonic capture times,
//! computes the target bearing and publishes one [`TelemetryRecord`] per
//! accepted frame. Workers read detection parameters from a copy-on-write
//! [`ParameterStore`].
//!
//! ## Quickstart
//!
//! ```no_run
//! use std::sync::Arc;
//! use ballfinder_pipeline::{
//!     hsv_source, ImageSequenceSource, JsonLinesSink, ParameterStore, Pipeline, PipelineConfig,
//! };
//!
//! let store = Arc::new(ParameterStore::open("params.json")?);
//! let source = hsv_source(ImageSequenceSource::open(["frame0.png", "frame1.png"])?.with_fps(30.0));
//! let sink = JsonLinesSink::new(std::io::stdout());
//!
//! let handle = Pipeline::new(PipelineConfig::default(), store).spawn(source, sink)?;
//! let report = handle.join()?;
//! println!("{report:?}");
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

mod config;
mod dispatcher;
mod error;
mod last_seen;
mod pipeline;
mod preview;
mod queue;
mod source;
mod telemetry;
mod workers;

pub use config::{apply_to, ConfigError, ParameterStore, ParameterUpdate, UpdateRequest};
pub use dispatcher::{
    bearing_angle, DispatchOutcome, DispatcherStats, ResultDispatcher, DEFAULT_HALF_FOV_RAD,
    DEFAULT_STATS_INTERVAL,
};
pub use error::{PipelineError, PreviewError};
pub use last_seen::{LastSeenSnapshot, LastSeenState};
pub use pipeline::{Pipeline, PipelineConfig, PipelineHandle, PipelineReport};
pub use preview::{preview_image, render_preview, DEFAULT_JPEG_QUALITY};
pub use queue::{DropOldestQueue, Pushed, DEFAULT_CAPACITY};
pub use source::{
    hsv_source, hsv_transform, FrameSource, ImageSequenceSource, SourceError, StampingSource,
    TransformedSource, VecSource,
};
pub use telemetry::{
    JsonLinesSink, LogSink, RecordingSink, TelemetryError, TelemetryRecord, TelemetrySink,
    NO_TARGET_ANGLE, NO_TARGET_GEOMETRY,
};
pub use workers::{default_worker_count, WorkerPool};
