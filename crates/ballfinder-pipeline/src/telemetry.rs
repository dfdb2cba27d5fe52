//! Per-frame telemetry records and sinks.
//!
//! Field names follow the robot controller's network table
//! (`centerx`, `centery`, `radius`, `anglex`, ...). The transport itself is
//! external; sinks here log, write JSON lines, or record in memory.

use std::io::Write;
use std::sync::{Arc, Mutex, PoisonError};

use ballfinder_core::Target;
use serde::{Deserialize, Serialize};

/// Geometry value published when no target is present.
pub const NO_TARGET_GEOMETRY: f32 = -1.0;
/// Bearing published when no target is present; outside any real bearing.
pub const NO_TARGET_ANGLE: f32 = -999.0;

/// One published record.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TelemetryRecord {
    Circle {
        centerx: f32,
        centery: f32,
        radius: f32,
        anglex: f32,
    },
    Ellipse {
        centerx: f32,
        centery: f32,
        axis1: f32,
        axis2: f32,
        rotation: f32,
        anglex: f32,
    },
    NoTarget {
        centerx: f32,
        centery: f32,
        radius: f32,
        anglex: f32,
    },
}

impl TelemetryRecord {
    pub fn no_target() -> Self {
        TelemetryRecord::NoTarget {
            centerx: NO_TARGET_GEOMETRY,
            centery: NO_TARGET_GEOMETRY,
            radius: NO_TARGET_GEOMETRY,
            anglex: NO_TARGET_ANGLE,
        }
    }

    /// Record for `target` with a precomputed bearing in degrees.
    pub fn from_target(target: &Target, anglex: f32) -> Self {
        match *target {
            Target::Circle { cx, cy, radius } => TelemetryRecord::Circle {
                centerx: cx,
                centery: cy,
                radius,
                anglex,
            },
            Target::Ellipse {
                cx,
                cy,
                axis1,
                axis2,
                angle,
            } => TelemetryRecord::Ellipse {
                centerx: cx,
                centery: cy,
                axis1,
                axis2,
                rotation: angle,
                anglex,
            },
        }
    }

    pub fn has_target(&self) -> bool {
        !matches!(self, TelemetryRecord::NoTarget { .. })
    }

    pub fn anglex(&self) -> f32 {
        match *self {
            TelemetryRecord::Circle { anglex, .. }
            | TelemetryRecord::Ellipse { anglex, .. }
            | TelemetryRecord::NoTarget { anglex, .. } => anglex,
        }
    }

    /// `(name, value)` pairs as written to the network table.
    pub fn entries(&self) -> Vec<(&'static str, f32)> {
        match *self {
            TelemetryRecord::Circle {
                centerx,
                centery,
                radius,
                anglex,
            }
            | TelemetryRecord::NoTarget {
                centerx,
                centery,
                radius,
                anglex,
            } => vec![
                ("centerx", centerx),
                ("centery", centery),
                ("radius", radius),
                ("anglex", anglex),
            ],
            TelemetryRecord::Ellipse {
                centerx,
                centery,
                axis1,
                axis2,
                rotation,
                anglex,
            } => vec![
                ("centerx", centerx),
                ("centery", centery),
                ("axis1", axis1),
                ("axis2", axis2),
                ("rotation", rotation),
                ("anglex", anglex),
            ],
        }
    }
}

#[derive(thiserror::Error, Debug)]
pub enum TelemetryError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

/// Destination for dispatcher output.
pub trait TelemetrySink: Send {
    fn publish(&mut self, record: &TelemetryRecord) -> Result<(), TelemetryError>;
}

impl<S: TelemetrySink + ?Sized> TelemetrySink for Box<S> {
    fn publish(&mut self, record: &TelemetryRecord) -> Result<(), TelemetryError> {
        (**self).publish(record)
    }
}

/// Logs every record at `debug` level.
#[derive(Clone, Copy, Debug, Default)]
pub struct LogSink;

impl TelemetrySink for LogSink {
    fn publish(&mut self, record: &TelemetryRecord) -> Result<(), TelemetryError> {
        log::debug!("telemetry {:?}", record.entries());
        Ok(())
    }
}

/// Writes one JSON object per line and flushes after each record.
#[derive(Debug)]
pub struct JsonLinesSink<W: Write + Send> {
    out: W,
}

impl<W: Write + Send> JsonLinesSink<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write + Send> TelemetrySink for JsonLinesSink<W> {
    fn publish(&mut self, record: &TelemetryRecord) -> Result<(), TelemetryError> {
        serde_json::to_writer(&mut self.out, record)?;
        self.out.write_all(b"\n")?;
        self.out.flush()?;
        Ok(())
    }
}

/// Keeps every record in a shared vector; clones share the same storage.
#[derive(Clone, Debug, Default)]
pub struct RecordingSink {
    records: Arc<Mutex<Vec<TelemetryRecord>>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> Vec<TelemetryRecord> {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl TelemetrySink for RecordingSink {
    fn publish(&mut self, record: &TelemetryRecord) -> Result<(), TelemetryError> {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(*record);
        Ok(())
    }
}
