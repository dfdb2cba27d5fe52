//! Most recent accepted detection, shared with the preview path.

use std::sync::{Mutex, PoisonError};
use std::time::Instant;

use ballfinder_core::{PixelBuffer, Target, TimedFrame};
use ballfinder_detect::DetectionResult;

/// Copy of the slot contents at one instant.
#[derive(Clone, Debug, Default)]
pub struct LastSeenSnapshot {
    pub frame: Option<TimedFrame>,
    pub debug_frame: Option<PixelBuffer>,
    pub target: Option<Target>,
}

impl LastSeenSnapshot {
    pub fn captured_at(&self) -> Option<Instant> {
        self.frame.as_ref().map(|f| f.captured_at)
    }
}

impl From<DetectionResult> for LastSeenSnapshot {
    fn from(result: DetectionResult) -> Self {
        Self {
            frame: result.frame,
            debug_frame: result.debug_frame,
            target: result.target,
        }
    }
}

/// Single mutex-protected slot with last-writer-wins semantics.
///
/// Only the dispatcher writes, after its timestamp guard, so the stored
/// capture time never goes backwards in a running pipeline.
#[derive(Debug, Default)]
pub struct LastSeenState {
    slot: Mutex<LastSeenSnapshot>,
}

impl LastSeenState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn update(&self, snapshot: LastSeenSnapshot) {
        *self.slot.lock().unwrap_or_else(PoisonError::into_inner) = snapshot;
    }

    pub fn snapshot(&self) -> LastSeenSnapshot {
        self.slot
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn captured_at(&self) -> Option<Instant> {
        self.slot
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .captured_at()
    }
}
