use std::time::Instant;

use ballfinder_core::{PixelBuffer, Target, TimedFrame};

/// Output of [`Detector::detect`](super::Detector::detect).
#[derive(Clone, Debug, Default)]
pub struct DetectionResult {
    /// Winning candidate, `None` when nothing passed the filters or the
    /// frame failed.
    pub target: Option<Target>,
    /// The analysed frame, orientation-corrected. `None` only when no frame
    /// was supplied.
    pub frame: Option<TimedFrame>,
    /// The one intermediate stage selected by `Parameters::debug_stage`.
    ///
    /// Display-ready: mask stages are 1-channel, the annotated stage is RGB.
    pub debug_frame: Option<PixelBuffer>,
}

impl DetectionResult {
    /// Result for an absent input frame.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn captured_at(&self) -> Option<Instant> {
        self.frame.as_ref().map(|f| f.captured_at)
    }
}

/// Target plus debug output for one frame, before it is paired with the frame.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FrameAnalysis {
    pub target: Option<Target>,
    pub debug_frame: Option<PixelBuffer>,
}
