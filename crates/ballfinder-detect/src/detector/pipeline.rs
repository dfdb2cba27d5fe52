use std::any::Any;
use std::panic::{self, AssertUnwindSafe};

use ballfinder_core::{flip_both_axes, PixelBuffer, TimedFrame};

#[cfg(feature = "tracing")]
use tracing::instrument;

use super::strategy::{detect_circle, detect_ellipse};
use super::{DetectError, DetectionResult, FrameAnalysis, MaskStages};
use crate::annotate::annotated;
use crate::params::{DebugStage, Orientation, Parameters, Strategy};

/// Frame-in, target-out detector.
///
/// The detector holds no per-frame state; parameters arrive with every call so
/// that each frame is analysed against one consistent snapshot. It is `Sync`
/// and shared by all workers.
#[derive(Clone, Debug, Default)]
pub struct Detector {
    validate_params: bool,
    /// Frames for which stage analysis panics on purpose.
    #[cfg(test)]
    fault: Option<fn(&PixelBuffer) -> bool>,
}

impl Detector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Re-run [`Parameters::validate`] on every frame.
    ///
    /// Snapshots coming from a parameter store are validated on update, so
    /// this is off by default.
    pub fn with_param_validation(mut self, enabled: bool) -> Self {
        self.validate_params = enabled;
        self
    }

    /// Analyse one frame.
    ///
    /// Never fails: errors and panics inside any stage are logged and the
    /// frame is reported with `target = None`. The returned frame is the
    /// orientation-corrected one.
    #[cfg_attr(
        feature = "tracing",
        instrument(level = "info", skip(self, frame, params), fields(strategy = ?params.strategy))
    )]
    pub fn detect(&self, frame: Option<TimedFrame>, params: &Parameters) -> DetectionResult {
        let Some(frame) = frame else {
            return DetectionResult::empty();
        };
        let frame = match params.orientation {
            Orientation::RightsideUp => frame,
            Orientation::UpsideDown => frame.map_pixels(|p| flip_both_axes(&p)),
        };

        let outcome = panic::catch_unwind(AssertUnwindSafe(|| self.analyse(&frame.pixels, params)))
            .unwrap_or_else(|payload| Err(DetectError::Panicked(panic_message(payload))));

        match outcome {
            Ok(analysis) => DetectionResult {
                target: analysis.target,
                frame: Some(frame),
                debug_frame: analysis.debug_frame,
            },
            Err(err) => {
                log::warn!("unable to analyse frame: {err}");
                DetectionResult {
                    target: None,
                    frame: Some(frame),
                    debug_frame: None,
                }
            }
        }
    }

    /// Fallible core of [`Detector::detect`] on already orientation-corrected pixels.
    pub fn analyse(&self, pixels: &PixelBuffer, params: &Parameters) -> Result<FrameAnalysis, DetectError> {
        let (width, height) = pixels.dimensions();
        if width == 0 || height == 0 {
            return Err(DetectError::EmptyFrame { width, height });
        }
        if self.validate_params {
            params.validate()?;
        }

        let stages = MaskStages::compute(pixels, params);
        #[cfg(test)]
        self.inject_fault(pixels);
        let target = match params.strategy {
            Strategy::Circle => detect_circle(&stages, params),
            Strategy::Ellipse => detect_ellipse(&stages, params),
        };

        let debug_frame = match params.debug_stage {
            DebugStage::None => None,
            DebugStage::Annotated => Some(PixelBuffer::Color(annotated(pixels, target.as_ref()))),
            stage => stages.debug_mask(stage).map(PixelBuffer::Mask),
        };

        Ok(FrameAnalysis {
            target,
            debug_frame,
        })
    }
}

#[cfg(test)]
impl Detector {
    fn with_fault(mut self, fault: fn(&PixelBuffer) -> bool) -> Self {
        self.fault = Some(fault);
        self
    }

    fn inject_fault(&self, pixels: &PixelBuffer) {
        if self.fault.is_some_and(|f| f(pixels)) {
            panic!("stage fault on {:?} frame", pixels.dimensions());
        }
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
