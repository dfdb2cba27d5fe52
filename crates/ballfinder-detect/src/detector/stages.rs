use std::time::Instant;

use ballfinder_core::PixelBuffer;
use image::GrayImage;

use crate::mask::{mask_for_buffer, median_blur, open};
use crate::params::{DebugStage, Parameters};

/// Intermediate images of the shared early stages.
#[derive(Clone, Debug, PartialEq)]
pub struct MaskStages {
    /// Stage A: pixels inside the configured HSV range(s).
    pub color: GrayImage,
    /// Stage B: after morphological open.
    pub opened: GrayImage,
    /// Stage C: after median blur.
    pub blurred: GrayImage,
}

impl MaskStages {
    pub fn compute(pixels: &PixelBuffer, params: &Parameters) -> Self {
        let t0 = Instant::now();
        let color = mask_for_buffer(pixels, &params.color);
        log::debug!("color filter: {:.2?}", t0.elapsed());

        let t1 = Instant::now();
        let opened = open(&color, &params.morphology);
        let blurred = median_blur(&opened, params.morphology.median_kernel);
        log::debug!("mask filters: {:.2?}", t1.elapsed());

        Self {
            color,
            opened,
            blurred,
        }
    }

    /// Copy of the mask stage selected for debugging, if it is one of these.
    pub fn debug_mask(&self, stage: DebugStage) -> Option<GrayImage> {
        match stage {
            DebugStage::ColorFilter => Some(self.color.clone()),
            DebugStage::Morphology => Some(self.opened.clone()),
            DebugStage::MedianBlur => Some(self.blurred.clone()),
            DebugStage::None | DebugStage::Annotated => None,
        }
    }
}
