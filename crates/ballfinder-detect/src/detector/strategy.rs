use std::time::Instant;

use ballfinder_core::Target;
use image::GrayImage;

#[cfg(feature = "tracing")]
use tracing::instrument;

use super::MaskStages;
use crate::blob::BlobDetector;
use crate::circle_score::filter_with_params;
use crate::contour::{outer_contours, EllipseFit, Outline};
use crate::hough::find_circles;
use crate::params::Parameters;

/// Canny edges, circle transform, composite-score filter; largest radius wins.
#[cfg_attr(feature = "tracing", instrument(level = "debug", skip_all))]
pub(super) fn detect_circle(stages: &MaskStages, params: &Parameters) -> Option<Target> {
    let t0 = Instant::now();
    let edges: GrayImage =
        imageproc::edges::canny(&stages.blurred, params.edges.canny_low, params.edges.canny_high);
    let candidates = find_circles(&edges, &stages.blurred, &params.hough);
    log::debug!(
        "circle transform: {} candidates in {:.2?}",
        candidates.len(),
        t0.elapsed()
    );

    let t1 = Instant::now();
    let kept = filter_with_params(&edges, &candidates, &params.score);
    log::debug!("circle filter: {:.2?}", t1.elapsed());

    kept.into_iter()
        .map(|s| s.candidate)
        .max_by(|a, b| a.radius.total_cmp(&b.radius))
        .map(|c| Target::Circle {
            cx: c.cx,
            cy: c.cy,
            radius: c.radius,
        })
}

struct EllipseCandidate<'a> {
    outline: &'a Outline,
    area: f64,
    fit: EllipseFit,
}

/// Outer contours, ellipse fit, blob gating; largest contour area wins.
#[cfg_attr(feature = "tracing", instrument(level = "debug", skip_all))]
pub(super) fn detect_ellipse(stages: &MaskStages, params: &Parameters) -> Option<Target> {
    let t0 = Instant::now();
    let outlines = outer_contours(&stages.blurred);
    if outlines.is_empty() {
        return None;
    }

    let min_area = params.min_contour_area as f64;
    let candidates: Vec<EllipseCandidate<'_>> = outlines
        .iter()
        .filter_map(|outline| {
            let area = outline.area();
            if area < min_area {
                return None;
            }
            let fit = outline.fit_ellipse()?;
            Some(EllipseCandidate { outline, area, fit })
        })
        .collect();
    log::debug!(
        "contours: {} outlines, {} fitted in {:.2?}",
        outlines.len(),
        candidates.len(),
        t0.elapsed()
    );

    let keypoint = BlobDetector::new(params.blob.clone()).representative_point(&outlines);
    let gated: Vec<&EllipseCandidate<'_>> = match keypoint {
        Some(p) => candidates.iter().filter(|c| c.outline.contains(p)).collect(),
        None => Vec::new(),
    };
    let pool: Vec<&EllipseCandidate<'_>> = if gated.is_empty() {
        candidates.iter().collect()
    } else {
        gated
    };

    pool.into_iter()
        .max_by(|a, b| a.area.total_cmp(&b.area))
        .map(|c| Target::Ellipse {
            cx: c.fit.center.x,
            cy: c.fit.center.y,
            axis1: c.fit.axis1,
            axis2: c.fit.axis2,
            angle: c.fit.angle,
        })
}
