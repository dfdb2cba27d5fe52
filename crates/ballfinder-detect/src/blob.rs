//! Blob keypoints on a binary mask.
//!
//! A blob is an outer contour that passes the area, circularity, convexity
//! and inertia filters from [`BlobParams`]. The detector uses the centroid of
//! the largest blob to pick which contour is the target.

use nalgebra::Point2;

use crate::contour::Outline;
use crate::params::BlobParams;

/// A blob that passed every filter.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BlobKeypoint {
    pub center: Point2<f32>,
    pub area: f32,
    pub circularity: f32,
    pub convexity: f32,
    pub inertia: f32,
}

/// Shape statistics for one outline, or `None` when it has no area.
pub fn measure(outline: &Outline) -> Option<BlobKeypoint> {
    let moments = outline.moments()?;
    let area = moments.area;
    let perimeter = outline.perimeter();
    if perimeter <= 0.0 {
        return None;
    }
    let circularity = 4.0 * std::f64::consts::PI * area / (perimeter * perimeter);
    let hull_area = outline.convex_hull().area();
    let convexity = if hull_area > 0.0 { area / hull_area } else { 0.0 };

    Some(BlobKeypoint {
        center: Point2::new(moments.centroid.x as f32, moments.centroid.y as f32),
        area: area as f32,
        circularity: circularity.min(1.0) as f32,
        convexity: convexity.min(1.0) as f32,
        inertia: moments.inertia_ratio() as f32,
    })
}

/// Threshold-based keypoint detector over precomputed outlines.
#[derive(Clone, Debug)]
pub struct BlobDetector {
    params: BlobParams,
}

impl BlobDetector {
    pub fn new(params: BlobParams) -> Self {
        Self { params }
    }

    fn passes(&self, k: &BlobKeypoint) -> bool {
        k.area >= self.params.min_area
            && k.circularity >= self.params.min_circularity
            && k.convexity >= self.params.min_convexity
            && k.inertia >= self.params.min_inertia
    }

    /// All keypoints, largest area first.
    pub fn detect(&self, outlines: &[Outline]) -> Vec<BlobKeypoint> {
        let mut out: Vec<BlobKeypoint> = outlines
            .iter()
            .filter_map(measure)
            .filter(|k| self.passes(k))
            .collect();
        out.sort_by(|a, b| b.area.total_cmp(&a.area));
        out
    }

    /// Center of the largest passing blob.
    pub fn representative_point(&self, outlines: &[Outline]) -> Option<Point2<f32>> {
        self.detect(outlines).first().map(|k| k.center)
    }
}
