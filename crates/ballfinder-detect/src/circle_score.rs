//! Composite scoring of circle candidates against an edge image.
//!
//! Two heuristics judge how well the edge evidence around a candidate matches
//! an ideal circle outline:
//!
//! - **ring density** (lower is better): edge pixels deep inside the candidate
//!   are penalized with weights growing towards the center, normalized by the
//!   number of edge pixels within `r + 5`;
//! - **coverage** (higher is better): the number of the 100 sampled
//!   circumference points that have an edge pixel within a ±3 px window.

use image::GrayImage;

#[cfg(feature = "tracing")]
use tracing::instrument;

use crate::hough::CircleCandidate;
use crate::params::CompositeScoreParams;

/// Edge values above this count as edge pixels for the ring density.
pub const EDGE_THRESHOLD: u8 = 5;
/// Number of circumference samples for the coverage score.
pub const COVERAGE_SAMPLES: u32 = 100;
/// Half-width of the square window searched around each sample.
pub const COVERAGE_WINDOW: i32 = 3;
/// Margin added to the radius when counting the normalizing edge pixels.
pub const DENSITY_MARGIN: i32 = 5;

/// Candidate with both scores attached.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ScoredCircle {
    pub candidate: CircleCandidate,
    pub ring_density: f32,
    pub coverage: u32,
}

/// Integer circle as used for rasterized scoring.
#[derive(Clone, Copy, Debug)]
struct PixelCircle {
    cx: i32,
    cy: i32,
    r: i32,
}

impl From<&CircleCandidate> for PixelCircle {
    fn from(c: &CircleCandidate) -> Self {
        Self {
            cx: c.cx.round() as i32,
            cy: c.cy.round() as i32,
            r: c.radius.round().max(0.0) as i32,
        }
    }
}

impl PixelCircle {
    /// Weight of the innermost painted disk containing a point at squared
    /// distance `d2`, or 0 outside all of them.
    ///
    /// Disks at `3r/4`, `r/2`, `r/4` carry weights `r/4`, `r/2`, `3r/4`;
    /// inner disks override outer ones.
    #[inline]
    fn weight_at(&self, d2: i32) -> u32 {
        let r = self.r;
        let rings = [(r / 4, 3 * r / 4), (r / 2, r / 2), (3 * r / 4, r / 4)];
        for (radius, weight) in rings {
            if d2 <= radius * radius {
                return weight.max(0) as u32;
            }
        }
        0
    }
}

#[inline]
fn edge_at(edges: &GrayImage, x: i32, y: i32) -> Option<u8> {
    if x < 0 || y < 0 || x >= edges.width() as i32 || y >= edges.height() as i32 {
        return None;
    }
    Some(edges.get_pixel(x as u32, y as u32).0[0])
}

/// Ring-density score (lower is better).
pub fn ring_density_score(edges: &GrayImage, candidate: &CircleCandidate) -> f32 {
    let c = PixelCircle::from(candidate);
    let outer = c.r + DENSITY_MARGIN;
    let outer2 = outer * outer;

    let mut weighted: u64 = 0;
    let mut points: u64 = 0;
    for y in (c.cy - outer)..=(c.cy + outer) {
        for x in (c.cx - outer)..=(c.cx + outer) {
            let Some(v) = edge_at(edges, x, y) else {
                continue;
            };
            if v <= EDGE_THRESHOLD {
                continue;
            }
            let (dx, dy) = (x - c.cx, y - c.cy);
            let d2 = dx * dx + dy * dy;
            if d2 > outer2 {
                continue;
            }
            points += 1;
            weighted += c.weight_at(d2) as u64;
        }
    }
    weighted as f32 / points.max(1) as f32
}

fn window_has_edge(edges: &GrayImage, x: i32, y: i32) -> bool {
    for wy in (y - COVERAGE_WINDOW)..=(y + COVERAGE_WINDOW) {
        for wx in (x - COVERAGE_WINDOW)..=(x + COVERAGE_WINDOW) {
            if edge_at(edges, wx, wy).is_some_and(|v| v > 0) {
                return true;
            }
        }
    }
    false
}

/// Circumference-coverage score in `0..=100` (higher is better).
pub fn coverage_score(edges: &GrayImage, candidate: &CircleCandidate) -> u32 {
    let c = PixelCircle::from(candidate);
    let r = c.r as f32;
    (0..COVERAGE_SAMPLES)
        .filter(|&k| {
            let phi = k as f32 * std::f32::consts::TAU / COVERAGE_SAMPLES as f32;
            let x = c.cx + (r * phi.cos()).round() as i32;
            let y = c.cy + (r * phi.sin()).round() as i32;
            window_has_edge(edges, x, y)
        })
        .count() as u32
}

/// Both scores for one candidate, regardless of any threshold.
pub fn composite_score(edges: &GrayImage, candidate: &CircleCandidate) -> ScoredCircle {
    ScoredCircle {
        candidate: *candidate,
        ring_density: ring_density_score(edges, candidate),
        coverage: coverage_score(edges, candidate),
    }
}

/// Keep candidates with ring density `<= max_ring_density`, then, among
/// those only, candidates with coverage `>= min_coverage`.
///
/// Coverage is never computed for candidates rejected by ring density.
/// Input order is preserved.
#[cfg_attr(
    feature = "tracing",
    instrument(level = "debug", skip(edges, candidates), fields(n = candidates.len()))
)]
pub fn filter_by_composite_score(
    edges: &GrayImage,
    candidates: &[CircleCandidate],
    max_ring_density: f32,
    min_coverage: u32,
) -> Vec<ScoredCircle> {
    let dense_ok: Vec<(CircleCandidate, f32)> = candidates
        .iter()
        .map(|c| (*c, ring_density_score(edges, c)))
        .filter(|&(_, d)| d <= max_ring_density)
        .collect();

    let kept: Vec<ScoredCircle> = dense_ok
        .into_iter()
        .map(|(candidate, ring_density)| ScoredCircle {
            candidate,
            ring_density,
            coverage: coverage_score(edges, &candidate),
        })
        .filter(|s| s.coverage >= min_coverage)
        .collect();

    log::debug!(
        "composite filter kept {}/{} candidates",
        kept.len(),
        candidates.len()
    );
    kept
}

/// [`filter_by_composite_score`] with thresholds taken from parameters.
pub fn filter_with_params(
    edges: &GrayImage,
    candidates: &[CircleCandidate],
    params: &CompositeScoreParams,
) -> Vec<ScoredCircle> {
    filter_by_composite_score(edges, candidates, params.max_ring_density, params.min_coverage)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use image::Luma;
    use imageproc::drawing::{draw_filled_circle_mut, draw_hollow_circle_mut};

    fn candidate(cx: f32, cy: f32, radius: f32) -> CircleCandidate {
        CircleCandidate {
            cx,
            cy,
            radius,
            votes: 0,
            support: 0,
        }
    }

    fn ring_image(cx: i32, cy: i32, r: i32) -> GrayImage {
        let mut img = GrayImage::new(200, 200);
        draw_hollow_circle_mut(&mut img, (cx, cy), r, Luma([255u8]));
        img
    }

    #[test]
    fn perfect_circle_has_full_coverage_and_zero_density() {
        let edges = ring_image(100, 100, 40);
        let c = candidate(100.0, 100.0, 40.0);
        assert_eq!(coverage_score(&edges, &c), COVERAGE_SAMPLES);
        assert_relative_eq!(ring_density_score(&edges, &c), 0.0);
    }

    #[test]
    fn empty_edges_score_zero_coverage() {
        let edges = GrayImage::new(100, 100);
        let c = candidate(50.0, 50.0, 20.0);
        assert_eq!(coverage_score(&edges, &c), 0);
        assert_relative_eq!(ring_density_score(&edges, &c), 0.0);
    }

    #[test]
    fn central_clutter_scores_high_density() {
        let mut edges = GrayImage::new(200, 200);
        draw_filled_circle_mut(&mut edges, (100, 100), 8, Luma([255u8]));
        let c = candidate(100.0, 100.0, 40.0);
        // every pixel sits inside the r/4 disk, weight 3r/4 = 30
        assert_relative_eq!(ring_density_score(&edges, &c), 30.0);
    }

    #[test]
    fn faint_edges_are_ignored_by_density() {
        let mut edges = GrayImage::new(100, 100);
        draw_filled_circle_mut(&mut edges, (50, 50), 5, Luma([EDGE_THRESHOLD]));
        let c = candidate(50.0, 50.0, 30.0);
        assert_relative_eq!(ring_density_score(&edges, &c), 0.0);
    }

    #[test]
    fn half_arc_covers_about_half() {
        let mut edges = GrayImage::new(200, 200);
        for k in 0..720 {
            let phi = k as f32 * std::f32::consts::PI / 720.0;
            let x = 100.0 + 40.0 * phi.cos();
            let y = 100.0 + 40.0 * phi.sin();
            edges.put_pixel(x.round() as u32, y.round() as u32, Luma([255]));
        }
        let score = coverage_score(&edges, &candidate(100.0, 100.0, 40.0));
        assert!((48..=60).contains(&score), "score = {score}");
    }

    #[test]
    fn filter_is_idempotent_and_bounded_by_density_pass() {
        let mut edges = ring_image(60, 60, 30);
        draw_filled_circle_mut(&mut edges, (150, 150), 8, Luma([255u8]));
        let candidates = vec![
            candidate(60.0, 60.0, 30.0),
            candidate(150.0, 150.0, 40.0),
            candidate(150.0, 40.0, 20.0),
        ];

        let first = filter_by_composite_score(&edges, &candidates, 20.0, 60);
        let second = filter_by_composite_score(&edges, &candidates, 20.0, 60);
        assert_eq!(first, second);

        let density_only = candidates
            .iter()
            .filter(|c| ring_density_score(&edges, c) <= 20.0)
            .count();
        assert!(first.len() <= density_only);

        assert_eq!(first.len(), 1);
        assert_relative_eq!(first[0].candidate.cx, 60.0);
        assert_eq!(first[0].coverage, COVERAGE_SAMPLES);
    }

    #[test]
    fn loose_thresholds_keep_everything_in_order() {
        let edges = ring_image(100, 100, 40);
        let candidates = vec![candidate(100.0, 100.0, 40.0), candidate(20.0, 20.0, 10.0)];
        let kept = filter_by_composite_score(&edges, &candidates, f32::MAX, 0);
        assert_eq!(kept.len(), 2);
        assert_relative_eq!(kept[1].candidate.cx, 20.0);
        let scored: Vec<ScoredCircle> = candidates.iter().map(|c| composite_score(&edges, c)).collect();
        assert_eq!(kept, scored);
    }

    #[test]
    fn composite_score_pairs_both_heuristics() {
        let edges = ring_image(100, 100, 40);
        let s = composite_score(&edges, &candidate(100.0, 100.0, 40.0));
        assert_eq!(s.coverage, COVERAGE_SAMPLES);
        assert_relative_eq!(s.ring_density, 0.0);
        assert_relative_eq!(s.candidate.radius, 40.0);
    }
}
