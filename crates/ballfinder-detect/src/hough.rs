//! Gradient-voting circle transform.
//!
//! Edge pixels vote along both senses of their gradient direction at every
//! radius in bounds. Circles produce peaks at their centers because the
//! gradients of a round boundary converge radially. Each accepted center then
//! gets the radius with the most edge support.

use image::GrayImage;

use crate::params::HoughParams;

/// A proposed circle in image pixel coordinates.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CircleCandidate {
    pub cx: f32,
    pub cy: f32,
    pub radius: f32,
    /// 3x3 accumulator support of the center.
    pub votes: u32,
    /// Edge pixels within one pixel of the chosen radius.
    pub support: u32,
}

const CENTER_SMOOTH_SIGMA: f32 = 1.0;

struct Accumulator {
    w: usize,
    h: usize,
    inv_dp: f32,
    bins: Vec<u32>,
}

impl Accumulator {
    /// The accumulator is never finer than the image; `dp < 1` would only
    /// multiply its size.
    fn new(width: u32, height: u32, dp: f32) -> Self {
        let dp = if dp.is_finite() { dp.max(1.0) } else { 1.0 };
        let w = ((width as f32 / dp).ceil() as usize).max(1) + 1;
        let h = ((height as f32 / dp).ceil() as usize).max(1) + 1;
        Self {
            w,
            h,
            inv_dp: 1.0 / dp,
            bins: vec![0; w * h],
        }
    }

    #[inline]
    fn vote(&mut self, x: f32, y: f32) {
        let bx = (x * self.inv_dp).round();
        let by = (y * self.inv_dp).round();
        if bx < 0.0 || by < 0.0 {
            return;
        }
        let (bx, by) = (bx as usize, by as usize);
        if bx < self.w && by < self.h {
            self.bins[by * self.w + bx] += 1;
        }
    }

    fn box_sums(&self) -> Vec<u32> {
        let mut sums = vec![0u32; self.bins.len()];
        for y in 0..self.h {
            for x in 0..self.w {
                let mut s = 0;
                for ny in y.saturating_sub(1)..=(y + 1).min(self.h - 1) {
                    for nx in x.saturating_sub(1)..=(x + 1).min(self.w - 1) {
                        s += self.bins[ny * self.w + nx];
                    }
                }
                sums[y * self.w + x] = s;
            }
        }
        sums
    }
}

/// Run the circle transform.
///
/// `edges` selects the voting pixels (non-zero = edge) and `mask` provides
/// the gradient direction. Candidates are ordered strongest first.
pub fn find_circles(edges: &GrayImage, mask: &GrayImage, params: &HoughParams) -> Vec<CircleCandidate> {
    let (w, h) = edges.dimensions();
    if w < 3 || h < 3 || mask.dimensions() != (w, h) {
        return Vec::new();
    }

    let smoothed = imageproc::filter::gaussian_blur_f32(mask, CENTER_SMOOTH_SIGMA);
    let gx = imageproc::gradients::horizontal_sobel(&smoothed);
    let gy = imageproc::gradients::vertical_sobel(&smoothed);

    let edge_points: Vec<(u32, u32)> = edges
        .enumerate_pixels()
        .filter(|(_, _, p)| p.0[0] > 0)
        .map(|(x, y, _)| (x, y))
        .collect();
    if edge_points.is_empty() {
        return Vec::new();
    }

    // no circle centered in the image can reach edge pixels beyond the diagonal
    let diagonal = (w as f64).hypot(h as f64).ceil() as u32;
    let min_r = params.min_radius.max(1);
    if min_r > diagonal {
        return Vec::new();
    }
    let max_r = params.max_radius.min(diagonal).max(min_r);

    let mut acc = Accumulator::new(w, h, params.dp);
    for &(x, y) in &edge_points {
        let gxv = gx.get_pixel(x, y).0[0] as f32;
        let gyv = gy.get_pixel(x, y).0[0] as f32;
        let mag = (gxv * gxv + gyv * gyv).sqrt();
        if mag < params.param1 || mag <= f32::EPSILON {
            continue;
        }
        let (dx, dy) = (gxv / mag, gyv / mag);
        for sign in [-1.0f32, 1.0] {
            for r in min_r..=max_r {
                let r = r as f32;
                acc.vote(x as f32 + sign * dx * r, y as f32 + sign * dy * r);
            }
        }
    }

    let centers = pick_centers(&acc, params);
    log::trace!("circle transform: {} edge px, {} centers", edge_points.len(), centers.len());

    let mut out = Vec::new();
    for (cx, cy, votes) in centers {
        let Some((radius, support)) = estimate_radius(&edge_points, cx, cy, min_r, max_r) else {
            continue;
        };
        if (support as f32) < params.param2 {
            continue;
        }
        out.push(CircleCandidate {
            cx,
            cy,
            radius,
            votes,
            support,
        });
    }
    out
}

/// Local maxima of the 3x3 accumulator sums above `param2`, strongest first,
/// at least `min_dist` apart. Positions are refined to the vote centroid.
fn pick_centers(acc: &Accumulator, params: &HoughParams) -> Vec<(f32, f32, u32)> {
    let sums = acc.box_sums();
    let (w, h) = (acc.w, acc.h);

    let mut peaks = Vec::new();
    for y in 0..h {
        for x in 0..w {
            let idx = y * w + x;
            let v = sums[idx];
            if v == 0 || (v as f32) < params.param2 {
                continue;
            }
            let mut is_max = true;
            'nbr: for ny in y.saturating_sub(1)..=(y + 1).min(h - 1) {
                for nx in x.saturating_sub(1)..=(x + 1).min(w - 1) {
                    let nidx = ny * w + nx;
                    if nidx == idx {
                        continue;
                    }
                    if sums[nidx] > v || (sums[nidx] == v && nidx < idx) {
                        is_max = false;
                        break 'nbr;
                    }
                }
            }
            if is_max {
                peaks.push((idx, v));
            }
        }
    }
    peaks.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));

    let dp = 1.0 / acc.inv_dp;
    let min_dist_sq = params.min_dist * params.min_dist;
    let mut accepted: Vec<(f32, f32, u32)> = Vec::new();
    for (idx, v) in peaks {
        let (bx, by) = (idx % w, idx / w);
        let (mut sx, mut sy, mut sw) = (0.0f32, 0.0f32, 0.0f32);
        for ny in by.saturating_sub(1)..=(by + 1).min(h - 1) {
            for nx in bx.saturating_sub(1)..=(bx + 1).min(w - 1) {
                let c = acc.bins[ny * w + nx] as f32;
                sx += c * nx as f32;
                sy += c * ny as f32;
                sw += c;
            }
        }
        if sw <= 0.0 {
            continue;
        }
        let (cx, cy) = (sx / sw * dp, sy / sw * dp);
        let far_enough = accepted.iter().all(|&(ax, ay, _)| {
            let (ddx, ddy) = (ax - cx, ay - cy);
            ddx * ddx + ddy * ddy >= min_dist_sq
        });
        if far_enough {
            accepted.push((cx, cy, v));
        }
    }
    accepted
}

/// Radius whose 1-px bin (plus both neighbours) holds the most edge pixels.
///
/// Returns the support-weighted mean distance over the winning bins and the
/// support count.
fn estimate_radius(
    edge_points: &[(u32, u32)],
    cx: f32,
    cy: f32,
    min_r: u32,
    max_r: u32,
) -> Option<(f32, u32)> {
    let nbins = (max_r - min_r + 1) as usize;
    let mut hist = vec![0u32; nbins];
    let mut dist_sum = vec![0.0f32; nbins];
    for &(x, y) in edge_points {
        let (dx, dy) = (x as f32 - cx, y as f32 - cy);
        let d = (dx * dx + dy * dy).sqrt();
        let bin = d.round();
        if bin < min_r as f32 || bin > max_r as f32 {
            continue;
        }
        let b = bin as usize - min_r as usize;
        hist[b] += 1;
        dist_sum[b] += d;
    }

    let window = |b: usize| b.saturating_sub(1)..=(b + 1).min(nbins - 1);
    let mut best: Option<(usize, u32)> = None;
    for b in 0..nbins {
        let s: u32 = window(b).map(|i| hist[i]).sum();
        if s > 0 && best.is_none_or(|(_, bs)| s > bs) {
            best = Some((b, s));
        }
    }
    let (b, support) = best?;
    let total: f32 = window(b).map(|i| dist_sum[i]).sum();
    Some((total / support as f32, support))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Luma;

    fn disk_mask(w: u32, h: u32, disks: &[(f32, f32, f32)]) -> GrayImage {
        GrayImage::from_fn(w, h, |x, y| {
            let inside = disks.iter().any(|&(cx, cy, r)| {
                let (dx, dy) = (x as f32 - cx, y as f32 - cy);
                dx * dx + dy * dy <= r * r
            });
            Luma([if inside { 255 } else { 0 }])
        })
    }

    fn edges_of(mask: &GrayImage) -> GrayImage {
        imageproc::edges::canny(mask, 100.0, 200.0)
    }

    #[test]
    fn finds_single_disk() {
        let mask = disk_mask(320, 240, &[(160.0, 120.0, 40.0)]);
        let edges = edges_of(&mask);
        let circles = find_circles(&edges, &mask, &HoughParams::default());
        assert!(!circles.is_empty());
        let best = circles[0];
        assert!((best.cx - 160.0).abs() <= 2.0, "cx = {}", best.cx);
        assert!((best.cy - 120.0).abs() <= 2.0, "cy = {}", best.cy);
        assert!((best.radius - 40.0).abs() <= 2.0, "r = {}", best.radius);
    }

    #[test]
    fn respects_min_dist_between_centers() {
        let mask = disk_mask(320, 240, &[(80.0, 120.0, 30.0), (230.0, 120.0, 45.0)]);
        let edges = edges_of(&mask);
        let params = HoughParams::default();
        let circles = find_circles(&edges, &mask, &params);
        for (i, a) in circles.iter().enumerate() {
            for b in &circles[i + 1..] {
                let d = ((a.cx - b.cx).powi(2) + (a.cy - b.cy).powi(2)).sqrt();
                assert!(d >= params.min_dist);
            }
        }
        assert!(circles
            .iter()
            .any(|c| (c.cx - 230.0).abs() < 3.0 && (c.radius - 45.0).abs() < 3.0));
        assert!(circles
            .iter()
            .any(|c| (c.cx - 80.0).abs() < 3.0 && (c.radius - 30.0).abs() < 3.0));
    }

    #[test]
    fn empty_edges_yield_nothing() {
        let mask = GrayImage::new(64, 64);
        let edges = GrayImage::new(64, 64);
        assert!(find_circles(&edges, &mask, &HoughParams::default()).is_empty());
    }

    #[test]
    fn coarse_accumulator_still_locates_center() {
        let mask = disk_mask(320, 240, &[(150.0, 110.0, 50.0)]);
        let edges = edges_of(&mask);
        let params = HoughParams {
            dp: 2.0,
            ..HoughParams::default()
        };
        let circles = find_circles(&edges, &mask, &params);
        assert!(!circles.is_empty());
        assert!((circles[0].cx - 150.0).abs() <= 3.0);
        assert!((circles[0].radius - 50.0).abs() <= 3.0);
    }

    #[test]
    fn sub_unit_dp_never_grows_the_accumulator() {
        let full = Accumulator::new(640, 480, 1.0);
        for dp in [0.5, 1e-6, 0.0, -3.0, f32::NAN] {
            let acc = Accumulator::new(640, 480, dp);
            assert_eq!((acc.w, acc.h), (full.w, full.h), "dp = {dp}");
            assert_eq!(acc.bins.len(), full.bins.len());
        }
    }

    #[test]
    fn oversized_radius_bounds_are_capped_by_the_image() {
        let mask = disk_mask(160, 120, &[(80.0, 60.0, 30.0)]);
        let edges = edges_of(&mask);
        let params = HoughParams {
            max_radius: u32::MAX,
            ..HoughParams::default()
        };
        let circles = find_circles(&edges, &mask, &params);
        assert!(circles.iter().any(|c| (c.radius - 30.0).abs() <= 2.0));

        let unreachable = HoughParams {
            min_radius: u32::MAX - 1,
            max_radius: u32::MAX,
            ..HoughParams::default()
        };
        assert!(find_circles(&edges, &mask, &unreachable).is_empty());
    }
}
