//! Outer contours of a binary mask and their polygon geometry.
//!
//! Contours come from [`imageproc::contours::find_contours`]; every quantity
//! here (area, moments, ellipse) treats the traced border pixels as the
//! vertices of a closed polygon.

use image::GrayImage;
use imageproc::contours::{find_contours, BorderType};
use imageproc::geometry::{contour_area, convex_hull};
use imageproc::point::Point;
use nalgebra::{Matrix2, Point2};

/// Closed polygon traced along the outer border of a mask component.
#[derive(Clone, Debug, PartialEq)]
pub struct Outline {
    pub points: Vec<Point2<f32>>,
}

/// Area-normalized polygon moments.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Moments {
    /// Unsigned polygon area.
    pub area: f64,
    pub centroid: Point2<f64>,
    /// Central second moments divided by the area.
    pub mu20: f64,
    pub mu11: f64,
    pub mu02: f64,
}

impl Moments {
    /// Principal variances `(major, minor)` and the major-axis direction in radians.
    pub fn principal_axes(&self) -> (f64, f64, f64) {
        let cov = Matrix2::new(self.mu20, self.mu11, self.mu11, self.mu02);
        let eig = cov.symmetric_eigen();
        let (major, minor) = if eig.eigenvalues[0] >= eig.eigenvalues[1] {
            (0, 1)
        } else {
            (1, 0)
        };
        let dir = eig.eigenvectors.column(major);
        let theta = dir[1].atan2(dir[0]);
        (
            eig.eigenvalues[major].max(0.0),
            eig.eigenvalues[minor].max(0.0),
            theta,
        )
    }

    /// Ratio of the minor to the major principal variance, in `[0, 1]`.
    pub fn inertia_ratio(&self) -> f64 {
        let (major, minor, _) = self.principal_axes();
        if major <= f64::EPSILON {
            return 0.0;
        }
        (minor / major).clamp(0.0, 1.0)
    }
}

/// Ellipse with the same area-normalized second moments as a polygon.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct EllipseFit {
    pub center: Point2<f32>,
    /// Major semi-axis.
    pub axis1: f32,
    /// Minor semi-axis.
    pub axis2: f32,
    /// Rotation of the major axis from +x, degrees in `[0, 180)`.
    pub angle: f32,
}

/// Minimum number of vertices required for an ellipse fit.
pub const MIN_FIT_POINTS: usize = 5;

impl Outline {
    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    fn edges(&self) -> impl Iterator<Item = (Point2<f64>, Point2<f64>)> + '_ {
        let n = self.points.len();
        (0..n).map(move |i| {
            let a = self.points[i];
            let b = self.points[(i + 1) % n];
            (a.cast::<f64>(), b.cast::<f64>())
        })
    }

    /// Unsigned shoelace area.
    pub fn area(&self) -> f64 {
        let pts: Vec<Point<f32>> = self.points.iter().map(|p| Point::new(p.x, p.y)).collect();
        contour_area(&pts)
    }

    /// Length of the closed polyline.
    pub fn perimeter(&self) -> f64 {
        if self.points.len() < 2 {
            return 0.0;
        }
        self.edges().map(|(a, b)| (b - a).norm()).sum()
    }

    /// Polygon moments via Green's theorem, or `None` for degenerate polygons.
    pub fn moments(&self) -> Option<Moments> {
        if self.points.len() < 3 {
            return None;
        }
        let (mut a2, mut sx, mut sy, mut sxx, mut syy, mut sxy) = (0.0, 0.0, 0.0, 0.0, 0.0, 0.0);
        for (p, q) in self.edges() {
            let c = p.x * q.y - q.x * p.y;
            a2 += c;
            sx += (p.x + q.x) * c;
            sy += (p.y + q.y) * c;
            sxx += (p.x * p.x + p.x * q.x + q.x * q.x) * c;
            syy += (p.y * p.y + p.y * q.y + q.y * q.y) * c;
            sxy += (p.x * q.y + 2.0 * p.x * p.y + 2.0 * q.x * q.y + q.x * p.y) * c;
        }
        let signed_area = a2 * 0.5;
        if signed_area.abs() < 1e-9 {
            return None;
        }
        let cx = sx / (6.0 * signed_area);
        let cy = sy / (6.0 * signed_area);
        let m20 = sxx / (12.0 * signed_area);
        let m02 = syy / (12.0 * signed_area);
        let m11 = sxy / (24.0 * signed_area);
        Some(Moments {
            area: signed_area.abs(),
            centroid: Point2::new(cx, cy),
            mu20: m20 - cx * cx,
            mu11: m11 - cx * cy,
            mu02: m02 - cy * cy,
        })
    }

    /// Fit an ellipse, or `None` when the outline has fewer than
    /// [`MIN_FIT_POINTS`] vertices or no area.
    pub fn fit_ellipse(&self) -> Option<EllipseFit> {
        if self.points.len() < MIN_FIT_POINTS {
            return None;
        }
        let m = self.moments()?;
        let (major, minor, theta) = m.principal_axes();
        // uniform ellipse: variance along a semi-axis s is s^2 / 4
        let axis1 = 2.0 * major.sqrt();
        let axis2 = 2.0 * minor.sqrt();
        let mut angle = theta.to_degrees().rem_euclid(180.0);
        if angle >= 180.0 {
            angle = 0.0;
        }
        Some(EllipseFit {
            center: Point2::new(m.centroid.x as f32, m.centroid.y as f32),
            axis1: axis1 as f32,
            axis2: axis2 as f32,
            angle: angle as f32,
        })
    }

    /// Even-odd point-in-polygon test; points on the border count as inside.
    pub fn contains(&self, p: Point2<f32>) -> bool {
        let n = self.points.len();
        if n == 0 {
            return false;
        }
        if n < 3 {
            return self.points.iter().any(|&q| (q - p).norm() < 0.5);
        }
        let mut inside = false;
        let mut j = n - 1;
        for i in 0..n {
            let (a, b) = (self.points[i], self.points[j]);
            if on_segment(a, b, p) {
                return true;
            }
            if (a.y > p.y) != (b.y > p.y) {
                let x_cross = a.x + (p.y - a.y) * (b.x - a.x) / (b.y - a.y);
                if p.x < x_cross {
                    inside = !inside;
                }
            }
            j = i;
        }
        inside
    }

    /// Convex hull of the vertices snapped to the pixel grid.
    ///
    /// Collinear vertices are dropped, so a hull has at most as many points as
    /// the outline.
    pub fn convex_hull(&self) -> Outline {
        let pts: Vec<Point<i32>> = self
            .points
            .iter()
            .map(|p| Point::new(p.x.round() as i32, p.y.round() as i32))
            .collect();
        Outline {
            points: convex_hull(pts)
                .into_iter()
                .map(|p| Point2::new(p.x as f32, p.y as f32))
                .collect(),
        }
    }
}

fn on_segment(a: Point2<f32>, b: Point2<f32>, p: Point2<f32>) -> bool {
    let cross = (b.x - a.x) * (p.y - a.y) - (b.y - a.y) * (p.x - a.x);
    if cross.abs() > 1e-4 {
        return false;
    }
    p.x >= a.x.min(b.x) && p.x <= a.x.max(b.x) && p.y >= a.y.min(b.y) && p.y <= a.y.max(b.y)
}

/// Outer borders of every foreground component in `mask` (non-zero = foreground).
pub fn outer_contours(mask: &GrayImage) -> Vec<Outline> {
    find_contours::<i32>(mask)
        .into_iter()
        .filter(|c| c.border_type == BorderType::Outer)
        .map(|c| Outline {
            points: c
                .points
                .iter()
                .map(|p| Point2::new(p.x as f32, p.y as f32))
                .collect(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use image::Luma;
    use imageproc::drawing::{draw_filled_ellipse_mut, draw_filled_rect_mut};
    use imageproc::rect::Rect;

    fn square(x0: f32, y0: f32, side: f32) -> Outline {
        Outline {
            points: vec![
                Point2::new(x0, y0),
                Point2::new(x0 + side, y0),
                Point2::new(x0 + side, y0 + side),
                Point2::new(x0, y0 + side),
            ],
        }
    }

    #[test]
    fn square_area_perimeter_and_centroid() {
        let sq = square(2.0, 3.0, 10.0);
        assert_relative_eq!(sq.area(), 100.0);
        assert_relative_eq!(sq.perimeter(), 40.0);
        let m = sq.moments().unwrap();
        assert_relative_eq!(m.centroid.x, 7.0, epsilon = 1e-9);
        assert_relative_eq!(m.centroid.y, 8.0, epsilon = 1e-9);
        // uniform square: variance side^2 / 12 along both axes
        assert_relative_eq!(m.mu20, 100.0 / 12.0, epsilon = 1e-9);
        assert_relative_eq!(m.mu11, 0.0, epsilon = 1e-9);
        assert_relative_eq!(m.inertia_ratio(), 1.0, epsilon = 1e-9);
    }

    #[test]
    fn orientation_does_not_change_area_or_moments() {
        let sq = square(0.0, 0.0, 4.0);
        let mut rev = sq.clone();
        rev.points.reverse();
        assert_relative_eq!(sq.area(), rev.area());
        let (a, b) = (sq.moments().unwrap(), rev.moments().unwrap());
        assert_relative_eq!(a.mu20, b.mu20, epsilon = 1e-9);
        assert_relative_eq!(a.centroid.x, b.centroid.x, epsilon = 1e-9);
    }

    #[test]
    fn contains_interior_border_and_exterior() {
        let sq = square(0.0, 0.0, 10.0);
        assert!(sq.contains(Point2::new(5.0, 5.0)));
        assert!(sq.contains(Point2::new(0.0, 4.0)));
        assert!(!sq.contains(Point2::new(11.0, 5.0)));
        assert!(!sq.contains(Point2::new(-0.5, -0.5)));
    }

    #[test]
    fn hull_of_concave_polygon_is_its_bounding_square() {
        let notch = Outline {
            points: vec![
                Point2::new(0.0, 0.0),
                Point2::new(10.0, 0.0),
                Point2::new(10.0, 10.0),
                Point2::new(5.0, 5.0),
                Point2::new(0.0, 10.0),
            ],
        };
        let hull = notch.convex_hull();
        assert_eq!(hull.len(), 4);
        assert_relative_eq!(hull.area(), 100.0);
        assert!(notch.area() < hull.area());
    }

    #[test]
    fn traced_disk_hull_encloses_its_outline() {
        let mut mask = GrayImage::new(80, 80);
        draw_filled_ellipse_mut(&mut mask, (40, 40), 20, 20, Luma([255u8]));
        let outline = outer_contours(&mask).remove(0);
        let hull = outline.convex_hull();
        assert!(hull.len() <= outline.len());
        assert!(hull.area() >= outline.area());
        // a rasterized disk is nearly convex already
        assert!(hull.area() < outline.area() * 1.05, "{} vs {}", hull.area(), outline.area());
        for &p in &outline.points {
            assert!(hull.contains(p), "{p:?} outside hull");
        }
    }

    #[test]
    fn degenerate_outlines_have_no_area() {
        let segment = Outline {
            points: vec![Point2::new(0.0, 0.0), Point2::new(6.0, 0.0)],
        };
        assert_eq!(segment.area(), 0.0);
        assert_eq!(Outline { points: vec![] }.convex_hull().len(), 0);
    }

    #[test]
    fn fits_axis_aligned_ellipse_from_mask() {
        let mut mask = GrayImage::new(200, 160);
        draw_filled_ellipse_mut(&mut mask, (100, 80), 50, 25, Luma([255u8]));
        let outlines = outer_contours(&mask);
        assert_eq!(outlines.len(), 1);
        let fit = outlines[0].fit_ellipse().unwrap();
        assert!((fit.center.x - 100.0).abs() < 1.0);
        assert!((fit.center.y - 80.0).abs() < 1.0);
        assert!((fit.axis1 - 50.0).abs() < 2.0, "axis1 = {}", fit.axis1);
        assert!((fit.axis2 - 25.0).abs() < 2.0, "axis2 = {}", fit.axis2);
        assert!(fit.angle < 2.0 || fit.angle > 178.0, "angle = {}", fit.angle);
    }

    #[test]
    fn holes_are_not_reported() {
        let mut mask = GrayImage::new(60, 60);
        draw_filled_rect_mut(&mut mask, Rect::at(5, 5).of_size(50, 50), Luma([255u8]));
        draw_filled_rect_mut(&mut mask, Rect::at(20, 20).of_size(10, 10), Luma([0u8]));
        assert_eq!(outer_contours(&mask).len(), 1);
    }

    #[test]
    fn tiny_outlines_are_not_fitted() {
        let tri = Outline {
            points: vec![Point2::new(0.0, 0.0), Point2::new(4.0, 0.0), Point2::new(0.0, 4.0)],
        };
        assert!(tri.fit_ellipse().is_none());
        assert!(tri.moments().is_some());
    }
}
