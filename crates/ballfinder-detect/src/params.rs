//! Tunable detection parameters.
//!
//! A [`Parameters`] value is an immutable snapshot: workers read one snapshot
//! per frame and never observe a half-applied update. Every section carries
//! `#[serde(default)]` so partial JSON documents load with documented
//! defaults for the missing fields.

use ballfinder_core::Hsv;
use serde::{Deserialize, Serialize};

/// Errors returned by [`Parameters::validate`].
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum ParamsError {
    #[error("{field} = {value} is out of range (expected {expected})")]
    OutOfRange {
        field: &'static str,
        value: f64,
        expected: &'static str,
    },
    #[error("{field} must not be smaller than {other}")]
    Inverted {
        field: &'static str,
        other: &'static str,
    },
}

/// Which color class the robot is chasing.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TeamColor {
    #[default]
    Red,
    Blue,
}

/// Inclusive HSV interval.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct HsvRange {
    pub lower: Hsv,
    pub upper: Hsv,
}

impl HsvRange {
    pub const fn new(lower: Hsv, upper: Hsv) -> Self {
        Self { lower, upper }
    }

    #[inline]
    pub fn contains(&self, px: Hsv) -> bool {
        px.within(self.lower, self.upper)
    }
}

/// HSV ranges per color class.
///
/// Red hue wraps around 0/180, so red is configured as two ranges whose
/// masks are unioned.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ColorParams {
    pub team: TeamColor,
    pub red1: HsvRange,
    pub red2: HsvRange,
    pub blue: HsvRange,
}

impl Default for ColorParams {
    fn default() -> Self {
        Self {
            team: TeamColor::Red,
            red1: HsvRange::new(Hsv::new(0, 90, 0), Hsv::new(17, 255, 255)),
            red2: HsvRange::new(Hsv::new(170, 90, 0), Hsv::new(180, 255, 255)),
            blue: HsvRange::new(Hsv::new(95, 75, 20), Hsv::new(115, 255, 255)),
        }
    }
}

impl ColorParams {
    /// Ranges whose union forms the color mask for the active team.
    pub fn active_ranges(&self) -> Vec<HsvRange> {
        match self.team {
            TeamColor::Red => vec![self.red1, self.red2],
            TeamColor::Blue => vec![self.blue],
        }
    }
}

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KernelShape {
    #[default]
    Square,
    Ellipse,
}

/// Noise suppression on the color mask.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MorphologyParams {
    /// Opening kernel side in pixels (3..=10).
    pub kernel_size: u32,
    pub kernel_shape: KernelShape,
    /// Median blur aperture (odd).
    pub median_kernel: u32,
}

impl Default for MorphologyParams {
    fn default() -> Self {
        Self {
            kernel_size: 10,
            kernel_shape: KernelShape::Square,
            median_kernel: 5,
        }
    }
}

/// Canny thresholds for the circle strategy's edge image.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EdgeParams {
    pub canny_low: f32,
    pub canny_high: f32,
}

impl Default for EdgeParams {
    fn default() -> Self {
        Self {
            canny_low: 100.0,
            canny_high: 200.0,
        }
    }
}

/// Circle transform settings.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HoughParams {
    /// Inverse accumulator resolution (1 = image resolution, 2 = half).
    pub dp: f32,
    /// Minimum distance between accepted circle centers, in pixels.
    pub min_dist: f32,
    /// Minimum Sobel gradient magnitude for an edge pixel to vote.
    pub param1: f32,
    /// Accumulator threshold for centers and radius support.
    pub param2: f32,
    pub min_radius: u32,
    pub max_radius: u32,
}

impl Default for HoughParams {
    fn default() -> Self {
        Self {
            dp: 1.0,
            min_dist: 100.0,
            param1: 100.0,
            param2: 50.0,
            min_radius: 10,
            max_radius: 200,
        }
    }
}

/// Thresholds for the ring-density / circumference-coverage filter.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompositeScoreParams {
    /// Keep candidates with ring density at or below this value.
    pub max_ring_density: f32,
    /// Keep candidates with at least this many coverage hits (0..=100).
    pub min_coverage: u32,
}

impl Default for CompositeScoreParams {
    fn default() -> Self {
        Self {
            max_ring_density: 20.0,
            min_coverage: 60,
        }
    }
}

/// Blob keypoint filters.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BlobParams {
    pub min_area: f32,
    pub min_circularity: f32,
    pub min_convexity: f32,
    pub min_inertia: f32,
}

impl Default for BlobParams {
    fn default() -> Self {
        Self {
            min_area: 250.0,
            min_circularity: 0.5,
            min_convexity: 0.5,
            min_inertia: 0.1,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Orientation {
    #[default]
    RightsideUp,
    UpsideDown,
}

/// Intermediate stage copied into `DetectionResult::debug_frame`.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DebugStage {
    #[default]
    None,
    ColorFilter,
    Morphology,
    MedianBlur,
    Annotated,
}

/// Detection strategy selector.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    /// Edge image, circle transform, composite-score filter, largest radius.
    Circle,
    /// Contours, ellipse fit, blob keypoint gating, largest contour area.
    #[default]
    Ellipse,
}

/// Full detection parameter snapshot.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Parameters {
    pub color: ColorParams,
    pub morphology: MorphologyParams,
    pub edges: EdgeParams,
    pub hough: HoughParams,
    pub score: CompositeScoreParams,
    pub blob: BlobParams,
    /// Contours below this polygon area are ignored by the ellipse strategy.
    pub min_contour_area: f32,
    pub orientation: Orientation,
    pub debug_stage: DebugStage,
    pub strategy: Strategy,
}

impl Default for Parameters {
    fn default() -> Self {
        Self {
            color: ColorParams::default(),
            morphology: MorphologyParams::default(),
            edges: EdgeParams::default(),
            hough: HoughParams::default(),
            score: CompositeScoreParams::default(),
            blob: BlobParams::default(),
            min_contour_area: 250.0,
            orientation: Orientation::RightsideUp,
            debug_stage: DebugStage::None,
            strategy: Strategy::Ellipse,
        }
    }
}

impl Parameters {
    /// Check every field against its schema range.
    pub fn validate(&self) -> Result<(), ParamsError> {
        for (name, range) in [
            ("color.red1", &self.color.red1),
            ("color.red2", &self.color.red2),
            ("color.blue", &self.color.blue),
        ] {
            for hue in [range.lower.h, range.upper.h] {
                if hue > 180 {
                    return Err(ParamsError::OutOfRange {
                        field: hue_field(name),
                        value: hue as f64,
                        expected: "0..=180",
                    });
                }
            }
        }

        let m = &self.morphology;
        if !(3..=10).contains(&m.kernel_size) {
            return Err(out_of_range("morphology.kernel_size", m.kernel_size, "3..=10"));
        }
        if m.median_kernel < 3 || m.median_kernel % 2 == 0 {
            return Err(out_of_range(
                "morphology.median_kernel",
                m.median_kernel,
                "odd and >= 3",
            ));
        }

        check_finite_nonneg("edges.canny_low", self.edges.canny_low)?;
        check_finite_nonneg("edges.canny_high", self.edges.canny_high)?;
        if self.edges.canny_high < self.edges.canny_low {
            return Err(ParamsError::Inverted {
                field: "edges.canny_high",
                other: "edges.canny_low",
            });
        }

        let h = &self.hough;
        if !h.dp.is_finite() || h.dp < 1.0 {
            return Err(out_of_range("hough.dp", h.dp, ">= 1"));
        }
        check_finite_nonneg("hough.min_dist", h.min_dist)?;
        check_finite_nonneg("hough.param1", h.param1)?;
        check_finite_nonneg("hough.param2", h.param2)?;
        if h.max_radius == 0 {
            return Err(out_of_range("hough.max_radius", h.max_radius, "> 0"));
        }
        if h.max_radius < h.min_radius {
            return Err(ParamsError::Inverted {
                field: "hough.max_radius",
                other: "hough.min_radius",
            });
        }

        check_finite_nonneg("score.max_ring_density", self.score.max_ring_density)?;
        if self.score.min_coverage > 100 {
            return Err(out_of_range(
                "score.min_coverage",
                self.score.min_coverage,
                "0..=100",
            ));
        }

        let b = &self.blob;
        check_finite_nonneg("blob.min_area", b.min_area)?;
        check_ratio("blob.min_circularity", b.min_circularity)?;
        check_ratio("blob.min_convexity", b.min_convexity)?;
        check_ratio("blob.min_inertia", b.min_inertia)?;
        check_finite_nonneg("min_contour_area", self.min_contour_area)?;

        Ok(())
    }
}

fn hue_field(range: &'static str) -> &'static str {
    match range {
        "color.red1" => "color.red1.h",
        "color.red2" => "color.red2.h",
        _ => "color.blue.h",
    }
}

fn out_of_range(field: &'static str, value: impl Into<f64>, expected: &'static str) -> ParamsError {
    ParamsError::OutOfRange {
        field,
        value: value.into(),
        expected,
    }
}

fn check_finite_nonneg(field: &'static str, value: f32) -> Result<(), ParamsError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(out_of_range(field, value, "finite and >= 0"))
    }
}

fn check_ratio(field: &'static str, value: f32) -> Result<(), ParamsError> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(out_of_range(field, value, "0..=1"))
    }
}
