use serde::{Deserialize, Serialize};

/// Which shape family a target was reported as.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetKind {
    Circle,
    Ellipse,
}

/// A detected target in image pixel coordinates.
///
/// "No target" is expressed as `Option::<Target>::None` everywhere.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Target {
    Circle {
        cx: f32,
        cy: f32,
        radius: f32,
    },
    /// `axis1`/`axis2` are semi-axes with `axis1 >= axis2`; `angle` is the
    /// rotation of `axis1` from +x in degrees.
    Ellipse {
        cx: f32,
        cy: f32,
        axis1: f32,
        axis2: f32,
        angle: f32,
    },
}

impl Target {
    pub fn kind(&self) -> TargetKind {
        match self {
            Target::Circle { .. } => TargetKind::Circle,
            Target::Ellipse { .. } => TargetKind::Ellipse,
        }
    }

    pub fn center(&self) -> (f32, f32) {
        match *self {
            Target::Circle { cx, cy, .. } | Target::Ellipse { cx, cy, .. } => (cx, cy),
        }
    }

    /// Characteristic size: the radius of a circle, the major semi-axis of an ellipse.
    pub fn size(&self) -> f32 {
        match *self {
            Target::Circle { radius, .. } => radius,
            Target::Ellipse { axis1, .. } => axis1,
        }
    }
}
