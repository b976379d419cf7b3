//! Arc-length parameterized curves and their per-point snapshots.

use serde::{Deserialize, Serialize};

use crate::math::{perp, Vec2, EPS};
use crate::reparam::{ArcLengthMapping, MappingStepper, DEFAULT_SAMPLES};
use crate::spline::QuinticSpline;

/// Snapshot of a curve at a single arc length.
///
/// All fields are computed eagerly at construction; derivatives are taken
/// with respect to arc length. `position_deriv` is the unit tangent, defined
/// as zero where the underlying derivative vanishes, and `tan_angle_deriv`
/// is the signed curvature.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct CurvePoint {
    pub length: f64,
    pub position: Vec2,
    pub position_deriv: Vec2,
    pub position_second_deriv: Vec2,
    pub tan_angle: f64,
    pub tan_angle_deriv: f64,
    pub tan_angle_second_deriv: f64,
}

impl CurvePoint {
    fn from_spline(spline: &QuinticSpline, u: f64, s: f64) -> Self {
        let position = spline.point(u);
        let d1 = spline.deriv(u);
        let d2 = spline.second_deriv(u);
        let d3 = spline.third_deriv(u);
        let speed = d1.norm();

        let position_deriv = if speed < EPS { Vec2::zeros() } else { d1 / speed };
        let tan_angle = d1.y.atan2(d1.x);

        let (tan_angle_deriv, tan_angle_second_deriv) = if speed < EPS {
            (0.0, 0.0)
        } else {
            let speed3 = speed * speed * speed;
            let curvature = d1.perp(&d2) / speed3;
            // d(kappa)/ds, expanded in the original parameter.
            let curvature_deriv =
                d1.perp(&d3) / (speed3 * speed) - 3.0 * curvature * d1.dot(&d2) / speed3;
            (nan_to_zero(curvature), nan_to_zero(curvature_deriv))
        };

        Self {
            length: s,
            position,
            position_deriv,
            position_second_deriv: tan_angle_deriv * perp(position_deriv),
            tan_angle,
            tan_angle_deriv,
            tan_angle_second_deriv,
        }
    }

    /// Flips the travel direction: first derivatives negate, the tangent
    /// angle turns by pi, second derivatives are unchanged. A zero tangent
    /// (point turn, degenerate spline point) keeps its tangent angle.
    pub(crate) fn reversed(mut self, length: f64) -> Self {
        self.length = length;
        self.tan_angle_deriv = -self.tan_angle_deriv;
        if self.position_deriv != Vec2::zeros() {
            self.position_deriv = -self.position_deriv;
            self.tan_angle = self.position_deriv.y.atan2(self.position_deriv.x);
        }
        self
    }
}

fn nan_to_zero(x: f64) -> f64 {
    if x.is_nan() {
        0.0
    } else {
        x
    }
}

/// A quintic spline reparameterized by arc length.
///
/// Owns its spline and mapping. Travel direction is a field, so
/// `reversed().reversed()` collapses structurally to the original.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ReparamCurve {
    spline: QuinticSpline,
    mapping: ArcLengthMapping,
    reversed: bool,
}

impl ReparamCurve {
    pub fn new(spline: QuinticSpline) -> Self {
        Self::with_samples(spline, DEFAULT_SAMPLES)
    }

    pub fn with_samples(spline: QuinticSpline, samples: usize) -> Self {
        let mapping = ArcLengthMapping::new(&spline, samples);
        Self {
            spline,
            mapping,
            reversed: false,
        }
    }

    pub fn length(&self) -> f64 {
        self.mapping.length()
    }

    pub fn is_reversed(&self) -> bool {
        self.reversed
    }

    pub fn reversed(&self) -> Self {
        let mut curve = self.clone();
        curve.reversed = !curve.reversed;
        curve
    }

    pub fn point_at(&self, s: f64) -> CurvePoint {
        let base_s = self.base_s(s);
        self.point_for(s, self.mapping.u_of_s(base_s))
    }

    pub fn stepper(&self) -> CurveStepper<'_> {
        CurveStepper {
            curve: self,
            inner: self.mapping.stepper(),
        }
    }

    fn base_s(&self, s: f64) -> f64 {
        if self.reversed {
            self.length() - s
        } else {
            s
        }
    }

    fn point_for(&self, s: f64, u: f64) -> CurvePoint {
        let point = CurvePoint::from_spline(&self.spline, u, s);
        if self.reversed {
            point.reversed(s)
        } else {
            point
        }
    }
}

/// Cursor accessor over a [`ReparamCurve`].
///
/// Sequential queries cost O(1) amortized; out-of-order queries re-search
/// by walking the cursor.
#[derive(Clone, Debug)]
pub struct CurveStepper<'a> {
    curve: &'a ReparamCurve,
    inner: MappingStepper<'a>,
}

impl CurveStepper<'_> {
    pub fn point_at(&mut self, s: f64) -> CurvePoint {
        let base_s = self.curve.base_s(s);
        let u = self.inner.u_of_s(base_s);
        self.curve.point_for(s, u)
    }
}
