//! Scalar and planar primitives shared by the whole crate.

use nalgebra::{Rotation2, Vector2};
use serde::{Deserialize, Serialize};

/// Planar vector in path units.
pub type Vec2 = Vector2<f64>;

/// Hard ceiling on any velocity bound the profile generator will accept.
pub const MAX_VEL: f64 = 1e4;

/// Numerical tolerance for degeneracy guards throughout the crate.
pub const EPS: f64 = 1e-6;

// normalize angle to [-pi, pi].
pub fn normalize_angle(angle: f64) -> f64 {
    use core::f64::consts::{PI, TAU};

    let raw_angle = angle.rem_euclid(TAU);

    if raw_angle > PI {
        raw_angle - TAU
    } else {
        raw_angle
    }
}

/// Rotates `v` by `angle` radians.
pub fn rotated(v: Vec2, angle: f64) -> Vec2 {
    Rotation2::new(angle) * v
}

/// Counter-clockwise perpendicular of `v`.
pub fn perp(v: Vec2) -> Vec2 {
    Vec2::new(-v.y, v.x)
}

/// Sign with `sign(0) = 0`, unlike `f64::signum`.
pub fn sign(x: f64) -> f64 {
    if x > 0.0 {
        1.0
    } else if x < 0.0 {
        -1.0
    } else {
        0.0
    }
}

/// A pose in the plane: translation plus heading.
///
/// Also used for pose derivatives, where `position` holds the translational
/// rate and `heading` the heading rate.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Pose2 {
    pub position: Vec2,
    pub heading: f64,
}

impl Pose2 {
    pub fn new(x: f64, y: f64, heading: f64) -> Self {
        Self {
            position: Vec2::new(x, y),
            heading,
        }
    }

    /// Rotates only the translation part; heading is unchanged.
    pub fn vec_rotated(&self, angle: f64) -> Self {
        Self {
            position: rotated(self.position, angle),
            heading: self.heading,
        }
    }
}

impl core::ops::Add for Pose2 {
    type Output = Pose2;

    fn add(self, rhs: Pose2) -> Pose2 {
        Pose2 {
            position: self.position + rhs.position,
            heading: self.heading + rhs.heading,
        }
    }
}

impl core::ops::Mul<f64> for Pose2 {
    type Output = Pose2;

    fn mul(self, rhs: f64) -> Pose2 {
        Pose2 {
            position: self.position * rhs,
            heading: self.heading * rhs,
        }
    }
}

/// Scalar path state: position along the path, speed, acceleration.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct MotionState {
    pub x: f64,
    pub v: f64,
    pub a: f64,
}

/// Pose-valued motion state, as consumed by tracking controllers.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct PoseMotionState {
    pub pose: Pose2,
    pub deriv: Pose2,
    pub second_deriv: Pose2,
}

/// Closed interval `[lo, hi]`, or the empty interval (both endpoints NaN).
///
/// Non-empty intervals satisfy `lo <= hi`.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct Interval {
    lo: f64,
    hi: f64,
}

impl Interval {
    pub const REAL: Interval = Interval {
        lo: f64::NEG_INFINITY,
        hi: f64::INFINITY,
    };

    pub const EMPTY: Interval = Interval {
        lo: f64::NAN,
        hi: f64::NAN,
    };

    /// `[lo, hi]`, or EMPTY when `lo > hi` or either endpoint is NaN.
    pub fn new(lo: f64, hi: f64) -> Self {
        if lo <= hi {
            Self { lo, hi }
        } else {
            Self::EMPTY
        }
    }

    /// Interval spanning `a` and `b` in either order.
    pub fn spanning(a: f64, b: f64) -> Self {
        if a <= b {
            Self::new(a, b)
        } else {
            Self::new(b, a)
        }
    }

    pub fn symmetric(radius: f64, center: f64) -> Self {
        Self::new(center - radius, center + radius)
    }

    pub fn is_empty(&self) -> bool {
        self.lo.is_nan()
    }

    pub fn lo(&self) -> f64 {
        self.lo
    }

    pub fn hi(&self) -> f64 {
        self.hi
    }

    pub fn contains(&self, x: f64) -> bool {
        !self.is_empty() && self.lo <= x && x <= self.hi
    }

    pub fn intersect(&self, other: &Interval) -> Interval {
        if self.is_empty() || other.is_empty() {
            return Interval::EMPTY;
        }
        Interval::new(self.lo.max(other.lo), self.hi.min(other.hi))
    }
}

impl PartialEq for Interval {
    fn eq(&self, other: &Self) -> bool {
        (self.is_empty() && other.is_empty()) || (self.lo == other.lo && self.hi == other.hi)
    }
}
