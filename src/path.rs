//! Paths: curves with heading, point turns, composition, reversal.

use serde::{Deserialize, Serialize};

use crate::curve::{CurvePoint, CurveStepper, ReparamCurve};
use crate::error::{Error, Result};
use crate::math::{normalize_angle, sign, Pose2, Vec2};

/// How a path segment derives the robot heading from its curve.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub enum HeadingRule {
    /// Heading follows the tangent angle plus a fixed offset.
    Tangent { offset: f64 },
    /// Heading is held constant.
    Constant(f64),
    /// Heading ramps linearly in arc length between two values.
    Linear { from: f64, to: f64 },
}

impl HeadingRule {
    /// Tangent heading with no offset.
    pub fn tangent() -> Self {
        HeadingRule::Tangent { offset: 0.0 }
    }

    fn eval(&self, point: &CurvePoint, s: f64, length: f64) -> (f64, f64, f64) {
        match *self {
            HeadingRule::Tangent { offset } => (
                normalize_angle(point.tan_angle + offset),
                point.tan_angle_deriv,
                point.tan_angle_second_deriv,
            ),
            HeadingRule::Constant(heading) => (heading, 0.0, 0.0),
            HeadingRule::Linear { from, to } => {
                let rate = (to - from) / length;
                (from + rate * s, rate, 0.0)
            }
        }
    }

    fn reversed(&self) -> Self {
        match *self {
            // The reversed curve's tangent is turned by pi.
            HeadingRule::Tangent { offset } => HeadingRule::Tangent {
                offset: normalize_angle(offset + core::f64::consts::PI),
            },
            HeadingRule::Constant(heading) => HeadingRule::Constant(heading),
            HeadingRule::Linear { from, to } => HeadingRule::Linear { from: to, to: from },
        }
    }
}

/// Snapshot of a path at a single arc length: curve geometry plus heading.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct PathPoint {
    pub curve: CurvePoint,
    pub heading: f64,
    pub heading_deriv: f64,
    pub heading_second_deriv: f64,
}

impl PathPoint {
    pub fn pose(&self) -> Pose2 {
        Pose2 {
            position: self.curve.position,
            heading: self.heading,
        }
    }

    /// Derivative of the pose with respect to arc length.
    pub fn pose_deriv(&self) -> Pose2 {
        Pose2 {
            position: self.curve.position_deriv,
            heading: self.heading_deriv,
        }
    }

    pub fn pose_second_deriv(&self) -> Pose2 {
        Pose2 {
            position: self.curve.position_second_deriv,
            heading: self.heading_second_deriv,
        }
    }
}

/// One stretch of a path.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum Segment {
    /// A curve traversed with the given heading rule.
    Curved {
        curve: ReparamCurve,
        heading: HeadingRule,
    },
    /// Stationary rotation; arc length is the swept angle magnitude.
    PointTurn {
        position: Vec2,
        from: f64,
        to: f64,
    },
}

impl Segment {
    pub fn curved(curve: ReparamCurve, heading: HeadingRule) -> Self {
        Segment::Curved { curve, heading }
    }

    pub fn point_turn(position: Vec2, from: f64, to: f64) -> Self {
        Segment::PointTurn { position, from, to }
    }

    pub fn length(&self) -> f64 {
        match self {
            Segment::Curved { curve, .. } => curve.length(),
            Segment::PointTurn { from, to, .. } => (to - from).abs(),
        }
    }

    fn point_at(&self, s: f64) -> PathPoint {
        match self {
            Segment::Curved { curve, heading } => {
                with_heading(curve.point_at(s), heading, s, curve.length())
            }
            Segment::PointTurn { position, from, to } => point_turn_point(*position, *from, *to, s),
        }
    }

    fn reversed(&self) -> Self {
        match self {
            Segment::Curved { curve, heading } => Segment::Curved {
                curve: curve.reversed(),
                heading: heading.reversed(),
            },
            Segment::PointTurn { position, from, to } => Segment::PointTurn {
                position: *position,
                from: *to,
                to: *from,
            },
        }
    }
}

fn with_heading(curve: CurvePoint, rule: &HeadingRule, s: f64, length: f64) -> PathPoint {
    let (heading, heading_deriv, heading_second_deriv) = rule.eval(&curve, s, length);
    PathPoint {
        curve,
        heading,
        heading_deriv,
        heading_second_deriv,
    }
}

fn point_turn_point(position: Vec2, from: f64, to: f64, s: f64) -> PathPoint {
    let rate = sign(to - from);
    let heading = normalize_angle(from + rate * s);
    PathPoint {
        curve: CurvePoint {
            length: s,
            position,
            position_deriv: Vec2::zeros(),
            position_second_deriv: Vec2::zeros(),
            tan_angle: heading,
            tan_angle_deriv: rate,
            tan_angle_second_deriv: 0.0,
        },
        heading,
        heading_deriv: rate,
        heading_second_deriv: 0.0,
    }
}

/// A sequence of segments addressed by cumulative arc length.
///
/// Travel direction is a field: `reversed()` flips it without touching the
/// segments, so double reversal is the original path structurally.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Path {
    segments: Vec<Segment>,
    cumulative: Vec<f64>,
    length: f64,
    reversed: bool,
}

impl Path {
    pub fn new(segments: Vec<Segment>) -> Result<Self> {
        if segments.is_empty() {
            return Err(Error::EmptyPath);
        }
        let mut cumulative = Vec::with_capacity(segments.len() + 1);
        let mut length = 0.0;
        cumulative.push(0.0);
        for segment in &segments {
            length += segment.length();
            cumulative.push(length);
        }
        Ok(Self {
            segments,
            cumulative,
            length,
            reversed: false,
        })
    }

    /// Single-curve path.
    pub fn from_curve(curve: ReparamCurve, heading: HeadingRule) -> Self {
        // One segment is never empty.
        Self::new(vec![Segment::curved(curve, heading)]).unwrap()
    }

    /// Stationary rotation from `from` to `to` radians.
    pub fn point_turn(position: Vec2, from: f64, to: f64) -> Self {
        Self::new(vec![Segment::point_turn(position, from, to)]).unwrap()
    }

    /// Concatenates sub-paths, resolving their travel directions.
    pub fn concat(paths: Vec<Path>) -> Result<Self> {
        let mut segments = Vec::new();
        for path in paths {
            segments.extend(path.into_segments());
        }
        Self::new(segments)
    }

    /// The path's segments in travel order.
    fn into_segments(self) -> Vec<Segment> {
        if self.reversed {
            self.segments
                .iter()
                .rev()
                .map(Segment::reversed)
                .collect()
        } else {
            self.segments
        }
    }

    pub fn length(&self) -> f64 {
        self.length
    }

    pub fn is_reversed(&self) -> bool {
        self.reversed
    }

    pub fn reversed(&self) -> Self {
        let mut path = self.clone();
        path.reversed = !path.reversed;
        path
    }

    pub fn point_at(&self, s: f64) -> PathPoint {
        let base_s = self.base_s(s);
        let index = self.segment_index(base_s);
        self.point_for(s, index, base_s)
    }

    pub fn stepper(&self) -> PathStepper<'_> {
        PathStepper {
            path: self,
            index: self.segment_index(self.base_s(0.0)),
            curve_stepper: None,
            last_s: f64::NEG_INFINITY,
        }
    }

    fn base_s(&self, s: f64) -> f64 {
        let s = s.clamp(0.0, self.length);
        if self.reversed {
            self.length - s
        } else {
            s
        }
    }

    fn segment_index(&self, base_s: f64) -> usize {
        let index = self.cumulative.partition_point(|&c| c <= base_s);
        index.saturating_sub(1).min(self.segments.len() - 1)
    }

    fn point_for(&self, s: f64, index: usize, base_s: f64) -> PathPoint {
        let local = (base_s - self.cumulative[index]).clamp(0.0, self.segments[index].length());
        let point = self.segments[index].point_at(local);
        let mut point = if self.reversed {
            reverse_point(point)
        } else {
            point
        };
        point.curve.length = s;
        point
    }
}

/// Flips a path point's travel direction: first derivatives negate, the
/// tangent turns by pi, heading and second derivatives stay put.
fn reverse_point(mut point: PathPoint) -> PathPoint {
    point.curve = point.curve.reversed(point.curve.length);
    point.heading_deriv = -point.heading_deriv;
    point
}

/// Monotone accessor over a [`Path`], pairing a segment cursor with a curve
/// stepper for the active segment.
pub struct PathStepper<'a> {
    path: &'a Path,
    index: usize,
    curve_stepper: Option<CurveStepper<'a>>,
    last_s: f64,
}

impl PathStepper<'_> {
    pub fn point_at(&mut self, s: f64) -> PathPoint {
        debug_assert!(s >= self.last_s, "stepper queried backwards: {s} < {}", self.last_s);
        self.last_s = s;

        let path = self.path;
        let base_s = path.base_s(s);
        let index = path.segment_index(base_s);
        if index != self.index {
            self.index = index;
            self.curve_stepper = None;
        }

        let segment = &path.segments[index];
        let local = (base_s - path.cumulative[index]).clamp(0.0, segment.length());
        let mut point = match segment {
            Segment::Curved { curve, heading } => {
                // Point turns don't carry a curve cursor; curves do.
                let stepper = self.curve_stepper.get_or_insert_with(|| curve.stepper());
                with_heading(stepper.point_at(local), heading, local, curve.length())
            }
            Segment::PointTurn { position, from, to } => {
                point_turn_point(*position, *from, *to, local)
            }
        };
        if self.path.reversed {
            point = reverse_point(point);
        }
        point.curve.length = s;
        point
    }
}
