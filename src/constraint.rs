//! Velocity and acceleration constraints built on the drive-model algebra.
//!
//! Every shipped constraint reduces to one of two canonical forms applied at
//! a path point: a linear transform bounding bot velocity, or a linear
//! transform bounding bot acceleration with an optional velocity-dependent
//! addend.

use nalgebra::{DMatrix, DVector};

use crate::drive::DriveModel;
use crate::error::{Error, Result};
use crate::math::{perp, rotated, sign, Interval, EPS};
use crate::path::PathPoint;

/// Bot-frame pose derivative with respect to arc length:
/// `[rot(-heading) * position_deriv, heading_deriv]`.
fn bot_vel_per_speed(point: &PathPoint) -> DVector<f64> {
    let translation = rotated(point.curve.position_deriv, -point.heading);
    DVector::from_vec(vec![translation.x, translation.y, point.heading_deriv])
}

/// Bot-frame curvature term of the acceleration expansion: the coefficient
/// of `v^2` in the bot acceleration, accounting for the rotating frame.
fn bot_accel_per_speed_squared(point: &PathPoint) -> DVector<f64> {
    let world = point.curve.position_second_deriv
        - point.heading_deriv * perp(point.curve.position_deriv);
    let translation = rotated(world, -point.heading);
    DVector::from_vec(vec![
        translation.x,
        translation.y,
        point.heading_second_deriv,
    ])
}

/// Per-motor bounds: one value for all motors, or one per motor.
#[derive(Clone, Debug, PartialEq)]
pub enum MotorBounds {
    Uniform(f64),
    PerMotor(Vec<f64>),
}

impl From<f64> for MotorBounds {
    fn from(value: f64) -> Self {
        MotorBounds::Uniform(value)
    }
}

impl From<Vec<f64>> for MotorBounds {
    fn from(values: Vec<f64>) -> Self {
        MotorBounds::PerMotor(values)
    }
}

impl MotorBounds {
    fn resolve(self, num_motors: usize) -> Result<DVector<f64>> {
        let values = match self {
            MotorBounds::Uniform(value) => vec![value; num_motors],
            MotorBounds::PerMotor(values) => {
                if values.len() != num_motors {
                    return Err(Error::MotorCount {
                        expected: num_motors,
                        got: values.len(),
                    });
                }
                values
            }
        };
        for &value in &values {
            if !(value > 0.0) {
                return Err(Error::NonPositiveBound(value));
            }
        }
        Ok(DVector::from_vec(values))
    }
}

/// Pointwise bound on bot velocity through a linear transform.
///
/// The maximum path speed is the largest `v` with
/// `|transform * r * v| <= maxes` componentwise, where `r` is the bot-frame
/// pose derivative.
#[derive(Clone, Debug, PartialEq)]
pub struct VelocityConstraint {
    transform: DMatrix<f64>,
    maxes: DVector<f64>,
}

impl VelocityConstraint {
    pub fn new(transform: DMatrix<f64>, maxes: DVector<f64>) -> Self {
        assert_eq!(transform.nrows(), maxes.len());
        Self { transform, maxes }
    }

    /// Caps per-motor angular velocity.
    pub fn max_motor_speed(model: &DriveModel, maxes: impl Into<MotorBounds>) -> Result<Self> {
        let maxes = maxes.into().resolve(model.num_motors())?;
        Ok(Self::new(model.motor_vel_from_bot_vel().clone(), maxes))
    }

    /// Caps per-wheel tangential velocity.
    pub fn max_wheel_speed(model: &DriveModel, maxes: impl Into<MotorBounds>) -> Result<Self> {
        let maxes = maxes.into().resolve(model.num_motors())?;
        let transform = DMatrix::from_diagonal(model.wheel_vel_per_motor_vel())
            * model.motor_vel_from_bot_vel();
        Ok(Self::new(transform, maxes))
    }

    pub fn max_velocity(&self, point: &PathPoint) -> f64 {
        let rates = &self.transform * bot_vel_per_speed(point);
        let mut max_vel = f64::INFINITY;
        for (rate, max) in rates.iter().zip(self.maxes.iter()) {
            if rate.abs() > EPS {
                max_vel = max_vel.min((max / rate).abs());
            }
        }
        max_vel
    }
}

/// Velocity-dependent offset added inside an acceleration constraint's
/// bounded space.
#[derive(Clone, Debug, PartialEq)]
enum AccelAddend {
    Zero,
    /// Voltage needed to hold the current motor velocity: back-EMF plus
    /// constant-direction friction.
    BackEmf {
        motor_vel_from_bot_vel: DMatrix<f64>,
        volts_from_motor_vel: DMatrix<f64>,
        volts_for_motor_friction: DVector<f64>,
    },
}

/// State-dependent interval bound on path acceleration through a linear
/// transform of bot acceleration.
#[derive(Clone, Debug, PartialEq)]
pub struct AccelerationConstraint {
    transform: DMatrix<f64>,
    maxes: DVector<f64>,
    addend: AccelAddend,
}

impl AccelerationConstraint {
    fn with_addend(transform: DMatrix<f64>, maxes: DVector<f64>, addend: AccelAddend) -> Self {
        assert_eq!(transform.nrows(), maxes.len());
        Self {
            transform,
            maxes,
            addend,
        }
    }

    pub fn new(transform: DMatrix<f64>, maxes: DVector<f64>) -> Self {
        Self::with_addend(transform, maxes, AccelAddend::Zero)
    }

    /// Caps per-motor angular acceleration.
    pub fn max_motor_accel(model: &DriveModel, maxes: impl Into<MotorBounds>) -> Result<Self> {
        let maxes = maxes.into().resolve(model.num_motors())?;
        Ok(Self::new(model.motor_accel_from_bot_accel().clone(), maxes))
    }

    /// Caps per-wheel tangential acceleration.
    pub fn max_wheel_accel(model: &DriveModel, maxes: impl Into<MotorBounds>) -> Result<Self> {
        let maxes = maxes.into().resolve(model.num_motors())?;
        let transform = DMatrix::from_diagonal(model.wheel_vel_per_motor_vel())
            * model.motor_accel_from_bot_accel();
        Ok(Self::new(transform, maxes))
    }

    /// Caps per-motor applied voltage, accounting for back-EMF and friction
    /// at the current velocity.
    pub fn max_motor_voltage(model: &DriveModel, maxes: impl Into<MotorBounds>) -> Result<Self> {
        let maxes = maxes.into().resolve(model.num_motors())?;
        Ok(Self::with_addend(
            model.volts_from_bot_accel().clone(),
            maxes,
            AccelAddend::BackEmf {
                motor_vel_from_bot_vel: model.motor_vel_from_bot_vel().clone(),
                volts_from_motor_vel: model.volts_from_motor_vel().clone(),
                volts_for_motor_friction: model.volts_for_motor_friction().clone(),
            },
        ))
    }

    /// Caps per-motor torque.
    pub fn max_motor_torque(model: &DriveModel, maxes: impl Into<MotorBounds>) -> Result<Self> {
        let maxes = maxes.into().resolve(model.num_motors())?;
        Ok(Self::new(model.torque_from_bot_accel().clone(), maxes))
    }

    /// Admissible path accelerations at the given point and speed; may be
    /// empty when the speed itself is untenable.
    pub fn accel_range(&self, point: &PathPoint, velocity: f64) -> Interval {
        let r = bot_vel_per_speed(point);
        let mult = &self.transform * &r;
        let mut offset = (&self.transform * bot_accel_per_speed_squared(point))
            * (velocity * velocity);

        if let AccelAddend::BackEmf {
            motor_vel_from_bot_vel,
            volts_from_motor_vel,
            volts_for_motor_friction,
        } = &self.addend
        {
            let motor_vels = motor_vel_from_bot_vel * &r * velocity;
            offset += volts_from_motor_vel * &motor_vels
                + volts_for_motor_friction.zip_map(&motor_vels, |f, w| f * sign(w));
        }

        let mut range = Interval::REAL;
        for i in 0..mult.len() {
            let row = if mult[i].abs() < EPS {
                // This row cannot be influenced; it either always holds or
                // never does.
                if offset[i].abs() > self.maxes[i] {
                    Interval::EMPTY
                } else {
                    Interval::REAL
                }
            } else {
                Interval::spanning(
                    (-self.maxes[i] - offset[i]) / mult[i],
                    (self.maxes[i] - offset[i]) / mult[i],
                )
            };
            range = range.intersect(&row);
            if range.is_empty() {
                return Interval::EMPTY;
            }
        }
        range
    }
}

/// A single constraint of either kind.
#[derive(Clone, Debug, PartialEq)]
pub enum Constraint {
    Velocity(VelocityConstraint),
    Acceleration(AccelerationConstraint),
}

impl From<VelocityConstraint> for Constraint {
    fn from(constraint: VelocityConstraint) -> Self {
        Constraint::Velocity(constraint)
    }
}

impl From<AccelerationConstraint> for Constraint {
    fn from(constraint: AccelerationConstraint) -> Self {
        Constraint::Acceleration(constraint)
    }
}

/// Deduplicated bundle of constraints, evaluated per point by componentwise
/// min (velocity) and interval intersection (acceleration).
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ConstraintSet {
    velocity: Vec<VelocityConstraint>,
    acceleration: Vec<AccelerationConstraint>,
}

impl ConstraintSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a constraint, ignoring exact duplicates.
    pub fn add(&mut self, constraint: impl Into<Constraint>) {
        match constraint.into() {
            Constraint::Velocity(constraint) => {
                if !self.velocity.contains(&constraint) {
                    self.velocity.push(constraint);
                }
            }
            Constraint::Acceleration(constraint) => {
                if !self.acceleration.contains(&constraint) {
                    self.acceleration.push(constraint);
                }
            }
        }
    }

    pub fn with(mut self, constraint: impl Into<Constraint>) -> Self {
        self.add(constraint);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.velocity.is_empty() && self.acceleration.is_empty()
    }

    /// Evaluates the whole set at one path point.
    pub fn point(&self, point: PathPoint) -> PointConstraint<'_> {
        PointConstraint { set: self, point }
    }
}

/// The constraint set specialized to one path point.
pub struct PointConstraint<'a> {
    set: &'a ConstraintSet,
    point: PathPoint,
}

impl PointConstraint<'_> {
    pub fn max_velocity(&self) -> f64 {
        self.set
            .velocity
            .iter()
            .fold(f64::INFINITY, |acc, constraint| {
                acc.min(constraint.max_velocity(&self.point))
            })
    }

    pub fn accel_range(&self, velocity: f64) -> Interval {
        let mut range = Interval::REAL;
        for constraint in &self.set.acceleration {
            range = range.intersect(&constraint.accel_range(&self.point, velocity));
            if range.is_empty() {
                break;
            }
        }
        range
    }
}
