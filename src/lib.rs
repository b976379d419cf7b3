//! Time-optimal motion trajectories for planar mobile robots.
//!
//! Given a smooth parametric path in the plane and the kinematic and dynamic
//! limits of a drive (per-motor speed, wheel speed, acceleration, voltage),
//! this crate produces a time-parameterized motion profile: at any `t` in
//! `[0, duration]`, the pose, pose derivative, and pose second derivative a
//! controller should track.
//!
//! The pipeline: a quintic spline is reparameterized by arc length into a
//! curve; a curve plus a heading rule makes a path; a path plus a constraint
//! set yields per-point speed bounds and acceleration intervals; the profile
//! generator sweeps those into a schedule; a trajectory composes path and
//! schedule into a time-indexed stream.
//!
//! ```
//! use motioncore::constraint::{AccelerationConstraint, ConstraintSet, VelocityConstraint};
//! use motioncore::curve::ReparamCurve;
//! use motioncore::drive::{DriveModel, MotorModel};
//! use motioncore::math::Vec2;
//! use motioncore::path::{HeadingRule, Path};
//! use motioncore::profile::ProfileParams;
//! use motioncore::spline::QuinticSpline;
//! use motioncore::trajectory::generate_trajectory;
//!
//! let spline = QuinticSpline::from_control_points([
//!     Vec2::new(0.0, 0.0),
//!     Vec2::new(1.0, 0.0),
//!     Vec2::new(2.0, 0.0),
//!     Vec2::new(2.0, 1.0),
//!     Vec2::new(2.0, 2.0),
//!     Vec2::new(3.0, 2.0),
//! ]);
//! let path = Path::from_curve(ReparamCurve::new(spline), HeadingRule::tangent());
//!
//! let motor = MotorModel {
//!     nominal_volts: 12.0,
//!     free_speed: 30.0,
//!     stall_torque: 2.0,
//!     friction_torque: 0.0,
//! };
//! let model = DriveModel::differential(10.0, 1.5, 0.4, 0.05, 2.0, motor).unwrap();
//! let constraints = ConstraintSet::new()
//!     .with(VelocityConstraint::max_motor_speed(&model, 20.0).unwrap())
//!     .with(AccelerationConstraint::max_motor_voltage(&model, 12.0).unwrap());
//!
//! let trajectory = generate_trajectory(path, &constraints, &ProfileParams::default()).unwrap();
//! let target = trajectory.at_time(trajectory.duration() / 2.0);
//! assert!(target.deriv.position.norm() > 0.0);
//! ```

pub mod constraint;
pub mod curve;
pub mod drive;
pub mod error;
pub mod math;
pub mod path;
pub mod profile;
pub mod reparam;
pub mod spline;
pub mod trajectory;
