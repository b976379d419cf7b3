//! Trajectories: a path traversed on a motion-profile schedule.

use serde::{Deserialize, Serialize};

use crate::constraint::ConstraintSet;
use crate::error::{Error, Result};
use crate::math::{Interval, PoseMotionState, EPS};
use crate::path::{Path, PathStepper};
use crate::profile::{
    generate_profile, MotionProfile, ProfileConstraints, ProfileParams, ProfileStepper,
};

/// Adapts a path plus a constraint set to the profile generator's queries.
pub struct TrajectoryConstraints<'a> {
    path: &'a Path,
    constraints: &'a ConstraintSet,
}

impl<'a> TrajectoryConstraints<'a> {
    pub fn new(path: &'a Path, constraints: &'a ConstraintSet) -> Self {
        Self { path, constraints }
    }
}

impl ProfileConstraints for TrajectoryConstraints<'_> {
    fn max_velocity(&self, s: f64) -> f64 {
        self.constraints.point(self.path.point_at(s)).max_velocity()
    }

    fn accel_range(&self, s: f64, velocity: f64) -> Interval {
        self.constraints
            .point(self.path.point_at(s))
            .accel_range(velocity)
    }
}

/// A time-indexed pose/velocity/acceleration stream over a path.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Trajectory {
    path: Path,
    profile: MotionProfile,
}

impl Trajectory {
    /// Pairs a path with a profile; their lengths must agree within epsilon
    /// times the scale of the path.
    pub fn new(path: Path, profile: MotionProfile) -> Result<Self> {
        let mismatch = (path.length() - profile.distance()).abs();
        if mismatch > EPS * path.length().max(1.0) {
            return Err(Error::LengthMismatch {
                path_length: path.length(),
                profile_distance: profile.distance(),
            });
        }
        Ok(Self { path, profile })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn profile(&self) -> &MotionProfile {
        &self.profile
    }

    pub fn duration(&self) -> f64 {
        self.profile.duration()
    }

    pub fn length(&self) -> f64 {
        self.path.length()
    }

    /// Pose state to track at time `t`.
    pub fn at_time(&self, t: f64) -> PoseMotionState {
        let state = self.profile.state_at_time(t);
        let point = self.path.point_at(state.x);
        PoseMotionState {
            pose: point.pose(),
            deriv: point.pose_deriv() * state.v,
            second_deriv: point.pose_second_deriv() * (state.v * state.v)
                + point.pose_deriv() * state.a,
        }
    }

    /// Monotone sampler pairing a path stepper with a profile stepper.
    pub fn stepper(&self) -> TrajectoryStepper<'_> {
        TrajectoryStepper {
            path: self.path.stepper(),
            profile: self.profile.stepper(),
        }
    }
}

/// Monotone accessor over a [`Trajectory`]; `t` must be non-decreasing.
pub struct TrajectoryStepper<'a> {
    path: PathStepper<'a>,
    profile: ProfileStepper<'a>,
}

impl TrajectoryStepper<'_> {
    pub fn at_time(&mut self, t: f64) -> PoseMotionState {
        let state = self.profile.state_at_time(t);
        let point = self.path.point_at(state.x);
        PoseMotionState {
            pose: point.pose(),
            deriv: point.pose_deriv() * state.v,
            second_deriv: point.pose_second_deriv() * (state.v * state.v)
                + point.pose_deriv() * state.a,
        }
    }
}

/// Generates the time-optimal trajectory over `path` under `constraints`.
pub fn generate_trajectory(
    path: Path,
    constraints: &ConstraintSet,
    params: &ProfileParams,
) -> Result<Trajectory> {
    let profile = generate_profile(
        &TrajectoryConstraints::new(&path, constraints),
        path.length(),
        params,
    )?;
    Trajectory::new(path, profile)
}
