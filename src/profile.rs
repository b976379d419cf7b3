//! Dynamic motion-profile generation: the fastest 1-D speed schedule
//! satisfying pointwise velocity bounds and state-dependent acceleration
//! intervals.

use log::debug;
use serde::{Deserialize, Serialize};
use typed_builder::TypedBuilder;

use crate::error::{Error, Result};
use crate::math::{Interval, MotionState, EPS, MAX_VEL};

/// Answers the profile generator's two queries at arbitrary arc length.
pub trait ProfileConstraints {
    /// Pointwise speed bound; must be non-negative.
    fn max_velocity(&self, s: f64) -> f64;

    /// Admissible path accelerations at the given arc length and speed.
    fn accel_range(&self, s: f64, velocity: f64) -> Interval;
}

/// Generation knobs, all defaulted.
#[derive(Clone, Copy, Debug, PartialEq, TypedBuilder, Serialize, Deserialize)]
pub struct ProfileParams {
    #[builder(default = 0.0)]
    pub target_start_vel: f64,
    #[builder(default = 0.0)]
    pub target_end_vel: f64,
    #[builder(default = 0.01)]
    pub segment_size: f64,
    #[builder(default = 0.01)]
    pub max_vel_search_tolerance: f64,
}

impl Default for ProfileParams {
    fn default() -> Self {
        Self::builder().build()
    }
}

/// One constant-acceleration stretch of a profile.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ProfileSegment {
    /// Arc length at the segment start.
    pub s: f64,
    /// Speed at the segment start.
    pub v: f64,
    pub a: f64,
    pub dt: f64,
}

/// Piecewise-constant-acceleration schedule `s(t)` over `[0, distance]`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MotionProfile {
    segments: Vec<ProfileSegment>,
    start_times: Vec<f64>,
    distance: f64,
    duration: f64,
    end_vel: f64,
}

impl MotionProfile {
    pub fn distance(&self) -> f64 {
        self.distance
    }

    pub fn duration(&self) -> f64 {
        self.duration
    }

    pub fn segments(&self) -> &[ProfileSegment] {
        &self.segments
    }

    /// Speed at the end of the schedule.
    pub fn end_vel(&self) -> f64 {
        self.end_vel
    }

    pub fn state_at_time(&self, t: f64) -> MotionState {
        if t >= self.duration {
            return MotionState {
                x: self.distance,
                v: self.end_vel,
                a: 0.0,
            };
        }
        let index = self
            .start_times
            .partition_point(|&t0| t0 <= t)
            .saturating_sub(1);
        self.segment_state(index, t)
    }

    pub fn state_at_distance(&self, s: f64) -> MotionState {
        if s >= self.distance {
            return MotionState {
                x: self.distance,
                v: self.end_vel,
                a: 0.0,
            };
        }
        let s = s.max(0.0);
        let index = self
            .segments
            .partition_point(|segment| segment.s <= s)
            .saturating_sub(1);
        let segment = &self.segments[index];
        let v_sq = segment.v * segment.v + 2.0 * segment.a * (s - segment.s);
        MotionState {
            x: s,
            v: v_sq.max(0.0).sqrt(),
            a: segment.a,
        }
    }

    pub fn stepper(&self) -> ProfileStepper<'_> {
        ProfileStepper {
            profile: self,
            cursor: 0,
            last_t: f64::NEG_INFINITY,
        }
    }

    fn segment_state(&self, index: usize, t: f64) -> MotionState {
        let segment = &self.segments[index];
        let tau = (t - self.start_times[index]).max(0.0);
        MotionState {
            x: segment.s + segment.v * tau + 0.5 * segment.a * tau * tau,
            v: segment.v + segment.a * tau,
            a: segment.a,
        }
    }
}

/// Monotone accessor over a [`MotionProfile`].
///
/// Queries must arrive with non-decreasing `t` on the same stepper.
#[derive(Clone, Debug)]
pub struct ProfileStepper<'a> {
    profile: &'a MotionProfile,
    cursor: usize,
    last_t: f64,
}

impl ProfileStepper<'_> {
    pub fn state_at_time(&mut self, t: f64) -> MotionState {
        debug_assert!(
            t >= self.last_t,
            "stepper queried backwards: {t} < {}",
            self.last_t
        );
        self.last_t = t;
        if t >= self.profile.duration {
            return MotionState {
                x: self.profile.distance,
                v: self.profile.end_vel,
                a: 0.0,
            };
        }
        let times = &self.profile.start_times;
        while self.cursor + 1 < times.len() && times[self.cursor + 1] <= t {
            self.cursor += 1;
        }
        while self.cursor > 0 && times[self.cursor] > t {
            self.cursor -= 1;
        }
        self.profile.segment_state(self.cursor, t)
    }
}

/// Computes the fastest profile over `distance` admitted by `constraints`.
///
/// Discretizes into `ceil(distance / segment_size)` segments, caps each
/// point's speed, then runs a forward and a backward dynamic pass using one
/// endpoint of the acceleration range per segment. Infeasible endpoints are
/// resolved by bisecting the speed down; if even zero speed admits no
/// forward acceleration the constraints are unsatisfiable and generation
/// aborts.
pub fn generate_profile<C: ProfileConstraints>(
    constraints: &C,
    distance: f64,
    params: &ProfileParams,
) -> Result<MotionProfile> {
    if !(distance > 0.0) {
        return Err(Error::NonPositiveDistance(distance));
    }
    for target in [params.target_start_vel, params.target_end_vel] {
        if !(target >= 0.0) {
            return Err(Error::NegativeTargetVelocity(target));
        }
    }
    if !(params.segment_size > 0.0) || params.segment_size > distance {
        return Err(Error::SegmentSize {
            segment_size: params.segment_size,
            distance,
        });
    }
    if !(params.max_vel_search_tolerance > 0.0) {
        return Err(Error::NonPositiveTolerance(params.max_vel_search_tolerance));
    }

    let n = (distance / params.segment_size).ceil() as usize;
    let ds = distance / n as f64;
    let s_points: Vec<f64> = (0..=n).map(|i| distance * i as f64 / n as f64).collect();

    let mut v = Vec::with_capacity(n + 1);
    for &s in &s_points {
        let bound = constraints.max_velocity(s);
        if !(bound >= 0.0) {
            return Err(Error::NegativeVelocityBound { s, value: bound });
        }
        v.push(bound.min(MAX_VEL));
    }
    v[0] = v[0].min(params.target_start_vel);
    v[n] = v[n].min(params.target_end_vel);

    let tolerance = params.max_vel_search_tolerance.max(EPS);

    let forward: Vec<usize> = (0..=n).collect();
    constrain_pass(&mut v, &forward, &s_points, ds, tolerance, true, |i, vel| {
        constraints.accel_range(s_points[i], vel)
    })?;

    let backward: Vec<usize> = (0..=n).rev().collect();
    constrain_pass(&mut v, &backward, &s_points, ds, tolerance, false, |i, vel| {
        constraints.accel_range(s_points[i], vel)
    })?;

    let mut segments = Vec::with_capacity(n);
    let mut start_times = Vec::with_capacity(n);
    let mut duration = 0.0;
    for i in 0..n {
        let (v0, v1) = (v[i], v[i + 1]);
        let a = (v1 * v1 - v0 * v0) / (2.0 * ds);
        // Stationary segments get an epsilon-speed guard.
        let dt = if v0 + v1 < EPS {
            ds / EPS
        } else {
            2.0 * ds / (v0 + v1)
        };
        segments.push(ProfileSegment {
            s: s_points[i],
            v: v0,
            a,
            dt,
        });
        start_times.push(duration);
        duration += dt;
    }

    debug!(
        "generated motion profile: {} segments over {distance:.4}, duration {duration:.4}",
        segments.len()
    );

    Ok(MotionProfile {
        segments,
        start_times,
        distance,
        duration,
        end_vel: v[n],
    })
}

/// One dynamic pass over the segment list in the given point order.
///
/// At each point the current speed cap must admit an acceleration above
/// `-v^2 / (2 ds)`; when it does not, the cap is lowered by bisection over
/// `[0, v]` before propagating to the next point.
fn constrain_pass<R>(
    v: &mut [f64],
    order: &[usize],
    s_points: &[f64],
    ds: f64,
    tolerance: f64,
    forward: bool,
    mut range: R,
) -> Result<()>
where
    R: FnMut(usize, f64) -> Interval,
{
    for pair in order.windows(2) {
        let (cur, next) = (pair[0], pair[1]);

        let (v0, a_max) = match admissible(&mut range, cur, v[cur], ds, forward) {
            Some(a) => (v[cur], a),
            None => {
                let mut best = match admissible(&mut range, cur, 0.0, ds, forward) {
                    Some(a) => (0.0, a),
                    None => {
                        return Err(Error::Unsatisfiable {
                            index: cur,
                            s: s_points[cur],
                        })
                    }
                };
                let (mut lo, mut hi) = (0.0, v[cur]);
                while hi - lo > tolerance {
                    let mid = 0.5 * (lo + hi);
                    match admissible(&mut range, cur, mid, ds, forward) {
                        Some(a) => {
                            lo = mid;
                            best = (mid, a);
                        }
                        None => hi = mid,
                    }
                }
                debug!(
                    "velocity search fallback at s = {:.4}: {:.4} -> {:.4}",
                    s_points[cur], v[cur], best.0
                );
                best
            }
        };

        v[cur] = v0;
        let reachable = (v0 * v0 + 2.0 * a_max * ds).max(0.0).sqrt();
        v[next] = v[next].min(reachable);
    }
    Ok(())
}

/// The pass-effective maximum acceleration at `(i, v)`, or `None` when the
/// range is empty or cannot keep `v^2` non-negative across the segment.
fn admissible<R>(range: &mut R, i: usize, v: f64, ds: f64, forward: bool) -> Option<f64>
where
    R: FnMut(usize, f64) -> Interval,
{
    let interval = range(i, v);
    if interval.is_empty() {
        return None;
    }
    let a = if forward {
        interval.hi()
    } else {
        -interval.lo()
    };
    let a_min = -v * v / (2.0 * ds);
    (a > a_min).then_some(a)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    /// Constant bounds: `|v| <= v_max`, `a in [-a_max, a_max]`.
    struct SimpleConstraints {
        v_max: f64,
        a_max: f64,
    }

    impl ProfileConstraints for SimpleConstraints {
        fn max_velocity(&self, _s: f64) -> f64 {
            self.v_max
        }

        fn accel_range(&self, _s: f64, _velocity: f64) -> Interval {
            Interval::symmetric(self.a_max, 0.0)
        }
    }

    fn params() -> ProfileParams {
        ProfileParams::builder().build()
    }

    #[test]
    fn test_trapezoidal_profile() {
        let constraints = SimpleConstraints {
            v_max: 1.0,
            a_max: 1.0,
        };
        let profile = generate_profile(&constraints, 2.0, &params()).unwrap();

        // Ramp 0 -> 1 over s = 0.5 (1 s), cruise 1.0 (1 s), ramp down (1 s).
        assert_relative_eq!(profile.duration(), 3.0, epsilon = 0.02);
        let peak = profile
            .segments()
            .iter()
            .fold(0.0f64, |acc, segment| acc.max(segment.v));
        assert_relative_eq!(peak, 1.0, epsilon = 1e-6);
        assert_relative_eq!(profile.state_at_distance(1.0).v, 1.0, epsilon = 1e-6);
        assert!(profile.end_vel() < 0.02);
    }

    #[test]
    fn test_triangular_profile() {
        let constraints = SimpleConstraints {
            v_max: 10.0,
            a_max: 1.0,
        };
        let profile = generate_profile(&constraints, 1.0, &params()).unwrap();

        // Never reaches v_max: peak sqrt(2 * 1 * 0.5) = 1 at the midpoint.
        assert_relative_eq!(profile.duration(), 2.0, epsilon = 0.02);
        assert_relative_eq!(profile.state_at_distance(0.5).v, 1.0, epsilon = 0.02);
    }

    #[test]
    fn test_end_velocity_target() {
        let constraints = SimpleConstraints {
            v_max: 1.0,
            a_max: 1.0,
        };
        let profile = generate_profile(
            &constraints,
            2.0,
            &ProfileParams::builder().target_end_vel(1.0).build(),
        )
        .unwrap();

        assert_relative_eq!(profile.end_vel(), 1.0, epsilon = 1e-6);
        assert_relative_eq!(profile.duration(), 2.5, epsilon = 0.02);
    }

    #[test]
    fn test_start_velocity_capped() {
        let constraints = SimpleConstraints {
            v_max: 2.0,
            a_max: 1.0,
        };
        let profile = generate_profile(
            &constraints,
            2.0,
            &ProfileParams::builder().target_start_vel(0.5).build(),
        )
        .unwrap();
        assert!(profile.segments()[0].v <= 0.5 + 1e-9);
    }

    #[test]
    fn test_velocity_caps_respected() {
        struct Varying;
        impl ProfileConstraints for Varying {
            fn max_velocity(&self, s: f64) -> f64 {
                0.4 + 0.3 * (3.0 * s).sin().abs()
            }
            fn accel_range(&self, _s: f64, _velocity: f64) -> Interval {
                Interval::symmetric(2.0, 0.0)
            }
        }

        let profile = generate_profile(&Varying, 3.0, &params()).unwrap();
        for segment in profile.segments() {
            assert!(segment.v <= Varying.max_velocity(segment.s) + 0.011);
            let range = Varying.accel_range(segment.s, segment.v);
            assert!(segment.a >= range.lo() - 1e-6 && segment.a <= range.hi() + 1e-6);
            assert!(segment.v >= 0.0);
        }
    }

    #[test]
    fn test_speed_dependent_damping() {
        // Upper acceleration collapses with speed, like a voltage limit;
        // the schedule must settle near the steady state.
        struct Damped;
        impl ProfileConstraints for Damped {
            fn max_velocity(&self, _s: f64) -> f64 {
                10.0
            }
            fn accel_range(&self, _s: f64, velocity: f64) -> Interval {
                Interval::new(-5.0, 1.0 - 2.0 * velocity)
            }
        }

        let profile = generate_profile(&Damped, 2.0, &params()).unwrap();
        for segment in profile.segments() {
            // Steady state is 0.5; allow the discretization overshoot.
            assert!(segment.v <= 0.6);
        }
    }

    #[test]
    fn test_infeasible_speed_triggers_fallback_search() {
        // The range vanishes outright above a speed threshold, so the
        // bisection fallback has to pull every infeasible point down.
        struct Thresholded;
        impl ProfileConstraints for Thresholded {
            fn max_velocity(&self, _s: f64) -> f64 {
                10.0
            }
            fn accel_range(&self, _s: f64, velocity: f64) -> Interval {
                if velocity > 0.3 {
                    Interval::EMPTY
                } else {
                    Interval::symmetric(5.0, 0.0)
                }
            }
        }

        let profile = generate_profile(
            &Thresholded,
            1.0,
            &ProfileParams::builder().target_start_vel(10.0).build(),
        )
        .unwrap();
        for segment in profile.segments() {
            assert!(segment.v <= 0.3 + 0.011);
        }
    }

    #[test]
    fn test_time_and_distance_queries_agree() {
        let constraints = SimpleConstraints {
            v_max: 1.2,
            a_max: 0.8,
        };
        let profile = generate_profile(&constraints, 3.0, &params()).unwrap();
        let mut stepper = profile.stepper();
        for i in 0..=100 {
            let t = profile.duration() * i as f64 / 100.0;
            let by_time = profile.state_at_time(t);
            let by_distance = profile.state_at_distance(by_time.x);
            assert_relative_eq!(by_time.v, by_distance.v, epsilon = 1e-6);
            let stepped = stepper.state_at_time(t);
            assert_relative_eq!(stepped.x, by_time.x, epsilon = 1e-9);
            assert_relative_eq!(stepped.v, by_time.v, epsilon = 1e-9);
        }
    }

    #[test]
    fn test_duration_matches_integral_of_inverse_speed() {
        let constraints = SimpleConstraints {
            v_max: 1.0,
            a_max: 1.0,
        };
        let profile = generate_profile(&constraints, 2.0, &params()).unwrap();
        // Trapezoid rule over ds / v, skipping the stationary endpoints.
        let mut integral = 0.0;
        let segments = profile.segments();
        for pair in segments.windows(2) {
            let ds = pair[1].s - pair[0].s;
            if pair[0].v + pair[1].v > EPS {
                integral += 2.0 * ds / (pair[0].v + pair[1].v);
            }
        }
        let tail = profile.distance() - segments.last().unwrap().s;
        integral += 2.0 * tail / (segments.last().unwrap().v + profile.end_vel()).max(EPS);
        assert_relative_eq!(integral, profile.duration(), epsilon = 0.05);
    }

    #[test]
    fn test_unsatisfiable_constraints_error() {
        struct Blocked;
        impl ProfileConstraints for Blocked {
            fn max_velocity(&self, _s: f64) -> f64 {
                1.0
            }
            fn accel_range(&self, s: f64, _velocity: f64) -> Interval {
                if s > 0.5 {
                    Interval::EMPTY
                } else {
                    Interval::symmetric(1.0, 0.0)
                }
            }
        }

        match generate_profile(&Blocked, 1.0, &params()) {
            Err(Error::Unsatisfiable { s, .. }) => assert!(s > 0.5),
            other => panic!("expected unsatisfiable constraints, got {other:?}"),
        }
    }

    #[test]
    fn test_argument_validation() {
        let constraints = SimpleConstraints {
            v_max: 1.0,
            a_max: 1.0,
        };
        assert!(matches!(
            generate_profile(&constraints, 0.0, &params()),
            Err(Error::NonPositiveDistance(_))
        ));
        assert!(matches!(
            generate_profile(
                &constraints,
                0.005,
                &ProfileParams::builder().segment_size(0.01).build()
            ),
            Err(Error::SegmentSize { .. })
        ));
        assert!(matches!(
            generate_profile(
                &constraints,
                1.0,
                &ProfileParams::builder().target_end_vel(-1.0).build()
            ),
            Err(Error::NegativeTargetVelocity(_))
        ));
        assert!(matches!(
            generate_profile(
                &constraints,
                1.0,
                &ProfileParams::builder().max_vel_search_tolerance(0.0).build()
            ),
            Err(Error::NonPositiveTolerance(_))
        ));
    }

    #[test]
    fn test_unconstrained_acceleration_is_caps_only() {
        struct CapsOnly;
        impl ProfileConstraints for CapsOnly {
            fn max_velocity(&self, _s: f64) -> f64 {
                2.0
            }
            fn accel_range(&self, _s: f64, _velocity: f64) -> Interval {
                Interval::REAL
            }
        }

        let profile = generate_profile(&CapsOnly, 1.0, &params()).unwrap();
        // With unbounded acceleration the schedule rides the velocity cap.
        assert_relative_eq!(profile.duration(), 0.5, epsilon = 0.02);
    }
}
