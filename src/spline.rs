//! Quintic polynomial curves in the plane.

use serde::{Deserialize, Serialize};

use crate::math::{Vec2, EPS};

/// A planar quintic polynomial `p(u) = c0 + c1*u + ... + c5*u^5` on `u in [0, 1]`,
/// with analytic derivatives up to third order.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct QuinticSpline {
    coeffs: [Vec2; 6],
}

impl QuinticSpline {
    /// Builds from the six control points of a quintic Bezier curve.
    pub fn from_control_points(p: [Vec2; 6]) -> Self {
        Self {
            coeffs: [
                p[0],
                5.0 * (p[1] - p[0]),
                10.0 * (p[2] - 2.0 * p[1] + p[0]),
                10.0 * (p[3] - 3.0 * p[2] + 3.0 * p[1] - p[0]),
                5.0 * (p[4] - 4.0 * p[3] + 6.0 * p[2] - 4.0 * p[1] + p[0]),
                p[5] - 5.0 * p[4] + 10.0 * p[3] - 10.0 * p[2] + 5.0 * p[1] - p[0],
            ],
        }
    }

    /// Builds the quintic Hermite interpolant of endpoint
    /// (position, derivative, second derivative) triples.
    pub fn from_derivatives(start: [Vec2; 3], end: [Vec2; 3]) -> Self {
        let [p0, v0, a0] = start;
        let [p1, v1, a1] = end;

        Self {
            coeffs: [
                p0,
                v0,
                0.5 * a0,
                -10.0 * p0 - 6.0 * v0 - 1.5 * a0 + 10.0 * p1 - 4.0 * v1 + 0.5 * a1,
                15.0 * p0 + 8.0 * v0 + 1.5 * a0 - 15.0 * p1 + 7.0 * v1 - a1,
                -6.0 * p0 - 3.0 * v0 - 0.5 * a0 + 6.0 * p1 - 3.0 * v1 + 0.5 * a1,
            ],
        }
    }

    pub fn point(&self, u: f64) -> Vec2 {
        let c = &self.coeffs;
        ((((c[5] * u + c[4]) * u + c[3]) * u + c[2]) * u + c[1]) * u + c[0]
    }

    pub fn deriv(&self, u: f64) -> Vec2 {
        let c = &self.coeffs;
        (((5.0 * c[5] * u + 4.0 * c[4]) * u + 3.0 * c[3]) * u + 2.0 * c[2]) * u + c[1]
    }

    pub fn second_deriv(&self, u: f64) -> Vec2 {
        let c = &self.coeffs;
        ((20.0 * c[5] * u + 12.0 * c[4]) * u + 6.0 * c[3]) * u + 2.0 * c[2]
    }

    pub fn third_deriv(&self, u: f64) -> Vec2 {
        let c = &self.coeffs;
        (60.0 * c[5] * u + 24.0 * c[4]) * u + 6.0 * c[3]
    }

    /// Signed curvature `(p' x p'') / |p'|^3`; 0 where the derivative vanishes.
    pub fn curvature(&self, u: f64) -> f64 {
        let d1 = self.deriv(u);
        let speed = d1.norm();
        if speed < EPS {
            return 0.0;
        }
        d1.perp(&self.second_deriv(u)) / (speed * speed * speed)
    }

    /// Derivative of curvature with respect to `u`; 0 where the derivative vanishes.
    pub fn curvature_deriv(&self, u: f64) -> f64 {
        let d1 = self.deriv(u);
        let speed = d1.norm();
        if speed < EPS {
            return 0.0;
        }
        let d2 = self.second_deriv(u);
        let d3 = self.third_deriv(u);
        let speed3 = speed * speed * speed;
        d1.perp(&d3) / speed3 - 3.0 * d1.perp(&d2) * d1.dot(&d2) / (speed3 * speed * speed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use proptest::prelude::*;
    use rand::{rngs::StdRng, Rng, SeedableRng};

    const H: f64 = 1e-6;

    fn sample_spline() -> QuinticSpline {
        QuinticSpline::from_control_points([
            Vec2::new(0.0, 0.0),
            Vec2::new(1.0, 0.0),
            Vec2::new(2.0, 0.0),
            Vec2::new(2.0, 1.0),
            Vec2::new(2.0, 2.0),
            Vec2::new(3.0, 2.0),
        ])
    }

    fn random_spline(seed: u64) -> QuinticSpline {
        let mut rng = StdRng::seed_from_u64(seed);
        let mut point = || Vec2::new(rng.gen_range(-10.0..10.0), rng.gen_range(-10.0..10.0));
        QuinticSpline::from_control_points([point(), point(), point(), point(), point(), point()])
    }

    #[test]
    fn test_control_point_endpoints() {
        let spline = sample_spline();
        assert_relative_eq!(spline.point(0.0).x, 0.0);
        assert_relative_eq!(spline.point(0.0).y, 0.0);
        assert_relative_eq!(spline.point(1.0).x, 3.0, epsilon = 1e-12);
        assert_relative_eq!(spline.point(1.0).y, 2.0, epsilon = 1e-12);
    }

    #[test]
    fn test_hermite_boundary_conditions() {
        let start = [Vec2::new(0.0, 0.0), Vec2::new(2.0, 1.0), Vec2::new(0.5, -1.0)];
        let end = [Vec2::new(4.0, 3.0), Vec2::new(-1.0, 2.0), Vec2::new(1.0, 0.0)];
        let spline = QuinticSpline::from_derivatives(start, end);

        for (u, expected) in [(0.0, start), (1.0, end)] {
            let p = spline.point(u);
            let d = spline.deriv(u);
            let dd = spline.second_deriv(u);
            assert_relative_eq!(p.x, expected[0].x, epsilon = 1e-9);
            assert_relative_eq!(p.y, expected[0].y, epsilon = 1e-9);
            assert_relative_eq!(d.x, expected[1].x, epsilon = 1e-9);
            assert_relative_eq!(d.y, expected[1].y, epsilon = 1e-9);
            assert_relative_eq!(dd.x, expected[2].x, epsilon = 1e-9);
            assert_relative_eq!(dd.y, expected[2].y, epsilon = 1e-9);
        }
    }

    #[test]
    fn test_degenerate_curvature_is_zero() {
        // All control points coincident: p'(u) = 0 everywhere.
        let p = Vec2::new(1.0, 1.0);
        let spline = QuinticSpline::from_control_points([p; 6]);
        assert_eq!(spline.curvature(0.5), 0.0);
        assert_eq!(spline.curvature_deriv(0.5), 0.0);
    }

    proptest! {
        #[test]
        fn test_derivatives_match_finite_differences(seed in 0u64..32, u in 0.01f64..0.99) {
            let spline = random_spline(seed);
            let scale = spline.deriv(u).norm().max(1.0);

            let d_num = (spline.point(u + H) - spline.point(u - H)) / (2.0 * H);
            let d = spline.deriv(u);
            prop_assert!((d_num - d).norm() < 1e-3 * scale);

            let dd_num = (spline.deriv(u + H) - spline.deriv(u - H)) / (2.0 * H);
            let dd = spline.second_deriv(u);
            prop_assert!((dd_num - dd).norm() < 1e-3 * scale.max(dd.norm()));

            let ddd_num = (spline.second_deriv(u + H) - spline.second_deriv(u - H)) / (2.0 * H);
            let ddd = spline.third_deriv(u);
            prop_assert!((ddd_num - ddd).norm() < 1e-3 * scale.max(ddd.norm()));
        }

        #[test]
        fn test_curvature_deriv_matches_finite_differences(seed in 0u64..32, u in 0.01f64..0.99) {
            let spline = random_spline(seed);
            prop_assume!(spline.deriv(u).norm() > 0.1);

            let k_num = (spline.curvature(u + H) - spline.curvature(u - H)) / (2.0 * H);
            let k = spline.curvature_deriv(u);
            prop_assert!((k_num - k).abs() < 1e-3 * k.abs().max(1.0));
        }
    }
}
