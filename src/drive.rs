//! Drive-model algebra: matrices relating motor, wheel, and bot
//! velocities, accelerations, and voltages.

use nalgebra::{DMatrix, DVector};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::math::Vec2;

/// DC motor electrical model, parameterized at the nominal voltage.
///
/// `volts = volts_per_vel * omega + volts_per_torque * torque`, with
/// `volts_per_vel = nominal_volts / free_speed` (back-EMF) and
/// `volts_per_torque = nominal_volts / stall_torque`.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct MotorModel {
    pub nominal_volts: f64,
    /// Angular velocity at the nominal voltage under no load, rad/s.
    pub free_speed: f64,
    /// Torque at the nominal voltage at stall.
    pub stall_torque: f64,
    /// Constant torque opposing the direction of rotation.
    pub friction_torque: f64,
}

impl MotorModel {
    pub fn volts_per_vel(&self) -> f64 {
        self.nominal_volts / self.free_speed
    }

    pub fn volts_per_torque(&self) -> f64 {
        self.nominal_volts / self.stall_torque
    }
}

/// A powered wheel fixed to the bot frame.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct DriveWheel {
    /// Wheel position in the bot frame.
    pub position: Vec2,
    /// Direction the wheel transmits force along, radians in the bot frame.
    pub angle: f64,
    pub radius: f64,
    /// Motor revolutions per wheel revolution.
    pub gear_ratio: f64,
    pub motor: MotorModel,
}

/// Linear maps between bot-space `(vx, vy, omega)` and per-motor quantities.
///
/// For kinematic transmissions the velocity and acceleration maps coincide;
/// torque-side matrices go through the pseudo-inverse of the actuation
/// matrix, so over-actuated drives are handled.
#[derive(Clone, Debug, PartialEq)]
pub struct DriveModel {
    motor_vel_from_bot_vel: DMatrix<f64>,
    motor_accel_from_bot_accel: DMatrix<f64>,
    volts_from_motor_vel: DMatrix<f64>,
    volts_from_motor_accel: DMatrix<f64>,
    motor_accel_from_motor_vel: DMatrix<f64>,
    motor_accel_for_motor_friction: DVector<f64>,
    volts_for_motor_friction: DVector<f64>,
    wheel_vel_per_motor_vel: DVector<f64>,
    volts_from_bot_accel: DMatrix<f64>,
    torque_from_bot_accel: DMatrix<f64>,
    bot_accel_from_volts: DMatrix<f64>,
    bot_accel_from_bot_vel: DMatrix<f64>,
}

const PINV_EPS: f64 = 1e-10;

impl DriveModel {
    /// Builds the model for a rigid bot of the given mass and moment of
    /// inertia carrying fixed wheels.
    pub fn fixed_wheel(mass: f64, moment_of_inertia: f64, wheels: &[DriveWheel]) -> Result<Self> {
        if wheels.is_empty() {
            return Err(Error::NoWheels);
        }
        check_positive("mass", mass)?;
        check_positive("moment of inertia", moment_of_inertia)?;
        for wheel in wheels {
            check_positive("wheel radius", wheel.radius)?;
            check_positive("gear ratio", wheel.gear_ratio)?;
            check_positive("nominal volts", wheel.motor.nominal_volts)?;
            check_positive("motor free speed", wheel.motor.free_speed)?;
            check_positive("motor stall torque", wheel.motor.stall_torque)?;
            if wheel.motor.friction_torque < 0.0 {
                return Err(Error::NonPositiveParameter {
                    name: "friction torque",
                    value: wheel.motor.friction_torque,
                });
            }
        }

        let n = wheels.len();

        // Actuation matrix: motor angular velocity per unit bot velocity.
        let actuation = DMatrix::from_fn(n, 3, |i, j| {
            let wheel = &wheels[i];
            let factor = wheel.gear_ratio / wheel.radius;
            let dir = Vec2::new(wheel.angle.cos(), wheel.angle.sin());
            factor
                * match j {
                    0 => dir.x,
                    1 => dir.y,
                    _ => wheel.position.perp(&dir),
                }
        });

        let inv_inertia = DMatrix::from_diagonal(&DVector::from_vec(vec![
            1.0 / mass,
            1.0 / mass,
            1.0 / moment_of_inertia,
        ]));

        let volts_per_torque = DVector::from_fn(n, |i, _| wheels[i].motor.volts_per_torque());
        let volts_per_vel = DVector::from_fn(n, |i, _| wheels[i].motor.volts_per_vel());
        let friction_torque = DVector::from_fn(n, |i, _| wheels[i].motor.friction_torque);

        // Motor accel response to motor torque; singular when over-actuated.
        let accel_per_torque = &actuation * &inv_inertia * actuation.transpose();
        let torque_per_accel = accel_per_torque
            .clone()
            .pseudo_inverse(PINV_EPS)
            .map_err(Error::SingularDriveModel)?;

        let volts_from_motor_vel = DMatrix::from_diagonal(&volts_per_vel);
        let volts_from_motor_accel = DMatrix::from_diagonal(&volts_per_torque) * &torque_per_accel;
        let bot_accel_from_volts = &inv_inertia
            * actuation.transpose()
            * DMatrix::from_diagonal(&volts_per_torque.map(|v| 1.0 / v));
        let volts_from_bot_vel = &volts_from_motor_vel * &actuation;
        let bot_accel_from_bot_vel = -(&bot_accel_from_volts * volts_from_bot_vel);
        let motor_accel_from_motor_vel =
            -(&actuation * &bot_accel_from_volts * &volts_from_motor_vel);
        let motor_accel_for_motor_friction = -(&accel_per_torque * &friction_torque);
        let volts_for_motor_friction = volts_per_torque.component_mul(&friction_torque);
        let wheel_vel_per_motor_vel =
            DVector::from_fn(n, |i, _| wheels[i].radius / wheels[i].gear_ratio);
        let volts_from_bot_accel = &volts_from_motor_accel * &actuation;
        let torque_from_bot_accel = torque_per_accel * &actuation;

        Ok(Self {
            motor_accel_from_bot_accel: actuation.clone(),
            motor_vel_from_bot_vel: actuation,
            volts_from_motor_vel,
            volts_from_motor_accel,
            motor_accel_from_motor_vel,
            motor_accel_for_motor_friction,
            volts_for_motor_friction,
            wheel_vel_per_motor_vel,
            volts_from_bot_accel,
            torque_from_bot_accel,
            bot_accel_from_volts,
            bot_accel_from_bot_vel,
        })
    }

    /// Two-wheel differential drive; wheels face +x at `(0, +-track_width/2)`.
    pub fn differential(
        mass: f64,
        moment_of_inertia: f64,
        track_width: f64,
        wheel_radius: f64,
        gear_ratio: f64,
        motor: MotorModel,
    ) -> Result<Self> {
        check_positive("track width", track_width)?;
        let wheel = |y: f64| DriveWheel {
            position: Vec2::new(0.0, y),
            angle: 0.0,
            radius: wheel_radius,
            gear_ratio,
            motor,
        };
        Self::fixed_wheel(
            mass,
            moment_of_inertia,
            &[wheel(track_width / 2.0), wheel(-track_width / 2.0)],
        )
    }

    /// Four-wheel mecanum drive with force directions alternating at 45
    /// degrees across the corners.
    ///
    /// The front-left wheel sits at -44.99 degrees, not -45: with all four
    /// at exactly 45 degrees the actuation matrix is rank deficient and its
    /// pseudo-inverse is singular.
    pub fn mecanum(
        mass: f64,
        moment_of_inertia: f64,
        track_width: f64,
        wheel_base: f64,
        wheel_radius: f64,
        gear_ratio: f64,
        motor: MotorModel,
    ) -> Result<Self> {
        check_positive("track width", track_width)?;
        check_positive("wheel base", wheel_base)?;
        let wheel = |x: f64, y: f64, angle_deg: f64| DriveWheel {
            position: Vec2::new(x, y),
            angle: angle_deg.to_radians(),
            radius: wheel_radius,
            gear_ratio,
            motor,
        };
        let x = wheel_base / 2.0;
        let y = track_width / 2.0;
        Self::fixed_wheel(
            mass,
            moment_of_inertia,
            &[
                wheel(x, y, -44.99),
                wheel(-x, y, 45.0),
                wheel(-x, -y, -45.0),
                wheel(x, -y, 45.0),
            ],
        )
    }

    pub fn num_motors(&self) -> usize {
        self.motor_vel_from_bot_vel.nrows()
    }

    pub fn motor_vel_from_bot_vel(&self) -> &DMatrix<f64> {
        &self.motor_vel_from_bot_vel
    }

    pub fn motor_accel_from_bot_accel(&self) -> &DMatrix<f64> {
        &self.motor_accel_from_bot_accel
    }

    pub fn volts_from_motor_vel(&self) -> &DMatrix<f64> {
        &self.volts_from_motor_vel
    }

    pub fn volts_from_motor_accel(&self) -> &DMatrix<f64> {
        &self.volts_from_motor_accel
    }

    pub fn motor_accel_from_motor_vel(&self) -> &DMatrix<f64> {
        &self.motor_accel_from_motor_vel
    }

    pub fn motor_accel_for_motor_friction(&self) -> &DVector<f64> {
        &self.motor_accel_for_motor_friction
    }

    pub fn volts_for_motor_friction(&self) -> &DVector<f64> {
        &self.volts_for_motor_friction
    }

    /// Wheel tangential velocity per unit motor angular velocity.
    pub fn wheel_vel_per_motor_vel(&self) -> &DVector<f64> {
        &self.wheel_vel_per_motor_vel
    }

    /// `volts_from_motor_accel * motor_accel_from_bot_accel`.
    pub fn volts_from_bot_accel(&self) -> &DMatrix<f64> {
        &self.volts_from_bot_accel
    }

    pub fn bot_accel_from_volts(&self) -> &DMatrix<f64> {
        &self.bot_accel_from_volts
    }

    /// Back-EMF damping: `-bot_accel_from_volts * volts_from_bot_vel`.
    pub fn bot_accel_from_bot_vel(&self) -> &DMatrix<f64> {
        &self.bot_accel_from_bot_vel
    }

    /// Torque-side analogue of [`Self::volts_from_bot_accel`].
    pub fn torque_from_bot_accel(&self) -> &DMatrix<f64> {
        &self.torque_from_bot_accel
    }
}

fn check_positive(name: &'static str, value: f64) -> Result<()> {
    if value > 0.0 && value.is_finite() {
        Ok(())
    } else {
        Err(Error::NonPositiveParameter { name, value })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use nalgebra::DVector;

    fn test_motor() -> MotorModel {
        MotorModel {
            nominal_volts: 12.0,
            free_speed: 30.0,
            stall_torque: 2.0,
            friction_torque: 0.05,
        }
    }

    fn differential() -> DriveModel {
        DriveModel::differential(10.0, 1.5, 0.4, 0.05, 2.0, test_motor()).unwrap()
    }

    #[test]
    fn test_differential_motor_velocities() {
        let model = differential();
        assert_eq!(model.num_motors(), 2);

        // Straight ahead: both motors spin at gear/radius times bot speed.
        let forward = model.motor_vel_from_bot_vel() * DVector::from_vec(vec![1.0, 0.0, 0.0]);
        assert_relative_eq!(forward[0], 40.0, epsilon = 1e-9);
        assert_relative_eq!(forward[1], 40.0, epsilon = 1e-9);

        // Pure rotation: wheels counter-rotate.
        let spin = model.motor_vel_from_bot_vel() * DVector::from_vec(vec![0.0, 0.0, 1.0]);
        assert_relative_eq!(spin[0], -spin[1], epsilon = 1e-9);
        assert!(spin[0].abs() > 0.0);
    }

    #[test]
    fn test_volts_composition_identity() {
        let model = differential();
        let composed = model.volts_from_motor_accel() * model.motor_accel_from_bot_accel();
        let diff = (model.volts_from_bot_accel() - composed).norm();
        assert!(diff < 1e-12);
    }

    #[test]
    fn test_back_emf_damps_motion() {
        let model = differential();
        // Coasting forward at 1 unit/s decelerates the bot.
        let response = model.bot_accel_from_bot_vel() * DVector::from_vec(vec![1.0, 0.0, 0.0]);
        assert!(response[0] < 0.0);
        assert_relative_eq!(response[2], 0.0, epsilon = 1e-9);
        // Seen from the motor side the damping is negative as well.
        assert!(model.motor_accel_from_motor_vel()[(0, 0)] < 0.0);
    }

    #[test]
    fn test_friction_opposes_motion() {
        let model = differential();
        assert!(model.motor_accel_for_motor_friction()[0] < 0.0);
        assert!(model.volts_for_motor_friction()[0] > 0.0);
    }

    #[test]
    fn test_mecanum_is_holonomic() {
        let model = DriveModel::mecanum(12.0, 2.0, 0.35, 0.3, 0.05, 1.0, test_motor()).unwrap();
        assert_eq!(model.num_motors(), 4);

        // Lateral translation engages the motors.
        let lateral = model.motor_vel_from_bot_vel() * DVector::from_vec(vec![0.0, 1.0, 0.0]);
        assert!(lateral.amax() > 1.0);

        // And so does pure rotation.
        let spin = model.motor_vel_from_bot_vel() * DVector::from_vec(vec![0.0, 0.0, 1.0]);
        assert!(spin.amax() > 1.0);
    }

    #[test]
    fn test_rejects_bad_parameters() {
        assert!(matches!(
            DriveModel::fixed_wheel(10.0, 1.0, &[]),
            Err(Error::NoWheels)
        ));
        assert!(matches!(
            DriveModel::differential(0.0, 1.5, 0.4, 0.05, 2.0, test_motor()),
            Err(Error::NonPositiveParameter { name: "mass", .. })
        ));
        let mut motor = test_motor();
        motor.friction_torque = -1.0;
        assert!(DriveModel::differential(10.0, 1.5, 0.4, 0.05, 2.0, motor).is_err());
    }
}
