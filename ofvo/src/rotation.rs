//! # Gyro based rotation compensation
//!
//! A camera that rotates sees the whole scene slide across the image even when the vehicle does
//! not translate at all. This module removes the first-order part of that motion using angular
//! rates measured by a gyroscope.

use nalgebra as na;

/// Single angular rate measurement in radians per second.
///
/// An unavailable measurement is represented by `Option::<GyroSample>::None`, which is not the
/// same as a sample with all rates being zero.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(::serde::Serialize, ::serde::Deserialize))]
pub struct GyroSample {
    pub yaw_rate: f32,
    pub pitch_rate: f32,
    pub roll_rate: f32,
}

impl GyroSample {
    pub fn new(yaw_rate: f32, pitch_rate: f32, roll_rate: f32) -> Self {
        Self {
            yaw_rate,
            pitch_rate,
            roll_rate,
        }
    }

    /// Parse a raw `[yaw, pitch, roll]` sample as delivered by the vehicle.
    ///
    /// Returns `None` if the data is malformed: fewer than 3 components, or any of the first 3
    /// not being finite. Extra components are ignored.
    pub fn from_slice(raw: &[f32]) -> Option<Self> {
        match raw {
            [yaw, pitch, roll, ..] if [yaw, pitch, roll].iter().all(|v| v.is_finite()) => {
                Some(Self::new(*yaw, *pitch, *roll))
            }
            _ => None,
        }
    }
}

/// Removes rotation induced flow from aggregated pixel motion.
///
/// Focal length in pixels is approximated as half of the frame dimension on each axis. Roll is
/// never compensated, since for a camera looking straight down it produces no net translation
/// of the image center.
#[derive(Clone, Copy, Debug, Default)]
pub struct RotationCompensator;

impl RotationCompensator {
    /// Pixel motion caused by rotating for `dt` seconds at the measured rates.
    ///
    /// # Arguments
    ///
    /// * `gyro` - measured angular rates.
    /// * `width` - frame width in pixels.
    /// * `height` - frame height in pixels.
    /// * `dt` - elapsed time in seconds.
    pub fn rotational_flow(
        &self,
        gyro: &GyroSample,
        width: usize,
        height: usize,
        dt: f32,
    ) -> na::Vector2<f32> {
        let fx = width as f32 / 2.0;
        let fy = height as f32 / 2.0;

        na::Vector2::new(fx * gyro.yaw_rate * dt, fy * gyro.pitch_rate * dt)
    }

    /// Subtract rotation induced motion from `pixel_velocity`.
    ///
    /// If `gyro` is `None`, the input is returned unchanged.
    pub fn compensate(
        &self,
        pixel_velocity: na::Vector2<f32>,
        gyro: Option<&GyroSample>,
        width: usize,
        height: usize,
        dt: f32,
    ) -> na::Vector2<f32> {
        match gyro {
            Some(gyro) => pixel_velocity - self.rotational_flow(gyro, width, height, dt),
            None => pixel_velocity,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;

    #[test]
    fn malformed_samples() {
        assert_eq!(GyroSample::from_slice(&[]), None);
        assert_eq!(GyroSample::from_slice(&[0.1, 0.2]), None);
        assert_eq!(GyroSample::from_slice(&[0.1, f32::NAN, 0.3]), None);
        assert_eq!(
            GyroSample::from_slice(&[0.1, 0.2, 0.3, 9.0]),
            Some(GyroSample::new(0.1, 0.2, 0.3))
        );
    }

    #[test]
    fn cancels_pure_yaw() {
        let gyro = GyroSample::new(0.8, 0.0, 0.0);
        let (w, h, dt) = (160, 120, 0.05);

        // Flow observed when the camera only yaws.
        let observed = na::Vector2::new(w as f32 / 2.0 * 0.8 * dt, 0.0);

        let residual = RotationCompensator.compensate(observed, Some(&gyro), w, h, dt);
        assert_approx_eq!(residual.x, 0.0, 1e-6);
        assert_approx_eq!(residual.y, 0.0, 1e-6);
    }

    #[test]
    fn pitch_uses_vertical_focal_length() {
        let gyro = GyroSample::new(0.0, -0.5, 0.0);
        let flow = RotationCompensator.rotational_flow(&gyro, 100, 60, 0.1);
        assert_approx_eq!(flow.x, 0.0, 1e-6);
        assert_approx_eq!(flow.y, -1.5, 1e-6);
    }

    #[test]
    fn roll_is_ignored() {
        let gyro = GyroSample::new(0.0, 0.0, 3.0);
        let v = na::Vector2::new(1.0, 2.0);
        assert_eq!(RotationCompensator.compensate(v, Some(&gyro), 64, 64, 0.1), v);
    }

    #[test]
    fn missing_sample_is_not_zero_sample() {
        let v = na::Vector2::new(4.0, -1.0);
        let comp = RotationCompensator;

        assert_eq!(comp.compensate(v, None, 64, 64, 0.1), v);

        let spinning = GyroSample::new(1.0, 1.0, 0.0);
        assert_ne!(comp.compensate(v, Some(&spinning), 64, 64, 0.1), v);
    }
}
