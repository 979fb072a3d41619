//! # Pixel to ground projection

use crate::camera::CameraGeometry;
use crate::velocity::{EstimateStatus, VelocityEstimate};
use nalgebra as na;

/// Converts pixel displacement into ground-plane velocity.
///
/// Each pixel of displacement is turned into an angle using the field-of-view of its axis, and
/// that angle is projected onto the ground plane `altitude` meters below the camera.
#[derive(Clone, Copy, Debug, Default)]
pub struct MetricProjector;

impl MetricProjector {
    /// Angular displacement of each axis in radians.
    pub fn angular_displacement(
        &self,
        pixels: na::Vector2<f32>,
        geometry: &CameraGeometry,
        width: usize,
        height: usize,
    ) -> na::Vector2<f32> {
        let (ax, ay) = geometry.pixel_angle(width, height);
        na::Vector2::new(pixels.x * ax, pixels.y * ay)
    }

    /// Ground displacement in meters.
    ///
    /// Angles at or beyond 90 degrees have no ground intersection and produce non-finite
    /// components.
    pub fn ground_displacement(
        &self,
        pixels: na::Vector2<f32>,
        altitude: f32,
        geometry: &CameraGeometry,
        width: usize,
        height: usize,
    ) -> na::Vector2<f32> {
        let angle = self.angular_displacement(pixels, geometry, width, height);
        angle.map(|a| {
            if a.abs() < std::f32::consts::FRAC_PI_2 {
                altitude * a.tan()
            } else {
                f32::INFINITY.copysign(a)
            }
        })
    }

    /// Project pixel displacement over `dt` seconds into a velocity estimate.
    ///
    /// # Arguments
    ///
    /// * `pixel_velocity` - displacement observed over `dt`, in pixels.
    /// * `altitude` - height above ground in meters.
    /// * `geometry` - camera geometry.
    /// * `width` - frame width in pixels.
    /// * `height` - frame height in pixels.
    /// * `dt` - elapsed time in seconds.
    pub fn project(
        &self,
        pixel_velocity: na::Vector2<f32>,
        altitude: f32,
        geometry: &CameraGeometry,
        width: usize,
        height: usize,
        dt: f32,
    ) -> VelocityEstimate {
        let ground = self.ground_displacement(pixel_velocity, altitude, geometry, width, height);
        let velocity = ground / dt;
        VelocityEstimate::new(velocity.x, velocity.y, EstimateStatus::Measured)
    }
}
