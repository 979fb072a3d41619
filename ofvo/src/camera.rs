//! # Camera geometry

use crate::error::{Error, Result};

/// Static geometry of a downward facing pinhole camera.
///
/// The camera is defined by its horizontal and vertical field-of-view. The principal point is
/// assumed to be at the center of the image.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(::serde::Serialize, ::serde::Deserialize))]
pub struct CameraGeometry {
    /// Horizontal field-of-view in radians.
    pub hfov: f32,
    /// Vertical field-of-view in radians.
    pub vfov: f32,
    /// Resolution every frame of the stream must have, if known upfront.
    #[cfg_attr(feature = "serde", serde(default))]
    pub resolution: Option<(usize, usize)>,
}

impl Default for CameraGeometry {
    fn default() -> Self {
        Self::from_degrees(60.0, 60.0)
    }
}

impl CameraGeometry {
    /// Create a new camera geometry.
    ///
    /// # Arguments
    ///
    /// * `hfov` - horizontal field-of-view (in radians).
    /// * `vfov` - vertical field-of-view (in radians).
    pub fn new(hfov: f32, vfov: f32) -> Self {
        Self {
            hfov,
            vfov,
            resolution: None,
        }
    }

    /// Create a new camera geometry from angles in degrees.
    pub fn from_degrees(hfov: f32, vfov: f32) -> Self {
        Self::new(hfov.to_radians(), vfov.to_radians())
    }

    /// Create a camera from aspect ratio and vertical field-of-view.
    ///
    /// # Arguments
    ///
    /// * `aspect` - screen aspect ratio (width divided by height).
    /// * `fov_y` - vertical field-of-view (in degrees).
    ///
    /// # Examples
    ///
    /// ```
    /// # use assert_approx_eq::assert_approx_eq;
    /// use ofvo::camera::CameraGeometry;
    ///
    /// let camera = CameraGeometry::from_aspect(1.0, 90.0);
    /// let (h, v) = camera.fov_degrees();
    ///
    /// assert_approx_eq!(h, 90.0f32, 0.01);
    /// assert_approx_eq!(v, 90.0f32, 0.01);
    /// ```
    pub fn from_aspect(aspect: f32, fov_y: f32) -> Self {
        let vfov = fov_y.to_radians();
        let hfov = (aspect * (vfov / 2.0).tan()).atan() * 2.0;
        Self::new(hfov, vfov)
    }

    /// Require every frame of the stream to have the given resolution.
    pub fn with_resolution(self, width: usize, height: usize) -> Self {
        Self {
            resolution: Some((width, height)),
            ..self
        }
    }

    /// Get the camera's field of view.
    ///
    /// Returns horizontal and vertical field of view in degrees as a tuple.
    pub fn fov_degrees(&self) -> (f32, f32) {
        (self.hfov.to_degrees(), self.vfov.to_degrees())
    }

    /// Angle covered by a single pixel on each axis, in radians.
    pub fn pixel_angle(&self, width: usize, height: usize) -> (f32, f32) {
        (self.hfov / width as f32, self.vfov / height as f32)
    }

    /// Check that the frame dimensions agree with the declared resolution.
    pub fn check_resolution(&self, dim: (usize, usize)) -> Result<()> {
        match self.resolution {
            Some(expected) if expected != dim => Err(Error::dimension_mismatch(expected, dim)),
            _ => Ok(()),
        }
    }

    /// Check that both angles are usable for projection.
    pub fn validate(&self) -> Result<()> {
        let range = 0.0..std::f32::consts::PI;

        if !range.contains(&self.hfov) || self.hfov == 0.0 {
            Err(Error::invalid_config(format!(
                "horizontal fov must be within (0; 180) degrees, got {}",
                self.hfov.to_degrees()
            )))
        } else if !range.contains(&self.vfov) || self.vfov == 0.0 {
            Err(Error::invalid_config(format!(
                "vertical fov must be within (0; 180) degrees, got {}",
                self.vfov.to_degrees()
            )))
        } else {
            Ok(())
        }
    }
}
