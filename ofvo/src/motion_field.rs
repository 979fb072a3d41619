//! # Dense per-pixel motion field

use crate::error::{Error, Result};
use nalgebra::*;

/// Dense optical flow motion field.
///
/// One displacement vector (in pixels) is stored for every pixel of the frame the field was
/// computed from.
#[derive(Clone, Debug, PartialEq)]
pub struct MotionField {
    vf: Matrix2xX<f32>,
    width: usize,
}

impl MotionField {
    /// Create a new motion field with no motion at all.
    ///
    /// # Arguments
    ///
    /// * `width` - width of the field.
    /// * `height` - height of the field.
    pub fn zeros(width: usize, height: usize) -> Self {
        Self {
            vf: Matrix2xX::repeat(width * height, 0f32),
            width,
        }
    }

    /// Create a motion field from interleaved `[x, y]` displacements in row-major order.
    pub fn from_interleaved(width: usize, height: usize, flow: &[f32]) -> Result<Self> {
        if flow.len() != width * height * 2 {
            return Err(Error::BufferSizeMismatch {
                expected: width * height * 2,
                actual: flow.len(),
            });
        }

        Ok(Self {
            vf: Matrix2xX::from_column_slice(flow),
            width,
        })
    }

    /// Get width and height of the motion field.
    pub fn dim(&self) -> (usize, usize) {
        if self.width == 0 {
            (0, 0)
        } else {
            (self.width, self.vf.ncols() / self.width)
        }
    }

    /// Get size of the motion field.
    ///
    /// This is the same as `width * height`
    pub fn size(&self) -> usize {
        self.vf.ncols()
    }

    /// Get the motion field in row-major order.
    ///
    /// The elements returned are in the following order:
    ///
    /// `field[0,0].x, field[0,0].y, field[1,0].x, ... field[W,0].y, field[0,1].x, ... field[W,H].y`
    pub fn as_slice(&self) -> &[f32] {
        self.vf.as_slice()
    }

    /// Set motion at given position.
    pub fn set_motion(&mut self, x: usize, y: usize, motion: Vector2<f32>) {
        self.vf.set_column(self.width * y + x, &motion);
    }

    /// Get motion at coordinates.
    ///
    /// # Panics
    ///
    /// Panics if the coordinates are outside of the field.
    pub fn get_motion(&self, x: usize, y: usize) -> Vector2<f32> {
        self.vf.column(self.width * y + x).into()
    }

    /// Get motion at coordinates, or `None` if they are outside of the field.
    pub fn motion_at(&self, x: usize, y: usize) -> Option<Vector2<f32>> {
        let (w, h) = self.dim();
        (x < w && y < h).then(|| self.get_motion(x, y))
    }

    /// Iterate every element of the motion field.
    ///
    /// The resulting iterator yields `(x, y, motion)` entries.
    pub fn iter(&self) -> impl Iterator<Item = (usize, usize, Vector2<f32>)> + '_ {
        let (width, height) = self.dim();
        (0..height).flat_map(move |y| (0..width).map(move |x| (x, y, self.get_motion(x, y))))
    }

    /// Average displacement magnitude over the whole field.
    pub fn mean_magnitude(&self) -> f32 {
        if self.size() == 0 {
            return 0.0;
        }

        self.vf.column_iter().map(|c| c.magnitude()).sum::<f32>() / self.size() as f32
    }
}
