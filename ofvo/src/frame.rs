//! # Grayscale camera frames

use crate::error::{Error, Result};

/// Luma weights for RGB to grayscale conversion (ITU-R BT.601).
const LUMA_WEIGHTS: [f32; 3] = [0.299, 0.587, 0.114];

/// Immutable 8-bit grayscale frame.
///
/// Pixels are stored in row-major order without padding. Both dimensions are guaranteed to be
/// non-zero.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Frame {
    data: Vec<u8>,
    width: usize,
    height: usize,
}

impl Frame {
    /// Create a frame from a row-major intensity buffer.
    ///
    /// # Arguments
    ///
    /// * `width` - width of the frame.
    /// * `height` - height of the frame.
    /// * `data` - `width * height` intensities.
    pub fn new(width: usize, height: usize, data: Vec<u8>) -> Result<Self> {
        Self::check_dim(width, height)?;

        if data.len() != width * height {
            return Err(Error::BufferSizeMismatch {
                expected: width * height,
                actual: data.len(),
            });
        }

        Ok(Self {
            data,
            width,
            height,
        })
    }

    /// Create a frame from interleaved `[r, g, b]` pixels.
    ///
    /// Vision sensors on the vehicle deliver RGB, the pipeline only needs luma.
    pub fn from_rgb(width: usize, height: usize, rgb: &[u8]) -> Result<Self> {
        Self::check_dim(width, height)?;

        if rgb.len() != width * height * 3 {
            return Err(Error::BufferSizeMismatch {
                expected: width * height * 3,
                actual: rgb.len(),
            });
        }

        let data = rgb
            .chunks_exact(3)
            .map(|px| {
                let luma = px
                    .iter()
                    .zip(LUMA_WEIGHTS)
                    .map(|(&c, w)| c as f32 * w)
                    .sum::<f32>();
                luma.round().clamp(0.0, 255.0) as u8
            })
            .collect();

        Ok(Self {
            data,
            width,
            height,
        })
    }

    /// Create a frame by evaluating `f(x, y)` at every pixel.
    pub fn from_fn(
        width: usize,
        height: usize,
        mut f: impl FnMut(usize, usize) -> u8,
    ) -> Result<Self> {
        Self::check_dim(width, height)?;

        let data = (0..height)
            .flat_map(|y| (0..width).map(move |x| (x, y)))
            .map(|(x, y)| f(x, y))
            .collect();

        Ok(Self {
            data,
            width,
            height,
        })
    }

    fn check_dim(width: usize, height: usize) -> Result<()> {
        if width == 0 || height == 0 {
            Err(Error::DegenerateFrame { width, height })
        } else {
            Ok(())
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    /// Get width and height of the frame.
    pub fn dim(&self) -> (usize, usize) {
        (self.width, self.height)
    }

    /// Get the raw intensities in row-major order.
    pub fn as_slice(&self) -> &[u8] {
        &self.data
    }

    /// Get a single row of the frame.
    pub fn row(&self, y: usize) -> &[u8] {
        &self.data[y * self.width..(y + 1) * self.width]
    }

    /// Get intensity at coordinates.
    ///
    /// # Panics
    ///
    /// Panics if the coordinates are outside of the frame.
    pub fn get(&self, x: usize, y: usize) -> u8 {
        assert!(x < self.width && y < self.height, "({x}, {y}) out of bounds");
        self.data[y * self.width + x]
    }
}
