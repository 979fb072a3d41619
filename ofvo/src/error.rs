//! # Error types
//!
//! Only caller mistakes are reported through [`Error`]. Bad runtime data (a zero `dt`, a negative
//! altitude) is not an error, it produces a zero estimate tagged with
//! [`InvalidInput`](crate::velocity::InvalidInput).

use thiserror::Error;

/// Precondition violations raised by the pipeline.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum Error {
    /// A frame with zero width or height was supplied.
    #[error("degenerate frame: {width}x{height}")]
    DegenerateFrame {
        /// Supplied width.
        width: usize,
        /// Supplied height.
        height: usize,
    },

    /// Pixel buffer length does not match the frame dimensions.
    #[error("buffer size mismatch: expected {expected}, got {actual}")]
    BufferSizeMismatch {
        /// Expected buffer length.
        expected: usize,
        /// Actual buffer length.
        actual: usize,
    },

    /// Two frames (or a frame and the configured stream) disagree on dimensions.
    #[error("dimension mismatch: expected {expected:?}, got {actual:?}")]
    DimensionMismatch {
        /// Dimensions the stream expects.
        expected: (usize, usize),
        /// Dimensions that were supplied.
        actual: (usize, usize),
    },

    /// The aggregation window does not cover a single pixel of the field.
    #[error("aggregation window centered at {center:?} does not intersect a {width}x{height} field")]
    EmptyWindow {
        /// Window center in pixels.
        center: (usize, usize),
        /// Field width.
        width: usize,
        /// Field height.
        height: usize,
    },

    /// A configuration value is outside of its valid range.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

impl Error {
    /// Creates a dimension mismatch error.
    #[must_use]
    pub const fn dimension_mismatch(expected: (usize, usize), actual: (usize, usize)) -> Self {
        Self::DimensionMismatch { expected, actual }
    }

    /// Creates an invalid configuration error.
    #[must_use]
    pub fn invalid_config(msg: impl Into<String>) -> Self {
        Self::InvalidConfig(msg.into())
    }
}

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_messages() {
        let err = Error::dimension_mismatch((64, 48), (32, 48));
        assert_eq!(
            err.to_string(),
            "dimension mismatch: expected (64, 48), got (32, 48)"
        );

        let err = Error::BufferSizeMismatch {
            expected: 12,
            actual: 10,
        };
        assert!(err.to_string().contains("expected 12, got 10"));

        let err = Error::invalid_config("window_size must be odd");
        assert_eq!(
            err.to_string(),
            "invalid configuration: window_size must be odd"
        );
    }
}
