//! # Dense motion field estimation

use crate::prelude::v1::*;

/// Generic dense motion field estimator.
///
/// Implementations must be pure: the same pair of frames always produces the same field, and no
/// state is carried over between calls. Frame-to-frame state lives in
/// [`FrameCache`](crate::cache::FrameCache).
pub trait MotionFieldEstimator {
    /// Estimate per-pixel motion between two frames.
    ///
    /// The returned field has exactly the dimensions of the input frames. Each vector describes
    /// where the content of a pixel in `previous` moved to in `current`.
    ///
    /// # Arguments
    ///
    /// * `previous` - older frame.
    /// * `current` - newer frame, with the same dimensions as `previous`.
    fn estimate(&self, previous: &Frame, current: &Frame) -> Result<MotionField>;
}

impl<T: MotionFieldEstimator + ?Sized> MotionFieldEstimator for Box<T> {
    fn estimate(&self, previous: &Frame, current: &Frame) -> Result<MotionField> {
        (**self).estimate(previous, current)
    }
}

/// Check that two frames can be compared.
///
/// Estimators call this before doing any work.
pub fn check_pair(previous: &Frame, current: &Frame) -> Result<()> {
    if previous.dim() == current.dim() {
        Ok(())
    } else {
        Err(Error::dimension_mismatch(previous.dim(), current.dim()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pair_dimensions_must_match() {
        let a = Frame::from_fn(4, 4, |_, _| 0).unwrap();
        let b = Frame::from_fn(4, 3, |_, _| 0).unwrap();

        assert!(check_pair(&a, &a).is_ok());
        assert_eq!(
            check_pair(&a, &b),
            Err(Error::dimension_mismatch((4, 4), (4, 3)))
        );
    }
}
