//! # Per-stream reference frame cache

use crate::frame::Frame;

/// Holds the previous frame of a single camera stream.
///
/// A cache starts out `Empty`. The first frame primes it, every following frame replaces the
/// stored one. Caches must never be shared between streams.
#[derive(Clone, Debug, Default)]
pub enum FrameCache {
    /// No frame was recorded yet.
    #[default]
    Empty,
    /// Holds the most recent frame of the stream.
    Primed(Frame),
}

impl FrameCache {
    pub fn new() -> Self {
        Self::Empty
    }

    /// Whether a previous frame is available.
    pub fn has_previous(&self) -> bool {
        matches!(self, Self::Primed(_))
    }

    /// Get the previous frame, if the cache is primed.
    pub fn previous(&self) -> Option<&Frame> {
        match self {
            Self::Primed(frame) => Some(frame),
            Self::Empty => None,
        }
    }

    /// Dimensions of the stream, once known.
    pub fn dim(&self) -> Option<(usize, usize)> {
        self.previous().map(Frame::dim)
    }

    /// Record a new frame.
    ///
    /// Returns the frame that was replaced, if any.
    pub fn update(&mut self, frame: Frame) -> Option<Frame> {
        match std::mem::replace(self, Self::Primed(frame)) {
            Self::Primed(old) => Some(old),
            Self::Empty => None,
        }
    }

    /// Forget the stored frame.
    pub fn reset(&mut self) {
        *self = Self::Empty;
    }
}
