//! # Frame-by-frame velocity estimation
//!
//! [`VelocityEstimator`] is the single entry point of the pipeline. Every tick it takes a new
//! frame, compares it with the previous one of the same stream, and produces a ground velocity
//! estimate:
//!
//! ```text
//! FrameCache -> MotionFieldEstimator -> FlowAggregator -> RotationCompensator -> MetricProjector
//! ```

use crate::prelude::v1::*;
use log::*;
use nalgebra as na;

/// Reason a tick was rejected without computing anything.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(::serde::Serialize, ::serde::Deserialize))]
pub enum InvalidInput {
    /// Elapsed time was not finite or not above the configured minimum.
    Dt,
    /// Altitude was not finite or not positive.
    Altitude,
}

/// How a [`VelocityEstimate`] came to be.
///
/// Every status other than `Measured` and `Damped` comes with a zero velocity.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(::serde::Serialize, ::serde::Deserialize))]
pub enum EstimateStatus {
    /// Velocity computed from significant motion.
    Measured,
    /// Motion was insignificant, velocity comes from the damped previous motion.
    Damped,
    /// First frame of the stream, nothing to compare against yet.
    Bootstrap,
    /// Tick inputs were rejected.
    InvalidInput(InvalidInput),
    /// Computed velocity was not finite or exceeded the plausibility limit.
    Implausible,
}

impl std::fmt::Display for EstimateStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        let name = match self {
            Self::Measured => "measured",
            Self::Damped => "damped",
            Self::Bootstrap => "bootstrap",
            Self::InvalidInput(InvalidInput::Dt) => "invalid_dt",
            Self::InvalidInput(InvalidInput::Altitude) => "invalid_altitude",
            Self::Implausible => "implausible",
        };
        f.write_str(name)
    }
}

/// Horizontal ground velocity in meters per second.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(::serde::Serialize, ::serde::Deserialize))]
pub struct VelocityEstimate {
    pub vx: f32,
    pub vy: f32,
    /// Euclidean norm of `(vx, vy)`.
    pub speed: f32,
    pub status: EstimateStatus,
}

impl VelocityEstimate {
    pub fn new(vx: f32, vy: f32, status: EstimateStatus) -> Self {
        Self {
            vx,
            vy,
            speed: vx.hypot(vy),
            status,
        }
    }

    /// Estimate with no velocity.
    pub fn zero(status: EstimateStatus) -> Self {
        Self::new(0.0, 0.0, status)
    }

    pub fn velocity(&self) -> na::Vector2<f32> {
        na::Vector2::new(self.vx, self.vy)
    }

    /// Normalized movement direction, or `None` if there is no movement.
    pub fn direction(&self) -> Option<na::Vector2<f32>> {
        (self.speed > 0.0 && self.speed.is_finite()).then(|| self.velocity() / self.speed)
    }

    /// Whether the estimate carries a computed velocity.
    pub fn is_valid(&self) -> bool {
        matches!(
            self.status,
            EstimateStatus::Measured | EstimateStatus::Damped
        )
    }
}

/// Lifecycle of a [`VelocityEstimator`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EstimatorState {
    /// No frame accepted yet.
    Uninitialized,
    /// A reference frame is cached.
    Warmed,
}

/// Streaming velocity estimator for a single camera.
///
/// An instance owns the reference frame of its stream, so it must be used by exactly one camera
/// stream. `step` takes `&mut self`, which also means ticks can not overlap.
pub struct VelocityEstimator<E> {
    estimator: E,
    config: PipelineConfig,
    cache: FrameCache,
    aggregator: FlowAggregator,
    compensator: RotationCompensator,
    projector: MetricProjector,
    field: Option<MotionField>,
}

impl<E: MotionFieldEstimator> VelocityEstimator<E> {
    /// Create a new estimator.
    ///
    /// # Arguments
    ///
    /// * `estimator` - dense motion field estimator to use.
    /// * `config` - pipeline configuration, validated here.
    pub fn new(estimator: E, config: PipelineConfig) -> Result<Self> {
        config.validate()?;

        Ok(Self {
            estimator,
            aggregator: FlowAggregator::new(config.aggregator),
            config,
            cache: FrameCache::new(),
            compensator: RotationCompensator,
            projector: MetricProjector,
            field: None,
        })
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn estimator(&self) -> &E {
        &self.estimator
    }

    pub fn state(&self) -> EstimatorState {
        if self.cache.has_previous() {
            EstimatorState::Warmed
        } else {
            EstimatorState::Uninitialized
        }
    }

    pub fn is_warmed(&self) -> bool {
        self.state() == EstimatorState::Warmed
    }

    /// Motion field produced by the most recent accepted tick.
    pub fn last_field(&self) -> Option<&MotionField> {
        self.field.as_ref()
    }

    /// Motion of a single pixel in the most recent field.
    ///
    /// Returns `None` before the first accepted tick, or if the coordinates are out of bounds.
    pub fn motion_at(&self, x: usize, y: usize) -> Option<na::Vector2<f32>> {
        self.field.as_ref()?.motion_at(x, y)
    }

    /// Drop all stream state, as if no frame was ever seen.
    pub fn reset(&mut self) {
        self.cache.reset();
        self.aggregator.reset();
        self.field = None;
    }

    fn check_preconditions(&self, frame: &Frame, geometry: &CameraGeometry) -> Result<()> {
        geometry.validate()?;
        geometry.check_resolution(frame.dim())?;

        match self.cache.dim() {
            Some(dim) if dim != frame.dim() => Err(Error::dimension_mismatch(dim, frame.dim())),
            _ => Ok(()),
        }
    }

    fn check_input(&self, altitude: f32, dt: f32) -> Option<InvalidInput> {
        if !(dt.is_finite() && dt > self.config.limits.min_dt) {
            Some(InvalidInput::Dt)
        } else if !(altitude.is_finite() && altitude > 0.0) {
            Some(InvalidInput::Altitude)
        } else {
            None
        }
    }

    /// Process the next frame of the stream.
    ///
    /// Precondition violations (mismatching frame dimensions, unusable geometry) are returned as
    /// errors. Bad tick data yields a zero estimate with an `InvalidInput` status. In both cases
    /// the stream state is left untouched.
    ///
    /// # Arguments
    ///
    /// * `frame` - new grayscale frame.
    /// * `gyro` - angular rates, `None` if unavailable.
    /// * `altitude` - height above ground in meters.
    /// * `dt` - seconds elapsed since the previous frame.
    /// * `geometry` - camera geometry.
    pub fn step(
        &mut self,
        frame: Frame,
        gyro: Option<GyroSample>,
        altitude: f32,
        dt: f32,
        geometry: &CameraGeometry,
    ) -> Result<VelocityEstimate> {
        self.check_preconditions(&frame, geometry)?;

        if let Some(invalid) = self.check_input(altitude, dt) {
            warn!("rejecting tick ({invalid:?}): altitude={altitude} dt={dt}");
            return Ok(VelocityEstimate::zero(EstimateStatus::InvalidInput(invalid)));
        }

        let (width, height) = frame.dim();

        let previous = match self.cache.previous() {
            Some(previous) => previous,
            None => {
                debug!("priming {width}x{height} stream");
                self.field = Some(MotionField::zeros(width, height));
                self.cache.update(frame);
                return Ok(VelocityEstimate::zero(EstimateStatus::Bootstrap));
            }
        };

        let field = self.estimator.estimate(previous, &frame)?;

        if field.dim() != frame.dim() {
            return Err(Error::dimension_mismatch(frame.dim(), field.dim()));
        }

        let window = self.aggregator.window(width, height);
        let accepted = self.aggregator.last();
        let aggregate = self.aggregator.aggregate(&field, &window)?;

        let pixel_velocity = self
            .compensator
            .compensate(aggregate.motion, gyro.as_ref(), width, height, dt);

        let mut estimate = self
            .projector
            .project(pixel_velocity, altitude, geometry, width, height, dt);

        if aggregate.fallback {
            estimate.status = EstimateStatus::Damped;
        }

        self.cache.update(frame);
        self.field = Some(field);

        if !estimate.speed.is_finite() || estimate.speed > self.config.limits.max_speed {
            warn!(
                "discarding implausible velocity ({}, {}) from pixel motion {:?}",
                estimate.vx, estimate.vy, pixel_velocity
            );
            // Damping continues from the last accepted vector, not the discarded one.
            self.aggregator.set_last(accepted);
            return Ok(VelocityEstimate::zero(EstimateStatus::Implausible));
        }

        debug!(
            "flow {:?} (fallback: {}) -> compensated {:?} -> velocity ({:.3}, {:.3})",
            aggregate.measured, aggregate.fallback, pixel_velocity, estimate.vx, estimate.vy
        );

        Ok(estimate)
    }
}
