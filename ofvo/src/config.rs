//! # Pipeline configuration
//!
//! Every tunable constant of the pipeline lives here. All structures implement `Default` with
//! values that work for a typical 128-256 pixel wide downward camera, and have consuming setters
//! so they can be built fluently.

use crate::error::{Error, Result};

/// Shape of the aggregation window.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(::serde::Serialize, ::serde::Deserialize))]
pub enum WindowShape {
    /// Pixels whose Chebyshev distance to the center is within the radius.
    #[default]
    Square,
    /// Pixels whose Euclidean distance to the center is within the radius.
    Circle,
}

/// Point the aggregation window is centered on.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(::serde::Serialize, ::serde::Deserialize))]
pub enum WindowCenter {
    /// Center of the frame.
    #[default]
    FrameCenter,
    /// Explicit pixel, typically the point directly below the vehicle.
    Pixel { x: usize, y: usize },
}

impl WindowCenter {
    /// Resolve the center for a field of given size.
    pub fn resolve(&self, width: usize, height: usize) -> (usize, usize) {
        match *self {
            Self::FrameCenter => (width / 2, height / 2),
            Self::Pixel { x, y } => (x, y),
        }
    }
}

/// Settings of the [`FlowAggregator`](crate::aggregator::FlowAggregator).
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(::serde::Serialize, ::serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct AggregatorConfig {
    /// Where the window is centered.
    pub center: WindowCenter,
    /// Half-size of the reliable near-field region, in pixels.
    pub account_radius: usize,
    /// Half-size of the whole region taken into account, in pixels.
    pub calc_radius: usize,
    /// Shape of both regions.
    pub shape: WindowShape,
    /// Weight of pixels within `account_radius`.
    pub inner_weight: f32,
    /// Weight of pixels between `account_radius` and `calc_radius`.
    pub outer_weight: f32,
    /// Aggregated motion below this magnitude (in pixels) counts as no motion.
    pub significance_threshold: f32,
    /// Multiplier applied to the previous vector when there is no motion.
    pub no_flow_balance: f32,
}

impl Default for AggregatorConfig {
    fn default() -> Self {
        Self {
            center: WindowCenter::FrameCenter,
            account_radius: 32,
            calc_radius: 64,
            shape: WindowShape::Square,
            inner_weight: 1.0,
            outer_weight: 0.35,
            significance_threshold: 0.05,
            no_flow_balance: 0.5,
        }
    }
}

impl AggregatorConfig {
    pub fn center(self, center: WindowCenter) -> Self {
        Self { center, ..self }
    }

    pub fn account_radius(self, account_radius: usize) -> Self {
        Self {
            account_radius,
            ..self
        }
    }

    pub fn calc_radius(self, calc_radius: usize) -> Self {
        Self {
            calc_radius,
            ..self
        }
    }

    pub fn shape(self, shape: WindowShape) -> Self {
        Self { shape, ..self }
    }

    pub fn weights(self, inner_weight: f32, outer_weight: f32) -> Self {
        Self {
            inner_weight,
            outer_weight,
            ..self
        }
    }

    pub fn significance_threshold(self, significance_threshold: f32) -> Self {
        Self {
            significance_threshold,
            ..self
        }
    }

    pub fn no_flow_balance(self, no_flow_balance: f32) -> Self {
        Self {
            no_flow_balance,
            ..self
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.account_radius > self.calc_radius {
            return Err(Error::invalid_config(format!(
                "account_radius ({}) must not exceed calc_radius ({})",
                self.account_radius, self.calc_radius
            )));
        }

        let weights = [self.inner_weight, self.outer_weight];

        if weights.iter().any(|w| !w.is_finite() || *w < 0.0) || self.inner_weight == 0.0 {
            return Err(Error::invalid_config(
                "inner_weight must be positive and outer_weight non-negative",
            ));
        }

        if !self.significance_threshold.is_finite() || self.significance_threshold < 0.0 {
            return Err(Error::invalid_config("significance_threshold must be non-negative"));
        }

        if !(0.0..=1.0).contains(&self.no_flow_balance) {
            return Err(Error::invalid_config("no_flow_balance must be within [0; 1]"));
        }

        Ok(())
    }
}

/// Settings of the [`VelocityEstimator`](crate::velocity::VelocityEstimator).
#[derive(Clone, Copy, Debug, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(::serde::Serialize, ::serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct PipelineConfig {
    /// Flow aggregation settings.
    pub aggregator: AggregatorConfig,
    /// Velocity sanity limits.
    pub limits: Limits,
}

/// Input and output sanity limits.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(::serde::Serialize, ::serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct Limits {
    /// Ticks with `dt` at or below this value (in seconds) are rejected.
    pub min_dt: f32,
    /// Estimates faster than this (in m/s) are discarded.
    pub max_speed: f32,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            min_dt: 1e-4,
            max_speed: 30.0,
        }
    }
}

impl PipelineConfig {
    pub fn aggregator(self, aggregator: AggregatorConfig) -> Self {
        Self { aggregator, ..self }
    }

    pub fn min_dt(self, min_dt: f32) -> Self {
        Self {
            limits: Limits {
                min_dt,
                ..self.limits
            },
            ..self
        }
    }

    pub fn max_speed(self, max_speed: f32) -> Self {
        Self {
            limits: Limits {
                max_speed,
                ..self.limits
            },
            ..self
        }
    }

    pub fn validate(&self) -> Result<()> {
        self.aggregator.validate()?;

        if !self.limits.min_dt.is_finite() || self.limits.min_dt < 0.0 {
            return Err(Error::invalid_config("min_dt must be non-negative"));
        }

        if !(self.limits.max_speed > 0.0) {
            return Err(Error::invalid_config("max_speed must be positive"));
        }

        Ok(())
    }
}
