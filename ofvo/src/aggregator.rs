//! # Motion field aggregation
//!
//! Reduces a dense motion field to a single vector describing how the ground below the vehicle
//! moved between two frames.

use crate::config::{AggregatorConfig, WindowShape};
use crate::prelude::v1::*;
use log::*;
use nalgebra as na;

/// Region of a motion field taken into account by the aggregator.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Window {
    /// Center of the window in pixels.
    pub center: (usize, usize),
    /// Half-size of the preferred near-field region.
    pub account_radius: usize,
    /// Half-size of the whole region.
    pub calc_radius: usize,
    /// Shape of both regions.
    pub shape: WindowShape,
}

impl Window {
    pub fn new(center: (usize, usize), account_radius: usize, calc_radius: usize) -> Self {
        Self {
            center,
            account_radius,
            calc_radius,
            shape: WindowShape::Square,
        }
    }

    pub fn shape(self, shape: WindowShape) -> Self {
        Self { shape, ..self }
    }

    /// Distance of the offset from the center, in the metric of the window shape.
    ///
    /// Squared for circles, so that no square roots are needed.
    fn distance(&self, dx: usize, dy: usize) -> usize {
        match self.shape {
            WindowShape::Square => dx.max(dy),
            WindowShape::Circle => dx.saturating_mul(dx).saturating_add(dy.saturating_mul(dy)),
        }
    }

    fn radius(&self, r: usize) -> usize {
        match self.shape {
            WindowShape::Square => r,
            WindowShape::Circle => r.saturating_mul(r),
        }
    }
}

/// Result of a single aggregation.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Aggregate {
    /// Vector the pipeline should continue with.
    pub motion: na::Vector2<f32>,
    /// Weighted mean of the window, before the fallback policy.
    pub measured: na::Vector2<f32>,
    /// True if `measured` was insignificant and `motion` is the damped previous vector.
    pub fallback: bool,
    /// Number of pixels that contributed to `measured`.
    pub samples: usize,
}

/// Weighted window average of a motion field with a damped no-flow fallback.
///
/// The aggregator remembers the last vector it returned. When the field shows no significant
/// motion (textureless ground, hovering vehicle), that vector is scaled by the no-flow balance
/// multiplier instead of dropping to zero abruptly.
#[derive(Clone, Debug)]
pub struct FlowAggregator {
    config: AggregatorConfig,
    last: na::Vector2<f32>,
}

impl Default for FlowAggregator {
    fn default() -> Self {
        Self::new(AggregatorConfig::default())
    }
}

impl FlowAggregator {
    pub fn new(config: AggregatorConfig) -> Self {
        Self {
            config,
            last: na::Vector2::zeros(),
        }
    }

    pub fn config(&self) -> &AggregatorConfig {
        &self.config
    }

    /// Window described by the configuration, for a field of given size.
    pub fn window(&self, width: usize, height: usize) -> Window {
        Window {
            center: self.config.center.resolve(width, height),
            account_radius: self.config.account_radius,
            calc_radius: self.config.calc_radius,
            shape: self.config.shape,
        }
    }

    /// Vector returned by the previous aggregation.
    pub fn last(&self) -> na::Vector2<f32> {
        self.last
    }

    /// Replace the remembered vector, e.g. when the last aggregate was discarded downstream.
    pub fn set_last(&mut self, last: na::Vector2<f32>) {
        self.last = last;
    }

    /// Forget the previously returned vector.
    pub fn reset(&mut self) {
        self.last = na::Vector2::zeros();
    }

    /// Weighted mean of the motion within `window`.
    ///
    /// Returns the mean and the number of contributing pixels. Summation is sequential in
    /// row-major order, so the result only depends on the inputs.
    pub fn weighted_mean(
        &self,
        field: &MotionField,
        window: &Window,
    ) -> Result<(na::Vector2<f32>, usize)> {
        let (width, height) = field.dim();
        let (cx, cy) = window.center;
        let r = window.calc_radius;

        let x_range = cx.saturating_sub(r)..cx.saturating_add(r).saturating_add(1).min(width);
        let y_range = cy.saturating_sub(r)..cy.saturating_add(r).saturating_add(1).min(height);

        let inner = window.radius(window.account_radius);
        let outer = window.radius(window.calc_radius);

        let mut sum = na::Vector2::<f64>::zeros();
        let mut total_weight = 0f64;
        let mut samples = 0;

        for y in y_range {
            for x in x_range.clone() {
                let dist = window.distance(x.abs_diff(cx), y.abs_diff(cy));

                let weight = if dist <= inner {
                    self.config.inner_weight
                } else if dist <= outer {
                    self.config.outer_weight
                } else {
                    continue;
                };
                let weight = weight as f64;

                let motion = field.get_motion(x, y);
                sum += na::Vector2::new(motion.x as f64, motion.y as f64) * weight;
                total_weight += weight;
                samples += 1;
            }
        }

        if samples == 0 {
            return Err(Error::EmptyWindow {
                center: window.center,
                width,
                height,
            });
        }

        let mean = if total_weight > 0.0 {
            sum / total_weight
        } else {
            na::Vector2::zeros()
        };

        Ok((na::Vector2::new(mean.x as f32, mean.y as f32), samples))
    }

    /// Aggregate the field into a single motion vector.
    ///
    /// # Arguments
    ///
    /// * `field` - dense motion field.
    /// * `window` - region of the field to take into account.
    pub fn aggregate(&mut self, field: &MotionField, window: &Window) -> Result<Aggregate> {
        let (measured, samples) = self.weighted_mean(field, window)?;

        let fallback = !(measured.magnitude() >= self.config.significance_threshold);

        let motion = if fallback {
            let damped = self.last * self.config.no_flow_balance;
            trace!(
                "insignificant flow {:.4}, damping previous {:?} to {:?}",
                measured.magnitude(),
                self.last,
                damped
            );
            damped
        } else {
            measured
        };

        self.last = motion;

        Ok(Aggregate {
            motion,
            measured,
            fallback,
            samples,
        })
    }
}
