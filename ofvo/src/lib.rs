//! # Optical Flow Visual Odometry
//!
//! This library estimates horizontal ground velocity of a vehicle from a downward facing camera.
//! Consecutive grayscale frames are compared by a dense motion field estimator, the field is
//! reduced to a single pixel displacement, rotation measured by a gyroscope is removed from it,
//! and the remainder is projected onto the ground using the altitude and the camera geometry.
//!
//! The easiest way to use the library is to import its prelude:
//!
//! ```
//! use ofvo::prelude::v1::*;
//! ```
//!
//! Motion field estimators are provided by separate crates implementing
//! [`MotionFieldEstimator`](estimator::MotionFieldEstimator).

pub mod aggregator;
pub mod cache;
pub mod camera;
pub mod config;
pub mod error;
pub mod estimator;
pub mod frame;
pub mod motion_field;
pub mod projector;
pub mod rotation;
pub mod velocity;

pub mod prelude {
    pub mod v1 {
        pub use crate::{
            aggregator::{Aggregate, FlowAggregator, Window},
            cache::FrameCache,
            camera::CameraGeometry,
            config::{AggregatorConfig, Limits, PipelineConfig, WindowCenter, WindowShape},
            error::{Error, Result},
            estimator::MotionFieldEstimator,
            frame::Frame,
            motion_field::MotionField,
            projector::MetricProjector,
            rotation::{GyroSample, RotationCompensator},
            velocity::{
                EstimateStatus, EstimatorState, InvalidInput, VelocityEstimate, VelocityEstimator,
            },
        };
    }
}
