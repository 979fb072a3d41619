//! Replay configuration file.

use anyhow::{Context, Result};
use farneback_estimator::FarnebackParams;
use ofvo::prelude::v1::{CameraGeometry, PipelineConfig};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Settings of every pipeline stage, loaded from JSON.
///
/// All sections are optional.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, Default, PartialEq)]
#[serde(default)]
pub struct ReplayConfig {
    pub camera: CameraGeometry,
    pub pipeline: PipelineConfig,
    pub estimator: FarnebackParams,
}

impl ReplayConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = std::fs::File::open(path)
            .with_context(|| format!("unable to open {}", path.display()))?;
        let config = serde_json::from_reader(std::io::BufReader::new(file))
            .with_context(|| format!("unable to parse {}", path.display()))?;
        Ok(config)
    }

    /// Override the field-of-view of the camera section, in degrees.
    pub fn fov_degrees(self, hfov: Option<f32>, vfov: Option<f32>) -> Self {
        let (h, v) = self.camera.fov_degrees();

        let camera = CameraGeometry {
            resolution: self.camera.resolution,
            ..CameraGeometry::from_degrees(hfov.unwrap_or(h), vfov.unwrap_or(v))
        };

        Self { camera, ..self }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;
    use ofvo::prelude::v1::AggregatorConfig;

    #[test]
    fn sections_are_optional() {
        let config: ReplayConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config, ReplayConfig::default());

        let config: ReplayConfig =
            serde_json::from_str(r#"{ "estimator": { "window_size": 21 } }"#).unwrap();
        assert_eq!(config.estimator.window_size, 21);
        assert_eq!(config.estimator.levels, FarnebackParams::default().levels);
        assert_eq!(config.pipeline, PipelineConfig::default());
    }

    #[test]
    fn loads_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");

        let config = ReplayConfig {
            pipeline: PipelineConfig::default()
                .max_speed(12.0)
                .aggregator(AggregatorConfig::default().account_radius(10)),
            ..Default::default()
        };

        std::fs::write(&path, serde_json::to_string_pretty(&config).unwrap()).unwrap();

        assert_eq!(ReplayConfig::load(&path).unwrap(), config);
        assert!(ReplayConfig::load(dir.path().join("missing.json")).is_err());
    }

    #[test]
    fn fov_override() {
        let config = ReplayConfig::default().fov_degrees(Some(90.0), None);
        let (h, v) = config.camera.fov_degrees();
        assert_approx_eq!(h, 90.0, 1e-4);
        assert_approx_eq!(v, 60.0, 1e-4);
    }
}
