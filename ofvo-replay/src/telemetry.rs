//! Per-frame vehicle telemetry.

use anyhow::Result;
use ofvo::prelude::v1::GyroSample;
use serde::{Deserialize, Serialize};

/// Single telemetry record, belonging to the frame with the same index.
///
/// Gyro columns are left empty when no measurement was available for the frame.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
pub struct Telemetry {
    /// Seconds elapsed since the previous frame.
    pub dt: f32,
    /// Height above ground in meters.
    pub altitude: f32,
    pub yaw_rate: Option<f32>,
    pub pitch_rate: Option<f32>,
    pub roll_rate: Option<f32>,
}

impl Telemetry {
    pub fn from_csv(reader: impl std::io::Read) -> Result<Vec<Telemetry>> {
        csv::Reader::from_reader(reader)
            .deserialize()
            .map(|v| v.map_err(<_>::into))
            .collect::<Result<Vec<Telemetry>>>()
    }

    /// Gyro sample of the record, `None` if any rate is missing or malformed.
    pub fn gyro(&self) -> Option<GyroSample> {
        match (self.yaw_rate, self.pitch_rate, self.roll_rate) {
            (Some(yaw), Some(pitch), Some(roll)) => GyroSample::from_slice(&[yaw, pitch, roll]),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CSV: &str = "\
dt,altitude,yaw_rate,pitch_rate,roll_rate
0.05,10,0.1,-0.2,0.0
0.05,10.5,,,
0.04,11,0.3,,0.1
";

    #[test]
    fn parses_rows() {
        let rows = Telemetry::from_csv(CSV.as_bytes()).unwrap();
        assert_eq!(rows.len(), 3);
        assert_eq!(
            rows[0],
            Telemetry {
                dt: 0.05,
                altitude: 10.0,
                yaw_rate: Some(0.1),
                pitch_rate: Some(-0.2),
                roll_rate: Some(0.0),
            }
        );
        assert_eq!(rows[1].altitude, 10.5);
    }

    #[test]
    fn empty_gyro_is_unavailable() {
        let rows = Telemetry::from_csv(CSV.as_bytes()).unwrap();
        assert_eq!(rows[0].gyro(), Some(GyroSample::new(0.1, -0.2, 0.0)));
        assert_eq!(rows[1].gyro(), None);
        assert_eq!(rows[2].gyro(), None);
    }

    #[test]
    fn rejects_malformed_rows() {
        assert!(Telemetry::from_csv("dt,altitude\n0.05,abc\n".as_bytes()).is_err());
    }
}
