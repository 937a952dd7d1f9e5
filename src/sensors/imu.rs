//! # Inertial Measurement Unit
//!
//! Nine-axis IMU (accelerometer, gyroscope, magnetometer).

use async_trait::async_trait;
use std::f64::consts::PI;
use tokio::time::Instant;

use super::{Sample, SensorDriver, SensorError};

/// Record columns for this sensor class
pub const IMU_COLUMNS: [&str; 9] = [
    "accel_x", "accel_y", "accel_z",
    "gyro_x", "gyro_y", "gyro_z",
    "mag_x", "mag_y", "mag_z",
];

/// Standard gravity in m/s²
const GRAVITY: f64 = 9.806_65;

/// Synthetic IMU: stationary, level, with a gentle sway
#[derive(Debug)]
pub struct SimulatedImu {
    started: Instant,
}

impl SimulatedImu {
    pub fn new() -> Self {
        Self {
            started: Instant::now(),
        }
    }
}

impl Default for SimulatedImu {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SensorDriver for SimulatedImu {
    fn name(&self) -> &str {
        "imu (simulated)"
    }

    fn columns(&self) -> Vec<String> {
        IMU_COLUMNS.iter().map(|c| c.to_string()).collect()
    }

    async fn sample(&mut self) -> Result<Sample, SensorError> {
        let t = self.started.elapsed().as_secs_f64();
        let sway = 0.05 * (2.0 * PI * t / 4.0).sin();
        let sway_rate = 0.05 * (2.0 * PI / 4.0) * (2.0 * PI * t / 4.0).cos();

        // accel m/s², gyro rad/s, mag µT
        Ok(vec![
            Some(GRAVITY * sway.sin()),
            Some(0.0),
            Some(GRAVITY * sway.cos()),
            Some(0.0),
            Some(sway_rate),
            Some(0.0),
            Some(22.0),
            Some(-4.0),
            Some(-41.0),
        ])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_simulated_sample_shape() {
        let mut imu = SimulatedImu::new();
        assert_eq!(imu.columns().len(), 9);
        assert_eq!(imu.columns()[0], "accel_x");
        assert_eq!(imu.columns()[8], "mag_z");

        let sample = imu.sample().await.unwrap();
        assert_eq!(sample.len(), IMU_COLUMNS.len());

        let (ax, az) = (sample[0].unwrap(), sample[2].unwrap());
        let magnitude = (ax * ax + az * az).sqrt();
        assert!((magnitude - GRAVITY).abs() < 1e-9);
    }
}
