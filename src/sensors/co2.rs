//! # CO2 / Temperature / Humidity Sensor
//!
//! Photoacoustic CO2 sensor (SCD4x class) running in periodic measurement
//! mode. A new measurement is produced every [`MEASUREMENT_INTERVAL`]; the
//! data-ready flag must be checked before reading. After a bus fault the
//! chip has to be taken out of periodic mode and restarted, with a settle
//! delay in between.

use async_trait::async_trait;
use std::f64::consts::PI;
use std::time::Duration;
use tokio::time::Instant;
use tracing::debug;

use super::{Capabilities, Sample, SensorDriver, SensorError};

/// Record columns for this sensor class
pub const CO2_COLUMNS: [&str; 3] = ["co2", "temperature", "humidity"];

/// Periodic measurement interval of the chip
pub const MEASUREMENT_INTERVAL: Duration = Duration::from_secs(5);

/// Synthetic CO2 sensor honouring the periodic-measurement contract
#[derive(Debug)]
pub struct SimulatedCo2 {
    epoch: Instant,
    /// When periodic measurement was (re)started; `None` while stopped
    measuring_since: Option<Instant>,
    /// Measurements already read out
    consumed: u64,
}

impl SimulatedCo2 {
    /// Create the sensor with periodic measurement already started
    pub fn new() -> Self {
        let now = Instant::now();
        Self {
            epoch: now,
            measuring_since: Some(now),
            consumed: 0,
        }
    }

    fn produced(&self) -> u64 {
        match self.measuring_since {
            Some(since) => {
                (since.elapsed().as_millis() / MEASUREMENT_INTERVAL.as_millis()) as u64
            }
            None => 0,
        }
    }
}

impl Default for SimulatedCo2 {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SensorDriver for SimulatedCo2 {
    fn name(&self) -> &str {
        "co2 (simulated)"
    }

    fn columns(&self) -> Vec<String> {
        CO2_COLUMNS.iter().map(|c| c.to_string()).collect()
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities {
            readiness: true,
            restart: true,
            ..Capabilities::default()
        }
    }

    async fn is_ready(&mut self) -> Result<bool, SensorError> {
        if self.measuring_since.is_none() {
            return Err(SensorError::Terminal("periodic measurement not running".to_string()));
        }
        Ok(self.produced() > self.consumed)
    }

    async fn sample(&mut self) -> Result<Sample, SensorError> {
        if self.measuring_since.is_none() {
            return Err(SensorError::Terminal("periodic measurement not running".to_string()));
        }
        self.consumed = self.produced();

        let t = self.epoch.elapsed().as_secs_f64();
        let co2 = (650.0 + 150.0 * (2.0 * PI * t / 900.0).sin()).round();
        let temperature = 22.5 + 1.5 * (2.0 * PI * t / 1800.0).sin();
        let humidity = 45.0 - 5.0 * (2.0 * PI * t / 1800.0).sin();
        Ok(vec![Some(co2), Some(temperature), Some(humidity)])
    }

    async fn stop_measurement(&mut self) -> Result<(), SensorError> {
        debug!("Stopping periodic CO2 measurement");
        self.measuring_since = None;
        self.consumed = 0;
        Ok(())
    }

    async fn start_measurement(&mut self) -> Result<(), SensorError> {
        debug!("Starting periodic CO2 measurement");
        self.measuring_since = Some(Instant::now());
        self.consumed = 0;
        Ok(())
    }
}
