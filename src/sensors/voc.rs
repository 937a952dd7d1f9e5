//! # TVOC / eCO2 / AQI Sensor
//!
//! Metal-oxide multi-gas sensor (ENS160 class) reporting total volatile
//! organic compounds (ppb), equivalent CO2 (ppm) and an air-quality index
//! (1-5). The chip exposes a validity state: readings are only trustworthy
//! in the normal state, after its warm-up and initial start-up phases.

use async_trait::async_trait;
use std::f64::consts::PI;
use std::time::Duration;
use tokio::time::Instant;

use super::{Capabilities, Sample, SensorDriver, SensorError, Validity};

/// Record columns for this sensor class
pub const VOC_COLUMNS: [&str; 3] = ["tvoc", "eco2", "aqi"];

/// Warm-up time after power-on before the output is valid
pub const VOC_WARMUP: Duration = Duration::from_secs(180);

/// Map the chip's two-bit validity flag onto [`Validity`]
pub fn validity_from_flag(flag: u8) -> Validity {
    match flag & 0x03 {
        0 => Validity::Normal,
        1 => Validity::WarmingUp,
        2 => Validity::InitialStartup,
        _ => Validity::Invalid,
    }
}

/// Air-quality index (1 = excellent .. 5 = unhealthy) for a TVOC level in ppb
pub fn aqi_from_tvoc(tvoc_ppb: f64) -> f64 {
    match tvoc_ppb {
        t if t < 220.0 => 1.0,
        t if t < 660.0 => 2.0,
        t if t < 2200.0 => 3.0,
        t if t < 5500.0 => 4.0,
        _ => 5.0,
    }
}

/// Synthetic TVOC sensor that reports warming-up for [`VOC_WARMUP`]
#[derive(Debug)]
pub struct SimulatedVoc {
    started: Instant,
    warmup: Duration,
}

impl SimulatedVoc {
    pub fn new() -> Self {
        Self::with_warmup(VOC_WARMUP)
    }

    pub fn with_warmup(warmup: Duration) -> Self {
        Self {
            started: Instant::now(),
            warmup,
        }
    }
}

impl Default for SimulatedVoc {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SensorDriver for SimulatedVoc {
    fn name(&self) -> &str {
        "voc (simulated)"
    }

    fn columns(&self) -> Vec<String> {
        VOC_COLUMNS.iter().map(|c| c.to_string()).collect()
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities {
            validity: true,
            ..Capabilities::default()
        }
    }

    async fn validity(&mut self) -> Result<Validity, SensorError> {
        let flag = if self.started.elapsed() < self.warmup { 1 } else { 0 };
        Ok(validity_from_flag(flag))
    }

    async fn sample(&mut self) -> Result<Sample, SensorError> {
        let t = self.started.elapsed().as_secs_f64();
        let tvoc = (150.0 + 100.0 * (2.0 * PI * t / 600.0).sin()).round();
        let eco2 = (450.0 + tvoc * 0.8).round();
        Ok(vec![Some(tvoc), Some(eco2), Some(aqi_from_tvoc(tvoc))])
    }
}
