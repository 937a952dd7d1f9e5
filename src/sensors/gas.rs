//! # Gas Sensor Array
//!
//! MQ-series gas sensors read as analog voltages through an ADS1115 ADC.
//!
//! ## Sensing resistance
//!
//! Each MQ sensor sits in a voltage divider with a load resistor. The
//! sensing resistance is derived from the measured output voltage:
//!
//! `R_s = (V_circuit - V_out) / V_out * R_load`
//!
//! A zero output voltage has no defined resistance and is reported as absent.
//!
//! ## Backends
//!
//! - [`IioGasArray`]: the kernel `ti-ads1015` driver, read through sysfs
//!   (`in_voltageN_raw` × `in_voltageN_scale`, scale in millivolts)
//! - [`SimulatedGasArray`]: slowly drifting synthetic voltages

use async_trait::async_trait;
use std::f64::consts::PI;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::time::Instant;
use tracing::{debug, warn};

use super::{Sample, SensorDriver, SensorError};
use crate::config::GasChannelConfig;

/// Default supply voltage across the divider
pub const DEFAULT_CIRCUIT_VOLTAGE: f64 = 5.0;

/// Default load resistor in ohms
pub const DEFAULT_LOAD_RESISTANCE: f64 = 10_000.0;

/// Sensing resistance from a divider output voltage
///
/// Returns `None` when `v_out` is zero.
///
/// # Examples
///
/// ```
/// use sensor_logger::sensors::gas::resistance;
///
/// assert_eq!(resistance(0.0, 5.0, 10_000.0), None);
/// assert_eq!(resistance(1.0, 5.0, 10_000.0), Some(40_000.0));
/// assert_eq!(resistance(2.5, 5.0, 10_000.0), Some(10_000.0));
/// ```
#[must_use]
pub fn resistance(v_out: f64, v_circuit: f64, r_load: f64) -> Option<f64> {
    if v_out == 0.0 {
        return None;
    }
    Some((v_circuit - v_out) / v_out * r_load)
}

/// Voltage divider parameters for deriving sensing resistance
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VoltageDivider {
    pub circuit_voltage: f64,
    pub load_resistance: f64,
}

impl Default for VoltageDivider {
    fn default() -> Self {
        Self {
            circuit_voltage: DEFAULT_CIRCUIT_VOLTAGE,
            load_resistance: DEFAULT_LOAD_RESISTANCE,
        }
    }
}

impl VoltageDivider {
    #[must_use]
    pub fn new(circuit_voltage: f64, load_resistance: f64) -> Self {
        Self {
            circuit_voltage,
            load_resistance,
        }
    }

    /// Resistance for one channel; absent voltage gives absent resistance.
    #[must_use]
    pub fn resistance(&self, v_out: Option<f64>) -> Option<f64> {
        v_out.and_then(|v| resistance(v, self.circuit_voltage, self.load_resistance))
    }
}

/// Name of the derived resistance column for a voltage column
pub fn resistance_column(voltage_column: &str) -> String {
    match voltage_column.strip_suffix("_voltage") {
        Some(stem) => format!("{}_resistance", stem),
        None => format!("{}_resistance", voltage_column),
    }
}

fn voltage_columns(channels: &[GasChannelConfig]) -> Vec<String> {
    channels.iter().map(|c| format!("{}_voltage", c.name)).collect()
}

/// Gas array read through the Linux industrial-I/O sysfs interface
#[derive(Debug)]
pub struct IioGasArray {
    device: PathBuf,
    channels: Vec<GasChannelConfig>,
}

impl IioGasArray {
    /// Open the gas array on an IIO device directory
    ///
    /// # Errors
    ///
    /// Returns `SensorError::Bus` if the device directory does not exist.
    pub fn open(device: &Path, channels: Vec<GasChannelConfig>) -> Result<Self, SensorError> {
        if !device.is_dir() {
            return Err(SensorError::Bus(format!(
                "IIO device {} not found",
                device.display()
            )));
        }

        debug!("Using IIO gas array at {}", device.display());
        Ok(Self {
            device: device.to_path_buf(),
            channels,
        })
    }

    async fn read_attribute(&self, name: &str) -> Result<f64, SensorError> {
        let path = self.device.join(name);
        let text = fs::read_to_string(&path)
            .await
            .map_err(|e| SensorError::Bus(format!("{}: {}", path.display(), e)))?;
        text.trim()
            .parse::<f64>()
            .map_err(|e| SensorError::Bus(format!("{}: {}", path.display(), e)))
    }

    /// Voltage on one ADC input, in volts
    async fn read_voltage(&self, input: u8) -> Result<f64, SensorError> {
        let raw = self.read_attribute(&format!("in_voltage{}_raw", input)).await?;
        let scale_mv = self.read_attribute(&format!("in_voltage{}_scale", input)).await?;
        Ok(raw * scale_mv / 1000.0)
    }
}

#[async_trait]
impl SensorDriver for IioGasArray {
    fn name(&self) -> &str {
        "gas"
    }

    fn columns(&self) -> Vec<String> {
        voltage_columns(&self.channels)
    }

    async fn sample(&mut self) -> Result<Sample, SensorError> {
        let mut values = Vec::with_capacity(self.channels.len());
        let mut last_error = None;

        for channel in &self.channels {
            match self.read_voltage(channel.input).await {
                Ok(v) => values.push(Some(v)),
                Err(e) => {
                    warn!("Gas channel {} unreadable: {}", channel.name, e);
                    values.push(None);
                    last_error = Some(e);
                }
            }
        }

        // A single dead channel is recorded as absent; losing all of them is a sensor fault
        match last_error {
            Some(e) if values.iter().all(Option::is_none) => Err(e),
            _ => Ok(values),
        }
    }
}

/// Synthetic gas array for bench runs
#[derive(Debug)]
pub struct SimulatedGasArray {
    channels: Vec<GasChannelConfig>,
    started: Instant,
}

impl SimulatedGasArray {
    pub fn new(channels: Vec<GasChannelConfig>) -> Self {
        Self {
            channels,
            started: Instant::now(),
        }
    }
}

#[async_trait]
impl SensorDriver for SimulatedGasArray {
    fn name(&self) -> &str {
        "gas (simulated)"
    }

    fn columns(&self) -> Vec<String> {
        voltage_columns(&self.channels)
    }

    async fn sample(&mut self) -> Result<Sample, SensorError> {
        let t = self.started.elapsed().as_secs_f64();
        Ok(self
            .channels
            .iter()
            .map(|c| {
                let base = 0.4 + 0.2 * f64::from(c.input);
                Some(base + 0.05 * (2.0 * PI * t / 120.0).sin())
            })
            .collect())
    }
}
