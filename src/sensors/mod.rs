//! # Sensors Module
//!
//! The capability contract every sensor driver satisfies, and the drivers
//! shipped with the logger.
//!
//! This module handles:
//! - The [`SensorDriver`] trait: `sample()` plus optional readiness,
//!   validity and restart capabilities
//! - Classifying driver errors as recoverable or terminal
//! - Gas (analog voltage), TVOC/eCO2/AQI, CO2/temperature/humidity,
//!   particulate matter and inertial drivers
//!
//! Optional capabilities are declared once through [`Capabilities`] and are
//! never probed per tick.

use async_trait::async_trait;
use serde::Deserialize;
use std::fmt;
use std::time::Duration;
use thiserror::Error;

pub mod co2;
pub mod gas;
pub mod imu;
pub mod pm;
pub mod voc;

/// One value per column declared by [`SensorDriver::columns`]; `None` is absent, never zero
pub type Sample = Vec<Option<f64>>;

/// Errors reported by sensor drivers
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SensorError {
    /// The driver has no new measurement yet
    #[error("no new sample available")]
    NotReady,

    /// The driver did not answer in time
    #[error("timed out after {0:?}")]
    Timeout(Duration),

    /// Bus or transport fault (NACK, short read, missing device file)
    #[error("bus error: {0}")]
    Bus(String),

    /// Data arrived but failed framing or checksum checks
    #[error("invalid frame: {0}")]
    Frame(String),

    /// The driver's own state machine reports a persistent failure
    #[error("terminal fault: {0}")]
    Terminal(String),
}

impl SensorError {
    /// Terminal errors require the driver's restart sequence before further reads are trusted.
    pub fn is_terminal(&self) -> bool {
        matches!(self, SensorError::Terminal(_))
    }
}

impl From<std::io::Error> for SensorError {
    fn from(e: std::io::Error) -> Self {
        match e.kind() {
            std::io::ErrorKind::TimedOut => SensorError::Timeout(Duration::ZERO),
            _ => SensorError::Bus(e.to_string()),
        }
    }
}

/// Data-quality state reported by drivers with a validity state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Validity {
    Normal,
    WarmingUp,
    InitialStartup,
    Invalid,
}

impl fmt::Display for Validity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Validity::Normal => "normal",
            Validity::WarmingUp => "warming up",
            Validity::InitialStartup => "initial start-up",
            Validity::Invalid => "invalid output",
        };
        f.write_str(s)
    }
}

/// How samples from a driver in a non-normal validity state are treated
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValidityPolicy {
    /// Only samples taken in the normal state are recorded
    #[default]
    Strict,
    /// Record whatever the driver returns (older deployments did not check)
    Legacy,
}

/// Optional capabilities a driver supports
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Capabilities {
    /// `is_ready()` must return true before `sample()` is meaningful
    pub readiness: bool,
    /// `validity()` reports a data-quality state
    pub validity: bool,
    /// `stop_measurement()`/`start_measurement()` form a restart sequence
    pub restart: bool,
}

/// Capability contract for a sensor driver
///
/// Implementations own their transport. Every call is bounded by the
/// acquisition loop's per-sensor timeout.
#[async_trait]
pub trait SensorDriver: Send {
    /// Human-readable name used in logs
    fn name(&self) -> &str;

    /// Column names, in record order, for the values returned by `sample()`
    fn columns(&self) -> Vec<String>;

    /// Optional capabilities; read once when the driver is registered
    fn capabilities(&self) -> Capabilities {
        Capabilities::default()
    }

    /// Take one measurement
    async fn sample(&mut self) -> Result<Sample, SensorError>;

    /// Whether a new measurement is available
    async fn is_ready(&mut self) -> Result<bool, SensorError> {
        Ok(true)
    }

    /// Current data-quality state
    async fn validity(&mut self) -> Result<Validity, SensorError> {
        Ok(Validity::Normal)
    }

    /// First half of the restart sequence
    async fn stop_measurement(&mut self) -> Result<(), SensorError> {
        Ok(())
    }

    /// Second half of the restart sequence, issued after the settle delay
    async fn start_measurement(&mut self) -> Result<(), SensorError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_terminal_errors_are_terminal() {
        assert!(SensorError::Terminal("measurement stopped".to_string()).is_terminal());
        assert!(!SensorError::NotReady.is_terminal());
        assert!(!SensorError::Timeout(Duration::from_secs(1)).is_terminal());
        assert!(!SensorError::Bus("nack".to_string()).is_terminal());
        assert!(!SensorError::Frame("checksum".to_string()).is_terminal());
    }

    #[test]
    fn test_io_error_conversion() {
        let err: SensorError = std::io::Error::new(std::io::ErrorKind::NotFound, "no device").into();
        assert!(matches!(err, SensorError::Bus(msg) if msg.contains("no device")));

        let err: SensorError = std::io::Error::new(std::io::ErrorKind::TimedOut, "slow").into();
        assert!(matches!(err, SensorError::Timeout(_)));
    }

    #[test]
    fn test_validity_display() {
        assert_eq!(Validity::WarmingUp.to_string(), "warming up");
        assert_eq!(Validity::Normal.to_string(), "normal");
    }

    #[test]
    fn test_default_policy_is_strict() {
        assert_eq!(ValidityPolicy::default(), ValidityPolicy::Strict);
    }

    struct Plain;

    #[async_trait]
    impl SensorDriver for Plain {
        fn name(&self) -> &str {
            "plain"
        }

        fn columns(&self) -> Vec<String> {
            vec!["value".to_string()]
        }

        async fn sample(&mut self) -> Result<Sample, SensorError> {
            Ok(vec![Some(1.0)])
        }
    }

    #[tokio::test]
    async fn test_default_capabilities() {
        let mut driver = Plain;
        assert_eq!(driver.capabilities(), Capabilities::default());
        assert_eq!(driver.is_ready().await, Ok(true));
        assert_eq!(driver.validity().await, Ok(Validity::Normal));
        assert_eq!(driver.stop_measurement().await, Ok(()));
        assert_eq!(driver.start_measurement().await, Ok(()));
    }
}
