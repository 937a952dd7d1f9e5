//! Per-sensor state inside the acquisition loop
//!
//! A [`SensorSlot`] wraps one driver and turns every outcome into a fixed
//! number of fields: readiness and validity gating, timeouts, derived
//! resistance columns and the stop/settle/start restart sequence all live
//! here, so one sensor's trouble never leaks into another's columns.

use std::future::Future;
use std::time::Duration;
use tokio::time::{timeout, Instant};
use tracing::{debug, info, warn};

use crate::record::Field;
use crate::sensors::gas::{resistance_column, VoltageDivider};
use crate::sensors::{Capabilities, Sample, SensorDriver, SensorError, Validity, ValidityPolicy};

/// Default bound on a single driver call
pub const DEFAULT_SENSOR_TIMEOUT: Duration = Duration::from_secs(3);

/// Default wait between stopping and restarting a sensor
pub const DEFAULT_SETTLE: Duration = Duration::from_secs(2);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Recovery {
    Active,
    /// Measurement stopped after a terminal fault; restart once `until` passes
    Settling { until: Instant },
}

/// One registered sensor and its recovery state
pub struct SensorSlot {
    driver: Box<dyn SensorDriver>,
    name: String,
    columns: Vec<String>,
    capabilities: Capabilities,
    validity_policy: ValidityPolicy,
    divider: Option<VoltageDivider>,
    recovery: Recovery,
    last_validity: Option<Validity>,
    io_timeout: Duration,
    settle: Duration,
}

impl SensorSlot {
    /// Register a driver; its name, columns and capabilities are read once here
    pub fn new(driver: Box<dyn SensorDriver>) -> Self {
        let name = driver.name().to_string();
        let columns = driver.columns();
        let capabilities = driver.capabilities();
        Self {
            driver,
            name,
            columns,
            capabilities,
            validity_policy: ValidityPolicy::default(),
            divider: None,
            recovery: Recovery::Active,
            last_validity: None,
            io_timeout: DEFAULT_SENSOR_TIMEOUT,
            settle: DEFAULT_SETTLE,
        }
    }

    pub fn with_validity_policy(mut self, policy: ValidityPolicy) -> Self {
        self.validity_policy = policy;
        self
    }

    /// Derive a resistance column for every voltage column
    pub fn with_resistance(mut self, divider: VoltageDivider) -> Self {
        self.divider = Some(divider);
        self
    }

    pub fn with_timeout(mut self, io_timeout: Duration) -> Self {
        self.io_timeout = io_timeout;
        self
    }

    pub fn with_settle(mut self, settle: Duration) -> Self {
        self.settle = settle;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Driver columns followed by derived columns
    pub fn column_names(&self) -> Vec<String> {
        let mut names = self.columns.clone();
        if self.divider.is_some() {
            names.extend(self.columns.iter().map(|c| resistance_column(c)));
        }
        names
    }

    /// Number of fields produced by every `read()`
    pub fn width(&self) -> usize {
        if self.divider.is_some() {
            self.columns.len() * 2
        } else {
            self.columns.len()
        }
    }

    pub fn is_settling(&self) -> bool {
        matches!(self.recovery, Recovery::Settling { .. })
    }

    /// Read this tick's fields
    ///
    /// Always returns exactly `width()` fields. Anything short of a valid
    /// sample yields absent values; a terminal fault also starts the
    /// restart sequence when the driver has one.
    pub async fn read(&mut self) -> Vec<Field> {
        let sample = match self.acquire().await {
            Ok(Some(sample)) => Some(sample),
            Ok(None) => None,
            Err(SensorError::NotReady) => {
                debug!("{}: no new measurement", self.name);
                None
            }
            Err(e) if e.is_terminal() => {
                self.recover(e).await;
                None
            }
            Err(e) => {
                warn!("{}: {}", self.name, e);
                None
            }
        };

        let values = sample.unwrap_or_else(|| vec![None; self.columns.len()]);
        self.derive(values)
    }

    async fn acquire(&mut self) -> Result<Option<Sample>, SensorError> {
        let limit = self.io_timeout;

        if let Recovery::Settling { until } = self.recovery {
            if Instant::now() < until {
                debug!("{}: settling after restart", self.name);
                return Ok(None);
            }
            bounded(limit, self.driver.start_measurement()).await?;
            self.recovery = Recovery::Active;
            info!("{}: measurement restarted", self.name);
        }

        if self.capabilities.readiness && !bounded(limit, self.driver.is_ready()).await? {
            return Err(SensorError::NotReady);
        }

        if self.capabilities.validity {
            let validity = bounded(limit, self.driver.validity()).await?;
            if self.last_validity != Some(validity) {
                info!("{}: data validity {}", self.name, validity);
                self.last_validity = Some(validity);
            }
            if validity != Validity::Normal && self.validity_policy == ValidityPolicy::Strict {
                debug!("{}: discarding sample ({})", self.name, validity);
                return Ok(None);
            }
        }

        let sample = bounded(limit, self.driver.sample()).await?;
        if sample.len() != self.columns.len() {
            warn!(
                "{}: returned {} values for {} columns",
                self.name,
                sample.len(),
                self.columns.len()
            );
            return Ok(None);
        }
        Ok(Some(sample))
    }

    async fn recover(&mut self, fault: SensorError) {
        if !self.capabilities.restart {
            warn!("{}: {} (no restart sequence)", self.name, fault);
            return;
        }

        warn!("{}: {}; restarting after {:?}", self.name, fault, self.settle);
        if let Err(e) = bounded(self.io_timeout, self.driver.stop_measurement()).await {
            warn!("{}: stop measurement failed: {}", self.name, e);
        }
        self.recovery = Recovery::Settling {
            until: Instant::now() + self.settle,
        };
    }

    fn derive(&self, values: Sample) -> Vec<Field> {
        let mut fields: Vec<Field> = values.iter().map(|v| Field::from(*v)).collect();
        if let Some(divider) = self.divider {
            fields.extend(values.iter().map(|v| Field::from(divider.resistance(*v))));
        }
        fields
    }
}

async fn bounded<T, F>(limit: Duration, call: F) -> Result<T, SensorError>
where
    F: Future<Output = Result<T, SensorError>>,
{
    match timeout(limit, call).await {
        Ok(result) => result,
        Err(_) => Err(SensorError::Timeout(limit)),
    }
}
