//! # Acquisition Module
//!
//! The sampling loop at the centre of the logger.
//!
//! This module handles:
//! - Running the warm-up phase, then ticking at a fixed period
//! - Snapshotting the position fix and reading every sensor slot each tick
//! - Assembling one fixed-width record per tick and handing it to the sink
//! - Stopping cleanly on the stop signal, or on the first sink failure
//!
//! Timing is a fixed delay after each tick, so the period drifts by however
//! long the tick itself took.

use chrono::Local;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::{sleep, Instant};
use tracing::{debug, error, info, warn};

use crate::config::{AcquisitionConfig, GpsConfig};
use crate::error::{LoggerError, Result};
use crate::position::{FixHandle, PositionFix, DEFAULT_STALE_AFTER};
use crate::record::{Field, RecordBuilder, RecordSink, Schema, GPS_TIME_FORMAT, TIMESTAMP_FORMAT};
use crate::status::StatusLight;
use crate::warmup::{WarmupController, WarmupOutcome};

pub mod slot;

pub use slot::SensorSlot;

/// Lifecycle of the acquisition loop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    Idle,
    WarmingUp,
    Sampling,
    Stopping,
    Stopped,
}

/// Loop timing and layout
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoopSettings {
    /// Delay after each tick
    pub period: Duration,
    /// Include the receiver's UTC time as a column
    pub record_gps_time: bool,
    /// Include the row timestamp as UTC epoch milliseconds
    pub record_utc_ms: bool,
    /// Age after which the fix is reported stale
    pub stale_after: Duration,
}

impl Default for LoopSettings {
    fn default() -> Self {
        Self {
            period: Duration::from_secs(3),
            record_gps_time: true,
            record_utc_ms: false,
            stale_after: DEFAULT_STALE_AFTER,
        }
    }
}

impl LoopSettings {
    pub fn from_config(acquisition: &AcquisitionConfig, gps: &GpsConfig) -> Self {
        Self {
            period: acquisition.period(),
            record_gps_time: acquisition.record_gps_time,
            record_utc_ms: acquisition.record_utc_ms,
            stale_after: gps.stale_after(),
        }
    }
}

/// What a completed run did
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    pub ticks: u64,
    pub rows_written: u64,
    pub path: PathBuf,
    pub interrupted_during_warmup: bool,
}

/// Column layout for a run: timestamp, optional UTC epoch time, optional
/// receiver time, position, then every slot
pub fn schema_for(settings: &LoopSettings, slots: &[SensorSlot]) -> Schema {
    let mut columns = vec!["timestamp".to_string()];
    if settings.record_utc_ms {
        columns.push("utc_ms".to_string());
    }
    if settings.record_gps_time {
        columns.push("gps_time".to_string());
    }
    columns.push("latitude".to_string());
    columns.push("longitude".to_string());
    for slot in slots {
        columns.extend(slot.column_names());
    }
    Schema::new(columns)
}

/// Periodic sampler owning the sensor slots and the sink
pub struct AcquisitionLoop<S: RecordSink> {
    settings: LoopSettings,
    schema: Arc<Schema>,
    fix: FixHandle,
    slots: Vec<SensorSlot>,
    sink: S,
    state: LoopState,
    ticks: u64,
    stale_reported: bool,
}

impl<S: RecordSink> AcquisitionLoop<S> {
    pub fn new(settings: LoopSettings, fix: FixHandle, slots: Vec<SensorSlot>, sink: S) -> Self {
        let schema = Arc::new(schema_for(&settings, &slots));
        Self {
            settings,
            schema,
            fix,
            slots,
            sink,
            state: LoopState::Idle,
            ticks: 0,
            stale_reported: false,
        }
    }

    pub fn state(&self) -> LoopState {
        self.state
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    /// Warm up, then sample until `stop` turns true
    ///
    /// The tick in flight when the stop arrives is completed and written
    /// before the sink is closed. A dropped stop sender also ends the run.
    ///
    /// # Errors
    ///
    /// Returns `LoggerError::Sink` on the first failed append; no further
    /// rows are attempted.
    pub async fn run(
        &mut self,
        warmup: &WarmupController,
        light: &mut StatusLight,
        mut stop: watch::Receiver<bool>,
    ) -> Result<RunSummary> {
        self.state = LoopState::WarmingUp;
        info!("Acquisition loop warming up");

        if warmup.run(light, &mut stop).await == WarmupOutcome::Interrupted {
            self.state = LoopState::Stopping;
            self.finish(light);
            return Ok(self.summary(true));
        }

        self.state = LoopState::Sampling;
        light.on();
        info!(
            "Sampling {} columns every {:?}",
            self.schema.len(),
            self.settings.period
        );

        let outcome = loop {
            if *stop.borrow() {
                break Ok(());
            }

            if let Err(e) = self.tick().await {
                break Err(e);
            }

            tokio::select! {
                changed = stop.changed() => {
                    if changed.is_err() {
                        warn!("Stop signal source went away; stopping");
                        break Ok(());
                    }
                }
                _ = sleep(self.settings.period) => {}
            }
        };

        self.state = LoopState::Stopping;
        if let Err(e) = &outcome {
            error!("Acquisition stopped: {}", e);
        }
        self.finish(light);
        outcome.map(|_| self.summary(false))
    }

    /// Sample everything once and append the record
    async fn tick(&mut self) -> Result<()> {
        self.ticks += 1;
        let fix = self.fix.snapshot();
        let wall = Local::now();
        self.report_staleness(&fix, Instant::now());

        let mut builder = RecordBuilder::new(self.schema.clone());
        builder.push(wall.format(TIMESTAMP_FORMAT).to_string());
        if self.settings.record_utc_ms {
            builder.push(wall.timestamp_millis().to_string());
        }
        if self.settings.record_gps_time {
            builder.push(match fix.fix_time_utc {
                Some(t) => Field::Text(t.format(GPS_TIME_FORMAT).to_string()),
                None => Field::Absent,
            });
        }
        builder.push(fix.latitude()).push(fix.longitude());

        for slot in self.slots.iter_mut() {
            builder.extend(slot.read().await);
        }

        let record = builder.finish();
        if let Err(source) = self.sink.append(&record) {
            return Err(LoggerError::Sink {
                path: self.sink.path(),
                rows_written: self.sink.rows_written(),
                source,
            });
        }

        debug!("Tick {} recorded", self.ticks);
        Ok(())
    }

    fn report_staleness(&mut self, fix: &PositionFix, now: Instant) {
        if fix.observed_at.is_none() {
            return;
        }
        let stale = fix.is_stale(now, self.settings.stale_after);
        if stale && !self.stale_reported {
            warn!(
                "Position fix is stale ({:?} old); recording last known position",
                fix.age(now).unwrap_or_default()
            );
            self.stale_reported = true;
        } else if !stale && self.stale_reported {
            info!("Position fix is fresh again");
            self.stale_reported = false;
        }
    }

    fn finish(&mut self, light: &mut StatusLight) {
        if let Err(e) = self.sink.close() {
            error!("Failed to close {}: {}", self.sink.path().display(), e);
        }
        light.off();
        self.state = LoopState::Stopped;
        info!("Acquisition loop stopped after {} ticks", self.ticks);
    }

    fn summary(&self, interrupted_during_warmup: bool) -> RunSummary {
        RunSummary {
            ticks: self.ticks,
            rows_written: self.sink.rows_written(),
            path: self.sink.path(),
            interrupted_during_warmup,
        }
    }
}
