//! # Warm-up
//!
//! Metal-oxide gas sensors need their heaters running for a few minutes
//! before readings settle. The warm-up phase holds the pipeline for a fixed
//! time, reports the remaining time and blinks the status light.

use std::time::Duration;
use tokio::sync::watch;
use tokio::time::{interval, interval_at, sleep_until, Instant};
use tracing::info;

use crate::config::{StatusLedConfig, WarmupConfig};
use crate::status::StatusLight;

/// How the warm-up phase ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WarmupOutcome {
    Completed,
    Interrupted,
}

/// Time-driven warm-up with progress reporting
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WarmupController {
    pub duration: Duration,
    pub progress_interval: Duration,
    pub blink_interval: Duration,
    /// Whether the stop signal ends the warm-up early
    pub interruptible: bool,
}

impl WarmupController {
    pub fn new(duration: Duration) -> Self {
        Self {
            duration,
            progress_interval: Duration::from_secs(1),
            blink_interval: Duration::from_secs(1),
            interruptible: true,
        }
    }

    pub fn from_config(warmup: &WarmupConfig, led: &StatusLedConfig) -> Self {
        Self {
            duration: Duration::from_secs(warmup.duration_s),
            progress_interval: Duration::from_millis(warmup.progress_interval_ms),
            blink_interval: Duration::from_millis(led.blink_interval_ms),
            interruptible: warmup.interruptible,
        }
    }

    /// Wait out the warm-up
    ///
    /// Blinks `light` at the blink interval and logs the remaining time at
    /// the progress interval. Returns early with `Interrupted` when `stop`
    /// turns true, unless the controller is not interruptible.
    pub async fn run(
        &self,
        light: &mut StatusLight,
        stop: &mut watch::Receiver<bool>,
    ) -> WarmupOutcome {
        if self.duration.is_zero() {
            return WarmupOutcome::Completed;
        }
        if self.interruptible && *stop.borrow() {
            return WarmupOutcome::Interrupted;
        }

        let start = Instant::now();
        let deadline = start + self.duration;
        info!("Warming up sensors for {}", format_remaining(self.duration));

        let mut progress = interval_at(start + self.progress_interval, self.progress_interval);
        let mut blink = interval(self.blink_interval);
        let mut stop_open = true;

        loop {
            tokio::select! {
                biased;

                changed = stop.changed(), if self.interruptible && stop_open => match changed {
                    Ok(()) if *stop.borrow() => {
                        info!("Warm-up interrupted");
                        return WarmupOutcome::Interrupted;
                    }
                    Ok(()) => {}
                    Err(_) => stop_open = false,
                },
                _ = sleep_until(deadline) => break,
                _ = progress.tick() => {
                    let remaining = deadline.saturating_duration_since(Instant::now());
                    info!("Warm-up time remaining: {}", format_remaining(remaining));
                }
                _ = blink.tick() => light.toggle(),
            }
        }

        info!("Warm-up complete");
        WarmupOutcome::Completed
    }
}

/// `{m}m {s}s`, rounding partial seconds up
pub fn format_remaining(remaining: Duration) -> String {
    let total = (remaining.as_millis() + 999) / 1000;
    format!("{}m {}s", total / 60, total % 60)
}
