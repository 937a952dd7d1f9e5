//! # Position Module
//!
//! Background GPS tracking.
//!
//! This module handles:
//! - Reading NMEA sentences from the receiver on a dedicated task
//! - Keeping the most recent position fix and UTC time
//! - Handing the acquisition loop a consistent snapshot without blocking
//!
//! A fix is never cleared once acquired: sentences reporting no solution,
//! corrupt lines, read timeouts and end-of-stream leave the last good fix in place. Callers
//! judge freshness from [`PositionFix::observed_at`].

use chrono::{DateTime, Utc};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{timeout, Instant};
use tracing::{debug, info, warn};

use crate::serial::LineSource;

pub mod nmea;

pub use nmea::{NmeaDecoder, NmeaError, Sentence};

/// Default age after which a fix is reported stale
pub const DEFAULT_STALE_AFTER: Duration = Duration::from_secs(2);

/// Latitude and longitude in decimal degrees (south and west negative)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

/// Most recent position state
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PositionFix {
    /// Last valid coordinates; `None` until the first fix
    pub coordinates: Option<Coordinates>,
    /// Last valid UTC date and time from the receiver
    pub fix_time_utc: Option<DateTime<Utc>>,
    /// When `coordinates` were last committed
    pub observed_at: Option<Instant>,
}

impl PositionFix {
    pub fn latitude(&self) -> Option<f64> {
        self.coordinates.map(|c| c.latitude)
    }

    pub fn longitude(&self) -> Option<f64> {
        self.coordinates.map(|c| c.longitude)
    }

    /// Time since the coordinates were committed
    pub fn age(&self, now: Instant) -> Option<Duration> {
        self.observed_at.map(|t| now.saturating_duration_since(t))
    }

    /// True when a fix exists but is older than `threshold`
    pub fn is_stale(&self, now: Instant, threshold: Duration) -> bool {
        matches!(self.age(now), Some(age) if age > threshold)
    }
}

/// Shared handle to the latest fix
///
/// Writers replace fields under the lock, so readers always get a
/// snapshot in which coordinates and `observed_at` belong together.
#[derive(Debug, Clone, Default)]
pub struct FixHandle {
    inner: Arc<Mutex<PositionFix>>,
}

impl FixHandle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of the current fix
    pub fn snapshot(&self) -> PositionFix {
        *self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Store new coordinates observed at `at`
    ///
    /// `observed_at` never moves backwards.
    pub fn commit_coordinates(&self, coordinates: Coordinates, at: Instant) {
        let mut fix = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        fix.coordinates = Some(coordinates);
        fix.observed_at = Some(match fix.observed_at {
            Some(previous) => previous.max(at),
            None => at,
        });
    }

    /// Store a new UTC time from the receiver
    pub fn commit_time(&self, time: DateTime<Utc>) {
        let mut fix = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        fix.fix_time_utc = Some(time);
    }
}

/// Timing for the tracker task
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrackerSettings {
    /// Upper bound on a single line read
    pub read_timeout: Duration,
    /// Pause between reads
    pub poll_interval: Duration,
}

impl Default for TrackerSettings {
    fn default() -> Self {
        Self {
            read_timeout: Duration::from_secs(1),
            poll_interval: Duration::from_millis(50),
        }
    }
}

/// Background task that keeps a [`FixHandle`] up to date
pub struct PositionTracker {
    fix: FixHandle,
    stop_tx: watch::Sender<bool>,
    task: Option<JoinHandle<()>>,
}

impl PositionTracker {
    /// Spawn the tracker task reading from `source`
    ///
    /// Must be called from within a tokio runtime.
    pub fn start<S>(source: S, settings: TrackerSettings) -> Self
    where
        S: LineSource + 'static,
    {
        let fix = FixHandle::new();
        let (stop_tx, stop_rx) = watch::channel(false);

        let task = tokio::spawn(track(source, fix.clone(), settings, stop_rx));
        info!(
            "Position tracker started (read timeout {:?}, poll {:?})",
            settings.read_timeout, settings.poll_interval
        );

        Self {
            fix,
            stop_tx,
            task: Some(task),
        }
    }

    /// Snapshot of the latest fix
    pub fn current_fix(&self) -> PositionFix {
        self.fix.snapshot()
    }

    /// Handle for readers that outlive a borrow of the tracker
    pub fn handle(&self) -> FixHandle {
        self.fix.clone()
    }

    /// Signal the task and wait for it to exit
    ///
    /// A pending read is abandoned at the next await point, so this returns
    /// within roughly one read timeout.
    pub async fn stop(mut self) {
        let _ = self.stop_tx.send(true);
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                warn!("Position tracker task ended abnormally: {}", e);
            }
        }
        info!("Position tracker stopped");
    }
}

impl Drop for PositionTracker {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

async fn track<S: LineSource>(
    mut source: S,
    fix: FixHandle,
    settings: TrackerSettings,
    mut stop: watch::Receiver<bool>,
) {
    let mut decoder = NmeaDecoder::new();
    let mut source_closed = false;

    loop {
        if *stop.borrow() {
            break;
        }

        let read = tokio::select! {
            _ = stop.changed() => break,
            read = timeout(settings.read_timeout, source.read_line()) => read,
        };

        let mut pause = settings.poll_interval;
        match read {
            Ok(Ok(Some(line))) => {
                if std::mem::take(&mut source_closed) {
                    info!("Position source delivering again");
                }
                apply(&mut decoder, &fix, &line);
            }
            // End of stream on a tty is usually a hang-up; keep polling
            Ok(Ok(None)) => {
                if !source_closed {
                    warn!("Position source returned end of stream; keeping last fix");
                    source_closed = true;
                }
                pause = settings.read_timeout;
            }
            Ok(Err(e)) => warn!("Position read error: {}", e),
            // No complete line this round
            Err(_) => debug!("Position read timed out"),
        }

        tokio::select! {
            _ = stop.changed() => break,
            _ = tokio::time::sleep(pause) => {}
        }
    }

    debug!("Position tracker task exiting");
}

fn apply(decoder: &mut NmeaDecoder, fix: &FixHandle, line: &str) {
    match decoder.decode(line) {
        Ok(Sentence::Fix(coordinates)) => {
            debug!(
                "Position fix: {:.6}, {:.6}",
                coordinates.latitude, coordinates.longitude
            );
            fix.commit_coordinates(coordinates, Instant::now());
        }
        Ok(Sentence::Time(time)) => fix.commit_time(time),
        Ok(Sentence::NoSolution) => debug!("Receiver reports no solution"),
        Ok(Sentence::Other) => {}
        Err(NmeaError::NotNmea) => debug!("Ignoring non-NMEA line"),
        Err(e) => debug!("Discarding sentence: {}", e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::serial::line_source::mocks::ChannelLineSource;
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::io;

    const GGA: &str = "$GPGGA,123519,4807.038,N,01131.000,E,1,08,0.9,545.4,M,46.9,M,,*47";
    const GGA_NEXT: &str = "$GPGGA,123521,4807.040,N,01131.002,E,1,08,0.9,545.4,M,46.9,M,,*41";
    const GGA_NO_FIX: &str = "$GPGGA,123520,,,,,0,00,99.99,,,,,,*4F";
    const RMC: &str = "$GPRMC,123519,A,4807.038,N,01131.000,E,022.4,084.4,230394,003.1,W*6A";

    fn settings() -> TrackerSettings {
        TrackerSettings {
            read_timeout: Duration::from_millis(1000),
            poll_interval: Duration::from_millis(50),
        }
    }

    /// Let the tracker task drain whatever has been queued
    async fn settle() {
        tokio::time::sleep(Duration::from_millis(500)).await;
    }

    #[test]
    fn test_empty_fix() {
        let fix = PositionFix::default();
        assert_eq!(fix.latitude(), None);
        assert_eq!(fix.longitude(), None);
        assert_eq!(fix.age(Instant::now()), None);
        assert!(!fix.is_stale(Instant::now(), DEFAULT_STALE_AFTER));
    }

    #[tokio::test(start_paused = true)]
    async fn test_staleness() {
        let handle = FixHandle::new();
        handle.commit_coordinates(
            Coordinates {
                latitude: 1.0,
                longitude: 2.0,
            },
            Instant::now(),
        );

        tokio::time::advance(Duration::from_millis(1500)).await;
        assert!(!handle.snapshot().is_stale(Instant::now(), DEFAULT_STALE_AFTER));

        tokio::time::advance(Duration::from_millis(1000)).await;
        let fix = handle.snapshot();
        assert!(fix.is_stale(Instant::now(), DEFAULT_STALE_AFTER));
        assert_eq!(fix.age(Instant::now()), Some(Duration::from_millis(2500)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_observed_at_is_monotonic() {
        let handle = FixHandle::new();
        let later = Instant::now() + Duration::from_secs(5);
        let coords = Coordinates {
            latitude: 10.0,
            longitude: 20.0,
        };

        handle.commit_coordinates(coords, later);
        handle.commit_coordinates(coords, Instant::now());
        assert_eq!(handle.snapshot().observed_at, Some(later));
    }

    #[tokio::test(start_paused = true)]
    async fn test_tracker_commits_fix_and_time() {
        let (tx, source) = ChannelLineSource::new();
        let tracker = PositionTracker::start(source, settings());
        assert_eq!(tracker.current_fix(), PositionFix::default());

        tx.send(Ok(GGA.to_string())).unwrap();
        tx.send(Ok(RMC.to_string())).unwrap();
        settle().await;

        let fix = tracker.current_fix();
        assert!((fix.latitude().unwrap() - 48.1173).abs() < 1e-4);
        assert!((fix.longitude().unwrap() - 11.516_667).abs() < 1e-4);
        assert!(fix.observed_at.is_some());
        assert!(fix.fix_time_utc.is_some());

        tracker.stop().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_no_solution_and_garbage_keep_last_fix() {
        let (tx, source) = ChannelLineSource::new();
        let tracker = PositionTracker::start(source, settings());

        tx.send(Ok(GGA.to_string())).unwrap();
        settle().await;
        let first = tracker.current_fix();

        tx.send(Ok(GGA_NO_FIX.to_string())).unwrap();
        tx.send(Ok("$GPGGA,garbage*00".to_string())).unwrap();
        tx.send(Ok("\u{fffd}\u{fffd}".to_string())).unwrap();
        tx.send(Err(io::Error::new(io::ErrorKind::Other, "framing error"))).unwrap();
        settle().await;

        assert_eq!(tracker.current_fix(), first);
        tracker.stop().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_silence_keeps_last_fix() {
        let (tx, source) = ChannelLineSource::new();
        let tracker = PositionTracker::start(source, settings());

        tx.send(Ok(GGA.to_string())).unwrap();
        settle().await;
        let first = tracker.current_fix();

        // Ten seconds with no sentences: read timeouts only
        tokio::time::sleep(Duration::from_secs(10)).await;
        let fix = tracker.current_fix();
        assert_eq!(fix, first);
        assert!(fix.is_stale(Instant::now(), DEFAULT_STALE_AFTER));

        tx.send(Ok(GGA_NEXT.to_string())).unwrap();
        settle().await;
        let fix = tracker.current_fix();
        assert!(fix.observed_at > first.observed_at);
        assert!(!fix.is_stale(Instant::now(), DEFAULT_STALE_AFTER));

        tracker.stop().await;
    }

    /// Replays a fixed script of reads, then waits forever
    struct ScriptedLines(VecDeque<Option<&'static str>>);

    #[async_trait]
    impl LineSource for ScriptedLines {
        async fn read_line(&mut self) -> io::Result<Option<String>> {
            match self.0.pop_front() {
                Some(line) => Ok(line.map(str::to_string)),
                None => std::future::pending().await,
            }
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_end_of_stream_is_not_fatal() {
        let source = ScriptedLines(VecDeque::from([None, None, Some(GGA)]));
        let tracker = PositionTracker::start(source, settings());

        tokio::time::sleep(Duration::from_secs(3)).await;
        let fix = tracker.current_fix();
        assert!((fix.latitude().unwrap() - 48.1173).abs() < 1e-4);

        tracker.stop().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_returns_while_read_pending() {
        let (_tx, source) = ChannelLineSource::new();
        let tracker = PositionTracker::start(source, settings());
        settle().await;

        let started = Instant::now();
        tracker.stop().await;
        assert!(started.elapsed() <= settings().read_timeout);
    }

    #[tokio::test(start_paused = true)]
    async fn test_handle_outlives_tracker() {
        let (tx, source) = ChannelLineSource::new();
        let tracker = PositionTracker::start(source, settings());
        let handle = tracker.handle();

        tx.send(Ok(GGA.to_string())).unwrap();
        settle().await;
        tracker.stop().await;

        assert!(handle.snapshot().coordinates.is_some());
    }
}
