//! # Supervisor
//!
//! Builds the pipeline from configuration and runs one logging session:
//! position tracker, session file, warm-up, acquisition loop, then an
//! orderly shutdown that reports how many rows were written and where.

use chrono::Local;
use tokio::sync::watch;
use tracing::{error, info, warn};

use crate::acquisition::{schema_for, AcquisitionLoop, LoopSettings, RunSummary, SensorSlot};
use crate::config::{AcquisitionConfig, Backend, Config};
use crate::error::{LoggerError, Result};
use crate::position::{FixHandle, PositionTracker, TrackerSettings};
use crate::record::CsvSession;
use crate::sensors::co2::SimulatedCo2;
use crate::sensors::gas::{IioGasArray, SimulatedGasArray, VoltageDivider};
use crate::sensors::imu::SimulatedImu;
use crate::sensors::pm::PmSensor;
use crate::sensors::voc::SimulatedVoc;
use crate::sensors::SensorDriver;
use crate::serial::{LineSource, SerialLineSource};
use crate::status::{StatusLight, SysfsLed};
use crate::warmup::WarmupController;

/// Everything a session reads from or drives
pub struct Pipeline {
    /// GPS sentence stream; `None` when GPS is disabled
    pub position_source: Option<Box<dyn LineSource>>,
    /// Sensor slots in record order
    pub slots: Vec<SensorSlot>,
    pub light: StatusLight,
}

/// Runs logging sessions for one configuration
pub struct Supervisor {
    config: Config,
}

impl Supervisor {
    /// # Errors
    ///
    /// Returns `LoggerError::Config` if the configuration is invalid.
    pub fn new(config: Config) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Open the configured hardware and run a session until `stop`
    ///
    /// # Errors
    ///
    /// Fails if a device or the session file cannot be opened, or when the
    /// session file stops accepting rows.
    pub async fn run(&self, stop: watch::Receiver<bool>) -> Result<RunSummary> {
        let pipeline = self.open_pipeline()?;
        self.run_pipeline(pipeline, stop).await
    }

    /// Open the GPS port, the sensors and the status LED
    pub fn open_pipeline(&self) -> Result<Pipeline> {
        let slots = build_slots(&self.config)?;

        let position_source = if self.config.gps.enabled {
            let source = SerialLineSource::open(&self.config.gps.port, self.config.gps.baud_rate)?;
            Some(Box::new(source) as Box<dyn LineSource>)
        } else {
            info!("GPS disabled; position columns will be empty");
            None
        };

        let led = &self.config.status_led;
        let light = if led.enabled {
            StatusLight::new(Box::new(SysfsLed::new(&led.path, led.active_low)))
        } else {
            StatusLight::disabled()
        };

        Ok(Pipeline {
            position_source,
            slots,
            light,
        })
    }

    /// Run one session over an already-open pipeline
    pub async fn run_pipeline(
        &self,
        pipeline: Pipeline,
        stop: watch::Receiver<bool>,
    ) -> Result<RunSummary> {
        let Pipeline {
            position_source,
            slots,
            mut light,
        } = pipeline;
        let acquisition = &self.config.acquisition;
        let settings = LoopSettings::from_config(acquisition, &self.config.gps);

        let schema = schema_for(&settings, &slots);
        let session = CsvSession::create(
            &acquisition.output_dir,
            &acquisition.file_prefix,
            Local::now(),
            &schema,
        )?;

        let tracker = position_source.map(|source| {
            PositionTracker::start(
                source,
                TrackerSettings {
                    read_timeout: self.config.gps.read_timeout(),
                    poll_interval: self.config.gps.poll_interval(),
                },
            )
        });
        let fix = tracker
            .as_ref()
            .map(PositionTracker::handle)
            .unwrap_or_else(FixHandle::new);

        let warmup = WarmupController::from_config(&self.config.warmup, &self.config.status_led);
        let mut sampler = AcquisitionLoop::new(settings, fix, slots, session);
        let result = sampler.run(&warmup, &mut light, stop).await;

        if let Some(tracker) = tracker {
            tracker.stop().await;
        }

        match &result {
            Ok(summary) => info!(
                "Session complete: {} rows written to {}",
                summary.rows_written,
                summary.path.display()
            ),
            Err(LoggerError::Sink {
                path, rows_written, ..
            }) => error!(
                "Logging halted: {} rows were written durably to {}",
                rows_written,
                path.display()
            ),
            Err(e) => error!("Logging halted: {}", e),
        }

        result
    }
}

/// Build the enabled sensor slots in record order: gas, VOC, CO2, PM, IMU
pub fn build_slots(config: &Config) -> Result<Vec<SensorSlot>> {
    let acquisition = &config.acquisition;
    let mut slots = Vec::new();

    for class in config.simulated_classes() {
        warn!("{} sensor is simulated; its columns hold synthetic values", class);
    }

    if config.gas.enabled {
        let gas = &config.gas;
        let driver: Box<dyn SensorDriver> = match gas.backend {
            Backend::Iio => Box::new(IioGasArray::open(&gas.iio_device, gas.channels.clone())?),
            Backend::Simulated => Box::new(SimulatedGasArray::new(gas.channels.clone())),
        };
        let divider = VoltageDivider::new(gas.circuit_voltage, gas.load_resistance);
        slots.push(register(acquisition, driver).with_resistance(divider));
    }

    if config.voc.enabled {
        let voc = register(acquisition, Box::new(SimulatedVoc::new()));
        slots.push(voc.with_validity_policy(config.voc.validity));
    }

    if config.co2.enabled {
        slots.push(register(acquisition, Box::new(SimulatedCo2::new())));
    }

    if config.pm.enabled {
        let pm = PmSensor::open(&config.pm.port, config.pm.baud_rate)?;
        slots.push(register(acquisition, Box::new(pm)));
    }

    if config.imu.enabled {
        slots.push(register(acquisition, Box::new(SimulatedImu::new())));
    }

    Ok(slots)
}

fn register(acquisition: &AcquisitionConfig, driver: Box<dyn SensorDriver>) -> SensorSlot {
    let slot = SensorSlot::new(driver)
        .with_timeout(acquisition.sensor_timeout())
        .with_settle(acquisition.settle());
    info!("Sensor registered: {} ({} columns)", slot.name(), slot.width());
    slot
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::serial::line_source::mocks::ChannelLineSource;
    use std::fs;
    use std::path::Path;
    use std::time::Duration;

    const GGA: &str = "$GPGGA,123519,4807.038,N,01131.000,E,1,08,0.9,545.4,M,46.9,M,,*47";

    fn bench_config(output_dir: &Path) -> Config {
        let mut config = Config::default();
        config.acquisition.output_dir = output_dir.to_path_buf();
        config.acquisition.period_ms = 1000;
        config.acquisition.record_gps_time = false;
        config.warmup.duration_s = 0;
        config.gas.backend = Backend::Simulated;
        config.voc.enabled = false;
        config.co2.enabled = false;
        config.pm.enabled = false;
        config.imu.enabled = true;
        config.imu.backend = Some(Backend::Simulated);
        config
    }

    fn bench_pipeline(config: &Config, source: Option<Box<dyn LineSource>>) -> Pipeline {
        Pipeline {
            position_source: source,
            slots: build_slots(config).unwrap(),
            light: StatusLight::disabled(),
        }
    }

    fn header_of(path: &Path) -> String {
        fs::read_to_string(path).unwrap().lines().next().unwrap().to_string()
    }

    #[test]
    fn test_invalid_config_rejected_before_start() {
        let mut config = Config::default();
        config.acquisition.period_ms = 0;
        assert!(matches!(Supervisor::new(config), Err(LoggerError::Config(_))));
    }

    #[test]
    fn test_slot_order() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = bench_config(dir.path());
        config.voc.enabled = true;
        config.voc.backend = Some(Backend::Simulated);
        config.co2.enabled = true;
        config.co2.backend = Some(Backend::Simulated);

        let slots = build_slots(&config).unwrap();
        let names: Vec<_> = slots.iter().flat_map(|s| s.column_names()).collect();
        assert_eq!(
            names,
            vec![
                "mq3_voltage", "mq4_voltage", "mq8_voltage",
                "mq3_resistance", "mq4_resistance", "mq8_resistance",
                "tvoc", "eco2", "aqi",
                "co2", "temperature", "humidity",
                "accel_x", "accel_y", "accel_z",
                "gyro_x", "gyro_y", "gyro_z",
                "mag_x", "mag_y", "mag_z",
            ]
        );
    }

    #[test]
    fn test_default_config_builds_no_simulated_slots() {
        let mut config = Config::default();
        config.pm.enabled = false;
        let dir = tempfile::tempdir().unwrap();
        config.gas.iio_device = dir.path().to_path_buf();
        for input in [0, 1, 3] {
            fs::write(dir.path().join(format!("in_voltage{}_raw", input)), "8000\n").unwrap();
            fs::write(dir.path().join(format!("in_voltage{}_scale", input)), "0.125\n").unwrap();
        }

        let slots = build_slots(&config).unwrap();
        let names: Vec<_> = slots.iter().map(|s| s.name().to_string()).collect();
        assert_eq!(names, vec!["gas"]);
        assert!(config.simulated_classes().is_empty());
    }

    #[test]
    fn test_missing_iio_device_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = bench_config(dir.path());
        config.gas.backend = Backend::Iio;
        config.gas.iio_device = dir.path().join("no-such-device");

        assert!(matches!(build_slots(&config), Err(LoggerError::Sensor(_))));
    }

    #[tokio::test(start_paused = true)]
    async fn test_session_with_position() {
        let dir = tempfile::tempdir().unwrap();
        let config = bench_config(dir.path());
        let supervisor = Supervisor::new(config).unwrap();

        let (lines, source) = ChannelLineSource::new();
        lines.send(Ok(GGA.to_string())).unwrap();
        let pipeline = bench_pipeline(supervisor.config(), Some(Box::new(source)));

        let (tx, rx) = watch::channel(false);
        let (result, _) = tokio::join!(supervisor.run_pipeline(pipeline, rx), async {
            tokio::time::sleep(Duration::from_millis(3500)).await;
            tx.send(true).unwrap();
        });
        let summary = result.unwrap();

        assert_eq!(summary.ticks, 4);
        assert_eq!(summary.rows_written, 4);
        assert!(summary.path.starts_with(dir.path()));

        let contents = fs::read_to_string(&summary.path).unwrap();
        let lines: Vec<_> = contents.lines().collect();
        assert_eq!(lines.len(), 5);
        assert!(lines[0].starts_with("timestamp,latitude,longitude,mq3_voltage"));

        // The first tick may race the tracker; later ones carry the fix
        let columns: Vec<_> = lines[0].split(',').collect();
        let lat = columns.iter().position(|c| *c == "latitude").unwrap();
        for row in &lines[2..] {
            let fields: Vec<_> = row.split(',').collect();
            assert_eq!(fields.len(), columns.len());
            let latitude: f64 = fields[lat].parse().unwrap();
            assert!((latitude - 48.1173).abs() < 1e-4);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_same_config_same_header() {
        let first_dir = tempfile::tempdir().unwrap();
        let second_dir = tempfile::tempdir().unwrap();
        let mut paths = Vec::new();

        for dir in [first_dir.path(), second_dir.path()] {
            let mut config = bench_config(dir);
            config.gps.enabled = false;
            let supervisor = Supervisor::new(config).unwrap();
            let pipeline = bench_pipeline(supervisor.config(), None);

            let (_tx, rx) = watch::channel(true);
            let summary = supervisor.run_pipeline(pipeline, rx).await.unwrap();
            assert_eq!(summary.rows_written, 0);
            paths.push(summary.path);
        }

        assert_eq!(header_of(&paths[0]), header_of(&paths[1]));
    }

    #[tokio::test(start_paused = true)]
    async fn test_unwritable_output_dir() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("not-a-dir");
        fs::write(&blocker, "").unwrap();

        let mut config = bench_config(&blocker);
        config.gps.enabled = false;
        let supervisor = Supervisor::new(config).unwrap();
        let pipeline = bench_pipeline(supervisor.config(), None);

        let (_tx, rx) = watch::channel(false);
        let result = supervisor.run_pipeline(pipeline, rx).await;
        assert!(matches!(result, Err(LoggerError::Io(_))));
    }
}
