//! # Particulate Matter Sensor
//!
//! Decodes the 32-byte frames streamed by PMS5003-class laser particle
//! counters over UART (9600 baud, 8N1) and exposes PM1.0 / PM2.5 / PM10
//! standard-particle concentrations.
//!
//! ## Frame layout
//!
//! | Offset | Size | Field |
//! |--------|------|-------|
//! | 0 | 2 | Sync `0x42 0x4D` |
//! | 2 | 2 | Frame length (big-endian, always 28) |
//! | 4 | 26 | 13 big-endian data words |
//! | 30 | 2 | Checksum: sum of bytes 0..30 |
//!
//! The sensor streams about one frame per second, faster than a typical
//! logging period, so each sample drains the frames already queued in the
//! UART and reports the newest.

use async_trait::async_trait;
use bytes::Buf;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::time::timeout;
use tracing::debug;

use super::{Sample, SensorDriver, SensorError};
use crate::error::Result;
use crate::serial;

/// First sync byte
pub const PM_SYNC_1: u8 = 0x42;
/// Second sync byte
pub const PM_SYNC_2: u8 = 0x4D;
/// Complete frame size in bytes
pub const PM_FRAME_SIZE: usize = 32;
/// Value of the frame length field
pub const PM_FRAME_LENGTH: u16 = 28;
/// Bytes to scan for a sync pattern before giving up on a read
const MAX_SYNC_SCAN: usize = 4 * PM_FRAME_SIZE;
/// How long a queued frame may take to show up while draining
const DRAIN_WAIT: Duration = Duration::from_millis(10);
/// Upper bound on frames skipped in one drain
const MAX_DRAIN_FRAMES: usize = 64;

/// Record columns for this sensor class
pub const PM_COLUMNS: [&str; 3] = ["pm1_0", "pm2_5", "pm10"];

/// One decoded particulate reading
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PmReading {
    /// PM1.0, standard particle (µg/m³)
    pub pm1_0_standard: u16,
    /// PM2.5, standard particle (µg/m³)
    pub pm2_5_standard: u16,
    /// PM10, standard particle (µg/m³)
    pub pm10_standard: u16,
    /// PM1.0, atmospheric environment (µg/m³)
    pub pm1_0_env: u16,
    /// PM2.5, atmospheric environment (µg/m³)
    pub pm2_5_env: u16,
    /// PM10, atmospheric environment (µg/m³)
    pub pm10_env: u16,
    /// Particle counts per 0.1 L above 0.3, 0.5, 1.0, 2.5, 5.0 and 10 µm
    pub particles: [u16; 6],
}

/// Sum checksum over the frame header and data
pub fn frame_checksum(data: &[u8]) -> u16 {
    data.iter().fold(0u16, |acc, &b| acc.wrapping_add(u16::from(b)))
}

/// Decode a complete particulate frame
///
/// # Errors
///
/// Returns `SensorError::Frame` if:
/// - Frame is too short
/// - Sync bytes are incorrect
/// - Length field is not 28
/// - Checksum does not match
pub fn decode_frame(frame: &[u8]) -> std::result::Result<PmReading, SensorError> {
    if frame.len() < PM_FRAME_SIZE {
        return Err(SensorError::Frame(format!(
            "Frame too short: expected {} bytes, got {}",
            PM_FRAME_SIZE,
            frame.len()
        )));
    }

    if frame[0] != PM_SYNC_1 || frame[1] != PM_SYNC_2 {
        return Err(SensorError::Frame(format!(
            "Invalid sync bytes: 0x{:02X} 0x{:02X}",
            frame[0], frame[1]
        )));
    }

    let mut header = &frame[2..4];
    let length = header.get_u16();
    if length != PM_FRAME_LENGTH {
        return Err(SensorError::Frame(format!("Invalid frame length: {}", length)));
    }

    let mut trailer = &frame[30..32];
    let received = trailer.get_u16();
    let calculated = frame_checksum(&frame[..30]);
    if received != calculated {
        return Err(SensorError::Frame(format!(
            "Checksum mismatch: expected 0x{:04X}, got 0x{:04X}",
            calculated, received
        )));
    }

    let mut data = &frame[4..30];
    let pm1_0_standard = data.get_u16();
    let pm2_5_standard = data.get_u16();
    let pm10_standard = data.get_u16();
    let pm1_0_env = data.get_u16();
    let pm2_5_env = data.get_u16();
    let pm10_env = data.get_u16();
    let mut particles = [0u16; 6];
    for count in particles.iter_mut() {
        *count = data.get_u16();
    }

    Ok(PmReading {
        pm1_0_standard,
        pm2_5_standard,
        pm10_standard,
        pm1_0_env,
        pm2_5_env,
        pm10_env,
        particles,
    })
}

/// Particulate sensor streaming frames over any async reader
pub struct PmSensor<R> {
    reader: R,
}

impl PmSensor<tokio_serial::SerialStream> {
    /// Open the sensor on a serial port
    ///
    /// # Errors
    ///
    /// Returns `LoggerError::Serial` if the port cannot be opened.
    pub fn open(path: &str, baud_rate: u32) -> Result<Self> {
        let port = serial::open_port(path, baud_rate)?;
        Ok(Self::new(port))
    }
}

impl<R: AsyncRead + Unpin + Send> PmSensor<R> {
    pub fn new(reader: R) -> Self {
        Self { reader }
    }

    /// Read until one valid frame has been decoded
    pub async fn read_frame(&mut self) -> std::result::Result<PmReading, SensorError> {
        let mut scanned = 0;
        let mut previous = 0u8;

        // Hunt for the sync pattern
        loop {
            let byte = self.reader.read_u8().await?;
            scanned += 1;
            if previous == PM_SYNC_1 && byte == PM_SYNC_2 {
                break;
            }
            if scanned >= MAX_SYNC_SCAN {
                return Err(SensorError::Frame(format!(
                    "No sync pattern within {} bytes",
                    MAX_SYNC_SCAN
                )));
            }
            previous = byte;
        }

        let mut frame = [0u8; PM_FRAME_SIZE];
        frame[0] = PM_SYNC_1;
        frame[1] = PM_SYNC_2;
        self.reader.read_exact(&mut frame[2..]).await?;

        let reading = decode_frame(&frame)?;
        debug!(
            "PM frame: pm1.0={} pm2.5={} pm10={}",
            reading.pm1_0_standard, reading.pm2_5_standard, reading.pm10_standard
        );
        Ok(reading)
    }

    /// Read one frame, then keep the newest of any frames already queued
    ///
    /// A drain read interrupted mid-frame drops those bytes; the next call
    /// resynchronises on the following sync pattern.
    pub async fn read_latest(&mut self) -> std::result::Result<PmReading, SensorError> {
        let mut latest = self.read_frame().await?;
        let mut skipped = 0;

        while skipped < MAX_DRAIN_FRAMES {
            match timeout(DRAIN_WAIT, self.read_frame()).await {
                Ok(Ok(reading)) => {
                    latest = reading;
                    skipped += 1;
                }
                Ok(Err(e)) => {
                    debug!("PM drain stopped: {}", e);
                    break;
                }
                Err(_) => break,
            }
        }

        if skipped > 0 {
            debug!("Skipped {} queued PM frames", skipped);
        }
        Ok(latest)
    }
}

#[async_trait]
impl<R: AsyncRead + Unpin + Send> SensorDriver for PmSensor<R> {
    fn name(&self) -> &str {
        "pm"
    }

    fn columns(&self) -> Vec<String> {
        PM_COLUMNS.iter().map(|c| c.to_string()).collect()
    }

    async fn sample(&mut self) -> std::result::Result<Sample, SensorError> {
        let reading = self.read_latest().await?;
        Ok(vec![
            Some(f64::from(reading.pm1_0_standard)),
            Some(f64::from(reading.pm2_5_standard)),
            Some(f64::from(reading.pm10_standard)),
        ])
    }
}
