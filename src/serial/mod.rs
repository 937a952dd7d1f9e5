//! # Serial Communication Module
//!
//! UART access for the GPS receiver and the particulate matter sensor.
//!
//! This module handles:
//! - Opening serial ports with 8N1 settings at the device's native baud
//! - Reading newline-delimited sentences without losing partial lines
//!   when a read times out

use std::path::Path;
use tokio_serial::SerialPortBuilderExt;

use crate::error::{LoggerError, Result};
use tracing::{debug, info};

pub mod line_source;

pub use line_source::{LineSource, SerialLineSource};

/// Open a serial port with 8N1 settings and no flow control
///
/// # Arguments
///
/// * `path` - Device path (e.g., "/dev/serial0")
/// * `baud_rate` - Line speed of the attached device
///
/// # Errors
///
/// Returns `LoggerError::SerialPortNotFound` if the device node does not
/// exist, or `LoggerError::Serial` if the port cannot be opened.
///
/// # Examples
///
/// ```no_run
/// use sensor_logger::serial::open_port;
///
/// #[tokio::main]
/// async fn main() -> anyhow::Result<()> {
///     let port = open_port("/dev/serial0", 9600)?;
///     Ok(())
/// }
/// ```
pub fn open_port(path: &str, baud_rate: u32) -> Result<tokio_serial::SerialStream> {
    debug!("Opening serial port {} at {} baud", path, baud_rate);

    if !Path::new(path).exists() {
        return Err(LoggerError::SerialPortNotFound(path.to_string()));
    }

    let port = tokio_serial::new(path, baud_rate)
        .data_bits(tokio_serial::DataBits::Eight)
        .parity(tokio_serial::Parity::None)
        .stop_bits(tokio_serial::StopBits::One)
        .flow_control(tokio_serial::FlowControl::None)
        .open_native_async()
        .map_err(|e| LoggerError::Serial(format!("Failed to open {}: {}", path, e)))?;

    info!("Opened serial port {} at {} baud", path, baud_rate);
    Ok(port)
}
