//! # Status Light
//!
//! A single LED tells someone standing next to the logger what it is doing:
//! blinking while sensors warm up, steady while logging, dark once stopped.
//! The LED is driven through the kernel's sysfs LED or GPIO value file.
//!
//! LED failures are logged and otherwise ignored; they never stop logging.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Something that can be switched on and off
pub trait StatusIndicator: Send {
    fn set(&mut self, on: bool) -> io::Result<()>;
}

/// LED controlled by writing `0`/`1` to a sysfs file
#[derive(Debug, Clone)]
pub struct SysfsLed {
    path: PathBuf,
    active_low: bool,
}

impl SysfsLed {
    pub fn new(path: impl Into<PathBuf>, active_low: bool) -> Self {
        Self {
            path: path.into(),
            active_low,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl StatusIndicator for SysfsLed {
    fn set(&mut self, on: bool) -> io::Result<()> {
        let level = on != self.active_low;
        fs::write(&self.path, if level { "1" } else { "0" })
    }
}

/// Status light with remembered state
pub struct StatusLight {
    led: Option<Box<dyn StatusIndicator>>,
    lit: bool,
}

impl StatusLight {
    pub fn new(led: Box<dyn StatusIndicator>) -> Self {
        Self {
            led: Some(led),
            lit: false,
        }
    }

    /// A light that tracks state but drives nothing
    pub fn disabled() -> Self {
        Self {
            led: None,
            lit: false,
        }
    }

    pub fn is_lit(&self) -> bool {
        self.lit
    }

    pub fn on(&mut self) {
        self.set(true);
    }

    pub fn off(&mut self) {
        self.set(false);
    }

    pub fn toggle(&mut self) {
        self.set(!self.lit);
    }

    fn set(&mut self, on: bool) {
        self.lit = on;
        if let Some(led) = self.led.as_mut() {
            if let Err(e) = led.set(on) {
                warn!("Failed to switch status LED {}: {}", if on { "on" } else { "off" }, e);
            } else {
                debug!("Status LED {}", if on { "on" } else { "off" });
            }
        }
    }
}
