//! # Sensor Logger Library
//!
//! Log synchronized air-quality, particulate, motion and GPS readings to CSV.
//!
//! A background task keeps the latest GPS fix while the acquisition loop
//! samples every enabled sensor on a fixed period, tolerates individual
//! sensor faults, and appends one durable row per tick.

pub mod acquisition;
pub mod config;
pub mod error;
pub mod position;
pub mod record;
pub mod sensors;
pub mod serial;
pub mod status;
pub mod supervisor;
pub mod warmup;
