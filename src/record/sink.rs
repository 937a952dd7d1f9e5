//! Durable per-session CSV output
//!
//! Each session writes a new file named after the start time. The header is
//! written once at creation, then one line per record; every write is synced
//! to storage before it counts, so a power cut loses at most the row being
//! written.

use chrono::{DateTime, Local};
use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use super::{Record, Schema};

/// Destination for records
#[cfg_attr(test, mockall::automock)]
pub trait RecordSink: Send {
    /// Write one record durably
    fn append(&mut self, record: &Record) -> io::Result<()>;

    /// Records successfully written so far
    fn rows_written(&self) -> u64;

    /// Where the records go
    fn path(&self) -> PathBuf;

    /// Flush and release the destination
    fn close(&mut self) -> io::Result<()>;
}

/// `<prefix>_<YYYY-MM-DD_HH-MM-SS>.csv`
pub fn session_file_name(prefix: &str, started: DateTime<Local>) -> String {
    format!("{}_{}.csv", prefix, started.format("%Y-%m-%d_%H-%M-%S"))
}

/// CSV file for one logging session
#[derive(Debug)]
pub struct CsvSession {
    path: PathBuf,
    file: Option<File>,
    width: usize,
    rows: u64,
    failed: bool,
}

impl CsvSession {
    /// Create `<dir>/<prefix>_<start time>.csv` and write the header
    ///
    /// # Errors
    ///
    /// Fails if the directory cannot be created, a file of that name already
    /// exists, or the header cannot be written durably.
    pub fn create(
        dir: &Path,
        prefix: &str,
        started: DateTime<Local>,
        schema: &Schema,
    ) -> io::Result<Self> {
        fs::create_dir_all(dir)?;
        Self::open(&dir.join(session_file_name(prefix, started)), schema)
    }

    /// Create a new session file at an explicit path
    pub fn open(path: &Path, schema: &Schema) -> io::Result<Self> {
        let mut file = OpenOptions::new().write(true).create_new(true).open(path)?;
        file.write_all(format!("{}\n", schema.header()).as_bytes())?;
        file.sync_data()?;

        info!("Logging {} columns to {}", schema.len(), path.display());
        Ok(Self {
            path: path.to_path_buf(),
            file: Some(file),
            width: schema.len(),
            rows: 0,
            failed: false,
        })
    }
}

impl RecordSink for CsvSession {
    fn append(&mut self, record: &Record) -> io::Result<()> {
        if self.failed {
            return Err(io::Error::new(
                io::ErrorKind::Other,
                "session file is unusable after an earlier write failure",
            ));
        }
        if record.values().len() != self.width {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!(
                    "record has {} fields, session has {} columns",
                    record.values().len(),
                    self.width
                ),
            ));
        }
        let file = self
            .file
            .as_mut()
            .ok_or_else(|| io::Error::new(io::ErrorKind::Other, "session file is closed"))?;

        let line = format!("{}\n", record.to_line());
        let written = file.write_all(line.as_bytes()).and_then(|_| file.sync_data());
        if let Err(e) = written {
            self.failed = true;
            return Err(e);
        }

        self.rows += 1;
        debug!("Row {}: {}", self.rows, record.to_line());
        Ok(())
    }

    fn rows_written(&self) -> u64 {
        self.rows
    }

    fn path(&self) -> PathBuf {
        self.path.clone()
    }

    fn close(&mut self) -> io::Result<()> {
        if let Some(mut file) = self.file.take() {
            file.flush()?;
            file.sync_all()?;
        }
        Ok(())
    }
}
