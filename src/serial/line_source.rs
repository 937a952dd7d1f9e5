//! Trait abstraction for line-oriented position sources to enable testing

use async_trait::async_trait;
use std::io;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};

use crate::error::Result;

/// Lines longer than this are garbage (NMEA sentences are at most 82 bytes)
pub const MAX_LINE_LEN: usize = 256;

/// A stream of text lines
#[async_trait]
pub trait LineSource: Send {
    /// Read the next complete line, without its terminator
    ///
    /// Returns `Ok(None)` when the stream has ended. Implementations must be
    /// safe to cancel: a read abandoned half-way keeps its bytes for the next call.
    async fn read_line(&mut self) -> io::Result<Option<String>>;
}

#[async_trait]
impl<T: LineSource + ?Sized> LineSource for Box<T> {
    async fn read_line(&mut self) -> io::Result<Option<String>> {
        (**self).read_line().await
    }
}

/// Line reader over a serial port (or any async byte stream)
pub struct SerialLineSource<R> {
    reader: BufReader<R>,
    /// Bytes of the line currently being assembled
    pending: Vec<u8>,
}

impl SerialLineSource<tokio_serial::SerialStream> {
    /// Open a line source on a serial port
    pub fn open(path: &str, baud_rate: u32) -> Result<Self> {
        Ok(Self::new(super::open_port(path, baud_rate)?))
    }
}

impl<R: AsyncRead + Unpin + Send> SerialLineSource<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader: BufReader::new(reader),
            pending: Vec::with_capacity(MAX_LINE_LEN),
        }
    }

    fn take_line(&mut self) -> String {
        let line = String::from_utf8_lossy(&self.pending).trim().to_string();
        self.pending.clear();
        line
    }
}

#[async_trait]
impl<R: AsyncRead + Unpin + Send> LineSource for SerialLineSource<R> {
    async fn read_line(&mut self) -> io::Result<Option<String>> {
        // read_until appends to `pending` as bytes arrive, so a cancelled
        // call leaves the partial line in place.
        let n = if self.pending.len() > MAX_LINE_LEN {
            0
        } else {
            self.reader.read_until(b'\n', &mut self.pending).await?
        };

        if self.pending.len() > MAX_LINE_LEN {
            let len = self.pending.len();
            self.pending.clear();
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("discarded {} bytes without a line terminator", len),
            ));
        }

        if n == 0 && self.pending.is_empty() {
            return Ok(None);
        }

        Ok(Some(self.take_line()))
    }
}
