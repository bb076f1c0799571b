//! Serial line transport for the modem backend.
//!
//! The [`SerialTransport`] trait is the seam between the AT protocol state
//! machine and the actual serial hardware; tests drive the state machine
//! with a scripted transport instead of a tty.

use crate::error::{BackendError, Result};
use async_trait::async_trait;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, ReadHalf, WriteHalf};
use tokio_serial::{SerialPortBuilderExt, SerialStream};

/// A line-oriented serial channel.
#[async_trait]
pub trait SerialTransport: Send {
    /// Write a command line, terminated with a carriage return.
    async fn write_line(&mut self, line: &str) -> Result<()>;

    /// Write raw bytes with no terminator. Needed for the `+++` escape,
    /// which must not be followed by a CR.
    async fn write_raw(&mut self, data: &str) -> Result<()>;

    /// Read one line, trimmed of CR/LF. `Ok(None)` means the timeout
    /// elapsed with no complete line; a closed port is an error.
    async fn read_line(&mut self, timeout: Duration) -> Result<Option<String>>;

    /// Close the channel.
    async fn close(&mut self) -> Result<()>;
}

/// [`SerialTransport`] over a real serial device via `tokio-serial`.
pub struct TtyTransport {
    reader: BufReader<ReadHalf<SerialStream>>,
    writer: WriteHalf<SerialStream>,
    port: String,
}

impl TtyTransport {
    /// Open a serial port in 8N1 at the given baud rate.
    ///
    /// # Errors
    /// [`BackendError::Transport`] when the device cannot be opened.
    pub fn open(port: &str, baud_rate: u32) -> Result<Self> {
        let stream = tokio_serial::new(port, baud_rate)
            .open_native_async()
            .map_err(|err| {
                BackendError::Transport(format!("failed to open serial port {port}: {err}"))
            })?;

        tracing::info!("Opened serial port {} at {} baud", port, baud_rate);
        let (reader, writer) = tokio::io::split(stream);
        Ok(Self {
            reader: BufReader::new(reader),
            writer,
            port: port.to_string(),
        })
    }
}

#[async_trait]
impl SerialTransport for TtyTransport {
    async fn write_line(&mut self, line: &str) -> Result<()> {
        tracing::debug!("Serial send: {}", line);
        self.writer.write_all(format!("{line}\r").as_bytes()).await?;
        self.writer.flush().await?;
        Ok(())
    }

    async fn write_raw(&mut self, data: &str) -> Result<()> {
        self.writer.write_all(data.as_bytes()).await?;
        self.writer.flush().await?;
        Ok(())
    }

    async fn read_line(&mut self, timeout: Duration) -> Result<Option<String>> {
        let mut buf = String::new();
        match tokio::time::timeout(timeout, self.reader.read_line(&mut buf)).await {
            Err(_) => Ok(None),
            Ok(Ok(0)) => Err(BackendError::Transport(format!(
                "serial port {} closed",
                self.port
            ))),
            Ok(Ok(_)) => Ok(Some(buf.trim().to_string())),
            Ok(Err(err)) => Err(BackendError::Transport(format!(
                "read from {} failed: {err}",
                self.port
            ))),
        }
    }

    async fn close(&mut self) -> Result<()> {
        self.writer.shutdown().await?;
        tracing::info!("Closed serial port {}", self.port);
        Ok(())
    }
}
