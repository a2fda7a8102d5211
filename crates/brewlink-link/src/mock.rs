//! In-memory channel for tests and demo sessions.
//!
//! [`MockChannel`] opens an in-process duplex pipe instead of a serial port.
//! The far end of each pipe is handed to the paired [`MockDevice`], which
//! plays the controller (usually by serving it with the emulator). A
//! [`MockProbe`] observes and steers the channel from the outside.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use tokio::io::{AsyncWriteExt, DuplexStream};
use tokio::sync::mpsc;
use tracing::debug;

use crate::channel::Channel;
use crate::error::LinkError;

/// Pipe capacity per direction; a serial FIFO is far smaller.
const DEFAULT_PIPE_CAPACITY: usize = 8 * 1024;

#[derive(Debug, Default)]
struct ProbeState {
    opens: AtomicUsize,
    closes: AtomicUsize,
    reunited_closes: AtomicUsize,
    fail_next_open: AtomicBool,
}

/// Shared counters and fault switches for a [`MockChannel`].
#[derive(Debug, Clone, Default)]
pub struct MockProbe {
    state: Arc<ProbeState>,
}

impl MockProbe {
    /// Successful opens so far.
    pub fn opens(&self) -> usize {
        self.state.opens.load(Ordering::SeqCst)
    }

    /// Close calls so far.
    pub fn closes(&self) -> usize {
        self.state.closes.load(Ordering::SeqCst)
    }

    /// Close calls that received the reunited stream.
    pub fn reunited_closes(&self) -> usize {
        self.state.reunited_closes.load(Ordering::SeqCst)
    }

    /// Make the next `open` fail, as if the port were busy.
    pub fn fail_next_open(&self) {
        self.state.fail_next_open.store(true, Ordering::SeqCst);
    }
}

/// Channel backed by `tokio::io::duplex`.
///
/// # Examples
///
/// ```
/// use brewlink_link::{Channel, MockChannel};
/// use tokio::io::{AsyncReadExt, AsyncWriteExt};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let (mut channel, mut device) = MockChannel::new();
///
///     let mut host = channel.open().await?;
///     let mut far_end = device.accept().await.unwrap();
///
///     host.write_all(b"ping").await?;
///     let mut buf = [0u8; 4];
///     far_end.read_exact(&mut buf).await?;
///     assert_eq!(&buf, b"ping");
///
///     channel.close(Some(host)).await?;
///     assert_eq!(channel.probe().closes(), 1);
///     Ok(())
/// }
/// ```
#[derive(Debug)]
pub struct MockChannel {
    device_tx: mpsc::UnboundedSender<DuplexStream>,
    probe: MockProbe,
    capacity: usize,
    device_info: String,
}

/// Controller-side endpoint of a [`MockChannel`].
#[derive(Debug)]
pub struct MockDevice {
    streams: mpsc::UnboundedReceiver<DuplexStream>,
}

impl MockDevice {
    /// Wait for the host to open the channel and return the far end.
    ///
    /// Returns `None` once the channel has been dropped.
    pub async fn accept(&mut self) -> Option<DuplexStream> {
        self.streams.recv().await
    }
}

impl MockChannel {
    pub fn new() -> (Self, MockDevice) {
        Self::with_device_info("Mock Serial Device")
    }

    pub fn with_device_info(device_info: impl Into<String>) -> (Self, MockDevice) {
        let (device_tx, streams) = mpsc::unbounded_channel();
        let channel = Self {
            device_tx,
            probe: MockProbe::default(),
            capacity: DEFAULT_PIPE_CAPACITY,
            device_info: device_info.into(),
        };
        (channel, MockDevice { streams })
    }

    pub fn probe(&self) -> MockProbe {
        self.probe.clone()
    }
}

impl Channel for MockChannel {
    type Stream = DuplexStream;

    async fn open(&mut self) -> Result<DuplexStream, LinkError> {
        if self.probe.state.fail_next_open.swap(false, Ordering::SeqCst) {
            return Err(LinkError::open_failed(&self.device_info, "simulated open failure"));
        }

        let (host, device) = tokio::io::duplex(self.capacity);
        if self.device_tx.send(device).is_err() {
            debug!("No mock device listening; far end dropped");
        }

        self.probe.state.opens.fetch_add(1, Ordering::SeqCst);
        Ok(host)
    }

    async fn close(&mut self, stream: Option<DuplexStream>) -> Result<(), LinkError> {
        self.probe.state.closes.fetch_add(1, Ordering::SeqCst);

        if let Some(mut stream) = stream {
            self.probe.state.reunited_closes.fetch_add(1, Ordering::SeqCst);
            // The far end may already be gone.
            let _ = stream.shutdown().await;
        }
        Ok(())
    }

    fn device_info(&self) -> String {
        self.device_info.clone()
    }
}
