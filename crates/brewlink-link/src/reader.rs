//! The read task.
//!
//! One task per connection owns the read half and a [`ChunkPipeline`]. It
//! reads until cancelled, until the device closes the stream, or until a
//! read fails, and hands the read half back through its join handle so the
//! controller can reunite it with the write half.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use bytes::BytesMut;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::task::{JoinError, JoinHandle};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use brewlink_protocol::LogEntry;

use crate::config::BufferSettings;
use crate::events::{LinkObserver, StopReason};
use crate::pipeline::{ChunkPipeline, ProcessedChunk};

/// Log target for device output.
pub const SERIAL_LOG_TARGET: &str = "brewlink::serial";

/// What a finished read task returns.
#[derive(Debug)]
pub struct ReadOutcome<R> {
    pub reader: R,
    pub reason: StopReason,
}

/// Handle to a running read task.
#[derive(Debug)]
pub struct ReadLoopHandle<R> {
    token: CancellationToken,
    reading: Arc<AtomicBool>,
    task: JoinHandle<ReadOutcome<R>>,
}

impl<R> ReadLoopHandle<R>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    pub fn spawn(reader: R, settings: &BufferSettings, observer: Arc<dyn LinkObserver>) -> Self {
        let token = CancellationToken::new();
        let reading = Arc::new(AtomicBool::new(true));
        let pipeline = ChunkPipeline::new(settings);

        let task = tokio::spawn(read_loop(
            reader,
            pipeline,
            settings.read_chunk_size,
            token.clone(),
            Arc::clone(&reading),
            observer,
        ));

        Self {
            token,
            reading,
            task,
        }
    }

    /// False once the loop has ended, for whatever reason.
    pub fn is_reading(&self) -> bool {
        self.reading.load(Ordering::SeqCst)
    }

    /// Cancel the loop (if still running) and wait for it to hand back the
    /// read half. No observer callback runs after this returns.
    pub async fn stop(self) -> Result<ReadOutcome<R>, JoinError> {
        self.token.cancel();
        self.task.await
    }
}

async fn read_loop<R>(
    mut reader: R,
    mut pipeline: ChunkPipeline,
    chunk_size: usize,
    token: CancellationToken,
    reading: Arc<AtomicBool>,
    observer: Arc<dyn LinkObserver>,
) -> ReadOutcome<R>
where
    R: AsyncRead + Unpin,
{
    let mut buf = BytesMut::with_capacity(chunk_size);
    debug!(chunk_size, "Read loop started");

    let reason = loop {
        if token.is_cancelled() {
            break StopReason::Cancelled;
        }

        buf.clear();
        let result = tokio::select! {
            biased;
            () = token.cancelled() => break StopReason::Cancelled,
            result = reader.read_buf(&mut buf) => result,
        };

        match result {
            Ok(0) => break StopReason::EndOfStream,
            Ok(_) => deliver(pipeline.process(&buf), observer.as_ref()),
            Err(e) => break StopReason::ReadError(e.to_string()),
        }
    };

    match &reason {
        StopReason::Cancelled => {
            reading.store(false, Ordering::SeqCst);
            debug!("Read loop cancelled");
        }
        other => {
            deliver(pipeline.finish(), observer.as_ref());
            reading.store(false, Ordering::SeqCst);
            warn!(reason = %other, "Read loop stopped");
            observer.on_read_stopped(other);
        }
    }

    ReadOutcome { reader, reason }
}

fn deliver(chunk: ProcessedChunk, observer: &dyn LinkObserver) {
    for entry in &chunk.log_entries {
        match entry {
            LogEntry::Line(line) => info!(target: SERIAL_LOG_TARGET, "{line}"),
            LogEntry::Overflow(text) => {
                info!(target: SERIAL_LOG_TARGET, "(Buffer Full) {text}");
            }
        }
    }

    if let Some(dropped) = chunk.truncated {
        debug!(dropped, "Parse buffer capped");
    }

    for status in chunk.statuses {
        observer.on_status_update(status);
    }

    if !chunk.text.is_empty() {
        observer.on_data_received(&chunk.text);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::{LinkEvent, event_channel};
    use brewlink_core::MachineStatus;
    use tokio::io::AsyncWriteExt;

    fn frame(code: i64) -> String {
        let status = MachineStatus {
            error_code: code,
            firmware_version: "FW".into(),
            ..Default::default()
        };
        brewlink_protocol::encode_status_frame(&status, "0")
    }

    #[tokio::test]
    async fn test_statuses_before_data() {
        let (host, mut device) = tokio::io::duplex(1024);
        let (forwarder, mut events) = event_channel();
        let handle = ReadLoopHandle::spawn(host, &BufferSettings::default(), Arc::new(forwarder));

        let chunk = format!("{}{}", frame(1), frame(2));
        device.write_all(chunk.as_bytes()).await.unwrap();

        let first = events.recv().await.unwrap();
        let second = events.recv().await.unwrap();
        let third = events.recv().await.unwrap();
        assert!(matches!(first, LinkEvent::StatusUpdate(s) if s.error_code == 1));
        assert!(matches!(second, LinkEvent::StatusUpdate(s) if s.error_code == 2));
        assert_eq!(third, LinkEvent::DataReceived(chunk));

        let outcome = handle.stop().await.unwrap();
        assert_eq!(outcome.reason, StopReason::Cancelled);
        assert!(events.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_end_of_stream_reported() {
        let (host, device) = tokio::io::duplex(64);
        let (forwarder, mut events) = event_channel();
        let handle = ReadLoopHandle::spawn(host, &BufferSettings::default(), Arc::new(forwarder));

        drop(device);
        assert_eq!(
            events.recv().await.unwrap(),
            LinkEvent::ReadStopped(StopReason::EndOfStream)
        );
        assert!(!handle.is_reading());

        let outcome = handle.stop().await.unwrap();
        assert_eq!(outcome.reason, StopReason::EndOfStream);
    }

    #[tokio::test]
    async fn test_dangling_character_flushed_at_end_of_stream() {
        let (host, mut device) = tokio::io::duplex(64);
        let (forwarder, mut events) = event_channel();
        let handle = ReadLoopHandle::spawn(host, &BufferSettings::default(), Arc::new(forwarder));

        device.write_all(&[0xE2, 0x82]).await.unwrap();
        drop(device);

        assert_eq!(
            events.recv().await.unwrap(),
            LinkEvent::DataReceived("\u{FFFD}".into())
        );
        assert_eq!(
            events.recv().await.unwrap(),
            LinkEvent::ReadStopped(StopReason::EndOfStream)
        );
        handle.stop().await.unwrap();
    }

    /// Reader that fails every read.
    struct FailingReader;

    impl AsyncRead for FailingReader {
        fn poll_read(
            self: std::pin::Pin<&mut Self>,
            _cx: &mut std::task::Context<'_>,
            _buf: &mut tokio::io::ReadBuf<'_>,
        ) -> std::task::Poll<std::io::Result<()>> {
            std::task::Poll::Ready(Err(std::io::ErrorKind::BrokenPipe.into()))
        }
    }

    #[tokio::test]
    async fn test_read_error_reported() {
        let (forwarder, mut events) = event_channel();
        let handle =
            ReadLoopHandle::spawn(FailingReader, &BufferSettings::default(), Arc::new(forwarder));

        let event = events.recv().await.unwrap();
        assert!(matches!(event, LinkEvent::ReadStopped(StopReason::ReadError(_))));
        assert!(!handle.is_reading());

        let outcome = handle.stop().await.unwrap();
        assert!(matches!(outcome.reason, StopReason::ReadError(_)));
    }

    #[tokio::test]
    async fn test_stop_interrupts_pending_read() {
        let (host, _device) = tokio::io::duplex(64);
        let (forwarder, mut events) = event_channel();
        let handle = ReadLoopHandle::spawn(host, &BufferSettings::default(), Arc::new(forwarder));
        assert!(handle.is_reading());

        let outcome = handle.stop().await.unwrap();
        assert_eq!(outcome.reason, StopReason::Cancelled);
        assert!(events.try_recv().is_err());
    }
}
