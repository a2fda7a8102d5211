//! Notifications from the link to its consumers.
//!
//! The controller reports through a [`LinkObserver`]. Callbacks run on the
//! task that produced the event (the read task for statuses and data) and
//! must not block. [`EventForwarder`] turns the callbacks into a
//! [`LinkEvent`] stream for consumers that prefer `recv().await`.

use std::fmt;

use tokio::sync::mpsc;

use brewlink_core::MachineStatus;

/// Why a read loop ended.
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum StopReason {
    /// Cancelled by `disconnect`.
    Cancelled,

    /// The device closed the stream.
    EndOfStream,

    /// A read failed.
    ReadError(String),
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StopReason::Cancelled => write!(f, "cancelled"),
            StopReason::EndOfStream => write!(f, "end of stream"),
            StopReason::ReadError(e) => write!(f, "read error: {e}"),
        }
    }
}

/// Receiver of link notifications. Every method defaults to a no-op.
pub trait LinkObserver: Send + Sync + 'static {
    /// One decoded status, in arrival order. Ownership moves to the observer.
    fn on_status_update(&self, status: MachineStatus) {
        let _ = status;
    }

    /// The decoded text of one raw chunk, after its statuses were reported.
    fn on_data_received(&self, chunk: &str) {
        let _ = chunk;
    }

    /// The channel opened (`device_info` set) or closed (`device_info` empty).
    fn on_connection_changed(&self, connected: bool, device_info: &str) {
        let _ = (connected, device_info);
    }

    /// The read loop ended without being cancelled.
    fn on_read_stopped(&self, reason: &StopReason) {
        let _ = reason;
    }
}

/// Observer that ignores everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopObserver;

impl LinkObserver for NoopObserver {}

/// Events emitted by an [`EventForwarder`].
#[derive(Debug, Clone, PartialEq)]
#[non_exhaustive]
pub enum LinkEvent {
    StatusUpdate(MachineStatus),
    DataReceived(String),
    ConnectionChanged { connected: bool, device_info: String },
    ReadStopped(StopReason),
}

/// Observer that forwards every notification into an unbounded channel.
///
/// Unbounded so a slow consumer never stalls the read task; the link's own
/// poll cadence bounds the rate.
#[derive(Debug, Clone)]
pub struct EventForwarder {
    tx: mpsc::UnboundedSender<LinkEvent>,
}

/// Create a forwarder and the receiver its events arrive on.
///
/// ```
/// use brewlink_link::{LinkEvent, LinkObserver, event_channel};
///
/// let (forwarder, mut events) = event_channel();
/// forwarder.on_data_received("hello");
///
/// assert_eq!(events.try_recv().unwrap(), LinkEvent::DataReceived("hello".into()));
/// ```
pub fn event_channel() -> (EventForwarder, mpsc::UnboundedReceiver<LinkEvent>) {
    let (tx, rx) = mpsc::unbounded_channel();
    (EventForwarder { tx }, rx)
}

impl EventForwarder {
    fn forward(&self, event: LinkEvent) {
        // A dropped receiver just means nobody is listening anymore.
        let _ = self.tx.send(event);
    }
}

impl LinkObserver for EventForwarder {
    fn on_status_update(&self, status: MachineStatus) {
        self.forward(LinkEvent::StatusUpdate(status));
    }

    fn on_data_received(&self, chunk: &str) {
        self.forward(LinkEvent::DataReceived(chunk.to_string()));
    }

    fn on_connection_changed(&self, connected: bool, device_info: &str) {
        self.forward(LinkEvent::ConnectionChanged {
            connected,
            device_info: device_info.to_string(),
        });
    }

    fn on_read_stopped(&self, reason: &StopReason) {
        self.forward(LinkEvent::ReadStopped(reason.clone()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_forwarder_preserves_order() {
        let (forwarder, mut rx) = event_channel();
        forwarder.on_connection_changed(true, "VID:0403 PID:6001");
        forwarder.on_status_update(MachineStatus::default());
        forwarder.on_data_received("chunk");
        forwarder.on_read_stopped(&StopReason::EndOfStream);

        assert_eq!(
            rx.try_recv().unwrap(),
            LinkEvent::ConnectionChanged {
                connected: true,
                device_info: "VID:0403 PID:6001".into()
            }
        );
        assert_eq!(
            rx.try_recv().unwrap(),
            LinkEvent::StatusUpdate(MachineStatus::default())
        );
        assert_eq!(rx.try_recv().unwrap(), LinkEvent::DataReceived("chunk".into()));
        assert_eq!(
            rx.try_recv().unwrap(),
            LinkEvent::ReadStopped(StopReason::EndOfStream)
        );
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_forwarder_survives_dropped_receiver() {
        let (forwarder, rx) = event_channel();
        drop(rx);
        forwarder.on_data_received("ignored");
    }

    #[test]
    fn test_stop_reason_display() {
        assert_eq!(StopReason::Cancelled.to_string(), "cancelled");
        assert_eq!(
            StopReason::ReadError("broken pipe".into()).to_string(),
            "read error: broken pipe"
        );
    }
}
