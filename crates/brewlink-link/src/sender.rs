//! Write path to the controller.
//!
//! The write half of a connection lives inside a [`CommandSender`]. Clones
//! share it, so the poll task and operator commands write through the same
//! handle; an async mutex keeps each command's bytes contiguous on the wire.
//! Sends are fire and forget: a failed write is logged and returned, never
//! retried, and does not change connection state.

use std::sync::Arc;

use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::Mutex;
use tracing::{debug, trace, warn};

use brewlink_protocol::Command;

use crate::error::LinkError;

/// Shared handle to a connection's write half.
#[derive(Debug)]
pub struct CommandSender<W> {
    writer: Arc<Mutex<Option<W>>>,
}

impl<W> Clone for CommandSender<W> {
    fn clone(&self) -> Self {
        Self {
            writer: Arc::clone(&self.writer),
        }
    }
}

impl<W> CommandSender<W>
where
    W: AsyncWrite + Unpin + Send,
{
    pub fn new(writer: W) -> Self {
        Self {
            writer: Arc::new(Mutex::new(Some(writer))),
        }
    }

    /// Write one command and flush it.
    ///
    /// # Errors
    ///
    /// - `LinkError::NotConnected` once the writer has been released
    /// - `LinkError::Io` if the write or flush fails
    pub async fn send(&self, command: &Command) -> Result<(), LinkError> {
        let mut guard = self.writer.lock().await;
        let writer = guard.as_mut().ok_or(LinkError::NotConnected)?;
        let bytes = command.encode();

        if command.is_poll() {
            trace!(bytes = bytes.len(), "Sending poll request");
        } else {
            debug!(%command, bytes = bytes.len(), "Sending command");
        }

        writer.write_all(&bytes).await.map_err(|e| {
            warn!(%command, error = %e, "Failed to write command");
            LinkError::Io(e)
        })?;

        writer.flush().await.map_err(|e| {
            warn!(%command, error = %e, "Failed to flush command");
            LinkError::Io(e)
        })?;

        Ok(())
    }

    /// Take the writer out, leaving every clone detached.
    ///
    /// Waits for an in-flight send to finish. Returns `None` if already
    /// released.
    pub async fn release(&self) -> Option<W> {
        self.writer.lock().await.take()
    }

    #[cfg(test)]
    async fn is_attached(&self) -> bool {
        self.writer.lock().await.is_some()
    }
}
