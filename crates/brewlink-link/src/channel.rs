//! Byte channel abstraction.
//!
//! A [`Channel`] hands out one duplex stream per connection. The controller
//! splits it into a read half (moved into the read task) and a write half
//! (moved into the [`CommandSender`](crate::CommandSender)), so each side has
//! exactly one owner for the connection's lifetime. On disconnect the halves
//! are reunited and given back to [`Channel::close`].

use std::future::Future;

use tokio::io::{AsyncRead, AsyncWrite};

use crate::error::LinkError;

/// Source of a duplex byte stream to the controller.
///
/// Methods return `Send` futures so a controller can live on a spawned task.
pub trait Channel: Send + 'static {
    type Stream: AsyncRead + AsyncWrite + Send + Unpin + 'static;

    /// Open the underlying device and return its stream.
    fn open(&mut self) -> impl Future<Output = Result<Self::Stream, LinkError>> + Send;

    /// Release the device.
    ///
    /// Called exactly once per successful [`open`](Channel::open). `stream` is
    /// `None` if the halves could not be reunited (the read task died); the
    /// halves are already dropped in that case.
    fn close(
        &mut self,
        stream: Option<Self::Stream>,
    ) -> impl Future<Output = Result<(), LinkError>> + Send;

    /// Human-readable identity, e.g. `VID:0403 PID:6001` or
    /// `Generic Serial Device`.
    fn device_info(&self) -> String;
}
