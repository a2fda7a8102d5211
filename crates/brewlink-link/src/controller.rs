//! Connection lifecycle.
//!
//! [`ConnectionController`] owns the channel and, while connected, one
//! session: the read task plus the shared write handle. Every state change
//! goes through `&mut self`, so connect and disconnect never interleave.
//!
//! Disconnect order:
//!
//! 1. stop polling (the timer task has exited when this returns)
//! 2. cancel the read task and wait for it to hand back the read half
//! 3. release the write half, reunite both, close the channel once
//! 4. reset auto-poll, report `on_connection_changed(false, "")`
//!
//! A read loop that ends on its own (end of stream, read error) only marks
//! itself as stopped; the controller tears the session down on its next
//! operation, or when [`reconcile`](ConnectionController::reconcile) is
//! called.

use std::sync::Arc;

use tokio::io::{ReadHalf, WriteHalf};
use tracing::{debug, error, info, warn};

use brewlink_core::ConnectionState;
use brewlink_protocol::Command;

use crate::channel::Channel;
use crate::config::LinkConfig;
use crate::error::LinkError;
use crate::events::{LinkObserver, NoopObserver};
use crate::poll::PollScheduler;
use crate::reader::ReadLoopHandle;
use crate::sender::CommandSender;

struct Session<S> {
    reader: ReadLoopHandle<ReadHalf<S>>,
    sender: CommandSender<WriteHalf<S>>,
}

/// Host side of the link.
pub struct ConnectionController<C: Channel> {
    channel: C,
    config: LinkConfig,
    observer: Arc<dyn LinkObserver>,
    state: ConnectionState,
    auto_poll: bool,
    device_info: Option<String>,
    session: Option<Session<C::Stream>>,
    poller: PollScheduler,
}

impl<C: Channel> ConnectionController<C> {
    /// Controller with a no-op observer.
    pub fn new(channel: C, config: LinkConfig) -> Self {
        Self::with_observer(channel, config, Arc::new(NoopObserver))
    }

    pub fn with_observer(channel: C, config: LinkConfig, observer: Arc<dyn LinkObserver>) -> Self {
        let poller = PollScheduler::new(config.poll.interval());
        let auto_poll = config.poll.auto_poll;
        Self {
            channel,
            config,
            observer,
            state: ConnectionState::Disconnected,
            auto_poll,
            device_info: None,
            session: None,
            poller,
        }
    }

    pub fn state(&self) -> ConnectionState {
        match (&self.state, &self.session) {
            (ConnectionState::Connected { .. }, Some(session)) => ConnectionState::Connected {
                reading: session.reader.is_reading(),
            },
            (state, _) => *state,
        }
    }

    pub fn is_connected(&self) -> bool {
        self.session.is_some()
    }

    pub fn is_polling(&self) -> bool {
        self.poller.is_running()
    }

    pub fn auto_poll(&self) -> bool {
        self.auto_poll
    }

    /// Identity reported by the channel at connect time.
    pub fn device_info(&self) -> Option<&str> {
        self.device_info.as_deref()
    }

    pub fn config(&self) -> &LinkConfig {
        &self.config
    }

    pub fn channel(&self) -> &C {
        &self.channel
    }

    /// Open the channel, start the read task and, if auto-poll is enabled,
    /// the poll timer.
    ///
    /// # Errors
    ///
    /// - `LinkError::AlreadyConnected` if a session is open
    /// - whatever the channel's `open` returns; the controller stays
    ///   disconnected and no notification is sent
    pub async fn connect(&mut self) -> Result<(), LinkError> {
        self.reconcile().await;
        if self.session.is_some() {
            return Err(LinkError::AlreadyConnected);
        }

        self.state = ConnectionState::Connecting;
        let stream = match self.channel.open().await {
            Ok(stream) => stream,
            Err(e) => {
                error!(error = %e, "Failed to connect");
                self.state = ConnectionState::Disconnected;
                return Err(e);
            }
        };

        let (read_half, write_half) = tokio::io::split(stream);
        let reader =
            ReadLoopHandle::spawn(read_half, &self.config.buffers, Arc::clone(&self.observer));
        let sender = CommandSender::new(write_half);

        let device_info = self.channel.device_info();
        self.session = Some(Session { reader, sender });
        self.state = ConnectionState::Connected { reading: true };
        self.device_info = Some(device_info.clone());

        info!(
            device = %device_info,
            "Connected ({}, {})",
            self.config.serial.baud_rate,
            self.config.serial.frame_format()
        );
        self.observer.on_connection_changed(true, &device_info);

        self.apply_polling().await;
        Ok(())
    }

    /// Tear the session down. A no-op when already disconnected; never fails.
    pub async fn disconnect(&mut self) {
        let Some(session) = self.session.take() else {
            return;
        };
        self.state = ConnectionState::Disconnecting;

        self.poller.stop().await;

        let read_half = match session.reader.stop().await {
            Ok(outcome) => {
                debug!(reason = %outcome.reason, "Read task joined");
                Some(outcome.reader)
            }
            Err(e) => {
                warn!(error = %e, "Read task failed; closing without the read half");
                None
            }
        };
        let write_half = session.sender.release().await;

        let stream = match (read_half, write_half) {
            (Some(read_half), Some(write_half)) => Some(read_half.unsplit(write_half)),
            _ => None,
        };

        if let Err(e) = self.channel.close(stream).await {
            warn!(error = %e, "Error while closing channel");
        }

        self.auto_poll = false;
        self.device_info = None;
        self.state = ConnectionState::Disconnected;

        info!("Disconnected");
        self.observer.on_connection_changed(false, "");
    }

    /// Disconnect if the read loop has ended on its own.
    ///
    /// Returns true if a stale session was torn down.
    pub async fn reconcile(&mut self) -> bool {
        let stale = self
            .session
            .as_ref()
            .is_some_and(|session| !session.reader.is_reading());

        if stale {
            warn!("Read loop has stopped; closing connection");
            self.disconnect().await;
        }
        stale
    }

    /// Enable or disable periodic polling. Takes effect immediately while
    /// connected and never touches the connection itself.
    pub async fn set_auto_poll(&mut self, enabled: bool) {
        self.auto_poll = enabled;
        debug!(enabled, "Auto-poll changed");
        self.apply_polling().await;
    }

    pub async fn start_extraction(&mut self) -> Result<(), LinkError> {
        self.send(Command::StartExtraction).await
    }

    pub async fn stop_extraction(&mut self) -> Result<(), LinkError> {
        self.send(Command::StopExtraction).await
    }

    /// Send operator text followed by a newline.
    ///
    /// # Errors
    ///
    /// `LinkError::EmptyCommand` for blank input, otherwise as [`send`].
    ///
    /// [`send`]: ConnectionController::send
    pub async fn send_raw(&mut self, text: &str) -> Result<(), LinkError> {
        if text.trim().is_empty() {
            return Err(LinkError::EmptyCommand);
        }
        self.send(Command::Raw(text.to_string())).await
    }

    /// Send one command.
    ///
    /// # Errors
    ///
    /// - `LinkError::NotConnected` without a session
    /// - `LinkError::ConnectionLost` if the read loop had stopped (the
    ///   session is torn down first)
    /// - `LinkError::Io` if the write fails
    pub async fn send(&mut self, command: Command) -> Result<(), LinkError> {
        if self.reconcile().await {
            return Err(LinkError::ConnectionLost(format!(
                "read loop stopped before sending {command}"
            )));
        }

        let session = self.session.as_ref().ok_or(LinkError::NotConnected)?;
        session.sender.send(&command).await
    }

    async fn apply_polling(&mut self) {
        let sender = self.session.as_ref().map(|session| &session.sender);
        self.poller
            .apply(self.session.is_some(), self.auto_poll, sender)
            .await;
    }
}
