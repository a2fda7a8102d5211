//! Periodic telemetry polling.
//!
//! Polling is active exactly when the link is connected *and* auto-poll is
//! enabled. Callers hand both inputs to [`PollScheduler::apply`] after every
//! change; the scheduler starts or stops its single timer task to match.
//! Applying the same inputs twice is a no-op, so there is never more than
//! one timer per scheduler.

use std::time::Duration;

use tokio::io::AsyncWrite;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use brewlink_protocol::Command;

use crate::sender::CommandSender;

#[derive(Debug)]
struct PollTask {
    token: CancellationToken,
    handle: JoinHandle<()>,
}

/// Owner of the poll timer task.
#[derive(Debug)]
pub struct PollScheduler {
    interval: Duration,
    task: Option<PollTask>,
}

impl PollScheduler {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            task: None,
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// True while the timer task is running.
    pub fn is_running(&self) -> bool {
        self.task.is_some()
    }

    /// Reconcile the timer with `connected && auto_poll`.
    ///
    /// Returns whether polling is active afterwards.
    pub async fn apply<W>(
        &mut self,
        connected: bool,
        auto_poll: bool,
        sender: Option<&CommandSender<W>>,
    ) -> bool
    where
        W: AsyncWrite + Unpin + Send + 'static,
    {
        match (connected && auto_poll, sender) {
            (true, Some(sender)) => {
                if self.task.is_none() {
                    self.start(sender.clone());
                }
                true
            }
            _ => {
                self.stop().await;
                false
            }
        }
    }

    fn start<W>(&mut self, sender: CommandSender<W>)
    where
        W: AsyncWrite + Unpin + Send + 'static,
    {
        let token = CancellationToken::new();
        let period = self.interval;
        let cancelled = token.clone();

        let handle = tokio::spawn(async move {
            // First poll one period after start, like a plain repeating timer.
            let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    biased;
                    () = cancelled.cancelled() => break,
                    _ = ticker.tick() => {}
                }

                // A device that stops draining can stall the write; cancel
                // must still end the task and drop the writer lock.
                let result = tokio::select! {
                    biased;
                    () = cancelled.cancelled() => break,
                    result = sender.send(&Command::ReadStatus) => result,
                };
                if let Err(e) = result {
                    warn!(error = %e, "Poll request failed");
                }
            }
        });

        debug!(interval_ms = period.as_millis() as u64, "Polling started");
        self.task = Some(PollTask { token, handle });
    }

    /// Stop the timer and wait for its task to exit.
    pub async fn stop(&mut self) {
        let Some(task) = self.task.take() else {
            return;
        };

        task.token.cancel();
        if let Err(e) = task.handle.await {
            warn!(error = %e, "Poll task ended abnormally");
        }
        debug!("Polling stopped");
    }
}

impl Drop for PollScheduler {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.token.cancel();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::io::{AsyncReadExt, DuplexStream};

    /// Count poll literals arriving at the far end of a pipe.
    fn count_polls(mut device: DuplexStream) -> Arc<AtomicUsize> {
        let count = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&count);
        tokio::spawn(async move {
            let mut seen = String::new();
            let mut buf = [0u8; 256];
            while let Ok(n) = device.read(&mut buf).await {
                if n == 0 {
                    break;
                }
                seen.push_str(std::str::from_utf8(&buf[..n]).unwrap());
                counter.store(seen.matches("102@READ@ALL#43433").count(), Ordering::SeqCst);
            }
        });
        count
    }

    #[tokio::test(start_paused = true)]
    async fn test_polls_at_interval() {
        let (host, device) = tokio::io::duplex(4096);
        let polls = count_polls(device);
        let sender = CommandSender::new(host);
        let mut scheduler = PollScheduler::new(Duration::from_millis(200));

        assert!(scheduler.apply(true, true, Some(&sender)).await);
        tokio::time::sleep(Duration::from_millis(1_100)).await;
        tokio::time::sleep(Duration::from_millis(10)).await;

        assert_eq!(polls.load(Ordering::SeqCst), 5);
        scheduler.stop().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_apply_is_idempotent() {
        let (host, device) = tokio::io::duplex(4096);
        let polls = count_polls(device);
        let sender = CommandSender::new(host);
        let mut scheduler = PollScheduler::new(Duration::from_millis(200));

        scheduler.apply(true, true, Some(&sender)).await;
        scheduler.apply(true, true, Some(&sender)).await;
        scheduler.apply(true, true, Some(&sender)).await;
        tokio::time::sleep(Duration::from_millis(1_100)).await;
        tokio::time::sleep(Duration::from_millis(10)).await;

        assert_eq!(polls.load(Ordering::SeqCst), 5);
    }

    #[tokio::test(start_paused = true)]
    async fn test_either_input_false_stops() {
        let (host, _device) = tokio::io::duplex(4096);
        let sender = CommandSender::new(host);
        let mut scheduler = PollScheduler::new(Duration::from_millis(200));

        assert!(scheduler.apply(true, true, Some(&sender)).await);
        assert!(!scheduler.apply(true, false, Some(&sender)).await);
        assert!(!scheduler.is_running());

        assert!(scheduler.apply(true, true, Some(&sender)).await);
        assert!(!scheduler.apply(false, true, Some(&sender)).await);
        assert!(!scheduler.is_running());
    }

    #[tokio::test]
    async fn test_no_sender_never_starts() {
        let mut scheduler = PollScheduler::new(Duration::from_millis(200));
        let none: Option<&CommandSender<DuplexStream>> = None;
        assert!(!scheduler.apply(true, true, none).await);
        assert!(!scheduler.is_running());
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_writes_keep_polling() {
        let (host, device) = tokio::io::duplex(64);
        drop(device);
        let sender = CommandSender::new(host);
        let mut scheduler = PollScheduler::new(Duration::from_millis(200));

        scheduler.apply(true, true, Some(&sender)).await;
        tokio::time::sleep(Duration::from_millis(500)).await;
        assert!(scheduler.is_running());
        scheduler.stop().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_interrupts_stalled_write() {
        // Room for less than one poll request; nobody reads the far end.
        let (host, _device) = tokio::io::duplex(8);
        let sender = CommandSender::new(host);
        let mut scheduler = PollScheduler::new(Duration::from_millis(200));

        scheduler.apply(true, true, Some(&sender)).await;
        tokio::time::sleep(Duration::from_millis(1_000)).await;

        tokio::time::timeout(Duration::from_secs(5), scheduler.stop())
            .await
            .expect("stop waited on a stalled write");
        assert!(!scheduler.is_running());
        assert!(sender.release().await.is_some());
    }
}
