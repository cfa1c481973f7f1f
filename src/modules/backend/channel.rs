use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

use crate::core::error::{AppError, Result};
use crate::features::posts::models::Post;

/// An open real-time channel delivering inserted rows.
///
/// `events` closes when the underlying connection ends; `handle` is passed
/// back to [`super::BackendClient::remove_channel`] to tear the channel down.
pub struct ChannelSubscription {
    pub handle: ChannelHandle,
    pub events: mpsc::Receiver<Post>,
}

/// Owning handle for a subscribed channel
pub struct ChannelHandle {
    channel: String,
    shutdown: Option<oneshot::Sender<()>>,
    task: Option<JoinHandle<Result<()>>>,
}

impl ChannelHandle {
    pub fn new(
        channel: impl Into<String>,
        shutdown: oneshot::Sender<()>,
        task: JoinHandle<Result<()>>,
    ) -> Self {
        Self {
            channel: channel.into(),
            shutdown: Some(shutdown),
            task: Some(task),
        }
    }

    /// A handle with no listener task behind it
    pub fn detached(channel: impl Into<String>) -> Self {
        Self {
            channel: channel.into(),
            shutdown: None,
            task: None,
        }
    }

    pub fn channel(&self) -> &str {
        &self.channel
    }

    /// Signal the listener task and wait for it to finish.
    ///
    /// Returns the task's own result, so a connection that already failed
    /// surfaces its error here.
    pub async fn close(mut self) -> Result<()> {
        if let Some(shutdown) = self.shutdown.take() {
            // The task may already be gone; that is reported by the join below
            let _ = shutdown.send(());
        }

        match self.task.take() {
            Some(task) => task.await.map_err(|e| {
                AppError::Realtime(format!(
                    "Listener for channel '{}' did not shut down cleanly: {}",
                    self.channel, e
                ))
            })?,
            None => Ok(()),
        }
    }
}

impl ChannelSubscription {
    /// A subscription whose event stream is already closed
    pub fn closed(channel: impl Into<String>) -> Self {
        let (_, events) = mpsc::channel(1);
        Self {
            handle: ChannelHandle::detached(channel),
            events,
        }
    }
}
