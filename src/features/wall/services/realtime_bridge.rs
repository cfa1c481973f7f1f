use std::sync::Arc;

use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::core::error::Result;
use crate::features::wall::services::WallFeed;
use crate::modules::backend::{BackendClient, ChannelHandle};

/// Outcome of [`RealtimeBridge::stop`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TeardownReport {
    NotSubscribed,
    Clean,
    /// The channel could not be removed cleanly; the bridge is unsubscribed anyway
    Failed(String),
}

enum BridgeState {
    Unsubscribed,
    Subscribed {
        handle: ChannelHandle,
        listener: JoinHandle<()>,
    },
}

/// Keeps the wall feed in step with the backend's insert notifications
pub struct RealtimeBridge {
    backend: Arc<dyn BackendClient>,
    feed: Arc<WallFeed>,
    channel: String,
    table: String,
    state: Mutex<BridgeState>,
}

impl RealtimeBridge {
    pub fn new(
        backend: Arc<dyn BackendClient>,
        feed: Arc<WallFeed>,
        channel: impl Into<String>,
        table: impl Into<String>,
    ) -> Self {
        Self {
            backend,
            feed,
            channel: channel.into(),
            table: table.into(),
            state: Mutex::new(BridgeState::Unsubscribed),
        }
    }

    pub async fn is_subscribed(&self) -> bool {
        matches!(*self.state.lock().await, BridgeState::Subscribed { .. })
    }

    /// Open the channel and start merging inserts into the feed.
    ///
    /// A second call while subscribed does nothing.
    pub async fn start(&self) -> Result<()> {
        let mut state = self.state.lock().await;
        if matches!(*state, BridgeState::Subscribed { .. }) {
            debug!("Realtime bridge for '{}' already running", self.channel);
            return Ok(());
        }

        let subscription = self
            .backend
            .subscribe_inserts(&self.channel, &self.table)
            .await?;

        let feed = Arc::clone(&self.feed);
        let channel = self.channel.clone();
        let mut events = subscription.events;
        let listener = tokio::spawn(async move {
            while let Some(post) = events.recv().await {
                let id = post.id.clone();
                if feed.merge_live(post).await {
                    debug!("Realtime insert merged into feed: id={}", id);
                } else {
                    debug!("Realtime insert already on the wall: id={}", id);
                }
            }
            debug!("Realtime event stream for '{}' ended", channel);
        });

        *state = BridgeState::Subscribed {
            handle: subscription.handle,
            listener,
        };
        info!(
            "Realtime bridge subscribed to channel '{}' (table '{}')",
            self.channel, self.table
        );
        Ok(())
    }

    /// Remove the channel, best effort. Never fails; problems are logged and
    /// reported in the returned [`TeardownReport`].
    pub async fn stop(&self) -> TeardownReport {
        let previous = std::mem::replace(&mut *self.state.lock().await, BridgeState::Unsubscribed);

        let BridgeState::Subscribed { handle, listener } = previous else {
            return TeardownReport::NotSubscribed;
        };

        let report = match self.backend.remove_channel(handle).await {
            Ok(()) => {
                info!("Realtime channel '{}' removed", self.channel);
                TeardownReport::Clean
            }
            Err(e) => {
                warn!("Error removing channel '{}': {}", self.channel, e);
                TeardownReport::Failed(e.user_message())
            }
        };

        listener.abort();
        report
    }
}
