//! Backend module: the hosted service that stores posts and images and
//! pushes change notifications.
//!
//! [`BackendClient`] is the capability set the rest of the application
//! depends on. [`connect`] picks the implementation once at startup:
//! [`SupabaseClient`] when the URL and anon key are configured,
//! [`DisabledClient`] otherwise.

mod channel;
mod disabled_client;
mod realtime;
mod supabase_client;

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{info, warn};

use crate::core::config::SupabaseConfig;
use crate::core::error::Result;
use crate::features::posts::models::{NewPost, Post};

pub use channel::{ChannelHandle, ChannelSubscription};
pub use disabled_client::DisabledClient;
pub use supabase_client::SupabaseClient;

#[async_trait]
pub trait BackendClient: Send + Sync {
    /// Whether this client talks to a real backend
    fn is_configured(&self) -> bool;

    /// All rows of `table`, newest `created_at` first
    async fn list_posts(&self, table: &str) -> Result<Vec<Post>>;

    /// Insert one row and return the inserted representation
    async fn insert_post(&self, table: &str, post: &NewPost) -> Result<Vec<Post>>;

    /// Store an object, returning the stored path
    async fn upload_object(
        &self,
        bucket: &str,
        path: &str,
        data: Vec<u8>,
        content_type: &str,
    ) -> Result<String>;

    /// Public URL of a stored object; empty when the backend is disabled
    fn public_url(&self, bucket: &str, path: &str) -> String;

    /// Open `channel` and listen for inserts into `table`
    async fn subscribe_inserts(&self, channel: &str, table: &str)
        -> Result<ChannelSubscription>;

    /// Close a channel opened by [`BackendClient::subscribe_inserts`]
    async fn remove_channel(&self, handle: ChannelHandle) -> Result<()>;
}

/// Build the backend client for this process.
///
/// Missing configuration or a failed construction never aborts startup:
/// the condition is logged and the disabled client is returned, so every
/// operation reports "not configured" instead.
pub fn connect(config: &SupabaseConfig) -> Arc<dyn BackendClient> {
    let missing = config.missing_settings();
    if !missing.is_empty() {
        warn!(
            "Supabase configuration missing ({}); running with the disabled backend",
            missing.join(", ")
        );
        return Arc::new(DisabledClient);
    }

    match SupabaseClient::new(config) {
        Ok(client) => {
            info!("Supabase client initialized for {}", client.base_url());
            Arc::new(client)
        }
        Err(e) => {
            warn!(
                "Failed to initialize Supabase client: {}; running with the disabled backend",
                e
            );
            Arc::new(DisabledClient)
        }
    }
}
