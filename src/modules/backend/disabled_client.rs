use async_trait::async_trait;
use tracing::debug;

use super::{BackendClient, ChannelHandle, ChannelSubscription};
use crate::core::error::{AppError, Result};
use crate::features::posts::models::{NewPost, Post};

/// Stand-in used when the backend is not configured.
///
/// Every call resolves immediately; reads and writes fail with
/// [`AppError::NotConfigured`], subscriptions are already closed.
#[derive(Debug, Default, Clone, Copy)]
pub struct DisabledClient;

#[async_trait]
impl BackendClient for DisabledClient {
    fn is_configured(&self) -> bool {
        false
    }

    async fn list_posts(&self, _table: &str) -> Result<Vec<Post>> {
        Err(AppError::NotConfigured)
    }

    async fn insert_post(&self, _table: &str, _post: &NewPost) -> Result<Vec<Post>> {
        Err(AppError::NotConfigured)
    }

    async fn upload_object(
        &self,
        _bucket: &str,
        _path: &str,
        _data: Vec<u8>,
        _content_type: &str,
    ) -> Result<String> {
        Err(AppError::NotConfigured)
    }

    fn public_url(&self, _bucket: &str, _path: &str) -> String {
        String::new()
    }

    async fn subscribe_inserts(
        &self,
        channel: &str,
        _table: &str,
    ) -> Result<ChannelSubscription> {
        debug!("Backend disabled; channel '{}' will not receive events", channel);
        Ok(ChannelSubscription::closed(channel))
    }

    async fn remove_channel(&self, _handle: ChannelHandle) -> Result<()> {
        Ok(())
    }
}
