//! Supabase client over plain HTTP.
//!
//! Rows go through PostgREST (`/rest/v1`), objects through the Storage API
//! (`/storage/v1`). Change notifications use the Realtime websocket, see
//! [`super::realtime`].

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Client, Response, Url};
use serde::Deserialize;
use tracing::debug;

use super::{realtime, BackendClient, ChannelHandle, ChannelSubscription};
use crate::core::config::SupabaseConfig;
use crate::core::error::{AppError, Result};
use crate::features::posts::models::{NewPost, Post};

/// Error body shared by PostgREST and the Storage API
#[derive(Debug, Deserialize)]
struct SupabaseErrorBody {
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

/// Response of a successful object upload
#[derive(Debug, Deserialize)]
struct UploadResponse {
    #[serde(rename = "Key")]
    key: Option<String>,
}

pub struct SupabaseClient {
    /// Project URL without a trailing slash
    base_url: String,
    realtime_url: Url,
    http_client: Client,
}

impl SupabaseClient {
    pub fn new(config: &SupabaseConfig) -> Result<Self> {
        let (url, anon_key) = config.credentials().ok_or(AppError::NotConfigured)?;

        let parsed = Url::parse(url)
            .map_err(|e| AppError::Internal(format!("Invalid Supabase URL '{}': {}", url, e)))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(AppError::Internal(format!(
                "Supabase URL must use http or https, got '{}'",
                parsed.scheme()
            )));
        }

        let mut headers = HeaderMap::new();
        headers.insert(
            "apikey",
            HeaderValue::from_str(anon_key)
                .map_err(|e| AppError::Internal(format!("Invalid Supabase key: {}", e)))?,
        );
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {}", anon_key))
                .map_err(|e| AppError::Internal(format!("Invalid Supabase key: {}", e)))?,
        );

        let http_client = Client::builder()
            .timeout(config.request_timeout)
            .default_headers(headers)
            .build()
            .map_err(|e| AppError::Internal(format!("Failed to create HTTP client: {}", e)))?;

        let realtime_url = realtime::websocket_url(&parsed, anon_key)?;

        Ok(Self {
            base_url: url.trim_end_matches('/').to_string(),
            realtime_url,
            http_client,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn rest_url(&self, table: &str) -> String {
        format!("{}/rest/v1/{}", self.base_url, urlencoding::encode(table))
    }

    fn object_url(&self, bucket: &str, path: &str) -> String {
        format!(
            "{}/storage/v1/object/{}/{}",
            self.base_url,
            urlencoding::encode(bucket),
            encode_object_path(path)
        )
    }

    /// Turn a non-2xx response into an error carrying the backend's message
    async fn error_from_response(response: Response) -> AppError {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();

        let message = serde_json::from_str::<SupabaseErrorBody>(&body)
            .ok()
            .and_then(|parsed| parsed.message.or(parsed.error))
            .unwrap_or_else(|| {
                if body.is_empty() {
                    status.to_string()
                } else {
                    body.clone()
                }
            });

        AppError::ExternalServiceError(format!("{} (HTTP {})", message, status.as_u16()))
    }
}

/// Percent-encode each segment of an object path, keeping the separators
fn encode_object_path(path: &str) -> String {
    path.split('/')
        .map(|segment| urlencoding::encode(segment).into_owned())
        .collect::<Vec<_>>()
        .join("/")
}

#[async_trait]
impl BackendClient for SupabaseClient {
    fn is_configured(&self) -> bool {
        true
    }

    async fn list_posts(&self, table: &str) -> Result<Vec<Post>> {
        let url = self.rest_url(table);
        debug!("Fetching posts from {}", url);

        let response = self
            .http_client
            .get(&url)
            .query(&[("select", "*"), ("order", "created_at.desc")])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Self::error_from_response(response).await);
        }

        let posts: Vec<Post> = response.json().await.map_err(|e| {
            AppError::ExternalServiceError(format!("Failed to parse posts: {}", e))
        })?;

        debug!("Fetched {} posts", posts.len());
        Ok(posts)
    }

    async fn insert_post(&self, table: &str, post: &NewPost) -> Result<Vec<Post>> {
        let response = self
            .http_client
            .post(self.rest_url(table))
            .header("Prefer", "return=representation")
            .json(post)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Self::error_from_response(response).await);
        }

        response.json().await.map_err(|e| {
            AppError::ExternalServiceError(format!("Failed to parse inserted post: {}", e))
        })
    }

    async fn upload_object(
        &self,
        bucket: &str,
        path: &str,
        data: Vec<u8>,
        content_type: &str,
    ) -> Result<String> {
        let size = data.len();
        let response = self
            .http_client
            .post(self.object_url(bucket, path))
            .header(CONTENT_TYPE, content_type)
            .header("cache-control", "max-age=3600")
            .header("x-upsert", "false")
            .body(data)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Self::error_from_response(response).await);
        }

        // The key is informational; the path we asked for is what we stored
        let key = response
            .json::<UploadResponse>()
            .await
            .ok()
            .and_then(|r| r.key);
        debug!(
            "Uploaded {} bytes to bucket '{}' at '{}' (key: {:?})",
            size, bucket, path, key
        );

        Ok(path.to_string())
    }

    fn public_url(&self, bucket: &str, path: &str) -> String {
        format!(
            "{}/storage/v1/object/public/{}/{}",
            self.base_url,
            urlencoding::encode(bucket),
            encode_object_path(path)
        )
    }

    async fn subscribe_inserts(&self, channel: &str, table: &str) -> Result<ChannelSubscription> {
        realtime::subscribe_inserts(&self.realtime_url, channel, table).await
    }

    async fn remove_channel(&self, handle: ChannelHandle) -> Result<()> {
        let channel = handle.channel().to_string();
        handle.close().await?;
        debug!("Removed realtime channel '{}'", channel);
        Ok(())
    }
}
