use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Duration, TimeZone, Utc};
use tokio::sync::{mpsc, Notify};

use crate::core::config::WallConfig;
use crate::core::error::{AppError, Result};
use crate::features::posts::models::{NewPost, Post};
use crate::features::posts::PostRepository;
use crate::modules::backend::{BackendClient, ChannelHandle, ChannelSubscription};

pub const TEST_BASE_URL: &str = "https://test.supabase.co";

/// Fixed instant posts created by [`InMemoryBackend`] count from
pub fn test_epoch() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 10, 16, 12, 0, 0).unwrap()
}

pub fn sample_post(id: &str, body: &str, created_at: DateTime<Utc>) -> Post {
    Post {
        id: id.to_string(),
        user_id: None,
        body: body.to_string(),
        image_url: None,
        created_at,
    }
}

/// Pauses the next `list_posts` after it has read the rows
struct ListGate {
    entered: Arc<Notify>,
    release: Arc<Notify>,
}

/// Backend double that keeps rows and objects in memory and delivers
/// inserts to open subscriptions, like the change feed would.
#[derive(Default)]
pub struct InMemoryBackend {
    posts: Mutex<Vec<Post>>,
    objects: Mutex<HashMap<String, Vec<u8>>>,
    subscribers: Mutex<Vec<mpsc::Sender<Post>>>,
    next_id: AtomicU64,
    failure: Mutex<Option<String>>,
    list_failure: Mutex<Option<String>>,
    list_gate: Mutex<Option<ListGate>>,
    fail_remove_channel: AtomicBool,
    removed_channels: AtomicU64,
}

#[allow(dead_code)]
impl InMemoryBackend {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Make list/insert/upload fail with a transient error
    pub fn fail_with(&self, message: &str) {
        *self.failure.lock().unwrap() = Some(message.to_string());
    }

    /// Make only `list_posts` fail
    pub fn fail_list_with(&self, message: &str) {
        *self.list_failure.lock().unwrap() = Some(message.to_string());
    }

    pub fn recover(&self) {
        *self.failure.lock().unwrap() = None;
        *self.list_failure.lock().unwrap() = None;
    }

    /// Hold the next `list_posts` between reading the rows and returning
    /// them. Returns (entered, release): `entered` fires once the rows are
    /// read, and the call returns after `release` is notified.
    pub fn hold_list(&self) -> (Arc<Notify>, Arc<Notify>) {
        let entered = Arc::new(Notify::new());
        let release = Arc::new(Notify::new());
        *self.list_gate.lock().unwrap() = Some(ListGate {
            entered: entered.clone(),
            release: release.clone(),
        });
        (entered, release)
    }

    pub fn fail_remove_channel(&self) {
        self.fail_remove_channel.store(true, Ordering::SeqCst);
    }

    pub fn removed_channels(&self) -> u64 {
        self.removed_channels.load(Ordering::SeqCst)
    }

    pub fn object(&self, path: &str) -> Option<Vec<u8>> {
        self.objects.lock().unwrap().get(path).cloned()
    }

    pub fn object_paths(&self) -> Vec<String> {
        self.objects.lock().unwrap().keys().cloned().collect()
    }

    pub fn row_count(&self) -> usize {
        self.posts.lock().unwrap().len()
    }

    /// Store a row directly, as if another client had inserted it
    pub async fn insert_external(&self, body: &str) -> Post {
        let post = self.store(NewPost {
            body: body.to_string(),
            image_url: None,
        });
        self.notify(&post).await;
        post
    }

    /// Deliver a notification without storing anything
    pub async fn notify(&self, post: &Post) {
        let subscribers: Vec<_> = self.subscribers.lock().unwrap().clone();
        for subscriber in subscribers {
            let _ = subscriber.send(post.clone()).await;
        }
    }

    fn store(&self, new_post: NewPost) -> Post {
        let n = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        let post = Post {
            id: format!("post-{}", n),
            user_id: None,
            body: new_post.body,
            image_url: new_post.image_url,
            created_at: test_epoch() + Duration::seconds(n as i64),
        };
        self.posts.lock().unwrap().push(post.clone());
        post
    }

    fn check_failure(&self) -> Result<()> {
        match self.failure.lock().unwrap().as_ref() {
            Some(message) => Err(AppError::ExternalServiceError(message.clone())),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl BackendClient for InMemoryBackend {
    fn is_configured(&self) -> bool {
        true
    }

    async fn list_posts(&self, _table: &str) -> Result<Vec<Post>> {
        self.check_failure()?;
        let list_failure = self.list_failure.lock().unwrap().clone();
        if let Some(message) = list_failure {
            return Err(AppError::ExternalServiceError(message));
        }
        let mut posts = self.posts.lock().unwrap().clone();
        posts.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        let gate = self.list_gate.lock().unwrap().take();
        if let Some(gate) = gate {
            gate.entered.notify_one();
            gate.release.notified().await;
        }
        Ok(posts)
    }

    async fn insert_post(&self, _table: &str, post: &NewPost) -> Result<Vec<Post>> {
        self.check_failure()?;
        let stored = self.store(post.clone());
        self.notify(&stored).await;
        Ok(vec![stored])
    }

    async fn upload_object(
        &self,
        _bucket: &str,
        path: &str,
        data: Vec<u8>,
        _content_type: &str,
    ) -> Result<String> {
        self.check_failure()?;
        self.objects
            .lock()
            .unwrap()
            .insert(path.to_string(), data);
        Ok(path.to_string())
    }

    fn public_url(&self, bucket: &str, path: &str) -> String {
        format!("{}/storage/v1/object/public/{}/{}", TEST_BASE_URL, bucket, path)
    }

    async fn subscribe_inserts(&self, channel: &str, _table: &str) -> Result<ChannelSubscription> {
        let (tx, rx) = mpsc::channel(16);
        self.subscribers.lock().unwrap().push(tx);
        Ok(ChannelSubscription {
            handle: ChannelHandle::detached(channel),
            events: rx,
        })
    }

    async fn remove_channel(&self, _handle: ChannelHandle) -> Result<()> {
        self.removed_channels.fetch_add(1, Ordering::SeqCst);
        self.subscribers.lock().unwrap().clear();
        if self.fail_remove_channel.load(Ordering::SeqCst) {
            return Err(AppError::Realtime("socket already closed".to_string()));
        }
        Ok(())
    }
}

pub fn repository_for(backend: Arc<dyn BackendClient>) -> Arc<PostRepository> {
    Arc::new(PostRepository::new(backend, &WallConfig::default()))
}
