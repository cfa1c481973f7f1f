use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{error, info};

use crate::core::error::{AppError, Result};
use crate::features::posts::models::{ImageUpload, Post};
use crate::features::posts::services::validate_content;
use crate::features::posts::PostRepository;
use crate::features::wall::dtos::{BannerDto, PostResponseDto, WallResponseDto};
use crate::features::wall::services::{Banner, BannerKind, FeedMark, WallFeed};
use crate::shared::constants::{MSG_EMPTY_WALL, MSG_NOT_CONFIGURED};

/// A submitted post form
#[derive(Debug, Default)]
pub struct PostForm {
    pub body: String,
    pub image: Option<ImageUpload>,
}

/// Controller behind the wall page: loads the feed, handles submissions and
/// builds the render model.
pub struct WallService {
    repository: Arc<PostRepository>,
    feed: Arc<WallFeed>,
}

impl WallService {
    pub fn new(repository: Arc<PostRepository>, feed: Arc<WallFeed>) -> Self {
        Self { repository, feed }
    }

    pub fn feed(&self) -> &Arc<WallFeed> {
        &self.feed
    }

    pub fn is_configured(&self) -> bool {
        self.repository.backend().is_configured()
    }

    /// Fetch all posts into the feed.
    ///
    /// Any failure empties the feed rather than leaving stale posts on
    /// screen, and sets the banner. The error is returned after it has been
    /// recorded.
    pub async fn load(&self) -> Result<usize> {
        let mark = self.feed.mark().await;
        self.refresh(mark, true).await
    }

    async fn refresh(&self, mark: FeedMark, reset_on_failure: bool) -> Result<usize> {
        match self.repository.fetch_posts().await {
            Ok(posts) => {
                let count = posts.len();
                self.feed.replace(posts, mark).await;
                self.clear_operation_banner().await;
                Ok(count)
            }
            Err(e) => {
                error!("Error fetching posts: {}", e);
                if reset_on_failure {
                    self.feed.reset().await;
                }
                self.feed.set_banner(banner_for("Failed to load posts", &e)).await;
                Err(e)
            }
        }
    }

    /// Validate, upload the image if any, insert, then refresh the feed
    pub async fn submit(&self, form: PostForm) -> Result<Post> {
        let body = form.body.trim().to_string();
        validate_content(&body, form.image.is_some())?;

        self.clear_operation_banner().await;

        let image_url = match form.image {
            Some(image) => match self.repository.upload_image(image).await {
                Ok(url) => Some(url),
                Err(e) => {
                    error!("Error uploading image: {}", e);
                    self.feed
                        .set_banner(banner_for("Failed to upload image", &e))
                        .await;
                    return Err(e);
                }
            },
            None => None,
        };

        let post = match self.repository.create_post(&body, image_url).await {
            Ok(post) => post,
            Err(e) => {
                error!("Error posting: {}", e);
                self.feed
                    .set_banner(banner_for("Failed to post message", &e))
                    .await;
                return Err(e);
            }
        };

        let mark = self.feed.mark().await;
        self.feed.merge_live(post.clone()).await;
        // A failed refresh keeps the feed as is and only sets the banner
        if let Err(e) = self.refresh(mark, false).await {
            info!("Refresh after posting failed: {}", e);
        }

        Ok(post)
    }

    /// Render model of the wall as of `now`
    pub async fn snapshot(&self, now: DateTime<Utc>) -> WallResponseDto {
        let (posts, banner) = self.feed.snapshot().await;
        let posts: Vec<PostResponseDto> = posts
            .into_iter()
            .map(|post| PostResponseDto::from_post(post, now))
            .collect();

        WallResponseDto {
            configured: self.is_configured(),
            empty_message: posts.is_empty().then(|| MSG_EMPTY_WALL.to_string()),
            banner: banner.map(BannerDto::from),
            posts,
        }
    }

    async fn clear_operation_banner(&self) {
        if let Some(banner) = self.feed.banner().await {
            if banner.kind == BannerKind::Operation {
                self.feed.clear_banner().await;
            }
        }
    }
}

/// Map an error to the banner shown for it; not-configured always gets the
/// configuration banner regardless of which action hit it
fn banner_for(action: &str, error: &AppError) -> Banner {
    if error.is_not_configured() {
        Banner::configuration(MSG_NOT_CONFIGURED)
    } else {
        Banner::operation(format!("{}: {}", action, error.user_message()))
    }
}
