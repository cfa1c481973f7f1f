use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::features::posts::models::Post;
use crate::features::wall::services::{Banner, BannerKind};
use crate::shared::time_format::format_relative;

/// A post as shown on the wall
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PostResponseDto {
    /// Backend-assigned id
    pub id: String,
    pub user_id: Option<String>,
    /// Message text, may be empty for image-only posts
    pub body: String,
    /// Public URL of the attached image
    pub image_url: Option<String>,
    pub created_at: DateTime<Utc>,
    /// Human readable age, e.g. "5m ago"
    #[schema(example = "5m ago")]
    pub relative_time: String,
}

impl PostResponseDto {
    pub fn from_post(post: Post, now: DateTime<Utc>) -> Self {
        let relative_time = format_relative(post.created_at, now);
        Self {
            id: post.id,
            user_id: post.user_id,
            body: post.body,
            image_url: post.image_url,
            created_at: post.created_at,
            relative_time,
        }
    }
}

/// Error banner shown above the feed
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct BannerDto {
    /// "configuration" or "operation"
    #[schema(example = "operation")]
    pub kind: String,
    pub message: String,
}

impl From<Banner> for BannerDto {
    fn from(banner: Banner) -> Self {
        let kind = match banner.kind {
            BannerKind::Configuration => "configuration",
            BannerKind::Operation => "operation",
        };
        Self {
            kind: kind.to_string(),
            message: banner.message,
        }
    }
}

/// Everything needed to render the wall
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct WallResponseDto {
    /// Whether backend credentials are present
    pub configured: bool,
    /// Newest first
    pub posts: Vec<PostResponseDto>,
    pub banner: Option<BannerDto>,
    /// Set when there is nothing to show
    #[schema(example = "No posts yet.")]
    pub empty_message: Option<String>,
}

/// Query parameters for reading the wall
#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct WallQuery {
    /// Reload from the backend before answering
    #[serde(default)]
    pub refresh: bool,
}

/// Create post request DTO for OpenAPI documentation
/// Note: the handler reads the form with axum's Multipart extractor directly.
#[derive(Debug, ToSchema)]
#[allow(dead_code)]
pub struct CreatePostDto {
    /// Message text, up to 280 characters
    #[schema(example = "Hello wall!")]
    pub body: Option<String>,
    /// Optional image (jpg, jpeg, png, gif, webp; max 5MB)
    #[schema(format = Binary, content_media_type = "application/octet-stream")]
    pub image: Option<String>,
}
