use std::sync::Arc;
use tracing::{debug, info};
use uuid::Uuid;

use crate::core::config::WallConfig;
use crate::core::error::{AppError, Result};
use crate::features::posts::models::{ImageUpload, NewPost, Post};
use crate::modules::backend::BackendClient;
use crate::shared::constants::MAX_BODY_CHARS;

/// Data access for posts and their images
pub struct PostRepository {
    backend: Arc<dyn BackendClient>,
    table: String,
    bucket: String,
}

impl PostRepository {
    pub fn new(backend: Arc<dyn BackendClient>, config: &WallConfig) -> Self {
        Self {
            backend,
            table: config.table.clone(),
            bucket: config.bucket.clone(),
        }
    }

    pub fn backend(&self) -> &Arc<dyn BackendClient> {
        &self.backend
    }

    /// All posts, newest first.
    ///
    /// [`AppError::NotConfigured`] is passed through untouched so callers can
    /// tell a missing configuration from a failing backend.
    pub async fn fetch_posts(&self) -> Result<Vec<Post>> {
        let mut posts = self.backend.list_posts(&self.table).await?;
        // Stable, so rows with equal timestamps keep the backend's order
        posts.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(posts)
    }

    /// Store an image under a random name and return its public URL
    pub async fn upload_image(&self, image: ImageUpload) -> Result<String> {
        let extension = image.validate()?;
        let path = object_path(&self.bucket, &extension);

        let stored = self
            .backend
            .upload_object(&self.bucket, &path, image.bytes, &image.content_type)
            .await?;
        debug!("Image '{}' stored at '{}'", image.file_name, stored);

        let url = self.backend.public_url(&self.bucket, &stored);
        if url.is_empty() {
            return Err(AppError::ExternalServiceError(format!(
                "No public URL available for '{}'",
                stored
            )));
        }

        Ok(url)
    }

    /// Insert a post with a trimmed body and an optional image URL
    pub async fn create_post(&self, body: &str, image_url: Option<String>) -> Result<Post> {
        let body = body.trim();
        validate_content(body, image_url.is_some())?;

        let new_post = NewPost {
            body: body.to_string(),
            image_url,
        };

        let inserted = self.backend.insert_post(&self.table, &new_post).await?;
        let post = inserted.into_iter().next().ok_or_else(|| {
            AppError::ExternalServiceError("Insert returned no rows".to_string())
        })?;

        info!("Post created: id={}, has_image={}", post.id, post.has_image());
        Ok(post)
    }
}

/// A post needs text or an image, and text is capped at [`MAX_BODY_CHARS`]
pub fn validate_content(trimmed_body: &str, has_image: bool) -> Result<()> {
    if trimmed_body.is_empty() && !has_image {
        return Err(AppError::Validation(
            "Write a message or attach an image".to_string(),
        ));
    }

    let length = trimmed_body.chars().count();
    if length > MAX_BODY_CHARS {
        return Err(AppError::Validation(format!(
            "Message is {} characters long; the limit is {}",
            length, MAX_BODY_CHARS
        )));
    }

    Ok(())
}

/// `<bucket>/<uuid>.<ext>`, namespaced inside the bucket by its own name
fn object_path(bucket: &str, extension: &str) -> String {
    format!("{}/{}.{}", bucket, Uuid::new_v4(), extension)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modules::backend::DisabledClient;
    use crate::shared::test_helpers::{repository_for, InMemoryBackend, TEST_BASE_URL};

    #[tokio::test]
    async fn test_create_then_fetch_adds_exactly_one_post() {
        let backend = InMemoryBackend::new();
        let repository = repository_for(backend.clone());

        let before = repository.fetch_posts().await.unwrap();
        let created = repository
            .create_post("  hello wall  ", None)
            .await
            .unwrap();
        let after = repository.fetch_posts().await.unwrap();

        assert_eq!(after.len(), before.len() + 1);
        let matching: Vec<_> = after.iter().filter(|p| p.id == created.id).collect();
        assert_eq!(matching.len(), 1);
        assert_eq!(matching[0].body, "hello wall");
        assert_eq!(matching[0].image_url, None);
        assert!(!created.id.is_empty());
    }

    #[tokio::test]
    async fn test_fetch_is_newest_first() {
        let backend = InMemoryBackend::new();
        let repository = repository_for(backend.clone());
        for body in ["one", "two", "three"] {
            repository.create_post(body, None).await.unwrap();
        }

        let posts = repository.fetch_posts().await.unwrap();
        assert_eq!(posts[0].body, "three");
        assert!(posts
            .windows(2)
            .all(|pair| pair[0].created_at >= pair[1].created_at));
    }

    #[tokio::test]
    async fn test_empty_backend_fetches_empty_list() {
        let repository = repository_for(InMemoryBackend::new());
        assert!(repository.fetch_posts().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_unconfigured_backend_reports_not_configured() {
        let repository = repository_for(Arc::new(DisabledClient));

        assert!(matches!(
            repository.fetch_posts().await,
            Err(AppError::NotConfigured)
        ));
        assert!(matches!(
            repository.create_post("hello", None).await,
            Err(AppError::NotConfigured)
        ));
        assert!(matches!(
            repository
                .upload_image(ImageUpload::new("a.png", "image/png", vec![1]))
                .await,
            Err(AppError::NotConfigured)
        ));
    }

    #[tokio::test]
    async fn test_upload_png_keeps_extension_and_returns_public_url() {
        let backend = InMemoryBackend::new();
        let repository = repository_for(backend.clone());

        let url = repository
            .upload_image(ImageUpload::new("sunset.png", "image/png", vec![1, 2, 3]))
            .await
            .unwrap();

        let paths = backend.object_paths();
        assert_eq!(paths.len(), 1);
        assert!(paths[0].starts_with("post-images/"));
        assert!(paths[0].ends_with(".png"));
        assert_eq!(backend.object(&paths[0]), Some(vec![1, 2, 3]));
        assert!(url.starts_with(TEST_BASE_URL));
        assert!(url.ends_with(".png"));
    }

    #[tokio::test]
    async fn test_upload_uses_random_names() {
        let backend = InMemoryBackend::new();
        let repository = repository_for(backend.clone());
        for _ in 0..2 {
            repository
                .upload_image(ImageUpload::new("same.jpg", "image/jpeg", vec![1]))
                .await
                .unwrap();
        }
        assert_eq!(backend.object_paths().len(), 2);
    }

    #[tokio::test]
    async fn test_create_post_with_image_only() {
        let repository = repository_for(InMemoryBackend::new());
        let post = repository
            .create_post("   ", Some("https://example.com/a.png".to_string()))
            .await
            .unwrap();
        assert_eq!(post.body, "");
        assert!(post.has_image());
    }

    #[tokio::test]
    async fn test_create_post_rejects_invalid_content() {
        let backend = InMemoryBackend::new();
        let repository = repository_for(backend.clone());

        assert!(matches!(
            repository.create_post("   ", None).await,
            Err(AppError::Validation(_))
        ));
        assert!(matches!(
            repository.create_post(&"x".repeat(281), None).await,
            Err(AppError::Validation(_))
        ));
        assert_eq!(backend.row_count(), 0);
    }

    #[test]
    fn test_validate_content_counts_characters() {
        // 280 multi-byte characters are within the limit
        assert!(validate_content(&"é".repeat(280), false).is_ok());
        assert!(validate_content(&"é".repeat(281), false).is_err());
        assert!(validate_content("", true).is_ok());
    }
}
