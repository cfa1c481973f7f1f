use axum::{extract::DefaultBodyLimit, routing::get, Router};
use std::sync::Arc;

use crate::features::wall::handlers::{create_post, get_wall, render_page, stream_posts, WallState};
use crate::features::wall::services::{PageRenderer, WallService};
use crate::shared::constants::MAX_IMAGE_SIZE;

/// Create routes for the wall feature
pub fn routes(service: Arc<WallService>, renderer: Arc<PageRenderer>) -> Router {
    let state = WallState { service, renderer };

    Router::new()
        .route("/", get(render_page))
        .route(
            "/api/posts",
            // Allow body size up to MAX_IMAGE_SIZE + buffer for multipart overhead
            get(get_wall)
                .post(create_post)
                .layer(DefaultBodyLimit::max(MAX_IMAGE_SIZE + 1024 * 1024)),
        )
        .route("/api/posts/stream", get(stream_posts))
        .with_state(state)
}
