use std::convert::Infallible;
use std::sync::Arc;

use axum::{
    extract::{multipart::MultipartError, Multipart, Query, State},
    http::StatusCode,
    response::{sse::Event, Html, IntoResponse, Response, Sse},
    Json,
};
use chrono::Utc;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::StreamExt;
use tracing::debug;

use crate::core::error::{AppError, Result};
use crate::features::posts::models::ImageUpload;
use crate::features::wall::dtos::{CreatePostDto, PostResponseDto, WallQuery, WallResponseDto};
use crate::features::wall::services::{PageRenderer, PostForm, WallService};
use crate::shared::constants::MAX_IMAGE_SIZE;
use crate::shared::types::{ApiResponse, Meta};

/// SSE event name for a post that just appeared on the wall
pub const POST_CREATED_EVENT: &str = "post.created";

/// State for wall handlers
#[derive(Clone)]
pub struct WallState {
    pub service: Arc<WallService>,
    pub renderer: Arc<PageRenderer>,
}

/// Render the wall page
pub async fn render_page(State(state): State<WallState>) -> Result<Html<String>> {
    let wall = state.service.snapshot(Utc::now()).await;
    let html = state.renderer.render(&wall)?;
    Ok(Html(html))
}

/// Get the wall
///
/// Returns the posts newest first together with the current banner. Load
/// failures are reported through the banner, not the status code.
#[utoipa::path(
    get,
    path = "/api/posts",
    tag = "wall",
    params(WallQuery),
    responses(
        (status = 200, description = "Current wall", body = ApiResponse<WallResponseDto>)
    )
)]
pub async fn get_wall(
    State(state): State<WallState>,
    Query(query): Query<WallQuery>,
) -> Result<Json<ApiResponse<WallResponseDto>>> {
    if query.refresh || !state.service.feed().is_loaded().await {
        if let Err(e) = state.service.load().await {
            debug!("Refresh failed, serving banner: {}", e);
        }
    }

    let wall = state.service.snapshot(Utc::now()).await;
    let total = wall.posts.len() as i64;
    Ok(Json(ApiResponse::success(
        Some(wall),
        None,
        Some(Meta { total }),
    )))
}

/// Create a post
///
/// Accepts multipart/form-data with:
/// - `body`: message text, up to 280 characters
/// - `image`: optional image file
///
/// At least one of the two must be present.
#[utoipa::path(
    post,
    path = "/api/posts",
    tag = "wall",
    request_body(
        content = CreatePostDto,
        content_type = "multipart/form-data",
        description = "Post form with message text and an optional image",
    ),
    responses(
        (status = 201, description = "Post created", body = ApiResponse<PostResponseDto>),
        (status = 400, description = "Invalid form or image"),
        (status = 413, description = "Image or request body too large"),
        (status = 502, description = "Backend request failed"),
        (status = 503, description = "Backend not configured")
    )
)]
pub async fn create_post(
    State(state): State<WallState>,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<ApiResponse<PostResponseDto>>)> {
    let mut form = PostForm::default();

    while let Some(field) = multipart.next_field().await.map_err(|e| {
        debug!("Failed to read multipart field: {}", e);
        multipart_error("Failed to read multipart data", e)
    })? {
        let field_name = field.name().unwrap_or("").to_string();

        match field_name.as_str() {
            "body" => {
                form.body = field
                    .text()
                    .await
                    .map_err(|e| multipart_error("Failed to read body field", e))?;
            }
            "image" => {
                let content_type = field
                    .content_type()
                    .map(|s| s.to_string())
                    .unwrap_or_else(|| "application/octet-stream".to_string());
                let file_name = field.file_name().unwrap_or("").to_string();

                let data = field.bytes().await.map_err(|e| {
                    debug!("Failed to read image bytes: {}", e);
                    multipart_error("Failed to read image data", e)
                })?;

                // Browsers send an empty part when no file is selected
                if file_name.is_empty() && data.is_empty() {
                    continue;
                }

                form.image = Some(ImageUpload::new(file_name, content_type, data.to_vec()));
            }
            _ => {
                debug!("Ignoring unknown field: {}", field_name);
            }
        }
    }

    let post = state.service.submit(form).await?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success(
            Some(PostResponseDto::from_post(post, Utc::now())),
            Some("Post created".to_string()),
            None,
        )),
    ))
}

/// Bodies over the route's limit surface as multipart errors carrying 413
fn multipart_error(context: &str, e: MultipartError) -> AppError {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        AppError::PayloadTooLarge(format!(
            "Request too large. Maximum image size is {} MB",
            MAX_IMAGE_SIZE / 1024 / 1024
        ))
    } else {
        AppError::BadRequest(format!("{}: {}", context, e))
    }
}

/// Stream new posts
///
/// Server-Sent Events; one `post.created` event per post that appears on
/// the wall, carrying a `PostResponseDto` as JSON.
#[utoipa::path(
    get,
    path = "/api/posts/stream",
    tag = "wall",
    responses(
        (status = 200, description = "SSE stream of new posts", content_type = "text/event-stream")
    )
)]
pub async fn stream_posts(State(state): State<WallState>) -> Response {
    let receiver = state.service.feed().subscribe();
    let closed = state.service.feed().closed();

    let stream = BroadcastStream::new(receiver).filter_map(|item| match item {
        Ok(post) => {
            let dto = PostResponseDto::from_post(post, Utc::now());
            match serde_json::to_string(&dto) {
                Ok(data) => Some(Ok::<_, Infallible>(
                    Event::default()
                        .event(POST_CREATED_EVENT)
                        .id(dto.id)
                        .data(data),
                )),
                Err(e) => {
                    debug!("Failed to serialize post event: {}", e);
                    None
                }
            }
        }
        Err(e) => {
            // Slow viewer; the page catches up on its next load
            debug!("Live post stream lagged: {}", e);
            None
        }
    });
    // End the stream on shutdown so graceful shutdown is not held open
    let stream = futures_util::StreamExt::take_until(stream, closed);

    Sse::new(stream)
        .keep_alive(
            axum::response::sse::KeepAlive::new()
                .interval(std::time::Duration::from_secs(15))
                .text("ping"),
        )
        .into_response()
}
