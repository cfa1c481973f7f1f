use utoipa::{Modify, OpenApi};

use crate::features::posts::models::Post;
use crate::features::wall::{dtos as wall_dtos, handlers as wall_handlers};
use crate::shared::types::{ApiResponse, Meta};

#[derive(OpenApi)]
#[openapi(
    paths(
        // Wall
        wall_handlers::get_wall,
        wall_handlers::create_post,
        wall_handlers::stream_posts,
    ),
    components(
        schemas(
            // Shared
            Meta,
            // Posts
            Post,
            // Wall
            wall_dtos::PostResponseDto,
            wall_dtos::BannerDto,
            wall_dtos::WallResponseDto,
            wall_dtos::CreatePostDto,
            ApiResponse<wall_dtos::WallResponseDto>,
            ApiResponse<wall_dtos::PostResponseDto>,
        )
    ),
    tags(
        (name = "wall", description = "Public message wall: posts, images and live updates"),
    ),
    info(
        title = "Wall API",
        version = "0.1.0",
        description = "API documentation for the wall",
    )
)]
pub struct ApiDoc;

/// Modifier to override OpenAPI info from config
pub struct SwaggerInfoModifier {
    pub title: String,
    pub version: String,
    pub description: String,
}

impl Modify for SwaggerInfoModifier {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        openapi.info.title = self.title.clone();
        openapi.info.version = self.version.clone();
        openapi.info.description = Some(self.description.clone());
    }
}
