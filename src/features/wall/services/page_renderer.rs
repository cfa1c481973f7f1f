use minijinja::{context, Environment};

use crate::core::error::{AppError, Result};
use crate::features::wall::dtos::WallResponseDto;
use crate::shared::constants::{ALLOWED_IMAGE_EXTENSIONS, MAX_BODY_CHARS};

const WALL_TEMPLATE: &str = "wall.html";

/// Renders the wall page from a [`WallResponseDto`]
pub struct PageRenderer {
    env: Environment<'static>,
    title: String,
}

impl PageRenderer {
    pub fn new(title: impl Into<String>) -> Result<Self> {
        let mut env = Environment::new();
        // `.html` templates are auto-escaped
        env.add_template(
            WALL_TEMPLATE,
            include_str!("../../../../templates/wall.html"),
        )
        .map_err(|e| AppError::Internal(format!("Failed to load page template: {}", e)))?;

        Ok(Self {
            env,
            title: title.into(),
        })
    }

    pub fn render(&self, wall: &WallResponseDto) -> Result<String> {
        let accept = ALLOWED_IMAGE_EXTENSIONS
            .iter()
            .map(|ext| format!(".{}", ext))
            .collect::<Vec<_>>()
            .join(",");

        let template = self
            .env
            .get_template(WALL_TEMPLATE)
            .map_err(|e| AppError::Internal(format!("Template '{}' not found: {}", WALL_TEMPLATE, e)))?;

        template
            .render(context! {
                title => &self.title,
                wall => wall,
                max_body_chars => MAX_BODY_CHARS,
                accept => accept,
            })
            .map_err(|e| AppError::Internal(format!("Failed to render page: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::wall::dtos::{BannerDto, PostResponseDto};
    use crate::shared::test_helpers::{sample_post, test_epoch};

    fn empty_wall() -> WallResponseDto {
        WallResponseDto {
            configured: true,
            posts: Vec::new(),
            banner: None,
            empty_message: Some("No posts yet.".to_string()),
        }
    }

    #[test]
    fn test_empty_wall_page() {
        let html = PageRenderer::new("The Wall")
            .unwrap()
            .render(&empty_wall())
            .unwrap();
        assert!(html.contains("<title>The Wall</title>"));
        assert!(html.contains("No posts yet."));
        assert!(!html.contains("role=\"alert\">"));
    }

    #[test]
    fn test_posts_are_escaped() {
        let mut wall = empty_wall();
        wall.empty_message = None;
        wall.posts.push(PostResponseDto::from_post(
            sample_post("1", "<script>alert(1)</script>", test_epoch()),
            test_epoch(),
        ));

        let html = PageRenderer::new("The Wall").unwrap().render(&wall).unwrap();
        assert!(html.contains("&lt;script&gt;alert(1)"));
        assert!(!html.contains("<script>alert(1)"));
        assert!(html.contains("Just now"));
        assert!(!html.contains("No posts yet."));
    }

    #[test]
    fn test_configuration_banner_disables_form() {
        let wall = WallResponseDto {
            configured: false,
            posts: Vec::new(),
            banner: Some(BannerDto {
                kind: "configuration".to_string(),
                message: "App is not properly configured.".to_string(),
            }),
            empty_message: Some("No posts yet.".to_string()),
        };

        let html = PageRenderer::new("The Wall").unwrap().render(&wall).unwrap();
        assert!(html.contains("banner configuration"));
        assert!(html.contains("App is not properly configured."));
        assert!(html.contains(" disabled>Share</button>"));
    }

    #[test]
    fn test_page_wires_preview_counter_and_time_refresh() {
        let html = PageRenderer::new("The Wall")
            .unwrap()
            .render(&empty_wall())
            .unwrap();

        assert!(html.contains("id=\"preview\""));
        assert!(html.contains("id=\"remove-image\""));
        assert!(html.contains("URL.createObjectURL"));
        assert!(html.contains("setInterval(refreshTimes, 10000)"));
        // Length is enforced server-side, counted in characters
        assert!(!html.contains("maxlength"));
        assert!(html.contains("280 - Array.from(body.value).length"));
    }
}
