/// Maximum post body length, counted in characters
pub const MAX_BODY_CHARS: usize = 280;

/// Maximum size of an attached image in bytes (5MB)
pub const MAX_IMAGE_SIZE: usize = 5 * 1024 * 1024;

/// File extensions accepted for post images
pub const ALLOWED_IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "gif", "webp"];

// =============================================================================
// BANNER MESSAGES
// =============================================================================

pub const MSG_NOT_CONFIGURED: &str =
    "App is not properly configured. Please check environment variables.";

pub const MSG_EMPTY_WALL: &str = "No posts yet.";

/// Postgres schema the realtime listener is scoped to
pub const REALTIME_SCHEMA: &str = "public";
