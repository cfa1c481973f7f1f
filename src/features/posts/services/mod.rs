mod post_repository;

pub use post_repository::{validate_content, PostRepository};
