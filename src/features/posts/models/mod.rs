mod image_upload;
mod post;

pub use image_upload::ImageUpload;
pub use post::{NewPost, Post};
