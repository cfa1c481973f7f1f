use crate::core::error::{AppError, Result};
use crate::shared::constants::{ALLOWED_IMAGE_EXTENSIONS, MAX_IMAGE_SIZE};
use crate::shared::validation::{file_extension, is_allowed_image_extension};

/// An image selected for attachment to a post
#[derive(Debug, Clone)]
pub struct ImageUpload {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

impl ImageUpload {
    pub fn new(
        file_name: impl Into<String>,
        content_type: impl Into<String>,
        bytes: Vec<u8>,
    ) -> Self {
        Self {
            file_name: file_name.into(),
            content_type: content_type.into(),
            bytes,
        }
    }

    /// Check size and type, returning the extension the stored object keeps
    pub fn validate(&self) -> Result<String> {
        if self.bytes.is_empty() {
            return Err(AppError::Validation("Image file is empty".to_string()));
        }

        if self.bytes.len() > MAX_IMAGE_SIZE {
            return Err(AppError::PayloadTooLarge(format!(
                "Image too large. Maximum size is {} MB",
                MAX_IMAGE_SIZE / 1024 / 1024
            )));
        }

        match file_extension(&self.file_name) {
            Some(ext) if is_allowed_image_extension(&ext) => Ok(ext),
            _ => Err(AppError::Validation(format!(
                "Image type of '{}' is not allowed. Allowed types: {}",
                self.file_name,
                ALLOWED_IMAGE_EXTENSIONS.join(", ")
            ))),
        }
    }
}
