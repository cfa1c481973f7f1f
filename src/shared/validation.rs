use lazy_static::lazy_static;
use regex::Regex;

use crate::shared::constants::ALLOWED_IMAGE_EXTENSIONS;

lazy_static! {
    /// Regex for validating a file extension taken from an uploaded file name
    /// Must be 1-10 lowercase alphanumeric characters
    /// - Valid: "png", "jpeg", "webp"
    /// - Invalid: "", "tar.gz", "p g", "../x"
    pub static ref FILE_EXTENSION_REGEX: Regex = Regex::new(r"^[a-z0-9]{1,10}$").unwrap();
}

/// Extract the lowercased extension of a file name.
///
/// Returns `None` when the name has no dot, ends with a dot, or the
/// extension contains anything but ASCII letters and digits.
/// Extensions are lowercased before matching.
pub fn file_extension(file_name: &str) -> Option<String> {
    let (_, ext) = file_name.rsplit_once('.')?;
    let ext = ext.to_ascii_lowercase();
    FILE_EXTENSION_REGEX.is_match(&ext).then_some(ext)
}

/// Whether an extension is one of the accepted image types
pub fn is_allowed_image_extension(ext: &str) -> bool {
    ALLOWED_IMAGE_EXTENSIONS.contains(&ext)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_extension_regex_valid() {
        assert!(FILE_EXTENSION_REGEX.is_match("png"));
        assert!(FILE_EXTENSION_REGEX.is_match("jpeg"));
        assert!(FILE_EXTENSION_REGEX.is_match("mp4"));
    }

    #[test]
    fn test_file_extension_regex_invalid() {
        assert!(!FILE_EXTENSION_REGEX.is_match("")); // empty
        assert!(!FILE_EXTENSION_REGEX.is_match("tar.gz")); // dot
        assert!(!FILE_EXTENSION_REGEX.is_match("p g")); // space
        assert!(!FILE_EXTENSION_REGEX.is_match("../x")); // path
        assert!(!FILE_EXTENSION_REGEX.is_match("PNG")); // uppercase
    }

    #[test]
    fn test_file_extension() {
        assert_eq!(file_extension("photo.png"), Some("png".to_string()));
        assert_eq!(file_extension("Photo.JPG"), Some("jpg".to_string()));
        assert_eq!(file_extension("archive.tar.gz"), Some("gz".to_string()));
        assert_eq!(file_extension("noextension"), None);
        assert_eq!(file_extension("trailing."), None);
        assert_eq!(file_extension("weird.p/g"), None);
    }

    #[test]
    fn test_allowed_image_extensions() {
        assert!(is_allowed_image_extension("png"));
        assert!(is_allowed_image_extension("webp"));
        assert!(!is_allowed_image_extension("pdf"));
        assert!(!is_allowed_image_extension("svg"));
    }
}
