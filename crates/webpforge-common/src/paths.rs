//! Path utilities for detecting image files and naming converted output.
//!
//! These are used by the ingestion gate to classify candidates and by the
//! retrieval and bundle code to derive artifact file names.

use crate::types::{NamingMode, Quality, TargetFormat};
use std::path::Path;

/// Name used when a source has no usable file name (e.g. a pasted image).
pub const FALLBACK_STEM: &str = "image";

/// Declared MIME type for a path, derived from its extension.
///
/// Returns `None` for anything that is not a known image extension.
pub fn image_mime_for_path(path: &Path) -> Option<&'static str> {
    let ext = path.extension()?.to_str()?.to_lowercase();
    let mime = match ext.as_str() {
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "bmp" => "image/bmp",
        "tif" | "tiff" => "image/tiff",
        "ico" => "image/x-icon",
        _ => return None,
    };
    Some(mime)
}

/// Whether a declared content type describes an image.
pub fn is_image_mime(mime: &str) -> bool {
    mime.trim().to_ascii_lowercase().starts_with("image/")
}

/// The source name with its last extension and any directory part removed.
///
/// # Examples
///
/// ```
/// use webpforge_common::paths::source_stem;
///
/// assert_eq!(source_stem("holiday.final.png"), "holiday.final");
/// assert_eq!(source_stem("dir/photo.jpg"), "photo");
/// assert_eq!(source_stem(""), "image");
/// ```
pub fn source_stem(source_name: &str) -> String {
    Path::new(source_name)
        .file_stem()
        .and_then(|s| s.to_str())
        .filter(|s| !s.is_empty())
        .unwrap_or(FALLBACK_STEM)
        .to_string()
}

/// Derive the output file name for a converted artifact.
///
/// # Examples
///
/// ```
/// use webpforge_common::paths::output_file_name;
/// use webpforge_common::{NamingMode, Quality, TargetFormat};
///
/// let q = Quality::new(0.75);
/// assert_eq!(
///     output_file_name("photo.png", q, TargetFormat::WebP, NamingMode::Original),
///     "photo.webp"
/// );
/// assert_eq!(
///     output_file_name("photo.png", q, TargetFormat::WebP, NamingMode::Suffix),
///     "photo-q75.webp"
/// );
/// ```
pub fn output_file_name(
    source_name: &str,
    quality: Quality,
    format: TargetFormat,
    mode: NamingMode,
) -> String {
    let stem = source_stem(source_name);
    match mode {
        NamingMode::Original => format!("{}.{}", stem, format.extension()),
        NamingMode::Suffix => format!("{}-q{}.{}", stem, quality.percent(), format.extension()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_image_mime_for_path() {
        assert_eq!(image_mime_for_path(Path::new("a.JPG")), Some("image/jpeg"));
        assert_eq!(image_mime_for_path(Path::new("a.png")), Some("image/png"));
        assert_eq!(image_mime_for_path(Path::new("a.txt")), None);
        assert_eq!(image_mime_for_path(Path::new("a")), None);
    }

    #[test]
    fn test_is_image_mime() {
        assert!(is_image_mime("image/png"));
        assert!(is_image_mime("Image/JPEG"));
        assert!(!is_image_mime("text/plain"));
        assert!(!is_image_mime(""));
    }

    #[test]
    fn test_output_file_name_edge_cases() {
        let q = Quality::new(0.5);

        // No extension
        assert_eq!(
            output_file_name("README", q, TargetFormat::WebP, NamingMode::Original),
            "README.webp"
        );

        // Multiple dots only lose the last extension
        assert_eq!(
            output_file_name("a.b.c.png", q, TargetFormat::Jpeg, NamingMode::Suffix),
            "a.b.c-q50.jpg"
        );

        // Pasted image without a name
        assert_eq!(
            output_file_name("", q, TargetFormat::WebP, NamingMode::Original),
            "image.webp"
        );
    }
}
