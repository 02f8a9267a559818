//! Raw inputs handed to the model, and the image loader.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use std::path::Path;
use tracing::debug;

use crate::ExtractError;

/// Text or image data supplied to one model invocation.
#[derive(Debug, Clone, PartialEq)]
pub enum SourceContent {
    Text(String),
    Image {
        /// `data:<mime>;base64,<payload>`
        data_uri: String,
        /// Optional text sent alongside the image.
        caption: Option<String>,
    },
}

impl SourceContent {
    pub fn text(text: impl Into<String>) -> Self {
        SourceContent::Text(text.into())
    }

    pub fn image(data_uri: impl Into<String>) -> Self {
        SourceContent::Image {
            data_uri: data_uri.into(),
            caption: None,
        }
    }

    pub fn with_caption(self, caption: impl Into<String>) -> Self {
        match self {
            SourceContent::Image { data_uri, .. } => SourceContent::Image {
                data_uri,
                caption: Some(caption.into()),
            },
            text => text,
        }
    }

    /// Cuts text content down to `max_chars` characters. Images are left alone.
    pub fn truncated(self, max_chars: usize) -> Self {
        match self {
            SourceContent::Text(text) if text.chars().count() > max_chars => {
                SourceContent::Text(text.chars().take(max_chars).collect())
            }
            other => other,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            SourceContent::Text(text) => text.len(),
            SourceContent::Image { data_uri, .. } => data_uri.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

pub fn mime_type_for(path: &Path) -> &'static str {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());

    match extension.as_deref() {
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        _ => "image/png",
    }
}

pub fn encode_data_uri(bytes: &[u8], mime_type: &str) -> String {
    format!("data:{};base64,{}", mime_type, STANDARD.encode(bytes))
}

/// Reads a local image and wraps it as a base64 data URI.
pub async fn load_image_data_uri(path: impl AsRef<Path>) -> Result<String, ExtractError> {
    let path = path.as_ref();
    let bytes = tokio::fs::read(path).await.map_err(|source| ExtractError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    let uri = encode_data_uri(&bytes, mime_type_for(path));
    debug!(path = %path.display(), bytes = bytes.len(), "Encoded image as data URI");
    Ok(uri)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_mime_types() {
        assert_eq!(mime_type_for(Path::new("graph.png")), "image/png");
        assert_eq!(mime_type_for(Path::new("photo.JPG")), "image/jpeg");
        assert_eq!(mime_type_for(Path::new("anim.gif")), "image/gif");
        assert_eq!(mime_type_for(Path::new("scan.webp")), "image/webp");
        assert_eq!(mime_type_for(Path::new("no_extension")), "image/png");
    }

    #[test]
    fn test_encode_data_uri() {
        assert_eq!(encode_data_uri(b"abc", "image/png"), "data:image/png;base64,YWJj");
    }

    #[tokio::test]
    async fn test_load_image() {
        let mut file = tempfile::Builder::new().suffix(".png").tempfile().unwrap();
        file.write_all(&[0x89, b'P', b'N', b'G']).unwrap();

        let uri = load_image_data_uri(file.path()).await.unwrap();
        assert!(uri.starts_with("data:image/png;base64,"));
        let payload = uri.trim_start_matches("data:image/png;base64,");
        assert_eq!(STANDARD.decode(payload).unwrap(), vec![0x89, b'P', b'N', b'G']);
    }

    #[tokio::test]
    async fn test_missing_image() {
        let err = load_image_data_uri("does/not/exist.png").await.unwrap_err();
        assert!(matches!(err, ExtractError::Io { .. }));
    }

    #[test]
    fn test_truncate_counts_characters() {
        let content = SourceContent::text("héllo wörld").truncated(5);
        assert_eq!(content, SourceContent::text("héllo"));

        let image = SourceContent::image("data:image/png;base64,AAAA").truncated(3);
        assert!(matches!(image, SourceContent::Image { .. }));
    }

    #[test]
    fn test_caption_only_applies_to_images() {
        let text = SourceContent::text("hello").with_caption("ignored");
        assert_eq!(text, SourceContent::text("hello"));

        let image = SourceContent::image("data:image/png;base64,AAAA").with_caption("a graph");
        assert!(matches!(
            image,
            SourceContent::Image { caption: Some(ref c), .. } if c == "a graph"
        ));
    }
}
