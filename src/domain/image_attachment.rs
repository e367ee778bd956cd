use std::io;
use std::path::Path;

use bytes::Bytes;

#[derive(Debug, Clone, PartialEq)]
pub struct ImageAttachment {
    pub filename: String,
    pub content_type: String,
    pub data: Bytes,
}

impl ImageAttachment {
    pub fn new(filename: impl Into<String>, content_type: impl Into<String>, data: Bytes) -> Self {
        Self {
            filename: filename.into(),
            content_type: content_type.into(),
            data,
        }
    }

    pub async fn from_path(path: &Path) -> io::Result<Self> {
        let data = tokio::fs::read(path).await?;
        let filename = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("image")
            .to_string();
        let content_type = mime_from_extension(path).to_string();

        Ok(Self {
            filename,
            content_type,
            data: Bytes::from(data),
        })
    }

    pub fn size_bytes(&self) -> usize {
        self.data.len()
    }
}

fn mime_from_extension(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();

    match ext.as_str() {
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "heic" => "image/heic",
        "bmp" => "image/bmp",
        _ => "application/octet-stream",
    }
}
