use std::path::{Path, PathBuf};

use axum::extract::Multipart;
use chrono::Utc;
use image::ImageFormat;
use uuid::Uuid;

use crate::{config::Config, models::content::UploadedMedia};

/// Largest image accepted for page content.
pub const MAX_IMAGE_BYTES: usize = 10 * 1024 * 1024;

pub struct StorageService;

impl StorageService {
    /// Store the `file` field of a multipart upload as a content image under
    /// `{media_dir}/content/{YYYY}/{MM}/`. The bytes must decode as an image.
    pub async fn save_content_image(config: &Config, mut multipart: Multipart) -> anyhow::Result<UploadedMedia> {
        let mut bytes: Option<Vec<u8>> = None;

        while let Some(field) = multipart.next_field().await? {
            if field.name() == Some("file") {
                bytes = Some(field.bytes().await?.to_vec());
            }
        }

        let bytes = bytes.ok_or_else(|| anyhow::anyhow!("No file field in upload"))?;
        if bytes.is_empty() {
            anyhow::bail!("Uploaded file is empty");
        }
        if bytes.len() > MAX_IMAGE_BYTES {
            anyhow::bail!("Image exceeds {} MB", MAX_IMAGE_BYTES / (1024 * 1024));
        }

        let format = image::guess_format(&bytes)?;
        let ext = extension_for(format)
            .ok_or_else(|| anyhow::anyhow!("Unsupported image format: {format:?}"))?;
        let img = image::load_from_memory_with_format(&bytes, format)?;

        let now = Utc::now();
        let rel_dir = format!("content/{}", now.format("%Y/%m"));
        let dir = PathBuf::from(&config.media_dir).join(&rel_dir);
        tokio::fs::create_dir_all(&dir).await?;

        let filename = format!("{}.{}", Uuid::new_v4(), ext);
        tokio::fs::write(dir.join(&filename), &bytes).await?;

        let storage_path = format!("{rel_dir}/{filename}");
        tracing::info!("stored content image {storage_path} ({} bytes)", bytes.len());

        Ok(UploadedMedia {
            media_url: config.media_url(&storage_path),
            storage_path,
            media_type: "image".to_string(),
            width: img.width(),
            height: img.height(),
        })
    }
}

pub fn extension_for(format: ImageFormat) -> Option<&'static str> {
    match format {
        ImageFormat::Jpeg => Some("jpg"),
        ImageFormat::Png => Some("png"),
        ImageFormat::WebP => Some("webp"),
        ImageFormat::Gif => Some("gif"),
        _ => None,
    }
}

/// Resolve a stored file, refusing anything that escapes `media_dir`.
pub fn resolve_stored_path(media_dir: &str, relative: &str) -> Option<PathBuf> {
    if relative.split('/').any(|seg| seg == "..") || Path::new(relative).is_absolute() {
        return None;
    }
    let canonical_root = std::fs::canonicalize(media_dir).ok()?;
    let canonical_file = std::fs::canonicalize(Path::new(media_dir).join(relative)).ok()?;
    canonical_file
        .starts_with(&canonical_root)
        .then_some(canonical_file)
}
