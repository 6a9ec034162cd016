//! Local disk storage for uploaded images.
//!
//! Files live under the configured storage root and are served back from
//! `/media`. Keys look like `{domain}/{user_id}/{view}_{uuid}.{ext}`.

use std::path::{Component, Path, PathBuf};

use looks_lab_core::UserId;
use thiserror::Error;
use uuid::Uuid;

use crate::config::{ALLOWED_IMAGE_MIME_TYPES, StorageConfig};

/// Extensions accepted for image uploads, lowercase.
pub const ALLOWED_IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "webp"];

const BYTES_PER_MB: f64 = 1024.0 * 1024.0;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Filename is required")]
    MissingFilename,

    #[error("File type '{0}' not allowed. Allowed: jpeg, jpg, png, webp")]
    InvalidExtension(String),

    #[error("Content type '{0}' not allowed. Allowed: image/jpeg, image/png, image/webp")]
    InvalidMimeType(String),

    #[error("File is empty")]
    Empty,

    #[error("File size {size_mb:.1}MB exceeds maximum allowed {max_mb:.0}MB")]
    TooLarge { size_mb: f64, max_mb: f64 },

    #[error("Invalid storage key: {0}")]
    InvalidKey(String),

    #[error("File not found: {0}")]
    NotFound(String),

    #[error("storage I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Check an upload before it touches the disk.
///
/// Returns the normalized (lowercase) extension.
///
/// # Errors
///
/// Returns the first rule the upload breaks: missing filename, extension,
/// MIME type, emptiness, then size.
#[allow(clippy::cast_precision_loss)]
pub fn validate_upload(
    filename: Option<&str>,
    content_type: Option<&str>,
    size: usize,
    max_size: usize,
) -> Result<String, StorageError> {
    let filename = filename
        .filter(|name| !name.trim().is_empty())
        .ok_or(StorageError::MissingFilename)?;

    let ext = Path::new(filename)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_lowercase)
        .unwrap_or_default();
    if !ALLOWED_IMAGE_EXTENSIONS.contains(&ext.as_str()) {
        return Err(StorageError::InvalidExtension(format!(".{ext}")));
    }

    if let Some(mime) = content_type
        && !ALLOWED_IMAGE_MIME_TYPES.contains(&mime)
    {
        return Err(StorageError::InvalidMimeType(mime.to_owned()));
    }

    if size == 0 {
        return Err(StorageError::Empty);
    }

    if size > max_size {
        return Err(StorageError::TooLarge {
            size_mb: size as f64 / BYTES_PER_MB,
            max_mb: max_size as f64 / BYTES_PER_MB,
        });
    }

    Ok(ext)
}

/// Build a fresh storage key for an upload.
#[must_use]
pub fn object_key(domain: Option<&str>, user_id: UserId, view: Option<&str>, ext: &str) -> String {
    let domain = path_segment(domain.unwrap_or("general"));
    let view = path_segment(view.unwrap_or("image"));
    format!("{domain}/{user_id}/{view}_{}.{ext}", Uuid::new_v4())
}

/// Lowercase, with anything but ASCII alphanumerics, `-` and `_` turned
/// into `_`.
fn path_segment(raw: &str) -> String {
    let segment: String = raw
        .trim()
        .to_lowercase()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' { c } else { '_' })
        .collect();
    if segment.is_empty() {
        "_".to_owned()
    } else {
        segment
    }
}

/// Disk-backed store rooted at `LOCAL_STORAGE_PATH`.
#[derive(Debug, Clone)]
pub struct LocalStorage {
    root: PathBuf,
    public_base: String,
    max_file_size: usize,
}

impl LocalStorage {
    #[must_use]
    pub fn new(config: &StorageConfig, base_url: Option<&str>) -> Self {
        Self {
            root: config.root.clone(),
            public_base: base_url.unwrap_or_default().trim_end_matches('/').to_owned(),
            max_file_size: config.max_file_size_bytes,
        }
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    #[must_use]
    pub const fn max_file_size(&self) -> usize {
        self.max_file_size
    }

    /// Public URL for a key.
    #[must_use]
    pub fn url_for(&self, key: &str) -> String {
        format!("{}/media/{}", self.public_base, key.trim_start_matches('/'))
    }

    /// Resolve a key to a path under the root, refusing anything that would
    /// escape it.
    fn resolve(&self, key: &str) -> Result<PathBuf, StorageError> {
        let relative = Path::new(key.trim_start_matches('/'));
        let escapes = relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_)));
        if key.is_empty() || escapes {
            return Err(StorageError::InvalidKey(key.to_owned()));
        }
        Ok(self.root.join(relative))
    }

    /// Write `bytes` at `key`, creating parent directories.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::InvalidKey` for keys outside the root and
    /// `StorageError::Io` if the write fails.
    pub async fn save(&self, key: &str, bytes: &[u8]) -> Result<(), StorageError> {
        let path = self.resolve(key)?;
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&path, bytes).await?;
        tracing::info!(key, bytes = bytes.len(), "Stored file");
        Ok(())
    }

    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if nothing is stored at `key`.
    pub async fn delete(&self, key: &str) -> Result<(), StorageError> {
        let path = self.resolve(key)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => {
                tracing::info!(key, "Deleted file");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(StorageError::NotFound(key.to_owned()))
            }
            Err(e) => Err(e.into()),
        }
    }
}
