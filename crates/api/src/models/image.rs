//! Image metadata.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use looks_lab_core::{Domain, ImageId, ImageStatus, ImageType, UserId};

#[derive(Debug, Clone, Serialize)]
pub struct Image {
    pub id: ImageId,
    pub user_id: UserId,
    pub file_path: String,
    /// Storage key relative to the storage root.
    pub s3_key: Option<String>,
    pub url: Option<String>,
    pub mime_type: Option<String>,
    pub file_size: Option<i64>,
    pub image_type: ImageType,
    pub domain: Option<String>,
    /// Camera angle or subject: `front`, `left`, `right`, `back`, `meal`, ...
    pub view: Option<String>,
    pub status: ImageStatus,
    pub analysis_result: Option<Value>,
    pub error_message: Option<String>,
    pub uploaded_at: DateTime<Utc>,
    pub processed_at: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
}

impl Image {
    /// Key used to locate the file in storage.
    #[must_use]
    pub fn storage_key(&self) -> &str {
        self.s3_key.as_deref().unwrap_or(&self.file_path)
    }
}

/// Metadata for a new image row.
#[derive(Debug, Clone)]
pub struct NewImage {
    pub file_path: String,
    pub s3_key: Option<String>,
    pub url: Option<String>,
    pub mime_type: Option<String>,
    pub file_size: Option<i64>,
    pub image_type: ImageType,
    pub domain: Option<Domain>,
    pub view: Option<String>,
}

/// Metadata patch. `None` leaves the stored value untouched.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ImageUpdate {
    pub analysis_result: Option<Value>,
    pub status: Option<ImageStatus>,
    pub image_type: Option<ImageType>,
    pub domain: Option<Domain>,
    pub view: Option<String>,
}
