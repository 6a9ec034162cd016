//! Image uploads and metadata, scoped to the owning user.

use serde::Serialize;
use serde_json::Value;
use sqlx::PgPool;
use tracing::instrument;

use looks_lab_core::{Domain, ImageId, ImageType, UserId};

use crate::db::ImageRepository;
use crate::db::images::ImageFilter;
use crate::error::{AppError, Result};
use crate::models::Image;
use crate::models::image::{ImageUpdate, NewImage};

use super::storage::{LocalStorage, StorageError, object_key, validate_upload};

/// A file received from a multipart upload.
#[derive(Debug)]
pub struct Upload {
    pub filename: Option<String>,
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

/// Where an upload belongs.
#[derive(Debug, Default)]
pub struct UploadTarget {
    pub domain: Option<Domain>,
    pub view: Option<String>,
    pub image_type: Option<ImageType>,
}

#[derive(Debug, Serialize)]
pub struct ImageUrl {
    pub image_id: ImageId,
    pub url: String,
}

/// Reject access to another user's image.
///
/// # Errors
///
/// Returns `AppError::Forbidden` if `user_id` doesn't own the image.
pub fn ensure_owner(image: &Image, user_id: UserId) -> Result<()> {
    if image.user_id == user_id {
        Ok(())
    } else {
        Err(AppError::Forbidden(
            "Not authorized to access this image".to_string(),
        ))
    }
}

fn image_not_found() -> AppError {
    AppError::NotFound("Image not found".to_string())
}

pub struct ImageService<'a> {
    images: ImageRepository<'a>,
    storage: &'a LocalStorage,
}

impl<'a> ImageService<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool, storage: &'a LocalStorage) -> Self {
        Self {
            images: ImageRepository::new(pool),
            storage,
        }
    }

    /// Validate, store and record an upload. The stored file is removed
    /// again if the record can't be written.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Storage` if validation or the disk write fails and
    /// `AppError::Database` if the insert fails.
    #[instrument(skip(self, upload), fields(size = upload.bytes.len()))]
    pub async fn upload(
        &self,
        user_id: UserId,
        upload: Upload,
        target: UploadTarget,
    ) -> Result<Image> {
        let ext = validate_upload(
            upload.filename.as_deref(),
            upload.content_type.as_deref(),
            upload.bytes.len(),
            self.storage.max_file_size(),
        )?;

        let key = object_key(
            target.domain.map(Domain::as_str),
            user_id,
            target.view.as_deref(),
            &ext,
        );
        self.storage.save(&key, &upload.bytes).await?;

        let new_image = NewImage {
            file_path: key.clone(),
            url: Some(self.storage.url_for(&key)),
            s3_key: Some(key.clone()),
            mime_type: upload.content_type,
            file_size: i64::try_from(upload.bytes.len()).ok(),
            image_type: target.image_type.unwrap_or_default(),
            domain: target.domain,
            view: target.view,
        };
        let image = match self.images.create(user_id, &new_image).await {
            Ok(image) => image,
            Err(e) => {
                if let Err(cleanup) = self.storage.delete(&key).await {
                    tracing::warn!(%key, error = %cleanup, "Failed to remove orphaned upload");
                }
                return Err(e.into());
            }
        };

        tracing::info!(image_id = %image.id, "Uploaded image");
        Ok(image)
    }

    /// # Errors
    ///
    /// Returns `AppError::NotFound` for a missing image and
    /// `AppError::Forbidden` for someone else's.
    pub async fn get(&self, id: ImageId, user_id: UserId) -> Result<Image> {
        let image = self.images.get(id).await?.ok_or_else(image_not_found)?;
        ensure_owner(&image, user_id)?;
        Ok(image)
    }

    /// # Errors
    ///
    /// Returns `AppError::Database` if the query fails.
    pub async fn list(&self, user_id: UserId, filter: &ImageFilter) -> Result<Vec<Image>> {
        Ok(self.images.list_for_user(user_id, filter).await?)
    }

    /// Current public URL of an image.
    ///
    /// # Errors
    ///
    /// Same as [`Self::get`].
    pub async fn url(&self, id: ImageId, user_id: UserId) -> Result<ImageUrl> {
        let image = self.get(id, user_id).await?;
        Ok(ImageUrl {
            image_id: image.id,
            url: self.storage.url_for(image.storage_key()),
        })
    }

    /// # Errors
    ///
    /// Same as [`Self::get`].
    pub async fn update(&self, id: ImageId, user_id: UserId, update: &ImageUpdate) -> Result<Image> {
        self.get(id, user_id).await?;
        let image = self.images.update(id, update).await?;
        tracing::info!(image_id = %id, "Updated image");
        Ok(image)
    }

    /// # Errors
    ///
    /// Same as [`Self::get`].
    pub async fn mark_processed(
        &self,
        id: ImageId,
        user_id: UserId,
        analysis_result: &Value,
    ) -> Result<Image> {
        self.get(id, user_id).await?;
        let image = self.images.mark_processed(id, analysis_result).await?;
        tracing::info!(image_id = %id, "Marked image processed");
        Ok(image)
    }

    /// # Errors
    ///
    /// Same as [`Self::get`].
    pub async fn mark_failed(
        &self,
        id: ImageId,
        user_id: UserId,
        error_message: Option<&str>,
    ) -> Result<Image> {
        self.get(id, user_id).await?;
        let image = self.images.mark_failed(id, error_message).await?;
        tracing::warn!(image_id = %id, error_message, "Marked image failed");
        Ok(image)
    }

    /// Remove the file and its record. A file already gone from disk only
    /// logs a warning.
    ///
    /// # Errors
    ///
    /// Same as [`Self::get`].
    pub async fn delete(&self, id: ImageId, user_id: UserId) -> Result<()> {
        let image = self.get(id, user_id).await?;

        match self.storage.delete(image.storage_key()).await {
            Ok(()) => {}
            Err(StorageError::NotFound(key)) => {
                tracing::warn!(%key, "Image file already missing from storage");
            }
            Err(e) => tracing::warn!(error = %e, "Failed to delete image file"),
        }

        if !self.images.delete(id).await? {
            return Err(image_not_found());
        }
        tracing::info!(image_id = %id, "Deleted image");
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::Utc;
    use looks_lab_core::ImageStatus;

    use super::*;

    fn image(owner: i32) -> Image {
        let now = Utc::now();
        Image {
            id: ImageId::new(3),
            user_id: UserId::new(owner),
            file_path: "skincare/1/front_a.jpg".to_string(),
            s3_key: None,
            url: None,
            mime_type: Some("image/jpeg".to_string()),
            file_size: Some(1024),
            image_type: ImageType::Uploaded,
            domain: Some("skincare".to_string()),
            view: Some("front".to_string()),
            status: ImageStatus::Pending,
            analysis_result: None,
            error_message: None,
            uploaded_at: now,
            processed_at: None,
            updated_at: now,
        }
    }

    #[test]
    fn test_owner_may_access() {
        assert!(ensure_owner(&image(1), UserId::new(1)).is_ok());
    }

    #[test]
    fn test_other_user_is_forbidden() {
        let err = ensure_owner(&image(1), UserId::new(2)).unwrap_err();
        assert!(matches!(err, AppError::Forbidden(msg) if msg == "Not authorized to access this image"));
    }

    #[test]
    fn test_storage_key_falls_back_to_file_path() {
        assert_eq!(image(1).storage_key(), "skincare/1/front_a.jpg");
    }
}
