//! Image upload and metadata routes.

use axum::{
    Json, Router,
    extract::{Multipart, Path, Query, State, multipart::MultipartError},
    http::StatusCode,
    routing::{get, patch},
};
use serde::Deserialize;
use serde_json::Value;

use looks_lab_core::{Domain, ImageId, ImageType};

use crate::db::images::ImageFilter;
use crate::error::{AppError, Result};
use crate::middleware::RequireAuth;
use crate::models::Image;
use crate::models::image::ImageUpdate;
use crate::services::ImageService;
use crate::services::images::{ImageUrl, Upload, UploadTarget};
use crate::state::AppState;

use super::Deleted;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list).post(upload))
        .route("/{id}", get(show).patch(update).delete(delete))
        .route("/{id}/url", get(url))
        .route("/{id}/processed", patch(mark_processed))
        .route("/{id}/failed", patch(mark_failed))
}

#[derive(Debug, Deserialize)]
pub struct ProcessedRequest {
    pub analysis_result: Value,
}

#[derive(Debug, Deserialize)]
pub struct FailedQuery {
    pub error_message: Option<String>,
}

fn multipart_error(e: &MultipartError) -> AppError {
    AppError::BadRequest(format!("Invalid multipart body: {}", e.body_text()))
}

/// Read the `file` part and the optional `domain`, `view` and `image_type`
/// text parts.
async fn read_upload(mut multipart: Multipart) -> Result<(Upload, UploadTarget)> {
    let mut upload = None;
    let mut target = UploadTarget::default();

    while let Some(field) = multipart.next_field().await.map_err(|e| multipart_error(&e))? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "file" => {
                let filename = field.file_name().map(str::to_string);
                let content_type = field.content_type().map(str::to_string);
                let bytes = field.bytes().await.map_err(|e| multipart_error(&e))?;
                upload = Some(Upload {
                    filename,
                    content_type,
                    bytes: bytes.to_vec(),
                });
            }
            "domain" | "view" | "image_type" => {
                let text = field.text().await.map_err(|e| multipart_error(&e))?;
                let text = text.trim();
                if text.is_empty() {
                    continue;
                }
                match name.as_str() {
                    "domain" => target.domain = Some(Domain::parse(text)?),
                    "view" => target.view = Some(text.to_string()),
                    _ => {
                        let image_type = text.parse::<ImageType>().map_err(|e| {
                            AppError::BadRequest(e.to_string())
                        })?;
                        target.image_type = Some(image_type);
                    }
                }
            }
            other => tracing::debug!(field = other, "Ignoring unknown multipart field"),
        }
    }

    let upload = upload.ok_or_else(|| AppError::BadRequest("File is required".to_string()))?;
    Ok((upload, target))
}

/// Upload an image.
///
/// POST /images (multipart: `file`, `domain`, `view`, `image_type`)
async fn upload(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    multipart: Multipart,
) -> Result<(StatusCode, Json<Image>)> {
    let (upload, target) = read_upload(multipart).await?;
    let image = ImageService::new(state.pool(), state.storage())
        .upload(user.id, upload, target)
        .await?;
    Ok((StatusCode::CREATED, Json(image)))
}

/// GET /images?domain=&view=&status=
async fn list(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Query(filter): Query<ImageFilter>,
) -> Result<Json<Vec<Image>>> {
    let images = ImageService::new(state.pool(), state.storage())
        .list(user.id, &filter)
        .await?;
    Ok(Json(images))
}

/// GET /images/:id
async fn show(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(id): Path<i32>,
) -> Result<Json<Image>> {
    let image = ImageService::new(state.pool(), state.storage())
        .get(ImageId::new(id), user.id)
        .await?;
    Ok(Json(image))
}

/// GET /images/:id/url
async fn url(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(id): Path<i32>,
) -> Result<Json<ImageUrl>> {
    let url = ImageService::new(state.pool(), state.storage())
        .url(ImageId::new(id), user.id)
        .await?;
    Ok(Json(url))
}

/// PATCH /images/:id
async fn update(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(id): Path<i32>,
    Json(body): Json<ImageUpdate>,
) -> Result<Json<Image>> {
    let image = ImageService::new(state.pool(), state.storage())
        .update(ImageId::new(id), user.id, &body)
        .await?;
    Ok(Json(image))
}

/// PATCH /images/:id/processed
async fn mark_processed(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(id): Path<i32>,
    Json(body): Json<ProcessedRequest>,
) -> Result<Json<Image>> {
    let image = ImageService::new(state.pool(), state.storage())
        .mark_processed(ImageId::new(id), user.id, &body.analysis_result)
        .await?;
    Ok(Json(image))
}

/// PATCH /images/:id/failed?error_message=
async fn mark_failed(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(id): Path<i32>,
    Query(query): Query<FailedQuery>,
) -> Result<Json<Image>> {
    let image = ImageService::new(state.pool(), state.storage())
        .mark_failed(ImageId::new(id), user.id, query.error_message.as_deref())
        .await?;
    Ok(Json(image))
}

/// Delete the file and its record.
///
/// DELETE /images/:id
async fn delete(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(id): Path<i32>,
) -> Result<Json<Deleted>> {
    ImageService::new(state.pool(), state.storage())
        .delete(ImageId::new(id), user.id)
        .await?;
    Ok(Json(Deleted::new("Image deleted successfully")))
}
