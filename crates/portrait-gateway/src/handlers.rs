// SPDX-FileCopyrightText: 2026 Portrait Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP request handlers for the generation backend.

use axum::{
    Json,
    extract::{Multipart, Path, State, rejection::JsonRejection},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use portrait_core::{ControlCommand, ControlReply, PortraitError};
use serde::{Deserialize, Serialize};

use crate::error::{ApiError, ErrorResponse};
use crate::server::AppState;
use crate::service::{BaseSource, GenerationOutcome};

/// Count used when a multipart upload omits `numImages`.
pub const DEFAULT_IMAGE_COUNT: u32 = 10;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: String,
    pub image_count: usize,
    pub uptime_secs: u64,
}

#[derive(Debug, Serialize)]
pub struct GeneratedImage {
    pub filename: String,
}

#[derive(Debug, Serialize)]
pub struct GenerateResponse {
    pub success: bool,
    pub count: usize,
    pub images: Vec<GeneratedImage>,
}

impl From<GenerationOutcome> for GenerateResponse {
    fn from(outcome: GenerationOutcome) -> Self {
        let images: Vec<GeneratedImage> = outcome
            .filenames
            .into_iter()
            .map(|filename| GeneratedImage { filename })
            .collect();
        Self {
            success: true,
            count: images.len(),
            images,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageEntry {
    pub filename: String,
    pub filepath: String,
    pub label: String,
    pub created_at: String,
}

#[derive(Debug, Serialize)]
pub struct ImageListResponse {
    pub success: bool,
    pub count: usize,
    pub images: Vec<ImageEntry>,
}

#[derive(Debug, Serialize)]
pub struct ClearResponse {
    pub success: bool,
    pub message: String,
    pub count: usize,
}

#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub ok: bool,
    pub filename: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Base64Request {
    pub base_photo: String,
    pub num_images: u32,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FromBaseRequest {
    pub num_images: u32,
}

fn json_body<T>(body: Result<Json<T>, JsonRejection>) -> Result<T, ApiError> {
    body.map(|Json(value)| value).map_err(|rejection| {
        ApiError(PortraitError::InvalidArgument(format!(
            "invalid request body: {}",
            rejection.body_text()
        )))
    })
}

fn bad_multipart(e: impl std::fmt::Display) -> ApiError {
    ApiError(PortraitError::InvalidArgument(format!(
        "invalid multipart body: {e}"
    )))
}

/// Extension for an uploaded file, from its name or content type.
fn upload_extension(file_name: Option<&str>, content_type: Option<&str>) -> String {
    let from_name = file_name
        .and_then(|name| name.rsplit_once('.'))
        .map(|(_, ext)| ext.to_ascii_lowercase());
    if let Some(ext) = from_name {
        return if ext == "jpeg" { "jpg".into() } else { ext };
    }
    match content_type.and_then(|ct| ct.strip_prefix("image/")) {
        Some("jpeg") => "jpg".into(),
        Some(sub) if !sub.is_empty() => sub.to_string(),
        _ => "png".into(),
    }
}

/// GET /health
pub async fn get_health(State(state): State<AppState>) -> Result<Json<HealthResponse>, ApiError> {
    let image_count = state.service.store().count().await?;
    Ok(Json(HealthResponse {
        status: "ok".to_string(),
        image_count,
        uptime_secs: state.health.start_time.elapsed().as_secs(),
    }))
}

/// GET /metrics
pub async fn get_metrics(State(state): State<AppState>) -> Response {
    match &state.health.prometheus_render {
        Some(render) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
            render(),
        )
            .into_response(),
        None => (StatusCode::NOT_FOUND, "metrics not enabled").into_response(),
    }
}

/// POST /generate-images
///
/// Multipart: the first field carrying a file is the base photo; `numImages`
/// is the count.
pub async fn post_generate_images(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<GenerateResponse>, ApiError> {
    let mut upload: Option<(Vec<u8>, String)> = None;
    let mut count = DEFAULT_IMAGE_COUNT;

    while let Some(field) = multipart.next_field().await.map_err(bad_multipart)? {
        if field.name() == Some("numImages") {
            let text = field.text().await.map_err(bad_multipart)?;
            count = text.trim().parse().map_err(|_| {
                ApiError(PortraitError::InvalidArgument(format!(
                    "numImages must be an integer, got {text:?}"
                )))
            })?;
        } else if field.file_name().is_some() && upload.is_none() {
            let extension = upload_extension(field.file_name(), field.content_type());
            let data = field.bytes().await.map_err(bad_multipart)?;
            upload = Some((data.to_vec(), extension));
        }
    }

    let (data, extension) = upload.ok_or_else(|| {
        ApiError(PortraitError::InvalidArgument(
            "no base image file in request".into(),
        ))
    })?;
    let outcome = state
        .service
        .generate(BaseSource::Bytes { data, extension }, count)
        .await?;
    Ok(Json(outcome.into()))
}

/// POST /generate-images-base64
pub async fn post_generate_images_base64(
    State(state): State<AppState>,
    body: Result<Json<Base64Request>, JsonRejection>,
) -> Result<Json<GenerateResponse>, ApiError> {
    let body = json_body(body)?;
    let outcome = state
        .service
        .generate(BaseSource::DataUrl(body.base_photo), body.num_images)
        .await?;
    Ok(Json(outcome.into()))
}

/// POST /generate-from-base
pub async fn post_generate_from_base(
    State(state): State<AppState>,
    body: Result<Json<FromBaseRequest>, JsonRejection>,
) -> Result<Json<GenerateResponse>, ApiError> {
    let body = json_body(body)?;
    let outcome = state
        .service
        .generate(BaseSource::Folder, body.num_images)
        .await?;
    Ok(Json(outcome.into()))
}

/// GET /images
pub async fn get_images(
    State(state): State<AppState>,
) -> Result<Json<ImageListResponse>, ApiError> {
    let store = state.service.store();
    let images: Vec<ImageEntry> = state
        .service
        .list_images()
        .await?
        .into_iter()
        .map(|img| ImageEntry {
            filepath: store.dir().join(&img.filename).display().to_string(),
            filename: img.filename,
            label: img.source_prompt,
            created_at: img.created_at.to_rfc3339(),
        })
        .collect();
    Ok(Json(ImageListResponse {
        success: true,
        count: images.len(),
        images,
    }))
}

/// GET /images/{filename}
pub async fn get_image(
    State(state): State<AppState>,
    Path(filename): Path<String>,
) -> Result<Response, ApiError> {
    let bytes = state.service.get_image(&filename).await?;
    let content_type = match filename.rsplit_once('.').map(|(_, ext)| ext) {
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("webp") => "image/webp",
        _ => "image/png",
    };
    Ok(([(header::CONTENT_TYPE, content_type)], bytes).into_response())
}

/// DELETE /images
pub async fn delete_images(State(state): State<AppState>) -> Result<Json<ClearResponse>, ApiError> {
    let count = state.service.clear_images().await?;
    Ok(Json(ClearResponse {
        success: true,
        message: format!("deleted {count} images"),
        count,
    }))
}

/// POST /upload-base
pub async fn post_upload_base(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>, ApiError> {
    while let Some(field) = multipart.next_field().await.map_err(bad_multipart)? {
        if field.name() != Some("image") {
            continue;
        }
        let original = field.file_name().map(str::to_string);
        let data = field.bytes().await.map_err(bad_multipart)?;
        let filename = state
            .service
            .upload_base(&data, original.as_deref())
            .await?;
        return Ok(Json(UploadResponse { ok: true, filename }));
    }
    Err(ApiError(PortraitError::InvalidArgument(
        "multipart field \"image\" is required".into(),
    )))
}

/// POST /control
///
/// Forwards a [`ControlCommand`] to the attached scheduler.
pub async fn post_control(
    State(state): State<AppState>,
    body: Result<Json<ControlCommand>, JsonRejection>,
) -> Response {
    let Some(control) = state.control.clone() else {
        return (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(ErrorResponse {
                success: false,
                error: "scheduler is not running".to_string(),
            }),
        )
            .into_response();
    };
    let command = match json_body(body) {
        Ok(command) => command,
        Err(e) => return e.into_response(),
    };
    tracing::debug!(action = command.action(), "control command received");
    let reply: ControlReply = control.handle(command).await;
    Json(reply).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn upload_extension_prefers_file_name() {
        assert_eq!(upload_extension(Some("me.JPEG"), Some("image/png")), "jpg");
        assert_eq!(upload_extension(Some("me.png"), None), "png");
        assert_eq!(upload_extension(None, Some("image/webp")), "webp");
        assert_eq!(upload_extension(Some("noext"), None), "png");
    }

    #[test]
    fn generate_response_counts_files() {
        let response: GenerateResponse = GenerationOutcome {
            filenames: vec!["a.png".into(), "b.png".into()],
        }
        .into();
        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["success"], true);
        assert_eq!(json["count"], 2);
        assert_eq!(json["images"][1]["filename"], "b.png");
    }

    #[test]
    fn health_response_is_camel_case() {
        let json = serde_json::to_value(HealthResponse {
            status: "ok".into(),
            image_count: 4,
            uptime_secs: 12,
        })
        .unwrap();
        assert_eq!(
            json,
            serde_json::json!({"status": "ok", "imageCount": 4, "uptimeSecs": 12})
        );
    }

    #[test]
    fn base64_request_reads_camel_case() {
        let req: Base64Request =
            serde_json::from_str(r#"{"basePhoto": "data:image/png;base64,AA==", "numImages": 3}"#)
                .unwrap();
        assert_eq!(req.num_images, 3);
        assert!(req.base_photo.starts_with("data:"));
    }
}
