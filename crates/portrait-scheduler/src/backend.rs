// SPDX-FileCopyrightText: 2026 Portrait Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP client for the local generation backend.
//!
//! The scheduler context reaches stored images and generation only through
//! this client, the same way a separate process would.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use portrait_core::{ImageCatalog, PortraitError, StoredImage};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Request timeout for backend calls. Generation of a full batch against a
/// rate-limited provider can take several minutes.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(600);

#[derive(Debug, Clone)]
pub struct BackendClient {
    client: reqwest::Client,
    base_url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackendHealth {
    pub status: String,
    pub image_count: usize,
    #[serde(default)]
    pub uptime_secs: u64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ImageEntry {
    filename: String,
    #[serde(default)]
    label: String,
    #[serde(default)]
    created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
struct ImageListResponse {
    images: Vec<ImageEntry>,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    count: usize,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct FromBaseRequest {
    num_images: u32,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct Base64Request<'a> {
    base_photo: &'a str,
    num_images: u32,
}

impl BackendClient {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, PortraitError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| PortraitError::FetchFailed {
                message: format!("failed to build HTTP client: {e}"),
                source: Some(Box::new(e)),
            })?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub async fn health(&self) -> Result<BackendHealth, PortraitError> {
        self.get_json("/health").await
    }

    /// Generates from the backend's base-folder photo; returns the stored count.
    pub async fn generate_from_base(&self, count: u32) -> Result<usize, PortraitError> {
        let body = FromBaseRequest { num_images: count };
        let resp: GenerateResponse = self.post_json("/generate-from-base", &body).await?;
        Ok(resp.count)
    }

    /// Generates from a data-URL encoded photo; returns the stored count.
    pub async fn generate_from_data_url(
        &self,
        data_url: &str,
        count: u32,
    ) -> Result<usize, PortraitError> {
        let body = Base64Request {
            base_photo: data_url,
            num_images: count,
        };
        let resp: GenerateResponse = self.post_json("/generate-images-base64", &body).await?;
        Ok(resp.count)
    }

    async fn get_json<T: serde::de::DeserializeOwned>(&self, path: &str) -> Result<T, PortraitError> {
        let url = format!("{}{path}", self.base_url);
        let response = self.client.get(&url).send().await.map_err(transport_error)?;
        decode(response).await
    }

    async fn post_json<B: Serialize + ?Sized, T: serde::de::DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, PortraitError> {
        let url = format!("{}{path}", self.base_url);
        let response = self
            .client
            .post(&url)
            .json(body)
            .send()
            .await
            .map_err(transport_error)?;
        decode(response).await
    }
}

fn transport_error(e: reqwest::Error) -> PortraitError {
    PortraitError::FetchFailed {
        message: format!("backend request failed: {e}"),
        source: Some(Box::new(e)),
    }
}

/// Decodes a success body, or maps the backend's error status back onto
/// the matching error class.
async fn decode<T: serde::de::DeserializeOwned>(
    response: reqwest::Response,
) -> Result<T, PortraitError> {
    let status = response.status();
    debug!(status = %status, url = %response.url(), "backend response");
    if status.is_success() {
        return response.json::<T>().await.map_err(|e| PortraitError::FetchFailed {
            message: format!("invalid backend response: {e}"),
            source: Some(Box::new(e)),
        });
    }

    let body = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<ErrorBody>(&body)
        .map(|b| b.error)
        .unwrap_or(body);
    Err(match status.as_u16() {
        400 => PortraitError::InvalidArgument(message),
        404 => PortraitError::NotFound(message),
        code => PortraitError::fetch(format!("backend returned {code}: {message}")),
    })
}

#[async_trait]
impl ImageCatalog for BackendClient {
    async fn list_images(&self) -> Result<Vec<StoredImage>, PortraitError> {
        let resp: ImageListResponse = self.get_json("/images").await?;
        Ok(resp
            .images
            .into_iter()
            .map(|entry| StoredImage {
                filename: entry.filename,
                source_prompt: entry.label,
                created_at: entry.created_at.unwrap_or_else(Utc::now),
            })
            .collect())
    }

    fn image_url(&self, filename: &str) -> String {
        format!("{}/images/{filename}", self.base_url)
    }
}
