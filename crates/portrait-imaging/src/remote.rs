// SPDX-FileCopyrightText: 2026 Portrait Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP client for the remote image-generation provider.
//!
//! One request produces one image. Requests are a JSON body carrying the
//! base image as base64; the provider answers with base64 image data.
//! There is no retry here: the producer substitutes a local variation when
//! a remote item fails.

use std::time::Duration;

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use portrait_config::model::GenerationConfig;
use portrait_core::{ImageGenerator, PortraitError};
use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue};
use serde::{Deserialize, Serialize};
use tracing::debug;

#[derive(Debug, Serialize)]
struct GenerationRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    image: String,
    size: &'a str,
    n: u32,
    response_format: &'a str,
}

#[derive(Debug, Deserialize)]
struct GenerationResponse {
    #[serde(default)]
    data: Vec<GeneratedImage>,
}

#[derive(Debug, Deserialize)]
struct GeneratedImage {
    b64_json: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorResponse {
    error: ApiErrorBody,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    message: String,
}

/// Client for a provider speaking the images-edit JSON protocol.
#[derive(Debug, Clone)]
pub struct RemoteImageClient {
    client: reqwest::Client,
    base_url: String,
    model: String,
    size: String,
}

impl RemoteImageClient {
    pub fn new(
        api_key: &str,
        base_url: impl Into<String>,
        model: impl Into<String>,
        size: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, PortraitError> {
        let mut headers = HeaderMap::new();
        let bearer = HeaderValue::from_str(&format!("Bearer {api_key}"))
            .map_err(|e| PortraitError::Config(format!("invalid API key header value: {e}")))?;
        headers.insert(AUTHORIZATION, bearer);

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(timeout)
            .build()
            .map_err(|e| PortraitError::FetchFailed {
                message: format!("failed to build HTTP client: {e}"),
                source: Some(Box::new(e)),
            })?;

        Ok(Self {
            client,
            base_url: base_url.into(),
            model: model.into(),
            size: size.into(),
        })
    }

    /// Builds a client from `[generation]`, or `None` when no API key is set.
    pub fn from_config(config: &GenerationConfig) -> Result<Option<Self>, PortraitError> {
        let Some(key) = config.api_key.as_deref().filter(|k| !k.trim().is_empty()) else {
            return Ok(None);
        };
        Self::new(
            key,
            config.api_base_url.clone(),
            config.model.clone(),
            config.image_size.clone(),
            Duration::from_secs(config.timeout_secs),
        )
        .map(Some)
    }

    async fn request(&self, base: &[u8], prompt: &str) -> Result<Vec<u8>, PortraitError> {
        let body = GenerationRequest {
            model: &self.model,
            prompt,
            image: STANDARD.encode(base),
            size: &self.size,
            n: 1,
            response_format: "b64_json",
        };

        let response = self
            .client
            .post(&self.base_url)
            .json(&body)
            .send()
            .await
            .map_err(|e| PortraitError::FetchFailed {
                message: format!("generation request failed: {e}"),
                source: Some(Box::new(e)),
            })?;

        let status = response.status();
        debug!(status = %status, model = %self.model, "generation response received");

        let text = response.text().await.map_err(|e| PortraitError::FetchFailed {
            message: format!("failed to read generation response: {e}"),
            source: Some(Box::new(e)),
        })?;

        if !status.is_success() {
            let message = match serde_json::from_str::<ApiErrorResponse>(&text) {
                Ok(api_err) => api_err.error.message,
                Err(_) => text,
            };
            return Err(PortraitError::UpstreamApi {
                status: status.as_u16(),
                message,
            });
        }

        let parsed: GenerationResponse =
            serde_json::from_str(&text).map_err(|e| PortraitError::UpstreamApi {
                status: status.as_u16(),
                message: format!("unparseable response: {e}"),
            })?;
        let encoded = parsed
            .data
            .into_iter()
            .find_map(|item| item.b64_json)
            .ok_or_else(|| PortraitError::UpstreamApi {
                status: status.as_u16(),
                message: "response contained no image data".into(),
            })?;
        let bytes = STANDARD
            .decode(encoded.trim())
            .map_err(|e| PortraitError::UpstreamApi {
                status: status.as_u16(),
                message: format!("image data is not valid base64: {e}"),
            })?;

        if image::guess_format(&bytes).is_err() {
            return Err(PortraitError::UpstreamApi {
                status: status.as_u16(),
                message: "image data is not a recognized image format".into(),
            });
        }
        Ok(bytes)
    }
}

#[async_trait]
impl ImageGenerator for RemoteImageClient {
    fn name(&self) -> &str {
        "remote"
    }

    async fn generate(&self, base: &[u8], prompt: &str) -> Result<Vec<u8>, PortraitError> {
        self.request(base, prompt).await
    }
}
