// SPDX-FileCopyrightText: 2026 Portrait Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The page the automator drives, and its timing parameters.

use std::time::Duration;

use async_trait::async_trait;
use portrait_config::model::AutomationConfig;
use portrait_core::PortraitError;

use crate::dom::{Document, NodeId};

/// An image fetched for upload, named as it was stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileBlob {
    pub name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

/// Operations the automator needs from the target document.
///
/// Node ids refer to the most recent [`Page::snapshot`].
#[async_trait]
pub trait Page: Send + Sync {
    /// Current document URL.
    fn url(&self) -> String;

    async fn snapshot(&self) -> Document;

    async fn click(&self, node: NodeId) -> Result<(), PortraitError>;

    /// Replaces the file list of a file input.
    async fn set_input_files(&self, node: NodeId, file: FileBlob) -> Result<(), PortraitError>;

    /// Fires a bubbling synthetic event (`change`, `input`).
    async fn dispatch_event(&self, node: NodeId, event: &str) -> Result<(), PortraitError>;

    /// Fetches `url`; a non-2xx response is `FetchFailed`.
    async fn fetch(&self, url: &str) -> Result<FileBlob, PortraitError>;

    /// Navigates to `url` and returns once the new document has loaded.
    async fn navigate(&self, url: &str) -> Result<(), PortraitError>;
}

/// Waits and bounds for every polling step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollConfig {
    /// Pause after each click.
    pub settle: Duration,
    pub poll_interval: Duration,
    pub file_input_attempts: u32,
    /// Total wait for the upload indicator to clear.
    pub upload_timeout: Duration,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self::from(&AutomationConfig::default())
    }
}

impl From<&AutomationConfig> for PollConfig {
    fn from(config: &AutomationConfig) -> Self {
        Self {
            settle: config.settle(),
            poll_interval: config.poll_interval(),
            file_input_attempts: config.file_input_attempts.max(1),
            upload_timeout: config.upload_timeout(),
        }
    }
}

impl PollConfig {
    /// Near-zero waits for tests.
    pub fn immediate() -> Self {
        Self {
            settle: Duration::from_millis(1),
            poll_interval: Duration::from_millis(1),
            file_input_attempts: 5,
            upload_timeout: Duration::from_millis(10),
        }
    }
}

/// Guesses a content type from a file name.
pub fn content_type_for(name: &str) -> &'static str {
    match name
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .as_deref()
    {
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("webp") => "image/webp",
        Some("gif") => "image/gif",
        _ => "image/png",
    }
}

/// Fetches an image over HTTP for pages that reach the backend with reqwest.
pub async fn fetch_file(client: &reqwest::Client, url: &str) -> Result<FileBlob, PortraitError> {
    let response = client.get(url).send().await.map_err(|e| PortraitError::FetchFailed {
        message: format!("request to {url} failed: {e}"),
        source: Some(Box::new(e)),
    })?;

    let status = response.status();
    if !status.is_success() {
        return Err(PortraitError::fetch(format!(
            "GET {url} returned {}",
            status.as_u16()
        )));
    }

    let name = url
        .rsplit('/')
        .next()
        .filter(|s| !s.is_empty())
        .unwrap_or("image.png")
        .to_string();
    let content_type = response
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .filter(|ct| ct.starts_with("image/"))
        .map(str::to_string)
        .unwrap_or_else(|| content_type_for(&name).to_string());
    let bytes = response.bytes().await.map_err(|e| PortraitError::FetchFailed {
        message: format!("reading body of {url} failed: {e}"),
        source: Some(Box::new(e)),
    })?;

    Ok(FileBlob {
        name,
        content_type,
        bytes: bytes.to_vec(),
    })
}

#[cfg(test)]
mod tests {
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    #[test]
    fn poll_config_follows_automation_config() {
        let poll = PollConfig::default();
        assert_eq!(poll.settle, Duration::from_millis(1500));
        assert_eq!(poll.poll_interval, Duration::from_millis(500));
        assert_eq!(poll.file_input_attempts, 20);
        assert_eq!(poll.upload_timeout, Duration::from_secs(15));
    }

    #[test]
    fn content_type_guess() {
        assert_eq!(content_type_for("a.JPG"), "image/jpeg");
        assert_eq!(content_type_for("variation_1_00.png"), "image/png");
        assert_eq!(content_type_for("noext"), "image/png");
    }

    #[tokio::test]
    async fn fetch_file_reads_bytes_and_type() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/images/a.jpg"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-type", "image/jpeg")
                    .set_body_bytes(vec![1u8, 2, 3]),
            )
            .mount(&server)
            .await;

        let blob = fetch_file(&reqwest::Client::new(), &format!("{}/images/a.jpg", server.uri()))
            .await
            .unwrap();
        assert_eq!(blob.name, "a.jpg");
        assert_eq!(blob.content_type, "image/jpeg");
        assert_eq!(blob.bytes, [1, 2, 3]);
    }

    #[tokio::test]
    async fn fetch_file_non_2xx_is_fetch_failed() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let err = fetch_file(&reqwest::Client::new(), &format!("{}/images/x.png", server.uri()))
            .await
            .unwrap_err();
        assert!(matches!(err, PortraitError::FetchFailed { .. }));
        assert!(err.to_string().contains("404"));
    }
}
