// SPDX-FileCopyrightText: 2026 Portrait Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Generation service: base photo in, stored variations out.
//!
//! Concurrent `generate` calls are not serialized. Filenames carry the
//! batch start time in milliseconds plus the item index, which keeps them
//! apart in practice.

use std::path::PathBuf;
use std::sync::Arc;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use chrono::Utc;
use portrait_core::{PortraitError, StoredImage, validate_count};
use portrait_imaging::VariationProducer;
use portrait_storage::images::variation_filename;
use portrait_storage::{BaseFolder, ImageStore};
use tracing::{info, warn};

/// Where the base photo for a generation call comes from.
#[derive(Debug, Clone)]
pub enum BaseSource {
    /// Uploaded bytes; `extension` names the stored copy.
    Bytes { data: Vec<u8>, extension: String },
    /// A `data:image/...;base64,` URL (a bare base64 string is accepted too).
    DataUrl(String),
    /// The current photo in the base folder.
    Folder,
}

/// Files actually written by one `generate` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationOutcome {
    pub filenames: Vec<String>,
}

pub struct GenerationService {
    producer: Arc<VariationProducer>,
    store: Arc<ImageStore>,
    base: BaseFolder,
}

impl GenerationService {
    pub fn new(producer: Arc<VariationProducer>, store: Arc<ImageStore>, base: BaseFolder) -> Self {
        Self {
            producer,
            store,
            base,
        }
    }

    pub fn store(&self) -> &ImageStore {
        &self.store
    }

    pub fn base_photo_path(&self) -> PathBuf {
        self.base.path()
    }

    /// Produces `count` variations of `source` and stores them.
    ///
    /// The result may list fewer files than requested when items failed.
    pub async fn generate(
        &self,
        source: BaseSource,
        count: u32,
    ) -> Result<GenerationOutcome, PortraitError> {
        validate_count(count)?;
        let base = self.resolve_base(source).await?;
        self.store.ensure_dir().await?;

        let variations = self.producer.produce(&base, count).await?;
        let batch_millis = Utc::now().timestamp_millis();

        let mut written = Vec::with_capacity(variations.len());
        for variation in variations {
            let filename = variation_filename(batch_millis, variation.index);
            match self.store.save_variation(&filename, &variation.bytes).await {
                Ok(_) => written.push(StoredImage {
                    filename,
                    source_prompt: variation.label,
                    created_at: Utc::now(),
                }),
                Err(e) => warn!(filename = %filename, error = %e, "failed to store variation"),
            }
        }

        if !written.is_empty() {
            self.store.append_metadata(&written).await?;
        }

        info!(requested = count, written = written.len(), "generation finished");
        Ok(GenerationOutcome {
            filenames: written.into_iter().map(|img| img.filename).collect(),
        })
    }

    async fn resolve_base(&self, source: BaseSource) -> Result<Vec<u8>, PortraitError> {
        match source {
            BaseSource::Bytes { data, extension } => {
                if data.is_empty() {
                    return Err(PortraitError::InvalidArgument(
                        "uploaded base photo is empty".into(),
                    ));
                }
                self.store.write_upload(&data, &extension).await?;
                Ok(data)
            }
            BaseSource::DataUrl(url) => {
                let (data, extension) = decode_data_url(&url)?;
                self.store.write_upload(&data, &extension).await?;
                Ok(data)
            }
            BaseSource::Folder => self.base.read().await,
        }
    }

    pub async fn list_images(&self) -> Result<Vec<StoredImage>, PortraitError> {
        self.store.list().await
    }

    pub async fn get_image(&self, filename: &str) -> Result<Vec<u8>, PortraitError> {
        self.store.read(filename).await
    }

    /// Deletes every stored variation. Safe to repeat.
    pub async fn clear_images(&self) -> Result<usize, PortraitError> {
        self.store.clear().await
    }

    /// Replaces the base photo in the base folder and returns its file name.
    pub async fn upload_base(
        &self,
        bytes: &[u8],
        original_name: Option<&str>,
    ) -> Result<String, PortraitError> {
        if bytes.is_empty() {
            return Err(PortraitError::InvalidArgument(
                "uploaded base photo is empty".into(),
            ));
        }
        self.base.replace(bytes).await?;
        info!(original = original_name.unwrap_or("-"), "base photo uploaded");
        Ok(self.base.filename().to_string())
    }
}

/// Splits a data URL into raw bytes and a file extension.
pub fn decode_data_url(url: &str) -> Result<(Vec<u8>, String), PortraitError> {
    let url = url.trim();
    let (mime, payload) = match url.strip_prefix("data:") {
        Some(rest) => {
            let (header, payload) = rest.split_once(',').ok_or_else(|| {
                PortraitError::InvalidArgument("malformed data URL: missing ','".into())
            })?;
            let mime = header
                .strip_suffix(";base64")
                .ok_or_else(|| {
                    PortraitError::InvalidArgument("data URL must be base64 encoded".into())
                })?;
            (mime, payload)
        }
        None => ("image/png", url),
    };

    let data = STANDARD
        .decode(payload.trim())
        .map_err(|e| PortraitError::InvalidArgument(format!("invalid base64 image data: {e}")))?;
    if data.is_empty() {
        return Err(PortraitError::InvalidArgument("base photo is empty".into()));
    }

    let extension = match mime.strip_prefix("image/") {
        Some("jpeg") => "jpg".to_string(),
        Some(sub) if !sub.is_empty() => sub.to_string(),
        _ => "png".to_string(),
    };
    Ok((data, extension))
}
