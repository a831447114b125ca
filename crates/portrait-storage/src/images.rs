// SPDX-FileCopyrightText: 2026 Portrait Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Directory-backed store for generated variations.
//!
//! Layout of the storage directory:
//!
//! ```text
//! variation_<unix-millis>_<index>.png   one file per variation
//! base_upload.<ext>                     latest base photo uploaded with a request
//! metadata.json                         [{filename, label, createdAt}, ...]
//! ```
//!
//! Listing is driven by the files on disk; `metadata.json` only supplies
//! labels and timestamps.

use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use portrait_core::{PortraitError, StoredImage};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

pub const METADATA_FILE: &str = "metadata.json";
pub const VARIATION_PREFIX: &str = "variation_";
/// Stem of the copy kept of the most recent request-supplied base photo.
pub const UPLOAD_STEM: &str = "base_upload";

/// Builds the file name for variation `index` of a batch started at `millis`.
///
/// The index is zero-padded so ascending name order is generation order.
pub fn variation_filename(millis: i64, index: u32) -> String {
    format!("{VARIATION_PREFIX}{millis}_{index:02}.png")
}

/// Rejects names that could escape the storage directory.
pub fn validate_filename(name: &str) -> Result<(), PortraitError> {
    let bad = name.is_empty()
        || name.contains('/')
        || name.contains('\\')
        || name.contains("..")
        || name.contains('\0');
    if bad {
        return Err(PortraitError::NotFound(name.to_string()));
    }
    Ok(())
}

fn is_variation(name: &str) -> bool {
    name.starts_with(VARIATION_PREFIX) && name.ends_with(".png")
}

/// Millisecond timestamp embedded in a variation name.
fn embedded_timestamp(name: &str) -> Option<DateTime<Utc>> {
    let millis = name
        .strip_prefix(VARIATION_PREFIX)?
        .split('_')
        .next()?
        .parse::<i64>()
        .ok()?;
    DateTime::from_timestamp_millis(millis)
}

pub struct ImageStore {
    dir: PathBuf,
    // Serializes metadata.json updates, upload replacement and clearing.
    dir_lock: Mutex<()>,
}

impl ImageStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            dir_lock: Mutex::new(()),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_of(&self, filename: &str) -> Result<PathBuf, PortraitError> {
        validate_filename(filename)?;
        Ok(self.dir.join(filename))
    }

    pub async fn ensure_dir(&self) -> Result<(), PortraitError> {
        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(PortraitError::storage)
    }

    /// Writes one variation and returns its path.
    pub async fn save_variation(
        &self,
        filename: &str,
        bytes: &[u8],
    ) -> Result<PathBuf, PortraitError> {
        let path = self.path_of(filename)?;
        tokio::fs::write(&path, bytes)
            .await
            .map_err(PortraitError::storage)?;
        debug!(filename, bytes = bytes.len(), "variation written");
        Ok(path)
    }

    /// Stores a base photo that arrived with a request as `base_upload.<ext>`.
    ///
    /// Each upload supersedes the previous one, whatever its extension.
    pub async fn write_upload(
        &self,
        bytes: &[u8],
        extension: &str,
    ) -> Result<PathBuf, PortraitError> {
        self.ensure_dir().await?;
        let _guard = self.dir_lock.lock().await;
        let path = self
            .dir
            .join(format!("{UPLOAD_STEM}.{}", sanitize_extension(extension)));

        let mut entries = tokio::fs::read_dir(&self.dir)
            .await
            .map_err(PortraitError::storage)?;
        while let Some(entry) = entries.next_entry().await.map_err(PortraitError::storage)? {
            if entry.path() != path && is_upload(&entry.file_name().to_string_lossy()) {
                match tokio::fs::remove_file(entry.path()).await {
                    Ok(()) => {}
                    Err(e) if e.kind() == ErrorKind::NotFound => {}
                    Err(e) => return Err(PortraitError::storage(e)),
                }
            }
        }

        tokio::fs::write(&path, bytes)
            .await
            .map_err(PortraitError::storage)?;
        debug!(path = %path.display(), "stored uploaded base photo");
        Ok(path)
    }

    /// Appends entries to `metadata.json`, creating it if needed.
    pub async fn append_metadata(&self, entries: &[StoredImage]) -> Result<(), PortraitError> {
        let _guard = self.dir_lock.lock().await;
        let mut all = self.read_metadata().await;
        all.extend_from_slice(entries);

        let json = serde_json::to_vec_pretty(&all)
            .map_err(|e| PortraitError::Internal(format!("metadata serialization: {e}")))?;
        let tmp = self.dir.join(format!("{METADATA_FILE}.tmp"));
        tokio::fs::write(&tmp, json)
            .await
            .map_err(PortraitError::storage)?;
        tokio::fs::rename(&tmp, self.dir.join(METADATA_FILE))
            .await
            .map_err(PortraitError::storage)?;
        Ok(())
    }

    /// Metadata entries on disk; a missing or corrupt file reads as empty.
    async fn read_metadata(&self) -> Vec<StoredImage> {
        match tokio::fs::read(self.dir.join(METADATA_FILE)).await {
            Ok(bytes) => serde_json::from_slice(&bytes).unwrap_or_else(|e| {
                warn!(error = %e, "metadata.json is unreadable, starting a new one");
                Vec::new()
            }),
            Err(e) if e.kind() == ErrorKind::NotFound => Vec::new(),
            Err(e) => {
                warn!(error = %e, "failed to read metadata.json");
                Vec::new()
            }
        }
    }

    /// Variations currently on disk, in ascending filename order.
    pub async fn list(&self) -> Result<Vec<StoredImage>, PortraitError> {
        let names = self.variation_names().await?;
        let known: HashMap<String, StoredImage> = self
            .read_metadata()
            .await
            .into_iter()
            .map(|entry| (entry.filename.clone(), entry))
            .collect();

        Ok(names
            .into_iter()
            .map(|name| match known.get(&name) {
                Some(entry) => entry.clone(),
                None => StoredImage {
                    created_at: embedded_timestamp(&name).unwrap_or_else(Utc::now),
                    source_prompt: String::new(),
                    filename: name,
                },
            })
            .collect())
    }

    pub async fn count(&self) -> Result<usize, PortraitError> {
        Ok(self.variation_names().await?.len())
    }

    async fn variation_names(&self) -> Result<Vec<String>, PortraitError> {
        let mut names = Vec::new();
        let mut entries = match tokio::fs::read_dir(&self.dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(names),
            Err(e) => return Err(PortraitError::storage(e)),
        };
        while let Some(entry) = entries.next_entry().await.map_err(PortraitError::storage)? {
            if let Some(name) = entry.file_name().to_str() {
                if is_variation(name) {
                    names.push(name.to_string());
                }
            }
        }
        names.sort();
        Ok(names)
    }

    /// Raw bytes of a stored file.
    pub async fn read(&self, filename: &str) -> Result<Vec<u8>, PortraitError> {
        let path = self.path_of(filename)?;
        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                Err(PortraitError::NotFound(filename.to_string()))
            }
            Err(e) => Err(PortraitError::storage(e)),
        }
    }

    /// Deletes every variation, uploaded base photo and the metadata file.
    ///
    /// Returns the number of variations removed; an empty or missing
    /// directory yields zero.
    pub async fn clear(&self) -> Result<usize, PortraitError> {
        let _guard = self.dir_lock.lock().await;
        let mut entries = match tokio::fs::read_dir(&self.dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(0),
            Err(e) => return Err(PortraitError::storage(e)),
        };

        let mut removed = 0;
        while let Some(entry) = entries.next_entry().await.map_err(PortraitError::storage)? {
            let Some(name) = entry.file_name().to_str().map(str::to_owned) else {
                continue;
            };
            let variation = is_variation(&name);
            if !(variation || is_upload(&name) || name == METADATA_FILE) {
                continue;
            }
            match tokio::fs::remove_file(entry.path()).await {
                Ok(()) => {
                    if variation {
                        removed += 1;
                    }
                }
                // Another clear got there first.
                Err(e) if e.kind() == ErrorKind::NotFound => {}
                Err(e) => return Err(PortraitError::storage(e)),
            }
        }
        info!(removed, dir = %self.dir.display(), "image store cleared");
        Ok(removed)
    }
}

fn is_upload(name: &str) -> bool {
    name.strip_prefix(UPLOAD_STEM)
        .is_some_and(|rest| rest.starts_with('.'))
}

fn sanitize_extension(ext: &str) -> String {
    let ext: String = ext
        .trim_start_matches('.')
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .take(8)
        .collect::<String>()
        .to_ascii_lowercase();
    if ext.is_empty() { "png".into() } else { ext }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(name: &str, label: &str) -> StoredImage {
        StoredImage {
            filename: name.into(),
            source_prompt: label.into(),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn filenames_sort_in_generation_order() {
        let mut names: Vec<_> = [10, 2, 0].iter().map(|i| variation_filename(1700, *i)).collect();
        names.sort();
        assert_eq!(
            names,
            vec![
                "variation_1700_00.png",
                "variation_1700_02.png",
                "variation_1700_10.png"
            ]
        );
    }

    #[test]
    fn traversal_names_are_not_found() {
        for name in ["", "../etc/passwd", "a/b.png", "..", "x\\y.png"] {
            assert!(matches!(
                validate_filename(name),
                Err(PortraitError::NotFound(_))
            ));
        }
        assert!(validate_filename("variation_1_00.png").is_ok());
    }

    #[tokio::test]
    async fn save_list_read_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = ImageStore::new(dir.path().join("images"));
        store.ensure_dir().await.unwrap();

        let a = variation_filename(1_700_000_000_000, 0);
        let b = variation_filename(1_700_000_000_000, 1);
        store.save_variation(&b, b"bbb").await.unwrap();
        store.save_variation(&a, b"aaa").await.unwrap();
        store.append_metadata(&[entry(&a, "first")]).await.unwrap();

        let listed = store.list().await.unwrap();
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].filename, a);
        assert_eq!(listed[0].source_prompt, "first");
        // No metadata entry: timestamp comes from the name.
        assert_eq!(listed[1].source_prompt, "");
        assert_eq!(listed[1].created_at.timestamp_millis(), 1_700_000_000_000);

        assert_eq!(store.read(&a).await.unwrap(), b"aaa");
    }

    #[tokio::test]
    async fn uploads_and_metadata_are_not_listed() {
        let dir = tempfile::tempdir().unwrap();
        let store = ImageStore::new(dir.path());
        let upload = store.write_upload(b"jpeg", ".JPG").await.unwrap();
        assert!(upload.extension().is_some_and(|e| e == "jpg"));
        store.append_metadata(&[]).await.unwrap();
        assert!(store.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn each_upload_supersedes_the_previous_one() {
        let dir = tempfile::tempdir().unwrap();
        let store = ImageStore::new(dir.path());
        store.write_upload(b"first", "jpg").await.unwrap();
        store.write_upload(b"second", "jpg").await.unwrap();
        let last = store.write_upload(b"third", "png").await.unwrap();

        let uploads: Vec<String> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .filter(|name| is_upload(name))
            .collect();
        assert_eq!(uploads, ["base_upload.png"]);
        assert_eq!(std::fs::read(last).unwrap(), b"third");
    }

    #[tokio::test]
    async fn metadata_appends_accumulate() {
        let dir = tempfile::tempdir().unwrap();
        let store = ImageStore::new(dir.path());
        store.append_metadata(&[entry("variation_1_00.png", "a")]).await.unwrap();
        store.append_metadata(&[entry("variation_2_00.png", "b")]).await.unwrap();

        let raw = std::fs::read(dir.path().join(METADATA_FILE)).unwrap();
        let json: serde_json::Value = serde_json::from_slice(&raw).unwrap();
        let arr = json.as_array().unwrap();
        assert_eq!(arr.len(), 2);
        assert_eq!(arr[1]["filename"], "variation_2_00.png");
        assert_eq!(arr[1]["label"], "b");
        assert!(arr[1]["createdAt"].is_string());
    }

    #[tokio::test]
    async fn read_missing_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let store = ImageStore::new(dir.path());
        let err = store.read("variation_9_00.png").await.unwrap_err();
        assert!(matches!(err, PortraitError::NotFound(_)));
        let err = store.read("../secret").await.unwrap_err();
        assert!(matches!(err, PortraitError::NotFound(_)));
    }

    #[tokio::test]
    async fn clear_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let store = ImageStore::new(dir.path());
        store.save_variation("variation_1_00.png", b"x").await.unwrap();
        store.save_variation("variation_1_01.png", b"y").await.unwrap();
        store.write_upload(b"base", "png").await.unwrap();
        store.append_metadata(&[entry("variation_1_00.png", "a")]).await.unwrap();

        assert_eq!(store.clear().await.unwrap(), 2);
        assert_eq!(store.clear().await.unwrap(), 0);
        assert_eq!(store.count().await.unwrap(), 0);
        assert!(!dir.path().join(METADATA_FILE).exists());
    }

    #[tokio::test]
    async fn clear_on_missing_directory_reports_zero() {
        let dir = tempfile::tempdir().unwrap();
        let store = ImageStore::new(dir.path().join("never-created"));
        assert_eq!(store.clear().await.unwrap(), 0);
        assert!(store.list().await.unwrap().is_empty());
    }
}
