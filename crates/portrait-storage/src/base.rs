// SPDX-FileCopyrightText: 2026 Portrait Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The single "current" base photo kept in a fixed folder.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use portrait_core::PortraitError;
use tracing::info;

/// Location of the current base photo: `<dir>/<filename>`.
#[derive(Debug, Clone)]
pub struct BaseFolder {
    dir: PathBuf,
    filename: String,
}

impl BaseFolder {
    pub fn new(dir: impl Into<PathBuf>, filename: impl Into<String>) -> Self {
        Self {
            dir: dir.into(),
            filename: filename.into(),
        }
    }

    pub fn path(&self) -> PathBuf {
        self.dir.join(&self.filename)
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn filename(&self) -> &str {
        &self.filename
    }

    /// Reads the current base photo.
    ///
    /// A missing file is bad input from the caller's point of view, so it
    /// maps to `InvalidArgument` naming the expected path.
    pub async fn read(&self) -> Result<Vec<u8>, PortraitError> {
        let path = self.path();
        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == ErrorKind::NotFound => Err(PortraitError::InvalidArgument(
                format!("base photo not found: {}", path.display()),
            )),
            Err(e) => Err(PortraitError::storage(e)),
        }
    }

    /// Replaces the current base photo.
    pub async fn replace(&self, bytes: &[u8]) -> Result<PathBuf, PortraitError> {
        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(PortraitError::storage)?;
        let path = self.path();
        tokio::fs::write(&path, bytes)
            .await
            .map_err(PortraitError::storage)?;
        info!(path = %path.display(), bytes = bytes.len(), "base photo replaced");
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn missing_base_mentions_the_file() {
        let dir = tempfile::tempdir().unwrap();
        let base = BaseFolder::new(dir.path().join("base"), "base.jpg");
        let err = base.read().await.unwrap_err();
        match err {
            PortraitError::InvalidArgument(msg) => assert!(msg.contains("base.jpg")),
            other => panic!("expected InvalidArgument, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn replace_supersedes_previous_photo() {
        let dir = tempfile::tempdir().unwrap();
        let base = BaseFolder::new(dir.path().join("base"), "base.jpg");
        base.replace(b"first").await.unwrap();
        base.replace(b"second").await.unwrap();
        assert_eq!(base.read().await.unwrap(), b"second");
    }
}
