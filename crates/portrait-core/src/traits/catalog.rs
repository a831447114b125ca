// SPDX-FileCopyrightText: 2026 Portrait Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Read access to the stored image set, as seen by the scheduler.

use async_trait::async_trait;

use crate::error::PortraitError;
use crate::types::StoredImage;

/// Lists stored variations and resolves them to fetchable references.
#[async_trait]
pub trait ImageCatalog: Send + Sync {
    /// Current image set in stable order.
    async fn list_images(&self) -> Result<Vec<StoredImage>, PortraitError>;

    /// URL a page context can fetch the image bytes from.
    fn image_url(&self, filename: &str) -> String;
}
