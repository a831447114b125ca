// SPDX-FileCopyrightText: 2026 Portrait Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Adapter trait for external image-generation providers.

use async_trait::async_trait;

use crate::error::PortraitError;

/// Produces one derived image from a base image and a text prompt.
///
/// Implementations talk to a network API; callers are expected to gate
/// calls through a rate limiter.
#[async_trait]
pub trait ImageGenerator: Send + Sync {
    /// Short provider name for logs.
    fn name(&self) -> &str;

    /// Returns the encoded bytes of exactly one generated image.
    async fn generate(&self, base: &[u8], prompt: &str) -> Result<Vec<u8>, PortraitError>;
}
