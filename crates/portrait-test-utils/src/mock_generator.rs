// SPDX-FileCopyrightText: 2026 Portrait Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock generation provider for deterministic testing.

use std::collections::VecDeque;

use async_trait::async_trait;
use portrait_core::{ImageGenerator, PortraitError};
use tokio::sync::Mutex;

use crate::fixtures::sample_png;

/// An `ImageGenerator` that replays queued outcomes.
///
/// Outcomes are popped from a FIFO queue. When the queue is empty a small
/// PNG is returned. Every prompt is recorded.
pub struct MockGenerator {
    outcomes: Mutex<VecDeque<Result<Vec<u8>, u16>>>,
    prompts: Mutex<Vec<String>>,
}

impl MockGenerator {
    pub fn new() -> Self {
        Self {
            outcomes: Mutex::new(VecDeque::new()),
            prompts: Mutex::new(Vec::new()),
        }
    }

    /// Queues a provider error with the given HTTP status.
    pub async fn fail_next(&self, status: u16) {
        self.outcomes.lock().await.push_back(Err(status));
    }

    /// Queues a successful response with the given bytes.
    pub async fn respond_next(&self, bytes: Vec<u8>) {
        self.outcomes.lock().await.push_back(Ok(bytes));
    }

    pub async fn prompts(&self) -> Vec<String> {
        self.prompts.lock().await.clone()
    }
}

impl Default for MockGenerator {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ImageGenerator for MockGenerator {
    fn name(&self) -> &str {
        "mock"
    }

    async fn generate(&self, _base: &[u8], prompt: &str) -> Result<Vec<u8>, PortraitError> {
        self.prompts.lock().await.push(prompt.to_string());
        match self.outcomes.lock().await.pop_front() {
            Some(Ok(bytes)) => Ok(bytes),
            Some(Err(status)) => Err(PortraitError::UpstreamApi {
                status,
                message: "mock provider failure".into(),
            }),
            None => Ok(sample_png(16, 16)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn replays_queue_then_defaults() {
        let generator = MockGenerator::new();
        generator.fail_next(503).await;
        generator.respond_next(vec![1, 2, 3]).await;

        let first = generator.generate(b"base", "a").await;
        assert!(matches!(
            first,
            Err(PortraitError::UpstreamApi { status: 503, .. })
        ));
        assert_eq!(generator.generate(b"base", "b").await.unwrap(), vec![1, 2, 3]);
        let fallback = generator.generate(b"base", "c").await.unwrap();
        assert!(image::load_from_memory(&fallback).is_ok());
        assert_eq!(generator.prompts().await, ["a", "b", "c"]);
    }
}
