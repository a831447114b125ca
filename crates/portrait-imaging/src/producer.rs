// SPDX-FileCopyrightText: 2026 Portrait Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Produces a batch of variations from one base photo.
//!
//! In remote mode every item waits on the shared rate limiter and asks the
//! generation provider for one image. An item that fails remotely is
//! rendered locally instead; an item that fails both ways is skipped, so a
//! batch may come back shorter than requested. Items are processed in order
//! and the output preserves that order.

use std::sync::Arc;
use std::time::Duration;

use image::RgbaImage;
use portrait_config::model::{GenerationMode, PortraitConfig};
use portrait_core::{ImageGenerator, PortraitError, validate_count};
use portrait_resilience::SlidingWindowLimiter;
use tracing::{debug, info, warn};

use crate::background::{BackgroundReplacer, gradient_for};
use crate::filters::{self, FilterParams};
use crate::prompts::prompt_for;
use crate::remote::RemoteImageClient;

/// Which path produced a variation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    Remote,
    Local,
}

impl Strategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Strategy::Remote => "remote",
            Strategy::Local => "local",
        }
    }
}

/// One produced image, PNG or provider-native encoded.
#[derive(Debug, Clone)]
pub struct Variation {
    /// Position in the requested batch.
    pub index: u32,
    pub label: String,
    pub bytes: Vec<u8>,
    pub strategy: Strategy,
}

struct RemoteStage {
    generator: Arc<dyn ImageGenerator>,
    limiter: Arc<SlidingWindowLimiter>,
}

/// Base photo decoded and squared once per batch.
struct PreparedBase {
    square: Arc<RgbaImage>,
}

pub struct VariationProducer {
    remote: Option<RemoteStage>,
    background: Option<BackgroundReplacer>,
}

impl VariationProducer {
    /// A producer that only uses local filters.
    pub fn local() -> Self {
        Self {
            remote: None,
            background: None,
        }
    }

    /// Builds the producer described by `[generation]` and `[background]`.
    ///
    /// Remote mode without an API key degrades to local filters.
    pub fn from_config(config: &PortraitConfig) -> Result<Self, PortraitError> {
        let generation = &config.generation;
        let mut producer = Self::local();

        if generation.mode == GenerationMode::Remote {
            match RemoteImageClient::from_config(generation)? {
                Some(client) => {
                    let limiter = SlidingWindowLimiter::new(
                        generation.max_requests,
                        Duration::from_millis(generation.window_ms),
                        Duration::from_millis(generation.safety_margin_ms),
                    );
                    producer = producer.with_remote(Arc::new(client), Arc::new(limiter));
                }
                None => info!("no generation API key configured, using local filters"),
            }
        }

        if config.background.enabled {
            producer = producer.with_background(BackgroundReplacer::new(
                config.background.segmentation_tool.clone(),
            ));
        }
        Ok(producer)
    }

    pub fn with_remote(
        mut self,
        generator: Arc<dyn ImageGenerator>,
        limiter: Arc<SlidingWindowLimiter>,
    ) -> Self {
        self.remote = Some(RemoteStage { generator, limiter });
        self
    }

    pub fn with_background(mut self, background: BackgroundReplacer) -> Self {
        self.background = Some(background);
        self
    }

    /// Strategy tried first for each item.
    pub fn primary_strategy(&self) -> Strategy {
        if self.remote.is_some() {
            Strategy::Remote
        } else {
            Strategy::Local
        }
    }

    /// Produces up to `count` variations of `base`, in index order.
    ///
    /// `count` outside `[1, 50]` fails before any work is done. In local
    /// mode an undecodable base photo fails the whole call.
    pub async fn produce(&self, base: &[u8], count: u32) -> Result<Vec<Variation>, PortraitError> {
        validate_count(count)?;
        let mut out = Vec::with_capacity(count as usize);

        match &self.remote {
            None => {
                let prepared = self.prepare(base).await?;
                for index in 0..count {
                    match self.render_local(&prepared, index).await {
                        Ok(variation) => out.push(variation),
                        Err(e) => warn!(index, error = %e, "local variation failed, skipping"),
                    }
                }
            }
            Some(remote) => {
                // Decoded lazily: only needed once a remote item fails.
                let mut fallback: Option<Option<PreparedBase>> = None;
                for index in 0..count {
                    match self.produce_remote(remote, base, index).await {
                        Ok(variation) => out.push(variation),
                        Err(e) => {
                            metrics::counter!("portrait_fallbacks_total").increment(1);
                            warn!(
                                index,
                                provider = remote.generator.name(),
                                error = %e,
                                "remote generation failed, falling back to local filters"
                            );
                            match self.fallback(&mut fallback, base, index).await {
                                Ok(variation) => out.push(variation),
                                Err(e) => {
                                    warn!(index, error = %e, "local fallback failed, skipping item")
                                }
                            }
                        }
                    }
                }
            }
        }

        info!(
            requested = count,
            produced = out.len(),
            strategy = self.primary_strategy().as_str(),
            "variation batch finished"
        );
        Ok(out)
    }

    async fn produce_remote(
        &self,
        remote: &RemoteStage,
        base: &[u8],
        index: u32,
    ) -> Result<Variation, PortraitError> {
        remote.limiter.admit().await;
        let prompt = prompt_for(index);
        debug!(index, prompt, "requesting remote variation");
        let bytes = remote.generator.generate(base, prompt).await?;
        metrics::counter!("portrait_variations_total", "strategy" => "remote").increment(1);
        Ok(Variation {
            index,
            label: prompt.to_string(),
            bytes,
            strategy: Strategy::Remote,
        })
    }

    async fn fallback(
        &self,
        cache: &mut Option<Option<PreparedBase>>,
        base: &[u8],
        index: u32,
    ) -> Result<Variation, PortraitError> {
        if cache.is_none() {
            *cache = Some(match self.prepare(base).await {
                Ok(prepared) => Some(prepared),
                Err(e) => {
                    warn!(error = %e, "base photo unusable for local fallback");
                    None
                }
            });
        }
        match cache {
            Some(Some(prepared)) => self.render_local(prepared, index).await,
            _ => Err(PortraitError::InvalidArgument(
                "base image could not be decoded".into(),
            )),
        }
    }

    async fn prepare(&self, base: &[u8]) -> Result<PreparedBase, PortraitError> {
        let bytes = base.to_vec();
        let square = tokio::task::spawn_blocking(move || filters::decode_square(&bytes))
            .await
            .map_err(|e| PortraitError::Internal(format!("decode task failed: {e}")))??;

        let square = match &self.background {
            Some(background) => background.extract_subject(square).await,
            None => square,
        };
        Ok(PreparedBase {
            square: Arc::new(square),
        })
    }

    async fn render_local(
        &self,
        prepared: &PreparedBase,
        index: u32,
    ) -> Result<Variation, PortraitError> {
        let square = Arc::clone(&prepared.square);
        let background = self.background.clone();

        let (label, bytes) = tokio::task::spawn_blocking(move || {
            let params = FilterParams::for_index(index);
            let mut label = format!("local: {}", params.describe());
            let placed;
            let staged: &RgbaImage = match &background {
                Some(replacer) => {
                    label.push_str(&format!(", {} backdrop", gradient_for(index).name));
                    placed = replacer.place(&square, index);
                    &placed
                }
                None => square.as_ref(),
            };
            let out = filters::apply(staged, &params);
            filters::encode_png(&out).map(|bytes| (label, bytes))
        })
        .await
        .map_err(|e| PortraitError::Internal(format!("filter task failed: {e}")))??;

        metrics::counter!("portrait_variations_total", "strategy" => "local").increment(1);
        Ok(Variation {
            index,
            label,
            bytes,
            strategy: Strategy::Local,
        })
    }
}
