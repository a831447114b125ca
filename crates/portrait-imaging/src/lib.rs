// SPDX-FileCopyrightText: 2026 Portrait Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Variation production for portrait.
//!
//! - [`VariationProducer`] drives a batch, choosing remote or local per item
//! - [`RemoteImageClient`] talks to the generation provider
//! - [`filters`] holds the deterministic local pixel transforms
//! - [`background`] cuts out the subject and composites gradient backdrops

pub mod background;
pub mod filters;
pub mod producer;
pub mod prompts;
pub mod remote;

pub use background::BackgroundReplacer;
pub use producer::{Strategy, Variation, VariationProducer};
pub use remote::RemoteImageClient;
