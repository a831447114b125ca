// SPDX-FileCopyrightText: 2026 Portrait Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for portrait.
//!
//! This crate provides the error taxonomy, the persisted domain types, the
//! command enums exchanged between the scheduler and page contexts, and the
//! adapter traits the other crates implement.

pub mod command;
pub mod error;
pub mod traits;
pub mod types;

// Re-export key items at crate root for ergonomic imports.
pub use command::{BridgeFrame, ControlCommand, ControlReply, PageAck, PageCommand, PageFrame};
pub use error::PortraitError;
pub use types::{
    AdvancePolicy, Frequency, MAX_IMAGE_COUNT, MIN_IMAGE_COUNT, Settings,
    StoredImage, TabId, validate_count,
};

pub use traits::{ControlSurface, ImageCatalog, ImageGenerator, TabDriver};
