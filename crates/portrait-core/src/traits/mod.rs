// SPDX-FileCopyrightText: 2026 Portrait Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Adapter traits at the seams between contexts.
//!
//! All traits use `#[async_trait]` for dynamic dispatch compatibility.

pub mod catalog;
pub mod control;
pub mod generator;
pub mod tab;

pub use catalog::ImageCatalog;
pub use control::ControlSurface;
pub use generator::ImageGenerator;
pub use tab::TabDriver;
