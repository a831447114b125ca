// SPDX-FileCopyrightText: 2026 Portrait Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Generation backend for portrait.
//!
//! Serves the loopback HTTP surface over [`service::GenerationService`] and
//! hosts the tab bridge page agents connect to. The scheduler reaches pages
//! through [`tabs::TabBridge`], which implements `TabDriver`.

pub mod error;
pub mod handlers;
pub mod server;
pub mod service;
pub mod tabs;
pub mod ws;

pub use error::ApiError;
pub use server::{
    AppState, HealthState, ServerConfig, build_router, serve_listener, start_server,
};
pub use service::{BaseSource, GenerationOutcome, GenerationService};
pub use tabs::TabBridge;
