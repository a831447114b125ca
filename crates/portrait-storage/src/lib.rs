// SPDX-FileCopyrightText: 2026 Portrait Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Persistence for portrait.
//!
//! Generated variations live as plain files in a directory next to a
//! `metadata.json` summary ([`ImageStore`]). The current base photo is a
//! single file in its own folder ([`BaseFolder`]). Rotation settings are a
//! small key-value table in SQLite ([`SettingsStore`]), accessed through
//! `tokio-rusqlite`'s background thread.

pub mod base;
pub mod database;
pub mod images;
pub mod settings;

pub use base::BaseFolder;
pub use database::Database;
pub use images::ImageStore;
pub use settings::SettingsStore;
