// SPDX-FileCopyrightText: 2026 Portrait Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration loader using Figment for layered config merging.
//!
//! Supports XDG hierarchy: `./portrait.toml` > `~/.config/portrait/portrait.toml`
//! > `/etc/portrait/portrait.toml` with environment variable overrides via the
//! `PORTRAIT_` prefix.

#![allow(clippy::result_large_err)] // figment::Error is external and cannot be boxed without wrapper

use std::path::Path;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};

use crate::model::{PortraitConfig, SECTION_KEYS};

/// Load configuration from the standard XDG hierarchy with env var overrides.
///
/// Merge order (later overrides earlier):
/// 1. Compiled defaults
/// 2. `/etc/portrait/portrait.toml` (system-wide)
/// 3. `~/.config/portrait/portrait.toml` (user XDG config)
/// 4. `./portrait.toml` (local directory)
/// 5. `PORTRAIT_*` environment variables
pub fn load_config() -> Result<PortraitConfig, figment::Error> {
    build_figment().extract()
}

/// Load configuration from a TOML string only (no XDG lookup, no env).
///
/// Used for testing and explicit configuration.
pub fn load_config_from_str(toml_content: &str) -> Result<PortraitConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(PortraitConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Load configuration from a specific file path with env var overrides.
pub fn load_config_from_path(path: &Path) -> Result<PortraitConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(PortraitConfig::default()))
        .merge(Toml::file(path))
        .merge(env_provider())
        .extract()
}

/// Build the Figment used internally for config loading (exposed for diagnostic use).
pub fn build_figment() -> Figment {
    Figment::new()
        .merge(Serialized::defaults(PortraitConfig::default()))
        .merge(Toml::file("/etc/portrait/portrait.toml"))
        .merge(Toml::file(
            dirs::config_dir()
                .map(|d| d.join("portrait/portrait.toml"))
                .unwrap_or_default(),
        ))
        .merge(Toml::file("portrait.toml"))
        .merge(env_provider())
}

/// Map a lowercased, prefix-stripped env key onto its dotted config path.
///
/// `generation_api_key` becomes `generation.api_key`; the first underscore after
/// the section name is the only one replaced.
pub fn map_env_key(key: &str) -> String {
    for (section, _) in SECTION_KEYS {
        if let Some(rest) = key.strip_prefix(section).and_then(|r| r.strip_prefix('_')) {
            return format!("{section}.{rest}");
        }
    }
    key.to_string()
}

/// Create the environment variable provider using explicit `map()` for section-to-dot mapping.
///
/// Uses `Env::map()` rather than `Env::split("_")` so that underscore-containing
/// keys such as `PORTRAIT_STORAGE_IMAGE_DIR` map to `storage.image_dir`.
fn env_provider() -> Env {
    Env::prefixed("PORTRAIT_").map(|key| map_env_key(&key.as_str().to_ascii_lowercase()).into())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn env_keys_map_to_sections() {
        assert_eq!(map_env_key("generation_api_key"), "generation.api_key");
        assert_eq!(map_env_key("storage_image_dir"), "storage.image_dir");
        assert_eq!(map_env_key("server_port"), "server.port");
        assert_eq!(
            map_env_key("background_segmentation_tool"),
            "background.segmentation_tool"
        );
        assert_eq!(map_env_key("unrelated"), "unrelated");
    }
}
