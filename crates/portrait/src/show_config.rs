// SPDX-FileCopyrightText: 2026 Portrait Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `portrait config`: prints the resolved configuration as TOML.

use portrait_config::PortraitConfig;
use portrait_core::PortraitError;

const MASK: &str = "********";

/// Renders `config` with secrets masked.
pub fn render_config(config: &PortraitConfig) -> Result<String, PortraitError> {
    let mut shown = config.clone();
    if shown.generation.api_key.is_some() {
        shown.generation.api_key = Some(MASK.to_string());
    }
    toml::to_string_pretty(&shown)
        .map_err(|e| PortraitError::Internal(format!("failed to render config: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn api_key_is_masked() {
        let mut config = PortraitConfig::default();
        config.generation.api_key = Some("sk-secret".into());
        let text = render_config(&config).unwrap();
        assert!(!text.contains("sk-secret"));
        assert!(text.contains(MASK));
        assert!(text.contains("[scheduler]"));
    }

    #[test]
    fn rendered_defaults_load_back() {
        let text = render_config(&PortraitConfig::default()).unwrap();
        let loaded = portrait_config::load_and_validate_str(&text).unwrap();
        assert_eq!(loaded.server.port, PortraitConfig::default().server.port);
    }
}
