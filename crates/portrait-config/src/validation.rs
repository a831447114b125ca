// SPDX-FileCopyrightText: 2026 Portrait Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for configuration values.
//!
//! Checks constraints serde attributes cannot express: bind addresses,
//! non-empty paths, non-zero rate-limit windows, parseable URLs.

use crate::diagnostic::ConfigError;
use crate::model::PortraitConfig;

fn invalid(key: &str, message: impl Into<String>) -> ConfigError {
    ConfigError::Validation {
        key: key.to_string(),
        message: message.into(),
    }
}

fn looks_like_http_url(url: &str) -> bool {
    url.starts_with("http://") || url.starts_with("https://")
}

/// Validate a deserialized configuration for semantic correctness.
///
/// Returns `Ok(())` if all validations pass, or `Err(Vec<ConfigError>)` with
/// every collected validation error (does not fail fast).
pub fn validate_config(config: &PortraitConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();

    let host = config.server.host.trim();
    if host.is_empty() {
        errors.push(invalid("server.host", "must not be empty"));
    } else {
        let is_valid_ip = host.parse::<std::net::IpAddr>().is_ok();
        let is_valid_hostname = host
            .chars()
            .all(|c| c.is_alphanumeric() || c == '.' || c == '-');
        if !is_valid_ip && !is_valid_hostname {
            errors.push(invalid(
                "server.host",
                format!("`{host}` is not a valid IP address or hostname"),
            ));
        }
    }

    for (key, value) in [
        ("storage.image_dir", &config.storage.image_dir),
        ("storage.base_dir", &config.storage.base_dir),
        ("storage.base_filename", &config.storage.base_filename),
        ("storage.database_path", &config.storage.database_path),
    ] {
        if value.trim().is_empty() {
            errors.push(invalid(key, "must not be empty"));
        }
    }

    if config.storage.base_filename.contains(['/', '\\']) {
        errors.push(invalid(
            "storage.base_filename",
            "must be a file name, not a path",
        ));
    }

    let generation = &config.generation;
    if generation.max_requests == 0 {
        errors.push(invalid("generation.max_requests", "must be at least 1"));
    }
    if generation.window_ms == 0 {
        errors.push(invalid("generation.window_ms", "must be at least 1"));
    }
    if generation.timeout_secs == 0 {
        errors.push(invalid("generation.timeout_secs", "must be at least 1"));
    }
    if !looks_like_http_url(&generation.api_base_url) {
        errors.push(invalid(
            "generation.api_base_url",
            format!("`{}` is not an http(s) URL", generation.api_base_url),
        ));
    }

    if !looks_like_http_url(&config.scheduler.target_url) {
        errors.push(invalid(
            "scheduler.target_url",
            format!("`{}` is not an http(s) URL", config.scheduler.target_url),
        ));
    }
    if let Some(backend) = &config.scheduler.backend_url
        && !looks_like_http_url(backend)
    {
        errors.push(invalid(
            "scheduler.backend_url",
            format!("`{backend}` is not an http(s) URL"),
        ));
    }

    if config.automation.poll_interval_ms == 0 {
        errors.push(invalid("automation.poll_interval_ms", "must be at least 1"));
    }
    if config.automation.file_input_attempts == 0 {
        errors.push(invalid(
            "automation.file_input_attempts",
            "must be at least 1",
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn has_error_for(errors: &[ConfigError], wanted: &str) -> bool {
        errors
            .iter()
            .any(|e| matches!(e, ConfigError::Validation { key, .. } if key == wanted))
    }

    #[test]
    fn default_config_validates() {
        let config = PortraitConfig::default();
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn empty_image_dir_fails_validation() {
        let mut config = PortraitConfig::default();
        config.storage.image_dir = "  ".to_string();
        let errors = validate_config(&config).unwrap_err();
        assert!(has_error_for(&errors, "storage.image_dir"));
    }

    #[test]
    fn zero_window_and_requests_collect_both_errors() {
        let mut config = PortraitConfig::default();
        config.generation.max_requests = 0;
        config.generation.window_ms = 0;
        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 2);
        assert!(has_error_for(&errors, "generation.max_requests"));
        assert!(has_error_for(&errors, "generation.window_ms"));
    }

    #[test]
    fn base_filename_must_not_be_a_path() {
        let mut config = PortraitConfig::default();
        config.storage.base_filename = "../etc/passwd".to_string();
        let errors = validate_config(&config).unwrap_err();
        assert!(has_error_for(&errors, "storage.base_filename"));
    }

    #[test]
    fn non_http_target_url_fails_validation() {
        let mut config = PortraitConfig::default();
        config.scheduler.target_url = "ftp://example.com".to_string();
        config.scheduler.backend_url = Some("localhost:3000".to_string());
        let errors = validate_config(&config).unwrap_err();
        assert!(has_error_for(&errors, "scheduler.target_url"));
        assert!(has_error_for(&errors, "scheduler.backend_url"));
    }

    #[test]
    fn invalid_host_fails_validation() {
        let mut config = PortraitConfig::default();
        config.server.host = "local host!".to_string();
        let errors = validate_config(&config).unwrap_err();
        assert!(has_error_for(&errors, "server.host"));
    }
}
