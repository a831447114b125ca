// SPDX-FileCopyrightText: 2026 Portrait Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Integration tests for the portrait configuration system.

use portrait_config::diagnostic::ConfigError;
use portrait_config::model::{GenerationMode, PortraitConfig};
use portrait_config::{load_and_validate_str, load_config_from_str};
use portrait_core::AdvancePolicy;

#[test]
fn valid_toml_deserializes_into_portrait_config() {
    let toml = r#"
[server]
host = "0.0.0.0"
port = 8080
log_level = "debug"

[storage]
image_dir = "/tmp/portrait/images"
base_dir = "/tmp/portrait/base"
base_filename = "me.png"
database_path = "/tmp/portrait/portrait.db"

[generation]
mode = "local"
api_key = "sk-test"
max_requests = 3
window_ms = 1000

[background]
enabled = true
segmentation_tool = "rembg"

[scheduler]
target_url = "https://www.linkedin.com/in/someone/"
advance_policy = "advance-on-confirm"

[automation]
settle_ms = 10
poll_interval_ms = 5
"#;

    let config = load_config_from_str(toml).expect("valid TOML should deserialize");
    assert_eq!(config.server.host, "0.0.0.0");
    assert_eq!(config.server.port, 8080);
    assert_eq!(config.server.log_level, "debug");
    assert_eq!(config.storage.image_dir, "/tmp/portrait/images");
    assert_eq!(config.storage.base_filename, "me.png");
    assert_eq!(config.generation.mode, GenerationMode::Local);
    assert_eq!(config.generation.api_key.as_deref(), Some("sk-test"));
    assert_eq!(config.generation.max_requests, 3);
    assert_eq!(config.generation.window_ms, 1000);
    assert!(config.background.enabled);
    assert_eq!(config.background.segmentation_tool.as_deref(), Some("rembg"));
    assert_eq!(
        config.scheduler.advance_policy,
        AdvancePolicy::AdvanceOnConfirm
    );
    assert_eq!(config.automation.settle_ms, 10);
    assert_eq!(config.automation.poll_interval_ms, 5);
}

#[test]
fn missing_optional_sections_use_defaults() {
    let config = load_config_from_str("").expect("empty TOML should use defaults");

    assert_eq!(config.server.host, "127.0.0.1");
    assert_eq!(config.server.port, 3000);
    assert_eq!(config.server.log_level, "info");
    assert_eq!(config.storage.base_filename, "base.jpg");
    assert_eq!(config.generation.mode, GenerationMode::Remote);
    assert!(config.generation.api_key.is_none());
    assert_eq!(config.generation.max_requests, 5);
    assert_eq!(config.generation.window_ms, 60_000);
    assert!(!config.background.enabled);
    assert_eq!(
        config.scheduler.advance_policy,
        AdvancePolicy::AdvanceOnAttempt
    );
    assert_eq!(config.automation.file_input_attempts, 20);
}

#[test]
fn remote_mode_without_key_is_not_remote() {
    let config = PortraitConfig::default();
    assert!(!config.generation.uses_remote());

    let config = load_config_from_str("[generation]\napi_key = \"sk-1\"\n").unwrap();
    assert!(config.generation.uses_remote());

    let config =
        load_config_from_str("[generation]\napi_key = \"sk-1\"\nmode = \"local\"\n").unwrap();
    assert!(!config.generation.uses_remote());
}

#[test]
fn unknown_field_in_server_produces_error() {
    let toml = r#"
[server]
prot = 8080
"#;

    let err = load_config_from_str(toml).expect_err("should reject unknown field");
    let err_str = format!("{err}");
    assert!(
        err_str.contains("unknown field") || err_str.contains("prot"),
        "error should mention unknown field or the bad key, got: {err_str}"
    );
}

#[test]
fn deny_unknown_fields_at_top_level() {
    let toml = r#"
[telemetry]
enabled = true
"#;

    let err = load_config_from_str(toml).expect_err("unknown section should be rejected");
    let err_str = format!("{err}");
    assert!(
        err_str.contains("unknown field") || err_str.contains("telemetry"),
        "error should mention unknown field, got: {err_str}"
    );
}

#[test]
fn diagnostic_error_suggests_close_key() {
    let toml = r#"
[server]
prot = 8080
"#;

    let errors = load_and_validate_str(toml).expect_err("should produce errors");
    let has_suggestion = errors.iter().any(|e| {
        matches!(e, ConfigError::UnknownKey { key, suggestion, hint, span, .. } if {
            key == "server.prot"
                && suggestion.as_deref() == Some("server.port")
                && hint.contains("host")
                && span.is_some()
        })
    });
    assert!(has_suggestion, "expected suggestion for `prot`, got: {errors:?}");
}

#[test]
fn key_under_the_wrong_table_names_its_section() {
    let toml = r#"
[generation]
target_url = "https://www.linkedin.com/in/me/"
"#;

    let errors = load_and_validate_str(toml).expect_err("misplaced key must fail");
    match &errors[..] {
        [ConfigError::UnknownKey {
            key,
            suggestion,
            hint,
            ..
        }] => {
            assert_eq!(key, "generation.target_url");
            assert_eq!(suggestion.as_deref(), Some("scheduler.target_url"));
            assert!(hint.contains("[scheduler]"), "{hint}");
        }
        other => panic!("expected one UnknownKey, got {other:?}"),
    }
}

#[test]
fn misspelt_advance_policy_suggests_a_variant() {
    let toml = r#"
[scheduler]
advance_policy = "advance-on-confrim"
"#;

    let errors = load_and_validate_str(toml).expect_err("bad variant must fail");
    assert!(
        errors.iter().any(|e| matches!(e, ConfigError::InvalidValue { key, hint, .. }
            if key == "scheduler.advance_policy" && hint.contains("`advance-on-confirm`"))),
        "{errors:?}"
    );
}

#[test]
fn wrong_type_is_a_dotted_invalid_value() {
    let errors = load_and_validate_str("[server]\nport = \"eighty\"\n")
        .expect_err("string port must fail");
    assert!(
        errors
            .iter()
            .any(|e| matches!(e, ConfigError::InvalidValue { key, .. } if key == "server.port")),
        "{errors:?}"
    );
}

#[test]
fn section_table_matches_the_model() {
    use std::collections::BTreeSet;

    use portrait_config::model::SECTION_KEYS;

    let mut config = PortraitConfig::default();
    config.generation.api_key = Some("k".into());
    config.background.segmentation_tool = Some("rembg".into());
    config.scheduler.backend_url = Some("http://127.0.0.1:3000".into());
    let value = toml::Value::try_from(&config).unwrap();
    let table = value.as_table().unwrap();

    assert_eq!(
        table.keys().map(String::as_str).collect::<BTreeSet<_>>(),
        SECTION_KEYS.iter().map(|(name, _)| *name).collect::<BTreeSet<_>>()
    );
    for (section, keys) in SECTION_KEYS {
        let serialized: BTreeSet<&str> = table[*section]
            .as_table()
            .unwrap()
            .keys()
            .map(String::as_str)
            .collect();
        assert_eq!(
            serialized,
            keys.iter().copied().collect::<BTreeSet<_>>(),
            "[{section}]"
        );
    }
}

#[test]
fn invalid_type_is_reported() {
    let toml = r#"
[server]
port = "not_a_number"
"#;

    let err = load_config_from_str(toml).expect_err("should reject invalid type");
    let err_str = format!("{err}");
    assert!(
        err_str.contains("invalid type") || err_str.contains("port"),
        "error should mention type mismatch, got: {err_str}"
    );
}

#[test]
fn invalid_advance_policy_is_rejected() {
    let toml = r#"
[scheduler]
advance_policy = "advance-sometimes"
"#;
    assert!(load_config_from_str(toml).is_err());
}

#[test]
fn validation_errors_surface_through_load_and_validate() {
    let toml = r#"
[generation]
max_requests = 0
"#;

    let errors = load_and_validate_str(toml).expect_err("zero max_requests must fail");
    assert!(errors.iter().any(
        |e| matches!(e, ConfigError::Validation { key, .. } if key == "generation.max_requests")
    ));
}

#[test]
fn config_error_renders_with_miette() {
    use miette::GraphicalReportHandler;

    let error = ConfigError::UnknownKey {
        key: "server.prot".to_string(),
        suggestion: Some("server.port".to_string()),
        hint: "did you mean `port`?".to_string(),
        span: None,
        src: None,
    };

    let handler = GraphicalReportHandler::new();
    let mut buf = String::new();
    handler
        .render_report(&mut buf, &error)
        .expect("should render without error");
    assert!(buf.contains("prot"), "rendered report should mention the key");
}

#[test]
fn dotted_override_mirrors_env_mapping() {
    use figment::{Figment, providers::Serialized};

    let config: PortraitConfig = Figment::new()
        .merge(Serialized::defaults(PortraitConfig::default()))
        .merge(("storage.image_dir", "/srv/portrait"))
        .merge(("generation.api_key", "sk-env"))
        .extract()
        .expect("dotted keys should merge");

    assert_eq!(config.storage.image_dir, "/srv/portrait");
    assert_eq!(config.generation.api_key.as_deref(), Some("sk-env"));
}

#[test]
#[serial_test::serial]
fn env_var_overrides_server_port() {
    // SAFETY: serialised test; no other thread reads the environment concurrently.
    unsafe { std::env::set_var("PORTRAIT_SERVER_PORT", "4123") };
    let dir = std::env::temp_dir().join("portrait-config-env-test.toml");
    std::fs::write(&dir, "[server]\nport = 3001\n").unwrap();

    let result = portrait_config::load_config_from_path(&dir);

    unsafe { std::env::remove_var("PORTRAIT_SERVER_PORT") };
    let _ = std::fs::remove_file(&dir);

    let config = result.expect("env override should load");
    assert_eq!(config.server.port, 4123);
}
