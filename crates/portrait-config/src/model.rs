// SPDX-FileCopyrightText: 2026 Portrait Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for portrait.
//!
//! All structs use `#[serde(deny_unknown_fields)]` to reject unrecognized
//! config keys at startup, providing actionable error messages.

use std::time::Duration;

use portrait_core::AdvancePolicy;
use serde::{Deserialize, Serialize};

/// Every section and the keys it accepts, in file order.
///
/// Drives env-var mapping and the suggestions attached to unknown keys.
pub const SECTION_KEYS: &[(&str, &[&str])] = &[
    ("server", &["host", "port", "log_level"]),
    (
        "storage",
        &["image_dir", "base_dir", "base_filename", "database_path"],
    ),
    (
        "generation",
        &[
            "mode",
            "api_key",
            "api_base_url",
            "model",
            "image_size",
            "timeout_secs",
            "max_requests",
            "window_ms",
            "safety_margin_ms",
        ],
    ),
    ("background", &["enabled", "segmentation_tool"]),
    (
        "scheduler",
        &[
            "target_url",
            "advance_policy",
            "load_timeout_secs",
            "ack_timeout_secs",
            "backend_url",
        ],
    ),
    (
        "automation",
        &[
            "profile_marker",
            "settle_ms",
            "poll_interval_ms",
            "file_input_attempts",
            "upload_timeout_ms",
        ],
    ),
];

/// Top-level portrait configuration.
///
/// Loaded from TOML files following the XDG hierarchy, with environment variable
/// overrides. All sections are optional and default to sensible values.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct PortraitConfig {
    /// HTTP server settings.
    #[serde(default)]
    pub server: ServerConfig,

    /// Image directory, base photo folder and settings database.
    #[serde(default)]
    pub storage: StorageConfig,

    /// Variation producer settings.
    #[serde(default)]
    pub generation: GenerationConfig,

    /// Background replacement settings.
    #[serde(default)]
    pub background: BackgroundConfig,

    /// Rotation scheduler settings.
    #[serde(default)]
    pub scheduler: SchedulerConfig,

    /// Page automation timings.
    #[serde(default)]
    pub automation: AutomationConfig,
}

/// HTTP server configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ServerConfig {
    /// Address to bind the loopback server to.
    #[serde(default = "default_host")]
    pub host: String,

    /// Port to listen on.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            log_level: default_log_level(),
        }
    }
}

impl ServerConfig {
    /// Base URL other local components use to reach this server.
    pub fn base_url(&self) -> String {
        format!("http://{}:{}", self.host, self.port)
    }
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    3000
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Storage configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    /// Directory generated variations and `metadata.json` are written to.
    #[serde(default = "default_image_dir")]
    pub image_dir: String,

    /// Folder holding the current base photo.
    #[serde(default = "default_base_dir")]
    pub base_dir: String,

    /// File name of the base photo inside `base_dir`.
    #[serde(default = "default_base_filename")]
    pub base_filename: String,

    /// SQLite database holding the persisted rotation settings.
    #[serde(default = "default_database_path")]
    pub database_path: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            image_dir: default_image_dir(),
            base_dir: default_base_dir(),
            base_filename: default_base_filename(),
            database_path: default_database_path(),
        }
    }
}

fn data_dir() -> std::path::PathBuf {
    dirs::data_dir()
        .map(|p| p.join("portrait"))
        .unwrap_or_else(|| std::path::PathBuf::from("."))
}

fn default_image_dir() -> String {
    data_dir().join("images").to_string_lossy().into_owned()
}

fn default_base_dir() -> String {
    data_dir().join("base").to_string_lossy().into_owned()
}

fn default_base_filename() -> String {
    "base.jpg".to_string()
}

fn default_database_path() -> String {
    data_dir().join("portrait.db").to_string_lossy().into_owned()
}

/// Which strategy the variation producer uses.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum GenerationMode {
    /// Call the remote provider, falling back to local filters per item.
    #[default]
    Remote,
    /// Only use local pixel filters.
    Local,
}

/// Variation producer configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct GenerationConfig {
    /// Remote or local strategy. Remote without an API key behaves as local.
    #[serde(default)]
    pub mode: GenerationMode,

    /// API key for the remote provider.
    #[serde(default)]
    pub api_key: Option<String>,

    /// Endpoint receiving generation requests.
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,

    /// Model identifier sent with every request.
    #[serde(default = "default_model")]
    pub model: String,

    /// Output size requested from the provider.
    #[serde(default = "default_image_size")]
    pub image_size: String,

    /// Per-request timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Admissions per window.
    #[serde(default = "default_max_requests")]
    pub max_requests: usize,

    /// Sliding window length in milliseconds.
    #[serde(default = "default_window_ms")]
    pub window_ms: u64,

    /// Extra wait added once the window is full.
    #[serde(default = "default_safety_margin_ms")]
    pub safety_margin_ms: u64,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            mode: GenerationMode::default(),
            api_key: None,
            api_base_url: default_api_base_url(),
            model: default_model(),
            image_size: default_image_size(),
            timeout_secs: default_timeout_secs(),
            max_requests: default_max_requests(),
            window_ms: default_window_ms(),
            safety_margin_ms: default_safety_margin_ms(),
        }
    }
}

impl GenerationConfig {
    /// Remote generation is only attempted when requested and a key is present.
    pub fn uses_remote(&self) -> bool {
        self.mode == GenerationMode::Remote
            && self.api_key.as_deref().is_some_and(|k| !k.trim().is_empty())
    }
}

fn default_api_base_url() -> String {
    "https://api.openai.com/v1/images/edits".to_string()
}

fn default_model() -> String {
    "gpt-image-1".to_string()
}

fn default_image_size() -> String {
    "1024x1024".to_string()
}

fn default_timeout_secs() -> u64 {
    120
}

fn default_max_requests() -> usize {
    5
}

fn default_window_ms() -> u64 {
    60_000
}

fn default_safety_margin_ms() -> u64 {
    100
}

/// Background replacement configuration.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct BackgroundConfig {
    /// Composite the subject onto a palette gradient before filtering.
    #[serde(default)]
    pub enabled: bool,

    /// External segmentation command (invoked as `<tool> i <input> <output>`).
    /// `None` uses near-white thresholding.
    #[serde(default)]
    pub segmentation_tool: Option<String>,
}

/// Rotation scheduler configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct SchedulerConfig {
    /// Page the scheduler finds or opens before applying an image.
    #[serde(default = "default_target_url")]
    pub target_url: String,

    /// Whether an unconfirmed apply advances the rotation index.
    #[serde(default)]
    pub advance_policy: AdvancePolicy,

    /// Seconds to wait for the target tab to finish loading.
    #[serde(default = "default_load_timeout_secs")]
    pub load_timeout_secs: u64,

    /// Seconds to wait for an apply acknowledgement.
    #[serde(default = "default_ack_timeout_secs")]
    pub ack_timeout_secs: u64,

    /// Backend base URL used by the control surface. Defaults to the local server.
    #[serde(default)]
    pub backend_url: Option<String>,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            target_url: default_target_url(),
            advance_policy: AdvancePolicy::default(),
            load_timeout_secs: default_load_timeout_secs(),
            ack_timeout_secs: default_ack_timeout_secs(),
            backend_url: None,
        }
    }
}

fn default_target_url() -> String {
    "https://www.linkedin.com/in/me/".to_string()
}

fn default_load_timeout_secs() -> u64 {
    30
}

fn default_ack_timeout_secs() -> u64 {
    120
}

/// Page automation timings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct AutomationConfig {
    /// URL fragment identifying the profile page.
    #[serde(default = "default_profile_marker")]
    pub profile_marker: String,

    /// Delay after each click.
    #[serde(default = "default_settle_ms")]
    pub settle_ms: u64,

    /// Interval between polls.
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// Polls for the file input before giving up.
    #[serde(default = "default_file_input_attempts")]
    pub file_input_attempts: u32,

    /// Total wait for the upload indicator to disappear.
    #[serde(default = "default_upload_timeout_ms")]
    pub upload_timeout_ms: u64,
}

impl Default for AutomationConfig {
    fn default() -> Self {
        Self {
            profile_marker: default_profile_marker(),
            settle_ms: default_settle_ms(),
            poll_interval_ms: default_poll_interval_ms(),
            file_input_attempts: default_file_input_attempts(),
            upload_timeout_ms: default_upload_timeout_ms(),
        }
    }
}

impl AutomationConfig {
    pub fn settle(&self) -> Duration {
        Duration::from_millis(self.settle_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn upload_timeout(&self) -> Duration {
        Duration::from_millis(self.upload_timeout_ms)
    }
}

fn default_profile_marker() -> String {
    "linkedin.com/in/".to_string()
}

fn default_settle_ms() -> u64 {
    1500
}

fn default_poll_interval_ms() -> u64 {
    500
}

fn default_file_input_attempts() -> u32 {
    20
}

fn default_upload_timeout_ms() -> u64 {
    15_000
}
