// SPDX-FileCopyrightText: 2026 Portrait Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `portrait status`: queries a running server's health endpoint.

use std::io::IsTerminal;
use std::time::Duration;

use portrait_config::PortraitConfig;
use portrait_core::PortraitError;
use portrait_scheduler::{BackendClient, BackendHealth};
use serde::Serialize;

const STATUS_TIMEOUT: Duration = Duration::from_secs(3);

/// Structured status output for `--json` mode.
#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub running: bool,
    pub status: String,
    pub image_count: Option<usize>,
    pub uptime_secs: Option<u64>,
    pub endpoint: String,
}

impl StatusResponse {
    fn from_health(endpoint: String, health: Result<BackendHealth, PortraitError>) -> Self {
        match health {
            Ok(health) => Self {
                running: true,
                status: health.status,
                image_count: Some(health.image_count),
                uptime_secs: Some(health.uptime_secs),
                endpoint,
            },
            Err(e) => {
                tracing::debug!(error = %e, "health check failed");
                Self {
                    running: false,
                    status: "not running".to_string(),
                    image_count: None,
                    uptime_secs: None,
                    endpoint,
                }
            }
        }
    }
}

pub async fn run_status(
    config: &PortraitConfig,
    json: bool,
    plain: bool,
) -> Result<(), PortraitError> {
    let client = BackendClient::new(config.server.base_url(), STATUS_TIMEOUT)?;
    let endpoint = format!("{}/health", client.base_url());
    let status = StatusResponse::from_health(endpoint, client.health().await);

    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&status).unwrap_or_else(|_| "{}".to_string())
        );
    } else {
        let use_color = !plain && std::io::stdout().is_terminal();
        print_status(&status, use_color);
    }
    Ok(())
}

fn format_uptime(secs: u64) -> String {
    let (hours, minutes, seconds) = (secs / 3600, (secs % 3600) / 60, secs % 60);
    if hours > 0 {
        format!("{hours}h {minutes}m")
    } else if minutes > 0 {
        format!("{minutes}m {seconds}s")
    } else {
        format!("{seconds}s")
    }
}

fn print_status(status: &StatusResponse, use_color: bool) {
    use colored::Colorize;

    println!();
    println!("  portrait status");
    println!("  {}", "-".repeat(35));
    match (status.running, use_color) {
        (true, true) => println!("    State:    {} {}", "✓".green(), status.status.green()),
        (true, false) => println!("    State:    [OK] {}", status.status),
        (false, true) => println!("    State:    {} {}", "✗".red(), "not running".red()),
        (false, false) => println!("    State:    [FAIL] not running"),
    }
    if let Some(count) = status.image_count {
        println!("    Images:   {count}");
    }
    if let Some(uptime) = status.uptime_secs {
        println!("    Uptime:   {}", format_uptime(uptime));
    }
    println!("    Endpoint: {}", status.endpoint);
    if !status.running {
        println!();
        println!("  Start with: portrait serve");
    }
    println!();
}
