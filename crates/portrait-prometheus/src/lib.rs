// SPDX-FileCopyrightText: 2026 Portrait Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Prometheus exporter for portrait.
//!
//! Installs the metrics-rs Prometheus recorder. The rendered text format is
//! served by the gateway's `/metrics` endpoint.

pub mod recording;

use std::sync::Arc;

use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use portrait_core::PortraitError;

pub use recording::register_metrics;

/// Renders the collected metrics in Prometheus text format.
pub type RenderFn = Arc<dyn Fn() -> String + Send + Sync>;

pub struct PrometheusExporter {
    handle: PrometheusHandle,
}

impl PrometheusExporter {
    /// Installs the recorder globally and describes portrait's metrics.
    ///
    /// Only one recorder can be installed per process; a second call fails.
    pub fn install() -> Result<Self, PortraitError> {
        let handle = PrometheusBuilder::new().install_recorder().map_err(|e| {
            PortraitError::Internal(format!("failed to install Prometheus recorder: {e}"))
        })?;
        register_metrics();
        tracing::info!("prometheus metrics recorder installed");
        Ok(Self { handle })
    }

    pub fn render(&self) -> String {
        self.handle.render()
    }

    /// A cloneable render closure for the gateway health state.
    pub fn render_fn(&self) -> RenderFn {
        let handle = self.handle.clone();
        Arc::new(move || handle.render())
    }
}
