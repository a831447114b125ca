// SPDX-FileCopyrightText: 2026 Portrait Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `portrait serve`: the generation backend, the tab bridge and the
//! rotation scheduler in one process.

use std::sync::Arc;
use std::time::Duration;

use portrait_config::PortraitConfig;
use portrait_core::PortraitError;
use portrait_gateway::{
    AppState, GenerationService, HealthState, ServerConfig, TabBridge, start_server,
};
use portrait_imaging::VariationProducer;
use portrait_prometheus::PrometheusExporter;
use portrait_scheduler::backend::DEFAULT_TIMEOUT;
use portrait_scheduler::{BackendClient, ControlHandler, RotationScheduler, SchedulerOptions};
use portrait_storage::{BaseFolder, ImageStore, SettingsStore};
use tracing::{info, warn};

use crate::shutdown;

pub async fn run_serve(config: PortraitConfig) -> Result<(), PortraitError> {
    info!(version = env!("CARGO_PKG_VERSION"), "starting portrait serve");

    let exporter = match PrometheusExporter::install() {
        Ok(exporter) => Some(exporter),
        Err(e) => {
            warn!(error = %e, "metrics disabled");
            None
        }
    };

    // Generation backend.
    let producer = Arc::new(VariationProducer::from_config(&config)?);
    info!(
        strategy = producer.primary_strategy().as_str(),
        background = config.background.enabled,
        "variation producer ready"
    );
    let store = Arc::new(ImageStore::new(&config.storage.image_dir));
    store.ensure_dir().await?;
    let base = BaseFolder::new(&config.storage.base_dir, &config.storage.base_filename);
    info!(path = %base.path().display(), "base photo location");
    let service = Arc::new(GenerationService::new(producer, store, base));

    // Scheduler context. It reaches stored images through the HTTP surface.
    let tabs = TabBridge::new(Duration::from_secs(config.scheduler.ack_timeout_secs));
    let settings = SettingsStore::open(&config.storage.database_path).await?;
    let backend_url = config
        .scheduler
        .backend_url
        .clone()
        .unwrap_or_else(|| config.server.base_url());
    let backend = Arc::new(BackendClient::new(backend_url, DEFAULT_TIMEOUT)?);
    let scheduler = RotationScheduler::new(
        settings,
        backend.clone(),
        Arc::new(tabs.clone()),
        SchedulerOptions::from(&config.scheduler),
    );
    let control = Arc::new(ControlHandler::new(
        scheduler.clone(),
        Arc::new(tabs.clone()),
        backend,
    ));

    let mut health = HealthState::default();
    if let Some(exporter) = &exporter {
        health.prometheus_render = Some(exporter.render_fn());
    }
    let state = AppState::new(service, tabs)
        .with_control(control)
        .with_health(health);

    let cancel = shutdown::install_signal_handler();

    match scheduler.start().await {
        Ok(state) => info!(?state, "rotation scheduler started"),
        Err(e) => warn!(error = %e, "rotation scheduler could not load settings, staying idle"),
    }

    let result = start_server(&ServerConfig::from(&config.server), state, cancel.clone()).await;

    scheduler.stop().await;
    cancel.cancel();
    result?;

    info!("portrait serve shutdown complete");
    Ok(())
}
