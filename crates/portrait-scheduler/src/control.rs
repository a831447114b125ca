// SPDX-FileCopyrightText: 2026 Portrait Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Scheduler-context control surface.

use std::sync::Arc;

use async_trait::async_trait;
use portrait_core::{
    ControlCommand, ControlReply, ControlSurface, ImageCatalog, PageCommand, PortraitError,
    TabDriver,
};
use tracing::{info, warn};

use crate::backend::BackendClient;
use crate::scheduler::RotationScheduler;

/// Dispatches [`ControlCommand`]s to the scheduler, the tab driver and the
/// generation backend.
pub struct ControlHandler {
    scheduler: Arc<RotationScheduler>,
    tabs: Arc<dyn TabDriver>,
    backend: Arc<BackendClient>,
}

impl ControlHandler {
    pub fn new(
        scheduler: Arc<RotationScheduler>,
        tabs: Arc<dyn TabDriver>,
        backend: Arc<BackendClient>,
    ) -> Self {
        Self {
            scheduler,
            tabs,
            backend,
        }
    }

    async fn apply_now(&self, image_path: String, image_name: String) -> Result<bool, PortraitError> {
        // A bare file name refers to a stored variation.
        let image_path = if image_path.contains("://") {
            image_path
        } else {
            self.backend.image_url(&image_path)
        };
        let options = self.scheduler.options();
        let tab = self.tabs.find_or_open(&options.target_url).await?;
        if let Err(e) = self.tabs.wait_loaded(&tab, options.load_timeout).await {
            warn!(tab = %tab, error = %e, "target page did not report loaded, sending anyway");
        }
        let ack = self
            .tabs
            .send(
                &tab,
                PageCommand::UpdateProfilePicture {
                    image_path,
                    image_name,
                },
            )
            .await?;
        if let Some(error) = &ack.error {
            warn!(error = %error, "page rejected the image");
        }
        Ok(ack.success)
    }
}

fn generated(result: Result<usize, PortraitError>) -> ControlReply {
    match result {
        Ok(count) => ControlReply::Generated {
            success: true,
            count,
        },
        Err(e) => ControlReply::failed(e),
    }
}

#[async_trait]
impl ControlSurface for ControlHandler {
    async fn handle(&self, command: ControlCommand) -> ControlReply {
        info!(action = command.action(), "control command");
        match command {
            ControlCommand::UpdateProfilePicture {
                image_path,
                image_name,
            } => match self.apply_now(image_path, image_name).await {
                Ok(success) => ControlReply::Ack { success },
                Err(e) => ControlReply::failed(e),
            },
            ControlCommand::GenerateImages {
                base_photo,
                num_images,
            } => generated(
                self.backend
                    .generate_from_data_url(&base_photo, num_images)
                    .await,
            ),
            ControlCommand::GenerateFromBase { num_images } => {
                generated(self.backend.generate_from_base(num_images).await)
            }
            ControlCommand::GetSettings {} => match self.scheduler.current_settings().await {
                Ok(settings) => ControlReply::Settings { settings },
                Err(e) => ControlReply::failed(e),
            },
            ControlCommand::UpdateSettings { settings } => {
                match self.scheduler.apply_settings(settings).await {
                    Ok(_) => ControlReply::ok(),
                    Err(e) => ControlReply::failed(e),
                }
            }
            ControlCommand::ForceUpdate {} => match self.scheduler.force_update().await {
                Ok(outcome) => {
                    info!(outcome = outcome.label(), "forced rotation finished");
                    ControlReply::ok()
                }
                Err(e) => ControlReply::failed(e),
            },
        }
    }
}
