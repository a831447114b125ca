// SPDX-FileCopyrightText: 2026 Portrait Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Applies one image as the profile picture on a live page.
//!
//! The sequence is best effort: a later step failing can leave the editor
//! half done (file staged but not saved). Every wait is a fixed-interval
//! sleep bounded by [`PollConfig`].

use portrait_config::model::AutomationConfig;
use portrait_core::PortraitError;
use tokio::time::{Instant, sleep};
use tracing::{debug, info, warn};

use crate::dom::NodeId;
use crate::page::{Page, PollConfig};
use crate::selectors::{
    find_file_input, find_profile_picture_edit_button, find_save_control, upload_in_progress,
};

/// Result of an apply that did not fail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApplyOutcome {
    /// The file was handed to the page; `saved` tells whether a save control was clicked.
    Applied { saved: bool },
    /// Nothing was attempted.
    Skipped { reason: String },
}

pub struct PageAutomator {
    profile_marker: String,
    poll: PollConfig,
}

impl PageAutomator {
    pub fn new(profile_marker: impl Into<String>, poll: PollConfig) -> Self {
        Self {
            profile_marker: profile_marker.into(),
            poll,
        }
    }

    pub fn from_config(config: &AutomationConfig) -> Self {
        Self::new(config.profile_marker.clone(), PollConfig::from(config))
    }

    pub async fn apply<P: Page + ?Sized>(
        &self,
        page: &P,
        image_url: &str,
        image_name: &str,
    ) -> Result<ApplyOutcome, PortraitError> {
        let url = page.url();
        if !url.contains(&self.profile_marker) {
            info!(url = %url, "not on the profile page, skipping apply");
            return Ok(ApplyOutcome::Skipped {
                reason: format!("page {url} is not a profile page"),
            });
        }

        let edit = find_profile_picture_edit_button(&page.snapshot().await)?;
        page.click(edit).await?;
        sleep(self.poll.settle).await;

        let input = self.wait_for_file_input(page).await?;

        let mut file = page.fetch(image_url).await?;
        file.name = image_name.to_string();
        debug!(name = %file.name, bytes = file.bytes.len(), "image fetched");

        page.set_input_files(input, file).await?;
        page.dispatch_event(input, "change").await?;
        page.dispatch_event(input, "input").await?;

        self.wait_for_upload(page).await;

        let saved = match find_save_control(&page.snapshot().await) {
            Some((rule, node)) => {
                debug!(?rule, node = node.0, "clicking save control");
                page.click(node).await?;
                sleep(self.poll.settle).await;
                true
            }
            None => {
                warn!("no save control found, file left staged");
                false
            }
        };

        info!(image = image_name, saved, "profile picture applied");
        Ok(ApplyOutcome::Applied { saved })
    }

    async fn wait_for_file_input<P: Page + ?Sized>(&self, page: &P) -> Result<NodeId, PortraitError> {
        for attempt in 1..=self.poll.file_input_attempts {
            if let Some(input) = find_file_input(&page.snapshot().await) {
                debug!(attempt, "file input visible");
                return Ok(input);
            }
            sleep(self.poll.poll_interval).await;
        }
        Err(PortraitError::ElementNotFound(format!(
            "file input after {} attempts",
            self.poll.file_input_attempts
        )))
    }

    /// Returns when the indicator is gone or the bound is hit.
    async fn wait_for_upload<P: Page + ?Sized>(&self, page: &P) {
        let deadline = Instant::now() + self.poll.upload_timeout;
        loop {
            if !upload_in_progress(&page.snapshot().await) {
                return;
            }
            if Instant::now() >= deadline {
                warn!(timeout = ?self.poll.upload_timeout, "upload indicator still visible, continuing");
                return;
            }
            sleep(self.poll.poll_interval).await;
        }
    }
}
