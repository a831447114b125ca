// SPDX-FileCopyrightText: 2026 Portrait Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Adapter trait for reaching a page context running in a browser tab.

use std::time::Duration;

use async_trait::async_trait;

use crate::command::{PageAck, PageCommand};
use crate::error::PortraitError;
use crate::types::TabId;

/// Locates tabs and delivers one-shot commands to their page automators.
#[async_trait]
pub trait TabDriver: Send + Sync {
    /// Returns a tab showing `url`, opening or navigating one if none exists.
    async fn find_or_open(&self, url: &str) -> Result<TabId, PortraitError>;

    /// Waits until the tab's current navigation has finished loading.
    async fn wait_loaded(&self, tab: &TabId, timeout: Duration) -> Result<(), PortraitError>;

    /// Sends `command` and waits for the page's acknowledgement.
    ///
    /// An `Err` means no acknowledgement arrived at all; a negative
    /// acknowledgement is `Ok(PageAck { success: false, .. })`.
    async fn send(&self, tab: &TabId, command: PageCommand) -> Result<PageAck, PortraitError>;
}
