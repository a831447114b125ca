// SPDX-FileCopyrightText: 2026 Portrait Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Domain types shared by the generation backend and the rotation scheduler.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::error::PortraitError;

/// Smallest batch a single generation call accepts.
pub const MIN_IMAGE_COUNT: u32 = 1;

/// Largest batch a single generation call accepts.
pub const MAX_IMAGE_COUNT: u32 = 50;

/// Rejects counts outside `[MIN_IMAGE_COUNT, MAX_IMAGE_COUNT]`.
pub fn validate_count(count: u32) -> Result<(), PortraitError> {
    if (MIN_IMAGE_COUNT..=MAX_IMAGE_COUNT).contains(&count) {
        Ok(())
    } else {
        Err(PortraitError::InvalidArgument(format!(
            "image count must be between {MIN_IMAGE_COUNT} and {MAX_IMAGE_COUNT}, got {count}"
        )))
    }
}

/// How often the rotation timer fires.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Frequency {
    #[default]
    Daily,
    Weekly,
    Custom,
}

/// Whether an unconfirmed apply still advances the rotation index.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum AdvancePolicy {
    /// Advance after every dispatch, acknowledged or not.
    #[default]
    AdvanceOnAttempt,
    /// Advance only when the page automator reports success.
    AdvanceOnConfirm,
}

/// Persisted rotation settings (singleton).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    pub enabled: bool,
    pub frequency: Frequency,
    pub custom_interval_days: u32,
    pub image_count: u32,
    pub rotation_index: u64,
    #[serde(default)]
    pub last_update: Option<DateTime<Utc>>,
    #[serde(default)]
    pub storage_path: Option<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            enabled: false,
            frequency: Frequency::Daily,
            custom_interval_days: 1,
            image_count: 10,
            rotation_index: 0,
            last_update: None,
            storage_path: None,
        }
    }
}

impl Settings {
    /// Period in whole minutes between two ticks.
    pub fn period_minutes(&self) -> u64 {
        match self.frequency {
            Frequency::Daily => 24 * 60,
            Frequency::Weekly => 7 * 24 * 60,
            Frequency::Custom => u64::from(self.custom_interval_days.max(1)) * 24 * 60,
        }
    }

    /// Tick period as a `Duration`.
    pub fn period(&self) -> Duration {
        Duration::from_secs(self.period_minutes() * 60)
    }

    /// Index into a live image set of `len` items, or `None` when empty.
    ///
    /// The stored index may exceed `len` when the set shrank after it was written.
    pub fn select(&self, len: usize) -> Option<usize> {
        if len == 0 {
            return None;
        }
        Some((self.rotation_index % len as u64) as usize)
    }

    /// Moves the rotation index one step forward within a set of `len` items.
    pub fn advance(&mut self, len: usize, now: DateTime<Utc>) {
        if let Some(current) = self.select(len) {
            self.rotation_index = ((current + 1) % len) as u64;
        }
        self.last_update = Some(now);
    }

    pub fn validate(&self) -> Result<(), PortraitError> {
        if self.custom_interval_days == 0 {
            return Err(PortraitError::InvalidArgument(
                "customIntervalDays must be at least 1".into(),
            ));
        }
        validate_count(self.image_count)
    }
}

/// One variation persisted by the image store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredImage {
    pub filename: String,
    /// Human-readable label (prompt or filter description), not functional.
    #[serde(rename = "label")]
    pub source_prompt: String,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
}

/// Opaque handle to a browser tab known to a tab driver.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TabId(pub String);

impl std::fmt::Display for TabId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}
