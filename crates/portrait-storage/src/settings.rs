// SPDX-FileCopyrightText: 2026 Portrait Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Rotation settings persisted as text values in a key-value table.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use portrait_core::{Frequency, PortraitError, Settings};
use rusqlite::params;
use tracing::{debug, warn};

use crate::database::{Database, map_tr_err};

pub const KEY_ENABLED: &str = "isEnabled";
pub const KEY_FREQUENCY: &str = "frequency";
pub const KEY_CUSTOM_INTERVAL: &str = "customInterval";
pub const KEY_IMAGE_COUNT: &str = "numImages";
pub const KEY_ROTATION_INDEX: &str = "currentImageIndex";
pub const KEY_LAST_UPDATE: &str = "lastUpdate";
pub const KEY_STORAGE_PATH: &str = "storagePath";


/// Loads and saves the singleton [`Settings`].
///
/// Missing keys read as their defaults; a value that no longer parses is
/// logged and treated as missing.
#[derive(Clone)]
pub struct SettingsStore {
    db: Database,
}

impl SettingsStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    pub async fn open(path: impl AsRef<std::path::Path>) -> Result<Self, PortraitError> {
        Ok(Self::new(Database::open(path).await?))
    }

    pub async fn open_in_memory() -> Result<Self, PortraitError> {
        Ok(Self::new(Database::open_in_memory().await?))
    }

    /// Raw text value for `key`.
    pub async fn get(&self, key: &str) -> Result<Option<String>, PortraitError> {
        let key = key.to_string();
        self.db
            .connection()
            .call(move |conn| {
                let result = conn.query_row(
                    "SELECT value FROM settings WHERE key = ?1",
                    params![key],
                    |row| row.get::<_, String>(0),
                );
                match result {
                    Ok(value) => Ok(Some(value)),
                    Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                    Err(e) => Err(e),
                }
            })
            .await
            .map_err(map_tr_err)
    }

    pub async fn load(&self) -> Result<Settings, PortraitError> {
        let rows: Vec<(String, String)> = self
            .db
            .connection()
            .call(|conn| {
                let mut stmt = conn.prepare("SELECT key, value FROM settings")?;
                let rows = stmt
                    .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(rows)
            })
            .await
            .map_err(map_tr_err)?;

        let mut settings = Settings::default();
        for (key, value) in rows {
            apply_value(&mut settings, &key, &value);
        }
        Ok(settings)
    }

    /// Writes every key in one transaction. `None` fields remove their row.
    pub async fn save(&self, settings: &Settings) -> Result<(), PortraitError> {
        let entries = encode(settings);
        self.db
            .connection()
            .call(move |conn| {
                let tx = conn.transaction()?;
                for (key, value) in &entries {
                    match value {
                        Some(value) => {
                            tx.execute(
                                "INSERT OR REPLACE INTO settings (key, value) VALUES (?1, ?2)",
                                params![key, value],
                            )?;
                        }
                        None => {
                            tx.execute("DELETE FROM settings WHERE key = ?1", params![key])?;
                        }
                    }
                }
                tx.commit()?;
                Ok(())
            })
            .await
            .map_err(map_tr_err)?;
        debug!(
            enabled = settings.enabled,
            frequency = %settings.frequency,
            rotation_index = settings.rotation_index,
            "settings saved"
        );
        Ok(())
    }
}

fn encode(settings: &Settings) -> Vec<(&'static str, Option<String>)> {
    vec![
        (KEY_ENABLED, Some(settings.enabled.to_string())),
        (KEY_FREQUENCY, Some(settings.frequency.to_string())),
        (
            KEY_CUSTOM_INTERVAL,
            Some(settings.custom_interval_days.to_string()),
        ),
        (KEY_IMAGE_COUNT, Some(settings.image_count.to_string())),
        (KEY_ROTATION_INDEX, Some(settings.rotation_index.to_string())),
        (
            KEY_LAST_UPDATE,
            settings.last_update.map(|t| t.to_rfc3339()),
        ),
        (KEY_STORAGE_PATH, settings.storage_path.clone()),
    ]
}

fn apply_value(settings: &mut Settings, key: &str, value: &str) {
    fn parse<T: FromStr>(key: &str, value: &str) -> Option<T> {
        let parsed = value.trim().parse().ok();
        if parsed.is_none() {
            warn!(key, value, "ignoring unparsable setting");
        }
        parsed
    }

    match key {
        KEY_ENABLED => {
            if let Some(v) = parse(key, value) {
                settings.enabled = v;
            }
        }
        KEY_FREQUENCY => {
            if let Some(v) = parse::<Frequency>(key, value) {
                settings.frequency = v;
            }
        }
        KEY_CUSTOM_INTERVAL => {
            if let Some(v) = parse::<u32>(key, value) {
                settings.custom_interval_days = v.max(1);
            }
        }
        KEY_IMAGE_COUNT => {
            if let Some(v) = parse(key, value) {
                settings.image_count = v;
            }
        }
        KEY_ROTATION_INDEX => {
            if let Some(v) = parse(key, value) {
                settings.rotation_index = v;
            }
        }
        KEY_LAST_UPDATE => {
            settings.last_update = parse::<DateTime<Utc>>(key, value);
        }
        KEY_STORAGE_PATH => settings.storage_path = Some(value.to_string()),
        other => debug!(key = other, "unknown settings key ignored"),
    }
}
