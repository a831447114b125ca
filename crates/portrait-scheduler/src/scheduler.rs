// SPDX-FileCopyrightText: 2026 Portrait Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Periodic profile-picture rotation.
//!
//! [`RotationScheduler`] owns its timer task. It is either Idle (no timer)
//! or Armed (timer running with a period derived from the settings). Every
//! settings change cancels the old timer before a new one is spawned, so two
//! timers never overlap. Manual and scheduled ticks are not excluded from
//! running at the same time.

use std::sync::{Arc, Weak};
use std::time::Duration;

use chrono::Utc;
use portrait_config::model::SchedulerConfig;
use portrait_core::{
    AdvancePolicy, ImageCatalog, PageAck, PageCommand, PortraitError, Settings, TabDriver,
};
use portrait_storage::SettingsStore;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchedulerOptions {
    /// Page found or opened before each apply.
    pub target_url: String,
    pub advance_policy: AdvancePolicy,
    pub load_timeout: Duration,
    /// Replaces the settings-derived period (tests, debugging).
    pub period_override: Option<Duration>,
}

impl From<&SchedulerConfig> for SchedulerOptions {
    fn from(config: &SchedulerConfig) -> Self {
        Self {
            target_url: config.target_url.clone(),
            advance_policy: config.advance_policy,
            load_timeout: Duration::from_secs(config.load_timeout_secs),
            period_override: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    Idle,
    Armed { period: Duration },
}

/// What one tick did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TickOutcome {
    /// Rotation was switched off after the timer fired.
    Disabled,
    NoImages,
    /// The page confirmed the apply.
    Applied { index: usize, filename: String },
    /// No positive acknowledgement; `advanced` follows the advance policy.
    Unconfirmed {
        index: usize,
        filename: String,
        reason: String,
        advanced: bool,
    },
}

impl TickOutcome {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Disabled => "disabled",
            Self::NoImages => "no_images",
            Self::Applied { .. } => "applied",
            Self::Unconfirmed { .. } => "unconfirmed",
        }
    }
}

struct Timer {
    cancel: CancellationToken,
    period: Duration,
    handle: JoinHandle<()>,
}

pub struct RotationScheduler {
    settings: SettingsStore,
    catalog: Arc<dyn ImageCatalog>,
    tabs: Arc<dyn TabDriver>,
    options: SchedulerOptions,
    timer: Mutex<Option<Timer>>,
}

impl RotationScheduler {
    pub fn new(
        settings: SettingsStore,
        catalog: Arc<dyn ImageCatalog>,
        tabs: Arc<dyn TabDriver>,
        options: SchedulerOptions,
    ) -> Arc<Self> {
        Arc::new(Self {
            settings,
            catalog,
            tabs,
            options,
            timer: Mutex::new(None),
        })
    }

    pub fn options(&self) -> &SchedulerOptions {
        &self.options
    }

    /// Loads persisted settings and arms the timer if rotation is enabled.
    pub async fn start(self: &Arc<Self>) -> Result<SchedulerState, PortraitError> {
        let settings = self.settings.load().await?;
        Ok(self.rearm(&settings).await)
    }

    /// Cancels the timer. A tick already running finishes on its own.
    pub async fn stop(&self) {
        if let Some(timer) = self.timer.lock().await.take() {
            timer.cancel.cancel();
            info!("rotation timer stopped");
        }
    }

    pub async fn state(&self) -> SchedulerState {
        match self.timer.lock().await.as_ref() {
            Some(timer) if !timer.handle.is_finished() => SchedulerState::Armed {
                period: timer.period,
            },
            _ => SchedulerState::Idle,
        }
    }

    pub async fn current_settings(&self) -> Result<Settings, PortraitError> {
        self.settings.load().await
    }

    /// Persists `settings`, then re-arms the timer from them.
    pub async fn apply_settings(
        self: &Arc<Self>,
        settings: Settings,
    ) -> Result<SchedulerState, PortraitError> {
        settings.validate()?;
        self.settings.save(&settings).await?;
        Ok(self.rearm(&settings).await)
    }

    async fn rearm(self: &Arc<Self>, settings: &Settings) -> SchedulerState {
        let mut slot = self.timer.lock().await;
        if let Some(old) = slot.take() {
            old.cancel.cancel();
        }
        if !settings.enabled {
            info!("rotation disabled, scheduler idle");
            return SchedulerState::Idle;
        }

        let period = self.options.period_override.unwrap_or_else(|| settings.period());
        let cancel = CancellationToken::new();
        let handle = tokio::spawn(run_timer(Arc::downgrade(self), period, cancel.clone()));
        *slot = Some(Timer {
            cancel,
            period,
            handle,
        });
        info!(period_secs = period.as_secs(), "rotation timer armed");
        SchedulerState::Armed { period }
    }

    /// One timer firing; does nothing when rotation was disabled meanwhile.
    pub async fn tick(&self) -> Result<TickOutcome, PortraitError> {
        let settings = self.settings.load().await?;
        if !settings.enabled {
            debug!("rotation disabled since the timer fired, skipping tick");
            return Ok(record(TickOutcome::Disabled));
        }
        self.rotate(settings).await
    }

    /// Runs a rotation now, regardless of the enabled flag.
    pub async fn force_update(&self) -> Result<TickOutcome, PortraitError> {
        let settings = self.settings.load().await?;
        self.rotate(settings).await
    }

    async fn rotate(&self, settings: Settings) -> Result<TickOutcome, PortraitError> {
        let images = self.catalog.list_images().await?;
        let Some(index) = settings.select(images.len()) else {
            info!("no stored images, nothing to rotate");
            return Ok(record(TickOutcome::NoImages));
        };
        let image = &images[index];

        let tab = self.tabs.find_or_open(&self.options.target_url).await?;
        if let Err(e) = self.tabs.wait_loaded(&tab, self.options.load_timeout).await {
            warn!(tab = %tab, error = %e, "target page did not report loaded, sending anyway");
        }

        let command = PageCommand::UpdateProfilePicture {
            image_path: self.catalog.image_url(&image.filename),
            image_name: image.filename.clone(),
        };
        let ack = self.tabs.send(&tab, command).await;
        let failure = match ack {
            Ok(PageAck { success: true, .. }) => None,
            Ok(PageAck { error, .. }) => {
                Some(error.unwrap_or_else(|| "page reported failure".to_string()))
            }
            Err(e) => Some(e.to_string()),
        };

        let advance = failure.is_none()
            || self.options.advance_policy == AdvancePolicy::AdvanceOnAttempt;
        if advance {
            // Reload so a settings update made while waiting for the ack survives.
            let mut latest = self.settings.load().await?;
            latest.rotation_index = index as u64;
            latest.advance(images.len(), Utc::now());
            self.settings.save(&latest).await?;
        }

        let outcome = match failure {
            None => {
                info!(index, filename = %image.filename, "profile picture rotated");
                TickOutcome::Applied {
                    index,
                    filename: image.filename.clone(),
                }
            }
            Some(reason) => {
                warn!(
                    index,
                    filename = %image.filename,
                    reason = %reason,
                    advanced = advance,
                    "apply not confirmed"
                );
                TickOutcome::Unconfirmed {
                    index,
                    filename: image.filename.clone(),
                    reason,
                    advanced: advance,
                }
            }
        };
        Ok(record(outcome))
    }
}

fn record(outcome: TickOutcome) -> TickOutcome {
    metrics::counter!("portrait_ticks_total", "outcome" => outcome.label()).increment(1);
    outcome
}

async fn run_timer(scheduler: Weak<RotationScheduler>, period: Duration, cancel: CancellationToken) {
    let mut interval = tokio::time::interval(period);
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    // Skip the first immediate tick.
    interval.tick().await;

    loop {
        tokio::select! {
            _ = interval.tick() => {
                let Some(scheduler) = scheduler.upgrade() else { break };
                match scheduler.tick().await {
                    Ok(outcome) => debug!(outcome = outcome.label(), "rotation tick finished"),
                    Err(e) => warn!(error = %e, "rotation tick failed (non-fatal)"),
                }
            }
            _ = cancel.cancelled() => {
                debug!("rotation timer task shutting down");
                break;
            }
        }
    }
}
