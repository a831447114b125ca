// SPDX-FileCopyrightText: 2026 Portrait Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Loopback harness for end-to-end tests.
//!
//! `TestHarness` assembles the generation backend, the tab bridge, the
//! rotation scheduler and the control handler against a temp directory, and
//! serves them on `127.0.0.1:0`. The scheduler reaches the backend over HTTP
//! exactly as it does in production.

use std::sync::Arc;
use std::time::Duration;

use portrait_automation::{PageAgent, PageAutomator, PollConfig};
use portrait_core::{AdvancePolicy, ControlCommand, ControlReply, ImageGenerator, PortraitError};
use portrait_gateway::{AppState, GenerationService, TabBridge, serve_listener};
use portrait_imaging::VariationProducer;
use portrait_resilience::SlidingWindowLimiter;
use portrait_scheduler::{BackendClient, ControlHandler, RotationScheduler, SchedulerOptions};
use portrait_storage::{BaseFolder, ImageStore, SettingsStore};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::fixtures::sample_png;
use crate::simulated_page::SimulatedPage;

pub const PROFILE_URL: &str = "https://www.linkedin.com/in/test-user/";

/// Builder for [`TestHarness`].
pub struct TestHarnessBuilder {
    generator: Option<Arc<dyn ImageGenerator>>,
    advance_policy: AdvancePolicy,
    ack_timeout: Duration,
    with_base: bool,
}

impl TestHarnessBuilder {
    fn new() -> Self {
        Self {
            generator: None,
            advance_policy: AdvancePolicy::AdvanceOnAttempt,
            ack_timeout: Duration::from_secs(10),
            with_base: true,
        }
    }

    /// Uses `generator` as the remote provider instead of local filters only.
    pub fn with_generator(mut self, generator: Arc<dyn ImageGenerator>) -> Self {
        self.generator = Some(generator);
        self
    }

    pub fn with_advance_policy(mut self, policy: AdvancePolicy) -> Self {
        self.advance_policy = policy;
        self
    }

    /// Starts without a photo in the base folder.
    pub fn without_base_photo(mut self) -> Self {
        self.with_base = false;
        self
    }

    pub async fn build(self) -> Result<TestHarness, PortraitError> {
        let temp_dir = tempfile::TempDir::new().map_err(PortraitError::storage)?;
        let root = temp_dir.path();

        let base = BaseFolder::new(root.join("base"), "base.jpg");
        if self.with_base {
            base.replace(&sample_png(48, 48)).await?;
        }
        let store = Arc::new(ImageStore::new(root.join("images")));
        let mut producer = VariationProducer::local();
        if let Some(generator) = self.generator {
            let limiter = SlidingWindowLimiter::new(100, Duration::from_millis(50), Duration::ZERO);
            producer = producer.with_remote(generator, Arc::new(limiter));
        }
        let service = Arc::new(GenerationService::new(Arc::new(producer), store, base));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .map_err(|e| PortraitError::Internal(format!("failed to bind test server: {e}")))?;
        let addr = listener
            .local_addr()
            .map_err(|e| PortraitError::Internal(format!("no local address: {e}")))?;
        let base_url = format!("http://{addr}");

        let tabs = TabBridge::new(self.ack_timeout);
        let settings = SettingsStore::open(root.join("portrait.db")).await?;
        let backend = Arc::new(BackendClient::new(&base_url, Duration::from_secs(30))?);
        let scheduler = RotationScheduler::new(
            settings.clone(),
            backend.clone(),
            Arc::new(tabs.clone()),
            SchedulerOptions {
                target_url: PROFILE_URL.to_string(),
                advance_policy: self.advance_policy,
                load_timeout: Duration::from_secs(2),
                period_override: None,
            },
        );
        let control = Arc::new(ControlHandler::new(
            scheduler.clone(),
            Arc::new(tabs.clone()),
            backend.clone(),
        ));
        let state = AppState::new(service, tabs.clone()).with_control(control);

        let cancel = CancellationToken::new();
        let server_cancel = cancel.clone();
        tokio::spawn(async move {
            if let Err(e) = serve_listener(listener, state, server_cancel).await {
                tracing::error!(error = %e, "test server failed");
            }
        });

        Ok(TestHarness {
            base_url,
            ws_url: format!("ws://{addr}/ws/page"),
            http: reqwest::Client::new(),
            tabs,
            settings,
            scheduler,
            backend,
            cancel,
            _temp_dir: temp_dir,
        })
    }
}

/// A running portrait stack on a loopback port. Dropping it stops the server.
pub struct TestHarness {
    base_url: String,
    ws_url: String,
    http: reqwest::Client,
    pub tabs: TabBridge,
    pub settings: SettingsStore,
    pub scheduler: Arc<RotationScheduler>,
    pub backend: Arc<BackendClient>,
    cancel: CancellationToken,
    _temp_dir: tempfile::TempDir,
}

impl TestHarness {
    pub fn builder() -> TestHarnessBuilder {
        TestHarnessBuilder::new()
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn http(&self) -> &reqwest::Client {
        &self.http
    }

    /// Sends a command to `POST /control` and decodes the reply.
    pub async fn control(&self, command: &ControlCommand) -> Result<ControlReply, PortraitError> {
        let response = self
            .http
            .post(format!("{}/control", self.base_url))
            .json(command)
            .send()
            .await
            .map_err(|e| PortraitError::fetch(format!("control request failed: {e}")))?;
        response
            .json::<ControlReply>()
            .await
            .map_err(|e| PortraitError::fetch(format!("invalid control reply: {e}")))
    }

    /// Connects a page agent for `page` to the tab bridge and waits until it
    /// has registered.
    pub async fn connect_page(
        &self,
        page: Arc<SimulatedPage>,
    ) -> Result<JoinHandle<Result<(), PortraitError>>, PortraitError> {
        let before = self.tabs.connected();
        let agent = PageAgent::new(page, PageAutomator::new("/in/", PollConfig::immediate()));
        let url = self.ws_url.clone();
        let cancel = self.cancel.child_token();
        let handle = tokio::spawn(async move { agent.run(&url, cancel).await });

        for _ in 0..200 {
            if self.tabs.connected() > before {
                return Ok(handle);
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        handle.abort();
        Err(PortraitError::Timeout {
            duration: Duration::from_secs(2),
        })
    }
}

impl Drop for TestHarness {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}
