// SPDX-FileCopyrightText: 2026 Portrait Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Tab bridge: a [`TabDriver`] backed by page agents connected over WebSocket.
//!
//! Each connected page agent registers as one tab. Commands are tagged with
//! a request id; the matching `ack` frame resolves the waiting sender through
//! `response_map`.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use dashmap::DashMap;
use portrait_core::{BridgeFrame, PageAck, PageCommand, PortraitError, TabDriver, TabId};
use tokio::sync::{mpsc, oneshot, watch};
use tracing::{debug, info, warn};

/// Outbound half of one connected page agent.
struct PageConn {
    url: String,
    tx: mpsc::Sender<String>,
    loaded: watch::Sender<bool>,
}

#[derive(Clone)]
pub struct TabBridge {
    pages: Arc<DashMap<TabId, PageConn>>,
    /// request_id -> (tab, waiting sender).
    response_map: Arc<DashMap<String, (TabId, oneshot::Sender<PageAck>)>>,
    ack_timeout: Duration,
}

impl TabBridge {
    pub fn new(ack_timeout: Duration) -> Self {
        Self {
            pages: Arc::new(DashMap::new()),
            response_map: Arc::new(DashMap::new()),
            ack_timeout,
        }
    }

    /// Number of connected page agents.
    pub fn connected(&self) -> usize {
        self.pages.len()
    }

    /// Registers a newly connected page. The page counts as loaded.
    pub fn register(&self, url: String, tx: mpsc::Sender<String>) -> TabId {
        let tab = TabId(uuid::Uuid::new_v4().to_string());
        let (loaded, _) = watch::channel(true);
        info!(tab = %tab, url = %url, "page agent connected");
        self.pages.insert(tab.clone(), PageConn { url, tx, loaded });
        tab
    }

    /// Records a finished navigation.
    pub fn mark_loaded(&self, tab: &TabId, url: String) {
        if let Some(mut conn) = self.pages.get_mut(tab) {
            debug!(tab = %tab, url = %url, "page loaded");
            conn.url = url;
            conn.loaded.send_replace(true);
        }
    }

    /// Resolves a pending command. Unknown request ids are ignored.
    pub fn resolve(&self, request_id: &str, ack: PageAck) {
        match self.response_map.remove(request_id) {
            Some((_, (_, tx))) => {
                let _ = tx.send(ack);
            }
            None => warn!(request_id, "ack for unknown request"),
        }
    }

    /// Forgets a page; its pending commands fail immediately.
    pub fn unregister(&self, tab: &TabId) {
        self.pages.remove(tab);
        self.response_map.retain(|_, (owner, _)| owner != tab);
        info!(tab = %tab, "page agent disconnected");
    }

    async fn push(&self, tab: &TabId, frame: &BridgeFrame) -> Result<(), PortraitError> {
        let tx = self
            .pages
            .get(tab)
            .map(|conn| conn.tx.clone())
            .ok_or_else(|| PortraitError::NotFound(format!("tab {tab} is not connected")))?;
        let text = serde_json::to_string(frame)
            .map_err(|e| PortraitError::Internal(format!("failed to encode frame: {e}")))?;
        tx.send(text)
            .await
            .map_err(|_| PortraitError::NotFound(format!("tab {tab} is not connected")))
    }
}

#[async_trait]
impl TabDriver for TabBridge {
    async fn find_or_open(&self, url: &str) -> Result<TabId, PortraitError> {
        let wanted = url.trim_end_matches('/');
        let existing = self
            .pages
            .iter()
            .find(|entry| entry.value().url.trim_end_matches('/').starts_with(wanted))
            .map(|entry| entry.key().clone());
        if let Some(tab) = existing {
            return Ok(tab);
        }

        let first = self.pages.iter().next().map(|entry| entry.key().clone());
        let Some(tab) = first else {
            return Err(PortraitError::NotFound(
                "no page agent is connected".into(),
            ));
        };
        if let Some(conn) = self.pages.get(&tab) {
            conn.loaded.send_replace(false);
        }
        info!(tab = %tab, url, "navigating page agent");
        self.push(&tab, &BridgeFrame::Navigate { url: url.to_string() })
            .await?;
        Ok(tab)
    }

    async fn wait_loaded(&self, tab: &TabId, timeout: Duration) -> Result<(), PortraitError> {
        let mut rx = self
            .pages
            .get(tab)
            .map(|conn| conn.loaded.subscribe())
            .ok_or_else(|| PortraitError::NotFound(format!("tab {tab} is not connected")))?;
        match tokio::time::timeout(timeout, rx.wait_for(|loaded| *loaded)).await {
            Ok(Ok(_)) => Ok(()),
            Ok(Err(_)) => Err(PortraitError::NotFound(format!(
                "tab {tab} disconnected while loading"
            ))),
            Err(_) => Err(PortraitError::Timeout { duration: timeout }),
        }
    }

    async fn send(&self, tab: &TabId, command: PageCommand) -> Result<PageAck, PortraitError> {
        let request_id = uuid::Uuid::new_v4().to_string();
        let (tx, rx) = oneshot::channel();
        self.response_map
            .insert(request_id.clone(), (tab.clone(), tx));

        let frame = BridgeFrame::Command {
            request_id: request_id.clone(),
            command,
        };
        if let Err(e) = self.push(tab, &frame).await {
            self.response_map.remove(&request_id);
            return Err(e);
        }

        match tokio::time::timeout(self.ack_timeout, rx).await {
            Ok(Ok(ack)) => Ok(ack),
            Ok(Err(_)) => Err(PortraitError::NotFound(format!(
                "tab {tab} disconnected before acknowledging"
            ))),
            Err(_) => {
                self.response_map.remove(&request_id);
                Err(PortraitError::Timeout {
                    duration: self.ack_timeout,
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn command() -> PageCommand {
        PageCommand::UpdateProfilePicture {
            image_path: "http://127.0.0.1:3000/images/a.png".into(),
            image_name: "a.png".into(),
        }
    }

    #[tokio::test]
    async fn no_agent_means_not_found() {
        let bridge = TabBridge::new(Duration::from_secs(1));
        let err = bridge.find_or_open("https://example.com/in/me").await.unwrap_err();
        assert!(matches!(err, PortraitError::NotFound(_)));
    }

    #[tokio::test]
    async fn matching_page_is_reused_without_navigation() {
        let bridge = TabBridge::new(Duration::from_secs(1));
        let (tx, mut rx) = mpsc::channel(4);
        let tab = bridge.register("https://example.com/in/me/".into(), tx);
        let found = bridge.find_or_open("https://example.com/in/me").await.unwrap();
        assert_eq!(found, tab);
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn other_page_is_navigated_and_waits_for_load() {
        let bridge = TabBridge::new(Duration::from_secs(1));
        let (tx, mut rx) = mpsc::channel(4);
        let tab = bridge.register("https://example.com/feed".into(), tx);

        let found = bridge.find_or_open("https://example.com/in/me").await.unwrap();
        assert_eq!(found, tab);
        let frame: BridgeFrame = serde_json::from_str(&rx.recv().await.unwrap()).unwrap();
        assert_eq!(
            frame,
            BridgeFrame::Navigate {
                url: "https://example.com/in/me".into()
            }
        );

        let waiter = {
            let bridge = bridge.clone();
            let tab = tab.clone();
            tokio::spawn(async move { bridge.wait_loaded(&tab, Duration::from_secs(5)).await })
        };
        bridge.mark_loaded(&tab, "https://example.com/in/me".into());
        waiter.await.unwrap().unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn wait_loaded_times_out() {
        let bridge = TabBridge::new(Duration::from_secs(1));
        let (tx, _rx) = mpsc::channel(4);
        let tab = bridge.register("https://example.com/feed".into(), tx);
        bridge.find_or_open("https://example.com/in/me").await.unwrap();
        let err = bridge
            .wait_loaded(&tab, Duration::from_secs(2))
            .await
            .unwrap_err();
        assert!(matches!(err, PortraitError::Timeout { .. }));
    }

    #[tokio::test]
    async fn ack_resolves_pending_send() {
        let bridge = TabBridge::new(Duration::from_secs(5));
        let (tx, mut rx) = mpsc::channel(4);
        let tab = bridge.register("https://example.com/in/me".into(), tx);

        let responder = {
            let bridge = bridge.clone();
            tokio::spawn(async move {
                let text = rx.recv().await.unwrap();
                let BridgeFrame::Command { request_id, .. } =
                    serde_json::from_str(&text).unwrap()
                else {
                    panic!("expected command frame");
                };
                bridge.resolve(&request_id, PageAck::failure("no save button"));
            })
        };

        let ack = bridge.send(&tab, command()).await.unwrap();
        responder.await.unwrap();
        assert!(!ack.success);
        assert_eq!(ack.error.as_deref(), Some("no save button"));
    }

    #[tokio::test(start_paused = true)]
    async fn missing_ack_times_out() {
        let bridge = TabBridge::new(Duration::from_secs(3));
        let (tx, _rx) = mpsc::channel(4);
        let tab = bridge.register("https://example.com/in/me".into(), tx);
        let err = bridge.send(&tab, command()).await.unwrap_err();
        assert!(matches!(err, PortraitError::Timeout { .. }));
        assert!(bridge.response_map.is_empty());
    }

    #[tokio::test]
    async fn disconnect_fails_pending_send() {
        let bridge = TabBridge::new(Duration::from_secs(30));
        let (tx, mut rx) = mpsc::channel(4);
        let tab = bridge.register("https://example.com/in/me".into(), tx);

        let dropper = {
            let bridge = bridge.clone();
            let tab = tab.clone();
            tokio::spawn(async move {
                rx.recv().await.unwrap();
                bridge.unregister(&tab);
            })
        };
        let err = bridge.send(&tab, command()).await.unwrap_err();
        dropper.await.unwrap();
        assert!(matches!(err, PortraitError::NotFound(_)));
        assert_eq!(bridge.connected(), 0);
    }
}
