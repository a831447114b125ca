// SPDX-FileCopyrightText: 2026 Portrait Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! WebSocket endpoint page agents connect to.
//!
//! Page -> bridge (JSON):
//! ```json
//! {"type": "hello", "url": "https://www.linkedin.com/in/me/"}
//! {"type": "loaded", "url": "https://www.linkedin.com/in/me/"}
//! {"type": "ack", "requestId": "...", "success": true}
//! ```
//!
//! Bridge -> page (JSON):
//! ```json
//! {"type": "navigate", "url": "..."}
//! {"type": "command", "requestId": "...", "command": {"action": "updateProfilePicture", ...}}
//! ```

use axum::{
    extract::{
        State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    response::Response,
};
use futures::{SinkExt, StreamExt};
use portrait_core::{PageAck, PageFrame, TabId};
use tokio::sync::mpsc;

use crate::server::AppState;
use crate::tabs::TabBridge;

/// Upgrades `/ws/page` and hands the socket to the tab bridge.
pub async fn ws_page_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    let tabs = state.tabs.clone();
    ws.on_upgrade(move |socket| handle_socket(socket, tabs))
}

async fn handle_socket(socket: WebSocket, tabs: TabBridge) {
    let (mut ws_sender, mut ws_receiver) = socket.split();
    let (tx, mut rx) = mpsc::channel::<String>(16);

    let sender_task = tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            if ws_sender.send(Message::Text(msg.into())).await.is_err() {
                break;
            }
        }
    });

    // The connection only becomes a tab once it announced its URL.
    let mut tab: Option<TabId> = None;
    while let Some(Ok(msg)) = ws_receiver.next().await {
        match msg {
            Message::Text(text) => {
                let text_str: &str = &text;
                let frame: PageFrame = match serde_json::from_str(text_str) {
                    Ok(frame) => frame,
                    Err(e) => {
                        tracing::warn!("invalid page frame: {e}");
                        continue;
                    }
                };
                handle_frame(&tabs, &mut tab, &tx, frame);
            }
            Message::Close(_) => break,
            _ => {}
        }
    }

    if let Some(tab) = tab {
        tabs.unregister(&tab);
    }
    sender_task.abort();
}

fn handle_frame(
    tabs: &TabBridge,
    tab: &mut Option<TabId>,
    tx: &mpsc::Sender<String>,
    frame: PageFrame,
) {
    match frame {
        PageFrame::Hello { url } => match tab {
            Some(existing) => tabs.mark_loaded(existing, url),
            None => *tab = Some(tabs.register(url, tx.clone())),
        },
        PageFrame::Loaded { url } => match tab {
            Some(existing) => tabs.mark_loaded(existing, url),
            None => tracing::warn!("loaded frame before hello"),
        },
        PageFrame::Ack {
            request_id,
            success,
            error,
        } => tabs.resolve(&request_id, PageAck { success, error }),
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use portrait_core::{BridgeFrame, PageCommand, TabDriver};

    use super::*;

    #[tokio::test]
    async fn hello_registers_and_ack_resolves() {
        let tabs = TabBridge::new(Duration::from_secs(5));
        let (tx, mut rx) = mpsc::channel(4);
        let mut tab = None;

        handle_frame(
            &tabs,
            &mut tab,
            &tx,
            PageFrame::Hello {
                url: "https://example.com/in/me".into(),
            },
        );
        let id = tab.clone().unwrap();
        assert_eq!(tabs.connected(), 1);

        let sender = {
            let tabs = tabs.clone();
            let id = id.clone();
            tokio::spawn(async move {
                tabs.send(
                    &id,
                    PageCommand::UpdateProfilePicture {
                        image_path: "p".into(),
                        image_name: "n".into(),
                    },
                )
                .await
            })
        };

        let BridgeFrame::Command { request_id, .. } =
            serde_json::from_str(&rx.recv().await.unwrap()).unwrap()
        else {
            panic!("expected command frame");
        };
        handle_frame(
            &tabs,
            &mut tab,
            &tx,
            PageFrame::Ack {
                request_id,
                success: true,
                error: None,
            },
        );
        assert!(sender.await.unwrap().unwrap().success);
    }
}
