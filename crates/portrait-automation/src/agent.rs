// SPDX-FileCopyrightText: 2026 Portrait Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Page-context endpoint of the tab bridge.
//!
//! Connects to the gateway's `/ws/page`, announces the page URL and answers
//! each command frame with an `ack` carrying the same request id.

use std::sync::Arc;

use futures::{SinkExt, StreamExt};
use portrait_core::{BridgeFrame, PageCommand, PageFrame, PortraitError};
use tokio_tungstenite::tungstenite::Message;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::automator::{ApplyOutcome, PageAutomator};
use crate::page::Page;

pub struct PageAgent<P: Page> {
    page: Arc<P>,
    automator: PageAutomator,
}

impl<P: Page> PageAgent<P> {
    pub fn new(page: Arc<P>, automator: PageAutomator) -> Self {
        Self { page, automator }
    }

    pub fn hello(&self) -> PageFrame {
        PageFrame::Hello {
            url: self.page.url(),
        }
    }

    /// Reacts to one bridge frame; the returned frame is sent back, if any.
    pub async fn handle_frame(&self, frame: BridgeFrame) -> Option<PageFrame> {
        match frame {
            BridgeFrame::Command {
                request_id,
                command,
            } => {
                let (success, error) = match self.execute(command).await {
                    Ok(ApplyOutcome::Applied { .. }) => (true, None),
                    Ok(ApplyOutcome::Skipped { reason }) => (false, Some(reason)),
                    Err(e) => {
                        warn!(request_id = %request_id, error = %e, "apply failed");
                        (false, Some(e.to_string()))
                    }
                };
                Some(PageFrame::Ack {
                    request_id,
                    success,
                    error,
                })
            }
            BridgeFrame::Navigate { url } => match self.page.navigate(&url).await {
                Ok(()) => Some(PageFrame::Loaded {
                    url: self.page.url(),
                }),
                Err(e) => {
                    warn!(url = %url, error = %e, "navigation failed");
                    None
                }
            },
        }
    }

    async fn execute(&self, command: PageCommand) -> Result<ApplyOutcome, PortraitError> {
        match command {
            PageCommand::UpdateProfilePicture {
                image_path,
                image_name,
            } => {
                self.automator
                    .apply(self.page.as_ref(), &image_path, &image_name)
                    .await
            }
        }
    }

    /// Serves one bridge connection until it closes or `cancel` fires.
    ///
    /// Commands are handled one at a time, in arrival order.
    pub async fn run(&self, bridge_url: &str, cancel: CancellationToken) -> Result<(), PortraitError> {
        let (socket, _) = tokio_tungstenite::connect_async(bridge_url)
            .await
            .map_err(|e| PortraitError::FetchFailed {
                message: format!("failed to connect to tab bridge at {bridge_url}: {e}"),
                source: Some(Box::new(e)),
            })?;
        let (mut sink, mut stream) = socket.split();
        info!(bridge = bridge_url, "connected to tab bridge");

        send_frame(&mut sink, &self.hello()).await?;

        loop {
            let msg = tokio::select! {
                _ = cancel.cancelled() => break,
                msg = stream.next() => msg,
            };
            match msg {
                Some(Ok(Message::Text(text))) => {
                    let frame: BridgeFrame = match serde_json::from_str(text.as_str()) {
                        Ok(frame) => frame,
                        Err(e) => {
                            warn!("invalid bridge frame: {e}");
                            continue;
                        }
                    };
                    if let Some(reply) = self.handle_frame(frame).await {
                        send_frame(&mut sink, &reply).await?;
                    }
                }
                Some(Ok(Message::Close(_))) | None => break,
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    return Err(PortraitError::FetchFailed {
                        message: format!("tab bridge connection lost: {e}"),
                        source: Some(Box::new(e)),
                    });
                }
            }
        }

        let _ = sink.close().await;
        info!("tab bridge connection closed");
        Ok(())
    }
}

async fn send_frame<S>(sink: &mut S, frame: &PageFrame) -> Result<(), PortraitError>
where
    S: futures::Sink<Message, Error = tokio_tungstenite::tungstenite::Error> + Unpin,
{
    let text = serde_json::to_string(frame)
        .map_err(|e| PortraitError::Internal(format!("failed to encode frame: {e}")))?;
    sink.send(Message::Text(text.into()))
        .await
        .map_err(|e| PortraitError::FetchFailed {
            message: format!("failed to send frame: {e}"),
            source: Some(Box::new(e)),
        })
}
