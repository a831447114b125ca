// SPDX-FileCopyrightText: 2026 Portrait Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Tab bridge over a real socket: a page agent connects to `/ws/page` and
//! answers a command sent through `TabDriver`.

use std::sync::Arc;
use std::time::Duration;

use futures::{SinkExt, StreamExt};
use portrait_core::{BridgeFrame, PageCommand, PageFrame, TabDriver};
use portrait_gateway::{AppState, GenerationService, TabBridge, build_router};
use portrait_imaging::VariationProducer;
use portrait_storage::{BaseFolder, ImageStore};
use tokio_tungstenite::tungstenite::Message;

async fn serve(tabs: TabBridge) -> (String, tempfile::TempDir) {
    let dir = tempfile::tempdir().unwrap();
    let service = Arc::new(GenerationService::new(
        Arc::new(VariationProducer::local()),
        Arc::new(ImageStore::new(dir.path().join("images"))),
        BaseFolder::new(dir.path().join("base"), "base.jpg"),
    ));
    let app = build_router(AppState::new(service, tabs));
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (format!("ws://{addr}/ws/page"), dir)
}

async fn wait_connected(tabs: &TabBridge) {
    for _ in 0..100 {
        if tabs.connected() == 1 {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("page agent never registered");
}

#[tokio::test]
async fn page_agent_receives_command_and_acks() {
    let tabs = TabBridge::new(Duration::from_secs(5));
    let (url, _dir) = serve(tabs.clone()).await;

    let (mut socket, _) = tokio_tungstenite::connect_async(url).await.unwrap();
    let hello = serde_json::to_string(&PageFrame::Hello {
        url: "https://example.com/in/me/".into(),
    })
    .unwrap();
    socket.send(Message::Text(hello.into())).await.unwrap();
    wait_connected(&tabs).await;

    let tab = tabs.find_or_open("https://example.com/in/me").await.unwrap();
    tabs.wait_loaded(&tab, Duration::from_secs(1)).await.unwrap();

    let page = tokio::spawn(async move {
        while let Some(Ok(msg)) = socket.next().await {
            let Message::Text(text) = msg else { continue };
            let frame: BridgeFrame = serde_json::from_str(text.as_str()).unwrap();
            if let BridgeFrame::Command {
                request_id,
                command: PageCommand::UpdateProfilePicture { image_name, .. },
            } = frame
            {
                assert_eq!(image_name, "variation_1_00.png");
                let ack = serde_json::to_string(&PageFrame::Ack {
                    request_id,
                    success: true,
                    error: None,
                })
                .unwrap();
                socket.send(Message::Text(ack.into())).await.unwrap();
                break;
            }
        }
        socket
    });

    let ack = tabs
        .send(
            &tab,
            PageCommand::UpdateProfilePicture {
                image_path: "http://127.0.0.1/images/variation_1_00.png".into(),
                image_name: "variation_1_00.png".into(),
            },
        )
        .await
        .unwrap();
    assert!(ack.success);

    let mut socket = page.await.unwrap();
    socket.close(None).await.unwrap();
    for _ in 0..100 {
        if tabs.connected() == 0 {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("page agent was not unregistered after close");
}
