// SPDX-FileCopyrightText: 2026 Portrait Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Router-level tests driven through `tower::ServiceExt::oneshot`.

use std::io::Cursor;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use portrait_core::{ControlCommand, ControlReply, ControlSurface};
use portrait_gateway::{AppState, GenerationService, TabBridge, build_router};
use portrait_imaging::VariationProducer;
use portrait_storage::{BaseFolder, ImageStore};
use serde_json::{Value, json};
use tempfile::TempDir;
use tower::ServiceExt;

struct Fixture {
    dir: TempDir,
    base: BaseFolder,
    state: AppState,
}

impl Fixture {
    fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(ImageStore::new(dir.path().join("images")));
        let base = BaseFolder::new(dir.path().join("base"), "base.jpg");
        let service = Arc::new(GenerationService::new(
            Arc::new(VariationProducer::local()),
            store,
            base.clone(),
        ));
        let state = AppState::new(service, TabBridge::new(Duration::from_secs(5)));
        Self {
            dir,
            base,
            state,
        }
    }

    fn router(&self) -> Router {
        build_router(self.state.clone())
    }
}

fn sample_png() -> Vec<u8> {
    let img = image::RgbImage::from_fn(64, 48, |x, y| {
        image::Rgb([(x * 4) as u8, (y * 5) as u8, 120])
    });
    let mut out = Cursor::new(Vec::new());
    img.write_to(&mut out, image::ImageFormat::Png).unwrap();
    out.into_inner()
}

async fn send(router: Router, request: Request<Body>) -> (StatusCode, Vec<u8>) {
    let response = router.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, bytes.to_vec())
}

async fn send_json(router: Router, request: Request<Body>) -> (StatusCode, Value) {
    let (status, bytes) = send(router, request).await;
    (status, serde_json::from_slice(&bytes).unwrap())
}

fn get(uri: &str) -> Request<Body> {
    Request::get(uri).body(Body::empty()).unwrap()
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::post(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn delete(uri: &str) -> Request<Body> {
    Request::delete(uri).body(Body::empty()).unwrap()
}

const BOUNDARY: &str = "portrait-test-boundary";

fn multipart(parts: &[(&str, Option<&str>, &[u8])]) -> Body {
    let mut body = Vec::new();
    for (name, file_name, data) in parts {
        body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
        match file_name {
            Some(file) => body.extend_from_slice(
                format!(
                    "Content-Disposition: form-data; name=\"{name}\"; filename=\"{file}\"\r\nContent-Type: image/png\r\n\r\n"
                )
                .as_bytes(),
            ),
            None => body.extend_from_slice(
                format!("Content-Disposition: form-data; name=\"{name}\"\r\n\r\n").as_bytes(),
            ),
        }
        body.extend_from_slice(data);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
    Body::from(body)
}

fn post_multipart(uri: &str, body: Body) -> Request<Body> {
    Request::post(uri)
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(body)
        .unwrap()
}

#[tokio::test]
async fn health_reports_zero_images_on_fresh_store() {
    let fx = Fixture::new();
    let (status, json) = send_json(fx.router(), get("/health")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "ok");
    assert_eq!(json["imageCount"], 0);
    assert!(json["uptimeSecs"].is_u64(), "{json}");
}

#[tokio::test]
async fn generate_from_base_without_photo_is_bad_request_naming_the_file() {
    let fx = Fixture::new();
    let (status, json) = send_json(
        fx.router(),
        post_json("/generate-from-base", json!({"numImages": 3})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["success"], false);
    assert!(json["error"].as_str().unwrap().contains("base.jpg"));
}

#[tokio::test]
async fn out_of_range_count_is_rejected_before_any_work() {
    let fx = Fixture::new();
    fx.base.replace(&sample_png()).await.unwrap();
    for count in [0, 51] {
        let (status, _) = send_json(
            fx.router(),
            post_json("/generate-from-base", json!({"numImages": count})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }
    let (_, json) = send_json(fx.router(), get("/images")).await;
    assert_eq!(json["count"], 0);
}

#[tokio::test]
async fn malformed_json_is_bad_request() {
    let fx = Fixture::new();
    let request = Request::post("/generate-from-base")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{not json"))
        .unwrap();
    let (status, json) = send_json(fx.router(), request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["success"], false);
}

#[tokio::test]
async fn generate_list_fetch_and_clear_round() {
    let fx = Fixture::new();
    fx.base.replace(&sample_png()).await.unwrap();

    let (status, json) = send_json(
        fx.router(),
        post_json("/generate-from-base", json!({"numImages": 3})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["success"], true);
    assert_eq!(json["count"], 3);

    let (_, listing) = send_json(fx.router(), get("/images")).await;
    assert_eq!(listing["count"], 3);
    let first = listing["images"][0]["filename"].as_str().unwrap().to_string();
    assert!(first.starts_with("variation_"));
    assert!(listing["images"][0]["filepath"].as_str().unwrap().ends_with(&first));

    let (health_status, health) = send_json(fx.router(), get("/health")).await;
    assert_eq!(health_status, StatusCode::OK);
    assert_eq!(health["imageCount"], 3);

    let response = fx
        .router()
        .oneshot(get(&format!("/images/{first}")))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::CONTENT_TYPE], "image/png");
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    assert!(image::load_from_memory(&bytes).is_ok());

    let (status, cleared) = send_json(fx.router(), delete("/images")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(cleared["success"], true);
    assert_eq!(cleared["count"], 3);

    let (_, listing) = send_json(fx.router(), get("/images")).await;
    assert_eq!(listing["count"], 0);

    let (status, cleared) = send_json(fx.router(), delete("/images")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(cleared["count"], 0);
}

#[tokio::test]
async fn unknown_and_traversal_filenames_are_not_found() {
    let fx = Fixture::new();
    let (status, json) = send_json(fx.router(), get("/images/nope.png")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["success"], false);

    let (status, _) = send(fx.router(), get("/images/%2E%2E")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn base64_generation_accepts_data_urls() {
    use base64::Engine;
    let fx = Fixture::new();
    let url = format!(
        "data:image/png;base64,{}",
        base64::engine::general_purpose::STANDARD.encode(sample_png())
    );
    let (status, json) = send_json(
        fx.router(),
        post_json(
            "/generate-images-base64",
            json!({"basePhoto": url, "numImages": 2}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["count"], 2);
}

#[tokio::test]
async fn multipart_generation_uses_any_file_field() {
    let fx = Fixture::new();
    let png = sample_png();
    let body = multipart(&[("numImages", None, b"2"), ("photo", Some("me.png"), &png)]);
    let (status, json) = send_json(fx.router(), post_multipart("/generate-images", body)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["count"], 2);
}

#[tokio::test]
async fn repeated_generation_keeps_a_single_uploaded_base() {
    let fx = Fixture::new();
    let png = sample_png();
    for name in ["me.png", "me.jpeg"] {
        let body = multipart(&[("numImages", None, b"1"), ("photo", Some(name), &png)]);
        let (status, _) = send_json(fx.router(), post_multipart("/generate-images", body)).await;
        assert_eq!(status, StatusCode::OK);
    }

    let uploads: Vec<String> = std::fs::read_dir(fx.dir.path().join("images"))
        .unwrap()
        .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
        .filter(|name| name.starts_with("base_"))
        .collect();
    assert_eq!(uploads.len(), 1, "{uploads:?}");

    let (_, listing) = send_json(fx.router(), get("/images")).await;
    assert_eq!(listing["count"], 2);
}

#[tokio::test]
async fn multipart_generation_without_file_is_bad_request() {
    let fx = Fixture::new();
    let body = multipart(&[("numImages", None, b"2")]);
    let (status, _) = send_json(fx.router(), post_multipart("/generate-images", body)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn upload_base_replaces_the_folder_photo() {
    let fx = Fixture::new();
    let png = sample_png();
    let body = multipart(&[("image", Some("portrait.png"), &png)]);
    let (status, json) = send_json(fx.router(), post_multipart("/upload-base", body)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json, json!({"ok": true, "filename": "base.jpg"}));
    assert_eq!(fx.base.read().await.unwrap(), png);
    assert_eq!(
        std::fs::read(fx.state.service.base_photo_path()).unwrap(),
        png
    );
}

#[tokio::test]
async fn control_is_unavailable_without_scheduler() {
    let fx = Fixture::new();
    let (status, _) = send_json(
        fx.router(),
        post_json("/control", json!({"action": "forceUpdate"})),
    )
    .await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
}

struct EchoControl;

#[async_trait]
impl ControlSurface for EchoControl {
    async fn handle(&self, command: ControlCommand) -> ControlReply {
        match command {
            ControlCommand::GenerateFromBase { num_images } => ControlReply::Generated {
                success: true,
                count: num_images as usize,
            },
            other => ControlReply::failed(format!("unexpected {}", other.action())),
        }
    }
}

#[tokio::test]
async fn control_forwards_to_attached_surface() {
    let fx = Fixture::new();
    let router = build_router(fx.state.clone().with_control(Arc::new(EchoControl)));
    let (status, json) = send_json(
        router.clone(),
        post_json("/control", json!({"action": "generateFromBase", "numImages": 4})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json, json!({"success": true, "count": 4}));

    let (status, _) = send_json(router, post_json("/control", json!({"action": "selfDestruct"}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn metrics_without_renderer_is_not_found() {
    let fx = Fixture::new();
    let (status, _) = send(fx.router(), get("/metrics")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
