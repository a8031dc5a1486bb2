//! Shared setup for router tests

#![allow(dead_code)]

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use axum::Router;
use serde_json::Value;
use tower::ServiceExt;

use ocr_lexicon_server::build_router;
use ocr_lexicon_server::config::Config;
use ocr_lexicon_server::db::create_memory_pool;
use ocr_lexicon_server::ocr::{MockProvider, OcrEngineKind, OcrService};
use ocr_lexicon_server::persistence::MemoryBackend;
use ocr_lexicon_server::state::AppState;

pub const MASTER_KEY: &str = "test-master-key";

pub struct TestApp {
    pub router: Router,
    pub backend: Arc<MemoryBackend>,
    pub state: AppState,
}

impl TestApp {
    pub async fn new(ocr_text: &str) -> Self {
        Self::with_config(ocr_text, |_| {}).await
    }

    pub async fn with_config(ocr_text: &str, configure: impl FnOnce(&mut Config)) -> Self {
        let mut config = Config::default();
        config.auth.admin_master_key = Some(MASTER_KEY.to_string());
        configure(&mut config);

        let pool = create_memory_pool().await.unwrap();
        let backend = Arc::new(MemoryBackend::new());
        let ocr = OcrService::with_providers(
            config.ocr.clone(),
            vec![Arc::new(MockProvider::new(OcrEngineKind::Tesseract, ocr_text))],
        );
        let state = AppState::from_parts(config, pool, backend.clone(), ocr)
            .await
            .unwrap();

        Self {
            router: build_router(state.clone()),
            backend,
            state,
        }
    }

    pub async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, body)
    }
}

pub fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

/// Request carrying `X-Admin-Key`
pub fn admin(method: Method, uri: &str, key: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("x-admin-key", key)
        .body(Body::empty())
        .unwrap()
}

pub fn admin_json(method: Method, uri: &str, key: &str, body: &Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("x-admin-key", key)
        .header("content-type", "application/json")
        .body(Body::from(serde_json::to_vec(body).unwrap()))
        .unwrap()
}

const BOUNDARY: &str = "ocr-test-boundary";

/// `multipart/form-data` upload with a `file` part and plain text fields
pub fn multipart(uri: &str, filename: &str, data: &[u8], fields: &[(&str, &str)]) -> Request<Body> {
    let mut body = Vec::new();
    for (name, value) in fields {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
            )
            .as_bytes(),
        );
    }
    body.extend_from_slice(
        format!(
            "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"{filename}\"\r\nContent-Type: application/octet-stream\r\n\r\n"
        )
        .as_bytes(),
    );
    body.extend_from_slice(data);
    body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());

    Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header(
            "content-type",
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(body))
        .unwrap()
}

/// A small valid PNG
pub fn png() -> Vec<u8> {
    let img = image::DynamicImage::new_rgb8(32, 16);
    let mut out = std::io::Cursor::new(Vec::new());
    img.write_to(&mut out, image::ImageFormat::Png).unwrap();
    out.into_inner()
}
