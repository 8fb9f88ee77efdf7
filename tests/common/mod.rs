use std::path::Path;
use std::sync::Arc;

use axum::{body::Body, http::Request, Router};
use http_body_util::BodyExt;
use serde_json::Value;
use tempfile::TempDir;

use webcert_backend::{
    build_router,
    services::{
        order_repository::InMemoryOrderRepository, order_service::OrderService, receipt_store::ReceiptStore,
    },
    test_utils::{RecordingAnnouncer, RecordingMailer},
    AppState,
};

pub const BOUNDARY: &str = "----webcert-test-boundary";

/// A router wired to in-memory storage and recording notifiers.
pub struct TestApp {
    pub router: Router,
    pub repository: Arc<InMemoryOrderRepository>,
    pub announcer: Arc<RecordingAnnouncer>,
    pub mailer: Arc<RecordingMailer>,
    pub uploads: TempDir,
    #[allow(dead_code)]
    pub frontend: TempDir,
}

#[derive(Default)]
pub struct TestAppOptions {
    pub repository: Option<InMemoryOrderRepository>,
    pub mailer: Option<RecordingMailer>,
    pub admin_api_key: Option<String>,
    pub public_base_url: Option<String>,
}

pub fn test_app() -> TestApp {
    test_app_with(TestAppOptions::default())
}

pub fn test_app_with(options: TestAppOptions) -> TestApp {
    let uploads = tempfile::tempdir().expect("uploads dir");
    let frontend = tempfile::tempdir().expect("frontend dir");
    write_page(frontend.path(), "index.html", "<h1>Order</h1>");
    write_page(frontend.path(), "admin.html", "<h1>Admin</h1>");

    let repository = Arc::new(options.repository.unwrap_or_default());
    let announcer = Arc::new(RecordingAnnouncer::default());
    let mailer = Arc::new(options.mailer.unwrap_or_else(RecordingMailer::succeeding));

    let state = AppState {
        orders: OrderService::new(
            repository.clone(),
            ReceiptStore::new(uploads.path()),
            announcer.clone(),
            mailer.clone(),
        ),
        public_base_url: options.public_base_url,
        admin_api_key: options.admin_api_key,
    };

    TestApp {
        router: build_router(state, frontend.path(), 1024 * 1024),
        repository,
        announcer,
        mailer,
        uploads,
        frontend,
    }
}

fn write_page(dir: &Path, name: &str, html: &str) {
    std::fs::write(dir.join(name), html).expect("write page");
}

/// Multipart body with the given text fields and an optional `receipt` file part.
pub fn multipart_body(fields: &[(&str, &str)], receipt: Option<(&str, &[u8])>) -> Vec<u8> {
    let mut body = Vec::new();
    for (name, value) in fields {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
            )
            .as_bytes(),
        );
    }
    if let Some((file_name, bytes)) = receipt {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"receipt\"; filename=\"{file_name}\"\r\nContent-Type: application/octet-stream\r\n\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(bytes);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
    body
}

pub fn submit_request(fields: &[(&str, &str)], receipt: Option<(&str, &[u8])>) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/verify-payment")
        .header("host", "certs.test")
        .header("content-type", format!("multipart/form-data; boundary={BOUNDARY}"))
        .body(Body::from(multipart_body(fields, receipt)))
        .unwrap()
}

pub fn json_request(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

pub fn get_request(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

pub async fn body_bytes(response: axum::response::Response) -> Vec<u8> {
    response.into_body().collect().await.unwrap().to_bytes().to_vec()
}

pub async fn body_json(response: axum::response::Response) -> Value {
    serde_json::from_slice(&body_bytes(response).await).unwrap()
}
