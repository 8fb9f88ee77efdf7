// src/lib.rs

use std::path::Path;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use tower_http::{cors::CorsLayer, services::ServeFile, trace::TraceLayer};

use services::order_service::OrderService;

#[derive(Clone)]
pub struct AppState {
    pub orders: OrderService,
    pub public_base_url: Option<String>,
    pub admin_api_key: Option<String>,
}

pub mod entities {
    pub mod prelude;
    pub mod orders;
}

pub mod services {
    pub mod mailer;
    pub mod order_repository;
    pub mod order_service;
    pub mod receipt_store;
    pub mod telegram;
    pub mod validation;
}

pub mod models {
    pub mod order;
}

pub mod handlers {
    pub mod health;
    pub mod orders;
    pub mod uploads;
}

pub mod config;
pub mod error;
pub mod test_utils;

/// All routes: static pages from `frontend_dir`, receipts, and the order API.
pub fn build_router(state: AppState, frontend_dir: &Path, max_upload_bytes: usize) -> Router {
    Router::new()
        .route_service("/", ServeFile::new(frontend_dir.join("index.html")))
        .route_service("/admin-panel", ServeFile::new(frontend_dir.join("admin.html")))
        .route("/health", get(handlers::health::health))
        .route("/uploads/{filename}", get(handlers::uploads::serve_receipt))
        .route("/verify-payment", post(handlers::orders::verify_payment))
        .route("/api/orders", get(handlers::orders::get_orders))
        .route("/api/orders/{order_id}", get(handlers::orders::get_order))
        .route("/api/send-link", post(handlers::orders::send_link))
        .route("/api/send-email", post(handlers::orders::send_email))
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
