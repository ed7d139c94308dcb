//! Storefront order-fulfillment API.
//!
//! The core of this crate is the checkout pipeline (seller-scoped cart
//! partitioning, tiered pricing, payment gating, atomic order
//! creation) and the role-constrained order lifecycle. Catalog
//! browsing, authentication, and messaging are upstream collaborators.

#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![warn(clippy::all, clippy::perf, clippy::dbg_macro)]

pub mod auth;
pub mod checkout;
pub mod config;
pub mod db;
pub mod entities;
pub mod errors;
pub mod events;
pub mod handlers;
pub mod lifecycle;
pub mod openapi;
pub mod services;

use std::sync::Arc;

use axum::{extract::State, response::Json, routing::get, routing::post, routing::put, Router};
use serde::Serialize;
use serde_json::{json, Value};
use utoipa::ToSchema;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<db::DbPool>,
    pub config: config::AppConfig,
    pub event_sender: events::EventSender,
    pub services: handlers::AppServices,
}

/// Common response wrapper.
#[derive(Serialize, ToSchema)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub message: Option<String>,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            message: None,
        }
    }

    pub fn error(message: String) -> Self {
        Self {
            success: false,
            data: None,
            message: Some(message),
        }
    }
}

/// Standard API result type for JSON responses
pub type ApiResult<T> = Result<Json<ApiResponse<T>>, errors::ServiceError>;

pub fn api_v1_routes() -> Router<AppState> {
    Router::new()
        .route("/status", get(api_status))
        .route("/health", get(health_check))
        .route("/checkout/quote", post(handlers::checkout::quote))
        .route("/checkout/payment", post(handlers::checkout::begin_payment))
        .route("/checkout/orders", post(handlers::checkout::place_order))
        .route("/orders", get(handlers::orders::list_orders))
        .route("/orders/:id", get(handlers::orders::get_order))
        .route(
            "/orders/:id/status",
            put(handlers::orders::update_order_status),
        )
        .route(
            "/orders/:id/payment/paid",
            post(handlers::orders::mark_cod_paid),
        )
        .route("/orders/:id/tracking", put(handlers::orders::set_tracking))
}

async fn api_status() -> Json<ApiResponse<Value>> {
    Json(ApiResponse::success(json!({
        "status": "ok",
        "service": "storefront-api",
        "version": env!("CARGO_PKG_VERSION"),
        "timestamp": chrono::Utc::now().to_rfc3339(),
    })))
}

async fn health_check(State(state): State<AppState>) -> Json<ApiResponse<Value>> {
    let db_status = match state.db.ping().await {
        Ok(_) => "healthy",
        Err(_) => "unhealthy",
    };

    Json(ApiResponse::success(json!({
        "status": db_status,
        "checks": { "database": db_status },
        "timestamp": chrono::Utc::now().to_rfc3339(),
    })))
}
