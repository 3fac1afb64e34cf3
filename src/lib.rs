//! Storeflow API Library
//!
//! Core functionality for the Storeflow branch-operations backend: the
//! product catalog, per-branch inventory, and the inter-branch transfer
//! lifecycle.
#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![allow(elided_lifetimes_in_paths)]
#![warn(clippy::all, clippy::perf, clippy::dbg_macro)]

// Core modules
pub mod config;
pub mod db;
pub mod entities;
pub mod errors;
pub mod events;
pub mod handlers;
pub mod metrics;
pub mod middleware_helpers;
pub mod migrator;
pub mod models;
pub mod openapi;
pub mod services;
pub mod tracing;

use axum::{routing::get, Router};
use sea_orm::DatabaseConnection;
use serde::Serialize;
use std::sync::Arc;
use utoipa::ToSchema;

// App state definition
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<DatabaseConnection>,
    pub config: config::AppConfig,
    pub event_sender: events::EventSender,
    pub services: handlers::AppServices,
}

/// Page envelope shared by list endpoints
#[derive(Serialize, ToSchema)]
pub struct PaginatedResponse<T> {
    pub items: Vec<T>,
    pub total: u64,
    pub page: u64,
    pub limit: u64,
    pub total_pages: u64,
}

/// Full v1 API surface
pub fn api_v1_routes() -> Router<AppState> {
    Router::new()
        .nest("/branches", handlers::branches::branch_routes())
        .nest("/products", handlers::products::product_routes())
        .nest("/inventory", handlers::inventory::inventory_routes())
        .nest("/transfers", handlers::transfers::transfer_routes())
}

/// Liveness/readiness body for `/` and `/health`
pub async fn health_handler(
    axum::extract::State(state): axum::extract::State<AppState>,
) -> axum::Json<serde_json::Value> {
    let database = match db::check_connection(&state.db).await {
        Ok(()) => "up",
        Err(_) => "down",
    };
    axum::Json(serde_json::json!({
        "service": "storeflow-api",
        "database": database,
    }))
}

/// Router for health probes, mounted outside /api/v1
pub fn health_routes() -> Router<AppState> {
    Router::new().route("/health", get(health_handler))
}
