#![allow(dead_code)]

use std::sync::Arc;

use axum::{
    body::{to_bytes, Body},
    http::{Method, Request, StatusCode},
    Router,
};
use rust_decimal::Decimal;
use serde_json::{json, Value};
use storeflow_api::{
    config::AppConfig,
    db,
    events::{self, EventSender},
    handlers::AppServices,
    AppState,
};
use tokio::sync::mpsc;
use tower::ServiceExt;
use uuid::Uuid;

/// Helper harness spinning up the application router backed by a sqlite
/// database in a temp directory. Each TestApp gets a fresh schema.
pub struct TestApp {
    router: Router,
    #[allow(dead_code)]
    pub state: AppState,
    _event_task: tokio::task::JoinHandle<()>,
    _db_dir: tempfile::TempDir,
}

impl TestApp {
    /// Construct a new test application with fresh database state.
    pub async fn new() -> Self {
        let db_dir = tempfile::tempdir().expect("failed to create temp dir for test db");
        let db_path = db_dir.path().join("storeflow_test.db");

        let mut cfg = AppConfig::new(
            format!("sqlite://{}?mode=rwc", db_path.display()),
            "127.0.0.1".to_string(),
            18_080,
            "test".to_string(),
        );
        cfg.auto_migrate = true;
        cfg.db_max_connections = 1;
        cfg.db_min_connections = 1;

        let pool = db::establish_connection_from_app_config(&cfg)
            .await
            .expect("failed to create test database");
        db::run_migrations(&pool)
            .await
            .expect("failed to run migrations in tests");

        let db_arc = Arc::new(pool);
        let (event_tx, event_rx) = mpsc::channel(256);
        let event_sender = EventSender::new(event_tx);
        let event_task = tokio::spawn(events::process_events(event_rx));

        let services = AppServices::new(db_arc.clone(), event_sender.clone(), &cfg);

        let state = AppState {
            db: db_arc,
            config: cfg,
            event_sender,
            services,
        };

        let router = Router::new()
            .merge(storeflow_api::health_routes())
            .nest("/api/v1", storeflow_api::api_v1_routes())
            .with_state(state.clone());

        Self {
            router,
            state,
            _event_task: event_task,
            _db_dir: db_dir,
        }
    }

    /// Send a request against the router with optional JSON body and headers.
    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        body: Option<Value>,
        headers: &[(&str, &str)],
    ) -> axum::response::Response {
        let mut builder = Request::builder().method(method).uri(uri);

        for (name, value) in headers {
            builder = builder.header(*name, *value);
        }

        let body = if let Some(json) = body {
            builder = builder.header("content-type", "application/json");
            Body::from(serde_json::to_vec(&json).expect("failed to serialize json request body"))
        } else {
            Body::empty()
        };

        let request = builder.body(body).expect("failed to build request");
        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("router error during test request")
    }

    /// Request with the acting branch header set.
    pub async fn request_as_branch(
        &self,
        method: Method,
        uri: &str,
        branch_id: Uuid,
        body: Option<Value>,
    ) -> axum::response::Response {
        let branch = branch_id.to_string();
        self.request(method, uri, body, &[("x-branch-id", branch.as_str())])
            .await
    }

    /// Seed a branch through the API, returning its id.
    pub async fn seed_branch(&self, code: &str) -> Uuid {
        let response = self
            .request(
                Method::POST,
                "/api/v1/branches",
                Some(json!({ "code": code, "name": format!("Branch {}", code) })),
                &[],
            )
            .await;
        assert_eq!(response.status(), StatusCode::CREATED, "seed branch {}", code);
        let body = read_json(response).await;
        Uuid::parse_str(body["id"].as_str().expect("branch id")).expect("branch uuid")
    }

    /// Seed a product through the API, returning its id.
    pub async fn seed_product(&self, code: &str, name: &str) -> Uuid {
        let response = self
            .request(
                Method::POST,
                "/api/v1/products",
                Some(json!({ "code": code, "name": name })),
                &[],
            )
            .await;
        assert_eq!(response.status(), StatusCode::CREATED, "seed product {}", code);
        let body = read_json(response).await;
        Uuid::parse_str(body["id"].as_str().expect("product id")).expect("product uuid")
    }

    /// Set the stock level for a product at a branch through the API.
    pub async fn set_stock(&self, product_id: Uuid, branch_id: Uuid, on_hand: Decimal, cost: Decimal) {
        let response = self
            .request(
                Method::POST,
                "/api/v1/inventory/levels",
                Some(json!({
                    "productId": product_id,
                    "branchId": branch_id,
                    "onHand": on_hand,
                    "cost": cost,
                })),
                &[],
            )
            .await;
        assert_eq!(response.status(), StatusCode::OK, "set stock");
    }

    /// Current on-hand quantity for a product at a branch.
    pub async fn on_hand(&self, product_id: Uuid, branch_id: Uuid) -> Decimal {
        let response = self
            .request(
                Method::GET,
                &format!(
                    "/api/v1/inventory?productId={}&branchId={}",
                    product_id, branch_id
                ),
                None,
                &[],
            )
            .await;
        assert_eq!(response.status(), StatusCode::OK, "read stock");
        let body = read_json(response).await;
        dec(&body["onHand"])
    }
}

/// Decimal fields serialize as strings; accept numbers too for request
/// echoes.
pub fn dec(value: &Value) -> Decimal {
    match value {
        Value::String(s) => s.parse().expect("decimal string"),
        Value::Number(n) => Decimal::try_from(n.as_f64().expect("numeric decimal"))
            .expect("decimal from number"),
        other => panic!("expected decimal-like json value, got {}", other),
    }
}

/// Reads a response body as JSON.
pub async fn read_json(response: axum::response::Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("failed to read response body");
    serde_json::from_slice(&bytes).expect("response body is not valid json")
}

/// Builds a transfer payload with the given lines.
pub fn transfer_payload(from: Uuid, to: Uuid, status: i64, lines: Value) -> Value {
    json!({
        "fromBranchId": from,
        "toBranchId": to,
        "status": status,
        "transferDetails": lines,
    })
}
