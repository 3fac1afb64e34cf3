mod common;

use axum::http::{Method, StatusCode};
use rust_decimal_macros::dec;
use serde_json::json;
use uuid::Uuid;

use common::{dec, read_json, TestApp};

#[tokio::test]
async fn snapshot_refresh_returns_live_figures() {
    let app = TestApp::new().await;
    let from = app.seed_branch("HQ").await;
    let to = app.seed_branch("WEST").await;
    let product = app.seed_product("SKU-1", "Arabica beans 1kg").await;
    app.set_stock(product, from, dec!(12), dec!(2.5)).await;
    app.set_stock(product, to, dec!(3), dec!(2.75)).await;

    let response = app
        .request(
            Method::POST,
            "/api/v1/transfers/snapshot",
            Some(json!({
                "fromBranchId": from,
                "toBranchId": to,
                "lines": [{
                    "productId": product,
                    "price": 1.0,
                    "fromInventory": 99,
                    "toInventory": 99,
                }],
            })),
            &[("x-form-session", "form-1")],
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = read_json(response).await;
    let line = &body[0];
    assert_eq!(line["refreshed"], true);
    assert_eq!(dec(&line["fromInventory"]), dec!(12));
    assert_eq!(dec(&line["toInventory"]), dec!(3));
    assert_eq!(dec(&line["price"]), dec!(2.5));
}

#[tokio::test]
async fn failed_lookup_echoes_prior_values() {
    let app = TestApp::new().await;
    let from = app.seed_branch("HQ").await;
    let to = app.seed_branch("WEST").await;
    let known = app.seed_product("SKU-1", "Arabica beans 1kg").await;
    app.set_stock(known, from, dec!(5), dec!(2.0)).await;
    let unknown = Uuid::new_v4();

    let response = app
        .request(
            Method::POST,
            "/api/v1/transfers/snapshot",
            Some(json!({
                "fromBranchId": from,
                "toBranchId": to,
                "lines": [
                    {
                        "productId": unknown,
                        "price": 7.5,
                        "fromInventory": 4,
                        "toInventory": 2,
                    },
                    { "productId": known },
                ],
            })),
            &[("x-form-session", "form-1")],
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = read_json(response).await;

    // One bad product keeps its submitted figures; the rest refresh.
    assert_eq!(body[0]["refreshed"], false);
    assert_eq!(dec(&body[0]["price"]), dec!(7.5));
    assert_eq!(dec(&body[0]["fromInventory"]), dec!(4));
    assert_eq!(body[1]["refreshed"], true);
    assert_eq!(dec(&body[1]["fromInventory"]), dec!(5));
}

#[tokio::test]
async fn snapshot_rejects_equal_branch_pair() {
    let app = TestApp::new().await;
    let branch = app.seed_branch("HQ").await;

    let response = app
        .request(
            Method::POST,
            "/api/v1/transfers/snapshot",
            Some(json!({
                "fromBranchId": branch,
                "toBranchId": branch,
                "lines": [],
            })),
            &[],
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn distinct_form_sessions_refresh_independently() {
    let app = TestApp::new().await;
    let from = app.seed_branch("HQ").await;
    let to = app.seed_branch("WEST").await;
    let product = app.seed_product("SKU-1", "Arabica beans 1kg").await;
    app.set_stock(product, from, dec!(12), dec!(2.5)).await;

    for session in ["form-a", "form-b"] {
        let response = app
            .request(
                Method::POST,
                "/api/v1/transfers/snapshot",
                Some(json!({
                    "fromBranchId": from,
                    "toBranchId": to,
                    "lines": [{ "productId": product }],
                })),
                &[("x-form-session", session)],
            )
            .await;
        assert_eq!(response.status(), StatusCode::OK, "session {}", session);
    }
}
