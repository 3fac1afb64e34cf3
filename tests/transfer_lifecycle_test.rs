mod common;

use axum::http::{Method, StatusCode};
use rust_decimal_macros::dec;
use serde_json::json;
use uuid::Uuid;

use common::{dec, read_json, transfer_payload, TestApp};

async fn seed_pair(app: &TestApp) -> (Uuid, Uuid, Uuid) {
    let from = app.seed_branch("HQ").await;
    let to = app.seed_branch("WEST").await;
    let product = app.seed_product("SKU-1", "Arabica beans 1kg").await;
    app.set_stock(product, from, dec!(10), dec!(2.5)).await;
    (from, to, product)
}

#[tokio::test]
async fn draft_dispatch_receive_moves_stock() {
    let app = TestApp::new().await;
    let (from, to, product) = seed_pair(&app).await;

    // Sender saves a draft; stock stays put.
    let response = app
        .request_as_branch(
            Method::POST,
            "/api/v1/transfers",
            from,
            Some(transfer_payload(
                from,
                to,
                1,
                json!([{ "productId": product, "sendQuantity": 4 }]),
            )),
        )
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let body = read_json(response).await;
    let transfer_id = body["id"].as_str().unwrap().to_string();
    assert_eq!(body["status"], 1);
    assert!(body["code"].as_str().unwrap().starts_with("TRF-"));
    // Price is snapshotted from the source branch's unit cost.
    assert_eq!(dec(&body["transferDetails"][0]["price"]), dec!(2.5));
    // The receiver has not weighed in; received mirrors send.
    assert_eq!(
        dec(&body["transferDetails"][0]["receivedQuantity"]),
        dec!(4)
    );
    assert_eq!(app.on_hand(product, from).await, dec!(10));

    // Sender marks in transit; the source branch is debited.
    let response = app
        .request_as_branch(
            Method::PUT,
            &format!("/api/v1/transfers/{}", transfer_id),
            from,
            Some(transfer_payload(
                from,
                to,
                2,
                json!([{ "productId": product, "sendQuantity": 4 }]),
            )),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = read_json(response).await;
    assert_eq!(body["status"], 2);
    assert!(body["dispatchedAt"].is_string());
    assert_eq!(app.on_hand(product, from).await, dec!(6));

    // Receiver confirms a partial receipt; destination is credited with
    // what actually arrived.
    let response = app
        .request_as_branch(
            Method::PUT,
            &format!("/api/v1/transfers/{}", transfer_id),
            to,
            Some(transfer_payload(
                from,
                to,
                3,
                json!([{ "productId": product, "sendQuantity": 4, "receivedQuantity": 3 }]),
            )),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = read_json(response).await;
    assert_eq!(body["status"], 3);
    assert_eq!(body["receiveStatus"], "unmatched");
    assert!(body["receivedAt"].is_string());
    assert_eq!(app.on_hand(product, to).await, dec!(3));
    assert_eq!(app.on_hand(product, from).await, dec!(6));
}

#[tokio::test]
async fn dispatch_mirrors_send_quantities_into_received() {
    let app = TestApp::new().await;
    let (from, to, product) = seed_pair(&app).await;
    let second = app.seed_product("SKU-2", "Robusta beans 1kg").await;
    app.set_stock(second, from, dec!(8), dec!(1.25)).await;

    let response = app
        .request_as_branch(
            Method::POST,
            "/api/v1/transfers",
            from,
            Some(transfer_payload(
                from,
                to,
                2,
                json!([
                    { "productId": product, "sendQuantity": 2 },
                    { "productId": second, "sendQuantity": 5 },
                ]),
            )),
        )
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let body = read_json(response).await;
    assert_eq!(body["status"], 2);
    for line in body["transferDetails"].as_array().unwrap() {
        assert_eq!(dec(&line["receivedQuantity"]), dec(&line["sendQuantity"]));
    }
    assert_eq!(body["receiveStatus"], "matched");
    assert_eq!(app.on_hand(product, from).await, dec!(8));
    assert_eq!(app.on_hand(second, from).await, dec!(3));
}

#[tokio::test]
async fn send_quantity_above_on_hand_is_rejected() {
    let app = TestApp::new().await;
    let (from, to, product) = seed_pair(&app).await;

    let response = app
        .request_as_branch(
            Method::POST,
            "/api/v1/transfers",
            from,
            Some(transfer_payload(
                from,
                to,
                1,
                json!([{ "productId": product, "sendQuantity": 15 }]),
            )),
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    // Nothing was persisted.
    let response = app
        .request(Method::GET, "/api/v1/transfers", None, &[])
        .await;
    let body = read_json(response).await;
    assert_eq!(body["total"], 0);
}

#[tokio::test]
async fn same_branch_pair_never_reaches_the_database() {
    let app = TestApp::new().await;
    let (from, _to, product) = seed_pair(&app).await;

    let response = app
        .request_as_branch(
            Method::POST,
            "/api/v1/transfers",
            from,
            Some(transfer_payload(
                from,
                from,
                1,
                json!([{ "productId": product, "sendQuantity": 1 }]),
            )),
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = app
        .request(Method::GET, "/api/v1/transfers", None, &[])
        .await;
    let body = read_json(response).await;
    assert_eq!(body["total"], 0);
}

#[tokio::test]
async fn empty_line_list_is_rejected() {
    let app = TestApp::new().await;
    let (from, to, _product) = seed_pair(&app).await;

    let response = app
        .request_as_branch(
            Method::POST,
            "/api/v1/transfers",
            from,
            Some(transfer_payload(from, to, 1, json!([]))),
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn duplicate_product_in_lines_is_rejected() {
    let app = TestApp::new().await;
    let (from, to, product) = seed_pair(&app).await;

    let response = app
        .request_as_branch(
            Method::POST,
            "/api/v1/transfers",
            from,
            Some(transfer_payload(
                from,
                to,
                1,
                json!([
                    { "productId": product, "sendQuantity": 1 },
                    { "productId": product, "sendQuantity": 2 },
                ]),
            )),
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = read_json(response).await;
    assert!(body["message"]
        .as_str()
        .unwrap()
        .contains("already in the line list"));
}

async fn dispatched_transfer(app: &TestApp, from: Uuid, to: Uuid, product: Uuid) -> String {
    let response = app
        .request_as_branch(
            Method::POST,
            "/api/v1/transfers",
            from,
            Some(transfer_payload(
                from,
                to,
                2,
                json!([{ "productId": product, "sendQuantity": 5 }]),
            )),
        )
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    read_json(response).await["id"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn receiver_cannot_exceed_send_quantity() {
    let app = TestApp::new().await;
    let (from, to, product) = seed_pair(&app).await;
    let transfer_id = dispatched_transfer(&app, from, to, product).await;

    let response = app
        .request_as_branch(
            Method::PUT,
            &format!("/api/v1/transfers/{}", transfer_id),
            to,
            Some(transfer_payload(
                from,
                to,
                2,
                json!([{ "productId": product, "sendQuantity": 5, "receivedQuantity": 7 }]),
            )),
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    // The stored line is unchanged, still clamped at the send quantity.
    let response = app
        .request_as_branch(
            Method::GET,
            &format!("/api/v1/transfers/{}", transfer_id),
            to,
            None,
        )
        .await;
    let body = read_json(response).await;
    assert_eq!(
        dec(&body["lines"][0]["line"]["receivedQuantity"]),
        dec!(5)
    );
}

#[tokio::test]
async fn receiver_cannot_touch_sender_fields() {
    let app = TestApp::new().await;
    let (from, to, product) = seed_pair(&app).await;
    let transfer_id = dispatched_transfer(&app, from, to, product).await;

    // Send quantity is sender-owned.
    let response = app
        .request_as_branch(
            Method::PUT,
            &format!("/api/v1/transfers/{}", transfer_id),
            to,
            Some(transfer_payload(
                from,
                to,
                2,
                json!([{ "productId": product, "sendQuantity": 9, "receivedQuantity": 2 }]),
            )),
        )
        .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    // So is the line list itself.
    let other = app.seed_product("SKU-X", "Paper cups").await;
    let response = app
        .request_as_branch(
            Method::PUT,
            &format!("/api/v1/transfers/{}", transfer_id),
            to,
            Some(transfer_payload(
                from,
                to,
                2,
                json!([{ "productId": other, "sendQuantity": 5 }]),
            )),
        )
        .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn receiver_cannot_dispatch_a_draft() {
    let app = TestApp::new().await;
    let (from, to, product) = seed_pair(&app).await;

    let response = app
        .request_as_branch(
            Method::POST,
            "/api/v1/transfers",
            from,
            Some(transfer_payload(
                from,
                to,
                1,
                json!([{ "productId": product, "sendQuantity": 2 }]),
            )),
        )
        .await;
    let transfer_id = read_json(response).await["id"].as_str().unwrap().to_string();

    let response = app
        .request_as_branch(
            Method::PUT,
            &format!("/api/v1/transfers/{}", transfer_id),
            to,
            Some(transfer_payload(
                from,
                to,
                2,
                json!([{ "productId": product, "sendQuantity": 2 }]),
            )),
        )
        .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn sender_cannot_mark_received() {
    let app = TestApp::new().await;
    let (from, to, product) = seed_pair(&app).await;
    let transfer_id = dispatched_transfer(&app, from, to, product).await;

    let response = app
        .request_as_branch(
            Method::PUT,
            &format!("/api/v1/transfers/{}", transfer_id),
            from,
            Some(transfer_payload(
                from,
                to,
                3,
                json!([{ "productId": product, "sendQuantity": 5 }]),
            )),
        )
        .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn terminal_transfer_rejects_further_edits() {
    let app = TestApp::new().await;
    let (from, to, product) = seed_pair(&app).await;
    let transfer_id = dispatched_transfer(&app, from, to, product).await;

    let response = app
        .request_as_branch(
            Method::PUT,
            &format!("/api/v1/transfers/{}", transfer_id),
            to,
            Some(transfer_payload(
                from,
                to,
                3,
                json!([{ "productId": product, "sendQuantity": 5, "receivedQuantity": 5 }]),
            )),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .request_as_branch(
            Method::PUT,
            &format!("/api/v1/transfers/{}", transfer_id),
            from,
            Some(transfer_payload(
                from,
                to,
                4,
                json!([{ "productId": product, "sendQuantity": 5 }]),
            )),
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn cancelling_in_transit_restores_source_stock() {
    let app = TestApp::new().await;
    let (from, to, product) = seed_pair(&app).await;
    let transfer_id = dispatched_transfer(&app, from, to, product).await;
    assert_eq!(app.on_hand(product, from).await, dec!(5));

    let response = app
        .request_as_branch(
            Method::PUT,
            &format!("/api/v1/transfers/{}", transfer_id),
            from,
            Some(transfer_payload(
                from,
                to,
                4,
                json!([{ "productId": product, "sendQuantity": 5 }]),
            )),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = read_json(response).await;
    assert_eq!(body["status"], 4);
    assert_eq!(app.on_hand(product, from).await, dec!(10));
}

#[tokio::test]
async fn form_view_is_role_discriminated() {
    let app = TestApp::new().await;
    let (from, to, product) = seed_pair(&app).await;
    let transfer_id = dispatched_transfer(&app, from, to, product).await;

    let response = app
        .request_as_branch(
            Method::GET,
            &format!("/api/v1/transfers/{}", transfer_id),
            from,
            None,
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = read_json(response).await;
    assert_eq!(body["role"], "sender");
    assert_eq!(body["branchesLocked"], true);
    assert_eq!(body["linesEditable"], true);
    assert_eq!(dec(&body["lines"][0]["fromInventory"]), dec!(5));

    let response = app
        .request_as_branch(
            Method::GET,
            &format!("/api/v1/transfers/{}", transfer_id),
            to,
            None,
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = read_json(response).await;
    assert_eq!(body["role"], "receiver");
    assert_eq!(body["receiptEditable"], true);

    // A branch on neither side of the movement sees nothing.
    let outsider = app.seed_branch("EAST").await;
    let response = app
        .request_as_branch(
            Method::GET,
            &format!("/api/v1/transfers/{}", transfer_id),
            outsider,
            None,
        )
        .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn acting_branch_is_required_for_mutations() {
    let app = TestApp::new().await;
    let (from, to, product) = seed_pair(&app).await;

    let response = app
        .request(
            Method::POST,
            "/api/v1/transfers",
            Some(transfer_payload(
                from,
                to,
                1,
                json!([{ "productId": product, "sendQuantity": 1 }]),
            )),
            &[],
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn legacy_description_field_maps_to_source_note() {
    let app = TestApp::new().await;
    let (from, to, product) = seed_pair(&app).await;

    let mut payload = transfer_payload(
        from,
        to,
        1,
        json!([{ "productId": product, "sendQuantity": 1 }]),
    );
    payload["description"] = json!("weekly replenishment");

    let response = app
        .request_as_branch(Method::POST, "/api/v1/transfers", from, Some(payload))
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let body = read_json(response).await;
    assert_eq!(body["noteBySource"], "weekly replenishment");
}
