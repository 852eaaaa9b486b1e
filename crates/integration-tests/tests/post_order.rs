//! Post-order mutations: item cancellation and the return lifecycle.

use serde_json::{Value, json};

use marigold_integration_tests::{TestApp, TestResponse};

fn address_body() -> Value {
    json!({
        "full_name": "Asha Rao",
        "line1": "14 MG Road",
        "city": "Bengaluru",
        "state": "Karnataka",
        "pin_code": "560001",
        "phone": "9876543210",
    })
}

/// Place a COD order of `quantity` kurtas at 799 for `user_id`.
/// Returns the placed order response.
async fn place_order(app: &TestApp, user_id: i32, quantity: u32) -> TestResponse {
    let product = app.seed_product("Kurta", 799, 20, &[]).await;
    app.login(user_id).await;
    let created = app.post("/addresses", address_body()).await;
    let id = created.field("id").clone();
    app.post(&format!("/addresses/{id}/select"), json!({})).await;

    app.post(
        "/cart/items",
        json!({ "product_id": product.id, "quantity": quantity }),
    )
    .await;
    app.post("/checkout/resolve", json!({})).await;
    let submitted = app
        .post("/checkout/submit", json!({ "payment_method": "cod" }))
        .await;
    assert_eq!(submitted.status, 200);
    submitted
}

fn item_id(placed: &TestResponse) -> Value {
    placed.field("items")[0]["id"].clone()
}

#[tokio::test]
async fn partial_cancellation_reduces_the_total() {
    let app = TestApp::new();
    let placed = place_order(&app, 1, 2).await;
    let item = item_id(&placed);
    assert_eq!(placed.field("order")["total"], "1598");

    let cancelled = app
        .post(&format!("/orders/items/{item}/cancel"), json!({ "quantity": 1 }))
        .await;
    assert_eq!(cancelled.status, 200);
    assert_eq!(cancelled.field("status"), "paid");
    assert_eq!(cancelled.field("total"), "799");
}

#[tokio::test]
async fn full_cancellation_cancels_the_order_and_releases_shipping() {
    let app = TestApp::new();
    // 349 < free-shipping threshold, so the order carries a 49 fee.
    let product = app.seed_product("Diya Set", 349, 10, &[]).await;
    app.login(2).await;
    let created = app.post("/addresses", address_body()).await;
    let id = created.field("id").clone();
    app.post(&format!("/addresses/{id}/select"), json!({})).await;
    app.post(
        "/cart/items",
        json!({ "product_id": product.id, "quantity": 1 }),
    )
    .await;
    app.post("/checkout/resolve", json!({})).await;
    let placed = app
        .post("/checkout/submit", json!({ "payment_method": "cod" }))
        .await;
    assert_eq!(placed.field("order")["total"], "398");
    let item = item_id(&placed);

    let cancelled = app
        .post(&format!("/orders/items/{item}/cancel"), json!({ "quantity": 1 }))
        .await;
    assert_eq!(cancelled.field("status"), "cancelled");
    assert_eq!(cancelled.field("total"), "0");

    // Nothing left to cancel.
    let again = app
        .post(&format!("/orders/items/{item}/cancel"), json!({ "quantity": 1 }))
        .await;
    assert_eq!(again.status, 422);
}

#[tokio::test]
async fn over_cancellation_is_rejected_and_totals_unchanged() {
    let app = TestApp::new();
    let placed = place_order(&app, 3, 2).await;
    let item = item_id(&placed);
    let order_id = placed.field("order")["id"].clone();

    let over = app
        .post(&format!("/orders/items/{item}/cancel"), json!({ "quantity": 3 }))
        .await;
    assert_eq!(over.status, 422);

    let fetched = app.get(&format!("/orders/{order_id}")).await;
    assert_eq!(fetched.field("order")["total"], "1598");
    assert_eq!(fetched.field("items")[0]["cancelled_quantity"], 0);
}

#[tokio::test]
async fn delivered_orders_cannot_cancel_but_can_return() {
    let app = TestApp::new();
    let placed = place_order(&app, 4, 2).await;
    let item = item_id(&placed);
    let order_id = placed.field("order")["id"].clone();

    // Returns need a delivered order.
    let early = app
        .post(
            &format!("/orders/items/{item}/return"),
            json!({ "quantity": 1, "reason": "wrong size" }),
        )
        .await;
    assert_eq!(early.status, 422);

    let delivered = app.post(&format!("/orders/{order_id}/deliver"), json!({})).await;
    assert_eq!(delivered.status, 200);

    // Cancellation window is closed after delivery.
    let late_cancel = app
        .post(&format!("/orders/items/{item}/cancel"), json!({ "quantity": 1 }))
        .await;
    assert_eq!(late_cancel.status, 422);

    // A blank reason is rejected.
    let blank = app
        .post(
            &format!("/orders/items/{item}/return"),
            json!({ "quantity": 1, "reason": "   " }),
        )
        .await;
    assert_eq!(blank.status, 422);

    let requested = app
        .post(
            &format!("/orders/items/{item}/return"),
            json!({ "quantity": 1, "reason": "wrong size" }),
        )
        .await;
    assert_eq!(requested.status, 200);
    assert_eq!(requested.field("status"), "pending");

    // The held unit is no longer returnable; only one unit remains free.
    let over = app
        .post(
            &format!("/orders/items/{item}/return"),
            json!({ "quantity": 2, "reason": "changed mind" }),
        )
        .await;
    assert_eq!(over.status, 422);
}

#[tokio::test]
async fn return_lifecycle_refund_adjusts_the_total() {
    let app = TestApp::new();
    let placed = place_order(&app, 5, 2).await;
    let item = item_id(&placed);
    let order_id = placed.field("order")["id"].clone();
    app.post(&format!("/orders/{order_id}/deliver"), json!({})).await;

    let requested = app
        .post(
            &format!("/orders/items/{item}/return"),
            json!({ "quantity": 2, "reason": "damaged" }),
        )
        .await;
    let request_id = requested.field("id").clone();

    // Approve fewer units than requested.
    let approved = app
        .post(
            &format!("/admin/returns/{request_id}/approve"),
            json!({ "approved_quantity": 1 }),
        )
        .await;
    assert_eq!(approved.status, 200);
    assert_eq!(approved.field("status"), "approved");
    assert_eq!(approved.field("approved_quantity"), 1);

    let refunded = app
        .post(&format!("/admin/returns/{request_id}/refund"), json!({}))
        .await;
    assert_eq!(refunded.status, 200);
    assert_eq!(refunded.field("status"), "refunded");

    // Total dropped by one unit's price.
    let fetched = app.get(&format!("/orders/{order_id}")).await;
    assert_eq!(fetched.field("order")["total"], "799");

    // Refunded is terminal.
    let again = app
        .post(&format!("/admin/returns/{request_id}/refund"), json!({}))
        .await;
    assert_eq!(again.status, 422);
}

#[tokio::test]
async fn racing_refunds_deduct_the_total_once() {
    let app = TestApp::new();
    let placed = place_order(&app, 9, 2).await;
    let item = item_id(&placed);
    let order_id = placed.field("order")["id"].clone();
    app.post(&format!("/orders/{order_id}/deliver"), json!({})).await;

    let requested = app
        .post(
            &format!("/orders/items/{item}/return"),
            json!({ "quantity": 2, "reason": "damaged" }),
        )
        .await;
    let request_id = requested.field("id").clone();
    app.post(&format!("/admin/returns/{request_id}/approve"), json!({}))
        .await;

    // Two operators hit refund at once; only one transition lands.
    let path = format!("/admin/returns/{request_id}/refund");
    let (a, b) = tokio::join!(app.post(&path, json!({})), app.post(&path, json!({})));
    let succeeded = [a.status, b.status]
        .iter()
        .filter(|status| **status == 200)
        .count();
    assert_eq!(succeeded, 1, "got {} and {}", a.status, b.status);

    // Both units refunded exactly once: 1598 - 1598, never negative.
    let fetched = app.get(&format!("/orders/{order_id}")).await;
    assert_eq!(fetched.field("order")["total"], "0");
}

#[tokio::test]
async fn buyer_can_withdraw_only_pending_requests() {
    let app = TestApp::new();
    let placed = place_order(&app, 6, 1).await;
    let item = item_id(&placed);
    let order_id = placed.field("order")["id"].clone();
    app.post(&format!("/orders/{order_id}/deliver"), json!({})).await;

    let requested = app
        .post(
            &format!("/orders/items/{item}/return"),
            json!({ "quantity": 1, "reason": "damaged" }),
        )
        .await;
    let request_id = requested.field("id").clone();

    let withdrawn = app
        .post(&format!("/returns/{request_id}/cancel"), json!({}))
        .await;
    assert_eq!(withdrawn.status, 200);
    assert_eq!(withdrawn.field("status"), "cancelled");

    // A withdrawn request releases its held quantity.
    let second = app
        .post(
            &format!("/orders/items/{item}/return"),
            json!({ "quantity": 1, "reason": "damaged" }),
        )
        .await;
    assert_eq!(second.status, 200);
    let second_id = second.field("id").clone();

    // Once rejected, withdrawal is off the table.
    app.post(&format!("/admin/returns/{second_id}/reject"), json!({}))
        .await;
    let too_late = app
        .post(&format!("/returns/{second_id}/cancel"), json!({}))
        .await;
    assert_eq!(too_late.status, 422);
}

#[tokio::test]
async fn other_users_cannot_touch_the_order() {
    let app = TestApp::new();
    let placed = place_order(&app, 7, 1).await;
    let item = item_id(&placed);
    let order_id = placed.field("order")["id"].clone();

    let intruder = app.another_session();
    intruder.login(8).await;

    let fetch = intruder.get(&format!("/orders/{order_id}")).await;
    assert_eq!(fetch.status, 404);

    let cancel = intruder
        .post(&format!("/orders/items/{item}/cancel"), json!({ "quantity": 1 }))
        .await;
    assert_eq!(cancel.status, 404);
}
