//! The gateway payment protocol: intent, verification, cancellation.

use serde_json::{Value, json};

use marigold_integration_tests::{TEST_KEY_SECRET, TestApp};
use marigold_storefront::services::payments::sign_reference;

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

/// Carts a product, resolves, and registers a gateway order. Returns the
/// gateway order ID.
async fn open_payment(app: &TestApp, user_id: i32, rupees: i64) -> String {
    let product = app.seed_product("Saree", rupees, 10, &[]).await;
    app.login(user_id).await;
    let created = app.post("/addresses", address_body()).await;
    let id = created.field("id").clone();
    app.post(&format!("/addresses/{id}/select"), json!({})).await;

    app.post(
        "/cart/items",
        json!({ "product_id": product.id, "quantity": 1 }),
    )
    .await;
    app.post("/checkout/resolve", json!({})).await;

    let intent = app
        .post("/checkout/payment/intent", json!({ "payment_method": "upi" }))
        .await;
    assert_eq!(intent.status, 200);
    assert_eq!(intent.field("key"), "key_mock");
    intent
        .field("gateway_order_id")
        .as_str()
        .map(ToOwned::to_owned)
        .unwrap_or_default()
}

fn signed_reference(gateway_order_id: &str, payment_id: &str) -> Value {
    let signature =
        sign_reference(TEST_KEY_SECRET, gateway_order_id, payment_id).unwrap_or_default();
    json!({
        "gateway_order_id": gateway_order_id,
        "gateway_payment_id": payment_id,
        "signature": signature,
    })
}

#[tokio::test]
async fn verified_payment_creates_the_order() {
    let app = TestApp::new();
    let gateway_order_id = open_payment(&app, 1, 1899).await;

    let verified = app
        .post(
            "/checkout/payment/verify",
            signed_reference(&gateway_order_id, "pay_001"),
        )
        .await;
    assert_eq!(verified.status, 200);
    let order = verified.field("order");
    assert_eq!(order["status"], "paid");
    assert_eq!(order["payment_method"], "upi");
    assert_eq!(order["gateway_order_id"], gateway_order_id);
    assert_eq!(order["gateway_payment_id"], "pay_001");
    assert_eq!(order["total"], "1899");

    // The cart that fed the order is emptied.
    let cart = app.get("/cart").await;
    assert_eq!(cart.field("unit_count"), 0);
}

#[tokio::test]
async fn intent_amount_includes_shipping() {
    let app = TestApp::new();
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

    let intent = app
        .post("/checkout/payment/intent", json!({ "payment_method": "card" }))
        .await;
    // (349 + 49 shipping) in paise.
    assert_eq!(intent.field("amount_paise"), 39800);
    assert_eq!(intent.field("currency"), "INR");
}

#[tokio::test]
async fn forged_signature_creates_nothing_and_window_stays_open() {
    let app = TestApp::new();
    let gateway_order_id = open_payment(&app, 3, 1899).await;

    let forged = app
        .post(
            "/checkout/payment/verify",
            json!({
                "gateway_order_id": gateway_order_id,
                "gateway_payment_id": "pay_002",
                "signature": "deadbeef".repeat(8),
            }),
        )
        .await;
    assert_eq!(forged.status, 400);
    assert_eq!(forged.field("code"), "PAYMENT_FAILED");

    // No order was created.
    let orders = app.get("/orders").await;
    assert_eq!(orders.body.as_array().map(Vec::len), Some(0));

    // A legitimate retry against the same window still lands.
    let verified = app
        .post(
            "/checkout/payment/verify",
            signed_reference(&gateway_order_id, "pay_002"),
        )
        .await;
    assert_eq!(verified.status, 200);
}

#[tokio::test]
async fn unknown_gateway_order_is_rejected() {
    let app = TestApp::new();

    let response = app
        .post(
            "/checkout/payment/verify",
            signed_reference("order_NEVER_ISSUED", "pay_003"),
        )
        .await;
    assert_eq!(response.status, 404);
}

#[tokio::test]
async fn cancelled_window_cannot_be_verified() {
    let app = TestApp::new();
    let gateway_order_id = open_payment(&app, 4, 1899).await;

    let cancelled = app
        .post(
            "/checkout/payment/cancel",
            json!({ "gateway_order_id": gateway_order_id }),
        )
        .await;
    assert_eq!(cancelled.status, 200);

    let verify = app
        .post(
            "/checkout/payment/verify",
            signed_reference(&gateway_order_id, "pay_004"),
        )
        .await;
    assert_eq!(verify.status, 404);
}

#[tokio::test]
async fn gateway_rejection_surfaces_as_payment_required() {
    let app = TestApp::new();
    let product = app.seed_product("Saree", 1899, 10, &[]).await;
    app.login(5).await;
    let created = app.post("/addresses", address_body()).await;
    let id = created.field("id").clone();
    app.post(&format!("/addresses/{id}/select"), json!({})).await;

    app.post(
        "/cart/items",
        json!({ "product_id": product.id, "quantity": 1 }),
    )
    .await;
    app.post("/checkout/resolve", json!({})).await;

    app.gateway().set_failing(true);
    let intent = app
        .post("/checkout/payment/intent", json!({ "payment_method": "upi" }))
        .await;
    assert_eq!(intent.status, 402);
    assert_eq!(intent.field("code"), "GATEWAY_REJECTED");
}

#[tokio::test]
async fn cod_method_cannot_open_a_payment_window() {
    let app = TestApp::new();
    let product = app.seed_product("Saree", 1899, 10, &[]).await;
    app.login(6).await;
    let created = app.post("/addresses", address_body()).await;
    let id = created.field("id").clone();
    app.post(&format!("/addresses/{id}/select"), json!({})).await;

    app.post(
        "/cart/items",
        json!({ "product_id": product.id, "quantity": 1 }),
    )
    .await;
    app.post("/checkout/resolve", json!({})).await;

    let intent = app
        .post("/checkout/payment/intent", json!({ "payment_method": "cod" }))
        .await;
    assert_eq!(intent.status, 422);
}
