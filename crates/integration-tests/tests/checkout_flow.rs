//! End-to-end checkout: resolution, COD submission, idempotency.

use serde_json::{Value, json};

use marigold_integration_tests::TestApp;

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

async fn login_with_address(app: &TestApp, user_id: i32) {
    app.login(user_id).await;
    let created = app.post("/addresses", address_body()).await;
    assert_eq!(created.status, 200);
    let id = created.field("id").clone();
    let selected = app.post(&format!("/addresses/{id}/select"), json!({})).await;
    assert_eq!(selected.status, 200);
}

#[tokio::test]
async fn guest_cod_checkout_end_to_end() {
    let app = TestApp::new();
    let product = app.seed_product("Kurta", 799, 10, &[]).await;

    app.post(
        "/cart/items",
        json!({ "product_id": product.id, "quantity": 2 }),
    )
    .await;

    let resolved = app.post("/checkout/resolve", json!({})).await;
    assert_eq!(resolved.status, 200);
    assert_eq!(resolved.field("source"), "cart");
    assert_eq!(resolved.field("subtotal"), "1598");
    assert_eq!(resolved.field("shipping"), "0");

    // Guests ship to an inline address.
    let submitted = app
        .post(
            "/checkout/submit",
            json!({ "payment_method": "cod", "address": address_body() }),
        )
        .await;
    assert_eq!(submitted.status, 200);
    let order = submitted.field("order");
    assert_eq!(order["status"], "paid");
    assert_eq!(order["payment_status"], "completed");
    assert_eq!(order["payment_method"], "cod");
    assert_eq!(order["total"], "1598");
    assert!(order["owner_id"].is_null());

    // The cart that fed the order is emptied.
    let cart = app.get("/cart").await;
    assert_eq!(cart.field("unit_count"), 0);

    // Stock was decremented.
    let shown = app.get(&format!("/products/{}", product.id)).await;
    assert_eq!(shown.field("stock"), 8);
}

#[tokio::test]
async fn shipping_fee_added_below_threshold() {
    let app = TestApp::new();
    let product = app.seed_product("Diya Set", 349, 10, &[]).await;
    login_with_address(&app, 1).await;

    app.post(
        "/cart/items",
        json!({ "product_id": product.id, "quantity": 1 }),
    )
    .await;
    let resolved = app.post("/checkout/resolve", json!({})).await;
    assert_eq!(resolved.field("shipping"), "49");
    assert_eq!(resolved.field("total"), "398");

    let submitted = app
        .post("/checkout/submit", json!({ "payment_method": "cod" }))
        .await;
    assert_eq!(submitted.field("order")["total"], "398");
}

#[tokio::test]
async fn direct_purchase_wins_and_leaves_cart_alone() {
    let app = TestApp::new();
    let kurta = app.seed_product("Kurta", 799, 10, &[]).await;
    let mojari = app.seed_product("Mojari", 1299, 10, &[]).await;
    login_with_address(&app, 2).await;

    app.post(
        "/cart/items",
        json!({ "product_id": kurta.id, "quantity": 3 }),
    )
    .await;

    // Buy-now on a different product, cart stays full.
    let resolved = app
        .post(
            "/checkout/resolve",
            json!({ "direct": { "product_id": mojari.id, "quantity": 1 } }),
        )
        .await;
    assert_eq!(resolved.field("source"), "direct");
    assert_eq!(resolved.field("items").as_array().map(Vec::len), Some(1));

    let submitted = app
        .post("/checkout/submit", json!({ "payment_method": "cod" }))
        .await;
    assert_eq!(submitted.status, 200);

    let cart = app.get("/cart").await;
    assert_eq!(cart.field("unit_count"), 3);
}

#[tokio::test]
async fn duplicate_concurrent_submits_place_one_order() {
    let app = TestApp::new();
    let product = app.seed_product("Kurta", 799, 10, &[]).await;
    login_with_address(&app, 3).await;

    app.post(
        "/cart/items",
        json!({ "product_id": product.id, "quantity": 1 }),
    )
    .await;
    app.post("/checkout/resolve", json!({})).await;

    let body = json!({ "payment_method": "cod" });
    let (a, b) = tokio::join!(
        app.post("/checkout/submit", body.clone()),
        app.post("/checkout/submit", body.clone()),
    );
    assert_eq!(a.status, 200);
    assert_eq!(b.status, 200);
    assert_eq!(
        a.field("order")["order_number"],
        b.field("order")["order_number"]
    );

    let orders = app.get("/orders").await;
    assert_eq!(orders.body.as_array().map(Vec::len), Some(1));
}

#[tokio::test]
async fn resubmitting_a_finished_checkout_returns_the_placed_order() {
    let app = TestApp::new();
    let product = app.seed_product("Kurta", 799, 10, &[]).await;
    login_with_address(&app, 9).await;

    app.post(
        "/cart/items",
        json!({ "product_id": product.id, "quantity": 1 }),
    )
    .await;
    app.post("/checkout/resolve", json!({})).await;

    let body = json!({ "payment_method": "cod" });
    let first = app.post("/checkout/submit", body.clone()).await;
    assert_eq!(first.status, 200);

    // A retry arriving after the first submit completed (timed-out client,
    // double-tap) gets the same order back, not an error.
    let retry = app.post("/checkout/submit", body.clone()).await;
    assert_eq!(retry.status, 200);
    assert_eq!(
        first.field("order")["order_number"],
        retry.field("order")["order_number"]
    );

    let orders = app.get("/orders").await;
    assert_eq!(orders.body.as_array().map(Vec::len), Some(1));

    // The next purchase runs under fresh guards: its resolve sees the
    // now-empty cart instead of the finished checkout's snapshot.
    let next = app.post("/checkout/resolve", json!({})).await;
    assert_eq!(next.status, 410);
    assert_eq!(next.field("code"), "CART_EMPTY");

    // And a real second purchase places a distinct order.
    app.post(
        "/cart/items",
        json!({ "product_id": product.id, "quantity": 2 }),
    )
    .await;
    app.post("/checkout/resolve", json!({})).await;
    let second = app.post("/checkout/submit", body).await;
    assert_eq!(second.status, 200);
    assert_ne!(
        first.field("order")["order_number"],
        second.field("order")["order_number"]
    );

    let orders = app.get("/orders").await;
    assert_eq!(orders.body.as_array().map(Vec::len), Some(2));
}

#[tokio::test]
async fn checkout_guards() {
    let app = TestApp::new();
    let product = app.seed_product("Kurta", 799, 2, &[]).await;
    login_with_address(&app, 4).await;

    // Empty cart resolution is terminal for the session.
    let empty = app.post("/checkout/resolve", json!({})).await;
    assert_eq!(empty.status, 410);
    assert_eq!(empty.field("code"), "CART_EMPTY");

    // Submit without a resolved intent.
    let no_intent = app
        .post("/checkout/submit", json!({ "payment_method": "cod" }))
        .await;
    assert_eq!(no_intent.status, 422);

    // Gateway methods cannot use the COD path.
    let wrong_method = app
        .post("/checkout/submit", json!({ "payment_method": "upi" }))
        .await;
    assert_eq!(wrong_method.status, 422);

    // Asking for more units than exist fails at resolution; a fresh
    // session is needed because the failed key is not poisoned but the
    // cart still holds the bad quantity.
    app.post(
        "/cart/items",
        json!({ "product_id": product.id, "quantity": 3 }),
    )
    .await;
    let short = app.post("/checkout/resolve", json!({})).await;
    assert_eq!(short.status, 410);
    assert_eq!(short.field("code"), "INSUFFICIENT_STOCK");
}

#[tokio::test]
async fn inactive_product_blocks_resolution() {
    let app = TestApp::new();
    let product = app.seed_product("Kurta", 799, 10, &[]).await;
    login_with_address(&app, 5).await;

    app.post(
        "/cart/items",
        json!({ "product_id": product.id, "quantity": 1 }),
    )
    .await;

    // Product is retired between carting and checkout.
    app.state()
        .store()
        .products
        .set_active(product.id, false)
        .await
        .unwrap();

    let resolved = app.post("/checkout/resolve", json!({})).await;
    assert_eq!(resolved.status, 410);
    assert_eq!(resolved.field("code"), "PRODUCT_UNAVAILABLE");
}
