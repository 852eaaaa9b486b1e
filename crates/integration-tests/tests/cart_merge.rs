//! Guest cart behaviour and the login-time merge.

use serde_json::json;

use marigold_integration_tests::TestApp;

#[tokio::test]
async fn guest_cart_add_update_remove() {
    let app = TestApp::new();
    let product = app.seed_product("Kurta", 799, 10, &["S", "M"]).await;

    let added = app
        .post(
            "/cart/items",
            json!({ "product_id": product.id, "quantity": 2, "variant": "M" }),
        )
        .await;
    assert_eq!(added.status, 200);
    assert_eq!(added.field("unit_count"), 2);

    // Same product/variant pair merges into the existing line.
    let again = app
        .post(
            "/cart/items",
            json!({ "product_id": product.id, "quantity": 1, "variant": "M" }),
        )
        .await;
    assert_eq!(again.field("unit_count"), 3);
    assert_eq!(again.field("items").as_array().map(Vec::len), Some(1));

    let item_id = again.field("items")[0]["id"].clone();
    let updated = app
        .post(&format!("/cart/items/{item_id}"), json!({ "quantity": 1 }))
        .await;
    assert_eq!(updated.field("unit_count"), 1);

    // Zero quantity removes the line.
    let cleared = app
        .post(&format!("/cart/items/{item_id}"), json!({ "quantity": 0 }))
        .await;
    assert_eq!(cleared.field("unit_count"), 0);
}

#[tokio::test]
async fn guest_cart_rejects_bad_lines() {
    let app = TestApp::new();
    let product = app.seed_product("Kurta", 799, 10, &["S", "M"]).await;

    // Unknown variant.
    let bad_variant = app
        .post(
            "/cart/items",
            json!({ "product_id": product.id, "quantity": 1, "variant": "XXL" }),
        )
        .await;
    assert_eq!(bad_variant.status, 422);

    // Variant required but missing.
    let missing = app
        .post(
            "/cart/items",
            json!({ "product_id": product.id, "quantity": 1 }),
        )
        .await;
    assert_eq!(missing.status, 422);

    // Unknown product.
    let unknown = app
        .post("/cart/items", json!({ "product_id": 9999, "quantity": 1 }))
        .await;
    assert_eq!(unknown.status, 404);
}

#[tokio::test]
async fn login_merges_guest_cart_into_account_cart() {
    let app = TestApp::new();
    let kurta = app.seed_product("Kurta", 799, 10, &["S", "M"]).await;
    let diya = app.seed_product("Diya Set", 349, 50, &[]).await;

    // The account already has one kurta from an earlier session.
    let earlier = app.another_session();
    earlier.login(7).await;
    earlier
        .post(
            "/cart/items",
            json!({ "product_id": kurta.id, "quantity": 1, "variant": "M" }),
        )
        .await;

    // A guest browses and fills a cart, then logs in as the same user.
    app.post(
        "/cart/items",
        json!({ "product_id": kurta.id, "quantity": 2, "variant": "M" }),
    )
    .await;
    app.post(
        "/cart/items",
        json!({ "product_id": diya.id, "quantity": 1 }),
    )
    .await;

    let login = app.login(7).await;
    assert_eq!(login.status, 200);
    assert_eq!(login.field("cart_merge")["merged"], 2);
    assert_eq!(login.field("cart_merge")["failed"], 0);

    // Quantities for the same pair summed, not overwritten.
    let cart = app.get("/cart").await;
    assert_eq!(cart.field("unit_count"), 4);
    let items = cart.field("items").as_array().cloned().unwrap_or_default();
    assert_eq!(items.len(), 2);
    let kurta_line = items
        .iter()
        .find(|line| line["product_id"] == json!(kurta.id))
        .cloned()
        .unwrap_or_default();
    assert_eq!(kurta_line["quantity"], 3);
}

#[tokio::test]
async fn merge_of_empty_guest_cart_is_a_no_op() {
    let app = TestApp::new();
    let login = app.login(3).await;
    assert_eq!(login.field("cart_merge")["merged"], 0);

    let cart = app.get("/cart").await;
    assert_eq!(cart.field("unit_count"), 0);
}
