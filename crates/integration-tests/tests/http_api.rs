//! Surface-level API behaviour: health, auth guards, validation shapes.

use serde_json::json;

use marigold_integration_tests::TestApp;

#[tokio::test]
async fn health_and_readiness() {
    let app = TestApp::new();

    let health = app.get("/health").await;
    assert_eq!(health.status, 200);
    assert_eq!(health.body, "OK");

    // No database pool behind the in-memory store; readiness still passes.
    let ready = app.get("/ready").await;
    assert_eq!(ready.status, 200);
}

#[tokio::test]
async fn address_endpoints_require_login() {
    let app = TestApp::new();

    let list = app.get("/addresses").await;
    assert_eq!(list.status, 401);
    assert_eq!(list.field("code"), "UNAUTHORIZED");

    let orders = app.get("/orders").await;
    assert_eq!(orders.status, 401);
}

#[tokio::test]
async fn address_validation_and_limit() {
    let app = TestApp::new();
    app.login(1).await;

    let body = |pin: &str, phone: &str| {
        json!({
            "full_name": "Asha Rao",
            "line1": "14 MG Road",
            "city": "Bengaluru",
            "state": "Karnataka",
            "pin_code": pin,
            "phone": phone,
        })
    };

    // Five digits is not a PIN code.
    let short_pin = app.post("/addresses", body("12345", "9876543210")).await;
    assert_eq!(short_pin.status, 422);

    // A leading zero is not a PIN code either.
    let zero_pin = app.post("/addresses", body("056001", "9876543210")).await;
    assert_eq!(zero_pin.status, 422);

    // Phone numbers are ten digits.
    let short_phone = app.post("/addresses", body("560001", "98765")).await;
    assert_eq!(short_phone.status, 422);

    let ok = app.post("/addresses", body("560001", "9876543210")).await;
    assert_eq!(ok.status, 200);

    // Two more reach the cap.
    assert_eq!(app.post("/addresses", body("110001", "9876543211")).await.status, 200);
    assert_eq!(app.post("/addresses", body("400001", "9876543212")).await.status, 200);

    let fourth = app.post("/addresses", body("600001", "9876543213")).await;
    assert_eq!(fourth.status, 409);

    let list = app.get("/addresses").await;
    assert_eq!(list.body.as_array().map(Vec::len), Some(3));
}

#[tokio::test]
async fn default_address_is_exclusive() {
    let app = TestApp::new();
    app.login(2).await;

    let body = |phone: &str, default: bool| {
        json!({
            "full_name": "Asha Rao",
            "line1": "14 MG Road",
            "city": "Bengaluru",
            "state": "Karnataka",
            "pin_code": "560001",
            "phone": phone,
            "is_default": default,
        })
    };

    app.post("/addresses", body("9876543210", true)).await;
    app.post("/addresses", body("9876543211", true)).await;

    let list = app.get("/addresses").await;
    let defaults = list
        .body
        .as_array()
        .map(|addresses| {
            addresses
                .iter()
                .filter(|address| address["is_default"] == true)
                .count()
        })
        .unwrap_or_default();
    assert_eq!(defaults, 1);
}

#[tokio::test]
async fn addresses_are_scoped_to_their_owner() {
    let app = TestApp::new();
    app.login(3).await;
    let created = app
        .post(
            "/addresses",
            json!({
                "full_name": "Asha Rao",
                "line1": "14 MG Road",
                "city": "Bengaluru",
                "state": "Karnataka",
                "pin_code": "560001",
                "phone": "9876543210",
            }),
        )
        .await;
    let id = created.field("id").clone();

    let other = app.another_session();
    other.login(4).await;

    let select = other.post(&format!("/addresses/{id}/select"), json!({})).await;
    assert_eq!(select.status, 404);

    let update = other
        .put(
            &format!("/addresses/{id}"),
            json!({
                "full_name": "Mallory",
                "line1": "1 Elsewhere",
                "city": "Delhi",
                "state": "Delhi",
                "pin_code": "110001",
                "phone": "9876543219",
            }),
        )
        .await;
    assert_eq!(update.status, 404);
}

#[tokio::test]
async fn unknown_product_is_404() {
    let app = TestApp::new();
    let missing = app.get("/products/424242").await;
    assert_eq!(missing.status, 404);
    assert_eq!(missing.field("code"), "NOT_FOUND");
}
