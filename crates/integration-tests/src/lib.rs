//! Integration test harness for Marigold.
//!
//! Runs the real storefront router in-process: in-memory repositories, the
//! in-memory session store and the mock payment gateway. Requests go through
//! `tower::ServiceExt::oneshot`, and the harness carries the session cookie
//! between calls so a test behaves like one browser.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p marigold-integration-tests
//! ```

use std::sync::Arc;

use axum::Router;
use axum::body::{Body, to_bytes};
use axum::http::{Method, Request, StatusCode, header};
use serde_json::Value;
use tokio::sync::Mutex;
use tower::ServiceExt;

use marigold_storefront::gateway::MockGateway;
use marigold_storefront::middleware::create_memory_session_layer;
use marigold_storefront::models::{NewProduct, Product};
use marigold_storefront::state::AppState;

use marigold_core::Price;

/// The gateway key secret the harness signs payment references with.
pub const TEST_KEY_SECRET: &str = "test_gateway_secret";

/// A response captured from the in-process router.
#[derive(Debug)]
pub struct TestResponse {
    pub status: StatusCode,
    pub body: Value,
}

impl TestResponse {
    /// A field of the JSON body, panicking with context when absent.
    #[must_use]
    pub fn field<'a>(&'a self, name: &str) -> &'a Value {
        self.body
            .get(name)
            .unwrap_or_else(|| panic!("response has no field '{name}': {}", self.body))
    }
}

/// One simulated browser session against the storefront.
pub struct TestApp {
    state: AppState,
    gateway: Arc<MockGateway>,
    router: Router,
    cookie: Mutex<Option<String>>,
}

impl TestApp {
    /// Build a fresh application with empty stores.
    #[must_use]
    pub fn new() -> Self {
        let gateway = Arc::new(MockGateway::new());
        let state = AppState::in_memory(gateway.clone(), TEST_KEY_SECRET);
        let router = marigold_storefront::app(state.clone(), create_memory_session_layer());
        Self {
            state,
            gateway,
            router,
            cookie: Mutex::new(None),
        }
    }

    /// A second browser sharing the same stores (another session, same shop).
    #[must_use]
    pub fn another_session(&self) -> Self {
        Self {
            state: self.state.clone(),
            gateway: self.gateway.clone(),
            router: self.router.clone(),
            cookie: Mutex::new(None),
        }
    }

    #[must_use]
    pub fn state(&self) -> &AppState {
        &self.state
    }

    #[must_use]
    pub fn gateway(&self) -> &MockGateway {
        &self.gateway
    }

    /// Seed a product directly into the store.
    pub async fn seed_product(
        &self,
        name: &str,
        rupees: i64,
        stock: u32,
        variants: &[&str],
    ) -> Product {
        self.state
            .store()
            .products
            .insert(NewProduct {
                name: name.to_owned(),
                price: Price::from_rupees(rupees),
                stock,
                is_active: true,
                variants: variants.iter().map(|&v| v.to_owned()).collect(),
            })
            .await
            .unwrap_or_else(|e| panic!("failed to seed product: {e}"))
    }

    pub async fn get(&self, path: &str) -> TestResponse {
        self.request(Method::GET, path, None).await
    }

    pub async fn post(&self, path: &str, body: Value) -> TestResponse {
        self.request(Method::POST, path, Some(body)).await
    }

    pub async fn put(&self, path: &str, body: Value) -> TestResponse {
        self.request(Method::PUT, path, Some(body)).await
    }

    pub async fn delete(&self, path: &str) -> TestResponse {
        self.request(Method::DELETE, path, None).await
    }

    /// Log this session in as the given user.
    pub async fn login(&self, user_id: i32) -> TestResponse {
        self.post("/auth/login", serde_json::json!({ "user_id": user_id }))
            .await
    }

    async fn request(&self, method: Method, path: &str, body: Option<Value>) -> TestResponse {
        let mut builder = Request::builder().method(method).uri(path);

        if let Some(cookie) = self.cookie.lock().await.as_ref() {
            builder = builder.header(header::COOKIE, cookie);
        }

        let request = match body {
            Some(value) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(value.to_string())),
            None => builder.body(Body::empty()),
        }
        .unwrap_or_else(|e| panic!("failed to build request: {e}"));

        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .unwrap_or_else(|e| panic!("router error: {e}"));

        if let Some(set_cookie) = response.headers().get(header::SET_COOKIE) {
            let raw = set_cookie
                .to_str()
                .unwrap_or_else(|e| panic!("bad set-cookie header: {e}"));
            if let Some(pair) = raw.split(';').next() {
                *self.cookie.lock().await = Some(pair.to_owned());
            }
        }

        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap_or_else(|e| panic!("failed to read body: {e}"));
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::String(
                String::from_utf8_lossy(&bytes).into_owned(),
            ))
        };

        TestResponse { status, body }
    }
}

impl Default for TestApp {
    fn default() -> Self {
        Self::new()
    }
}
