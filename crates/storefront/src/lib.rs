//! Marigold storefront library.
//!
//! Checkout and order fulfilment for the Marigold shop: carts (guest and
//! account), saved addresses, purchase intent resolution, COD and gateway
//! payments, and post-order cancellations and returns. The binary in
//! `main.rs` wires this onto `PostgreSQL`; tests run the same router over
//! the in-memory backends.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod db;
pub mod error;
pub mod gateway;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod state;

use axum::Router;
use tower_sessions::{SessionManagerLayer, SessionStore};

use state::AppState;

/// Assemble the full application router over the given state and session
/// layer.
pub fn app<S>(state: AppState, session_layer: SessionManagerLayer<S>) -> Router
where
    S: SessionStore + Clone,
{
    routes::routes().layer(session_layer).with_state(state)
}
