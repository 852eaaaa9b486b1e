//! Product detail handler.
//!
//! The catalog itself is managed elsewhere; this surface exists so clients
//! can re-check price, stock and variants before checkout.

use axum::{
    Json,
    extract::{Path, State},
};

use marigold_core::ProductId;

use crate::error::{AppError, Result};
use crate::models::Product;
use crate::state::AppState;

/// GET /products/{id}
pub async fn show(State(state): State<AppState>, Path(id): Path<i32>) -> Result<Json<Product>> {
    let product_id = ProductId::new(id);
    state
        .store()
        .products
        .get(product_id)
        .await?
        .filter(|product| product.is_active)
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("product {product_id}")))
}
