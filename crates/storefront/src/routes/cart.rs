//! Cart route handlers.
//!
//! Guests and logged-in users hit the same endpoints; the handlers branch on
//! the session's user ID and route the operation to the guest cart in the
//! session or the persisted account cart. Responses use one shape for both.

use axum::{
    Json,
    extract::{Path, State},
};
use serde::{Deserialize, Serialize};
use tower_sessions::Session;

use marigold_core::{CartItemId, Price, ProductId, UserId};

use crate::error::Result;
use crate::middleware::MaybeUser;
use crate::middleware::session::{load_guest_cart, save_guest_cart};
use crate::models::CartItem;
use crate::services::CartError;
use crate::state::AppState;

/// The cart as returned to clients, regardless of backend.
#[derive(Debug, Serialize)]
pub struct CartView {
    pub items: Vec<CartItem>,
    pub unit_count: u32,
    pub subtotal: Price,
}

impl CartView {
    fn of(items: Vec<CartItem>) -> Self {
        let unit_count = items.iter().map(|line| line.quantity).sum();
        let subtotal = items
            .iter()
            .filter_map(|line| line.unit_price.map(|price| price * line.quantity))
            .sum();
        Self {
            items,
            unit_count,
            subtotal,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct AddItemRequest {
    pub product_id: i32,
    pub quantity: u32,
    #[serde(default)]
    pub variant: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateItemRequest {
    pub quantity: u32,
}

/// GET /cart
pub async fn show(
    State(state): State<AppState>,
    MaybeUser(user): MaybeUser,
    session: Session,
) -> Result<Json<CartView>> {
    let items = match user {
        Some(owner) => state.carts().list_for_user(owner).await?,
        None => load_guest_cart(&session).await?.items().to_vec(),
    };
    Ok(Json(CartView::of(items)))
}

/// POST /cart/items
pub async fn add(
    State(state): State<AppState>,
    MaybeUser(user): MaybeUser,
    session: Session,
    Json(body): Json<AddItemRequest>,
) -> Result<Json<CartView>> {
    let (_, line) = state
        .carts()
        .validated_line(ProductId::new(body.product_id), body.quantity, body.variant)
        .await?;

    match user {
        Some(owner) => {
            state.carts().add_for_user(owner, line).await?;
            Ok(Json(CartView::of(state.carts().list_for_user(owner).await?)))
        }
        None => {
            let mut cart = load_guest_cart(&session).await?;
            cart.add(line);
            save_guest_cart(&session, &cart).await?;
            Ok(Json(CartView::of(cart.items().to_vec())))
        }
    }
}

/// POST /cart/items/{id} — a quantity of zero removes the line.
pub async fn update(
    State(state): State<AppState>,
    MaybeUser(user): MaybeUser,
    session: Session,
    Path(id): Path<i32>,
    Json(body): Json<UpdateItemRequest>,
) -> Result<Json<CartView>> {
    let item_id = CartItemId::new(id);
    match user {
        Some(owner) => {
            state
                .carts()
                .set_quantity_for_user(owner, item_id, body.quantity)
                .await?;
            Ok(Json(CartView::of(state.carts().list_for_user(owner).await?)))
        }
        None => {
            let mut cart = load_guest_cart(&session).await?;
            let known = if body.quantity == 0 {
                cart.remove(item_id)
            } else {
                cart.set_quantity(item_id, body.quantity)
            };
            if !known {
                return Err(CartError::NotFound(format!("cart item {item_id}")).into());
            }
            save_guest_cart(&session, &cart).await?;
            Ok(Json(CartView::of(cart.items().to_vec())))
        }
    }
}

/// DELETE /cart/items/{id}
pub async fn remove(
    State(state): State<AppState>,
    MaybeUser(user): MaybeUser,
    session: Session,
    Path(id): Path<i32>,
) -> Result<Json<CartView>> {
    let item_id = CartItemId::new(id);
    match user {
        Some(owner) => {
            state.carts().remove_for_user(owner, item_id).await?;
            Ok(Json(CartView::of(state.carts().list_for_user(owner).await?)))
        }
        None => {
            let mut cart = load_guest_cart(&session).await?;
            if !cart.remove(item_id) {
                return Err(CartError::NotFound(format!("cart item {item_id}")).into());
            }
            save_guest_cart(&session, &cart).await?;
            Ok(Json(CartView::of(cart.items().to_vec())))
        }
    }
}

/// DELETE /cart
pub async fn clear(
    State(state): State<AppState>,
    MaybeUser(user): MaybeUser,
    session: Session,
) -> Result<Json<CartView>> {
    match user {
        Some(owner) => state.carts().clear_for_user(owner).await?,
        None => {
            let mut cart = load_guest_cart(&session).await?;
            cart.clear();
            save_guest_cart(&session, &cart).await?;
        }
    }
    Ok(Json(CartView::of(Vec::new())))
}

/// The current cart's items for checkout resolution, whichever backend.
pub(super) async fn items_for_checkout(
    state: &AppState,
    session: &Session,
    user: Option<UserId>,
) -> Result<Vec<CartItem>> {
    match user {
        Some(owner) => Ok(state.carts().list_for_user(owner).await?),
        None => Ok(load_guest_cart(session).await?.items().to_vec()),
    }
}

/// Empty whichever cart fed a placed order.
pub(super) async fn clear_after_order(
    state: &AppState,
    session: &Session,
    user: Option<UserId>,
) -> Result<()> {
    match user {
        Some(owner) => state.carts().clear_for_user(owner).await?,
        None => {
            let mut cart = load_guest_cart(session).await?;
            cart.clear();
            save_guest_cart(session, &cart).await?;
        }
    }
    Ok(())
}
