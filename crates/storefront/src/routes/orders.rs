//! Order history and post-order mutation handlers.

use axum::{
    Json,
    extract::{Path, State},
};
use serde::{Deserialize, Serialize};

use marigold_core::{OrderId, OrderItemId, ReturnRequestId};

use crate::error::{AppError, Result};
use crate::middleware::CurrentUser;
use crate::models::{Order, OrderItem, ReturnRequest};
use crate::state::AppState;

/// An order with its line items.
#[derive(Debug, Serialize)]
pub struct OrderDetail {
    pub order: Order,
    pub items: Vec<OrderItem>,
}

#[derive(Debug, Deserialize)]
pub struct CancelItemRequest {
    pub quantity: u32,
}

#[derive(Debug, Deserialize)]
pub struct ReturnRequestBody {
    pub quantity: u32,
    pub reason: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct ApproveReturnRequest {
    /// Defaults to the requested quantity.
    #[serde(default)]
    pub approved_quantity: Option<u32>,
}

/// GET /orders
pub async fn list(
    State(state): State<AppState>,
    CurrentUser(owner): CurrentUser,
) -> Result<Json<Vec<Order>>> {
    Ok(Json(state.orders().list_for_owner(owner).await?))
}

/// GET /orders/{id}
pub async fn show(
    State(state): State<AppState>,
    CurrentUser(owner): CurrentUser,
    Path(id): Path<i32>,
) -> Result<Json<OrderDetail>> {
    let order_id = OrderId::new(id);
    let placed = state
        .orders()
        .get_owned(order_id, owner)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("order {order_id}")))?;
    Ok(Json(OrderDetail {
        order: placed.order,
        items: placed.items,
    }))
}

/// POST /orders/{id}/deliver
pub async fn deliver(
    State(state): State<AppState>,
    CurrentUser(owner): CurrentUser,
    Path(id): Path<i32>,
) -> Result<Json<OrderDetail>> {
    let order_id = OrderId::new(id);
    state
        .orders()
        .get_owned(order_id, owner)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("order {order_id}")))?;

    state.orders().mark_delivered(order_id).await?;

    let placed = state
        .orders()
        .get_owned(order_id, owner)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("order {order_id}")))?;
    Ok(Json(OrderDetail {
        order: placed.order,
        items: placed.items,
    }))
}

/// POST /orders/items/{id}/cancel
pub async fn cancel_item(
    State(state): State<AppState>,
    CurrentUser(owner): CurrentUser,
    Path(id): Path<i32>,
    Json(body): Json<CancelItemRequest>,
) -> Result<Json<Order>> {
    let order = state
        .returns()
        .cancel_item(owner, OrderItemId::new(id), body.quantity)
        .await?;
    Ok(Json(order))
}

/// POST /orders/items/{id}/return
pub async fn request_return(
    State(state): State<AppState>,
    CurrentUser(owner): CurrentUser,
    Path(id): Path<i32>,
    Json(body): Json<ReturnRequestBody>,
) -> Result<Json<ReturnRequest>> {
    let request = state
        .returns()
        .request_return(owner, OrderItemId::new(id), body.quantity, &body.reason)
        .await?;
    Ok(Json(request))
}

/// GET /orders/items/{id}/returns
pub async fn list_returns(
    State(state): State<AppState>,
    CurrentUser(owner): CurrentUser,
    Path(id): Path<i32>,
) -> Result<Json<Vec<ReturnRequest>>> {
    Ok(Json(
        state.returns().list_for_item(owner, OrderItemId::new(id)).await?,
    ))
}

/// POST /returns/{id}/cancel — buyer withdraws a pending request.
pub async fn cancel_return(
    State(state): State<AppState>,
    CurrentUser(owner): CurrentUser,
    Path(id): Path<i32>,
) -> Result<Json<ReturnRequest>> {
    Ok(Json(
        state
            .returns()
            .cancel_return(owner, ReturnRequestId::new(id))
            .await?,
    ))
}

/// POST /admin/returns/{id}/approve
pub async fn approve_return(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Json(body): Json<ApproveReturnRequest>,
) -> Result<Json<ReturnRequest>> {
    Ok(Json(
        state
            .returns()
            .approve_return(ReturnRequestId::new(id), body.approved_quantity)
            .await?,
    ))
}

/// POST /admin/returns/{id}/reject
pub async fn reject_return(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<ReturnRequest>> {
    Ok(Json(
        state.returns().reject_return(ReturnRequestId::new(id)).await?,
    ))
}

/// POST /admin/returns/{id}/refund
pub async fn refund_return(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<ReturnRequest>> {
    Ok(Json(
        state.returns().refund_return(ReturnRequestId::new(id)).await?,
    ))
}
