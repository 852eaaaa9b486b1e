//! Saved address handlers. All require a logged-in user.

use axum::{
    Json,
    extract::{Path, State},
};
use tower_sessions::Session;

use marigold_core::AddressId;

use crate::error::Result;
use crate::middleware::CurrentUser;
use crate::models::{Address, session_keys};
use crate::services::NewAddressInput;
use crate::state::AppState;

/// GET /addresses
pub async fn list(
    State(state): State<AppState>,
    CurrentUser(owner): CurrentUser,
) -> Result<Json<Vec<Address>>> {
    Ok(Json(state.addresses().list(owner).await?))
}

/// POST /addresses
pub async fn create(
    State(state): State<AppState>,
    CurrentUser(owner): CurrentUser,
    Json(body): Json<NewAddressInput>,
) -> Result<Json<Address>> {
    Ok(Json(state.addresses().create(owner, body).await?))
}

/// PUT /addresses/{id}
pub async fn update(
    State(state): State<AppState>,
    CurrentUser(owner): CurrentUser,
    Path(id): Path<i32>,
    Json(body): Json<NewAddressInput>,
) -> Result<Json<Address>> {
    Ok(Json(
        state
            .addresses()
            .update(AddressId::new(id), owner, body)
            .await?,
    ))
}

/// POST /addresses/{id}/select
///
/// Remembers the address for this session's checkout. Ownership is checked
/// again at submit time, so a stale selection can never ship an order to
/// someone else's address.
pub async fn select(
    State(state): State<AppState>,
    CurrentUser(owner): CurrentUser,
    session: Session,
    Path(id): Path<i32>,
) -> Result<Json<Address>> {
    let address = state.addresses().get_owned(AddressId::new(id), owner).await?;
    session
        .insert(session_keys::SELECTED_ADDRESS, address.id)
        .await?;
    Ok(Json(address))
}
