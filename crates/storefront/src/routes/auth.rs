//! Login and logout.
//!
//! Authentication proper (credentials, tokens) lives upstream; this service
//! trusts the identity handed to it and owns only the session consequences:
//! recording the user ID and merging the guest cart into the account cart.

use axum::{Json, extract::State};
use serde::Deserialize;
use serde_json::{Value, json};
use tower_sessions::Session;
use tracing::info;

use marigold_core::UserId;

use crate::error::Result;
use crate::middleware::auth::{clear_current_user, set_current_user};
use crate::middleware::session::{load_guest_cart, save_guest_cart};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub user_id: i32,
}

/// POST /auth/login
///
/// Records the user in the session, then merges the guest cart into the
/// account cart. The merge is best-effort: lines that fail stay in the
/// guest cart and the login still succeeds.
pub async fn login(
    State(state): State<AppState>,
    session: Session,
    Json(body): Json<LoginRequest>,
) -> Result<Json<Value>> {
    let user_id = UserId::new(body.user_id);
    set_current_user(&session, user_id).await?;

    let mut guest = load_guest_cart(&session).await?;
    let outcome = state.carts().merge_guest_into_user(user_id, &mut guest).await?;
    save_guest_cart(&session, &guest).await?;

    info!(
        user_id = %user_id,
        merged = outcome.merged,
        failed = outcome.failed,
        "User logged in"
    );
    Ok(Json(json!({
        "user_id": user_id,
        "cart_merge": { "merged": outcome.merged, "failed": outcome.failed },
    })))
}

/// POST /auth/logout
pub async fn logout(session: Session) -> Result<Json<Value>> {
    clear_current_user(&session).await?;
    Ok(Json(json!({ "status": "logged_out" })))
}
