//! Authentication extractors.
//!
//! Login itself is a thin session write (`routes::auth`); these extractors
//! read the resulting session state.

use axum::{
    Json,
    extract::FromRequestParts,
    http::{StatusCode, request::Parts},
    response::{IntoResponse, Response},
};
use serde_json::json;
use tower_sessions::Session;

use marigold_core::UserId;

use crate::models::session_keys;

/// Extractor that requires a logged-in user.
pub struct CurrentUser(pub UserId);

/// Rejection for unauthenticated requests.
pub struct AuthRejection;

impl IntoResponse for AuthRejection {
    fn into_response(self) -> Response {
        (
            StatusCode::UNAUTHORIZED,
            Json(json!({ "code": "UNAUTHORIZED", "message": "Login required" })),
        )
            .into_response()
    }
}

impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = AuthRejection;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let session = parts.extensions.get::<Session>().ok_or(AuthRejection)?;

        let user_id: UserId = session
            .get(session_keys::USER_ID)
            .await
            .ok()
            .flatten()
            .ok_or(AuthRejection)?;

        Ok(Self(user_id))
    }
}

/// Extractor that optionally yields the logged-in user.
pub struct MaybeUser(pub Option<UserId>);

impl<S> FromRequestParts<S> for MaybeUser
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let user_id = match parts.extensions.get::<Session>() {
            Some(session) => session
                .get::<UserId>(session_keys::USER_ID)
                .await
                .ok()
                .flatten(),
            None => None,
        };

        Ok(Self(user_id))
    }
}

/// Record the logged-in user in the session.
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn set_current_user(
    session: &Session,
    user_id: UserId,
) -> Result<(), tower_sessions::session::Error> {
    session.insert(session_keys::USER_ID, user_id).await
}

/// Clear the logged-in user from the session (logout).
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn clear_current_user(session: &Session) -> Result<(), tower_sessions::session::Error> {
    session.remove::<UserId>(session_keys::USER_ID).await?;
    Ok(())
}
