//! Checkout handlers: intent resolution, COD submission and the gateway
//! payment protocol.
//!
//! Every handler scopes its work to the session's checkout key, so the
//! at-most-once guards in [`crate::services::CheckoutSessions`] apply across
//! tabs and retries of the same session. The key outlives a placed order —
//! a late duplicate submit still lands on it — and is retired on the next
//! resolve, giving the next purchase fresh guards.

use axum::{Json, extract::State};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tower_sessions::Session;

use marigold_core::{AddressId, IntentSource, PaymentMethod, Price, UserId};

use crate::error::{AppError, Result};
use crate::middleware::MaybeUser;
use crate::middleware::session::{checkout_key, rotate_checkout_key};
use crate::models::{AddressSnapshot, DirectPurchase, LineItem, session_keys};
use crate::services::{CheckoutError, NewAddressInput, PaymentIntent, PaymentReference};
use crate::state::AppState;

use super::cart::{clear_after_order, items_for_checkout};
use super::orders::OrderDetail;

#[derive(Debug, Default, Deserialize)]
pub struct ResolveRequest {
    /// Present for a "buy now" checkout; wins over the cart.
    #[serde(default)]
    pub direct: Option<DirectPurchase>,
}

/// The resolved intent with its computed pricing.
#[derive(Debug, Serialize)]
pub struct IntentView {
    pub items: Vec<LineItem>,
    pub source: IntentSource,
    pub unit_count: u32,
    pub subtotal: Price,
    pub shipping: Price,
    pub total: Price,
}

#[derive(Debug, Deserialize)]
pub struct SubmitRequest {
    pub payment_method: PaymentMethod,
    /// Inline shipping address; guests must send one, logged-in users may
    /// override their selected address with it.
    #[serde(default)]
    pub address: Option<NewAddressInput>,
}

#[derive(Debug, Deserialize)]
pub struct CancelPaymentRequest {
    pub gateway_order_id: String,
}

/// POST /checkout/resolve
///
/// Resolves what this checkout session is buying, at most once per checkout
/// key. The cart is only consulted when no direct-purchase signal is sent.
pub async fn resolve(
    State(state): State<AppState>,
    MaybeUser(user): MaybeUser,
    session: Session,
    Json(body): Json<ResolveRequest>,
) -> Result<Json<IntentView>> {
    // A key that already produced an order belongs to a finished checkout;
    // start this one under a fresh key so its guards reset.
    let mut key = checkout_key(&session).await?;
    if state.checkout().sessions().placement(&key).await.is_some() {
        key = rotate_checkout_key(&session).await?;
    }

    let cart_items = if body.direct.is_some() {
        Vec::new()
    } else {
        items_for_checkout(&state, &session, user).await?
    };

    let intent = state
        .checkout()
        .resolve_intent(&key, body.direct, cart_items)
        .await?;

    let subtotal = intent.subtotal();
    let shipping = state.orders().shipping_policy().charge_for(subtotal);
    Ok(Json(IntentView {
        unit_count: intent.unit_count(),
        subtotal,
        shipping,
        total: subtotal + shipping,
        items: intent.items,
        source: intent.source,
    }))
}

/// POST /checkout/submit
///
/// Places a COD order for the session's resolved intent. Gateway methods
/// must go through the payment intent/verify pair instead.
pub async fn submit(
    State(state): State<AppState>,
    MaybeUser(user): MaybeUser,
    session: Session,
    Json(body): Json<SubmitRequest>,
) -> Result<Json<OrderDetail>> {
    if body.payment_method.is_gateway() {
        return Err(AppError::Validation(format!(
            "payment method {} must be paid through the gateway",
            body.payment_method
        )));
    }

    let key = checkout_key(&session).await?;
    let intent = state
        .checkout()
        .sessions()
        .intent(&key)
        .await
        .ok_or(CheckoutError::NoIntent)?;
    let address = shipping_snapshot(&state, &session, user, body.address).await?;

    let placed = state
        .checkout()
        .sessions()
        .place_once(&key, async {
            state
                .orders()
                .place_order(&intent, user, address, body.payment_method, None, None)
                .await
        })
        .await?;

    finish_checkout(&state, &session, user, intent.source).await?;
    Ok(Json(OrderDetail {
        order: placed.order,
        items: placed.items,
    }))
}

/// POST /checkout/payment/intent
///
/// Registers a gateway order for the session's computed total and returns
/// what the client widget needs to collect payment. No local order exists
/// yet.
pub async fn payment_intent(
    State(state): State<AppState>,
    MaybeUser(user): MaybeUser,
    session: Session,
    Json(body): Json<SubmitRequest>,
) -> Result<Json<PaymentIntent>> {
    let key = checkout_key(&session).await?;
    let intent = state
        .checkout()
        .sessions()
        .intent(&key)
        .await
        .ok_or(CheckoutError::NoIntent)?;
    let address = shipping_snapshot(&state, &session, user, body.address).await?;

    let payment = state
        .payments()
        .create_intent(&key, intent, user, address, body.payment_method)
        .await?;
    Ok(Json(payment))
}

/// POST /checkout/payment/verify
///
/// Verifies the client-posted payment reference server-side and, only on a
/// matching signature, creates the order. A mismatch creates nothing and
/// leaves the payment window open.
pub async fn payment_verify(
    State(state): State<AppState>,
    MaybeUser(user): MaybeUser,
    session: Session,
    Json(reference): Json<PaymentReference>,
) -> Result<Json<OrderDetail>> {
    // Captured before verification consumes the pending entry.
    let source = state
        .checkout()
        .sessions()
        .pending(&reference.gateway_order_id)
        .await
        .map(|pending| pending.intent.source);

    let placed = state.payments().verify(&reference).await?;

    if let Some(source) = source {
        finish_checkout(&state, &session, user, source).await?;
    }
    Ok(Json(OrderDetail {
        order: placed.order,
        items: placed.items,
    }))
}

/// POST /checkout/payment/cancel
///
/// The buyer dismissed the gateway widget. Closes the payment window; the
/// checkout can start over.
pub async fn payment_cancel(
    State(state): State<AppState>,
    Json(body): Json<CancelPaymentRequest>,
) -> Result<Json<Value>> {
    state.payments().cancel(&body.gateway_order_id).await;
    Ok(Json(json!({ "status": "cancelled" })))
}

/// The shipping snapshot for this submission.
///
/// An inline address wins; otherwise the logged-in user's selected address
/// is re-checked for ownership before use.
async fn shipping_snapshot(
    state: &AppState,
    session: &Session,
    user: Option<UserId>,
    inline: Option<NewAddressInput>,
) -> Result<AddressSnapshot> {
    if let Some(input) = inline {
        let data = input.validate()?;
        return Ok(AddressSnapshot {
            full_name: data.full_name,
            line1: data.line1,
            city: data.city,
            state: data.state,
            pin_code: data.pin_code.as_str().to_owned(),
            phone: data.phone.as_str().to_owned(),
        });
    }

    let owner = user.ok_or(CheckoutError::NoAddress)?;
    let selected: Option<AddressId> = session.get(session_keys::SELECTED_ADDRESS).await?;
    let id = selected.ok_or(CheckoutError::NoAddress)?;
    let address = state.addresses().get_owned(id, owner).await?;
    Ok(AddressSnapshot::from(&address))
}

/// Post-placement session cleanup: empty the cart that fed the order (a
/// direct purchase leaves the cart alone). The resolved intent and the
/// checkout key stay put so a duplicate submit still finds the cached
/// placement; the next resolve retires both.
async fn finish_checkout(
    state: &AppState,
    session: &Session,
    user: Option<UserId>,
    source: IntentSource,
) -> Result<()> {
    if source == IntentSource::Cart {
        clear_after_order(state, session, user).await?;
    }
    Ok(())
}
