//! # Checkout Commands
//!
//! Drives the cart → delivery → payment flow and places the order.
//!
//! ## Order Placement
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  place_order()                                                          │
//! │                                                                         │
//! │  1. Signed-in, non-demo user?          no ──► UNAUTHENTICATED/FORBIDDEN │
//! │  2. Lock cart; stage == Payment,       no ──► CHECKOUT_ERROR            │
//! │     cart non-empty, address set?                                        │
//! │     every product active and in stock? no ──► INSUFFICIENT_STOCK        │
//! │  3. Wait the placement delay (not cancellable, cart stays locked)       │
//! │  4. Write order + items in one transaction                              │
//! │        │                                                                │
//! │        ├── ok  ──► clear cart, reset stage, return receipt              │
//! │        └── err ──► log cause, ORDER_FAILED toast, cart and stage kept   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use crate::auth::AuthError;
use crate::commands::cart::{ensure_in_stock, respond, CartResponse};
use crate::config::StorefrontConfig;
use crate::error::ApiError;
use crate::state::{CartState, DbState, RatesState, SessionStore};
use souq_core::{DeliveryAddress, Order, OrderItem};

/// What the customer sees after a successful order.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderReceipt {
    pub order: Order,
    pub items: Vec<OrderItem>,
    /// Order total in the currency it was placed in.
    pub display_total: String,
}

/// Moves from the cart to the delivery stage.
///
/// ## Errors
/// - `CART_ERROR` if the cart is empty
/// - `UNAUTHENTICATED` if nobody is signed in
///
/// The stage stays `cart` on error.
pub async fn proceed_to_delivery(
    cart: &CartState,
    rates: &RatesState,
    session: &SessionStore,
) -> Result<CartResponse, ApiError> {
    debug!("proceed_to_delivery command");

    let authenticated = session.current().await.is_some();
    cart.with_cart_mut(|s| s.flow.proceed_to_delivery(&s.cart, authenticated))
        .await?;

    Ok(respond(cart, rates).await)
}

/// Stores the delivery address and moves to the payment stage.
///
/// ## Errors
/// - `VALIDATION_ERROR` with `field` set for the first invalid field
/// - `CHECKOUT_ERROR` when still on the cart stage
pub async fn submit_delivery(
    cart: &CartState,
    rates: &RatesState,
    address: DeliveryAddress,
) -> Result<CartResponse, ApiError> {
    debug!(city = %address.city, "submit_delivery command");

    cart.with_cart_mut(|s| s.flow.submit_delivery(&mut s.cart, address))
        .await?;

    Ok(respond(cart, rates).await)
}

/// Steps back one checkout stage.
pub async fn checkout_back(cart: &CartState, rates: &RatesState) -> CartResponse {
    debug!("checkout_back command");
    cart.with_cart_mut(|s| s.flow.back()).await;
    respond(cart, rates).await
}

/// Places the order for the current cart.
///
/// See the module docs for the sequence. Any failure after validation
/// is reported as the same generic `ORDER_FAILED` message; the cause is in
/// the logs.
pub async fn place_order(
    db: &DbState,
    cart: &CartState,
    rates: &RatesState,
    session: &SessionStore,
    config: &StorefrontConfig,
) -> Result<OrderReceipt, ApiError> {
    debug!("place_order command");

    let current = session.current().await.ok_or(AuthError::NotSignedIn)?;
    if current.is_mock {
        return Err(ApiError::forbidden("Demo sessions cannot place orders"));
    }
    let user = current.user;

    let mut guard = cart.lock().await;
    guard.flow.ensure_ready_to_place(&guard.cart)?;
    ensure_in_stock(db, &guard.cart).await?;

    let address = guard
        .cart
        .delivery_address
        .clone()
        .ok_or_else(|| ApiError::internal("Delivery address missing"))?;
    let (rate_set, currency) = rates.snapshot().await;

    tokio::time::sleep(config.placement_delay()).await;

    let order = match db
        .inner()
        .orders()
        .create(&user.id, &guard.cart, &address, currency)
        .await
    {
        Ok(order) => order,
        Err(e) => {
            error!(user_id = %user.id, error = %e, "Order placement failed");
            return Err(ApiError::order_failed());
        }
    };

    guard.cart.clear();
    guard.flow.reset();
    drop(guard);

    let items = match db.inner().orders().items(&order.id).await {
        Ok(items) => items,
        Err(e) => {
            warn!(order_id = %order.id, error = %e, "Order placed but items could not be loaded");
            Vec::new()
        }
    };

    info!(
        order_id = %order.id,
        user_id = %user.id,
        total_cents = order.total_cents,
        items = items.len(),
        "Order placed"
    );

    Ok(OrderReceipt {
        display_total: rate_set.format_money(order.total(), currency),
        order,
        items,
    })
}

// =============================================================================
// Unit Tests
// =============================================================================
