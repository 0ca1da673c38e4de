//! # Cart State
//!
//! The current cart together with the checkout stage it is in.
//!
//! ## Thread Safety
//! Both live behind one `tokio::sync::Mutex` so a stage check and the cart
//! it refers to can never disagree. Order placement holds the lock for its
//! whole duration, so cart edits made while an order is being placed wait
//! for it to finish.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Dashboard Action         Command                 State Change          │
//! │  ────────────────         ───────                 ────────────          │
//! │  Add to cart ───────────► add_to_cart() ────────► cart.add_item()       │
//! │  Change quantity ───────► update_cart_item() ───► cart.update_quantity()│
//! │  Remove ────────────────► remove_from_cart() ───► cart.remove_item()    │
//! │  Checkout ──────────────► proceed_to_delivery() ► flow: Cart→Delivery   │
//! │  Save address ──────────► submit_delivery() ────► flow: →Payment        │
//! │  Pay ───────────────────► place_order() ────────► cart.clear(), reset   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::sync::Arc;

use souq_core::{Cart, CheckoutFlow, DeliveryFeePolicy};
use tokio::sync::{Mutex, MutexGuard};

/// Cart plus checkout stage.
#[derive(Debug, Clone, Default)]
pub struct CartSession {
    pub cart: Cart,
    pub flow: CheckoutFlow,
}

/// Shared cart state.
#[derive(Debug, Clone)]
pub struct CartState {
    inner: Arc<Mutex<CartSession>>,
}

impl CartState {
    /// Creates an empty cart using `fee_policy` for delivery fees.
    pub fn new(fee_policy: DeliveryFeePolicy) -> Self {
        CartState {
            inner: Arc::new(Mutex::new(CartSession {
                cart: Cart::new(fee_policy),
                flow: CheckoutFlow::new(),
            })),
        }
    }

    /// Executes a function with read access to the cart and stage.
    ///
    /// ## Usage
    /// ```rust,ignore
    /// let totals = cart_state.with_cart(|s| s.cart.totals()).await;
    /// ```
    pub async fn with_cart<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&CartSession) -> R,
    {
        let session = self.inner.lock().await;
        f(&session)
    }

    /// Executes a function with write access to the cart and stage.
    ///
    /// ## Usage
    /// ```rust,ignore
    /// cart_state.with_cart_mut(|s| s.cart.add_item(line)).await?;
    /// ```
    pub async fn with_cart_mut<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&mut CartSession) -> R,
    {
        let mut session = self.inner.lock().await;
        f(&mut session)
    }

    /// Locks the cart across awaits (order placement).
    pub async fn lock(&self) -> MutexGuard<'_, CartSession> {
        self.inner.lock().await
    }
}

impl Default for CartState {
    fn default() -> Self {
        CartState::new(DeliveryFeePolicy::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use souq_core::{CartLineItem, CheckoutStage, Money};

    #[tokio::test]
    async fn test_with_cart_mut_and_read() {
        let state = CartState::new(DeliveryFeePolicy::flat(Money::from_cents(500)));

        state
            .with_cart_mut(|s| {
                s.cart
                    .add_item(CartLineItem::new("p1", "Lamp", Money::from_cents(10_000), 2))
            })
            .await
            .unwrap();

        let total = state.with_cart(|s| s.cart.total()).await;
        assert_eq!(total, Money::from_cents(20_500));
        assert_eq!(state.with_cart(|s| s.flow.stage()).await, CheckoutStage::Cart);
    }

    #[tokio::test]
    async fn test_clones_share_one_cart() {
        let state = CartState::default();
        let other = state.clone();

        other
            .with_cart_mut(|s| {
                s.cart
                    .add_item(CartLineItem::new("p1", "Lamp", Money::from_cents(100), 1))
            })
            .await
            .unwrap();

        assert_eq!(state.with_cart(|s| s.cart.item_count()).await, 1);
    }
}
