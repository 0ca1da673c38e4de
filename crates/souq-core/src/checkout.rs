//! # Checkout Flow
//!
//! The three-stage checkout state machine.
//!
//! ## Stages
//! ```text
//! ┌──────────┐  proceed_to_delivery   ┌──────────┐  submit_delivery   ┌──────────┐
//! │   Cart   │ ─────────────────────► │ Delivery │ ─────────────────► │ Payment  │
//! └──────────┘  cart non-empty AND    └──────────┘  address valid     └──────────┘
//!      ▲        user signed in              ▲                               │
//!      │                                    └───────── back() ──────────────┤
//!      └──────────────── reset() after a successful placement ◄─────────────┘
//! ```
//!
//! There is no failure state: a failed placement leaves the flow on
//! `Payment` with the cart untouched so the customer can try again.

use serde::{Deserialize, Serialize};
use std::fmt;
use ts_rs::TS;

use crate::cart::{Cart, DeliveryAddress};
use crate::error::{CoreError, CoreResult};
use crate::validation::validate_delivery_address;

/// Where the customer is in checkout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "lowercase")]
pub enum CheckoutStage {
    /// Reviewing cart contents.
    #[default]
    Cart,
    /// Entering the delivery address.
    Delivery,
    /// Confirming and placing the order.
    Payment,
}

impl fmt::Display for CheckoutStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CheckoutStage::Cart => "cart",
            CheckoutStage::Delivery => "delivery",
            CheckoutStage::Payment => "payment",
        };
        f.write_str(name)
    }
}

/// Forward-only checkout gating.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutFlow {
    stage: CheckoutStage,
}

impl CheckoutFlow {
    pub fn new() -> Self {
        CheckoutFlow::default()
    }

    pub fn stage(&self) -> CheckoutStage {
        self.stage
    }

    /// Moves from `Cart` to `Delivery`.
    ///
    /// ## Errors
    /// - `EmptyCart` if the cart has no lines
    /// - `NotAuthenticated` if no user is signed in
    ///
    /// On error the stage is unchanged. Calling this while already past the
    /// cart stage is a no-op.
    pub fn proceed_to_delivery(&mut self, cart: &Cart, authenticated: bool) -> CoreResult<()> {
        if self.stage != CheckoutStage::Cart {
            return Ok(());
        }
        if cart.is_empty() {
            return Err(CoreError::EmptyCart);
        }
        if !authenticated {
            return Err(CoreError::NotAuthenticated);
        }

        self.stage = CheckoutStage::Delivery;
        Ok(())
    }

    /// Stores the address on the cart and moves to `Payment`.
    ///
    /// Allowed from `Delivery`, or from `Payment` to correct the address.
    /// The address is validated field by field first; an invalid address
    /// leaves both the cart and the stage untouched.
    pub fn submit_delivery(&mut self, cart: &mut Cart, address: DeliveryAddress) -> CoreResult<()> {
        if self.stage == CheckoutStage::Cart {
            return Err(CoreError::InvalidCheckoutStage {
                current: self.stage,
                expected: CheckoutStage::Delivery,
            });
        }

        validate_delivery_address(&address)?;
        cart.set_delivery_address(address);
        self.stage = CheckoutStage::Payment;
        Ok(())
    }

    /// Checks that an order can be placed right now.
    pub fn ensure_ready_to_place(&self, cart: &Cart) -> CoreResult<()> {
        if self.stage != CheckoutStage::Payment {
            return Err(CoreError::InvalidCheckoutStage {
                current: self.stage,
                expected: CheckoutStage::Payment,
            });
        }
        if cart.is_empty() {
            return Err(CoreError::EmptyCart);
        }
        if cart.delivery_address.is_none() {
            return Err(CoreError::InvalidCheckoutStage {
                current: CheckoutStage::Delivery,
                expected: CheckoutStage::Payment,
            });
        }
        Ok(())
    }

    /// Steps back one stage; `Cart` stays `Cart`.
    pub fn back(&mut self) {
        self.stage = match self.stage {
            CheckoutStage::Payment => CheckoutStage::Delivery,
            CheckoutStage::Delivery | CheckoutStage::Cart => CheckoutStage::Cart,
        };
    }

    /// Returns to the cart stage.
    pub fn reset(&mut self) {
        self.stage = CheckoutStage::Cart;
    }

    /// Falls back to `Cart` if the cart was emptied mid-checkout.
    pub fn sync_with_cart(&mut self, cart: &Cart) {
        if cart.is_empty() {
            self.reset();
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
