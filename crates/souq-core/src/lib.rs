//! # souq-core: Pure Business Logic for the Souq Storefront
//!
//! This crate holds the logic-bearing slice of the storefront: money,
//! currency conversion, the cart store and the checkout state machine.
//! Everything here is a pure function or an in-memory value.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Souq Storefront Architecture                       │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │         Dashboards (customer / reseller / admin)                │   │
//! │  │    Product cards ──► Cart ──► Delivery ──► Payment              │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                  storefront commands                            │   │
//! │  │    add_to_cart, submit_delivery, place_order, update_rates ...  │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ souq-core (THIS CRATE) ★                        │   │
//! │  │                                                                 │   │
//! │  │  ┌─────────┐ ┌──────────┐ ┌─────────┐ ┌──────────┐ ┌─────────┐ │   │
//! │  │  │  money  │ │ currency │ │  cart   │ │ checkout │ │  types  │ │   │
//! │  │  │  Money  │ │ USD/IQD/ │ │  Cart   │ │  Cart →  │ │ Product │ │   │
//! │  │  │ Discount│ │   SAR    │ │ Totals  │ │ Delivery │ │  Order  │ │   │
//! │  │  └─────────┘ └──────────┘ └─────────┘ │ → Payment│ └─────────┘ │   │
//! │  │                                       └──────────┘             │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                 souq-db (hosted data service)                   │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`money`] - Money type with integer cents, discount rates
//! - [`currency`] - USD/IQD/SAR conversion through the IQD pivot, price formatting
//! - [`cart`] - Cart store, line items, delivery address, totals
//! - [`checkout`] - Cart → Delivery → Payment stage machine
//! - [`types`] - Accounts, products, orders, ads, API keys
//! - [`validation`] - Field-level validation rules
//! - [`error`] - Domain error types
//!
//! ## Example Usage
//!
//! ```rust
//! use souq_core::cart::{Cart, CartLineItem, DeliveryFeePolicy};
//! use souq_core::money::{DiscountRate, Money};
//!
//! let mut cart = Cart::new(DeliveryFeePolicy::flat(Money::from_major_minor(5, 0)));
//! let item = CartLineItem::new("p-1", "Desk Lamp", Money::from_major_minor(100, 0), 2)
//!     .with_discount(DiscountRate::from_percentage(10.0).unwrap());
//! cart.add_item(item).unwrap();
//!
//! assert_eq!(cart.subtotal().cents(), 20_000);
//! assert_eq!(cart.discount_total().cents(), 2_000);
//! assert_eq!(cart.total().cents(), 18_500);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod cart;
pub mod checkout;
pub mod currency;
pub mod error;
pub mod money;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use cart::{Cart, CartLineItem, CartTotals, DeliveryAddress, DeliveryFeePolicy};
pub use checkout::{CheckoutFlow, CheckoutStage};
pub use currency::{Currency, ExchangeRateSet};
pub use error::{CoreError, CoreResult, ValidationError};
pub use money::{DiscountRate, Money};
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Maximum distinct lines allowed in a single cart.
pub const MAX_CART_ITEMS: usize = 100;

/// Maximum quantity of a single line.
///
/// Guards against typing 1000 instead of 10.
pub const MAX_ITEM_QUANTITY: i64 = 999;

/// Highest accepted unit price in US cents ($1,000,000,000).
///
/// A full cart at this price (`MAX_CART_ITEMS` lines of
/// `MAX_ITEM_QUANTITY`) still sums within `i64`.
pub const MAX_PRICE_CENTS: i64 = 100_000_000_000;

/// Default flat delivery fee in US cents ($5.00).
pub const DEFAULT_DELIVERY_FEE_CENTS: i64 = 500;
