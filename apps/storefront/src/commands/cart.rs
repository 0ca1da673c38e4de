//! # Cart Commands
//!
//! Commands for cart manipulation. Every response carries the full cart,
//! its totals, and the totals rendered in the display currency.
//!
//! ## Cart Lifecycle
//! ```text
//! ┌──────────┐     ┌──────────┐     ┌──────────┐     ┌──────────┐
//! │  Empty   │────►│ In Cart  │────►│ Delivery │────►│ Payment  │
//! │  Cart    │     │          │     │          │     │          │
//! └──────────┘     └──────────┘     └──────────┘     └──────────┘
//!                       │                                  │
//!                  add_to_cart                        place_order
//!                  update_cart_item                   (checkout.rs)
//!                  remove_from_cart                        │
//!                       │                                  ▼
//!                  clear_cart ──────────────────────► back to empty
//! ```
//!
//! Emptying the cart mid-checkout sends the checkout back to the cart stage.

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::ApiError;
use crate::state::{CartSession, CartState, DbState, RatesState, SessionStore};
use souq_core::{
    Cart, CartLineItem, CartTotals, CheckoutStage, CoreError, CoreResult, Currency, DeliveryAddress,
    ExchangeRateSet, Money,
};

/// A cart line with its display strings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartLineView {
    #[serde(flatten)]
    pub item: CartLineItem,

    /// Line total after discount (USD cents).
    pub line_total: Money,

    pub display_unit_price: String,
    pub display_line_total: String,
}

/// Totals in the display currency.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DisplayTotals {
    pub subtotal: String,
    pub discount_total: String,
    pub delivery_fee: String,
    pub total: String,
}

/// Cart response including items, totals and checkout stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartResponse {
    pub items: Vec<CartLineView>,
    pub totals: CartTotals,
    pub display: DisplayTotals,
    pub currency: Currency,
    pub stage: CheckoutStage,
    pub delivery_address: Option<DeliveryAddress>,
}

impl CartResponse {
    pub fn build(session: &CartSession, rates: &ExchangeRateSet, currency: Currency) -> Self {
        let cart = &session.cart;
        let totals = cart.totals();

        let items = cart
            .items
            .iter()
            .map(|item| CartLineView {
                line_total: item.line_total(),
                display_unit_price: rates.format_money(item.price, currency),
                display_line_total: rates.format_money(item.line_total(), currency),
                item: item.clone(),
            })
            .collect();

        CartResponse {
            items,
            display: DisplayTotals {
                subtotal: rates.format_money(totals.subtotal, currency),
                discount_total: rates.format_money(totals.discount_total, currency),
                delivery_fee: rates.format_money(totals.delivery_fee, currency),
                total: rates.format_money(totals.total, currency),
            },
            totals,
            currency,
            stage: session.flow.stage(),
            delivery_address: cart.delivery_address.clone(),
        }
    }
}

/// Builds the response for the current state of `cart`.
pub(crate) async fn respond(cart: &CartState, rates: &RatesState) -> CartResponse {
    let (rates, currency) = rates.snapshot().await;
    cart.with_cart(|s| CartResponse::build(s, &rates, currency)).await
}

/// Gets the current cart contents.
pub async fn get_cart(cart: &CartState, rates: &RatesState) -> CartResponse {
    debug!("get_cart command");
    respond(cart, rates).await
}

/// Adds a product to the cart.
///
/// ## Behavior
/// - Same product and color already in cart: quantity increases
/// - Otherwise: added as a new line
/// - Price and discount are frozen now; resellers whose plan allows it get
///   the wholesale price
///
/// ## Arguments
/// * `product_id` - Product to add
/// * `quantity` - Quantity to add (default: 1)
/// * `color` - Color variant; must be one of the product's colors
///
/// ## Errors
/// - `NOT_FOUND` for an unknown product
/// - `BUSINESS_LOGIC` for an inactive product
/// - `INSUFFICIENT_STOCK` when the product's lines together would exceed stock
/// - `VALIDATION_ERROR` for a bad quantity or color
pub async fn add_to_cart(
    db: &DbState,
    cart: &CartState,
    rates: &RatesState,
    session: &SessionStore,
    product_id: String,
    quantity: Option<i64>,
    color: Option<String>,
) -> Result<CartResponse, ApiError> {
    let quantity = quantity.unwrap_or(1);
    debug!(product_id = %product_id, quantity, color = ?color, "add_to_cart command");

    let product = db
        .inner()
        .products()
        .get_by_id(&product_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Product", &product_id))?;

    let buyer = session.current().await.map(|s| s.user);
    let color = color.filter(|c| !c.trim().is_empty());

    cart.with_cart_mut(|s| -> CoreResult<()> {
        let line = product.to_line_item(quantity, color.as_deref(), buyer.as_ref())?;

        // Stock is per product, shared by all of its color lines.
        let in_cart = s.cart.quantity_of(&line.id);
        if in_cart + quantity > product.stock {
            return Err(CoreError::InsufficientStock {
                title: product.title.clone(),
                available: product.stock,
                requested: in_cart + quantity,
            });
        }

        s.cart.add_item(line)
    })
    .await?;

    info!(product_id = %product_id, quantity, "Added to cart");
    Ok(respond(cart, rates).await)
}

/// Sets the quantity of every line of a product already in the cart.
///
/// Quantities below 1 are clamped to 1; use `remove_from_cart` to remove.
///
/// ## Errors
/// - `NOT_FOUND` if the product is not in the cart
/// - `INSUFFICIENT_STOCK` if the product's lines together would exceed stock
pub async fn update_cart_item(
    db: &DbState,
    cart: &CartState,
    rates: &RatesState,
    product_id: String,
    quantity: i64,
) -> Result<CartResponse, ApiError> {
    debug!(product_id = %product_id, quantity, "update_cart_item command");

    let stock = db
        .inner()
        .products()
        .get_by_id(&product_id)
        .await?
        .map(|p| (p.title, p.stock));

    cart.with_cart_mut(|s| -> CoreResult<()> {
        let lines = s.cart.items.iter().filter(|i| i.id == product_id).count() as i64;
        if let Some((title, available)) = &stock {
            let requested = quantity.max(1) * lines;
            if lines > 0 && requested > *available {
                return Err(CoreError::InsufficientStock {
                    title: title.clone(),
                    available: *available,
                    requested,
                });
            }
        }
        s.cart.update_quantity(&product_id, quantity)
    })
    .await?;

    Ok(respond(cart, rates).await)
}

/// Re-checks every product in `cart` against the catalog: it must still
/// exist, be active and have stock for all of its lines together.
pub(crate) async fn ensure_in_stock(db: &DbState, cart: &Cart) -> Result<(), ApiError> {
    let mut checked: Vec<&str> = Vec::new();

    for line in &cart.items {
        if checked.contains(&line.id.as_str()) {
            continue;
        }
        checked.push(&line.id);

        let product = db
            .inner()
            .products()
            .get_by_id(&line.id)
            .await?
            .ok_or_else(|| ApiError::not_found("Product", &line.id))?;
        if !product.is_active {
            return Err(CoreError::ProductUnavailable(product.id).into());
        }

        let requested = cart.quantity_of(&line.id);
        if requested > product.stock {
            return Err(CoreError::InsufficientStock {
                title: product.title,
                available: product.stock,
                requested,
            }
            .into());
        }
    }

    Ok(())
}

/// Removes a product from the cart.
///
/// With `color`, only that variant is removed; otherwise every line of the
/// product. Removing something that is not in the cart is a no-op.
pub async fn remove_from_cart(
    cart: &CartState,
    rates: &RatesState,
    product_id: String,
    color: Option<String>,
) -> CartResponse {
    debug!(product_id = %product_id, color = ?color, "remove_from_cart command");

    cart.with_cart_mut(|s| {
        match color.as_deref() {
            Some(color) => s.cart.remove_variant(&product_id, Some(color)),
            None => s.cart.remove_item(&product_id),
        };
        s.flow.sync_with_cart(&s.cart);
    })
    .await;

    respond(cart, rates).await
}

/// Empties the cart and forgets the delivery address.
pub async fn clear_cart(cart: &CartState, rates: &RatesState) -> CartResponse {
    debug!("clear_cart command");

    cart.with_cart_mut(|s| {
        s.cart.clear();
        s.flow.reset();
    })
    .await;

    respond(cart, rates).await
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use crate::test_support::{add_product, services};
    use souq_db::NewProduct;

    #[tokio::test]
    async fn test_add_merges_and_totals() {
        let app = services().await;
        let lamp = app
            .db
            .inner()
            .products()
            .create(&NewProduct {
                title: "Lamp".to_string(),
                price_cents: 10_000,
                discount_bps: Some(1_000),
                stock: 10,
                is_active: true,
                ..NewProduct::default()
            })
            .await
            .unwrap();

        add_to_cart(&app.db, &app.cart, &app.rates, &app.session, lamp.id.clone(), None, None)
            .await
            .unwrap();
        let response =
            add_to_cart(&app.db, &app.cart, &app.rates, &app.session, lamp.id, Some(1), None)
                .await
                .unwrap();

        assert_eq!(response.items.len(), 1);
        assert_eq!(response.items[0].item.quantity, 2);
        assert_eq!(response.totals.subtotal, Money::from_cents(20_000));
        assert_eq!(response.totals.discount_total, Money::from_cents(2_000));
        assert_eq!(response.totals.delivery_fee, Money::from_cents(500));
        assert_eq!(response.totals.total, Money::from_cents(18_500));
        assert_eq!(response.display.total, "185.00");
        assert_eq!(response.stage, CheckoutStage::Cart);
    }

    #[tokio::test]
    async fn test_add_rejects_unknown_inactive_and_over_stock() {
        let app = services().await;

        let err = add_to_cart(&app.db, &app.cart, &app.rates, &app.session, "nope".into(), None, None)
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::NotFound);

        let inactive = add_product(&app, "Old", 1_000, false).await;
        let err = add_to_cart(&app.db, &app.cart, &app.rates, &app.session, inactive.id, None, None)
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::BusinessLogic);

        let limited = app
            .db
            .inner()
            .products()
            .create(&NewProduct {
                title: "Rare".to_string(),
                price_cents: 1_000,
                stock: 3,
                is_active: true,
                ..NewProduct::default()
            })
            .await
            .unwrap();
        add_to_cart(&app.db, &app.cart, &app.rates, &app.session, limited.id.clone(), Some(2), None)
            .await
            .unwrap();
        let err = add_to_cart(&app.db, &app.cart, &app.rates, &app.session, limited.id, Some(2), None)
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::InsufficientStock);

        let cart = get_cart(&app.cart, &app.rates).await;
        assert_eq!(cart.totals.total_quantity, 2);
    }

    #[tokio::test]
    async fn test_colors_are_separate_lines() {
        let app = services().await;
        let rug = app
            .db
            .inner()
            .products()
            .create(&NewProduct {
                title: "Rug".to_string(),
                price_cents: 3_200,
                colors: vec!["red".to_string(), "blue".to_string()],
                stock: 20,
                is_active: true,
                ..NewProduct::default()
            })
            .await
            .unwrap();

        for color in ["red", "blue", "red"] {
            add_to_cart(
                &app.db,
                &app.cart,
                &app.rates,
                &app.session,
                rug.id.clone(),
                None,
                Some(color.to_string()),
            )
            .await
            .unwrap();
        }

        let err = add_to_cart(
            &app.db,
            &app.cart,
            &app.rates,
            &app.session,
            rug.id.clone(),
            None,
            Some("green".to_string()),
        )
        .await
        .unwrap_err();
        assert_eq!(err.field.as_deref(), Some("color"));

        let cart = get_cart(&app.cart, &app.rates).await;
        assert_eq!(cart.items.len(), 2);
        assert_eq!(cart.totals.total_quantity, 3);

        let cart = remove_from_cart(&app.cart, &app.rates, rug.id.clone(), Some("red".into())).await;
        assert_eq!(cart.items.len(), 1);
        assert_eq!(cart.items[0].item.color.as_deref(), Some("blue"));

        let cart = remove_from_cart(&app.cart, &app.rates, rug.id, None).await;
        assert!(cart.items.is_empty());
    }

    #[tokio::test]
    async fn test_color_spellings_share_a_line() {
        let app = services().await;
        let rug = app
            .db
            .inner()
            .products()
            .create(&NewProduct {
                title: "Rug".to_string(),
                price_cents: 3_200,
                colors: vec!["red".to_string()],
                stock: 20,
                is_active: true,
                ..NewProduct::default()
            })
            .await
            .unwrap();

        for color in ["red", "RED"] {
            add_to_cart(
                &app.db,
                &app.cart,
                &app.rates,
                &app.session,
                rug.id.clone(),
                None,
                Some(color.to_string()),
            )
            .await
            .unwrap();
        }

        let cart = get_cart(&app.cart, &app.rates).await;
        assert_eq!(cart.items.len(), 1);
        assert_eq!(cart.items[0].item.quantity, 2);
        assert_eq!(cart.items[0].item.color.as_deref(), Some("red"));

        let cart = remove_from_cart(&app.cart, &app.rates, rug.id, Some("Red".into())).await;
        assert!(cart.items.is_empty());
    }

    #[tokio::test]
    async fn test_stock_is_shared_across_colors() {
        let app = services().await;
        let scarf = app
            .db
            .inner()
            .products()
            .create(&NewProduct {
                title: "Scarf".to_string(),
                price_cents: 1_500,
                colors: vec!["red".to_string(), "blue".to_string()],
                stock: 3,
                is_active: true,
                ..NewProduct::default()
            })
            .await
            .unwrap();

        add_to_cart(
            &app.db,
            &app.cart,
            &app.rates,
            &app.session,
            scarf.id.clone(),
            Some(3),
            Some("red".to_string()),
        )
        .await
        .unwrap();
        let err = add_to_cart(
            &app.db,
            &app.cart,
            &app.rates,
            &app.session,
            scarf.id.clone(),
            Some(1),
            Some("blue".to_string()),
        )
        .await
        .unwrap_err();
        assert_eq!(err.code, ErrorCode::InsufficientStock);

        let err = update_cart_item(&app.db, &app.cart, &app.rates, scarf.id.clone(), 500)
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::InsufficientStock);

        let cart = update_cart_item(&app.db, &app.cart, &app.rates, scarf.id, 2)
            .await
            .unwrap();
        assert_eq!(cart.totals.total_quantity, 2);
    }

    #[tokio::test]
    async fn test_update_clamps_and_missing_item() {
        let app = services().await;
        let lamp = add_product(&app, "Lamp", 1_000, true).await;
        add_to_cart(&app.db, &app.cart, &app.rates, &app.session, lamp.id.clone(), Some(3), None)
            .await
            .unwrap();

        let cart = update_cart_item(&app.db, &app.cart, &app.rates, lamp.id.clone(), 0)
            .await
            .unwrap();
        assert_eq!(cart.items[0].item.quantity, 1);

        let err = update_cart_item(&app.db, &app.cart, &app.rates, "ghost".into(), 2)
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::NotFound);
    }

    #[tokio::test]
    async fn test_display_currency_applies_to_totals() {
        let app = services().await;
        let lamp = add_product(&app, "Lamp", 1_000, true).await;
        add_to_cart(&app.db, &app.cart, &app.rates, &app.session, lamp.id, Some(2), None)
            .await
            .unwrap();

        app.rates.set_currency(Currency::Sar).await;
        let cart = get_cart(&app.cart, &app.rates).await;

        // $20 + $5 delivery = $25 → 25 × 1320 / 352 = 93.75 SAR
        assert_eq!(cart.currency, Currency::Sar);
        assert_eq!(cart.display.total, "93.75 SAR");
        assert_eq!(cart.items[0].display_line_total, "75.00 SAR");
    }

    #[tokio::test]
    async fn test_clear_cart_resets_everything() {
        let app = services().await;
        let lamp = add_product(&app, "Lamp", 1_000, true).await;
        add_to_cart(&app.db, &app.cart, &app.rates, &app.session, lamp.id, None, None)
            .await
            .unwrap();

        let cart = clear_cart(&app.cart, &app.rates).await;
        assert!(cart.items.is_empty());
        assert!(cart.delivery_address.is_none());
        assert_eq!(cart.totals.total, Money::zero());
    }
}
