//! # Cart Store
//!
//! In-memory shopping cart: line items, the delivery address and derived
//! totals.
//!
//! ## Cart Operations
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Cart Operations                                 │
//! │                                                                         │
//! │  Product card "Add" ─────► add_item()        merge on (id, color)       │
//! │                                              or append a new line       │
//! │                                                                         │
//! │  Quantity stepper ───────► update_quantity() clamps to >= 1             │
//! │                                                                         │
//! │  Trash icon ─────────────► remove_item()     absent id is a no-op       │
//! │                                                                         │
//! │  Delivery form ──────────► set_delivery_address()  wholesale replace    │
//! │                                                                         │
//! │  Order placed ───────────► clear()           items + address reset      │
//! │                                                                         │
//! │  Totals:                                                                │
//! │    subtotal       = Σ price × qty                                       │
//! │    discount_total = Σ (price × discount%) × qty                         │
//! │    total          = subtotal - discount_total + delivery_fee            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Invariants
//! - Lines are unique by `(id, color)`
//! - Every quantity is in `1..=MAX_ITEM_QUANTITY`
//! - Every discount is within 0%..=100%, so `discount_total <= subtotal`

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use ts_rs::TS;

use crate::error::{CoreError, CoreResult};
use crate::money::{DiscountRate, Money};
use crate::validation::{
    validate_discount, validate_price_cents, validate_quantity, validate_required,
};
use crate::{DEFAULT_DELIVERY_FEE_CENTS, MAX_CART_ITEMS, MAX_ITEM_QUANTITY};

// =============================================================================
// Line Item
// =============================================================================

/// One product entry in the cart.
///
/// The price is frozen when the line is created: later catalog price changes
/// do not touch lines already in the cart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct CartLineItem {
    /// Product id.
    pub id: String,

    /// Product title at time of adding.
    pub title: String,

    /// Unit price in USD cents at time of adding.
    pub price: Money,

    /// Quantity in cart (>= 1).
    pub quantity: i64,

    /// Optional percentage discount for this line.
    pub discount: Option<DiscountRate>,

    /// Product image URL.
    pub image: String,

    /// Selected color variant, if the product has any.
    pub color: Option<String>,
}

impl CartLineItem {
    /// Creates a line without discount, image or color.
    pub fn new(id: impl Into<String>, title: impl Into<String>, price: Money, quantity: i64) -> Self {
        CartLineItem {
            id: id.into(),
            title: title.into(),
            price,
            quantity,
            discount: None,
            image: String::new(),
            color: None,
        }
    }

    /// Sets the line discount. A zero rate is stored as "no discount".
    pub fn with_discount(mut self, discount: DiscountRate) -> Self {
        self.discount = if discount.is_zero() { None } else { Some(discount) };
        self
    }

    pub fn with_image(mut self, image: impl Into<String>) -> Self {
        self.image = image.into();
        self
    }

    pub fn with_color(mut self, color: impl Into<String>) -> Self {
        self.color = Some(color.into());
        self
    }

    /// True if this line is the `(id, color)` variant.
    pub fn is_variant(&self, id: &str, color: Option<&str>) -> bool {
        let same_color = match (self.color.as_deref(), color) {
            (Some(mine), Some(other)) => mine.eq_ignore_ascii_case(other.trim()),
            (None, None) => true,
            _ => false,
        };
        self.id == id && same_color
    }

    /// `price × quantity`, ignoring the discount.
    pub fn line_subtotal(&self) -> Money {
        self.price.multiply_quantity(self.quantity)
    }

    /// Discount amount for a single unit.
    pub fn unit_discount(&self) -> Money {
        self.discount
            .map(|rate| self.price.percentage_of(rate))
            .unwrap_or_default()
    }

    /// `unit_discount × quantity`.
    pub fn line_discount(&self) -> Money {
        self.unit_discount().multiply_quantity(self.quantity)
    }

    /// What the customer pays for this line before delivery.
    pub fn line_total(&self) -> Money {
        self.line_subtotal() - self.line_discount()
    }

    fn validate(&self) -> CoreResult<()> {
        validate_required("id", &self.id, 64)?;
        validate_required("title", &self.title, 200)?;
        validate_price_cents("price", self.price.cents())?;
        validate_quantity(self.quantity)?;
        if let Some(discount) = self.discount {
            validate_discount(discount)?;
        }
        Ok(())
    }
}

// =============================================================================
// Delivery Address
// =============================================================================

/// Where the order ships. Replaced wholesale on each submission.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct DeliveryAddress {
    pub full_name: String,
    pub street: String,
    pub city: String,
    pub state: String,
    pub postal_code: String,
    pub country: String,
    pub phone: String,
}

// =============================================================================
// Delivery Fee Policy
// =============================================================================

/// How the delivery fee is chosen.
///
/// ## Resolution
/// ```text
/// address.city (case-insensitive) in city_fees?
///      ├── yes → that fee
///      └── no  → flat_fee   (also used before an address is known)
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeliveryFeePolicy {
    /// Fee used when no city override applies.
    pub flat_fee: Money,

    /// Per-city overrides, keyed by lowercase city name.
    pub city_fees: BTreeMap<String, Money>,
}

impl DeliveryFeePolicy {
    /// A single fee for every address.
    pub fn flat(fee: Money) -> Self {
        DeliveryFeePolicy {
            flat_fee: fee,
            city_fees: BTreeMap::new(),
        }
    }

    /// Adds (or replaces) a city override.
    pub fn with_city_fee(mut self, city: &str, fee: Money) -> Self {
        self.city_fees.insert(normalize_city(city), fee);
        self
    }

    /// Returns the fee for an address (flat fee if none yet).
    pub fn fee_for(&self, address: Option<&DeliveryAddress>) -> Money {
        address
            .and_then(|a| self.city_fees.get(&normalize_city(&a.city)))
            .copied()
            .unwrap_or(self.flat_fee)
    }
}

impl Default for DeliveryFeePolicy {
    fn default() -> Self {
        DeliveryFeePolicy::flat(Money::from_cents(DEFAULT_DELIVERY_FEE_CENTS))
    }
}

fn normalize_city(city: &str) -> String {
    city.trim().to_lowercase()
}

// =============================================================================
// Cart
// =============================================================================

/// The shopping cart.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Cart {
    /// Lines in insertion order.
    pub items: Vec<CartLineItem>,

    /// Submitted delivery address, if any.
    pub delivery_address: Option<DeliveryAddress>,

    /// Fee policy used by [`Cart::delivery_fee`].
    pub fee_policy: DeliveryFeePolicy,
}

impl Cart {
    /// Creates an empty cart with the given fee policy.
    pub fn new(fee_policy: DeliveryFeePolicy) -> Self {
        Cart {
            items: Vec::new(),
            delivery_address: None,
            fee_policy,
        }
    }

    /// Adds a line, or increments the quantity of the matching `(id, color)` line.
    ///
    /// ## Behavior
    /// - Same product and color already in cart: quantity increases, the
    ///   existing frozen price and discount are kept
    /// - Otherwise: appended as a new line
    ///
    /// ## Errors
    /// - `Validation` for an empty id/title, negative price, quantity outside
    ///   `1..=999` or discount above 100%
    /// - `QuantityTooLarge` if the merged quantity would exceed the maximum
    /// - `CartTooLarge` if a new line would exceed `MAX_CART_ITEMS`
    pub fn add_item(&mut self, item: CartLineItem) -> CoreResult<()> {
        item.validate()?;

        if let Some(existing) = self
            .items
            .iter_mut()
            .find(|line| line.is_variant(&item.id, item.color.as_deref()))
        {
            let merged = existing.quantity + item.quantity;
            if merged > MAX_ITEM_QUANTITY {
                return Err(CoreError::QuantityTooLarge {
                    requested: merged,
                    max: MAX_ITEM_QUANTITY,
                });
            }
            existing.quantity = merged;
            return Ok(());
        }

        if self.items.len() >= MAX_CART_ITEMS {
            return Err(CoreError::CartTooLarge {
                max: MAX_CART_ITEMS,
            });
        }

        self.items.push(item);
        Ok(())
    }

    /// Sets the quantity of every line of product `id`.
    ///
    /// ## Behavior
    /// - `quantity <= 0` is clamped to 1 (the line is kept)
    /// - `quantity > MAX_ITEM_QUANTITY` is rejected
    /// - Unknown id: `ItemNotInCart`
    pub fn update_quantity(&mut self, id: &str, quantity: i64) -> CoreResult<()> {
        if quantity > MAX_ITEM_QUANTITY {
            return Err(CoreError::QuantityTooLarge {
                requested: quantity,
                max: MAX_ITEM_QUANTITY,
            });
        }

        let quantity = quantity.max(1);
        let mut found = false;

        for line in self.items.iter_mut().filter(|line| line.id == id) {
            line.quantity = quantity;
            found = true;
        }

        if found {
            Ok(())
        } else {
            Err(CoreError::ItemNotInCart(id.to_string()))
        }
    }

    /// Removes every line of product `id`.
    ///
    /// Returns `true` if anything was removed; an absent id is a no-op.
    pub fn remove_item(&mut self, id: &str) -> bool {
        let before = self.items.len();
        self.items.retain(|line| line.id != id);
        self.items.len() != before
    }

    /// Removes the single `(id, color)` line.
    pub fn remove_variant(&mut self, id: &str, color: Option<&str>) -> bool {
        let before = self.items.len();
        self.items.retain(|line| !line.is_variant(id, color));
        self.items.len() != before
    }

    /// Replaces the delivery address.
    pub fn set_delivery_address(&mut self, address: DeliveryAddress) {
        self.delivery_address = Some(address);
    }

    /// Replaces the fee policy (e.g. after a config reload).
    pub fn set_fee_policy(&mut self, policy: DeliveryFeePolicy) {
        self.fee_policy = policy;
    }

    /// Empties the cart and forgets the delivery address.
    pub fn clear(&mut self) {
        self.items.clear();
        self.delivery_address = None;
    }

    /// Number of distinct lines.
    pub fn item_count(&self) -> usize {
        self.items.len()
    }

    /// Sum of all line quantities.
    /// Units of product `id` across all of its color lines.
    pub fn quantity_of(&self, id: &str) -> i64 {
        self.items
            .iter()
            .filter(|line| line.id == id)
            .map(|line| line.quantity)
            .sum()
    }

    pub fn total_quantity(&self) -> i64 {
        self.items.iter().map(|line| line.quantity).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Σ `price × quantity`, ignoring discounts.
    pub fn subtotal(&self) -> Money {
        self.items.iter().map(CartLineItem::line_subtotal).sum()
    }

    /// Σ `(price × discount%) × quantity` over discounted lines.
    pub fn discount_total(&self) -> Money {
        self.items.iter().map(CartLineItem::line_discount).sum()
    }

    /// Fee for the current address; nothing is delivered for an empty cart.
    pub fn delivery_fee(&self) -> Money {
        if self.is_empty() {
            return Money::zero();
        }
        self.fee_policy.fee_for(self.delivery_address.as_ref())
    }

    /// `subtotal - discount_total + delivery_fee`.
    pub fn total(&self) -> Money {
        self.subtotal() - self.discount_total() + self.delivery_fee()
    }

    /// Snapshot of all derived totals.
    pub fn totals(&self) -> CartTotals {
        CartTotals::from(self)
    }
}

// =============================================================================
// Totals
// =============================================================================

/// Cart totals summary for responses and order creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct CartTotals {
    pub item_count: usize,
    pub total_quantity: i64,
    pub subtotal: Money,
    pub discount_total: Money,
    pub delivery_fee: Money,
    pub total: Money,
}

impl From<&Cart> for CartTotals {
    fn from(cart: &Cart) -> Self {
        CartTotals {
            item_count: cart.item_count(),
            total_quantity: cart.total_quantity(),
            subtotal: cart.subtotal(),
            discount_total: cart.discount_total(),
            delivery_fee: cart.delivery_fee(),
            total: cart.total(),
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MAX_PRICE_CENTS;

    fn dollars(major: i64) -> Money {
        Money::from_major_minor(major, 0)
    }

    fn cart_with_fee(fee: i64) -> Cart {
        Cart::new(DeliveryFeePolicy::flat(dollars(fee)))
    }

    fn address(city: &str) -> DeliveryAddress {
        DeliveryAddress {
            full_name: "Omar Ali".to_string(),
            street: "7 Palestine St".to_string(),
            city: city.to_string(),
            state: "Baghdad".to_string(),
            postal_code: "10011".to_string(),
            country: "Iraq".to_string(),
            phone: "+9647701234567".to_string(),
        }
    }

    #[test]
    fn test_reference_scenario() {
        let mut cart = cart_with_fee(5);
        let item = CartLineItem::new("lamp", "Desk Lamp", dollars(100), 2)
            .with_discount(DiscountRate::from_percentage(10.0).unwrap());
        cart.add_item(item).unwrap();

        assert_eq!(cart.subtotal(), dollars(200));
        assert_eq!(cart.discount_total(), dollars(20));
        assert_eq!(cart.delivery_fee(), dollars(5));
        assert_eq!(cart.total(), dollars(185));
    }

    #[test]
    fn test_add_same_variant_merges() {
        let mut cart = cart_with_fee(5);
        let red = CartLineItem::new("shirt", "Shirt", dollars(20), 1).with_color("red");

        cart.add_item(red.clone()).unwrap();
        cart.add_item(red).unwrap();

        assert_eq!(cart.item_count(), 1);
        assert_eq!(cart.total_quantity(), 2);
    }

    #[test]
    fn test_add_different_color_appends() {
        let mut cart = cart_with_fee(5);
        cart.add_item(CartLineItem::new("shirt", "Shirt", dollars(20), 1).with_color("red"))
            .unwrap();
        cart.add_item(CartLineItem::new("shirt", "Shirt", dollars(20), 1).with_color("blue"))
            .unwrap();
        cart.add_item(CartLineItem::new("shirt", "Shirt", dollars(20), 1))
            .unwrap();

        assert_eq!(cart.item_count(), 3);
    }

    #[test]
    fn test_variant_match_ignores_color_case() {
        let mut cart = cart_with_fee(5);
        cart.add_item(CartLineItem::new("shirt", "Shirt", dollars(20), 1).with_color("red"))
            .unwrap();
        cart.add_item(CartLineItem::new("shirt", "Shirt", dollars(20), 2).with_color("blue"))
            .unwrap();

        assert!(cart.items[0].is_variant("shirt", Some("RED")));
        assert!(!cart.items[0].is_variant("shirt", None));
        assert_eq!(cart.quantity_of("shirt"), 3);
        assert_eq!(cart.quantity_of("hat"), 0);

        assert!(cart.remove_variant("shirt", Some("Blue")));
        assert_eq!(cart.quantity_of("shirt"), 1);
    }

    #[test]
    fn test_merge_keeps_frozen_price() {
        let mut cart = cart_with_fee(0);
        cart.add_item(CartLineItem::new("mug", "Mug", dollars(8), 1)).unwrap();
        cart.add_item(CartLineItem::new("mug", "Mug", dollars(9), 1)).unwrap();

        assert_eq!(cart.items[0].price, dollars(8));
        assert_eq!(cart.subtotal(), dollars(16));
    }

    #[test]
    fn test_add_rejects_invalid_lines() {
        let mut cart = cart_with_fee(5);

        let zero_qty = CartLineItem::new("a", "A", dollars(1), 0);
        assert!(matches!(cart.add_item(zero_qty), Err(CoreError::Validation(_))));

        let negative = CartLineItem::new("a", "A", Money::from_cents(-1), 1);
        assert!(matches!(cart.add_item(negative), Err(CoreError::Validation(_))));

        let mut over_discount = CartLineItem::new("a", "A", dollars(1), 1);
        over_discount.discount = Some(DiscountRate::from_bps(10_001));
        assert!(matches!(cart.add_item(over_discount), Err(CoreError::Validation(_))));

        assert!(cart.is_empty());
    }

    #[test]
    fn test_merge_over_max_quantity_is_rejected() {
        let mut cart = cart_with_fee(5);
        cart.add_item(CartLineItem::new("a", "A", dollars(1), 990)).unwrap();

        let err = cart.add_item(CartLineItem::new("a", "A", dollars(1), 10)).unwrap_err();
        assert!(matches!(err, CoreError::QuantityTooLarge { requested: 1000, .. }));
        assert_eq!(cart.total_quantity(), 990);
    }

    #[test]
    fn test_cart_too_large() {
        let mut cart = cart_with_fee(5);
        for i in 0..MAX_CART_ITEMS {
            cart.add_item(CartLineItem::new(format!("p{i}"), "P", dollars(1), 1))
                .unwrap();
        }

        let err = cart.add_item(CartLineItem::new("extra", "P", dollars(1), 1)).unwrap_err();
        assert!(matches!(err, CoreError::CartTooLarge { .. }));
    }

    #[test]
    fn test_full_cart_at_price_cap_sums() {
        let mut cart = cart_with_fee(5);
        let cap = Money::from_cents(MAX_PRICE_CENTS);
        for i in 0..MAX_CART_ITEMS {
            cart.add_item(CartLineItem::new(format!("p{i}"), "P", cap, MAX_ITEM_QUANTITY))
                .unwrap();
        }

        let expected = MAX_PRICE_CENTS * MAX_ITEM_QUANTITY * MAX_CART_ITEMS as i64;
        assert_eq!(cart.subtotal().cents(), expected);
        assert_eq!(cart.total().cents(), expected + 500);

        let err = cart
            .add_item(CartLineItem::new("p0", "P", Money::from_cents(MAX_PRICE_CENTS + 1), 1))
            .unwrap_err();
        assert!(matches!(err, CoreError::Validation(_)));
    }

    #[test]
    fn test_update_quantity_clamps_to_one() {
        let mut cart = cart_with_fee(5);
        cart.add_item(CartLineItem::new("a", "A", dollars(3), 4)).unwrap();

        cart.update_quantity("a", 0).unwrap();
        assert_eq!(cart.items[0].quantity, 1);

        cart.update_quantity("a", -7).unwrap();
        assert_eq!(cart.items[0].quantity, 1);
        assert_eq!(cart.item_count(), 1);

        cart.update_quantity("a", 6).unwrap();
        assert_eq!(cart.subtotal(), dollars(18));
    }

    #[test]
    fn test_update_quantity_errors() {
        let mut cart = cart_with_fee(5);
        cart.add_item(CartLineItem::new("a", "A", dollars(3), 4)).unwrap();

        assert!(matches!(
            cart.update_quantity("missing", 2),
            Err(CoreError::ItemNotInCart(_))
        ));
        assert!(matches!(
            cart.update_quantity("a", 1000),
            Err(CoreError::QuantityTooLarge { .. })
        ));
        assert_eq!(cart.items[0].quantity, 4);
    }

    #[test]
    fn test_remove_item_absent_is_noop() {
        let mut cart = cart_with_fee(5);
        cart.add_item(CartLineItem::new("a", "A", dollars(3), 1)).unwrap();

        assert!(!cart.remove_item("missing"));
        assert_eq!(cart.item_count(), 1);

        assert!(cart.remove_item("a"));
        assert!(cart.is_empty());
    }

    #[test]
    fn test_remove_variant() {
        let mut cart = cart_with_fee(5);
        cart.add_item(CartLineItem::new("s", "S", dollars(3), 1).with_color("red")).unwrap();
        cart.add_item(CartLineItem::new("s", "S", dollars(3), 1).with_color("blue")).unwrap();

        assert!(cart.remove_variant("s", Some("red")));
        assert_eq!(cart.item_count(), 1);
        assert_eq!(cart.items[0].color.as_deref(), Some("blue"));
    }

    #[test]
    fn test_clear_resets_items_and_address() {
        let mut cart = cart_with_fee(5);
        cart.add_item(CartLineItem::new("a", "A", dollars(3), 1)).unwrap();
        cart.set_delivery_address(address("Erbil"));

        cart.clear();

        assert!(cart.items.is_empty());
        assert!(cart.delivery_address.is_none());
        assert_eq!(cart.total(), Money::zero());
    }

    #[test]
    fn test_address_dependent_fee() {
        let policy = DeliveryFeePolicy::flat(dollars(5)).with_city_fee("Basra", dollars(8));
        let mut cart = Cart::new(policy);
        cart.add_item(CartLineItem::new("a", "A", dollars(10), 1)).unwrap();

        assert_eq!(cart.delivery_fee(), dollars(5));

        cart.set_delivery_address(address("  BASRA "));
        assert_eq!(cart.delivery_fee(), dollars(8));
        assert_eq!(cart.total(), dollars(18));

        cart.set_delivery_address(address("Najaf"));
        assert_eq!(cart.delivery_fee(), dollars(5));
    }

    #[test]
    fn test_empty_cart_has_no_fee() {
        let cart = cart_with_fee(5);
        assert_eq!(cart.delivery_fee(), Money::zero());
        assert_eq!(cart.total(), Money::zero());
    }

    #[test]
    fn test_totals_laws_hold_across_grid() {
        let prices = [0, 1, 99, 1_999, 100_000];
        let quantities = [1, 2, 7, 999];
        let discounts = [0, 1, 333, 1_000, 5_000, 9_999, 10_000];

        for &price in &prices {
            for &qty in &quantities {
                for &bps in &discounts {
                    let mut cart = cart_with_fee(5);
                    cart.add_item(
                        CartLineItem::new("x", "X", Money::from_cents(price), qty)
                            .with_discount(DiscountRate::from_bps(bps)),
                    )
                    .unwrap();
                    cart.add_item(CartLineItem::new("y", "Y", Money::from_cents(price), 1))
                        .unwrap();

                    assert!(cart.discount_total() <= cart.subtotal());
                    assert_eq!(
                        cart.total(),
                        cart.subtotal() - cart.discount_total() + cart.delivery_fee()
                    );
                }
            }
        }
    }

    #[test]
    fn test_totals_serialize_camel_case() {
        let mut cart = cart_with_fee(5);
        cart.add_item(CartLineItem::new("a", "A", dollars(3), 1)).unwrap();

        let json = serde_json::to_value(cart.totals()).unwrap();
        assert_eq!(json["subtotal"], 300);
        assert_eq!(json["discountTotal"], 0);
        assert_eq!(json["deliveryFee"], 500);
        assert_eq!(json["total"], 800);
        assert_eq!(json["itemCount"], 1);
    }
}
