//! # Domain Types
//!
//! Core domain types shared by the data service and the dashboards.
//!
//! ## Type Map
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐        │
//! │  │  UserProfile    │   │    Product      │   │     Order       │        │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │        │
//! │  │  account_type   │   │  price_cents    │   │  status         │        │
//! │  │  reseller_plan  │   │  reseller_price │   │  totals (cents) │        │
//! │  │                 │   │  discount_bps   │   │  address        │        │
//! │  └─────────────────┘   └─────────────────┘   └─────────────────┘        │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐        │
//! │  │  Advertisement  │   │     ApiKey      │   │  AdminAction    │        │
//! │  └─────────────────┘   └─────────────────┘   └─────────────────┘        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Monetary columns are `i64` cents with `Money` accessors, following the
//! same row-friendly layout the database uses.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use ts_rs::TS;

use crate::cart::{CartLineItem, DeliveryAddress};
use crate::error::{CoreError, CoreResult, ValidationError};
use crate::money::{DiscountRate, Money};
use crate::validation::validate_quantity;

// =============================================================================
// Accounts
// =============================================================================

/// Which dashboard a user gets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "lowercase")]
pub enum AccountType {
    #[default]
    Customer,
    Reseller,
    Admin,
}

impl AccountType {
    pub const fn as_str(&self) -> &'static str {
        match self {
            AccountType::Customer => "customer",
            AccountType::Reseller => "reseller",
            AccountType::Admin => "admin",
        }
    }
}

impl fmt::Display for AccountType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AccountType {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "customer" => Ok(AccountType::Customer),
            "reseller" => Ok(AccountType::Reseller),
            "admin" => Ok(AccountType::Admin),
            _ => Err(ValidationError::NotAllowed {
                field: "account_type".to_string(),
                allowed: vec![
                    "customer".to_string(),
                    "reseller".to_string(),
                    "admin".to_string(),
                ],
            }),
        }
    }
}

/// Reseller subscription tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "lowercase")]
pub enum ResellerPlan {
    Basic,
    Standard,
    Premium,
}

/// Features gated by the reseller plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum ResellerFeature {
    /// Buy at the reseller price instead of the retail price.
    WholesalePricing,
    /// Create API keys for the catalog feed.
    ApiAccess,
    /// See sales statistics.
    Analytics,
}

impl ResellerPlan {
    /// Minimum plan per feature:
    ///
    /// | Feature            | Basic | Standard | Premium |
    /// |--------------------|-------|----------|---------|
    /// | WholesalePricing   |       | ✓        | ✓       |
    /// | ApiAccess          |       |          | ✓       |
    /// | Analytics          |       |          | ✓       |
    pub fn allows(&self, feature: ResellerFeature) -> bool {
        let required = match feature {
            ResellerFeature::WholesalePricing => ResellerPlan::Standard,
            ResellerFeature::ApiAccess | ResellerFeature::Analytics => ResellerPlan::Premium,
        };
        *self >= required
    }
}

impl FromStr for ResellerPlan {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "basic" => Ok(ResellerPlan::Basic),
            "standard" => Ok(ResellerPlan::Standard),
            "premium" => Ok(ResellerPlan::Premium),
            _ => Err(ValidationError::NotAllowed {
                field: "reseller_plan".to_string(),
                allowed: vec![
                    "basic".to_string(),
                    "standard".to_string(),
                    "premium".to_string(),
                ],
            }),
        }
    }
}

/// A storefront user as seen by the dashboards (no credentials).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub id: String,
    pub email: String,
    pub full_name: String,
    pub account_type: AccountType,
    pub reseller_plan: Option<ResellerPlan>,
    pub is_active: bool,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

impl UserProfile {
    pub fn is_admin(&self) -> bool {
        self.account_type == AccountType::Admin
    }

    /// Admins get every feature, resellers what their plan allows,
    /// customers none.
    pub fn can(&self, feature: ResellerFeature) -> bool {
        match self.account_type {
            AccountType::Admin => true,
            AccountType::Reseller => self
                .reseller_plan
                .map(|plan| plan.allows(feature))
                .unwrap_or(false),
            AccountType::Customer => false,
        }
    }
}

/// An authenticated session.
///
/// `is_mock` sessions are created without the data service (demo mode) and
/// carry a placeholder token.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub user: UserProfile,
    pub access_token: String,
    #[ts(as = "String")]
    pub expires_at: DateTime<Utc>,
    pub is_mock: bool,
}

impl Session {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

// =============================================================================
// Product
// =============================================================================

/// A catalog product. Prices are USD cents.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: String,
    pub title: String,
    pub description: Option<String>,
    /// Retail price in cents.
    pub price_cents: i64,
    /// Price for resellers with wholesale pricing, if different.
    pub reseller_price_cents: Option<i64>,
    /// Catalog discount in basis points (1000 = 10%).
    pub discount_bps: Option<i64>,
    pub image_url: String,
    /// Comma-separated color variants; empty when the product has none.
    pub colors: String,
    pub category: String,
    pub stock: i64,
    pub is_active: bool,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl Product {
    #[inline]
    pub fn price(&self) -> Money {
        Money::from_cents(self.price_cents)
    }

    /// Catalog discount, if any.
    pub fn discount(&self) -> Option<DiscountRate> {
        self.discount_bps
            .filter(|bps| *bps > 0)
            .map(|bps| DiscountRate::from_bps(bps.clamp(0, 10_000) as u32))
    }

    /// Color variants as a list.
    pub fn color_list(&self) -> Vec<String> {
        self.colors
            .split(',')
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .map(str::to_string)
            .collect()
    }

    /// Unit price for a buyer: the reseller price when the buyer has
    /// wholesale pricing and the product defines one, otherwise retail.
    pub fn price_for(&self, buyer: Option<&UserProfile>) -> Money {
        let wholesale = buyer
            .map(|user| user.can(ResellerFeature::WholesalePricing))
            .unwrap_or(false);

        match self.reseller_price_cents {
            Some(cents) if wholesale => Money::from_cents(cents),
            _ => self.price(),
        }
    }

    /// Freezes this product into a cart line.
    ///
    /// ## Errors
    /// - `ProductUnavailable` for inactive products
    /// - `Validation` for a bad quantity or an unknown color
    /// - `InsufficientStock` if fewer units are in stock than requested
    pub fn to_line_item(
        &self,
        quantity: i64,
        color: Option<&str>,
        buyer: Option<&UserProfile>,
    ) -> CoreResult<CartLineItem> {
        if !self.is_active {
            return Err(CoreError::ProductUnavailable(self.id.clone()));
        }

        validate_quantity(quantity)?;

        let colors = self.color_list();
        // Stored in the catalog's spelling so "RED" and "red" share a line.
        let color = match color.map(str::trim).filter(|c| !c.is_empty()) {
            Some(c) => {
                let known = colors.iter().find(|known| known.eq_ignore_ascii_case(c)).cloned();
                if known.is_none() {
                    return Err(ValidationError::NotAllowed {
                        field: "color".to_string(),
                        allowed: colors,
                    }
                    .into());
                }
                known
            }
            None => None,
        };

        if self.stock < quantity {
            return Err(CoreError::InsufficientStock {
                title: self.title.clone(),
                available: self.stock,
                requested: quantity,
            });
        }

        let mut line = CartLineItem::new(&self.id, &self.title, self.price_for(buyer), quantity)
            .with_image(&self.image_url);
        if let Some(discount) = self.discount() {
            line = line.with_discount(discount);
        }
        if let Some(color) = color {
            line = line.with_color(color);
        }
        Ok(line)
    }
}

/// Filter for the `fetch_products` procedure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase", default)]
pub struct ProductFilter {
    /// Substring match on title and description.
    pub query: Option<String>,
    pub category: Option<String>,
    pub only_discounted: bool,
    /// Include inactive products (admin views).
    pub include_inactive: bool,
    pub limit: u32,
    pub offset: u32,
}

impl Default for ProductFilter {
    fn default() -> Self {
        ProductFilter {
            query: None,
            category: None,
            only_discounted: false,
            include_inactive: false,
            limit: 50,
            offset: 0,
        }
    }
}

// =============================================================================
// Orders
// =============================================================================

/// Order lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    #[default]
    Pending,
    Processing,
    Shipped,
    Delivered,
    Cancelled,
}

impl OrderStatus {
    pub const fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Processing => "processing",
            OrderStatus::Shipped => "shipped",
            OrderStatus::Delivered => "delivered",
            OrderStatus::Cancelled => "cancelled",
        }
    }

    /// Delivered and cancelled orders are final.
    pub const fn is_terminal(&self) -> bool {
        matches!(self, OrderStatus::Delivered | OrderStatus::Cancelled)
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A placed order. Totals and address are frozen at placement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: String,
    pub user_id: String,
    pub status: OrderStatus,
    pub subtotal_cents: i64,
    pub discount_cents: i64,
    pub delivery_fee_cents: i64,
    pub total_cents: i64,
    /// Currency the customer was viewing when ordering (display only).
    pub currency: String,
    pub full_name: String,
    pub street: String,
    pub city: String,
    pub state: String,
    pub postal_code: String,
    pub country: String,
    pub phone: String,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl Order {
    #[inline]
    pub fn total(&self) -> Money {
        Money::from_cents(self.total_cents)
    }

    pub fn delivery_address(&self) -> DeliveryAddress {
        DeliveryAddress {
            full_name: self.full_name.clone(),
            street: self.street.clone(),
            city: self.city.clone(),
            state: self.state.clone(),
            postal_code: self.postal_code.clone(),
            country: self.country.clone(),
            phone: self.phone.clone(),
        }
    }
}

/// A line of a placed order (snapshot of the cart line).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct OrderItem {
    pub id: String,
    pub order_id: String,
    pub product_id: String,
    pub title_snapshot: String,
    pub color: Option<String>,
    pub unit_price_cents: i64,
    pub discount_bps: Option<i64>,
    pub quantity: i64,
    pub line_total_cents: i64,
}

impl OrderItem {
    /// Snapshots a cart line under the given ids.
    pub fn from_line(id: impl Into<String>, order_id: impl Into<String>, line: &CartLineItem) -> Self {
        OrderItem {
            id: id.into(),
            order_id: order_id.into(),
            product_id: line.id.clone(),
            title_snapshot: line.title.clone(),
            color: line.color.clone(),
            unit_price_cents: line.price.cents(),
            discount_bps: line.discount.map(|d| i64::from(d.bps())),
            quantity: line.quantity,
            line_total_cents: line.line_total().cents(),
        }
    }
}

// =============================================================================
// Advertisements, API Keys, Admin Log
// =============================================================================

/// A storefront banner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct Advertisement {
    pub id: String,
    pub title: String,
    pub image_url: String,
    pub link_url: Option<String>,
    /// Sort order on the home page (ascending).
    pub position: i64,
    pub is_active: bool,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

/// API key metadata. The secret itself is shown once and never stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct ApiKey {
    pub id: String,
    pub owner_id: String,
    pub label: String,
    /// First characters of the key, for recognising it in lists.
    pub key_prefix: String,
    pub is_active: bool,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "Option<String>")]
    pub last_used_at: Option<DateTime<Utc>>,
}

/// An entry in the admin audit log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
pub struct AdminAction {
    pub id: String,
    pub admin_id: String,
    /// Verb, e.g. `product.update`.
    pub action: String,
    /// Id of the affected record.
    pub target: Option<String>,
    /// JSON details.
    pub details: String,
    pub created_at: DateTime<Utc>,
}

impl AdminAction {
    /// Parses `details`; malformed JSON yields `Value::Null`.
    pub fn details_json(&self) -> serde_json::Value {
        serde_json::from_str(&self.details).unwrap_or(serde_json::Value::Null)
    }
}

/// Counters for the admin dashboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    pub total_users: i64,
    pub total_customers: i64,
    pub total_resellers: i64,
    pub total_products: i64,
    pub total_orders: i64,
    pub pending_orders: i64,
    /// Sum of totals over non-cancelled orders, in cents.
    pub revenue_cents: i64,
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn user(account_type: AccountType, plan: Option<ResellerPlan>) -> UserProfile {
        UserProfile {
            id: "u1".to_string(),
            email: "u1@example.com".to_string(),
            full_name: "User One".to_string(),
            account_type,
            reseller_plan: plan,
            is_active: true,
            created_at: Utc::now(),
        }
    }

    fn product() -> Product {
        Product {
            id: "p1".to_string(),
            title: "Prayer Rug".to_string(),
            description: None,
            price_cents: 4_000,
            reseller_price_cents: Some(3_200),
            discount_bps: Some(1_000),
            image_url: "https://cdn.example.com/rug.png".to_string(),
            colors: "red, green,".to_string(),
            category: "home".to_string(),
            stock: 5,
            is_active: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_plan_gating() {
        assert!(!ResellerPlan::Basic.allows(ResellerFeature::WholesalePricing));
        assert!(ResellerPlan::Standard.allows(ResellerFeature::WholesalePricing));
        assert!(!ResellerPlan::Standard.allows(ResellerFeature::ApiAccess));
        assert!(ResellerPlan::Premium.allows(ResellerFeature::Analytics));

        assert!(user(AccountType::Admin, None).can(ResellerFeature::ApiAccess));
        assert!(!user(AccountType::Customer, None).can(ResellerFeature::WholesalePricing));
        assert!(!user(AccountType::Reseller, None).can(ResellerFeature::WholesalePricing));
    }

    #[test]
    fn test_price_for_buyer() {
        let p = product();
        assert_eq!(p.price_for(None).cents(), 4_000);
        assert_eq!(
            p.price_for(Some(&user(AccountType::Customer, None))).cents(),
            4_000
        );
        assert_eq!(
            p.price_for(Some(&user(AccountType::Reseller, Some(ResellerPlan::Basic))))
                .cents(),
            4_000
        );
        assert_eq!(
            p.price_for(Some(&user(AccountType::Reseller, Some(ResellerPlan::Standard))))
                .cents(),
            3_200
        );
    }

    #[test]
    fn test_to_line_item() {
        let line = product().to_line_item(2, Some("Green"), None).unwrap();
        assert_eq!(line.id, "p1");
        assert_eq!(line.quantity, 2);
        assert_eq!(line.color.as_deref(), Some("green"));
        assert_eq!(line.discount, Some(DiscountRate::from_bps(1_000)));
        assert_eq!(line.line_total().cents(), 7_200);
    }

    #[test]
    fn test_color_takes_catalog_spelling() {
        let p = product();
        let shouted = p.to_line_item(1, Some("RED"), None).unwrap();
        let plain = p.to_line_item(1, Some(" red "), None).unwrap();
        assert_eq!(shouted.color.as_deref(), Some("red"));
        assert_eq!(shouted.color, plain.color);
    }

    #[test]
    fn test_to_line_item_errors() {
        let p = product();
        assert!(matches!(
            p.to_line_item(1, Some("purple"), None),
            Err(CoreError::Validation(_))
        ));
        assert!(matches!(
            p.to_line_item(6, None, None),
            Err(CoreError::InsufficientStock { available: 5, .. })
        ));

        let mut inactive = product();
        inactive.is_active = false;
        assert!(matches!(
            inactive.to_line_item(1, None, None),
            Err(CoreError::ProductUnavailable(_))
        ));
    }

    #[test]
    fn test_color_list() {
        assert_eq!(product().color_list(), vec!["red", "green"]);

        let mut plain = product();
        plain.colors = String::new();
        assert!(plain.color_list().is_empty());
    }

    #[test]
    fn test_account_type_parse_and_serde() {
        assert_eq!("ADMIN".parse::<AccountType>().unwrap(), AccountType::Admin);
        assert!("guest".parse::<AccountType>().is_err());
        assert_eq!(
            serde_json::to_string(&AccountType::Reseller).unwrap(),
            "\"reseller\""
        );
        assert_eq!("premium".parse::<ResellerPlan>().unwrap(), ResellerPlan::Premium);
    }

    #[test]
    fn test_order_status_terminal() {
        assert!(OrderStatus::Delivered.is_terminal());
        assert!(OrderStatus::Cancelled.is_terminal());
        assert!(!OrderStatus::Shipped.is_terminal());
        assert_eq!(OrderStatus::default(), OrderStatus::Pending);
    }

    #[test]
    fn test_order_item_from_line() {
        let line = product().to_line_item(3, None, None).unwrap();
        let item = OrderItem::from_line("i1", "o1", &line);
        assert_eq!(item.unit_price_cents, 4_000);
        assert_eq!(item.discount_bps, Some(1_000));
        assert_eq!(item.line_total_cents, 10_800);
    }

    #[test]
    fn test_session_expiry() {
        let now = Utc::now();
        let session = Session {
            user: user(AccountType::Customer, None),
            access_token: "t".to_string(),
            expires_at: now,
            is_mock: false,
        };
        assert!(session.is_expired(now));
        assert!(!session.is_expired(now - chrono::Duration::seconds(1)));
    }
}
