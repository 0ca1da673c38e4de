//! # Catalog Commands
//!
//! Product listing, product details, home page banners and the display
//! currency.
//!
//! ## Pricing Shown to the Buyer
//! ```text
//! Product.price_cents ──┐
//!                       ├─► price_for(buyer) ─► apply discount ─► convert ─► "1,320 IQD"
//! reseller_price_cents ─┘   (wholesale if the
//!                            buyer's plan allows)
//! ```

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::ApiError;
use crate::state::{DbState, RatesState, SessionStore};
use souq_core::validation::validate_search_query;
use souq_core::{
    Advertisement, Currency, ExchangeRateSet, Money, Product, ProductFilter, UserProfile,
};
use souq_db::rpc::FETCH_PRODUCTS;

/// A product as shown on a product card, priced for the current buyer.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductCard {
    #[serde(flatten)]
    pub product: Product,

    /// Unit price for this buyer before the discount (USD cents).
    pub unit_price: Money,

    /// Unit price after the discount (USD cents).
    pub final_price: Money,

    /// `unit_price` in the display currency.
    pub display_price: String,

    /// `final_price` in the display currency.
    pub display_final_price: String,

    /// Selectable colors, empty if the product has none.
    pub color_options: Vec<String>,
}

impl ProductCard {
    pub fn new(
        product: Product,
        buyer: Option<&UserProfile>,
        rates: &ExchangeRateSet,
        currency: Currency,
    ) -> Self {
        let unit_price = product.price_for(buyer);
        let final_price = match product.discount() {
            Some(rate) => unit_price.apply_discount(rate),
            None => unit_price,
        };

        ProductCard {
            display_price: rates.format_money(unit_price, currency),
            display_final_price: rates.format_money(final_price, currency),
            color_options: product.color_list(),
            unit_price,
            final_price,
            product,
        }
    }
}

/// Display currency and the rates behind it.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RatesResponse {
    pub currency: Currency,
    pub rates: ExchangeRateSet,
}

/// Lists catalog products.
///
/// ## Behavior
/// - Search text is trimmed; an empty query means "no filter"
/// - Inactive products are only listed for admins
/// - Prices are resolved for the signed-in buyer (wholesale for resellers
///   whose plan allows it)
///
/// ## Errors
/// - `VALIDATION_ERROR` (field `query`) for a query over 100 characters
pub async fn list_products(
    db: &DbState,
    rates: &RatesState,
    session: &SessionStore,
    filter: ProductFilter,
) -> Result<Vec<ProductCard>, ApiError> {
    debug!(?filter, "list_products command");

    let buyer = session.current().await.map(|s| s.user);
    let is_admin = buyer.as_ref().map(UserProfile::is_admin).unwrap_or(false);

    let mut filter = filter;
    filter.query = match filter.query.take() {
        Some(query) => Some(validate_search_query(&query)?).filter(|q| !q.is_empty()),
        None => None,
    };
    filter.include_inactive = filter.include_inactive && is_admin;

    let products = db
        .inner()
        .rpc()
        .fetch_products(&filter)
        .await
        .into_result(FETCH_PRODUCTS)?;

    let (rates, currency) = rates.snapshot().await;
    let cards: Vec<ProductCard> = products
        .into_iter()
        .map(|p| ProductCard::new(p, buyer.as_ref(), &rates, currency))
        .collect();

    info!(count = cards.len(), "list_products complete");
    Ok(cards)
}

/// Gets a single product. Inactive products are hidden from non-admins.
pub async fn get_product(
    db: &DbState,
    rates: &RatesState,
    session: &SessionStore,
    id: String,
) -> Result<ProductCard, ApiError> {
    debug!(id = %id, "get_product command");

    let buyer = session.current().await.map(|s| s.user);
    let is_admin = buyer.as_ref().map(UserProfile::is_admin).unwrap_or(false);

    let product = db
        .inner()
        .products()
        .get_by_id(&id)
        .await?
        .filter(|p| p.is_active || is_admin)
        .ok_or_else(|| ApiError::not_found("Product", &id))?;

    let (rates, currency) = rates.snapshot().await;
    Ok(ProductCard::new(product, buyer.as_ref(), &rates, currency))
}

/// Active home page banners in display order.
pub async fn list_active_ads(db: &DbState) -> Result<Vec<Advertisement>, ApiError> {
    debug!("list_active_ads command");
    Ok(db.inner().advertisements().list_active().await?)
}

pub async fn get_rates(rates: &RatesState) -> RatesResponse {
    let (rates, currency) = rates.snapshot().await;
    RatesResponse { currency, rates }
}

/// Switches the currency prices are displayed in.
///
/// ## Arguments
/// * `code` - `USD`, `IQD` or `SAR` (case-insensitive)
pub async fn set_display_currency(
    rates: &RatesState,
    code: String,
) -> Result<RatesResponse, ApiError> {
    let currency: Currency = code.parse()?;
    debug!(currency = %currency, "set_display_currency command");

    rates.set_currency(currency).await;
    Ok(get_rates(rates).await)
}

// =============================================================================
// Unit Tests
// =============================================================================
