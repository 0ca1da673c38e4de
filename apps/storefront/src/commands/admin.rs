//! # Admin Commands
//!
//! CRUD over users, products, orders, advertisements, currency rates and
//! API keys, for admin accounts only.
//!
//! ## Audit Trail
//! ```text
//! ┌──────────────┐    ┌────────────────┐    ┌──────────────────────────┐
//! │verified_admin│───►│ repository call│───►│ rpc log_admin_action     │
//! │ (FORBIDDEN)  │    │ (the mutation) │    │ failure: warn, no error  │
//! └──────────────┘    └────────────────┘    └──────────────────────────┘
//! ```
//! Reads are not audited.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{debug, info, warn};

use crate::auth::AuthError;
use crate::error::ApiError;
use crate::state::{DbState, RatesState, SessionStore};
use souq_core::money::DiscountRate;
use souq_core::validation::{
    validate_discount, validate_price_cents, validate_product_title, validate_required,
    validate_url,
};
use souq_core::{
    AccountType, AdminAction, Advertisement, ApiKey, DashboardStats, ExchangeRateSet, Order,
    OrderStatus, Product, ResellerPlan, UserProfile, ValidationError,
};
use souq_db::rpc::{GET_DASHBOARD_STATS, LOG_ADMIN_ACTION};
use souq_db::{NewAdvertisement, NewProduct};

const DEFAULT_PAGE_SIZE: u32 = 50;
const MAX_PAGE_SIZE: u32 = 200;

/// Above this relative gap the admin is warned that the rates disagree.
const TRIANGLE_WARN_THRESHOLD: f64 = 0.01;

fn page(limit: Option<u32>) -> u32 {
    limit.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE)
}

/// The signed-in admin, re-read from the database.
///
/// The session alone is not trusted: a demoted, deactivated or deleted
/// admin is refused even while their token is still valid.
pub(crate) async fn verified_admin(
    db: &DbState,
    session: &SessionStore,
) -> Result<UserProfile, ApiError> {
    let claimed = session.require_admin().await?;

    match db.inner().users().get_by_id(&claimed.id).await? {
        Some(user) if user.is_active && user.is_admin() => Ok(user),
        _ => {
            warn!(user_id = %claimed.id, "Admin rights no longer held");
            Err(AuthError::Forbidden("admin access required".to_string()).into())
        }
    }
}

/// Records an admin mutation. Failing to record never fails the command.
pub(crate) async fn audit(db: &DbState, admin: &UserProfile, action: &str, target: Option<&str>, details: Value) {
    let response = db
        .inner()
        .rpc()
        .log_admin_action(&admin.id, action, target, &details)
        .await;

    if let Err(e) = response.into_result(LOG_ADMIN_ACTION) {
        warn!(action, admin_id = %admin.id, error = %e, "Could not record admin action");
    }
}

// =============================================================================
// Users
// =============================================================================

pub async fn admin_list_users(
    db: &DbState,
    session: &SessionStore,
    limit: Option<u32>,
    offset: Option<u32>,
) -> Result<Vec<UserProfile>, ApiError> {
    verified_admin(db, session).await?;
    debug!("admin_list_users command");

    Ok(db
        .inner()
        .users()
        .list(page(limit), offset.unwrap_or(0))
        .await?)
}

/// Changes an account's type and reseller plan.
///
/// ## Behavior
/// - A reseller without a plan gets `basic`
/// - Admins cannot demote themselves
pub async fn admin_set_account_type(
    db: &DbState,
    session: &SessionStore,
    user_id: String,
    account_type: AccountType,
    reseller_plan: Option<ResellerPlan>,
) -> Result<(), ApiError> {
    let admin = verified_admin(db, session).await?;
    debug!(user_id = %user_id, account_type = %account_type, "admin_set_account_type command");

    if user_id == admin.id && account_type != AccountType::Admin {
        return Err(ApiError::business("You cannot remove your own admin access"));
    }

    let plan = match account_type {
        AccountType::Reseller => Some(reseller_plan.unwrap_or(ResellerPlan::Basic)),
        AccountType::Customer | AccountType::Admin => None,
    };

    db.inner()
        .users()
        .set_account_type(&user_id, account_type, plan)
        .await?;

    audit(
        db,
        &admin,
        "user.set_account_type",
        Some(&user_id),
        json!({ "accountType": account_type, "resellerPlan": plan }),
    )
    .await;

    info!(user_id = %user_id, account_type = %account_type, "Account type changed");
    Ok(())
}

/// Activates or deactivates an account. Admins cannot deactivate themselves.
pub async fn admin_set_user_active(
    db: &DbState,
    session: &SessionStore,
    user_id: String,
    active: bool,
) -> Result<(), ApiError> {
    let admin = verified_admin(db, session).await?;
    debug!(user_id = %user_id, active, "admin_set_user_active command");

    if user_id == admin.id && !active {
        return Err(ApiError::business("You cannot deactivate your own account"));
    }

    db.inner().users().set_active(&user_id, active).await?;
    audit(db, &admin, "user.set_active", Some(&user_id), json!({ "active": active })).await;

    info!(user_id = %user_id, active, "Account activation changed");
    Ok(())
}

/// Deletes an account with its orders and API keys.
pub async fn admin_delete_user(
    db: &DbState,
    session: &SessionStore,
    user_id: String,
) -> Result<(), ApiError> {
    let admin = verified_admin(db, session).await?;
    debug!(user_id = %user_id, "admin_delete_user command");

    if user_id == admin.id {
        return Err(ApiError::business("You cannot delete your own account"));
    }

    db.inner().users().delete(&user_id).await?;
    audit(db, &admin, "user.delete", Some(&user_id), Value::Null).await;

    info!(user_id = %user_id, "Account deleted");
    Ok(())
}

// =============================================================================
// Products
// =============================================================================

/// Product form as submitted by the admin dashboard.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductInput {
    pub title: String,
    pub description: Option<String>,
    pub price_cents: i64,
    pub reseller_price_cents: Option<i64>,
    /// Discount in basis points, 0..=10000.
    pub discount_bps: Option<i64>,
    #[serde(default)]
    pub image_url: String,
    #[serde(default)]
    pub colors: Vec<String>,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub stock: i64,
    #[serde(default)]
    pub is_active: bool,
}

impl ProductInput {
    /// Validates the form, first failing field wins.
    fn validate(self) -> Result<NewProduct, ValidationError> {
        validate_product_title(&self.title)?;
        validate_price_cents("price_cents", self.price_cents)?;
        if let Some(reseller) = self.reseller_price_cents {
            validate_price_cents("reseller_price_cents", reseller)?;
        }
        if let Some(bps) = self.discount_bps {
            let rate = u32::try_from(bps)
                .map(DiscountRate::from_bps)
                .map_err(|_| ValidationError::OutOfRange {
                    field: "discount".to_string(),
                    min: 0,
                    max: 100,
                })?;
            validate_discount(rate)?;
        }
        if !self.image_url.trim().is_empty() {
            validate_url("image_url", &self.image_url)?;
        }
        if self.stock < 0 {
            return Err(ValidationError::MustNotBeNegative {
                field: "stock".to_string(),
            });
        }

        Ok(NewProduct {
            title: self.title.trim().to_string(),
            description: self
                .description
                .map(|d| d.trim().to_string())
                .filter(|d| !d.is_empty()),
            price_cents: self.price_cents,
            reseller_price_cents: self.reseller_price_cents,
            discount_bps: self.discount_bps.filter(|bps| *bps > 0),
            image_url: self.image_url.trim().to_string(),
            colors: self.colors,
            category: self.category.trim().to_string(),
            stock: self.stock,
            is_active: self.is_active,
        })
    }
}

pub async fn admin_create_product(
    db: &DbState,
    session: &SessionStore,
    input: ProductInput,
) -> Result<Product, ApiError> {
    let admin = verified_admin(db, session).await?;
    debug!(title = %input.title, "admin_create_product command");

    let product = db.inner().products().create(&input.validate()?).await?;
    audit(
        db,
        &admin,
        "product.create",
        Some(&product.id),
        json!({ "title": product.title, "priceCents": product.price_cents }),
    )
    .await;

    info!(id = %product.id, title = %product.title, "Product created");
    Ok(product)
}

pub async fn admin_update_product(
    db: &DbState,
    session: &SessionStore,
    product_id: String,
    input: ProductInput,
) -> Result<Product, ApiError> {
    let admin = verified_admin(db, session).await?;
    debug!(id = %product_id, "admin_update_product command");

    let product = db
        .inner()
        .products()
        .update(&product_id, &input.validate()?)
        .await?;
    audit(
        db,
        &admin,
        "product.update",
        Some(&product.id),
        json!({
            "title": product.title,
            "priceCents": product.price_cents,
            "stock": product.stock,
            "isActive": product.is_active,
        }),
    )
    .await;

    info!(id = %product.id, "Product updated");
    Ok(product)
}

/// Deletes a product. Placed orders keep their item snapshots.
pub async fn admin_delete_product(
    db: &DbState,
    session: &SessionStore,
    product_id: String,
) -> Result<(), ApiError> {
    let admin = verified_admin(db, session).await?;
    debug!(id = %product_id, "admin_delete_product command");

    db.inner().products().delete(&product_id).await?;
    audit(db, &admin, "product.delete", Some(&product_id), Value::Null).await;

    info!(id = %product_id, "Product deleted");
    Ok(())
}

// =============================================================================
// Orders
// =============================================================================

pub async fn admin_list_orders(
    db: &DbState,
    session: &SessionStore,
    status: Option<OrderStatus>,
    limit: Option<u32>,
    offset: Option<u32>,
) -> Result<Vec<Order>, ApiError> {
    verified_admin(db, session).await?;
    debug!(?status, "admin_list_orders command");

    Ok(db
        .inner()
        .orders()
        .list(status, page(limit), offset.unwrap_or(0))
        .await?)
}

/// Moves an order to a new status.
///
/// ## Errors
/// - `NOT_FOUND` if the order does not exist
/// - `BUSINESS_LOGIC` if the order is already delivered or cancelled
pub async fn admin_set_order_status(
    db: &DbState,
    session: &SessionStore,
    order_id: String,
    status: OrderStatus,
) -> Result<Order, ApiError> {
    let admin = verified_admin(db, session).await?;
    debug!(id = %order_id, status = %status, "admin_set_order_status command");

    let orders = db.inner().orders();
    let current = orders
        .get_by_id(&order_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Order", &order_id))?;

    if current.status == status {
        return Ok(current);
    }
    if current.status.is_terminal() {
        return Err(ApiError::business(format!(
            "Order is already {} and cannot change",
            current.status
        )));
    }

    orders.set_status(&order_id, status).await?;
    audit(
        db,
        &admin,
        "order.set_status",
        Some(&order_id),
        json!({ "from": current.status, "to": status }),
    )
    .await;

    info!(id = %order_id, from = %current.status, to = %status, "Order status changed");
    orders
        .get_by_id(&order_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Order", &order_id))
}

// =============================================================================
// Advertisements
// =============================================================================

/// Banner form.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdvertisementInput {
    pub title: String,
    pub image_url: String,
    pub link_url: Option<String>,
    #[serde(default)]
    pub position: i64,
    #[serde(default)]
    pub is_active: bool,
}

impl AdvertisementInput {
    fn validate(self) -> Result<NewAdvertisement, ValidationError> {
        validate_required("title", &self.title, 200)?;
        validate_url("image_url", &self.image_url)?;
        let link_url = self
            .link_url
            .map(|l| l.trim().to_string())
            .filter(|l| !l.is_empty());
        if let Some(link) = &link_url {
            validate_url("link_url", link)?;
        }

        Ok(NewAdvertisement {
            title: self.title.trim().to_string(),
            image_url: self.image_url.trim().to_string(),
            link_url,
            position: self.position,
            is_active: self.is_active,
        })
    }
}

/// All banners, active or not.
pub async fn admin_list_ads(
    db: &DbState,
    session: &SessionStore,
) -> Result<Vec<Advertisement>, ApiError> {
    verified_admin(db, session).await?;
    Ok(db.inner().advertisements().list_all().await?)
}

pub async fn admin_create_ad(
    db: &DbState,
    session: &SessionStore,
    input: AdvertisementInput,
) -> Result<Advertisement, ApiError> {
    let admin = verified_admin(db, session).await?;
    debug!(title = %input.title, "admin_create_ad command");

    let ad = db.inner().advertisements().create(&input.validate()?).await?;
    audit(db, &admin, "ad.create", Some(&ad.id), json!({ "title": ad.title })).await;

    info!(id = %ad.id, "Advertisement created");
    Ok(ad)
}

pub async fn admin_update_ad(
    db: &DbState,
    session: &SessionStore,
    ad_id: String,
    input: AdvertisementInput,
) -> Result<Advertisement, ApiError> {
    let admin = verified_admin(db, session).await?;
    debug!(id = %ad_id, "admin_update_ad command");

    let ad = db
        .inner()
        .advertisements()
        .update(&ad_id, &input.validate()?)
        .await?;
    audit(
        db,
        &admin,
        "ad.update",
        Some(&ad.id),
        json!({ "title": ad.title, "isActive": ad.is_active, "position": ad.position }),
    )
    .await;

    Ok(ad)
}

pub async fn admin_delete_ad(
    db: &DbState,
    session: &SessionStore,
    ad_id: String,
) -> Result<(), ApiError> {
    let admin = verified_admin(db, session).await?;
    debug!(id = %ad_id, "admin_delete_ad command");

    db.inner().advertisements().delete(&ad_id).await?;
    audit(db, &admin, "ad.delete", Some(&ad_id), Value::Null).await;
    Ok(())
}

// =============================================================================
// Currency Rates
// =============================================================================

/// Result of a rate update.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RatesUpdate {
    pub rates: ExchangeRateSet,
    /// Relative gap between `usdToSar` and `usdToIqd / sarToIqd`.
    pub triangle_deviation: f64,
    /// Set when the gap exceeds 1%. The update is still applied.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
}

pub async fn admin_get_rates(
    session: &SessionStore,
    rates: &RatesState,
) -> Result<ExchangeRateSet, ApiError> {
    session.require_admin().await?;
    Ok(rates.rates().await)
}

/// Stores new exchange rates and applies them to displayed prices.
///
/// ## Behavior
/// - Every rate must be positive and finite (field-level error otherwise)
/// - The three rates are independent; an inconsistent triangle only warns
pub async fn admin_update_rates(
    db: &DbState,
    session: &SessionStore,
    rates: &RatesState,
    usd_to_iqd: f64,
    sar_to_iqd: f64,
    usd_to_sar: f64,
) -> Result<RatesUpdate, ApiError> {
    let admin = verified_admin(db, session).await?;
    debug!(usd_to_iqd, sar_to_iqd, usd_to_sar, "admin_update_rates command");

    let updated = ExchangeRateSet::new(usd_to_iqd, sar_to_iqd, usd_to_sar)?;
    let deviation = updated.triangle_deviation();
    let warning = (deviation > TRIANGLE_WARN_THRESHOLD).then(|| {
        warn!(deviation, "Exchange rates are inconsistent");
        format!(
            "USD→SAR differs from USD→IQD / SAR→IQD by {:.1}%",
            deviation * 100.0
        )
    });

    db.inner()
        .currency_rates()
        .upsert(&updated, Some(&admin.id))
        .await?;
    rates.set_rates(updated).await;

    audit(
        db,
        &admin,
        "rates.update",
        None,
        json!({ "rates": updated, "triangleDeviation": deviation }),
    )
    .await;

    info!(usd_to_iqd, sar_to_iqd, usd_to_sar, "Exchange rates updated");
    Ok(RatesUpdate {
        rates: updated,
        triangle_deviation: deviation,
        warning,
    })
}

// =============================================================================
// API Keys
// =============================================================================

pub async fn admin_list_api_keys(
    db: &DbState,
    session: &SessionStore,
) -> Result<Vec<ApiKey>, ApiError> {
    verified_admin(db, session).await?;
    Ok(db.inner().api_keys().list_all().await?)
}

pub async fn admin_revoke_api_key(
    db: &DbState,
    session: &SessionStore,
    key_id: String,
) -> Result<(), ApiError> {
    let admin = verified_admin(db, session).await?;
    debug!(id = %key_id, "admin_revoke_api_key command");

    db.inner().api_keys().revoke(&key_id).await?;
    audit(db, &admin, "api_key.revoke", Some(&key_id), Value::Null).await;
    Ok(())
}

// =============================================================================
// Dashboard
// =============================================================================

pub async fn admin_dashboard_stats(
    db: &DbState,
    session: &SessionStore,
) -> Result<DashboardStats, ApiError> {
    verified_admin(db, session).await?;
    debug!("admin_dashboard_stats command");

    Ok(db
        .inner()
        .rpc()
        .get_dashboard_stats()
        .await
        .into_result(GET_DASHBOARD_STATS)?)
}

/// Latest audit log entries, newest first.
pub async fn admin_recent_actions(
    db: &DbState,
    session: &SessionStore,
    limit: Option<u32>,
) -> Result<Vec<AdminAction>, ApiError> {
    verified_admin(db, session).await?;
    Ok(db.inner().admin_actions().list_recent(page(limit)).await?)
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::catalog::get_product;
    use crate::error::ErrorCode;
    use crate::test_support::{add_product, services, sign_in_as, sign_in_mock_user};
    use souq_core::{Cart, CartLineItem, Currency, DeliveryAddress, Money};

    fn lamp_input() -> ProductInput {
        ProductInput {
            title: "  Brass Lamp ".to_string(),
            price_cents: 4_500,
            discount_bps: Some(1_000),
            image_url: "/img/lamp.png".to_string(),
            colors: vec!["gold".to_string()],
            stock: 10,
            is_active: true,
            ..ProductInput::default()
        }
    }

    #[tokio::test]
    async fn test_non_admin_is_forbidden() {
        let app = services().await;

        let err = admin_list_users(&app.db, &app.session, None, None)
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::Unauthenticated);

        sign_in_as(&app, "c@example.com", AccountType::Customer, None).await;
        let err = admin_create_product(&app.db, &app.session, lamp_input())
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::Forbidden);
        assert_eq!(app.db.inner().products().count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_demo_admin_cannot_mutate() {
        let app = services().await;
        sign_in_mock_user(&app, AccountType::Admin).await;

        let err = admin_update_rates(&app.db, &app.session, &app.rates, 10.0, 5.0, 2.0)
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::Forbidden);
        assert!(app.db.inner().currency_rates().get().await.unwrap().is_none());
        assert_eq!(app.rates.rates().await, ExchangeRateSet::default());
    }

    #[tokio::test]
    async fn test_admin_rights_rechecked_against_database() {
        let app = services().await;
        let admin = sign_in_as(&app, "admin@example.com", AccountType::Admin, None).await;
        assert!(admin_list_users(&app.db, &app.session, None, None).await.is_ok());

        app.db
            .inner()
            .users()
            .set_account_type(&admin.id, AccountType::Customer, None)
            .await
            .unwrap();
        let err = admin_list_users(&app.db, &app.session, None, None)
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::Forbidden);

        let other = sign_in_as(&app, "root@example.com", AccountType::Admin, None).await;
        app.db.inner().users().set_active(&other.id, false).await.unwrap();
        let err = admin_create_product(&app.db, &app.session, lamp_input())
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::Forbidden);
        assert_eq!(app.db.inner().products().count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_product_crud_is_audited() {
        let app = services().await;
        sign_in_as(&app, "admin@example.com", AccountType::Admin, None).await;

        let product = admin_create_product(&app.db, &app.session, lamp_input())
            .await
            .unwrap();
        assert_eq!(product.title, "Brass Lamp");

        let mut input = lamp_input();
        input.price_cents = 5_000;
        input.is_active = false;
        let updated = admin_update_product(&app.db, &app.session, product.id.clone(), input)
            .await
            .unwrap();
        assert_eq!(updated.price_cents, 5_000);

        // admins still see inactive products
        assert!(get_product(&app.db, &app.rates, &app.session, product.id.clone())
            .await
            .is_ok());

        admin_delete_product(&app.db, &app.session, product.id.clone())
            .await
            .unwrap();

        let actions = admin_recent_actions(&app.db, &app.session, None).await.unwrap();
        let names: Vec<&str> = actions.iter().map(|a| a.action.as_str()).collect();
        assert_eq!(names.len(), 3);
        assert!(names.contains(&"product.create"));
        assert!(names.contains(&"product.update"));
        assert!(names.contains(&"product.delete"));
    }

    #[tokio::test]
    async fn test_product_validation_reports_field() {
        let app = services().await;
        sign_in_as(&app, "admin@example.com", AccountType::Admin, None).await;

        let mut negative = lamp_input();
        negative.price_cents = -1;
        let err = admin_create_product(&app.db, &app.session, negative)
            .await
            .unwrap_err();
        assert_eq!(err.field.as_deref(), Some("price_cents"));

        let mut huge = lamp_input();
        huge.price_cents = i64::MAX / 2;
        let err = admin_create_product(&app.db, &app.session, huge)
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::ValidationError);
        assert_eq!(err.field.as_deref(), Some("price_cents"));

        let mut huge_wholesale = lamp_input();
        huge_wholesale.reseller_price_cents = Some(souq_core::MAX_PRICE_CENTS + 1);
        let err = admin_create_product(&app.db, &app.session, huge_wholesale)
            .await
            .unwrap_err();
        assert_eq!(err.field.as_deref(), Some("reseller_price_cents"));
        assert_eq!(app.db.inner().products().count().await.unwrap(), 0);

        let mut discount = lamp_input();
        discount.discount_bps = Some(12_000);
        let err = admin_create_product(&app.db, &app.session, discount)
            .await
            .unwrap_err();
        assert_eq!(err.field.as_deref(), Some("discount"));

        let mut image = lamp_input();
        image.image_url = "ftp://example.com/lamp.png".to_string();
        let err = admin_create_product(&app.db, &app.session, image)
            .await
            .unwrap_err();
        assert_eq!(err.field.as_deref(), Some("image_url"));
    }

    #[tokio::test]
    async fn test_user_management() {
        let app = services().await;
        let customer = sign_in_as(&app, "c@example.com", AccountType::Customer, None).await;
        let admin = sign_in_as(&app, "admin@example.com", AccountType::Admin, None).await;

        admin_set_account_type(
            &app.db,
            &app.session,
            customer.id.clone(),
            AccountType::Reseller,
            None,
        )
        .await
        .unwrap();
        let promoted = app
            .db
            .inner()
            .users()
            .get_by_id(&customer.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(promoted.reseller_plan, Some(ResellerPlan::Basic));

        admin_set_user_active(&app.db, &app.session, customer.id.clone(), false)
            .await
            .unwrap();
        let users = admin_list_users(&app.db, &app.session, None, None).await.unwrap();
        assert!(users.iter().any(|u| u.id == customer.id && !u.is_active));

        let err = admin_delete_user(&app.db, &app.session, admin.id.clone())
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::BusinessLogic);
        let err = admin_set_account_type(
            &app.db,
            &app.session,
            admin.id.clone(),
            AccountType::Customer,
            None,
        )
        .await
        .unwrap_err();
        assert_eq!(err.code, ErrorCode::BusinessLogic);

        admin_delete_user(&app.db, &app.session, customer.id.clone())
            .await
            .unwrap();
        let err = admin_delete_user(&app.db, &app.session, customer.id)
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::NotFound);
    }

    #[tokio::test]
    async fn test_order_status_transitions() {
        let app = services().await;
        let customer = sign_in_as(&app, "c@example.com", AccountType::Customer, None).await;
        let lamp = add_product(&app, "Lamp", 1_000, true).await;

        let mut cart = Cart::default();
        cart.add_item(CartLineItem::new(lamp.id, "Lamp", Money::from_cents(1_000), 1))
            .unwrap();
        let address = DeliveryAddress {
            full_name: "Zainab Hassan".to_string(),
            street: "14 Karrada St".to_string(),
            city: "Baghdad".to_string(),
            state: "Baghdad".to_string(),
            postal_code: "10001".to_string(),
            country: "Iraq".to_string(),
            phone: "+9647701234567".to_string(),
        };
        cart.set_delivery_address(address.clone());
        let order = app
            .db
            .inner()
            .orders()
            .create(&customer.id, &cart, &address, Currency::Usd)
            .await
            .unwrap();

        sign_in_as(&app, "admin@example.com", AccountType::Admin, None).await;
        let shipped = admin_set_order_status(
            &app.db,
            &app.session,
            order.id.clone(),
            OrderStatus::Shipped,
        )
        .await
        .unwrap();
        assert_eq!(shipped.status, OrderStatus::Shipped);

        admin_set_order_status(&app.db, &app.session, order.id.clone(), OrderStatus::Delivered)
            .await
            .unwrap();
        let err = admin_set_order_status(
            &app.db,
            &app.session,
            order.id.clone(),
            OrderStatus::Cancelled,
        )
        .await
        .unwrap_err();
        assert_eq!(err.code, ErrorCode::BusinessLogic);

        let delivered = admin_list_orders(
            &app.db,
            &app.session,
            Some(OrderStatus::Delivered),
            None,
            None,
        )
        .await
        .unwrap();
        assert_eq!(delivered.len(), 1);

        let stats = admin_dashboard_stats(&app.db, &app.session).await.unwrap();
        assert_eq!(stats.total_orders, 1);
        assert_eq!(stats.pending_orders, 0);
    }

    #[tokio::test]
    async fn test_rate_update_applies_and_warns() {
        let app = services().await;
        sign_in_as(&app, "admin@example.com", AccountType::Admin, None).await;

        let err = admin_update_rates(&app.db, &app.session, &app.rates, 1310.0, 0.0, 3.75)
            .await
            .unwrap_err();
        assert_eq!(err.field.as_deref(), Some("sar_to_iqd"));
        assert_eq!(app.rates.rates().await, ExchangeRateSet::default());

        let consistent = admin_update_rates(&app.db, &app.session, &app.rates, 1500.0, 400.0, 3.75)
            .await
            .unwrap();
        assert!(consistent.warning.is_none());
        assert_eq!(app.rates.rates().await.usd_to_iqd, 1500.0);
        assert_eq!(
            app.db.inner().currency_rates().get().await.unwrap(),
            Some(consistent.rates)
        );

        let skewed = admin_update_rates(&app.db, &app.session, &app.rates, 1320.0, 352.0, 4.125)
            .await
            .unwrap();
        assert!(skewed.warning.is_some());
        assert_eq!(
            admin_get_rates(&app.session, &app.rates).await.unwrap().usd_to_sar,
            4.125
        );
    }

    #[tokio::test]
    async fn test_ads_crud() {
        let app = services().await;
        sign_in_as(&app, "admin@example.com", AccountType::Admin, None).await;

        let input = AdvertisementInput {
            title: "Eid sale".to_string(),
            image_url: "https://cdn.example.com/eid.png".to_string(),
            link_url: Some("  ".to_string()),
            position: 0,
            is_active: false,
        };
        let ad = admin_create_ad(&app.db, &app.session, input.clone()).await.unwrap();
        assert!(ad.link_url.is_none());

        let updated = admin_update_ad(
            &app.db,
            &app.session,
            ad.id.clone(),
            AdvertisementInput {
                is_active: true,
                ..input
            },
        )
        .await
        .unwrap();
        assert!(updated.is_active);
        assert_eq!(admin_list_ads(&app.db, &app.session).await.unwrap().len(), 1);

        admin_delete_ad(&app.db, &app.session, ad.id).await.unwrap();
        assert!(admin_list_ads(&app.db, &app.session).await.unwrap().is_empty());
    }
}
