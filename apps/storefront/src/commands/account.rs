//! # Account Commands
//!
//! Order history for customers and resellers, and API keys for the catalog
//! feed.
//!
//! ## API Keys
//! ```text
//!   sk_1a2b3c4d.9f8e7d6c5b4a...      shown once, at creation
//!   └────┬────┘ └──────┬──────┘
//!     prefix         secret
//!   (stored, for   (only its argon2 hash is stored)
//!    lookup)
//! ```
//! Creating keys needs `ApiAccess`: admins, and resellers on the premium plan.

use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, info, warn};

use crate::auth::{generate_api_key, hash_secret, split_api_key, verify_secret, AuthError};
use crate::commands::admin::{audit, verified_admin};
use crate::error::ApiError;
use crate::state::{DbState, SessionStore};
use souq_core::validation::validate_required;
use souq_core::{ApiKey, Order, OrderItem, ResellerFeature, UserProfile};

/// An order with its line items.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderDetails {
    pub order: Order,
    pub items: Vec<OrderItem>,
}

/// Response to key creation. `secret` is never returned again.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatedApiKey {
    pub key: ApiKey,
    pub secret: String,
}

/// Orders of the signed-in user, newest first.
pub async fn my_orders(db: &DbState, session: &SessionStore) -> Result<Vec<Order>, ApiError> {
    let user = session.require_user().await?;
    debug!(user_id = %user.id, "my_orders command");

    Ok(db.inner().orders().list_for_user(&user.id).await?)
}

/// One order with its items. Only the owner or an admin may see it.
pub async fn get_my_order(
    db: &DbState,
    session: &SessionStore,
    order_id: String,
) -> Result<OrderDetails, ApiError> {
    let user = session.require_user().await?;
    debug!(user_id = %user.id, order_id = %order_id, "get_my_order command");

    let order = db
        .inner()
        .orders()
        .get_by_id(&order_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Order", &order_id))?;
    if order.user_id != user.id && !still_admin(db, session).await {
        return Err(ApiError::not_found("Order", &order_id));
    }

    let items = db.inner().orders().items(&order.id).await?;
    Ok(OrderDetails { order, items })
}

/// Creates an API key for the signed-in user.
///
/// ## Errors
/// - `FORBIDDEN` for demo sessions and accounts without `ApiAccess`
/// - `VALIDATION_ERROR` (field `label`) for an empty label
pub async fn create_api_key(
    db: &DbState,
    session: &SessionStore,
    label: String,
) -> Result<CreatedApiKey, ApiError> {
    let current = session.current().await.ok_or(AuthError::NotSignedIn)?;
    let user = current.user;
    debug!(user_id = %user.id, "create_api_key command");

    if current.is_mock {
        return Err(ApiError::forbidden("Demo sessions cannot create API keys"));
    }
    if !user.can(ResellerFeature::ApiAccess) {
        return Err(ApiError::forbidden(
            "API access requires the premium reseller plan",
        ));
    }
    validate_required("label", &label, 80)?;

    let generated = generate_api_key();
    let key_hash = hash_secret(&generated.secret)?;
    let key = db
        .inner()
        .api_keys()
        .create(&user.id, &label, &generated.prefix, &key_hash)
        .await?;

    info!(key_id = %key.id, prefix = %key.key_prefix, user_id = %user.id, "API key created");
    Ok(CreatedApiKey {
        key,
        secret: generated.secret,
    })
}

pub async fn list_my_api_keys(
    db: &DbState,
    session: &SessionStore,
) -> Result<Vec<ApiKey>, ApiError> {
    let user = session.require_user().await?;
    Ok(db.inner().api_keys().list_for_owner(&user.id).await?)
}

/// Revokes one of the user's keys. Admins may revoke any key; revoking
/// someone else's key goes to the admin audit log.
pub async fn revoke_api_key(
    db: &DbState,
    session: &SessionStore,
    key_id: String,
) -> Result<(), ApiError> {
    let user = session.require_user().await?;
    debug!(user_id = %user.id, key_id = %key_id, "revoke_api_key command");

    let key = db
        .inner()
        .api_keys()
        .get_by_id(&key_id)
        .await?
        .ok_or_else(|| ApiError::not_found("ApiKey", &key_id))?;

    let acting_admin = if key.owner_id == user.id {
        None
    } else {
        let admin = verified_admin(db, session)
            .await
            .map_err(|_| ApiError::not_found("ApiKey", &key_id))?;
        Some(admin)
    };

    db.inner().api_keys().revoke(&key_id).await?;
    if let Some(admin) = &acting_admin {
        audit(
            db,
            admin,
            "api_key.revoke",
            Some(&key_id),
            json!({ "owner_id": key.owner_id }),
        )
        .await;
    }

    info!(key_id = %key_id, "API key revoked");
    Ok(())
}

/// True if the signed-in user is an admin according to the database.
async fn still_admin(db: &DbState, session: &SessionStore) -> bool {
    verified_admin(db, session).await.is_ok()
}

/// Resolves a presented key to its owner.
///
/// ## Behavior
/// - Malformed, unknown, revoked and wrong keys all fail the same way
/// - The owner must still be active and still have `ApiAccess`
///   (a downgraded reseller's keys stop working)
/// - A successful use updates `last_used_at`
pub async fn authenticate_api_key(db: &DbState, presented: &str) -> Result<UserProfile, ApiError> {
    let prefix = split_api_key(presented).ok_or(AuthError::InvalidApiKey)?;
    debug!(prefix = %prefix, "authenticate_api_key");

    let stored = db
        .inner()
        .api_keys()
        .find_active_by_prefix(prefix)
        .await?
        .ok_or(AuthError::InvalidApiKey)?;

    if !verify_secret(presented.trim(), &stored.key_hash) {
        warn!(prefix = %prefix, "API key secret mismatch");
        return Err(AuthError::InvalidApiKey.into());
    }

    let owner = db
        .inner()
        .users()
        .get_by_id(&stored.key.owner_id)
        .await?
        .filter(|u| u.is_active && u.can(ResellerFeature::ApiAccess))
        .ok_or(AuthError::InvalidApiKey)?;

    if let Err(e) = db.inner().api_keys().touch(&stored.key.id).await {
        warn!(key_id = %stored.key.id, error = %e, "Could not record API key use");
    }

    Ok(owner)
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::cart::add_to_cart;
    use crate::commands::checkout::{place_order, proceed_to_delivery, submit_delivery};
    use crate::error::ErrorCode;
    use crate::test_support::{add_product, address, services, sign_in_as, sign_in_mock_user};
    use souq_core::{AccountType, ResellerPlan};

    #[tokio::test]
    async fn test_orders_are_private() {
        let app = services().await;
        sign_in_as(&app, "owner@example.com", AccountType::Customer, None).await;
        let lamp = add_product(&app, "Lamp", 1_000, true).await;
        add_to_cart(&app.db, &app.cart, &app.rates, &app.session, lamp.id, None, None)
            .await
            .unwrap();
        proceed_to_delivery(&app.cart, &app.rates, &app.session).await.unwrap();
        submit_delivery(&app.cart, &app.rates, address()).await.unwrap();
        let receipt = place_order(&app.db, &app.cart, &app.rates, &app.session, &app.config)
            .await
            .unwrap();

        let mine = my_orders(&app.db, &app.session).await.unwrap();
        assert_eq!(mine.len(), 1);
        let details = get_my_order(&app.db, &app.session, receipt.order.id.clone())
            .await
            .unwrap();
        assert_eq!(details.items.len(), 1);

        sign_in_as(&app, "other@example.com", AccountType::Customer, None).await;
        assert!(my_orders(&app.db, &app.session).await.unwrap().is_empty());
        let err = get_my_order(&app.db, &app.session, receipt.order.id.clone())
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::NotFound);

        sign_in_as(&app, "admin@example.com", AccountType::Admin, None).await;
        assert!(get_my_order(&app.db, &app.session, receipt.order.id).await.is_ok());
    }

    #[tokio::test]
    async fn test_api_keys_need_premium_plan() {
        let app = services().await;
        sign_in_as(&app, "c@example.com", AccountType::Customer, None).await;
        let err = create_api_key(&app.db, &app.session, "feed".to_string())
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::Forbidden);

        sign_in_as(&app, "s@example.com", AccountType::Reseller, Some(ResellerPlan::Standard)).await;
        assert!(create_api_key(&app.db, &app.session, "feed".to_string())
            .await
            .is_err());

        sign_in_as(&app, "p@example.com", AccountType::Reseller, Some(ResellerPlan::Premium)).await;
        let err = create_api_key(&app.db, &app.session, "  ".to_string())
            .await
            .unwrap_err();
        assert_eq!(err.field.as_deref(), Some("label"));
        assert!(create_api_key(&app.db, &app.session, "feed".to_string())
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn test_mock_session_cannot_create_keys() {
        let app = services().await;
        sign_in_mock_user(&app, AccountType::Admin).await;

        let err = create_api_key(&app.db, &app.session, "feed".to_string())
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::Forbidden);
    }

    #[tokio::test]
    async fn test_key_lifecycle() {
        let app = services().await;
        let reseller = sign_in_as(
            &app,
            "p@example.com",
            AccountType::Reseller,
            Some(ResellerPlan::Premium),
        )
        .await;

        let created = create_api_key(&app.db, &app.session, "feed".to_string())
            .await
            .unwrap();
        assert!(created.secret.starts_with(&created.key.key_prefix));

        let owner = authenticate_api_key(&app.db, &created.secret).await.unwrap();
        assert_eq!(owner.id, reseller.id);

        let listed = list_my_api_keys(&app.db, &app.session).await.unwrap();
        assert_eq!(listed.len(), 1);
        assert!(listed[0].last_used_at.is_some());

        let tampered = format!("{}.{}", created.key.key_prefix, "0".repeat(32));
        let err = authenticate_api_key(&app.db, &tampered).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::Unauthenticated);
        assert!(authenticate_api_key(&app.db, "not-a-key").await.is_err());

        revoke_api_key(&app.db, &app.session, created.key.id.clone())
            .await
            .unwrap();
        assert!(authenticate_api_key(&app.db, &created.secret).await.is_err());
    }

    #[tokio::test]
    async fn test_keys_stop_working_after_downgrade() {
        let app = services().await;
        let reseller = sign_in_as(
            &app,
            "p@example.com",
            AccountType::Reseller,
            Some(ResellerPlan::Premium),
        )
        .await;
        let created = create_api_key(&app.db, &app.session, "feed".to_string())
            .await
            .unwrap();

        app.db
            .inner()
            .users()
            .set_account_type(&reseller.id, AccountType::Reseller, Some(ResellerPlan::Basic))
            .await
            .unwrap();

        assert!(authenticate_api_key(&app.db, &created.secret).await.is_err());
    }

    #[tokio::test]
    async fn test_cannot_revoke_someone_elses_key() {
        let app = services().await;
        sign_in_as(&app, "p@example.com", AccountType::Reseller, Some(ResellerPlan::Premium)).await;
        let created = create_api_key(&app.db, &app.session, "feed".to_string())
            .await
            .unwrap();

        sign_in_as(&app, "q@example.com", AccountType::Reseller, Some(ResellerPlan::Premium)).await;
        let err = revoke_api_key(&app.db, &app.session, created.key.id.clone())
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::NotFound);
        assert!(authenticate_api_key(&app.db, &created.secret).await.is_ok());
    }

    #[tokio::test]
    async fn test_admin_revoking_another_users_key_is_audited() {
        let app = services().await;
        let reseller = sign_in_as(
            &app,
            "p@example.com",
            AccountType::Reseller,
            Some(ResellerPlan::Premium),
        )
        .await;
        let created = create_api_key(&app.db, &app.session, "feed".to_string())
            .await
            .unwrap();
        let second = create_api_key(&app.db, &app.session, "feed-2".to_string())
            .await
            .unwrap();
        revoke_api_key(&app.db, &app.session, created.key.id.clone())
            .await
            .unwrap();
        assert!(app.db.inner().admin_actions().list_recent(10).await.unwrap().is_empty());

        let admin = sign_in_as(&app, "admin@example.com", AccountType::Admin, None).await;
        revoke_api_key(&app.db, &app.session, second.key.id.clone())
            .await
            .unwrap();
        assert!(authenticate_api_key(&app.db, &second.secret).await.is_err());

        let actions = app.db.inner().admin_actions().list_recent(10).await.unwrap();
        assert_eq!(actions.len(), 1);
        assert_eq!(actions[0].admin_id, admin.id);
        assert_eq!(actions[0].action, "api_key.revoke");
        assert_eq!(actions[0].target.as_deref(), Some(second.key.id.as_str()));
        assert!(actions[0].details.contains(&reseller.id));
    }

    #[tokio::test]
    async fn test_demoted_admin_cannot_revoke_others_keys() {
        let app = services().await;
        sign_in_as(&app, "p@example.com", AccountType::Reseller, Some(ResellerPlan::Premium)).await;
        let created = create_api_key(&app.db, &app.session, "feed".to_string())
            .await
            .unwrap();

        let admin = sign_in_as(&app, "admin@example.com", AccountType::Admin, None).await;
        app.db
            .inner()
            .users()
            .set_account_type(&admin.id, AccountType::Customer, None)
            .await
            .unwrap();

        let err = revoke_api_key(&app.db, &app.session, created.key.id.clone())
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::NotFound);
        assert!(authenticate_api_key(&app.db, &created.secret).await.is_ok());
    }
}
