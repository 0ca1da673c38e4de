//! # Remote Procedures
//!
//! Named procedures exposed by the data service. Unlike repositories, which
//! return `DbResult`, every procedure answers with a [`ServiceResponse`]
//! envelope: `{ "success": true, "data": ... }` or
//! `{ "success": false, "error": "..." }`.
//!
//! ## Procedures
//! ```text
//! ┌──────────────────────────┬──────────────────────────┬─────────────────────┐
//! │ name                     │ params                   │ data                │
//! ├──────────────────────────┼──────────────────────────┼─────────────────────┤
//! │ get_dashboard_stats      │ (none)                   │ DashboardStats      │
//! │ log_admin_action         │ LogAdminActionParams     │ AdminAction         │
//! │ fetch_products           │ ProductFilter            │ Vec<Product>        │
//! └──────────────────────────┴──────────────────────────┴─────────────────────┘
//! ```

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use crate::error::{DbError, DbResult};
use crate::pool::Database;
use souq_core::{AdminAction, DashboardStats, Product, ProductFilter};

pub const GET_DASHBOARD_STATS: &str = "get_dashboard_stats";
pub const LOG_ADMIN_ACTION: &str = "log_admin_action";
pub const FETCH_PRODUCTS: &str = "fetch_products";

// =============================================================================
// Envelope
// =============================================================================

/// Result envelope of a remote procedure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T> ServiceResponse<T> {
    pub fn ok(data: T) -> Self {
        ServiceResponse {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        ServiceResponse {
            success: false,
            data: None,
            error: Some(message.into()),
        }
    }

    fn from_result(procedure: &str, result: DbResult<T>) -> Self {
        match result {
            Ok(data) => ServiceResponse::ok(data),
            Err(e) => {
                warn!(procedure, error = %e, "Procedure failed");
                ServiceResponse::failure(e.to_string())
            }
        }
    }

    /// Unwraps the envelope into a `DbResult`.
    pub fn into_result(self, procedure: &str) -> DbResult<T> {
        match (self.success, self.data) {
            (true, Some(data)) => Ok(data),
            (_, _) => Err(DbError::Procedure {
                procedure: procedure.to_string(),
                message: self
                    .error
                    .unwrap_or_else(|| "no data returned".to_string()),
            }),
        }
    }
}

/// Parameters of `log_admin_action`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogAdminActionParams {
    pub admin_id: String,
    pub action: String,
    #[serde(default)]
    pub target: Option<String>,
    #[serde(default)]
    pub details: Value,
}

// =============================================================================
// Procedures
// =============================================================================

/// Handle for calling the named procedures.
#[derive(Debug, Clone)]
pub struct Procedures {
    db: Database,
}

impl Procedures {
    pub fn new(db: Database) -> Self {
        Procedures { db }
    }

    /// Counters for the admin dashboard.
    pub async fn get_dashboard_stats(&self) -> ServiceResponse<DashboardStats> {
        debug!("rpc get_dashboard_stats");

        let result = sqlx::query_as::<_, DashboardStats>(
            r#"
            SELECT
                (SELECT COUNT(*) FROM users) AS total_users,
                (SELECT COUNT(*) FROM users WHERE account_type = 'customer') AS total_customers,
                (SELECT COUNT(*) FROM users WHERE account_type = 'reseller') AS total_resellers,
                (SELECT COUNT(*) FROM products WHERE is_active = 1) AS total_products,
                (SELECT COUNT(*) FROM orders) AS total_orders,
                (SELECT COUNT(*) FROM orders WHERE status = 'pending') AS pending_orders,
                (SELECT COALESCE(SUM(total_cents), 0) FROM orders WHERE status != 'cancelled')
                    AS revenue_cents
            "#,
        )
        .fetch_one(self.db.pool())
        .await
        .map_err(DbError::from);

        ServiceResponse::from_result(GET_DASHBOARD_STATS, result)
    }

    /// Appends to the admin audit log.
    pub async fn log_admin_action(
        &self,
        admin_id: &str,
        action: &str,
        target: Option<&str>,
        details: &Value,
    ) -> ServiceResponse<AdminAction> {
        debug!(action, "rpc log_admin_action");

        let result = self
            .db
            .admin_actions()
            .insert(admin_id, action, target, details)
            .await;

        ServiceResponse::from_result(LOG_ADMIN_ACTION, result)
    }

    /// Catalog listing with filters.
    pub async fn fetch_products(&self, filter: &ProductFilter) -> ServiceResponse<Vec<Product>> {
        debug!("rpc fetch_products");

        let result = self.db.products().filter(filter).await;
        ServiceResponse::from_result(FETCH_PRODUCTS, result)
    }

    /// Dispatches a procedure by name with JSON params.
    pub async fn call(&self, procedure: &str, params: Value) -> ServiceResponse<Value> {
        match procedure {
            GET_DASHBOARD_STATS => to_value(self.get_dashboard_stats().await),
            LOG_ADMIN_ACTION => match serde_json::from_value::<LogAdminActionParams>(params) {
                Ok(p) => to_value(
                    self.log_admin_action(&p.admin_id, &p.action, p.target.as_deref(), &p.details)
                        .await,
                ),
                Err(e) => ServiceResponse::failure(format!("invalid params: {e}")),
            },
            FETCH_PRODUCTS => {
                let filter = if params.is_null() {
                    Ok(ProductFilter::default())
                } else {
                    serde_json::from_value::<ProductFilter>(params)
                };
                match filter {
                    Ok(filter) => to_value(self.fetch_products(&filter).await),
                    Err(e) => ServiceResponse::failure(format!("invalid params: {e}")),
                }
            }
            other => {
                warn!(procedure = other, "Unknown procedure");
                ServiceResponse::failure(format!("unknown procedure: {other}"))
            }
        }
    }
}

fn to_value<T: Serialize>(response: ServiceResponse<T>) -> ServiceResponse<Value> {
    match response.data {
        Some(data) => match serde_json::to_value(data) {
            Ok(value) => ServiceResponse::ok(value),
            Err(e) => ServiceResponse::failure(e.to_string()),
        },
        None => ServiceResponse {
            success: response.success,
            data: None,
            error: response.error,
        },
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
