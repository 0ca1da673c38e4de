//! # API Error Type
//!
//! Unified error type for storefront commands. This is the notification the
//! dashboards show: a toast for most codes, an inline message next to the
//! form field when `field` is set.
//!
//! ```text
//!   ValidationError (field) ─┐
//!   CoreError (cart, flow) ──┼──► ApiError { code, message, field } ──► toast
//!   AuthError ───────────────┤
//!   DbError (logged) ────────┘
//! ```
//!
//! No command retries on failure; the user retries.

use serde::Serialize;
use souq_core::{CoreError, ValidationError};
use souq_db::DbError;

use crate::auth::AuthError;

/// Error returned from storefront commands.
///
/// ## Serialization
/// ```json
/// {
///   "code": "VALIDATION_ERROR",
///   "message": "phone has invalid format: must contain 7 to 15 digits",
///   "field": "phone"
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiError {
    pub code: ErrorCode,

    /// Shown to the user as is.
    pub message: String,

    /// Offending form field, for inline display
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
}

/// Stable codes the dashboards switch on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// Resource not found
    NotFound,

    /// Input validation failed
    ValidationError,

    /// Value already exists (email, key prefix)
    Conflict,

    /// Database operation failed
    DatabaseError,

    /// Business rule rejected the request
    BusinessLogic,

    /// Cart operation failed
    CartError,

    /// Insufficient stock
    InsufficientStock,

    /// Checkout transition not allowed from the current stage
    CheckoutError,

    /// Order could not be placed
    OrderFailed,

    /// No (valid) session
    Unauthenticated,

    /// Signed in but not allowed
    Forbidden,

    /// Internal server error
    Internal,
}

impl ApiError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        ApiError {
            code,
            message: message.into(),
            field: None,
        }
    }

    /// Attaches the offending field.
    pub fn with_field(mut self, field: impl Into<String>) -> Self {
        self.field = Some(field.into());
        self
    }

    pub fn not_found(resource: &str, id: &str) -> Self {
        ApiError::new(ErrorCode::NotFound, format!("{} not found: {}", resource, id))
    }

    pub fn validation(message: impl Into<String>) -> Self {
        ApiError::new(ErrorCode::ValidationError, message)
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        ApiError::new(ErrorCode::Forbidden, message)
    }

    pub fn business(message: impl Into<String>) -> Self {
        ApiError::new(ErrorCode::BusinessLogic, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        ApiError::new(ErrorCode::Internal, message)
    }

    /// The generic toast shown when placing an order fails.
    pub fn order_failed() -> Self {
        ApiError::new(
            ErrorCode::OrderFailed,
            "We could not place your order. Your cart was kept, please try again.",
        )
    }
}

/// Store failures. Constraint problems surface as validation or conflict;
/// everything else becomes one generic `DATABASE_ERROR` toast and the detail
/// goes to the log.
impl From<DbError> for ApiError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::NotFound { entity, id } => ApiError::not_found(&entity, &id),
            DbError::UniqueViolation { field, .. } => {
                let label = field.rsplit('.').next().unwrap_or(&field).to_string();
                ApiError::new(ErrorCode::Conflict, format!("That {label} is already taken"))
                    .with_field(label)
            }
            DbError::ForeignKeyViolation { message } | DbError::ConstraintViolation { message } => {
                tracing::warn!(%message, "Row rejected by a constraint");
                ApiError::validation("The referenced record is missing or a value is out of range")
            }
            DbError::ConnectionFailed(_) | DbError::PoolExhausted => ApiError::new(
                ErrorCode::DatabaseError,
                "The store is unavailable, please try again",
            ),
            other => {
                tracing::error!(error = %other, "Store operation failed");
                ApiError::new(ErrorCode::DatabaseError, "Could not complete the operation")
            }
        }
    }
}

/// Converts field validation errors, keeping the field name.
impl From<ValidationError> for ApiError {
    fn from(err: ValidationError) -> Self {
        let field = err.field().to_string();
        ApiError::validation(err.to_string()).with_field(field)
    }
}

/// Cart and checkout rule failures.
impl From<CoreError> for ApiError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::ItemNotInCart(id) => ApiError::not_found("Cart item", &id),
            e @ CoreError::CartTooLarge { .. } => ApiError::new(ErrorCode::CartError, e.to_string()),
            e @ CoreError::QuantityTooLarge { .. } => {
                ApiError::validation(e.to_string()).with_field("quantity")
            }
            CoreError::ProductUnavailable(id) => {
                ApiError::business(format!("Product {} is not available right now", id))
            }
            CoreError::InsufficientStock { title, available, .. } => ApiError::new(
                ErrorCode::InsufficientStock,
                format!("Only {available} of {title} left in stock"),
            ),
            CoreError::EmptyCart => ApiError::new(ErrorCode::CartError, "Your cart is empty"),
            CoreError::NotAuthenticated => {
                ApiError::new(ErrorCode::Unauthenticated, "Sign in to continue to checkout")
            }
            e @ CoreError::InvalidCheckoutStage { .. } => {
                ApiError::new(ErrorCode::CheckoutError, e.to_string())
            }
            CoreError::Validation(e) => ApiError::from(e),
        }
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::InvalidCredentials
            | AuthError::NotSignedIn
            | AuthError::TokenExpired
            | AuthError::InvalidApiKey => ApiError::new(ErrorCode::Unauthenticated, err.to_string()),
            AuthError::TokenInvalid(reason) => {
                tracing::warn!("Rejected access token: {}", reason);
                ApiError::new(ErrorCode::Unauthenticated, "Session is no longer valid")
            }
            AuthError::AccountDisabled | AuthError::Forbidden(_) | AuthError::MockDisabled => {
                ApiError::forbidden(err.to_string())
            }
            AuthError::Hashing(e) => {
                tracing::error!("Credential hashing failed: {}", e);
                ApiError::internal("Could not process credentials")
            }
        }
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{:?}] {}", self.code, self.message)
    }
}

impl std::error::Error for ApiError {}
