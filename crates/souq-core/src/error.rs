//! # Domain Errors
//!
//! `CoreError` covers cart and checkout rules; `ValidationError` covers a
//! single form field and always knows which one. Neither touches storage, so
//! the storefront maps both into its `ApiError` without logging.

use thiserror::Error;

use crate::checkout::CheckoutStage;

// =============================================================================
// Core Error
// =============================================================================

/// A cart or checkout rule was broken.
#[derive(Debug, Error)]
pub enum CoreError {
    /// No cart line carries the given product id.
    #[error("Item not in cart: {0}")]
    ItemNotInCart(String),

    /// Cart has reached the maximum number of distinct lines.
    #[error("Cart cannot have more than {max} items")]
    CartTooLarge { max: usize },

    /// A line quantity would exceed the allowed maximum.
    #[error("Quantity {requested} exceeds maximum allowed ({max})")]
    QuantityTooLarge { requested: i64, max: i64 },

    /// Product is inactive or hidden from the catalog.
    #[error("Product is not available: {0}")]
    ProductUnavailable(String),

    /// Not enough units in stock for the requested quantity.
    #[error("Insufficient stock for {title}: available {available}, requested {requested}")]
    InsufficientStock {
        title: String,
        available: i64,
        requested: i64,
    },

    /// Checkout cannot start from an empty cart.
    #[error("Cart is empty")]
    EmptyCart,

    /// Checkout requires a signed-in user.
    #[error("Sign in to continue to checkout")]
    NotAuthenticated,

    /// The requested checkout transition is not allowed from the current stage.
    ///
    /// ## When This Occurs
    /// - Submitting an address while still on the cart stage
    /// - Placing an order before an address was submitted
    #[error("Checkout is at the {current} stage, expected {expected}")]
    InvalidCheckoutStage {
        current: CheckoutStage,
        expected: CheckoutStage,
    },

    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

// =============================================================================
// Validation Error
// =============================================================================

/// One bad form field. The dashboards render the message next to `field`.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// Missing or blank.
    #[error("{field} is required")]
    Required { field: String },

    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    #[error("{field} must be positive")]
    MustBePositive { field: String },

    #[error("{field} must not be negative")]
    MustNotBeNegative { field: String },

    /// Email, phone, URL or color that does not parse.
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },

    #[error("{field} must be one of: {allowed:?}")]
    NotAllowed { field: String, allowed: Vec<String> },
}

impl ValidationError {
    pub fn field(&self) -> &str {
        match self {
            ValidationError::Required { field }
            | ValidationError::TooLong { field, .. }
            | ValidationError::OutOfRange { field, .. }
            | ValidationError::MustBePositive { field }
            | ValidationError::MustNotBeNegative { field }
            | ValidationError::InvalidFormat { field, .. }
            | ValidationError::NotAllowed { field, .. } => field,
        }
    }
}

pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = CoreError::QuantityTooLarge {
            requested: 1200,
            max: 999,
        };
        assert_eq!(err.to_string(), "Quantity 1200 exceeds maximum allowed (999)");

        let err = CoreError::InvalidCheckoutStage {
            current: CheckoutStage::Cart,
            expected: CheckoutStage::Delivery,
        };
        assert_eq!(
            err.to_string(),
            "Checkout is at the cart stage, expected delivery"
        );
    }

    #[test]
    fn test_validation_error_field() {
        let err = ValidationError::MustBePositive {
            field: "usd_to_iqd".to_string(),
        };
        assert_eq!(err.field(), "usd_to_iqd");
        assert_eq!(err.to_string(), "usd_to_iqd must be positive");
    }

    #[test]
    fn test_validation_converts_to_core_error() {
        let validation_err = ValidationError::Required {
            field: "city".to_string(),
        };
        let core_err: CoreError = validation_err.into();
        assert!(matches!(core_err, CoreError::Validation(_)));
    }
}
