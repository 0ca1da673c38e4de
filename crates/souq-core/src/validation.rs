//! # Validation Module
//!
//! Field-level input validation for the storefront forms.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: Dashboard forms                                               │
//! │  └── Immediate feedback while typing                                    │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: storefront commands (Rust)                                    │
//! │  ├── Type validation (deserialization)                                  │
//! │  └── THIS MODULE: business rule validation                              │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Database                                                      │
//! │  ├── NOT NULL / CHECK constraints                                       │
//! │  └── UNIQUE constraints (email, API key prefix)                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every failure is a [`ValidationError`] that names its field, so the
//! dashboard can show the message next to the input that caused it.

use crate::cart::DeliveryAddress;
use crate::error::ValidationError;
use crate::money::DiscountRate;
use crate::{MAX_ITEM_QUANTITY, MAX_PRICE_CENTS};

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

// =============================================================================
// String Validators
// =============================================================================

/// Validates that a trimmed value is present and at most `max` characters.
///
/// ```rust
/// use souq_core::validation::validate_required;
///
/// assert!(validate_required("city", "Baghdad", 100).is_ok());
/// assert!(validate_required("city", "   ", 100).is_err());
/// ```
pub fn validate_required(field: &str, value: &str, max: usize) -> ValidationResult<()> {
    let value = value.trim();

    if value.is_empty() {
        return Err(ValidationError::Required {
            field: field.to_string(),
        });
    }

    if value.chars().count() > max {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            max,
        });
    }

    Ok(())
}

/// Validates an email address (shape only, delivery is not checked).
pub fn validate_email(email: &str) -> ValidationResult<()> {
    validate_required("email", email, 254)?;

    let email = email.trim();
    let invalid = || ValidationError::InvalidFormat {
        field: "email".to_string(),
        reason: "must look like name@example.com".to_string(),
    };

    let (local, domain) = email.split_once('@').ok_or_else(invalid)?;
    if local.is_empty() || domain.contains('@') || email.contains(char::is_whitespace) {
        return Err(invalid());
    }
    if !domain.contains('.') || domain.starts_with('.') || domain.ends_with('.') {
        return Err(invalid());
    }

    Ok(())
}

/// Validates a phone number.
///
/// ## Rules
/// - Optional leading `+`
/// - Digits, spaces and hyphens otherwise
/// - 7 to 15 digits in total
pub fn validate_phone(phone: &str) -> ValidationResult<()> {
    validate_required("phone", phone, 32)?;

    let phone = phone.trim();
    let body = phone.strip_prefix('+').unwrap_or(phone);

    if !body.chars().all(|c| c.is_ascii_digit() || c == ' ' || c == '-') {
        return Err(ValidationError::InvalidFormat {
            field: "phone".to_string(),
            reason: "may contain only digits, spaces, hyphens and a leading +".to_string(),
        });
    }

    let digits = body.chars().filter(|c| c.is_ascii_digit()).count();
    if !(7..=15).contains(&digits) {
        return Err(ValidationError::InvalidFormat {
            field: "phone".to_string(),
            reason: "must contain 7 to 15 digits".to_string(),
        });
    }

    Ok(())
}

/// Validates a password on sign-up.
pub fn validate_password(password: &str) -> ValidationResult<()> {
    if password.is_empty() {
        return Err(ValidationError::Required {
            field: "password".to_string(),
        });
    }

    if password.chars().count() < 8 {
        return Err(ValidationError::InvalidFormat {
            field: "password".to_string(),
            reason: "must be at least 8 characters".to_string(),
        });
    }

    if password.len() > 128 {
        return Err(ValidationError::TooLong {
            field: "password".to_string(),
            max: 128,
        });
    }

    Ok(())
}

/// Validates a product title.
pub fn validate_product_title(title: &str) -> ValidationResult<()> {
    validate_required("title", title, 200)
}

/// Validates an http(s) URL used for images and ad links.
pub fn validate_url(field: &str, url: &str) -> ValidationResult<()> {
    validate_required(field, url, 2048)?;

    let url = url.trim();
    if !(url.starts_with("https://") || url.starts_with("http://") || url.starts_with('/')) {
        return Err(ValidationError::InvalidFormat {
            field: field.to_string(),
            reason: "must be an http(s) URL or an absolute path".to_string(),
        });
    }

    Ok(())
}

/// Validates and normalizes a search query.
///
/// ## Returns
/// The trimmed query string (may be empty: empty means "no filter").
pub fn validate_search_query(query: &str) -> ValidationResult<String> {
    let query = query.trim();

    if query.chars().count() > 100 {
        return Err(ValidationError::TooLong {
            field: "query".to_string(),
            max: 100,
        });
    }

    Ok(query.to_string())
}

// =============================================================================
// Numeric Validators
// =============================================================================

/// Validates a line quantity.
///
/// ## Rules
/// - Must be positive (> 0)
/// - Must not exceed MAX_ITEM_QUANTITY (999)
pub fn validate_quantity(qty: i64) -> ValidationResult<()> {
    if qty <= 0 {
        return Err(ValidationError::MustBePositive {
            field: "quantity".to_string(),
        });
    }

    if qty > MAX_ITEM_QUANTITY {
        return Err(ValidationError::OutOfRange {
            field: "quantity".to_string(),
            min: 1,
            max: MAX_ITEM_QUANTITY,
        });
    }

    Ok(())
}

/// Validates a price in cents. Zero is allowed (free items).
///
/// ## Rules
/// - Must not be negative
/// - Must not exceed `MAX_PRICE_CENTS`
pub fn validate_price_cents(field: &str, cents: i64) -> ValidationResult<()> {
    if cents < 0 {
        return Err(ValidationError::MustNotBeNegative {
            field: field.to_string(),
        });
    }

    if cents > MAX_PRICE_CENTS {
        return Err(ValidationError::OutOfRange {
            field: field.to_string(),
            min: 0,
            max: MAX_PRICE_CENTS,
        });
    }

    Ok(())
}

/// Validates a discount rate (0%..=100%).
pub fn validate_discount(rate: DiscountRate) -> ValidationResult<()> {
    if !rate.is_valid() {
        return Err(ValidationError::OutOfRange {
            field: "discount".to_string(),
            min: 0,
            max: 100,
        });
    }

    Ok(())
}

/// Validates a single exchange rate.
///
/// ## Rules
/// - Must be finite
/// - Must be strictly positive
pub fn validate_positive_rate(field: &str, rate: f64) -> ValidationResult<()> {
    if !rate.is_finite() || rate <= 0.0 {
        return Err(ValidationError::MustBePositive {
            field: field.to_string(),
        });
    }

    Ok(())
}

// =============================================================================
// Composite Validators
// =============================================================================

/// Validates every field of a delivery address.
///
/// Stops at the first failing field, in form order.
pub fn validate_delivery_address(address: &DeliveryAddress) -> ValidationResult<()> {
    validate_required("full_name", &address.full_name, 120)?;
    validate_required("street", &address.street, 200)?;
    validate_required("city", &address.city, 100)?;
    validate_required("state", &address.state, 100)?;
    validate_required("postal_code", &address.postal_code, 20)?;
    validate_required("country", &address.country, 100)?;
    validate_phone(&address.phone)?;
    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn address() -> DeliveryAddress {
        DeliveryAddress {
            full_name: "Zainab Hassan".to_string(),
            street: "14 Karrada St".to_string(),
            city: "Baghdad".to_string(),
            state: "Baghdad".to_string(),
            postal_code: "10001".to_string(),
            country: "Iraq".to_string(),
            phone: "+964 770 123 4567".to_string(),
        }
    }

    #[test]
    fn test_validate_email() {
        assert!(validate_email("buyer@example.com").is_ok());
        assert!(validate_email("").is_err());
        assert!(validate_email("no-at-sign").is_err());
        assert!(validate_email("a@b").is_err());
        assert!(validate_email("a b@example.com").is_err());
        assert!(validate_email("a@@example.com").is_err());
    }

    #[test]
    fn test_validate_phone() {
        assert!(validate_phone("+964 770 123 4567").is_ok());
        assert!(validate_phone("0770-123-4567").is_ok());
        assert!(validate_phone("12345").is_err());
        assert!(validate_phone("call me").is_err());
    }

    #[test]
    fn test_validate_password() {
        assert!(validate_password("correct horse").is_ok());
        assert!(validate_password("short").is_err());
        assert!(validate_password("").is_err());
    }

    #[test]
    fn test_validate_quantity() {
        assert!(validate_quantity(1).is_ok());
        assert!(validate_quantity(999).is_ok());
        assert!(validate_quantity(0).is_err());
        assert!(validate_quantity(-1).is_err());
        assert!(validate_quantity(1000).is_err());
    }

    #[test]
    fn test_validate_price_and_discount() {
        assert!(validate_price_cents("price", 0).is_ok());
        assert!(validate_price_cents("price", -1).is_err());
        assert!(validate_price_cents("price", MAX_PRICE_CENTS).is_ok());
        assert!(matches!(
            validate_price_cents("price", MAX_PRICE_CENTS + 1),
            Err(ValidationError::OutOfRange { .. })
        ));
        assert!(validate_discount(DiscountRate::from_bps(10_000)).is_ok());
        assert!(validate_discount(DiscountRate::from_bps(10_001)).is_err());
    }

    #[test]
    fn test_validate_positive_rate() {
        assert!(validate_positive_rate("usd_to_iqd", 1320.0).is_ok());
        assert!(validate_positive_rate("usd_to_iqd", 0.0).is_err());
        assert!(validate_positive_rate("usd_to_iqd", f64::INFINITY).is_err());
    }

    #[test]
    fn test_validate_url() {
        assert!(validate_url("image", "https://cdn.example.com/a.png").is_ok());
        assert!(validate_url("image", "/static/a.png").is_ok());
        assert!(validate_url("image", "ftp://x").is_err());
    }

    #[test]
    fn test_validate_delivery_address_reports_field() {
        assert!(validate_delivery_address(&address()).is_ok());

        let mut missing_city = address();
        missing_city.city = "  ".to_string();
        let err = validate_delivery_address(&missing_city).unwrap_err();
        assert_eq!(err.field(), "city");

        let mut bad_phone = address();
        bad_phone.phone = "abc".to_string();
        let err = validate_delivery_address(&bad_phone).unwrap_err();
        assert_eq!(err.field(), "phone");
    }

    #[test]
    fn test_validate_search_query() {
        assert_eq!(validate_search_query("  lamp  ").unwrap(), "lamp");
        assert!(validate_search_query(&"x".repeat(101)).is_err());
    }
}
