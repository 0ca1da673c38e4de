//! # Storefront Configuration
//!
//! Configuration is loaded from `SOUQ_*` environment variables with
//! fallback to development defaults.
//!
//! ## Environment Variables
//! ```text
//! ┌──────────────────────────────┬──────────────────────────┬───────────────┐
//! │ Variable                     │ Meaning                  │ Default       │
//! ├──────────────────────────────┼──────────────────────────┼───────────────┤
//! │ SOUQ_DB_PATH                 │ SQLite file              │ platform dir  │
//! │ SOUQ_SESSION_FILE            │ persisted session JSON   │ platform dir  │
//! │ SOUQ_JWT_SECRET              │ access token secret      │ dev secret    │
//! │ SOUQ_SESSION_TTL_SECS        │ session lifetime         │ 86400         │
//! │ SOUQ_ALLOW_MOCK_SESSIONS     │ demo sign-in             │ false         │
//! │ SOUQ_PLACEMENT_DELAY_MS      │ order placement delay    │ 1500          │
//! │ SOUQ_DELIVERY_FEE_CENTS      │ flat delivery fee        │ 500           │
//! │ SOUQ_CITY_DELIVERY_FEES      │ "Baghdad=300,Basra=700"  │ (none)        │
//! │ SOUQ_DEFAULT_CURRENCY        │ USD, IQD or SAR          │ USD           │
//! └──────────────────────────────┴──────────────────────────┴───────────────┘
//! ```

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use souq_core::{Currency, DeliveryFeePolicy, Money, DEFAULT_DELIVERY_FEE_CENTS};

const DEV_JWT_SECRET: &str = "souq-dev-secret-change-in-production";

/// Storefront configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StorefrontConfig {
    /// Database file; `None` means the platform data directory.
    pub database_path: Option<PathBuf>,

    /// Session fallback file; `None` means the platform data directory.
    pub session_file: Option<PathBuf>,

    /// Secret for signing access tokens.
    #[serde(skip_serializing)]
    pub jwt_secret: String,

    /// Session lifetime in seconds.
    pub session_ttl_secs: i64,

    /// Allows demo sessions that never touch the data service.
    pub allow_mock_sessions: bool,

    /// Fixed wait before an order is written.
    pub placement_delay_ms: u64,

    /// Flat delivery fee in USD cents.
    pub delivery_fee_cents: i64,

    /// Per-city fee overrides in USD cents.
    pub city_delivery_fees: Vec<(String, i64)>,

    /// Currency prices are shown in until the user picks another.
    pub default_currency: Currency,
}

impl Default for StorefrontConfig {
    fn default() -> Self {
        StorefrontConfig {
            database_path: None,
            session_file: None,
            jwt_secret: DEV_JWT_SECRET.to_string(),
            session_ttl_secs: 86_400,
            allow_mock_sessions: false,
            placement_delay_ms: 1_500,
            delivery_fee_cents: DEFAULT_DELIVERY_FEE_CENTS,
            city_delivery_fees: Vec::new(),
            default_currency: Currency::Usd,
        }
    }
}

impl StorefrontConfig {
    /// Loads configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        StorefrontConfig::from_lookup(|key| std::env::var(key).ok())
    }

    /// Loads configuration from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = StorefrontConfig::default();

        if let Some(path) = lookup("SOUQ_DB_PATH") {
            config.database_path = Some(PathBuf::from(path));
        }

        if let Some(path) = lookup("SOUQ_SESSION_FILE") {
            config.session_file = Some(PathBuf::from(path));
        }

        if let Some(secret) = lookup("SOUQ_JWT_SECRET") {
            if secret.trim().is_empty() {
                return Err(ConfigError::InvalidValue("SOUQ_JWT_SECRET".to_string()));
            }
            config.jwt_secret = secret;
        }

        if let Some(ttl) = lookup("SOUQ_SESSION_TTL_SECS") {
            config.session_ttl_secs = parse_var("SOUQ_SESSION_TTL_SECS", &ttl)?;
            if config.session_ttl_secs <= 0 {
                return Err(ConfigError::InvalidValue("SOUQ_SESSION_TTL_SECS".to_string()));
            }
        }

        if let Some(flag) = lookup("SOUQ_ALLOW_MOCK_SESSIONS") {
            config.allow_mock_sessions = parse_bool("SOUQ_ALLOW_MOCK_SESSIONS", &flag)?;
        }

        if let Some(delay) = lookup("SOUQ_PLACEMENT_DELAY_MS") {
            config.placement_delay_ms = parse_var("SOUQ_PLACEMENT_DELAY_MS", &delay)?;
        }

        if let Some(fee) = lookup("SOUQ_DELIVERY_FEE_CENTS") {
            config.delivery_fee_cents = parse_var("SOUQ_DELIVERY_FEE_CENTS", &fee)?;
            if config.delivery_fee_cents < 0 {
                return Err(ConfigError::InvalidValue("SOUQ_DELIVERY_FEE_CENTS".to_string()));
            }
        }

        if let Some(fees) = lookup("SOUQ_CITY_DELIVERY_FEES") {
            config.city_delivery_fees = parse_city_fees(&fees)?;
        }

        if let Some(code) = lookup("SOUQ_DEFAULT_CURRENCY") {
            config.default_currency = code
                .parse()
                .map_err(|_| ConfigError::InvalidValue("SOUQ_DEFAULT_CURRENCY".to_string()))?;
        }

        Ok(config)
    }

    /// Builds the cart fee policy from the flat fee and city overrides.
    pub fn fee_policy(&self) -> DeliveryFeePolicy {
        self.city_delivery_fees.iter().fold(
            DeliveryFeePolicy::flat(Money::from_cents(self.delivery_fee_cents)),
            |policy, (city, cents)| policy.with_city_fee(city, Money::from_cents(*cents)),
        )
    }

    pub fn placement_delay(&self) -> Duration {
        Duration::from_millis(self.placement_delay_ms)
    }
}

fn parse_var<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::InvalidValue(key.to_string()))
}

fn parse_bool(key: &str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        _ => Err(ConfigError::InvalidValue(key.to_string())),
    }
}

/// Parses `"City=cents,City=cents"`.
fn parse_city_fees(value: &str) -> Result<Vec<(String, i64)>, ConfigError> {
    value
        .split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(|entry| {
            let (city, cents) = entry
                .split_once('=')
                .ok_or_else(|| ConfigError::InvalidValue("SOUQ_CITY_DELIVERY_FEES".to_string()))?;
            let cents: i64 = parse_var("SOUQ_CITY_DELIVERY_FEES", cents)?;
            if city.trim().is_empty() || cents < 0 {
                return Err(ConfigError::InvalidValue("SOUQ_CITY_DELIVERY_FEES".to_string()));
            }
            Ok((city.trim().to_string(), cents))
        })
        .collect()
}

/// Configuration error types.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {0}")]
    InvalidValue(String),

    #[error("Could not determine app data directory")]
    NoDataDir,

    #[error("Could not prepare data directory: {0}")]
    Io(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = StorefrontConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config, StorefrontConfig::default());
        assert_eq!(config.placement_delay(), Duration::from_millis(1_500));
        assert_eq!(config.fee_policy(), DeliveryFeePolicy::default());
    }

    #[test]
    fn test_overrides() {
        let config = StorefrontConfig::from_lookup(lookup(&[
            ("SOUQ_DB_PATH", "/tmp/souq.db"),
            ("SOUQ_ALLOW_MOCK_SESSIONS", "yes"),
            ("SOUQ_PLACEMENT_DELAY_MS", "0"),
            ("SOUQ_DELIVERY_FEE_CENTS", "700"),
            ("SOUQ_CITY_DELIVERY_FEES", "Baghdad=300, Basra = 900"),
            ("SOUQ_DEFAULT_CURRENCY", "iqd"),
        ]))
        .unwrap();

        assert_eq!(config.database_path, Some(PathBuf::from("/tmp/souq.db")));
        assert!(config.allow_mock_sessions);
        assert_eq!(config.placement_delay_ms, 0);
        assert_eq!(config.default_currency, Currency::Iqd);

        let policy = config.fee_policy();
        assert_eq!(policy.flat_fee, Money::from_cents(700));
        assert_eq!(policy.city_fees.get("baghdad"), Some(&Money::from_cents(300)));
        assert_eq!(policy.city_fees.get("basra"), Some(&Money::from_cents(900)));
    }

    #[test]
    fn test_invalid_values() {
        let cases: &[(&str, &str)] = &[
            ("SOUQ_SESSION_TTL_SECS", "0"),
            ("SOUQ_SESSION_TTL_SECS", "soon"),
            ("SOUQ_ALLOW_MOCK_SESSIONS", "maybe"),
            ("SOUQ_DELIVERY_FEE_CENTS", "-1"),
            ("SOUQ_CITY_DELIVERY_FEES", "Baghdad"),
            ("SOUQ_DEFAULT_CURRENCY", "EUR"),
            ("SOUQ_JWT_SECRET", "  "),
        ];

        for (key, value) in cases {
            let err = StorefrontConfig::from_lookup(lookup(&[(key, value)])).unwrap_err();
            assert!(
                matches!(&err, ConfigError::InvalidValue(k) if k == key),
                "{key}={value} gave {err:?}"
            );
        }
    }
}
