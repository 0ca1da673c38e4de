//! # Souq Storefront Library
//!
//! Command layer behind the customer, reseller and admin dashboards.
//!
//! ## Module Organization
//! ```text
//! souq_storefront/
//! ├── lib.rs          ◄─── You are here (service wiring, logging, paths)
//! ├── config.rs       ◄─── SOUQ_* environment configuration
//! ├── auth.rs         ◄─── JWT access tokens, argon2 hashing, API key format
//! ├── state/
//! │   ├── db.rs       ◄─── Database handle
//! │   ├── cart.rs     ◄─── Cart + checkout stage
//! │   ├── rates.rs    ◄─── Exchange rates + display currency
//! │   └── session.rs  ◄─── Session storage and cross-instance sync
//! ├── commands/       ◄─── catalog, cart, checkout, auth, account, admin
//! └── error.rs        ◄─── API error type for commands
//! ```
//!
//! ## Wiring
//! Nothing here is global. [`AppServices::with_db`] builds every state
//! object once and the caller passes the pieces each command needs:
//!
//! ```rust,ignore
//! let app = AppServices::with_db(config, db, storage, SessionChannel::default()).await?;
//! let cart = commands::cart::get_cart(&app.cart, &app.rates).await;
//! ```

pub mod auth;
pub mod commands;
pub mod config;
pub mod error;
pub mod state;

use std::path::PathBuf;
use std::sync::Arc;

use directories::ProjectDirs;
use tracing::{info, warn, Level};
use tracing_subscriber::EnvFilter;

pub use auth::{AuthError, JwtManager};
pub use config::{ConfigError, StorefrontConfig};
pub use error::{ApiError, ErrorCode};
pub use state::{CartState, DbState, RatesState, SessionChannel, SessionStorage, SessionStore};

use souq_core::ExchangeRateSet;
use souq_db::{Database, DbError};

/// Every state object of one storefront instance.
#[derive(Debug)]
pub struct AppServices {
    pub config: StorefrontConfig,
    pub db: DbState,
    pub cart: CartState,
    pub rates: RatesState,
    pub session: SessionStore,
    pub jwt: JwtManager,
}

impl AppServices {
    /// Builds the services over an open database.
    ///
    /// ## Startup Sequence
    /// ```text
    /// ┌─────────────────────────────────────────────────────────────────────────┐
    /// │  1. Rates: stored rates, or development defaults if none are stored     │
    /// │  2. Session: restore from storage (expired / unreadable entries drop)   │
    /// │  3. Cart: empty, fee policy from config                                 │
    /// └─────────────────────────────────────────────────────────────────────────┘
    /// ```
    ///
    /// Instances sharing `channel` see each other's sign-ins and sign-outs.
    pub async fn with_db(
        config: StorefrontConfig,
        db: Database,
        storage: Arc<dyn SessionStorage>,
        channel: SessionChannel,
    ) -> Result<Self, DbError> {
        let rates = RatesState::new(ExchangeRateSet::default(), config.default_currency);
        rates.refresh(&db).await?;

        let session = SessionStore::new(storage, channel);
        session.bootstrap().await;

        let jwt = JwtManager::new(config.jwt_secret.clone(), config.session_ttl_secs);
        let cart = CartState::new(config.fee_policy());

        Ok(AppServices {
            db: DbState::new(db),
            cart,
            rates,
            session,
            jwt,
            config,
        })
    }
}

/// Initializes the tracing subscriber for structured logging.
///
/// ## Log Levels
/// - `RUST_LOG=debug` - Show debug messages
/// - `RUST_LOG=souq=trace` - Show trace for souq crates only
/// - Default: `info,souq=debug,sqlx=warn`
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,souq=debug,sqlx=warn"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_max_level(Level::TRACE)
        .init();
}

/// Determines the database file path.
///
/// ## Platform-Specific Paths
/// - **macOS**: `~/Library/Application Support/com.souq.storefront/souq.db`
/// - **Windows**: `%APPDATA%\souq\storefront\data\souq.db`
/// - **Linux**: `~/.local/share/storefront/souq.db`
///
/// `SOUQ_DB_PATH` (via [`StorefrontConfig::database_path`]) overrides it.
pub fn get_database_path(config: &StorefrontConfig) -> Result<PathBuf, ConfigError> {
    match &config.database_path {
        Some(path) => Ok(path.clone()),
        None => Ok(data_dir()?.join("souq.db")),
    }
}

/// Determines the session fallback file, next to the database by default.
pub fn get_session_path(config: &StorefrontConfig) -> Result<PathBuf, ConfigError> {
    match &config.session_file {
        Some(path) => Ok(path.clone()),
        None => Ok(data_dir()?.join("session.json")),
    }
}

fn data_dir() -> Result<PathBuf, ConfigError> {
    let proj_dirs = ProjectDirs::from("com", "souq", "storefront").ok_or(ConfigError::NoDataDir)?;
    let data_dir = proj_dirs.data_dir();

    std::fs::create_dir_all(data_dir)?;
    Ok(data_dir.to_path_buf())
}

/// Logs a one-line summary of what the instance started with.
pub async fn log_startup_summary(app: &AppServices) {
    let db = app.db.inner();
    if !db.health_check().await {
        warn!("Database health check failed");
    }

    match db.products().count().await {
        Ok(products) => info!(products, "Catalog loaded"),
        Err(e) => warn!(error = %e, "Could not count products"),
    }

    let (rates, currency) = app.rates.snapshot().await;
    let signed_in = app.session.current().await.map(|s| s.user.email);
    info!(
        usd_to_iqd = rates.usd_to_iqd,
        sar_to_iqd = rates.sar_to_iqd,
        usd_to_sar = rates.usd_to_sar,
        currency = %currency,
        signed_in = ?signed_in,
        mock_sessions = app.config.allow_mock_sessions,
        "Storefront ready"
    );
}

// =============================================================================
// Test Support
// =============================================================================

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use chrono::Utc;
    use souq_core::{AccountType, DeliveryAddress, Product, ResellerPlan, Session, UserProfile};
    use souq_db::{DbConfig, NewProduct, NewUser};

    use crate::state::MemorySessionStorage;

    /// Fresh services over an empty in-memory database. No placement delay,
    /// mock sessions enabled, flat $5 delivery.
    pub async fn services() -> AppServices {
        let config = StorefrontConfig {
            placement_delay_ms: 0,
            allow_mock_sessions: true,
            delivery_fee_cents: 500,
            ..StorefrontConfig::default()
        };
        let db = Database::new(DbConfig::in_memory()).await.unwrap();

        AppServices::with_db(
            config,
            db,
            Arc::new(MemorySessionStorage::new()),
            SessionChannel::default(),
        )
        .await
        .unwrap()
    }

    /// Inserts a user and makes them the signed-in user.
    pub async fn sign_in_as(
        app: &AppServices,
        email: &str,
        account_type: AccountType,
        reseller_plan: Option<ResellerPlan>,
    ) -> UserProfile {
        let user = app
            .db
            .inner()
            .users()
            .create(&NewUser {
                email: email.to_string(),
                password_hash: "not-a-real-hash".to_string(),
                full_name: email.to_string(),
                account_type,
                reseller_plan,
            })
            .await
            .unwrap();

        let (access_token, expires_at) = app.jwt.issue(&user).unwrap();
        app.session
            .set(Session {
                user: user.clone(),
                access_token,
                expires_at,
                is_mock: false,
            })
            .await;

        user
    }

    /// Starts a demo session that exists only in memory.
    pub async fn sign_in_mock_user(app: &AppServices, account_type: AccountType) -> UserProfile {
        let now = Utc::now();
        let user = UserProfile {
            id: "mock-user".to_string(),
            email: "demo@example.com".to_string(),
            full_name: "Demo".to_string(),
            account_type,
            reseller_plan: None,
            is_active: true,
            created_at: now,
        };

        app.session
            .set(Session {
                user: user.clone(),
                access_token: "mock-token".to_string(),
                expires_at: now + chrono::Duration::hours(1),
                is_mock: true,
            })
            .await;

        user
    }

    /// Adds a product with plenty of stock.
    pub async fn add_product(app: &AppServices, title: &str, price_cents: i64, active: bool) -> Product {
        app.db
            .inner()
            .products()
            .create(&NewProduct {
                title: title.to_string(),
                price_cents,
                stock: 100,
                is_active: active,
                ..NewProduct::default()
            })
            .await
            .unwrap()
    }

    pub fn address() -> DeliveryAddress {
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
}
