//! # souq-db: Data Service Layer for the Souq Storefront
//!
//! This crate stands in for the storefront's hosted database and auth
//! backend. It uses SQLite with sqlx for async operations.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Souq Storefront Data Flow                         │
//! │                                                                         │
//! │  Storefront command (place_order, list_products ...)                    │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     souq-db (THIS CRATE)                        │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐    ┌───────────────┐    ┌──────────────┐   │   │
//! │  │   │   Database    │    │  Repositories │    │  Procedures  │   │   │
//! │  │   │   (pool.rs)   │    │               │    │   (rpc.rs)   │   │   │
//! │  │   │               │    │ UserRepo      │    │              │   │   │
//! │  │   │ SqlitePool    │◄───│ ProductRepo   │    │ dashboard    │   │   │
//! │  │   │ Migrations    │    │ OrderRepo ... │    │ stats, audit │   │   │
//! │  │   └───────────────┘    └───────────────┘    └──────────────┘   │   │
//! │  │                                                                 │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     SQLite Database                             │   │
//! │  │   <platform data dir>/souq/souq.db                              │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`pool`] - Connection pool creation and configuration
//! - [`migrations`] - Embedded database migrations
//! - [`error`] - Database error types
//! - [`repository`] - Table access (users, products, orders, ...)
//! - [`rpc`] - Named procedures returning a `ServiceResponse` envelope
//!
//! ## Usage
//!
//! ```rust,ignore
//! use souq_db::{Database, DbConfig};
//!
//! let db = Database::new(DbConfig::new("path/to/souq.db")).await?;
//!
//! let rates = db.currency_rates().get().await?;
//! let stats = db.rpc().get_dashboard_stats().await;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;
pub mod rpc;

// =============================================================================
// Re-exports
// =============================================================================

pub use error::{DbError, DbResult};
pub use pool::{Database, DbConfig};
pub use rpc::{Procedures, ServiceResponse};

// Repository re-exports for convenience
pub use repository::admin_action::AdminActionRepository;
pub use repository::advertisement::{AdvertisementRepository, NewAdvertisement};
pub use repository::api_key::ApiKeyRepository;
pub use repository::currency_rate::CurrencyRateRepository;
pub use repository::order::OrderRepository;
pub use repository::product::{NewProduct, ProductRepository};
pub use repository::user::{NewUser, UserRepository};
