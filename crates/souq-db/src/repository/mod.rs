//! # Repository Module
//!
//! Table access for the storefront data service.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Storefront command                                                     │
//! │       │                                                                 │
//! │       │  db.orders().create(user_id, &cart, &address, currency)         │
//! │       ▼                                                                 │
//! │  OrderRepository                                                        │
//! │  ├── create(...)        (order + items in one transaction)              │
//! │  ├── get_by_id(id)                                                      │
//! │  ├── list_for_user(user_id)                                             │
//! │  └── set_status(id, status)                                             │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  SQLite Database                                                        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Available Repositories
//!
//! - [`UserRepository`](user::UserRepository) - Accounts and credentials
//! - [`ProductRepository`](product::ProductRepository) - Catalog CRUD and filtering
//! - [`OrderRepository`](order::OrderRepository) - Orders and order items
//! - [`AdvertisementRepository`](advertisement::AdvertisementRepository) - Home page banners
//! - [`CurrencyRateRepository`](currency_rate::CurrencyRateRepository) - The single rate row
//! - [`ApiKeyRepository`](api_key::ApiKeyRepository) - Reseller/admin API keys
//! - [`AdminActionRepository`](admin_action::AdminActionRepository) - Admin audit log

pub mod admin_action;
pub mod advertisement;
pub mod api_key;
pub mod currency_rate;
pub mod order;
pub mod product;
pub mod user;

use uuid::Uuid;

/// Generates a new primary key.
pub fn generate_id() -> String {
    Uuid::new_v4().to_string()
}
