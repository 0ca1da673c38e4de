//! # Commands
//!
//! Command functions called by the customer, reseller and admin dashboards.
//! Each takes only the state it needs and returns `Result<T, ApiError>`.
//!
//! ```text
//! ┌──────────────┬───────────────────────────────────────────────────────────┐
//! │ Module       │ Commands                                                  │
//! ├──────────────┼───────────────────────────────────────────────────────────┤
//! │ catalog      │ list_products, get_product, list_active_ads, get_rates,   │
//! │              │ set_display_currency                                      │
//! │ cart         │ get_cart, add_to_cart, update_cart_item,                  │
//! │              │ remove_from_cart, clear_cart                              │
//! │ checkout     │ proceed_to_delivery, submit_delivery, checkout_back,      │
//! │              │ place_order                                               │
//! │ auth         │ sign_up, sign_in, sign_in_mock, sign_out, current_session │
//! │ account      │ my_orders, get_my_order, create_api_key,                  │
//! │              │ list_my_api_keys, revoke_api_key, authenticate_api_key    │
//! │ admin        │ admin_* (users, products, orders, ads, rates, API keys,   │
//! │              │ dashboard stats, audit log)                               │
//! └──────────────┴───────────────────────────────────────────────────────────┘
//! ```

pub mod account;
pub mod admin;
pub mod auth;
pub mod cart;
pub mod catalog;
pub mod checkout;
