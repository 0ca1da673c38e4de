//! # State Module
//!
//! Per-user state for the storefront. Each command takes only the state
//! objects it needs; [`crate::AppServices`] bundles them for the binary and
//! for tests.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    State Architecture                                   │
//! │                                                                         │
//! │  ┌──────────────┐  ┌──────────────┐  ┌──────────────┐  ┌─────────────┐  │
//! │  │   DbState    │  │  CartState   │  │  RatesState  │  │SessionStore │  │
//! │  │              │  │              │  │              │  │             │  │
//! │  │  Database    │  │  Mutex<      │  │  RwLock<     │  │  storage +  │  │
//! │  │  handle      │  │   Cart +     │  │   rates +    │  │  broadcast  │  │
//! │  │              │  │   Checkout>  │  │   currency>  │  │  channel    │  │
//! │  └──────────────┘  └──────────────┘  └──────────────┘  └─────────────┘  │
//! │                                                                         │
//! │  Shared between commands, never global: constructed once at startup    │
//! │  and passed in.                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

mod cart;
mod db;
mod rates;
mod session;

pub use cart::{CartSession, CartState};
pub use db::DbState;
pub use rates::RatesState;
pub use session::{
    FileSessionStorage, MemorySessionStorage, SessionChange, SessionChannel, SessionEvent,
    SessionStorage, SessionStore, StorageError,
};
