//! # Database State
//!
//! Thin wrapper that hands the shared [`Database`] to commands.

use souq_db::Database;

/// Database handle for commands.
#[derive(Debug, Clone)]
pub struct DbState {
    db: Database,
}

impl DbState {
    /// Creates a new DbState wrapping the database connection.
    pub fn new(db: Database) -> Self {
        DbState { db }
    }

    /// Returns a reference to the inner Database.
    ///
    /// ## Usage
    /// ```rust,ignore
    /// let ads = db_state.inner().advertisements().list_active().await?;
    /// ```
    pub fn inner(&self) -> &Database {
        &self.db
    }
}
