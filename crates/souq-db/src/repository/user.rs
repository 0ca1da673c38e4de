//! # User Repository
//!
//! Accounts and the password hashes behind them.
//!
//! Hashing happens in the storefront; this layer only stores the PHC string
//! and never returns it except through [`UserRepository::get_credentials`].

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::debug;

use crate::error::{DbError, DbResult};
use crate::repository::generate_id;
use souq_core::{AccountType, ResellerPlan, UserProfile};

/// Input for creating an account.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    /// Argon2 PHC string.
    pub password_hash: String,
    pub full_name: String,
    pub account_type: AccountType,
    pub reseller_plan: Option<ResellerPlan>,
}

/// A profile together with its stored password hash.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct UserCredentials {
    #[sqlx(flatten)]
    pub profile: UserProfile,
    pub password_hash: String,
}

/// Repository for user accounts.
#[derive(Debug, Clone)]
pub struct UserRepository {
    pool: SqlitePool,
}

impl UserRepository {
    /// Creates a new UserRepository.
    pub fn new(pool: SqlitePool) -> Self {
        UserRepository { pool }
    }

    /// Creates an account.
    ///
    /// ## Returns
    /// * `Err(DbError::UniqueViolation)` - email already registered
    pub async fn create(&self, user: &NewUser) -> DbResult<UserProfile> {
        let email = normalize_email(&user.email);
        let id = generate_id();
        let now = Utc::now();

        debug!(id = %id, account_type = %user.account_type, "Creating user");

        sqlx::query(
            r#"
            INSERT INTO users (
                id, email, password_hash, full_name,
                account_type, reseller_plan, is_active,
                created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, 1, ?7, ?7)
            "#,
        )
        .bind(&id)
        .bind(&email)
        .bind(&user.password_hash)
        .bind(user.full_name.trim())
        .bind(user.account_type)
        .bind(user.reseller_plan)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(|e| match DbError::from(e) {
            DbError::UniqueViolation { field, .. } => DbError::duplicate(field, email.clone()),
            other => other,
        })?;

        Ok(UserProfile {
            id,
            email,
            full_name: user.full_name.trim().to_string(),
            account_type: user.account_type,
            reseller_plan: user.reseller_plan,
            is_active: true,
            created_at: now,
        })
    }

    /// Gets a profile by id.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<UserProfile>> {
        let user = sqlx::query_as::<_, UserProfile>(
            r#"
            SELECT id, email, full_name, account_type, reseller_plan, is_active, created_at
            FROM users
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    /// Gets a profile by email (case-insensitive).
    pub async fn get_by_email(&self, email: &str) -> DbResult<Option<UserProfile>> {
        let user = sqlx::query_as::<_, UserProfile>(
            r#"
            SELECT id, email, full_name, account_type, reseller_plan, is_active, created_at
            FROM users
            WHERE email = ?1
            "#,
        )
        .bind(normalize_email(email))
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    /// Gets a profile with its password hash, for sign-in.
    pub async fn get_credentials(&self, email: &str) -> DbResult<Option<UserCredentials>> {
        let creds = sqlx::query_as::<_, UserCredentials>(
            r#"
            SELECT id, email, full_name, account_type, reseller_plan, is_active, created_at,
                   password_hash
            FROM users
            WHERE email = ?1
            "#,
        )
        .bind(normalize_email(email))
        .fetch_optional(&self.pool)
        .await?;

        Ok(creds)
    }

    /// Lists accounts, newest first.
    pub async fn list(&self, limit: u32, offset: u32) -> DbResult<Vec<UserProfile>> {
        let users = sqlx::query_as::<_, UserProfile>(
            r#"
            SELECT id, email, full_name, account_type, reseller_plan, is_active, created_at
            FROM users
            ORDER BY created_at DESC
            LIMIT ?1 OFFSET ?2
            "#,
        )
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        Ok(users)
    }

    /// Changes the account type and plan.
    ///
    /// The plan is only kept for resellers; other account types store NULL.
    pub async fn set_account_type(
        &self,
        id: &str,
        account_type: AccountType,
        reseller_plan: Option<ResellerPlan>,
    ) -> DbResult<()> {
        let plan = match account_type {
            AccountType::Reseller => reseller_plan,
            AccountType::Customer | AccountType::Admin => None,
        };

        debug!(id = %id, account_type = %account_type, "Changing account type");

        let result = sqlx::query(
            r#"
            UPDATE users SET account_type = ?2, reseller_plan = ?3, updated_at = ?4
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .bind(account_type)
        .bind(plan)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("User", id));
        }

        Ok(())
    }

    /// Activates or deactivates an account. Inactive accounts cannot sign in.
    pub async fn set_active(&self, id: &str, active: bool) -> DbResult<()> {
        let result = sqlx::query("UPDATE users SET is_active = ?2, updated_at = ?3 WHERE id = ?1")
            .bind(id)
            .bind(active)
            .bind(Utc::now())
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("User", id));
        }

        Ok(())
    }

    /// Deletes an account along with its orders and API keys.
    pub async fn delete(&self, id: &str) -> DbResult<()> {
        debug!(id = %id, "Deleting user");

        let result = sqlx::query("DELETE FROM users WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("User", id));
        }

        Ok(())
    }

    /// Counts accounts of one type, or all accounts.
    pub async fn count(&self, account_type: Option<AccountType>) -> DbResult<i64> {
        let count: i64 = match account_type {
            Some(kind) => {
                sqlx::query_scalar("SELECT COUNT(*) FROM users WHERE account_type = ?1")
                    .bind(kind)
                    .fetch_one(&self.pool)
                    .await?
            }
            None => {
                sqlx::query_scalar("SELECT COUNT(*) FROM users")
                    .fetch_one(&self.pool)
                    .await?
            }
        };

        Ok(count)
    }
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

// =============================================================================
// Unit Tests
// =============================================================================
