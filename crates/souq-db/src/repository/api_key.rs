//! # API Key Repository
//!
//! Keys are stored as `(key_prefix, key_hash)`. The prefix is unique and is
//! used to find the row; the hash is verified by the storefront.

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::debug;

use crate::error::{DbError, DbResult};
use crate::repository::generate_id;
use souq_core::ApiKey;

/// Key metadata together with its stored hash.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ApiKeySecret {
    #[sqlx(flatten)]
    pub key: ApiKey,
    pub key_hash: String,
}

/// Repository for API keys.
#[derive(Debug, Clone)]
pub struct ApiKeyRepository {
    pool: SqlitePool,
}

impl ApiKeyRepository {
    /// Creates a new ApiKeyRepository.
    pub fn new(pool: SqlitePool) -> Self {
        ApiKeyRepository { pool }
    }

    pub async fn create(
        &self,
        owner_id: &str,
        label: &str,
        key_prefix: &str,
        key_hash: &str,
    ) -> DbResult<ApiKey> {
        let key = ApiKey {
            id: generate_id(),
            owner_id: owner_id.to_string(),
            label: label.trim().to_string(),
            key_prefix: key_prefix.to_string(),
            is_active: true,
            created_at: Utc::now(),
            last_used_at: None,
        };

        debug!(id = %key.id, owner_id = %owner_id, "Creating API key");

        sqlx::query(
            r#"
            INSERT INTO api_keys (id, owner_id, label, key_prefix, key_hash, is_active, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, 1, ?6)
            "#,
        )
        .bind(&key.id)
        .bind(&key.owner_id)
        .bind(&key.label)
        .bind(&key.key_prefix)
        .bind(key_hash)
        .bind(key.created_at)
        .execute(&self.pool)
        .await?;

        Ok(key)
    }

    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<ApiKey>> {
        let key = sqlx::query_as::<_, ApiKey>(
            r#"
            SELECT id, owner_id, label, key_prefix, is_active, created_at, last_used_at
            FROM api_keys
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(key)
    }

    /// Looks up an active key by prefix, with its hash.
    pub async fn find_active_by_prefix(&self, key_prefix: &str) -> DbResult<Option<ApiKeySecret>> {
        let secret = sqlx::query_as::<_, ApiKeySecret>(
            r#"
            SELECT id, owner_id, label, key_prefix, is_active, created_at, last_used_at, key_hash
            FROM api_keys
            WHERE key_prefix = ?1 AND is_active = 1
            "#,
        )
        .bind(key_prefix)
        .fetch_optional(&self.pool)
        .await?;

        Ok(secret)
    }

    pub async fn list_for_owner(&self, owner_id: &str) -> DbResult<Vec<ApiKey>> {
        let keys = sqlx::query_as::<_, ApiKey>(
            r#"
            SELECT id, owner_id, label, key_prefix, is_active, created_at, last_used_at
            FROM api_keys
            WHERE owner_id = ?1
            ORDER BY created_at DESC
            "#,
        )
        .bind(owner_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(keys)
    }

    pub async fn list_all(&self) -> DbResult<Vec<ApiKey>> {
        let keys = sqlx::query_as::<_, ApiKey>(
            r#"
            SELECT id, owner_id, label, key_prefix, is_active, created_at, last_used_at
            FROM api_keys
            ORDER BY created_at DESC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(keys)
    }

    /// Deactivates a key. Revoking twice is not an error.
    pub async fn revoke(&self, id: &str) -> DbResult<()> {
        debug!(id = %id, "Revoking API key");

        let result = sqlx::query("UPDATE api_keys SET is_active = 0 WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("ApiKey", id));
        }

        Ok(())
    }

    /// Records a successful use of the key.
    pub async fn touch(&self, id: &str) -> DbResult<()> {
        sqlx::query("UPDATE api_keys SET last_used_at = ?2 WHERE id = ?1")
            .bind(id)
            .bind(Utc::now())
            .execute(&self.pool)
            .await?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::test_support::{insert_user, test_db};
    use souq_core::AccountType;

    #[tokio::test]
    async fn test_create_find_revoke() {
        let db = test_db().await;
        let owner = insert_user(&db, "reseller@example.com", AccountType::Reseller).await;
        let repo = db.api_keys();

        let key = repo.create(&owner.id, " Feed ", "sk_abc123", "$argon2id$hash").await.unwrap();
        assert_eq!(key.label, "Feed");
        assert!(key.is_active);

        let found = repo.find_active_by_prefix("sk_abc123").await.unwrap().unwrap();
        assert_eq!(found.key.id, key.id);
        assert_eq!(found.key_hash, "$argon2id$hash");

        repo.touch(&key.id).await.unwrap();
        let touched = repo.get_by_id(&key.id).await.unwrap().unwrap();
        assert!(touched.last_used_at.is_some());

        repo.revoke(&key.id).await.unwrap();
        assert!(repo.find_active_by_prefix("sk_abc123").await.unwrap().is_none());
        assert_eq!(repo.list_for_owner(&owner.id).await.unwrap().len(), 1);
        assert_eq!(repo.list_all().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_duplicate_prefix_rejected() {
        let db = test_db().await;
        let owner = insert_user(&db, "admin@example.com", AccountType::Admin).await;
        let repo = db.api_keys();

        repo.create(&owner.id, "one", "sk_same", "h1").await.unwrap();
        let err = repo.create(&owner.id, "two", "sk_same", "h2").await.unwrap_err();
        assert!(matches!(err, DbError::UniqueViolation { .. }));
    }
}
