//! # Admin Action Repository
//!
//! Append-only audit log of admin mutations.

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::debug;

use crate::error::DbResult;
use crate::repository::generate_id;
use souq_core::AdminAction;

/// Repository for the admin audit log.
#[derive(Debug, Clone)]
pub struct AdminActionRepository {
    pool: SqlitePool,
}

impl AdminActionRepository {
    /// Creates a new AdminActionRepository.
    pub fn new(pool: SqlitePool) -> Self {
        AdminActionRepository { pool }
    }

    /// Appends an entry.
    pub async fn insert(
        &self,
        admin_id: &str,
        action: &str,
        target: Option<&str>,
        details: &serde_json::Value,
    ) -> DbResult<AdminAction> {
        let entry = AdminAction {
            id: generate_id(),
            admin_id: admin_id.to_string(),
            action: action.to_string(),
            target: target.map(str::to_string),
            details: serde_json::to_string(details)?,
            created_at: Utc::now(),
        };

        debug!(admin_id = %admin_id, action = %action, target = ?target, "Logging admin action");

        sqlx::query(
            r#"
            INSERT INTO admin_actions (id, admin_id, action, target, details, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
        )
        .bind(&entry.id)
        .bind(&entry.admin_id)
        .bind(&entry.action)
        .bind(&entry.target)
        .bind(&entry.details)
        .bind(entry.created_at)
        .execute(&self.pool)
        .await?;

        Ok(entry)
    }

    /// Most recent entries first.
    pub async fn list_recent(&self, limit: u32) -> DbResult<Vec<AdminAction>> {
        let entries = sqlx::query_as::<_, AdminAction>(
            r#"
            SELECT id, admin_id, action, target, details, created_at
            FROM admin_actions
            ORDER BY created_at DESC, rowid DESC
            LIMIT ?1
            "#,
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::test_support::test_db;
    use serde_json::json;

    #[tokio::test]
    async fn test_insert_and_list_recent() {
        let db = test_db().await;
        let repo = db.admin_actions();

        repo.insert("admin-1", "product.create", Some("p1"), &json!({ "title": "Lamp" }))
            .await
            .unwrap();
        repo.insert("admin-1", "rates.update", None, &json!({ "usdToIqd": 1310.0 }))
            .await
            .unwrap();

        let recent = repo.list_recent(10).await.unwrap();
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].action, "rates.update");
        assert_eq!(recent[1].target.as_deref(), Some("p1"));
        assert_eq!(recent[1].details_json()["title"], "Lamp");

        assert_eq!(repo.list_recent(1).await.unwrap().len(), 1);
    }
}
