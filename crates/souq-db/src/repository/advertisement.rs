//! # Advertisement Repository
//!
//! Home page banners managed from the admin dashboard.

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::debug;

use crate::error::{DbError, DbResult};
use crate::repository::generate_id;
use souq_core::Advertisement;

/// Editable banner fields.
#[derive(Debug, Clone)]
pub struct NewAdvertisement {
    pub title: String,
    pub image_url: String,
    pub link_url: Option<String>,
    pub position: i64,
    pub is_active: bool,
}

/// Repository for advertisements.
#[derive(Debug, Clone)]
pub struct AdvertisementRepository {
    pool: SqlitePool,
}

impl AdvertisementRepository {
    /// Creates a new AdvertisementRepository.
    pub fn new(pool: SqlitePool) -> Self {
        AdvertisementRepository { pool }
    }

    /// Active banners in display order.
    pub async fn list_active(&self) -> DbResult<Vec<Advertisement>> {
        let ads = sqlx::query_as::<_, Advertisement>(
            r#"
            SELECT id, title, image_url, link_url, position, is_active, created_at
            FROM advertisements
            WHERE is_active = 1
            ORDER BY position, created_at
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(ads)
    }

    /// Every banner, for the admin list.
    pub async fn list_all(&self) -> DbResult<Vec<Advertisement>> {
        let ads = sqlx::query_as::<_, Advertisement>(
            r#"
            SELECT id, title, image_url, link_url, position, is_active, created_at
            FROM advertisements
            ORDER BY position, created_at
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(ads)
    }

    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Advertisement>> {
        let ad = sqlx::query_as::<_, Advertisement>(
            r#"
            SELECT id, title, image_url, link_url, position, is_active, created_at
            FROM advertisements
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(ad)
    }

    pub async fn create(&self, input: &NewAdvertisement) -> DbResult<Advertisement> {
        let ad = Advertisement {
            id: generate_id(),
            title: input.title.trim().to_string(),
            image_url: input.image_url.trim().to_string(),
            link_url: input.link_url.clone(),
            position: input.position,
            is_active: input.is_active,
            created_at: Utc::now(),
        };

        debug!(id = %ad.id, "Creating advertisement");

        sqlx::query(
            r#"
            INSERT INTO advertisements (id, title, image_url, link_url, position, is_active, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
        )
        .bind(&ad.id)
        .bind(&ad.title)
        .bind(&ad.image_url)
        .bind(&ad.link_url)
        .bind(ad.position)
        .bind(ad.is_active)
        .bind(ad.created_at)
        .execute(&self.pool)
        .await?;

        Ok(ad)
    }

    pub async fn update(&self, id: &str, input: &NewAdvertisement) -> DbResult<Advertisement> {
        debug!(id = %id, "Updating advertisement");

        let result = sqlx::query(
            r#"
            UPDATE advertisements
            SET title = ?2, image_url = ?3, link_url = ?4, position = ?5, is_active = ?6
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .bind(input.title.trim())
        .bind(input.image_url.trim())
        .bind(&input.link_url)
        .bind(input.position)
        .bind(input.is_active)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Advertisement", id));
        }

        self.get_by_id(id)
            .await?
            .ok_or_else(|| DbError::not_found("Advertisement", id))
    }

    pub async fn delete(&self, id: &str) -> DbResult<()> {
        let result = sqlx::query("DELETE FROM advertisements WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Advertisement", id));
        }

        Ok(())
    }
}
