//! # Product Repository
//!
//! Catalog reads for the storefront and catalog writes for the admin
//! dashboard.
//!
//! ## Filtering
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  ProductFilter { query: "lamp", category: "home", only_discounted }     │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  SELECT ... FROM products WHERE is_active = 1                           │
//! │     AND (title LIKE '%lamp%' OR description LIKE '%lamp%')              │
//! │     AND category = 'home' COLLATE NOCASE                                │
//! │     AND discount_bps > 0                                                │
//! │  ORDER BY created_at DESC LIMIT ? OFFSET ?                              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::Utc;
use sqlx::{QueryBuilder, Sqlite, SqlitePool};
use tracing::debug;

use crate::error::{DbError, DbResult};
use crate::repository::generate_id;
use souq_core::{Product, ProductFilter};

/// Largest page `filter` will return.
pub const MAX_PAGE_SIZE: u32 = 200;

const PRODUCT_COLUMNS: &str = "id, title, description, price_cents, reseller_price_cents, \
     discount_bps, image_url, colors, category, stock, is_active, created_at, updated_at";

/// Editable product fields, used for both create and update.
#[derive(Debug, Clone, Default)]
pub struct NewProduct {
    pub title: String,
    pub description: Option<String>,
    pub price_cents: i64,
    pub reseller_price_cents: Option<i64>,
    pub discount_bps: Option<i64>,
    pub image_url: String,
    pub colors: Vec<String>,
    pub category: String,
    pub stock: i64,
    pub is_active: bool,
}

impl NewProduct {
    fn colors_column(&self) -> String {
        self.colors
            .iter()
            .map(|c| c.trim())
            .filter(|c| !c.is_empty())
            .collect::<Vec<_>>()
            .join(",")
    }
}

/// Repository for product database operations.
#[derive(Debug, Clone)]
pub struct ProductRepository {
    pool: SqlitePool,
}

impl ProductRepository {
    /// Creates a new ProductRepository.
    pub fn new(pool: SqlitePool) -> Self {
        ProductRepository { pool }
    }

    /// Gets a product by its ID, active or not.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Product>> {
        let sql = format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE id = ?1");

        let product = sqlx::query_as::<_, Product>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(product)
    }

    /// Lists products matching a filter, newest first.
    pub async fn filter(&self, filter: &ProductFilter) -> DbResult<Vec<Product>> {
        let limit = filter.limit.clamp(1, MAX_PAGE_SIZE);

        debug!(
            query = ?filter.query,
            category = ?filter.category,
            limit,
            offset = filter.offset,
            "Filtering products"
        );

        let mut qb: QueryBuilder<Sqlite> = QueryBuilder::new(format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE 1 = 1"
        ));

        if !filter.include_inactive {
            qb.push(" AND is_active = 1");
        }

        if let Some(query) = filter.query.as_deref().map(str::trim).filter(|q| !q.is_empty()) {
            let pattern = format!("%{}%", escape_like(query));
            qb.push(" AND (title LIKE ")
                .push_bind(pattern.clone())
                .push(" ESCAPE '\\' OR description LIKE ")
                .push_bind(pattern)
                .push(" ESCAPE '\\')");
        }

        if let Some(category) = filter.category.as_deref().map(str::trim).filter(|c| !c.is_empty()) {
            qb.push(" AND category = ")
                .push_bind(category.to_string())
                .push(" COLLATE NOCASE");
        }

        if filter.only_discounted {
            qb.push(" AND discount_bps > 0");
        }

        qb.push(" ORDER BY created_at DESC, title LIMIT ")
            .push_bind(limit)
            .push(" OFFSET ")
            .push_bind(filter.offset);

        let products = qb.build_query_as::<Product>().fetch_all(&self.pool).await?;

        debug!(count = products.len(), "Filter returned products");
        Ok(products)
    }

    /// Inserts a new product.
    pub async fn create(&self, input: &NewProduct) -> DbResult<Product> {
        let id = generate_id();
        let now = Utc::now();

        debug!(id = %id, title = %input.title, "Inserting product");

        sqlx::query(
            r#"
            INSERT INTO products (
                id, title, description, price_cents, reseller_price_cents,
                discount_bps, image_url, colors, category, stock, is_active,
                created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?12)
            "#,
        )
        .bind(&id)
        .bind(input.title.trim())
        .bind(&input.description)
        .bind(input.price_cents)
        .bind(input.reseller_price_cents)
        .bind(input.discount_bps)
        .bind(&input.image_url)
        .bind(input.colors_column())
        .bind(&input.category)
        .bind(input.stock)
        .bind(input.is_active)
        .bind(now)
        .execute(&self.pool)
        .await?;

        self.get_by_id(&id)
            .await?
            .ok_or_else(|| DbError::not_found("Product", &id))
    }

    /// Replaces the editable fields of a product.
    pub async fn update(&self, id: &str, input: &NewProduct) -> DbResult<Product> {
        debug!(id = %id, "Updating product");

        let result = sqlx::query(
            r#"
            UPDATE products SET
                title = ?2,
                description = ?3,
                price_cents = ?4,
                reseller_price_cents = ?5,
                discount_bps = ?6,
                image_url = ?7,
                colors = ?8,
                category = ?9,
                stock = ?10,
                is_active = ?11,
                updated_at = ?12
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .bind(input.title.trim())
        .bind(&input.description)
        .bind(input.price_cents)
        .bind(input.reseller_price_cents)
        .bind(input.discount_bps)
        .bind(&input.image_url)
        .bind(input.colors_column())
        .bind(&input.category)
        .bind(input.stock)
        .bind(input.is_active)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Product", id));
        }

        self.get_by_id(id)
            .await?
            .ok_or_else(|| DbError::not_found("Product", id))
    }

    /// Deletes a product. Placed orders keep their line snapshots.
    pub async fn delete(&self, id: &str) -> DbResult<()> {
        debug!(id = %id, "Deleting product");

        let result = sqlx::query("DELETE FROM products WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Product", id));
        }

        Ok(())
    }

    /// Counts active products.
    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM products WHERE is_active = 1")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }
}

/// Escapes LIKE wildcards so user input matches literally.
fn escape_like(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        if matches!(c, '%' | '_' | '\\') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

// =============================================================================
// Unit Tests
// =============================================================================
