//! # Order Repository
//!
//! Database operations for orders and order items.
//!
//! ## Order Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Order Lifecycle                                   │
//! │                                                                         │
//! │  1. PLACE (customer, payment stage)                                     │
//! │     └── create() → Order { status: Pending }                            │
//! │         order row + one order_items row per cart line,                  │
//! │         all in ONE transaction                                          │
//! │                                                                         │
//! │  2. FULFIL (admin)                                                      │
//! │     └── set_status() → Processing → Shipped → Delivered                 │
//! │                                                                         │
//! │  3. (OPTIONAL) CANCEL (admin)                                           │
//! │     └── set_status() → Cancelled                                        │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::{debug, info};

use crate::error::{DbError, DbResult};
use crate::repository::generate_id;
use souq_core::{Cart, Currency, DeliveryAddress, Order, OrderItem, OrderStatus};

const ORDER_COLUMNS: &str = "id, user_id, status, subtotal_cents, discount_cents, \
     delivery_fee_cents, total_cents, currency, full_name, street, city, state, \
     postal_code, country, phone, created_at, updated_at";

/// Repository for order database operations.
#[derive(Debug, Clone)]
pub struct OrderRepository {
    pool: SqlitePool,
}

impl OrderRepository {
    /// Creates a new OrderRepository.
    pub fn new(pool: SqlitePool) -> Self {
        OrderRepository { pool }
    }

    /// Persists a cart as a pending order.
    ///
    /// ## Snapshot Pattern
    /// Titles, prices and discounts are copied from the cart lines, so the
    /// order stays correct when the catalog changes later. Totals come from
    /// the cart itself.
    ///
    /// ## Atomicity
    /// The order row and every item row commit together or not at all.
    pub async fn create(
        &self,
        user_id: &str,
        cart: &Cart,
        address: &DeliveryAddress,
        currency: Currency,
    ) -> DbResult<Order> {
        let totals = cart.totals();
        let now = Utc::now();

        let order = Order {
            id: generate_id(),
            user_id: user_id.to_string(),
            status: OrderStatus::Pending,
            subtotal_cents: totals.subtotal.cents(),
            discount_cents: totals.discount_total.cents(),
            delivery_fee_cents: totals.delivery_fee.cents(),
            total_cents: totals.total.cents(),
            currency: currency.code().to_string(),
            full_name: address.full_name.trim().to_string(),
            street: address.street.trim().to_string(),
            city: address.city.trim().to_string(),
            state: address.state.trim().to_string(),
            postal_code: address.postal_code.trim().to_string(),
            country: address.country.trim().to_string(),
            phone: address.phone.trim().to_string(),
            created_at: now,
            updated_at: now,
        };

        debug!(
            id = %order.id,
            user_id = %user_id,
            lines = cart.items.len(),
            total_cents = order.total_cents,
            "Creating order"
        );

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| DbError::TransactionFailed(e.to_string()))?;

        sqlx::query(
            r#"
            INSERT INTO orders (
                id, user_id, status,
                subtotal_cents, discount_cents, delivery_fee_cents, total_cents,
                currency, full_name, street, city, state, postal_code, country, phone,
                created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17)
            "#,
        )
        .bind(&order.id)
        .bind(&order.user_id)
        .bind(order.status)
        .bind(order.subtotal_cents)
        .bind(order.discount_cents)
        .bind(order.delivery_fee_cents)
        .bind(order.total_cents)
        .bind(&order.currency)
        .bind(&order.full_name)
        .bind(&order.street)
        .bind(&order.city)
        .bind(&order.state)
        .bind(&order.postal_code)
        .bind(&order.country)
        .bind(&order.phone)
        .bind(order.created_at)
        .bind(order.updated_at)
        .execute(&mut *tx)
        .await?;

        for line in &cart.items {
            let item = OrderItem::from_line(generate_id(), &order.id, line);

            sqlx::query(
                r#"
                INSERT INTO order_items (
                    id, order_id, product_id, title_snapshot, color,
                    unit_price_cents, discount_bps, quantity, line_total_cents
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
                "#,
            )
            .bind(&item.id)
            .bind(&item.order_id)
            .bind(&item.product_id)
            .bind(&item.title_snapshot)
            .bind(&item.color)
            .bind(item.unit_price_cents)
            .bind(item.discount_bps)
            .bind(item.quantity)
            .bind(item.line_total_cents)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit()
            .await
            .map_err(|e| DbError::TransactionFailed(e.to_string()))?;

        info!(id = %order.id, total_cents = order.total_cents, "Order created");
        Ok(order)
    }

    /// Gets an order by ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Order>> {
        let sql = format!("SELECT {ORDER_COLUMNS} FROM orders WHERE id = ?1");

        let order = sqlx::query_as::<_, Order>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(order)
    }

    /// Gets the items of an order.
    pub async fn items(&self, order_id: &str) -> DbResult<Vec<OrderItem>> {
        let items = sqlx::query_as::<_, OrderItem>(
            r#"
            SELECT id, order_id, product_id, title_snapshot, color,
                   unit_price_cents, discount_bps, quantity, line_total_cents
            FROM order_items
            WHERE order_id = ?1
            ORDER BY rowid
            "#,
        )
        .bind(order_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(items)
    }

    /// Lists a customer's orders, newest first.
    pub async fn list_for_user(&self, user_id: &str) -> DbResult<Vec<Order>> {
        let sql = format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE user_id = ?1 ORDER BY created_at DESC"
        );

        let orders = sqlx::query_as::<_, Order>(&sql)
            .bind(user_id)
            .fetch_all(&self.pool)
            .await?;

        Ok(orders)
    }

    /// Lists all orders, optionally by status, newest first.
    pub async fn list(
        &self,
        status: Option<OrderStatus>,
        limit: u32,
        offset: u32,
    ) -> DbResult<Vec<Order>> {
        let orders = match status {
            Some(status) => {
                let sql = format!(
                    "SELECT {ORDER_COLUMNS} FROM orders WHERE status = ?1 \
                     ORDER BY created_at DESC LIMIT ?2 OFFSET ?3"
                );
                sqlx::query_as::<_, Order>(&sql)
                    .bind(status)
                    .bind(limit)
                    .bind(offset)
                    .fetch_all(&self.pool)
                    .await?
            }
            None => {
                let sql = format!(
                    "SELECT {ORDER_COLUMNS} FROM orders ORDER BY created_at DESC LIMIT ?1 OFFSET ?2"
                );
                sqlx::query_as::<_, Order>(&sql)
                    .bind(limit)
                    .bind(offset)
                    .fetch_all(&self.pool)
                    .await?
            }
        };

        Ok(orders)
    }

    /// Sets the status of an order.
    pub async fn set_status(&self, id: &str, status: OrderStatus) -> DbResult<()> {
        debug!(id = %id, status = %status, "Updating order status");

        let result = sqlx::query("UPDATE orders SET status = ?2, updated_at = ?3 WHERE id = ?1")
            .bind(id)
            .bind(status)
            .bind(Utc::now())
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Order", id));
        }

        Ok(())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
