//! # Currency Rate Repository
//!
//! The `currency_rates` table holds exactly one row (`id = 1`) with the three
//! admin-maintained rates.

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::{debug, warn};

use crate::error::{DbError, DbResult};
use souq_core::ExchangeRateSet;

/// Repository for the exchange rate row.
#[derive(Debug, Clone)]
pub struct CurrencyRateRepository {
    pool: SqlitePool,
}

impl CurrencyRateRepository {
    /// Creates a new CurrencyRateRepository.
    pub fn new(pool: SqlitePool) -> Self {
        CurrencyRateRepository { pool }
    }

    /// Reads the stored rates; `None` until an admin (or the seed) saves them.
    ///
    /// A stored row that is not positive and finite is reported as
    /// `ConstraintViolation`, never returned.
    pub async fn get(&self) -> DbResult<Option<ExchangeRateSet>> {
        let row: Option<(f64, f64, f64)> = sqlx::query_as(
            "SELECT usd_to_iqd, sar_to_iqd, usd_to_sar FROM currency_rates WHERE id = 1",
        )
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some((usd_to_iqd, sar_to_iqd, usd_to_sar)) => {
                let rates = ExchangeRateSet::new(usd_to_iqd, sar_to_iqd, usd_to_sar)
                    .map_err(|e| {
                        warn!(error = %e, "Stored currency rates are invalid");
                        DbError::ConstraintViolation {
                            message: format!("invalid stored rates: {e}"),
                        }
                    })?;
                Ok(Some(rates))
            }
            None => Ok(None),
        }
    }

    /// Inserts or replaces the rate row.
    pub async fn upsert(&self, rates: &ExchangeRateSet, updated_by: Option<&str>) -> DbResult<()> {
        debug!(
            usd_to_iqd = rates.usd_to_iqd,
            sar_to_iqd = rates.sar_to_iqd,
            usd_to_sar = rates.usd_to_sar,
            "Saving currency rates"
        );

        sqlx::query(
            r#"
            INSERT INTO currency_rates (id, usd_to_iqd, sar_to_iqd, usd_to_sar, updated_at, updated_by)
            VALUES (1, ?1, ?2, ?3, ?4, ?5)
            ON CONFLICT (id) DO UPDATE SET
                usd_to_iqd = excluded.usd_to_iqd,
                sar_to_iqd = excluded.sar_to_iqd,
                usd_to_sar = excluded.usd_to_sar,
                updated_at = excluded.updated_at,
                updated_by = excluded.updated_by
            "#,
        )
        .bind(rates.usd_to_iqd)
        .bind(rates.sar_to_iqd)
        .bind(rates.usd_to_sar)
        .bind(Utc::now())
        .bind(updated_by)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}
