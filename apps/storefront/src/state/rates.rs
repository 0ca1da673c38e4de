//! # Rates State
//!
//! The exchange rates in use and the currency prices are shown in.
//!
//! Rates are loaded from the data service at startup and replaced after an
//! admin update. Readers copy the rate set out, so a conversion never sees
//! a half-written update.

use souq_core::{Currency, ExchangeRateSet};
use souq_db::{Database, DbError, DbResult};
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

/// Current rates and display currency.
#[derive(Debug)]
pub struct RatesState {
    rates: RwLock<ExchangeRateSet>,
    currency: RwLock<Currency>,
}

impl RatesState {
    pub fn new(rates: ExchangeRateSet, currency: Currency) -> Self {
        RatesState {
            rates: RwLock::new(rates),
            currency: RwLock::new(currency),
        }
    }

    /// Snapshot of the current rates.
    pub async fn rates(&self) -> ExchangeRateSet {
        *self.rates.read().await
    }

    /// Replaces the rates. Callers validate first.
    pub async fn set_rates(&self, rates: ExchangeRateSet) {
        *self.rates.write().await = rates;
        debug!(?rates, "Exchange rates replaced");
    }

    pub async fn currency(&self) -> Currency {
        *self.currency.read().await
    }

    pub async fn set_currency(&self, currency: Currency) {
        *self.currency.write().await = currency;
    }

    /// Rates and currency in one read, for formatting responses.
    pub async fn snapshot(&self) -> (ExchangeRateSet, Currency) {
        (self.rates().await, self.currency().await)
    }

    /// Reloads rates from the database.
    ///
    /// Keeps the current rates when none are stored yet, or when the stored
    /// row is not a valid rate set.
    pub async fn refresh(&self, db: &Database) -> DbResult<ExchangeRateSet> {
        let stored = match db.currency_rates().get().await {
            Ok(stored) => stored,
            Err(DbError::ConstraintViolation { message }) => {
                warn!(%message, "Ignoring stored exchange rates");
                return Ok(self.rates().await);
            }
            Err(e) => return Err(e),
        };

        match stored {
            Some(stored) => {
                self.set_rates(stored).await;
                info!(
                    usd_to_iqd = stored.usd_to_iqd,
                    sar_to_iqd = stored.sar_to_iqd,
                    usd_to_sar = stored.usd_to_sar,
                    "Exchange rates loaded"
                );
                Ok(stored)
            }
            None => {
                let current = self.rates().await;
                debug!("No stored exchange rates, keeping defaults");
                Ok(current)
            }
        }
    }
}

impl Default for RatesState {
    fn default() -> Self {
        RatesState::new(ExchangeRateSet::default(), Currency::Usd)
    }
}
