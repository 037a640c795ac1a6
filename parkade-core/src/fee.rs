use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Money in whole currency units.
pub type Amount = i64;

/// Time-based parking tariff: every started block of `unit_minutes` costs
/// `unit_price`, and nothing is ever charged below `minimum_charge`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FeePolicy {
    pub unit_minutes: u32,
    pub unit_price: Amount,
    pub minimum_charge: Amount,
    pub currency: String,
}

impl Default for FeePolicy {
    fn default() -> Self {
        Self {
            unit_minutes: 30,
            unit_price: 1,
            minimum_charge: 1,
            currency: "USD".to_string(),
        }
    }
}

impl FeePolicy {
    /// Amount owed for parking from `started_at` until `evaluated_at`.
    ///
    /// Used for the live estimate (`evaluated_at = now`) as well as for the
    /// settled amount (`evaluated_at = paid_at`). A negative interval is
    /// clamped to zero, so the minimum charge still applies.
    pub fn compute_fee(&self, started_at: DateTime<Utc>, evaluated_at: DateTime<Utc>) -> Amount {
        let elapsed_ms = elapsed_millis(started_at, evaluated_at);
        let unit_ms = i64::from(self.unit_minutes.max(1)) * 60_000;

        let units = elapsed_ms / unit_ms + i64::from(elapsed_ms % unit_ms != 0);

        units
            .saturating_mul(self.unit_price)
            .max(self.minimum_charge)
    }
}

/// Fee under the default tariff ($1 per started half hour, $1 minimum).
pub fn compute_fee(started_at: DateTime<Utc>, evaluated_at: DateTime<Utc>) -> Amount {
    FeePolicy::default().compute_fee(started_at, evaluated_at)
}

/// Whole seconds parked, never negative. Drives the dashboards' running timer.
pub fn elapsed_seconds(started_at: DateTime<Utc>, evaluated_at: DateTime<Utc>) -> i64 {
    elapsed_millis(started_at, evaluated_at) / 1000
}

fn elapsed_millis(started_at: DateTime<Utc>, evaluated_at: DateTime<Utc>) -> i64 {
    (evaluated_at - started_at).num_milliseconds().max(0)
}
