use chrono::{DateTime, Utc};
use parkade_core::payment::{PaymentAdapter, PaymentIntent, PaymentMethod, PaymentStatus};
use parkade_core::Amount;
use std::sync::Arc;
use tracing::{info, warn};

use crate::manager::BookingError;
use crate::models::{Booking, Payment};

/// Collects payment for a booking through the configured provider and
/// turns the outcome into a payment record.
pub struct PaymentOrchestrator {
    adapter: Arc<dyn PaymentAdapter>,
    currency: String,
}

impl PaymentOrchestrator {
    pub fn new(adapter: Arc<dyn PaymentAdapter>, currency: impl Into<String>) -> Self {
        Self {
            adapter,
            currency: currency.into(),
        }
    }

    pub fn currency(&self) -> &str {
        &self.currency
    }

    /// Returns a record for both accepted and declined payments. Provider
    /// errors (nothing was collected either way) come back as `Err`.
    pub async fn collect(
        &self,
        booking: &Booking,
        amount: Amount,
        method: PaymentMethod,
        at: DateTime<Utc>,
    ) -> Result<Payment, BookingError> {
        let intent = PaymentIntent {
            booking_id: booking.id.clone(),
            amount,
            currency: self.currency.clone(),
            method,
        };

        let status = self
            .adapter
            .process_payment(&intent)
            .await
            .map_err(|e| BookingError::PaymentProvider(e.to_string()))?;

        match status {
            PaymentStatus::Success => info!(
                "Collected {} {} for booking {} via {:?}",
                amount, self.currency, booking.id, method
            ),
            PaymentStatus::Failed => warn!("Payment for booking {} was declined", booking.id),
        }

        Ok(Payment::new(booking.id.clone(), amount, method, status, at))
    }
}

/// Accepts every payment. Stands in for a real provider.
pub struct MockPaymentAdapter;

#[async_trait::async_trait]
impl PaymentAdapter for MockPaymentAdapter {
    async fn process_payment(
        &self,
        _intent: &PaymentIntent,
    ) -> Result<PaymentStatus, Box<dyn std::error::Error + Send + Sync>> {
        Ok(PaymentStatus::Success)
    }
}
