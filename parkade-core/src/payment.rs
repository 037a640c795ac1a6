use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::fee::Amount;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum PaymentMethod {
    #[default]
    Card,
    Cash,
    Mobile,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    Success,
    Failed,
}

/// What the payment provider is asked to collect for a booking.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentIntent {
    pub booking_id: String,
    pub amount: Amount,
    pub currency: String,
    pub method: PaymentMethod,
}

#[async_trait]
pub trait PaymentAdapter: Send + Sync {
    /// Collect the payment synchronously and report the outcome.
    async fn process_payment(
        &self,
        intent: &PaymentIntent,
    ) -> Result<PaymentStatus, Box<dyn std::error::Error + Send + Sync>>;
}
