use parkade_catalog::{LedgerOptions, SlotLedger};
use parkade_core::KeyValueStore;
use parkade_order::{BookingManager, FinancialManager, MockPaymentAdapter, PaymentOrchestrator, RetryPolicy};
use parkade_store::app_config::BusinessRules;
use parkade_store::EventPublisher;
use std::sync::Arc;
use std::time::Duration;

#[derive(Clone)]
pub struct AuthConfig {
    pub secret: String,
}

#[derive(Clone)]
pub struct AppState {
    pub ledger: Arc<SlotLedger>,
    pub bookings: Arc<BookingManager>,
    pub finance: Arc<FinancialManager>,
    pub events: EventPublisher,
    pub auth: AuthConfig,
}

impl AppState {
    /// Loads the ledger and booking documents from `store` and wires the
    /// managers together.
    pub async fn load(
        store: Arc<dyn KeyValueStore>,
        rules: &BusinessRules,
        auth: AuthConfig,
    ) -> anyhow::Result<Self> {
        let events = EventPublisher::default();
        let ledger = Arc::new(
            SlotLedger::load(
                store.clone(),
                events.clone(),
                LedgerOptions {
                    allow_destructive_shrink: rules.allow_destructive_shrink,
                    max_slots_per_location: rules.max_slots_per_location,
                },
            )
            .await?,
        );

        let policy = rules.fee_policy();
        let bookings = BookingManager::load(
            store,
            ledger.clone(),
            PaymentOrchestrator::new(Arc::new(MockPaymentAdapter), policy.currency.clone()),
            policy.clone(),
            RetryPolicy {
                attempts: rules.settle_retry_attempts,
                backoff: Duration::from_millis(rules.settle_retry_backoff_ms),
            },
        )
        .await?;

        Ok(Self {
            ledger,
            bookings: Arc::new(bookings),
            finance: Arc::new(FinancialManager::new(policy)),
            events,
            auth,
        })
    }
}
