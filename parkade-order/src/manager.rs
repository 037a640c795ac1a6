use chrono::{DateTime, Utc};
use parkade_catalog::{LedgerError, SlotLedger};
use parkade_core::fee::elapsed_seconds;
use parkade_core::payment::PaymentMethod;
use parkade_core::repository::{keys, load_document, save_document};
use parkade_core::{FeePolicy, KeyValueStore, Requester, StoreError};
use parkade_shared::pii::Masked;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{error, info, warn};

use crate::models::{Booking, BookingFilter, BookingsFile, FeeEstimate, Payment, PaymentsFile, Settlement};
use crate::orchestrator::PaymentOrchestrator;

/// Bounded retry for the writes that follow a collected payment.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub attempts: u32,
    pub backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: 3,
            backoff: Duration::from_millis(50),
        }
    }
}

/// The write that could not be completed after money or a slot changed hands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconciliationStep {
    RecordPayment,
    MarkPaid,
    ReleaseSlot,
    RollbackClaim,
}

impl fmt::Display for ReconciliationStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::RecordPayment => "record payment",
            Self::MarkPaid => "mark booking paid",
            Self::ReleaseSlot => "release slot",
            Self::RollbackClaim => "roll back slot claim",
        };
        f.write_str(name)
    }
}

/// Owns the booking and payment documents and drives the
/// Created -> Paid transition.
///
/// Lock order is bookings -> payments -> ledger.
pub struct BookingManager {
    store: Arc<dyn KeyValueStore>,
    ledger: Arc<SlotLedger>,
    orchestrator: PaymentOrchestrator,
    policy: FeePolicy,
    retry: RetryPolicy,
    bookings: RwLock<Vec<Booking>>,
    payments: RwLock<Vec<Payment>>,
}

impl BookingManager {
    pub async fn load(
        store: Arc<dyn KeyValueStore>,
        ledger: Arc<SlotLedger>,
        orchestrator: PaymentOrchestrator,
        policy: FeePolicy,
        retry: RetryPolicy,
    ) -> Result<Self, BookingError> {
        let bookings: BookingsFile = load_document(store.as_ref(), keys::BOOKINGS).await?;
        let payments: PaymentsFile = load_document(store.as_ref(), keys::PAYMENTS).await?;

        info!(
            "Booking manager loaded {} bookings and {} payments",
            bookings.bookings.len(),
            payments.payments.len()
        );

        Ok(Self {
            store,
            ledger,
            orchestrator,
            policy,
            retry,
            bookings: RwLock::new(bookings.bookings),
            payments: RwLock::new(payments.payments),
        })
    }

    pub fn policy(&self) -> &FeePolicy {
        &self.policy
    }

    // ------------------------------------------------------------------
    // Transitions
    // ------------------------------------------------------------------

    /// Claims the slot and records a `Created` booking. The claim is rolled
    /// back if the booking cannot be persisted.
    pub async fn create(
        &self,
        requester: &Requester,
        location_id: &str,
        slot_number: u32,
        created_at: DateTime<Utc>,
    ) -> Result<Booking, BookingError> {
        let location = self.ledger.location(location_id).await?;

        let mut bookings = self.bookings.write().await;
        self.ledger.claim(location_id, slot_number).await?;

        let booking = Booking::new(requester, location.id, location.name, slot_number, created_at);
        let mut next = bookings.clone();
        next.push(booking.clone());

        if let Err(e) = self.persist_bookings(&next).await {
            warn!(
                "Could not persist booking for slot {} at {}, releasing claim: {}",
                slot_number, location_id, e
            );
            self.with_retry(
                ReconciliationStep::RollbackClaim,
                || self.ledger.mark_free(location_id, slot_number),
                is_ledger_write_failure,
            )
            .await
            .map_err(|release| {
                error!(
                    "Slot {} at {} is held by an unrecorded booking: {}",
                    slot_number, location_id, release
                );
                BookingError::Reconciliation {
                    booking_id: booking.id.clone(),
                    step: ReconciliationStep::RollbackClaim,
                    reason: release.to_string(),
                }
            })?;
            return Err(e.into());
        }

        *bookings = next;
        info!(
            "Booking {} created for {} at {} slot {}",
            booking.id,
            Masked(booking.user_email.as_str()),
            booking.location_id,
            booking.slot_number
        );
        Ok(booking)
    }

    /// Created -> Paid. Charges the fee accrued up to `evaluated_at` and
    /// frees the slot.
    ///
    /// Once the payment has been collected every remaining step is attempted;
    /// if any of them still fails after retries the first failure surfaces as
    /// `Reconciliation` and the in-memory state keeps the booking paid.
    pub async fn settle(
        &self,
        booking_id: &str,
        evaluated_at: DateTime<Utc>,
        method: PaymentMethod,
    ) -> Result<Settlement, BookingError> {
        let mut bookings = self.bookings.write().await;
        let index = bookings
            .iter()
            .position(|b| b.id == booking_id && !b.paid)
            .ok_or_else(|| BookingError::BookingNotFound(booking_id.to_string()))?;

        let mut booking = bookings[index].clone();
        let amount = self.policy.compute_fee(booking.created_at, evaluated_at);

        let payment = self.orchestrator.collect(&booking, amount, method, evaluated_at).await?;
        if !payment.succeeded() {
            if let Err(e) = self.record_payment(&payment).await {
                warn!("Could not record declined payment for booking {}: {}", booking_id, e);
            }
            return Err(BookingError::PaymentDeclined(booking_id.to_string()));
        }

        let mut failure: Option<(ReconciliationStep, String)> = None;

        if let Err(e) = self
            .with_retry(
                ReconciliationStep::RecordPayment,
                || self.record_payment(&payment),
                |_: &StoreError| true,
            )
            .await
        {
            failure.get_or_insert((ReconciliationStep::RecordPayment, e.to_string()));
        }

        booking.mark_paid(evaluated_at);
        bookings[index] = booking.clone();
        let snapshot: &[Booking] = &bookings;
        if let Err(e) = self
            .with_retry(
                ReconciliationStep::MarkPaid,
                || self.persist_bookings(snapshot),
                |_: &StoreError| true,
            )
            .await
        {
            failure.get_or_insert((ReconciliationStep::MarkPaid, e.to_string()));
        }

        // The slot may have been freed by an admin and booked again since.
        let holder = snapshot
            .iter()
            .find(|b| !b.paid && b.location_id == booking.location_id && b.slot_number == booking.slot_number);
        if let Some(holder) = holder {
            warn!(
                "Slot {}-{} is now held by booking {}, leaving it occupied",
                booking.location_id, booking.slot_number, holder.id
            );
        } else {
            match self
                .with_retry(
                    ReconciliationStep::ReleaseSlot,
                    || self.ledger.mark_free(&booking.location_id, booking.slot_number),
                    is_ledger_write_failure,
                )
                .await
            {
                Ok(()) => {}
                Err(e @ (LedgerError::SlotNotFound { .. } | LedgerError::LocationNotFound(_))) => {
                    warn!("Nothing to release for booking {}: {}", booking_id, e);
                }
                Err(e) => {
                    failure.get_or_insert((ReconciliationStep::ReleaseSlot, e.to_string()));
                }
            }
        }

        if let Some((step, reason)) = failure {
            error!(
                "Booking {} was charged {} but could not {}: {}",
                booking_id, amount, step, reason
            );
            return Err(BookingError::Reconciliation {
                booking_id: booking_id.to_string(),
                step,
                reason,
            });
        }

        info!(
            "Booking {} settled for {} {} ({} s)",
            booking_id,
            amount,
            self.policy.currency,
            elapsed_seconds(booking.created_at, evaluated_at)
        );

        Ok(Settlement {
            booking,
            payment,
            amount,
            currency: self.orchestrator.currency().to_string(),
        })
    }

    // ------------------------------------------------------------------
    // Reads
    // ------------------------------------------------------------------

    pub async fn get(&self, booking_id: &str) -> Option<Booking> {
        self.bookings.read().await.iter().find(|b| b.id == booking_id).cloned()
    }

    /// Unpaid bookings are charged up to `at`; paid ones report what they
    /// settled for.
    pub async fn estimate(&self, booking_id: &str, at: DateTime<Utc>) -> Result<FeeEstimate, BookingError> {
        let booking = self
            .get(booking_id)
            .await
            .ok_or_else(|| BookingError::BookingNotFound(booking_id.to_string()))?;

        let until = booking.paid_at.filter(|_| booking.paid).unwrap_or(at);

        Ok(FeeEstimate {
            amount: self.policy.compute_fee(booking.created_at, until),
            elapsed_seconds: elapsed_seconds(booking.created_at, until),
            currency: self.policy.currency.clone(),
            paid: booking.paid,
            evaluated_at: until,
            booking_id: booking.id,
        })
    }

    pub async fn list_all(&self) -> Vec<Booking> {
        self.bookings.read().await.clone()
    }

    pub async fn list_unpaid(&self) -> Vec<Booking> {
        self.search(&BookingFilter {
            unpaid_only: true,
            query: None,
        })
        .await
    }

    pub async fn list_for(&self, email: &str) -> Vec<Booking> {
        self.bookings
            .read()
            .await
            .iter()
            .filter(|b| b.user_email.eq_ignore_ascii_case(email))
            .cloned()
            .collect()
    }

    pub async fn search(&self, filter: &BookingFilter) -> Vec<Booking> {
        self.bookings
            .read()
            .await
            .iter()
            .filter(|b| filter.matches(b))
            .cloned()
            .collect()
    }

    pub async fn payments(&self) -> Vec<Payment> {
        self.payments.read().await.clone()
    }

    // ------------------------------------------------------------------
    // Persistence
    // ------------------------------------------------------------------

    async fn persist_bookings(&self, bookings: &[Booking]) -> Result<(), StoreError> {
        let file = BookingsFile {
            bookings: bookings.to_vec(),
        };
        save_document(self.store.as_ref(), keys::BOOKINGS, &file).await
    }

    async fn record_payment(&self, payment: &Payment) -> Result<(), StoreError> {
        let mut payments = self.payments.write().await;
        let mut next = payments.clone();
        next.push(payment.clone());
        save_document(self.store.as_ref(), keys::PAYMENTS, &PaymentsFile { payments: next.clone() }).await?;
        *payments = next;
        Ok(())
    }

    async fn with_retry<T, E, F, Fut>(
        &self,
        step: ReconciliationStep,
        mut op: F,
        retryable: impl Fn(&E) -> bool,
    ) -> Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: fmt::Display,
    {
        let attempts = self.retry.attempts.max(1);
        let mut attempt = 1;
        loop {
            match op().await {
                Ok(value) => return Ok(value),
                Err(e) if attempt < attempts && retryable(&e) => {
                    warn!("Could not {} (attempt {}/{}): {}", step, attempt, attempts, e);
                    tokio::time::sleep(self.retry.backoff * attempt).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

fn is_ledger_write_failure(e: &LedgerError) -> bool {
    matches!(e, LedgerError::Persistence(_))
}

#[derive(Debug, thiserror::Error)]
pub enum BookingError {
    #[error("Booking not found or already settled: {0}")]
    BookingNotFound(String),

    #[error(transparent)]
    Ledger(#[from] LedgerError),

    #[error("Payment declined for booking {0}")]
    PaymentDeclined(String),

    #[error("Payment provider error: {0}")]
    PaymentProvider(String),

    #[error("Persistence failure: {0}")]
    Persistence(#[from] StoreError),

    #[error("Booking {booking_id} needs reconciliation: could not {step}: {reason}")]
    Reconciliation {
        booking_id: String,
        step: ReconciliationStep,
        reason: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::orchestrator::MockPaymentAdapter;
    use chrono::{Duration as ChronoDuration, TimeZone};
    use parkade_catalog::{LedgerOptions, NewLocation};
    use parkade_core::payment::{PaymentAdapter, PaymentIntent, PaymentStatus};
    use parkade_store::{EventPublisher, MemoryStore};

    struct DecliningAdapter;

    #[async_trait::async_trait]
    impl PaymentAdapter for DecliningAdapter {
        async fn process_payment(
            &self,
            _intent: &PaymentIntent,
        ) -> Result<PaymentStatus, Box<dyn std::error::Error + Send + Sync>> {
            Ok(PaymentStatus::Failed)
        }
    }

    struct Harness {
        store: Arc<MemoryStore>,
        ledger: Arc<SlotLedger>,
        manager: Arc<BookingManager>,
        location_id: String,
    }

    fn fast_retry() -> RetryPolicy {
        RetryPolicy {
            attempts: 3,
            backoff: Duration::from_millis(1),
        }
    }

    async fn harness_with(adapter: Arc<dyn PaymentAdapter>) -> Harness {
        let store = Arc::new(MemoryStore::new());
        let ledger = Arc::new(
            SlotLedger::load(store.clone(), EventPublisher::default(), LedgerOptions::default())
                .await
                .unwrap(),
        );
        let location_id = ledger
            .create_location(NewLocation {
                name: "Downtown".to_string(),
                address: "1 Main St".to_string(),
                total_slots: 10,
                map_url: None,
            })
            .await
            .unwrap()
            .id;
        let manager = BookingManager::load(
            store.clone(),
            ledger.clone(),
            PaymentOrchestrator::new(adapter, "USD"),
            FeePolicy::default(),
            fast_retry(),
        )
        .await
        .unwrap();

        Harness {
            store,
            ledger,
            manager: Arc::new(manager),
            location_id,
        }
    }

    async fn harness() -> Harness {
        harness_with(Arc::new(MockPaymentAdapter)).await
    }

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 9, 0, 0).unwrap()
    }

    fn alice() -> Requester {
        Requester {
            email: "alice@example.com".to_string(),
            name: Some("Alice".to_string()),
            role: parkade_core::Role::User,
        }
    }

    #[tokio::test]
    async fn test_book_then_settle_after_45_minutes() {
        let h = harness().await;

        let booking = h.manager.create(&alice(), &h.location_id, 3, t0()).await.unwrap();
        assert!(!booking.paid);
        assert_eq!(booking.location_name, "Downtown");
        assert!(!h.ledger.list_free(&h.location_id).await.unwrap().contains(&3));

        let settlement = h
            .manager
            .settle(&booking.id, t0() + ChronoDuration::minutes(45), PaymentMethod::Card)
            .await
            .unwrap();

        assert_eq!(settlement.amount, 2);
        assert!(settlement.booking.paid);
        assert_eq!(settlement.booking.paid_at, Some(t0() + ChronoDuration::minutes(45)));
        assert!(h.ledger.list_free(&h.location_id).await.unwrap().contains(&3));

        let payments = h.manager.payments().await;
        assert_eq!(payments.len(), 1);
        assert_eq!(payments[0].amount, 2);
        assert_eq!(payments[0].booking_id, booking.id);
        assert!(h.manager.list_unpaid().await.is_empty());
    }

    #[tokio::test]
    async fn test_two_slot_downtown_scenario() {
        let h = harness().await;
        let downtown = h
            .ledger
            .create_location(NewLocation {
                name: "Downtown".to_string(),
                address: "2 Main St".to_string(),
                total_slots: 2,
                map_url: None,
            })
            .await
            .unwrap()
            .id;

        let booking = h.manager.create(&alice(), &downtown, 1, t0()).await.unwrap();
        assert_eq!(h.ledger.list_free(&downtown).await.unwrap(), vec![2]);

        let settlement = h
            .manager
            .settle(&booking.id, t0() + ChronoDuration::minutes(45), PaymentMethod::Card)
            .await
            .unwrap();
        assert_eq!(settlement.amount, 2);
        assert_eq!(h.ledger.list_free(&downtown).await.unwrap(), vec![1, 2]);
    }

    #[tokio::test]
    async fn test_settle_twice_is_rejected() {
        let h = harness().await;
        let booking = h.manager.create(&alice(), &h.location_id, 1, t0()).await.unwrap();

        h.manager.settle(&booking.id, t0(), PaymentMethod::Cash).await.unwrap();
        let second = h.manager.settle(&booking.id, t0(), PaymentMethod::Cash).await;

        assert!(matches!(second, Err(BookingError::BookingNotFound(_))));
        assert_eq!(h.manager.payments().await.len(), 1);
    }

    #[tokio::test]
    async fn test_settle_immediately_charges_minimum() {
        let h = harness().await;
        let booking = h.manager.create(&alice(), &h.location_id, 1, t0()).await.unwrap();
        let settlement = h.manager.settle(&booking.id, t0(), PaymentMethod::Card).await.unwrap();
        assert_eq!(settlement.amount, 1);
    }

    #[tokio::test]
    async fn test_occupied_slot_is_unavailable() {
        let h = harness().await;
        h.manager.create(&alice(), &h.location_id, 4, t0()).await.unwrap();

        let result = h.manager.create(&Requester::user("bob@example.com"), &h.location_id, 4, t0()).await;
        assert!(matches!(
            result,
            Err(BookingError::Ledger(LedgerError::SlotUnavailable { slot_number: 4, .. }))
        ));
        assert_eq!(h.manager.list_all().await.len(), 1);
    }

    #[tokio::test]
    async fn test_unknown_location_and_slot() {
        let h = harness().await;

        let result = h.manager.create(&alice(), "loc_99", 1, t0()).await;
        assert!(matches!(result, Err(BookingError::Ledger(LedgerError::LocationNotFound(_)))));

        let result = h.manager.create(&alice(), &h.location_id, 11, t0()).await;
        assert!(matches!(result, Err(BookingError::Ledger(LedgerError::SlotNotFound { .. }))));
    }

    #[tokio::test]
    async fn test_failed_booking_write_releases_claim() {
        let h = harness().await;
        h.store.fail_next_writes(keys::BOOKINGS, 1).await;

        let result = h.manager.create(&alice(), &h.location_id, 5, t0()).await;

        assert!(matches!(result, Err(BookingError::Persistence(_))));
        assert!(h.ledger.list_free(&h.location_id).await.unwrap().contains(&5));
        assert!(h.manager.list_all().await.is_empty());
    }

    #[tokio::test]
    async fn test_transient_write_failure_is_retried() {
        let h = harness().await;
        let booking = h.manager.create(&alice(), &h.location_id, 2, t0()).await.unwrap();
        h.store.fail_next_writes(keys::BOOKINGS, 2).await;

        let settlement = h.manager.settle(&booking.id, t0(), PaymentMethod::Card).await.unwrap();
        assert!(settlement.booking.paid);

        let stored: BookingsFile = load_document(h.store.as_ref(), keys::BOOKINGS).await.unwrap();
        assert!(stored.bookings[0].paid);
    }

    #[tokio::test]
    async fn test_persistent_write_failure_needs_reconciliation() {
        let h = harness().await;
        let booking = h.manager.create(&alice(), &h.location_id, 2, t0()).await.unwrap();
        h.store.fail_next_writes(keys::BOOKINGS, 3).await;

        let result = h.manager.settle(&booking.id, t0(), PaymentMethod::Card).await;
        assert!(matches!(
            result,
            Err(BookingError::Reconciliation { step: ReconciliationStep::MarkPaid, .. })
        ));

        // Money was taken: the booking is paid in memory and cannot be charged again.
        assert!(h.manager.get(&booking.id).await.unwrap().paid);
        assert!(h.ledger.list_free(&h.location_id).await.unwrap().contains(&2));
        let again = h.manager.settle(&booking.id, t0(), PaymentMethod::Card).await;
        assert!(matches!(again, Err(BookingError::BookingNotFound(_))));

        // The next successful write carries the paid state to disk.
        h.manager.create(&alice(), &h.location_id, 7, t0()).await.unwrap();
        let stored: BookingsFile = load_document(h.store.as_ref(), keys::BOOKINGS).await.unwrap();
        assert!(stored.bookings.iter().any(|b| b.id == booking.id && b.paid));
    }

    #[tokio::test]
    async fn test_settle_after_location_removed() {
        let h = harness().await;
        let booking = h.manager.create(&alice(), &h.location_id, 6, t0()).await.unwrap();
        h.ledger.remove_location(&h.location_id).await.unwrap();

        let settlement = h.manager.settle(&booking.id, t0(), PaymentMethod::Card).await.unwrap();
        assert!(settlement.booking.paid);
        assert_eq!(settlement.booking.location_name, "Downtown");
    }

    #[tokio::test]
    async fn test_settle_leaves_slot_rebooked_after_admin_release() {
        let h = harness().await;
        let first = h.manager.create(&alice(), &h.location_id, 1, t0()).await.unwrap();

        h.ledger.set_occupancy(&h.location_id, 1, false).await.unwrap();
        let second = h
            .manager
            .create(&Requester::user("bob@example.com"), &h.location_id, 1, t0())
            .await
            .unwrap();

        h.manager.settle(&first.id, t0(), PaymentMethod::Card).await.unwrap();
        assert!(!h.ledger.list_free(&h.location_id).await.unwrap().contains(&1));

        let third = h
            .manager
            .create(&Requester::user("carol@example.com"), &h.location_id, 1, t0())
            .await;
        assert!(matches!(
            third,
            Err(BookingError::Ledger(LedgerError::SlotUnavailable { slot_number: 1, .. }))
        ));

        let holders: Vec<String> = h
            .manager
            .list_unpaid()
            .await
            .into_iter()
            .filter(|b| b.slot_number == 1)
            .map(|b| b.id)
            .collect();
        assert_eq!(holders, vec![second.id.clone()]);

        h.manager.settle(&second.id, t0(), PaymentMethod::Card).await.unwrap();
        assert!(h.ledger.list_free(&h.location_id).await.unwrap().contains(&1));
    }

    #[tokio::test]
    async fn test_declined_payment_keeps_booking_open() {
        let h = harness_with(Arc::new(DecliningAdapter)).await;
        let booking = h.manager.create(&alice(), &h.location_id, 8, t0()).await.unwrap();

        let result = h.manager.settle(&booking.id, t0(), PaymentMethod::Card).await;

        assert!(matches!(result, Err(BookingError::PaymentDeclined(_))));
        assert!(!h.manager.get(&booking.id).await.unwrap().paid);
        assert!(!h.ledger.list_free(&h.location_id).await.unwrap().contains(&8));
        let payments = h.manager.payments().await;
        assert_eq!(payments.len(), 1);
        assert_eq!(payments[0].status, PaymentStatus::Failed);
    }

    #[tokio::test]
    async fn test_estimate() {
        let h = harness().await;
        let booking = h.manager.create(&alice(), &h.location_id, 1, t0()).await.unwrap();

        let live = h.manager.estimate(&booking.id, t0() + ChronoDuration::minutes(61)).await.unwrap();
        assert_eq!(live.amount, 3);
        assert_eq!(live.elapsed_seconds, 61 * 60);
        assert!(!live.paid);

        h.manager
            .settle(&booking.id, t0() + ChronoDuration::minutes(30), PaymentMethod::Card)
            .await
            .unwrap();
        let settled = h.manager.estimate(&booking.id, t0() + ChronoDuration::hours(5)).await.unwrap();
        assert_eq!(settled.amount, 1);
        assert_eq!(settled.elapsed_seconds, 30 * 60);
        assert!(settled.paid);

        assert!(matches!(
            h.manager.estimate("booking_missing", t0()).await,
            Err(BookingError::BookingNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_concurrent_creates_single_winner() {
        let h = harness().await;

        let mut handles = Vec::new();
        for i in 0..12 {
            let manager = h.manager.clone();
            let location_id = h.location_id.clone();
            handles.push(tokio::spawn(async move {
                let requester = Requester::user(format!("driver{}@example.com", i));
                manager.create(&requester, &location_id, 9, t0()).await
            }));
        }

        let mut wins = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(_) => wins += 1,
                Err(BookingError::Ledger(LedgerError::SlotUnavailable { .. })) => {}
                Err(e) => panic!("unexpected error: {}", e),
            }
        }
        assert_eq!(wins, 1);
        assert_eq!(h.manager.list_all().await.len(), 1);
    }

    #[tokio::test]
    async fn test_reload_from_store() {
        let h = harness().await;
        let booking = h.manager.create(&alice(), &h.location_id, 1, t0()).await.unwrap();
        h.manager.settle(&booking.id, t0(), PaymentMethod::Mobile).await.unwrap();
        h.manager.create(&alice(), &h.location_id, 2, t0()).await.unwrap();

        let reloaded = BookingManager::load(
            h.store.clone(),
            h.ledger.clone(),
            PaymentOrchestrator::new(Arc::new(MockPaymentAdapter), "USD"),
            FeePolicy::default(),
            fast_retry(),
        )
        .await
        .unwrap();

        assert_eq!(reloaded.list_all().await.len(), 2);
        assert_eq!(reloaded.list_unpaid().await.len(), 1);
        assert_eq!(reloaded.payments().await.len(), 1);
    }

    #[tokio::test]
    async fn test_list_for_and_search() {
        let h = harness().await;
        h.manager.create(&alice(), &h.location_id, 1, t0()).await.unwrap();
        h.manager
            .create(&Requester::user("bob@example.com"), &h.location_id, 2, t0())
            .await
            .unwrap();

        assert_eq!(h.manager.list_for("ALICE@example.com").await.len(), 1);

        let found = h
            .manager
            .search(&BookingFilter {
                unpaid_only: true,
                query: Some("bob".to_string()),
            })
            .await;
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].slot_number, 2);
    }
}
