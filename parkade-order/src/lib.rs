pub mod finance;
pub mod manager;
pub mod models;
pub mod orchestrator;

pub use finance::{BookingSummary, DailyIncome, FinancialManager};
pub use manager::{BookingError, BookingManager, ReconciliationStep, RetryPolicy};
pub use models::{Booking, BookingFilter, BookingStatus, FeeEstimate, Payment, Settlement};
pub use orchestrator::{MockPaymentAdapter, PaymentOrchestrator};
