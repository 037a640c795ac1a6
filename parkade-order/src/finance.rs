use chrono::{DateTime, Datelike, NaiveDate, Utc};
use parkade_core::{Amount, FeePolicy};
use serde::Serialize;

use crate::models::{Booking, Payment};

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BookingSummary {
    pub total: usize,
    pub paid: usize,
    pub unpaid: usize,
    pub paid_percent: u32,
    pub unpaid_percent: u32,
    /// Settled fees of paid bookings.
    pub income: Amount,
    /// What unpaid bookings would owe if settled now.
    pub outstanding: Amount,
    pub successful_payments: usize,
    pub payment_revenue: Amount,
    pub currency: String,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DailyIncome {
    pub date: NaiveDate,
    pub day: u32,
    pub income: Amount,
    pub settled: usize,
}

/// Revenue and occupancy reporting over booking and payment history.
pub struct FinancialManager {
    policy: FeePolicy,
}

impl FinancialManager {
    pub fn new(policy: FeePolicy) -> Self {
        Self { policy }
    }

    /// Fee a paid booking settled for, recomputed from its timestamps.
    fn settled_fee(&self, booking: &Booking) -> Option<Amount> {
        booking
            .paid_at
            .filter(|_| booking.paid)
            .map(|paid_at| self.policy.compute_fee(booking.created_at, paid_at))
    }

    pub fn summary(&self, bookings: &[Booking], payments: &[Payment], now: DateTime<Utc>) -> BookingSummary {
        let total = bookings.len();
        let paid = bookings.iter().filter(|b| b.paid).count();
        let unpaid = total - paid;

        let paid_percent = if total == 0 {
            0
        } else {
            (paid as f64 / total as f64 * 100.0).round() as u32
        };
        let unpaid_percent = if total == 0 { 0 } else { 100 - paid_percent };

        let income = bookings.iter().filter_map(|b| self.settled_fee(b)).sum();
        let outstanding = bookings
            .iter()
            .filter(|b| !b.paid)
            .map(|b| self.policy.compute_fee(b.created_at, now))
            .sum();

        let successful: Vec<&Payment> = payments.iter().filter(|p| p.succeeded()).collect();

        BookingSummary {
            total,
            paid,
            unpaid,
            paid_percent,
            unpaid_percent,
            income,
            outstanding,
            successful_payments: successful.len(),
            payment_revenue: successful.iter().map(|p| p.amount).sum(),
            currency: self.policy.currency.clone(),
        }
    }

    /// One bucket per UTC calendar day of the month. `None` for an invalid month.
    pub fn daily_income(&self, bookings: &[Booking], year: i32, month: u32) -> Option<Vec<DailyIncome>> {
        let first = NaiveDate::from_ymd_opt(year, month, 1)?;
        let next = if month == 12 {
            NaiveDate::from_ymd_opt(year + 1, 1, 1)?
        } else {
            NaiveDate::from_ymd_opt(year, month + 1, 1)?
        };

        let mut days: Vec<DailyIncome> = first
            .iter_days()
            .take_while(|d| *d < next)
            .map(|date| DailyIncome {
                date,
                day: date.day(),
                income: 0,
                settled: 0,
            })
            .collect();

        for booking in bookings {
            let (Some(paid_at), Some(fee)) = (booking.paid_at, self.settled_fee(booking)) else {
                continue;
            };
            let date = paid_at.date_naive();
            if date.year() != year || date.month() != month {
                continue;
            }
            let bucket = &mut days[date.day0() as usize];
            bucket.income += fee;
            bucket.settled += 1;
        }

        Some(days)
    }

    /// Newest first.
    pub fn recent(&self, bookings: &[Booking], limit: usize) -> Vec<Booking> {
        let mut sorted = bookings.to_vec();
        sorted.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        sorted.truncate(limit);
        sorted
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use parkade_core::payment::{PaymentMethod, PaymentStatus};
    use parkade_core::Requester;

    fn at(day: u32, hour: u32, minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, day, hour, minute, 0).unwrap()
    }

    fn booking(created_at: DateTime<Utc>, paid_at: Option<DateTime<Utc>>) -> Booking {
        let mut b = Booking::new(
            &Requester::user("driver@example.com"),
            "loc_1".to_string(),
            "Downtown".to_string(),
            1,
            created_at,
        );
        if let Some(paid_at) = paid_at {
            b.mark_paid(paid_at);
        }
        b
    }

    fn payment(amount: Amount, status: PaymentStatus) -> Payment {
        Payment::new("booking_x".to_string(), amount, PaymentMethod::Card, status, at(1, 0, 0))
    }

    #[test]
    fn test_summary_empty() {
        let finance = FinancialManager::new(FeePolicy::default());
        let summary = finance.summary(&[], &[], at(1, 0, 0));
        assert_eq!(summary.total, 0);
        assert_eq!(summary.paid_percent, 0);
        assert_eq!(summary.unpaid_percent, 0);
        assert_eq!(summary.income, 0);
    }

    #[test]
    fn test_summary_counts_and_amounts() {
        let finance = FinancialManager::new(FeePolicy::default());
        let bookings = vec![
            // 45 minutes -> 2 units
            booking(at(1, 9, 0), Some(at(1, 9, 45))),
            // unpaid, 61 minutes at `now` -> 3 units
            booking(at(1, 9, 0), None),
            booking(at(1, 10, 0), None),
        ];
        let payments = vec![payment(2, PaymentStatus::Success), payment(5, PaymentStatus::Failed)];

        let now = at(1, 10, 1);
        let summary = finance.summary(&bookings, &payments, now);

        assert_eq!(summary.total, 3);
        assert_eq!(summary.paid, 1);
        assert_eq!(summary.unpaid, 2);
        assert_eq!(summary.paid_percent, 33);
        assert_eq!(summary.unpaid_percent, 67);
        assert_eq!(summary.income, 2);
        // 3 units + 1 unit for the booking created a minute ago
        assert_eq!(summary.outstanding, 4);
        assert_eq!(summary.successful_payments, 1);
        assert_eq!(summary.payment_revenue, 2);
        assert_eq!(summary.currency, "USD");
    }

    #[test]
    fn test_daily_income_buckets() {
        let finance = FinancialManager::new(FeePolicy::default());
        let bookings = vec![
            booking(at(3, 8, 0), Some(at(3, 8, 30))),
            booking(at(3, 9, 0), Some(at(3, 10, 0))),
            booking(at(30, 23, 0), Some(at(31, 23, 59))),
            // paid next month, excluded
            booking(at(31, 23, 0), Some(at(31, 23, 0) + Duration::hours(2))),
            booking(at(4, 9, 0), None),
        ];

        let days = finance.daily_income(&bookings, 2024, 5).unwrap();
        assert_eq!(days.len(), 31);
        assert_eq!(days[2].day, 3);
        assert_eq!(days[2].income, 3);
        assert_eq!(days[2].settled, 2);
        assert_eq!(days[30].income, 50);
        assert_eq!(days.iter().map(|d| d.settled).sum::<usize>(), 3);
    }

    #[test]
    fn test_daily_income_month_lengths() {
        let finance = FinancialManager::new(FeePolicy::default());
        assert_eq!(finance.daily_income(&[], 2024, 2).unwrap().len(), 29);
        assert_eq!(finance.daily_income(&[], 2023, 2).unwrap().len(), 28);
        assert_eq!(finance.daily_income(&[], 2023, 12).unwrap().len(), 31);
        assert!(finance.daily_income(&[], 2023, 13).is_none());
        assert!(finance.daily_income(&[], 2023, 0).is_none());
    }

    #[test]
    fn test_recent_newest_first() {
        let finance = FinancialManager::new(FeePolicy::default());
        let bookings: Vec<Booking> = (1..=5).map(|d| booking(at(d, 9, 0), None)).collect();

        let recent = finance.recent(&bookings, 3);
        assert_eq!(recent.len(), 3);
        assert_eq!(recent[0].created_at, at(5, 9, 0));
        assert_eq!(recent[2].created_at, at(3, 9, 0));
    }
}
