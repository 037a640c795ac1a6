use chrono::{DateTime, Utc};
use parkade_core::payment::{PaymentMethod, PaymentStatus};
use parkade_core::{Amount, Requester};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Booking lifecycle. `Paid` is terminal.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BookingStatus {
    Created,
    Paid,
}

/// A requester's claim on one slot, from creation until settlement.
///
/// `paid` and `paid_at` move together: a booking is paid exactly when it
/// carries a payment timestamp.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Booking {
    pub id: String,
    pub user_email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_name: Option<String>,
    pub location_id: String,
    /// Copied at creation so history survives location renames.
    #[serde(default)]
    pub location_name: String,
    pub slot_number: u32,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub paid: bool,
    #[serde(default)]
    pub paid_at: Option<DateTime<Utc>>,
}

impl Booking {
    pub fn new(
        requester: &Requester,
        location_id: String,
        location_name: String,
        slot_number: u32,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: format!("booking_{}", Uuid::new_v4().simple()),
            user_email: requester.email.clone(),
            user_name: requester.name.clone(),
            location_id,
            location_name,
            slot_number,
            created_at,
            paid: false,
            paid_at: None,
        }
    }

    pub fn status(&self) -> BookingStatus {
        if self.paid {
            BookingStatus::Paid
        } else {
            BookingStatus::Created
        }
    }

    /// Transition: Created -> Paid
    pub fn mark_paid(&mut self, paid_at: DateTime<Utc>) {
        self.paid = true;
        self.paid_at = Some(paid_at);
    }

    /// Older records may lack the cached name.
    pub fn display_location(&self) -> &str {
        if self.location_name.is_empty() {
            &self.location_id
        } else {
            &self.location_name
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Payment {
    pub id: String,
    pub booking_id: String,
    pub amount: Amount,
    pub method: PaymentMethod,
    pub status: PaymentStatus,
    pub created_at: DateTime<Utc>,
}

impl Payment {
    pub fn new(
        booking_id: String,
        amount: Amount,
        method: PaymentMethod,
        status: PaymentStatus,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: format!("payment_{}", Uuid::new_v4().simple()),
            booking_id,
            amount,
            method,
            status,
            created_at,
        }
    }

    pub fn succeeded(&self) -> bool {
        self.status == PaymentStatus::Success
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BookingsFile {
    #[serde(default)]
    pub bookings: Vec<Booking>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PaymentsFile {
    #[serde(default)]
    pub payments: Vec<Payment>,
}

/// Result of settling a booking.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Settlement {
    pub booking: Booking,
    pub payment: Payment,
    pub amount: Amount,
    pub currency: String,
}

/// Amount owed at a given instant, for the live counter.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FeeEstimate {
    pub booking_id: String,
    pub amount: Amount,
    pub currency: String,
    pub elapsed_seconds: i64,
    pub paid: bool,
    pub evaluated_at: DateTime<Utc>,
}

/// Admin booking table filter.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BookingFilter {
    #[serde(default)]
    pub unpaid_only: bool,
    #[serde(default, alias = "q")]
    pub query: Option<String>,
}

impl BookingFilter {
    pub fn matches(&self, booking: &Booking) -> bool {
        if self.unpaid_only && booking.paid {
            return false;
        }

        let query = match self.query.as_deref().map(str::trim) {
            Some(q) if !q.is_empty() => q.to_lowercase(),
            _ => return true,
        };

        booking.user_email.to_lowercase().contains(&query)
            || booking
                .user_name
                .as_deref()
                .is_some_and(|name| name.to_lowercase().contains(&query))
            || booking.display_location().to_lowercase().contains(&query)
            || booking.slot_number.to_string().contains(&query)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn booking() -> Booking {
        let requester = Requester {
            email: "Alice@Example.com".to_string(),
            name: Some("Alice Park".to_string()),
            role: parkade_core::Role::User,
        };
        Booking::new(
            &requester,
            "loc_1".to_string(),
            "Downtown".to_string(),
            12,
            Utc.with_ymd_and_hms(2024, 5, 1, 9, 0, 0).unwrap(),
        )
    }

    #[test]
    fn test_paid_flag_and_timestamp_move_together() {
        let mut b = booking();
        assert_eq!(b.status(), BookingStatus::Created);
        assert!(b.paid_at.is_none());

        let at = Utc.with_ymd_and_hms(2024, 5, 1, 10, 0, 0).unwrap();
        b.mark_paid(at);
        assert_eq!(b.status(), BookingStatus::Paid);
        assert_eq!(b.paid_at, Some(at));
    }

    #[test]
    fn test_persisted_shape() {
        let value = serde_json::to_value(booking()).unwrap();
        assert!(value["id"].as_str().unwrap().starts_with("booking_"));
        assert_eq!(value["userEmail"], "Alice@Example.com");
        assert_eq!(value["locationName"], "Downtown");
        assert_eq!(value["slotNumber"], 12);
        assert_eq!(value["paid"], false);
        assert!(value["paidAt"].is_null());
        assert_eq!(value["createdAt"], "2024-05-01T09:00:00Z");
    }

    #[test]
    fn test_reads_minimal_legacy_record() {
        let raw = r#"{"id":"booking_1","userEmail":"a@b.c","locationId":"loc_2","slotNumber":3,
                      "createdAt":"2024-05-01T09:00:00.000Z"}"#;
        let b: Booking = serde_json::from_str(raw).unwrap();
        assert!(!b.paid);
        assert_eq!(b.display_location(), "loc_2");
    }

    #[test]
    fn test_filter() {
        let b = booking();
        let filter = |unpaid_only, q: &str| BookingFilter { unpaid_only, query: Some(q.to_string()) };

        assert!(BookingFilter::default().matches(&b));
        assert!(filter(false, "alice@").matches(&b));
        assert!(filter(false, "park").matches(&b));
        assert!(filter(false, "downtown").matches(&b));
        assert!(filter(false, "12").matches(&b));
        assert!(filter(true, "  ").matches(&b));
        assert!(!filter(false, "uptown").matches(&b));

        let mut paid = b.clone();
        paid.mark_paid(Utc::now());
        assert!(!filter(true, "").matches(&paid));
    }

    #[test]
    fn test_payment_wire_format() {
        let payment = Payment::new(
            "booking_1".to_string(),
            2,
            PaymentMethod::Cash,
            PaymentStatus::Success,
            Utc.with_ymd_and_hms(2024, 5, 1, 9, 45, 0).unwrap(),
        );
        let value = serde_json::to_value(&payment).unwrap();
        assert_eq!(value["bookingId"], "booking_1");
        assert_eq!(value["method"], "cash");
        assert_eq!(value["status"], "success");
        assert!(payment.succeeded());
    }
}
