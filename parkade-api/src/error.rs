use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use parkade_catalog::LedgerError;
use parkade_order::BookingError;
use serde_json::json;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("{0}")]
    AuthenticationError(String),
    #[error("{0}")]
    AuthorizationError(String),
    #[error("{0}")]
    ValidationError(String),
    #[error("{0}")]
    NotFoundError(String),
    #[error(transparent)]
    Ledger(#[from] LedgerError),
    #[error(transparent)]
    Booking(#[from] BookingError),
    #[error(transparent)]
    Anyhow(#[from] anyhow::Error),
}

const STORAGE_UNAVAILABLE: &str = "Storage temporarily unavailable, please retry";

fn ledger_status(err: &LedgerError) -> (StatusCode, String) {
    match err {
        LedgerError::LocationNotFound(_) | LedgerError::SlotNotFound { .. } => {
            (StatusCode::NOT_FOUND, err.to_string())
        }
        LedgerError::SlotUnavailable { .. } => (
            StatusCode::CONFLICT,
            "Slot no longer available, choose another".to_string(),
        ),
        LedgerError::ShrinkWouldDropOccupied { .. } => (StatusCode::CONFLICT, err.to_string()),
        LedgerError::InvalidLayout(_) => (StatusCode::BAD_REQUEST, err.to_string()),
        LedgerError::Persistence(e) => {
            tracing::error!("Ledger persistence failure: {}", e);
            (StatusCode::SERVICE_UNAVAILABLE, STORAGE_UNAVAILABLE.to_string())
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            AppError::AuthenticationError(msg) => (StatusCode::UNAUTHORIZED, msg),
            AppError::AuthorizationError(msg) => (StatusCode::FORBIDDEN, msg),
            AppError::ValidationError(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::NotFoundError(msg) => (StatusCode::NOT_FOUND, msg),
            AppError::Ledger(err) => ledger_status(&err),
            AppError::Booking(err) => match err {
                BookingError::BookingNotFound(_) => (
                    StatusCode::NOT_FOUND,
                    "Booking not found or already settled".to_string(),
                ),
                BookingError::Ledger(ref inner) => ledger_status(inner),
                BookingError::PaymentDeclined(_) => (StatusCode::PAYMENT_REQUIRED, err.to_string()),
                BookingError::PaymentProvider(ref msg) => {
                    tracing::error!("Payment provider failure: {}", msg);
                    (StatusCode::BAD_GATEWAY, "Payment provider unavailable".to_string())
                }
                BookingError::Persistence(ref e) => {
                    tracing::error!("Booking persistence failure: {}", e);
                    (StatusCode::SERVICE_UNAVAILABLE, STORAGE_UNAVAILABLE.to_string())
                }
                BookingError::Reconciliation { .. } => {
                    tracing::error!("Reconciliation required: {}", err);
                    (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        "Payment taken but booking could not be completed; support has been notified".to_string(),
                    )
                }
            },
            AppError::Anyhow(err) => {
                tracing::error!("Internal Server Error: {}", err);
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error".to_string())
            }
        };

        let body = Json(json!({
            "error": error_message,
        }));

        (status, body).into_response()
    }
}
