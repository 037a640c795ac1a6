use axum::{
    extract::{Path, State},
    http::StatusCode,
    middleware,
    routing::{get, post},
    Extension, Json, Router,
};
use chrono::Utc;
use parkade_core::payment::PaymentMethod;
use parkade_core::Requester;
use parkade_order::{Booking, BookingError, BookingStatus, FeeEstimate, Settlement};
use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::middleware::user_auth_middleware;
use crate::state::AppState;

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateBookingRequest {
    pub location_id: String,
    pub slot_number: u32,
}

#[derive(Debug, Default, Deserialize)]
pub struct SettleRequest {
    #[serde(default)]
    pub method: PaymentMethod,
}

#[derive(Debug, Serialize)]
pub struct BookingResponse {
    #[serde(flatten)]
    pub booking: Booking,
    pub status: BookingStatus,
}

impl From<Booking> for BookingResponse {
    fn from(booking: Booking) -> Self {
        Self {
            status: booking.status(),
            booking,
        }
    }
}

// ============================================================================
// Routes
// ============================================================================

pub fn routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/v1/bookings", post(create_booking).get(list_my_bookings))
        .route("/v1/bookings/{id}/fee", get(get_fee))
        .route("/v1/bookings/{id}/settle", post(settle_booking))
        .route_layer(middleware::from_fn_with_state(state, user_auth_middleware))
}

/// POST /v1/bookings
async fn create_booking(
    State(state): State<AppState>,
    Extension(requester): Extension<Requester>,
    Json(req): Json<CreateBookingRequest>,
) -> Result<(StatusCode, Json<BookingResponse>), AppError> {
    if req.location_id.trim().is_empty() {
        return Err(AppError::ValidationError("locationId is required".to_string()));
    }
    if req.slot_number == 0 {
        return Err(AppError::ValidationError("slotNumber starts at 1".to_string()));
    }

    let booking = state
        .bookings
        .create(&requester, &req.location_id, req.slot_number, Utc::now())
        .await?;

    Ok((StatusCode::CREATED, Json(booking.into())))
}

/// GET /v1/bookings
async fn list_my_bookings(
    State(state): State<AppState>,
    Extension(requester): Extension<Requester>,
) -> Json<Vec<BookingResponse>> {
    let bookings = state.bookings.list_for(&requester.email).await;
    Json(bookings.into_iter().map(BookingResponse::from).collect())
}

/// Looks up a booking the requester is allowed to see.
async fn owned_booking(state: &AppState, requester: &Requester, booking_id: &str) -> Result<Booking, AppError> {
    let booking = state
        .bookings
        .get(booking_id)
        .await
        .ok_or_else(|| BookingError::BookingNotFound(booking_id.to_string()))?;

    if !requester.can_access(&booking.user_email) {
        return Err(AppError::AuthorizationError(
            "Booking belongs to another user".to_string(),
        ));
    }
    Ok(booking)
}

/// GET /v1/bookings/{id}/fee
async fn get_fee(
    State(state): State<AppState>,
    Extension(requester): Extension<Requester>,
    Path(booking_id): Path<String>,
) -> Result<Json<FeeEstimate>, AppError> {
    owned_booking(&state, &requester, &booking_id).await?;
    let estimate = state.bookings.estimate(&booking_id, Utc::now()).await?;
    Ok(Json(estimate))
}

/// POST /v1/bookings/{id}/settle
///
/// The amount is always computed here; clients only choose how to pay.
async fn settle_booking(
    State(state): State<AppState>,
    Extension(requester): Extension<Requester>,
    Path(booking_id): Path<String>,
    Json(req): Json<SettleRequest>,
) -> Result<Json<Settlement>, AppError> {
    owned_booking(&state, &requester, &booking_id).await?;
    let settlement = state
        .bookings
        .settle(&booking_id, Utc::now(), req.method)
        .await?;
    Ok(Json(settlement))
}
