use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    middleware,
    routing::{get, patch, post, put},
    Extension, Json, Router,
};
use parkade_catalog::{LocationPatch, NewLocation, ParkingDataFile, ParkingLocation, ParkingSlot};
use parkade_core::Requester;
use parkade_order::{BookingFilter, Payment};
use parkade_shared::pii::Masked;
use serde::Deserialize;
use tracing::info;

use crate::bookings::BookingResponse;
use crate::error::AppError;
use crate::finance;
use crate::middleware::admin_auth_middleware;
use crate::state::AppState;

// ============================================================================
// Request Types
// ============================================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetSlotRequest {
    pub is_occupied: bool,
}

// ============================================================================
// Routes
// ============================================================================

pub fn routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/v1/admin/bookings", get(search_bookings))
        .route("/v1/admin/payments", get(list_payments))
        .route("/v1/admin/locations", post(create_location))
        .route(
            "/v1/admin/locations/{id}",
            patch(update_location).delete(remove_location),
        )
        .route("/v1/admin/locations/{id}/slots/{n}", put(set_slot))
        .route("/v1/admin/parkingdata", put(replace_parking_data))
        .merge(finance::routes())
        .route_layer(middleware::from_fn_with_state(state, admin_auth_middleware))
}

/// GET /v1/admin/bookings?unpaid_only=true&q=downtown
async fn search_bookings(
    State(state): State<AppState>,
    Query(filter): Query<BookingFilter>,
) -> Json<Vec<BookingResponse>> {
    let bookings = state.bookings.search(&filter).await;
    Json(bookings.into_iter().map(BookingResponse::from).collect())
}

/// GET /v1/admin/payments
async fn list_payments(State(state): State<AppState>) -> Json<Vec<Payment>> {
    Json(state.bookings.payments().await)
}

/// POST /v1/admin/locations
async fn create_location(
    State(state): State<AppState>,
    Extension(admin): Extension<Requester>,
    Json(req): Json<NewLocation>,
) -> Result<(StatusCode, Json<ParkingLocation>), AppError> {
    if req.name.trim().is_empty() {
        return Err(AppError::ValidationError("name is required".to_string()));
    }

    let location = state.ledger.create_location(req).await?;
    info!("{} created location {}", Masked(admin.email.as_str()), location.id);
    Ok((StatusCode::CREATED, Json(location)))
}

/// PATCH /v1/admin/locations/{id}
async fn update_location(
    State(state): State<AppState>,
    Path(location_id): Path<String>,
    Json(changes): Json<LocationPatch>,
) -> Result<Json<ParkingLocation>, AppError> {
    if changes.name.as_deref().is_some_and(|name| name.trim().is_empty()) {
        return Err(AppError::ValidationError("name cannot be empty".to_string()));
    }

    let location = state.ledger.update_location(&location_id, changes).await?;
    Ok(Json(location))
}

/// DELETE /v1/admin/locations/{id}
async fn remove_location(
    State(state): State<AppState>,
    Extension(admin): Extension<Requester>,
    Path(location_id): Path<String>,
) -> Result<StatusCode, AppError> {
    state.ledger.remove_location(&location_id).await?;
    info!("{} removed location {}", Masked(admin.email.as_str()), location_id);
    Ok(StatusCode::NO_CONTENT)
}

/// PUT /v1/admin/locations/{id}/slots/{n}
async fn set_slot(
    State(state): State<AppState>,
    Path((location_id, slot_number)): Path<(String, u32)>,
    Json(req): Json<SetSlotRequest>,
) -> Result<Json<ParkingSlot>, AppError> {
    let slot = state
        .ledger
        .set_occupancy(&location_id, slot_number, req.is_occupied)
        .await?;
    Ok(Json(slot))
}

/// PUT /v1/admin/parkingdata
async fn replace_parking_data(
    State(state): State<AppState>,
    Extension(admin): Extension<Requester>,
    Json(file): Json<ParkingDataFile>,
) -> Result<Json<Vec<ParkingLocation>>, AppError> {
    let locations = state.ledger.replace_all(file.locations).await?;
    info!(
        "{} replaced the parking layout ({} locations)",
        Masked(admin.email.as_str()),
        locations.len()
    );
    Ok(Json(locations))
}
