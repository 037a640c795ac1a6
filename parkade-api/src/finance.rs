use axum::{
    extract::{Query, State},
    routing::get,
    Json, Router,
};
use chrono::{Datelike, Utc};
use parkade_order::{Booking, BookingSummary, DailyIncome};
use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::state::AppState;

const RECENT_BOOKINGS: usize = 10;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SummaryResponse {
    #[serde(flatten)]
    pub summary: BookingSummary,
    pub recent: Vec<Booking>,
}

#[derive(Debug, Deserialize)]
pub struct DailyQuery {
    pub year: Option<i32>,
    pub month: Option<u32>,
}

#[derive(Debug, Serialize)]
pub struct DailyResponse {
    pub year: i32,
    pub month: u32,
    pub days: Vec<DailyIncome>,
}

/// Mounted under the admin router, which applies the admin check.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/v1/admin/analytics/summary", get(get_summary))
        .route("/v1/admin/analytics/daily", get(get_daily_income))
}

/// GET /v1/admin/analytics/summary
async fn get_summary(State(state): State<AppState>) -> Json<SummaryResponse> {
    let bookings = state.bookings.list_all().await;
    let payments = state.bookings.payments().await;

    Json(SummaryResponse {
        summary: state.finance.summary(&bookings, &payments, Utc::now()),
        recent: state.finance.recent(&bookings, RECENT_BOOKINGS),
    })
}

/// GET /v1/admin/analytics/daily?year=2024&month=5
///
/// Defaults to the current UTC month.
async fn get_daily_income(
    State(state): State<AppState>,
    Query(query): Query<DailyQuery>,
) -> Result<Json<DailyResponse>, AppError> {
    let today = Utc::now().date_naive();
    let year = query.year.unwrap_or(today.year());
    let month = query.month.unwrap_or(today.month());

    let bookings = state.bookings.list_all().await;
    let days = state
        .finance
        .daily_income(&bookings, year, month)
        .ok_or_else(|| AppError::ValidationError(format!("Invalid month: {}-{}", year, month)))?;

    Ok(Json(DailyResponse { year, month, days }))
}
