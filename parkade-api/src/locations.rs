use axum::{
    extract::{Path, State},
    http::header,
    response::{
        sse::{Event, KeepAlive, Sse},
        IntoResponse,
    },
    routing::get,
    Json, Router,
};
use futures_util::{Stream, StreamExt};
use serde::Serialize;
use std::convert::Infallible;
use tokio_stream::wrappers::BroadcastStream;
use tracing::debug;

use crate::error::AppError;
use crate::state::AppState;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct FreeSlotsResponse {
    location_id: String,
    free_slots: Vec<u32>,
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/v1/locations", get(list_locations))
        .route("/v1/locations/{id}/free", get(list_free_slots))
        .route("/v1/locations/{id}/stream", get(stream_location))
}

/// Locations with their slot grids, in the persisted document shape.
async fn list_locations(State(state): State<AppState>) -> impl IntoResponse {
    let document = state.ledger.document().await;
    ([(header::CACHE_CONTROL, "no-store")], Json(document))
}

async fn list_free_slots(
    State(state): State<AppState>,
    Path(location_id): Path<String>,
) -> Result<Json<FreeSlotsResponse>, AppError> {
    let free_slots = state.ledger.list_free(&location_id).await?;
    Ok(Json(FreeSlotsResponse {
        location_id,
        free_slots,
    }))
}

/// Pushes slot and layout changes for one location. Slow clients that lag
/// behind the channel skip the missed events and should re-fetch.
async fn stream_location(
    State(state): State<AppState>,
    Path(location_id): Path<String>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, AppError> {
    state.ledger.location(&location_id).await?;

    let rx = state.events.subscribe();
    let stream = BroadcastStream::new(rx).filter_map(move |result| {
        let location_id = location_id.clone();
        async move {
            match result {
                Ok(event) if event.location_id() == location_id => {
                    Event::default().event(event.name()).json_data(&event).ok().map(Ok)
                }
                Ok(_) => None,
                Err(e) => {
                    debug!("Stream for {} lagged: {}", location_id, e);
                    None
                }
            }
        }
    });

    Ok(Sse::new(stream).keep_alive(KeepAlive::default()))
}
