use serde::{Deserialize, Serialize};

/// Occupancy of a single slot changed.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SlotChangedEvent {
    pub location_id: String,
    pub slot_number: u32,
    pub is_occupied: bool,
    pub changed_at: i64,
}

/// A location was created, edited, resized or removed.
/// `total_slots` is `None` once the location is gone.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LocationChangedEvent {
    pub location_id: String,
    pub total_slots: Option<u32>,
    pub changed_at: i64,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ParkingEvent {
    SlotChanged(SlotChangedEvent),
    LocationChanged(LocationChangedEvent),
}

impl ParkingEvent {
    pub fn location_id(&self) -> &str {
        match self {
            ParkingEvent::SlotChanged(e) => &e.location_id,
            ParkingEvent::LocationChanged(e) => &e.location_id,
        }
    }

    /// SSE event name
    pub fn name(&self) -> &'static str {
        match self {
            ParkingEvent::SlotChanged(_) => "slot_changed",
            ParkingEvent::LocationChanged(_) => "location_changed",
        }
    }
}
