use std::collections::HashSet;
use std::sync::Arc;

use chrono::Utc;
use parkade_core::repository::{keys, load_document, save_document};
use parkade_core::{KeyValueStore, StoreError};
use parkade_shared::models::events::{LocationChangedEvent, ParkingEvent, SlotChangedEvent};
use parkade_store::EventPublisher;
use tokio::sync::RwLock;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::location::{
    Location, LocationDocument, LocationPatch, NewLocation, OccupancySummary,
    ParkingDataFile, ParkingLocation, ParkingSlot,
};

pub const DEFAULT_MAX_SLOTS_PER_LOCATION: u32 = 10_000;

#[derive(Debug, Clone)]
pub struct LedgerOptions {
    /// Permit shrinking a location even when that deletes occupied slots.
    pub allow_destructive_shrink: bool,
    /// Upper bound on `total_slots` for creates, resizes and uploads.
    pub max_slots_per_location: u32,
}

impl Default for LedgerOptions {
    fn default() -> Self {
        Self {
            allow_destructive_shrink: false,
            max_slots_per_location: DEFAULT_MAX_SLOTS_PER_LOCATION,
        }
    }
}

impl LedgerOptions {
    fn check_capacity(&self, total_slots: u32) -> Result<(), LedgerError> {
        if total_slots > self.max_slots_per_location {
            return Err(LedgerError::InvalidLayout(format!(
                "{} slots exceeds the limit of {} per location",
                total_slots, self.max_slots_per_location
            )));
        }
        Ok(())
    }
}

/// Authoritative occupancy of every slot at every location.
///
/// Readers share the state; every mutation takes the write guard for the whole
/// read-decide-persist sequence, so two claims on one slot can never both win.
/// The parking document is persisted whole on each change and the in-memory
/// state is only replaced once the write succeeded.
pub struct SlotLedger {
    store: Arc<dyn KeyValueStore>,
    events: EventPublisher,
    options: LedgerOptions,
    locations: RwLock<Vec<Location>>,
}

/// Outcome of a mutation. Unchanged outcomes are not written.
struct Applied<T> {
    value: T,
    changed: bool,
    events: Vec<ParkingEvent>,
}

impl<T> Applied<T> {
    fn changed(value: T, events: Vec<ParkingEvent>) -> Self {
        Self { value, changed: true, events }
    }

    fn unchanged(value: T) -> Self {
        Self { value, changed: false, events: Vec::new() }
    }
}

impl SlotLedger {
    pub async fn load(
        store: Arc<dyn KeyValueStore>,
        events: EventPublisher,
        options: LedgerOptions,
    ) -> Result<Self, LedgerError> {
        let file: ParkingDataFile = load_document(store.as_ref(), keys::PARKING_DATA).await?;

        let mut locations = Vec::with_capacity(file.locations.len());
        // Stored ids win over position-derived ones; bookings may reference them.
        let stored_ids: HashSet<&str> = file.locations.iter().filter_map(|d| d.id.as_deref()).collect();
        let mut seen = HashSet::new();
        for (position, doc) in file.locations.iter().enumerate() {
            let (mut location, mismatch) = Location::from_document_lenient(doc, position);
            if mismatch {
                warn!(
                    "Stored slots of location {} disagreed with totalSlots={}, rebuilt as 1..={}",
                    location.id, doc.total_slots, doc.total_slots
                );
            }
            let clashes = seen.contains(&location.id)
                || (doc.id.is_none() && stored_ids.contains(location.id.as_str()));
            if clashes {
                let fresh = Uuid::new_v4().to_string();
                warn!(
                    "Stored location {:?} at position {} reuses id {}, reassigned {}",
                    location.name, position, location.id, fresh
                );
                location.id = fresh;
            }
            seen.insert(location.id.clone());
            locations.push(location);
        }

        info!("Slot ledger loaded {} locations", locations.len());

        Ok(Self {
            store,
            events,
            options,
            locations: RwLock::new(locations),
        })
    }

    // ------------------------------------------------------------------
    // Reads
    // ------------------------------------------------------------------

    pub async fn locations(&self) -> Vec<ParkingLocation> {
        self.locations.read().await.iter().map(Location::view).collect()
    }

    pub async fn location(&self, location_id: &str) -> Result<ParkingLocation, LedgerError> {
        let locations = self.locations.read().await;
        Ok(find(&locations, location_id)?.view())
    }

    pub async fn slots(&self, location_id: &str) -> Result<Vec<ParkingSlot>, LedgerError> {
        let locations = self.locations.read().await;
        Ok(find(&locations, location_id)?.slots())
    }

    pub async fn all_slots(&self) -> Vec<ParkingSlot> {
        self.locations
            .read()
            .await
            .iter()
            .flat_map(Location::slots)
            .collect()
    }

    /// Free slot numbers in ascending order. A snapshot: callers re-fetch to
    /// see later changes, and a claim must still go through [`Self::claim`].
    pub async fn list_free(&self, location_id: &str) -> Result<Vec<u32>, LedgerError> {
        let locations = self.locations.read().await;
        let location = find(&locations, location_id)?;
        Ok(location
            .occupied
            .iter()
            .enumerate()
            .filter_map(|(i, &occupied)| (!occupied).then_some(i as u32 + 1))
            .collect())
    }

    pub async fn occupancy(&self, location_id: &str) -> Result<OccupancySummary, LedgerError> {
        let locations = self.locations.read().await;
        Ok(find(&locations, location_id)?.occupancy())
    }

    /// The parking document as it is persisted.
    pub async fn document(&self) -> ParkingDataFile {
        ParkingDataFile {
            locations: self
                .locations
                .read()
                .await
                .iter()
                .map(Location::to_document)
                .collect(),
        }
    }

    // ------------------------------------------------------------------
    // Occupancy transitions
    // ------------------------------------------------------------------

    /// Check-and-set used by booking creation: fails with `SlotUnavailable`
    /// if someone else got there first.
    pub async fn claim(&self, location_id: &str, slot_number: u32) -> Result<(), LedgerError> {
        self.apply(|locations| {
            let location = find_mut(locations, location_id)?;
            if slot_flag(location, slot_number)? {
                return Err(LedgerError::SlotUnavailable {
                    location_id: location_id.to_string(),
                    slot_number,
                });
            }
            location.set_occupied(slot_number, true);
            Ok(Applied::changed((), vec![slot_event(location_id, slot_number, true)]))
        })
        .await
    }

    pub async fn mark_occupied(&self, location_id: &str, slot_number: u32) -> Result<(), LedgerError> {
        self.set_flag(location_id, slot_number, true).await
    }

    pub async fn mark_free(&self, location_id: &str, slot_number: u32) -> Result<(), LedgerError> {
        self.set_flag(location_id, slot_number, false).await
    }

    /// Manual override from the admin slot grid.
    pub async fn set_occupancy(
        &self,
        location_id: &str,
        slot_number: u32,
        occupied: bool,
    ) -> Result<ParkingSlot, LedgerError> {
        self.set_flag(location_id, slot_number, occupied).await?;
        info!("Admin set slot {}-{} occupied={}", location_id, slot_number, occupied);
        Ok(ParkingSlot {
            id: ParkingSlot::slot_id(location_id, slot_number),
            location_id: location_id.to_string(),
            slot_number,
            is_occupied: occupied,
        })
    }

    async fn set_flag(&self, location_id: &str, slot_number: u32, occupied: bool) -> Result<(), LedgerError> {
        self.apply(|locations| {
            let location = find_mut(locations, location_id)?;
            if slot_flag(location, slot_number)? == occupied {
                if occupied {
                    warn!("Slot {}-{} marked occupied twice", location_id, slot_number);
                } else {
                    debug!("Slot {}-{} already free", location_id, slot_number);
                }
                return Ok(Applied::unchanged(()));
            }
            location.set_occupied(slot_number, occupied);
            Ok(Applied::changed((), vec![slot_event(location_id, slot_number, occupied)]))
        })
        .await
    }

    // ------------------------------------------------------------------
    // Layout
    // ------------------------------------------------------------------

    pub async fn create_location(&self, new: NewLocation) -> Result<ParkingLocation, LedgerError> {
        if new.name.trim().is_empty() {
            return Err(LedgerError::InvalidLayout("location name is required".to_string()));
        }
        if new.total_slots == 0 {
            return Err(LedgerError::InvalidLayout("a location needs at least one slot".to_string()));
        }
        self.options.check_capacity(new.total_slots)?;

        let location = Location {
            id: Uuid::new_v4().to_string(),
            name: new.name,
            address: new.address,
            map_url: new.map_url.filter(|url| !url.is_empty()),
            occupied: vec![false; new.total_slots as usize],
        };
        let view = location.view();

        self.apply(move |locations| {
            let event = location_event(&location.id, Some(location.total_slots()));
            locations.push(location);
            Ok(Applied::changed((), vec![event]))
        })
        .await?;

        info!("Created location {} ({}) with {} slots", view.id, view.name, view.total_slots);
        Ok(view)
    }

    /// Grows with free slots or truncates from the highest slot number down.
    pub async fn resize(&self, location_id: &str, new_total: u32) -> Result<ParkingLocation, LedgerError> {
        self.options.check_capacity(new_total)?;
        let allow_destructive = self.options.allow_destructive_shrink;
        self.apply(|locations| {
            let location = find_mut(locations, location_id)?;
            if !resize_slots(location, new_total, allow_destructive)? {
                return Ok(Applied::unchanged(location.view()));
            }
            Ok(Applied::changed(location.view(), vec![location_event(location_id, Some(new_total))]))
        })
        .await
    }

    pub async fn update_location(
        &self,
        location_id: &str,
        patch: LocationPatch,
    ) -> Result<ParkingLocation, LedgerError> {
        if patch.total_slots == Some(0) {
            return Err(LedgerError::InvalidLayout("a location needs at least one slot".to_string()));
        }
        if let Some(total) = patch.total_slots {
            self.options.check_capacity(total)?;
        }
        if matches!(&patch.name, Some(name) if name.trim().is_empty()) {
            return Err(LedgerError::InvalidLayout("location name is required".to_string()));
        }

        let allow_destructive = self.options.allow_destructive_shrink;
        self.apply(|locations| {
            let location = find_mut(locations, location_id)?;
            let before = location.clone();

            if let Some(total) = patch.total_slots {
                resize_slots(location, total, allow_destructive)?;
            }
            if let Some(name) = patch.name {
                location.name = name;
            }
            if let Some(address) = patch.address {
                location.address = address;
            }
            if let Some(map_url) = patch.map_url {
                location.map_url = Some(map_url).filter(|url| !url.is_empty());
            }

            if *location == before {
                return Ok(Applied::unchanged(location.view()));
            }
            Ok(Applied::changed(location.view(), vec![location_event(location_id, Some(location.total_slots()))]))
        })
        .await
    }

    /// Deletes the location together with all of its slots.
    pub async fn remove_location(&self, location_id: &str) -> Result<(), LedgerError> {
        self.apply(|locations| {
            let index = position(locations, location_id)?;
            let removed = locations.remove(index);
            let occupancy = removed.occupancy();
            if occupancy.occupied > 0 {
                warn!(
                    "Removed location {} with {} occupied slots",
                    location_id, occupancy.occupied
                );
            }
            Ok(Applied::changed((), vec![location_event(location_id, None)]))
        })
        .await?;

        info!("Removed location {}", location_id);
        Ok(())
    }

    /// Bulk overwrite of the whole parking document from the admin screen.
    /// Every location must list exactly slots `1..=totalSlots`.
    pub async fn replace_all(&self, documents: Vec<LocationDocument>) -> Result<Vec<ParkingLocation>, LedgerError> {
        let mut incoming = Vec::with_capacity(documents.len());
        let mut seen = HashSet::new();
        for (position, doc) in documents.iter().enumerate() {
            self.options.check_capacity(doc.total_slots)?;
            let location = Location::from_document_strict(doc, position).map_err(LedgerError::InvalidLayout)?;
            if !seen.insert(location.id.clone()) {
                return Err(LedgerError::InvalidLayout(format!("duplicate location id {}", location.id)));
            }
            incoming.push(location);
        }

        let views: Vec<ParkingLocation> = incoming.iter().map(Location::view).collect();

        self.apply(move |locations| {
            let mut events: Vec<ParkingEvent> = locations
                .iter()
                .filter(|old| !seen.contains(&old.id))
                .map(|old| location_event(&old.id, None))
                .collect();
            events.extend(incoming.iter().map(|l| location_event(&l.id, Some(l.total_slots()))));

            *locations = incoming;
            Ok(Applied::changed((), events))
        })
        .await?;

        info!("Parking data replaced: {} locations", views.len());
        Ok(views)
    }

    // ------------------------------------------------------------------

    async fn apply<T>(
        &self,
        op: impl FnOnce(&mut Vec<Location>) -> Result<Applied<T>, LedgerError>,
    ) -> Result<T, LedgerError> {
        let mut guard = self.locations.write().await;
        let mut next = (*guard).clone();
        let applied = op(&mut next)?;

        if !applied.changed {
            return Ok(applied.value);
        }

        self.persist(&next).await?;
        *guard = next;

        for event in applied.events {
            self.events.publish(event);
        }
        Ok(applied.value)
    }

    async fn persist(&self, locations: &[Location]) -> Result<(), LedgerError> {
        let file = ParkingDataFile {
            locations: locations.iter().map(Location::to_document).collect(),
        };
        save_document(self.store.as_ref(), keys::PARKING_DATA, &file)
            .await
            .map_err(|e| {
                error!("Failed to persist parking data: {}", e);
                LedgerError::Persistence(e)
            })
    }
}

fn position(locations: &[Location], location_id: &str) -> Result<usize, LedgerError> {
    locations
        .iter()
        .position(|l| l.id == location_id)
        .ok_or_else(|| LedgerError::LocationNotFound(location_id.to_string()))
}

fn find<'a>(locations: &'a [Location], location_id: &str) -> Result<&'a Location, LedgerError> {
    position(locations, location_id).map(|i| &locations[i])
}

fn find_mut<'a>(locations: &'a mut [Location], location_id: &str) -> Result<&'a mut Location, LedgerError> {
    position(locations, location_id).map(move |i| &mut locations[i])
}

fn slot_flag(location: &Location, slot_number: u32) -> Result<bool, LedgerError> {
    location
        .is_occupied(slot_number)
        .ok_or_else(|| LedgerError::SlotNotFound {
            location_id: location.id.clone(),
            slot_number,
        })
}

/// Returns whether the slot count changed.
fn resize_slots(location: &mut Location, new_total: u32, allow_destructive: bool) -> Result<bool, LedgerError> {
    let current = location.total_slots();
    if new_total == current {
        return Ok(false);
    }

    if new_total < current {
        let dropped_occupied: Vec<u32> = (new_total + 1..=current)
            .filter(|&n| location.is_occupied(n) == Some(true))
            .collect();

        if let Some(&slot_number) = dropped_occupied.first() {
            if !allow_destructive {
                return Err(LedgerError::ShrinkWouldDropOccupied {
                    location_id: location.id.clone(),
                    new_total,
                    slot_number,
                });
            }
            warn!(
                "Shrinking location {} to {} drops occupied slots {:?}",
                location.id, new_total, dropped_occupied
            );
        }
    }

    location.occupied.resize(new_total as usize, false);
    info!("Resized location {} from {} to {} slots", location.id, current, new_total);
    Ok(true)
}

fn slot_event(location_id: &str, slot_number: u32, is_occupied: bool) -> ParkingEvent {
    ParkingEvent::SlotChanged(SlotChangedEvent {
        location_id: location_id.to_string(),
        slot_number,
        is_occupied,
        changed_at: Utc::now().timestamp(),
    })
}

fn location_event(location_id: &str, total_slots: Option<u32>) -> ParkingEvent {
    ParkingEvent::LocationChanged(LocationChangedEvent {
        location_id: location_id.to_string(),
        total_slots,
        changed_at: Utc::now().timestamp(),
    })
}

#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    #[error("Location not found: {0}")]
    LocationNotFound(String),

    #[error("Slot {slot_number} not found at location {location_id}")]
    SlotNotFound { location_id: String, slot_number: u32 },

    #[error("Slot {slot_number} at location {location_id} is no longer available")]
    SlotUnavailable { location_id: String, slot_number: u32 },

    #[error("Shrinking location {location_id} to {new_total} slots would drop occupied slot {slot_number}")]
    ShrinkWouldDropOccupied {
        location_id: String,
        new_total: u32,
        slot_number: u32,
    },

    #[error("Invalid parking layout: {0}")]
    InvalidLayout(String),

    #[error("Persistence failure: {0}")]
    Persistence(#[from] StoreError),
}
