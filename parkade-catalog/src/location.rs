use serde::{Deserialize, Serialize};

/// Slot as persisted inside its location.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SlotRecord {
    pub slot_number: u32,
    pub is_occupied: bool,
}

/// Location as persisted in the parking document.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LocationDocument {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub name: String,
    pub address: String,
    pub total_slots: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub map_url: Option<String>,
    #[serde(default)]
    pub slots: Vec<SlotRecord>,
}

/// `{"locations": [...]}`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ParkingDataFile {
    #[serde(default)]
    pub locations: Vec<LocationDocument>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ParkingLocation {
    pub id: String,
    pub name: String,
    pub address: String,
    pub total_slots: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub map_url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ParkingSlot {
    pub id: String,
    pub location_id: String,
    pub slot_number: u32,
    pub is_occupied: bool,
}

impl ParkingSlot {
    pub fn slot_id(location_id: &str, slot_number: u32) -> String {
        format!("{}-{}", location_id, slot_number)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewLocation {
    pub name: String,
    pub address: String,
    pub total_slots: u32,
    #[serde(default)]
    pub map_url: Option<String>,
}

/// Partial edit. An empty `map_url` clears the link.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocationPatch {
    pub name: Option<String>,
    pub address: Option<String>,
    pub total_slots: Option<u32>,
    pub map_url: Option<String>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct OccupancySummary {
    pub total: u32,
    pub occupied: u32,
    pub free: u32,
}

/// Ledger-side location. Slots are kept dense and ordered: `slots[i]` is
/// slot number `i + 1`, so the slot count is the location's total by construction.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Location {
    pub id: String,
    pub name: String,
    pub address: String,
    pub map_url: Option<String>,
    pub occupied: Vec<bool>,
}

impl Location {
    pub fn total_slots(&self) -> u32 {
        self.occupied.len() as u32
    }

    pub fn is_occupied(&self, slot_number: u32) -> Option<bool> {
        let index = (slot_number as usize).checked_sub(1)?;
        self.occupied.get(index).copied()
    }

    pub fn set_occupied(&mut self, slot_number: u32, occupied: bool) -> bool {
        match (slot_number as usize).checked_sub(1).and_then(|i| self.occupied.get_mut(i)) {
            Some(flag) => {
                *flag = occupied;
                true
            }
            None => false,
        }
    }

    pub fn view(&self) -> ParkingLocation {
        ParkingLocation {
            id: self.id.clone(),
            name: self.name.clone(),
            address: self.address.clone(),
            total_slots: self.total_slots(),
            map_url: self.map_url.clone(),
        }
    }

    pub fn slots(&self) -> Vec<ParkingSlot> {
        self.occupied
            .iter()
            .enumerate()
            .map(|(i, &is_occupied)| {
                let slot_number = i as u32 + 1;
                ParkingSlot {
                    id: ParkingSlot::slot_id(&self.id, slot_number),
                    location_id: self.id.clone(),
                    slot_number,
                    is_occupied,
                }
            })
            .collect()
    }

    pub fn occupancy(&self) -> OccupancySummary {
        let occupied = self.occupied.iter().filter(|&&o| o).count() as u32;
        OccupancySummary {
            total: self.total_slots(),
            occupied,
            free: self.total_slots() - occupied,
        }
    }

    pub fn to_document(&self) -> LocationDocument {
        LocationDocument {
            id: Some(self.id.clone()),
            name: self.name.clone(),
            address: self.address.clone(),
            total_slots: self.total_slots(),
            map_url: self.map_url.clone(),
            slots: self
                .occupied
                .iter()
                .enumerate()
                .map(|(i, &is_occupied)| SlotRecord {
                    slot_number: i as u32 + 1,
                    is_occupied,
                })
                .collect(),
        }
    }

    /// Lenient conversion used when loading stored data: the slot set is
    /// rebuilt as `1..=total_slots`, taking occupancy from matching records.
    /// Returns whether the stored slots disagreed with the total.
    pub fn from_document_lenient(doc: &LocationDocument, position: usize) -> (Self, bool) {
        let mut occupied = vec![false; doc.total_slots as usize];
        let mut mismatch = doc.slots.len() != doc.total_slots as usize;

        for slot in &doc.slots {
            match (slot.slot_number as usize).checked_sub(1).and_then(|i| occupied.get_mut(i)) {
                Some(flag) => *flag = slot.is_occupied,
                None => mismatch = true,
            }
        }

        let location = Self {
            id: doc.id.clone().unwrap_or_else(|| legacy_id(position)),
            name: doc.name.clone(),
            address: doc.address.clone(),
            map_url: doc.map_url.clone(),
            occupied,
        };
        (location, mismatch)
    }

    /// Strict conversion for admin uploads: slots must be exactly `1..=total_slots`.
    pub fn from_document_strict(doc: &LocationDocument, position: usize) -> Result<Self, String> {
        if doc.slots.len() != doc.total_slots as usize {
            return Err(format!(
                "location {:?} declares {} slots but lists {}",
                doc.name,
                doc.total_slots,
                doc.slots.len()
            ));
        }

        let mut numbers: Vec<u32> = doc.slots.iter().map(|s| s.slot_number).collect();
        numbers.sort_unstable();
        if numbers.iter().enumerate().any(|(i, &n)| n != i as u32 + 1) {
            return Err(format!(
                "location {:?} slot numbers must be 1..={} without gaps",
                doc.name, doc.total_slots
            ));
        }

        let (location, _) = Self::from_document_lenient(doc, position);
        Ok(location)
    }
}

/// Position-derived id for documents written before ids were persisted.
pub fn legacy_id(position: usize) -> String {
    format!("loc_{}", position + 1)
}
