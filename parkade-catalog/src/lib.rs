pub mod ledger;
pub mod location;

pub use ledger::{LedgerError, LedgerOptions, SlotLedger, DEFAULT_MAX_SLOTS_PER_LOCATION};
pub use location::{
    LocationDocument, LocationPatch, NewLocation, OccupancySummary, ParkingDataFile, ParkingLocation,
    ParkingSlot, SlotRecord,
};
