pub mod fee;
pub mod identity;
pub mod payment;
pub mod repository;

pub use fee::{compute_fee, Amount, FeePolicy};
pub use identity::{Requester, Role};
pub use repository::{KeyValueStore, StoreError};
