pub mod app_config;
pub mod events;
pub mod json_store;
pub mod memory_store;

pub use events::EventPublisher;
pub use json_store::JsonFileStore;
pub use memory_store::MemoryStore;
