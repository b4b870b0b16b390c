//! Record model, storage and the engine façade.

pub mod engine;
pub mod error;
pub mod hash;
pub mod memory_store;
pub mod sqlite_store;
pub mod store;
pub mod time;
pub mod types;
