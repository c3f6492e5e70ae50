//! Fixture and observation storage

pub mod fixtures;
pub mod observations;

// Re-export commonly used types
pub use fixtures::{
    FixtureEntry, FixtureError, FixtureSource, FixtureStore, FixtureTable, DEFAULT_KEY,
};
pub use observations::{
    JsonlObservationStore, MemoryObservationStore, ObservationStore, StoreError,
};
