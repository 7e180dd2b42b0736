#![forbid(unsafe_code)]

pub mod repository;
pub mod sqlite;

pub use repository::{
    DateRange, InMemoryRepository, LedgerPersistence, PlanRepository, ProgressionRepository,
    Storage, StorageError, UserRepository, WorkSessionRepository,
};
pub use sqlite::{SqliteInitError, SqliteRepository};
