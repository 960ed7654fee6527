//! `panel-store` — typed key-value repositories.
//!
//! Each collection of records sits behind [`Repository`]; callers receive the
//! trait object and never see the backend. Two backends ship here: an
//! in-memory map for tests and short-lived runs, and a single-file SQLite
//! store for anything that must survive the process.

pub mod error;
pub mod memory;
pub mod repository;
pub mod sqlite;

pub use error::StoreError;
pub use memory::MemoryRepository;
pub use repository::{Record, Repository};
pub use sqlite::SqliteRepository;
