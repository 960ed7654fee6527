//! `panel-recon` — Provider reconciliation against a TPA panel directory.
//!
//! Pure engine crate: receives a loaded directory and a batch of provider
//! rows, returns a report of exact, fuzzy, and unmatched records. CSV
//! ingestion is provided for callers; the CLI owns file and store access.

pub mod alternatives;
pub mod config;
pub mod directory;
pub mod engine;
pub mod error;
pub mod geo;
pub mod ingest;
pub mod matcher;
pub mod model;
pub mod normalize;
pub mod report;

pub use alternatives::{find_alternatives, DistanceSource, NoDistance};
pub use config::ReconConfig;
pub use directory::{DirectoryHandle, PanelDirectory};
pub use engine::{run, run_with_handle};
pub use error::{GeocodeUnavailable, ReconError};
pub use geo::CoordinateTable;
pub use model::{
    AlternativeProvider, MatchOutcome, MatchTier, PanelProvider, PanelStatus, RawProviderRecord,
    ReasonCode, ReconSummary, ReconciledRecord, ReconciliationReport,
};
