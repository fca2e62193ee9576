//! Live grammar-check engine for markdown documents.
//!
//! Ties the annotation and checker crates together: a rope-backed document
//! buffer, structural exclusion zones, a decoration store remapped through
//! edits, a debounced check orchestrator, and personal-dictionary
//! reconciliation with the checker account.

pub mod config;
pub mod dictionary;
pub mod document;
pub mod error;
pub mod exclusions;
pub mod orchestrator;
pub mod store;

pub use config::{Config, FileStore, Loader, Saver};
pub use dictionary::{MergePlan, RemoteDictionary, SyncOutcome};
pub use document::{DocumentBuffer, Edit};
pub use error::EngineError;
pub use exclusions::ExclusionZones;
pub use orchestrator::{CheckOrchestrator, PendingCheck};
pub use store::{DecorationStore, Underline};
