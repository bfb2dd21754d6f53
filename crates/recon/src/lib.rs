//! `ratebook-recon`: upload normalization and reconciliation engine.
//!
//! Pure engine crate: takes decoded sheet rows and a store handle, returns
//! the merged dataset. No file format or database dependencies.

pub mod config;
pub mod decode;
pub mod delta;
pub mod engine;
pub mod error;
pub mod ingest;
pub mod matcher;
pub mod model;
pub mod normalize;
pub mod report;
pub mod store;

pub use config::{ReconPolicy, UnmatchedIncoming, ZeroBaseline};
pub use engine::reconcile;
pub use error::{ReconError, StoreError};
pub use model::{
    CanonicalRecord, CellValue, ChangeAnnotation, DatasetDocument, RecordKey, RecordPatch, ReconOutcome,
    ReconResult, ReconSummary, SheetRow,
};
pub use normalize::{normalize, Field};
pub use store::{DatasetStore, MemoryStore};
