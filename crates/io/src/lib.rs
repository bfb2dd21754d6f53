// File and storage adapters around the reconciliation engine

pub mod csv;
pub mod store;
pub mod upload;
pub mod xlsx;

pub use store::SqliteStore;
pub use upload::{upload_bytes, upload_file, SheetFormat};
