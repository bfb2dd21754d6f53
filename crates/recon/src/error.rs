use std::fmt;

/// Failures raised by a [`crate::store::DatasetStore`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// The backing store could not complete the operation.
    Backend(String),
    /// Another write landed first; the document was built on a stale copy.
    Conflict { name: String, expected: u64, found: u64 },
    /// Stored data could not be read back into a document.
    Corrupt(String),
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Backend(msg) => write!(f, "storage error: {msg}"),
            Self::Conflict { name, expected, found } => write!(
                f,
                "dataset '{name}' was modified concurrently (expected revision {expected}, found {found})"
            ),
            Self::Corrupt(msg) => write!(f, "stored data is corrupt: {msg}"),
        }
    }
}

impl std::error::Error for StoreError {}

#[derive(Debug)]
pub enum ReconError {
    /// Spreadsheet bytes could not be turned into rows.
    Decode(String),
    /// Store failure, passed through unchanged.
    Storage(StoreError),
    /// Policy / settings TOML could not be parsed.
    Policy(String),
}

impl fmt::Display for ReconError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Decode(msg) => write!(f, "cannot decode spreadsheet: {msg}"),
            Self::Storage(e) => write!(f, "{e}"),
            Self::Policy(msg) => write!(f, "policy config error: {msg}"),
        }
    }
}

impl std::error::Error for ReconError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Storage(e) => Some(e),
            _ => None,
        }
    }
}

impl From<StoreError> for ReconError {
    fn from(e: StoreError) -> Self {
        Self::Storage(e)
    }
}
