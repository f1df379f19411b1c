use tether_directory::DirectoryError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ReconcileError {
    #[error("directory error: {0}")]
    Directory(#[from] DirectoryError),

    #[error("invalid identity: {0}")]
    Domain(#[from] tether_domain::DomainError),

    #[error("service principal '{display_name}' belongs to appId {found}, expected {expected}")]
    AppIdMismatch {
        display_name: String,
        expected: String,
        found: String,
    },

    #[error("internal error: {0}")]
    Internal(String),
}

impl ReconcileError {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, ReconcileError::Directory(e) if e.is_cancelled())
    }
}
