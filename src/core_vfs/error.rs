use thiserror::Error;

use crate::core_auth::AuthError;

/// Failures surfaced by virtual filesystem operations.
#[derive(Debug, Error)]
pub enum VfsError {
    #[error(transparent)]
    Denied(#[from] AuthError),

    #[error("path is a directory")]
    IsDirectory,

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl VfsError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, VfsError::Io(e) if e.kind() == std::io::ErrorKind::NotFound)
    }
}
