//! Remote control-plane error types

use thiserror::Error;

/// Errors returned by a [`crate::LatticeApi`] implementation
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LatticeError {
    #[error("Resource not found: {0}")]
    NotFound(String),

    /// The resource exists but is being created or deleted
    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Access denied: {0}")]
    AccessDenied(String),

    #[error("Throttled: {0}")]
    Throttled(String),

    #[error("API error: {0}")]
    Api(String),
}

impl LatticeError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }

    /// Conflicts signal a resource mid-transition rather than a bad request
    pub fn is_transitional(&self) -> bool {
        matches!(self, Self::Conflict(_))
    }
}

pub type Result<T> = std::result::Result<T, LatticeError>;
