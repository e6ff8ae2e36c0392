use latticeflow_cloud::LatticeError;
use thiserror::Error;

/// How the caller should react to an [`Error`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Requeue after backoff; the remote side or a prerequisite is not ready yet
    Retryable,
    /// Bad input or broken references; retrying the same input will not help
    Fatal,
    /// Anything else the remote API or cluster reported
    Transport,
}

#[derive(Error, Debug, Clone)]
pub enum Error {
    #[error("retry: {0}")]
    Retry(String),

    #[error("operation cancelled")]
    Cancelled,

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("cluster object not found: {0}")]
    MissingObject(String),

    #[error("integrity violation: {0}")]
    Integrity(String),

    #[error("{0} exists but is not managed by this controller")]
    NotManaged(String),

    #[error("remote control plane: {0}")]
    Remote(#[from] LatticeError),

    #[error("cluster API: {0}")]
    Cluster(String),
}

impl Error {
    pub fn retry(message: impl Into<String>) -> Self {
        Self::Retry(message.into())
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Retry(_) | Self::Cancelled => ErrorKind::Retryable,
            Self::Remote(e) if e.is_transitional() => ErrorKind::Retryable,
            Self::InvalidConfig(_) | Self::MissingObject(_) | Self::Integrity(_) | Self::NotManaged(_) => {
                ErrorKind::Fatal
            }
            Self::Remote(_) | Self::Cluster(_) => ErrorKind::Transport,
        }
    }

    pub fn is_retryable(&self) -> bool {
        self.kind() == ErrorKind::Retryable
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kinds() {
        assert_eq!(Error::retry("tg busy").kind(), ErrorKind::Retryable);
        assert_eq!(Error::Cancelled.kind(), ErrorKind::Retryable);
        assert_eq!(
            Error::Remote(LatticeError::Conflict("deleting".into())).kind(),
            ErrorKind::Retryable
        );
        assert_eq!(
            Error::Integrity("tg not referenced".into()).kind(),
            ErrorKind::Fatal
        );
        assert_eq!(Error::NotManaged("svc".into()).kind(), ErrorKind::Fatal);
        assert_eq!(
            Error::Remote(LatticeError::Api("500".into())).kind(),
            ErrorKind::Transport
        );
        assert_eq!(
            Error::Remote(LatticeError::NotFound("x".into())).kind(),
            ErrorKind::Transport
        );
        assert_eq!(Error::Cluster("timeout".into()).kind(), ErrorKind::Transport);
    }
}
