//! Error handling for easyfetch

use thiserror::Error;

/// Main error type for easyfetch operations
#[derive(Error, Debug)]
pub enum FetchError {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("Already exists: {0}")]
    AlreadyExists(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("SSL/TLS error: {0}")]
    Ssl(String),

    #[error("Proxy error: {0}")]
    Proxy(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl FetchError {
    /// True when the error was raised while validating caller input,
    /// before any network or file activity took place.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            FetchError::InvalidArgument(_)
                | FetchError::NotFound(_)
                | FetchError::PermissionDenied(_)
                | FetchError::AlreadyExists(_)
                | FetchError::Config(_)
        )
    }

    /// True when the transfer engine gave up because of a timeout.
    pub fn is_timeout(&self) -> bool {
        matches!(self, FetchError::Http(err) if err.is_timeout())
    }
}

/// Result type alias for easyfetch operations
pub type Result<T> = std::result::Result<T, FetchError>;
