//! Error taxonomy for the CAS agent.
//!
//! Protocol-level rejections are not errors: they surface as
//! [`ValidationOutcome::Failure`](crate::protocol::ValidationOutcome).

use thiserror::Error;

/// Errors surfaced by the CAS core.
#[derive(Debug, Error)]
pub enum CasError {
    /// Missing or invalid configuration. Fatal at construction.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Transport failure while reaching the CAS server.
    #[error("network error: {0}")]
    Network(String),

    /// A session store operation failed.
    #[error("session store error: {0}")]
    SessionStore(String),
}

impl From<reqwest::Error> for CasError {
    fn from(err: reqwest::Error) -> Self {
        CasError::Network(err.to_string())
    }
}

impl From<anyhow::Error> for CasError {
    fn from(err: anyhow::Error) -> Self {
        CasError::SessionStore(format!("{:#}", err))
    }
}

pub type CasResult<T> = std::result::Result<T, CasError>;
