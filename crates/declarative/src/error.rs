//! Error types for provider operations

use thiserror::Error;

/// Errors surfaced to the orchestrator as call-level failures
#[derive(Debug, Error)]
pub enum ProviderError {
    /// The URN names a resource type this provider does not manage
    #[error("Unknown resource type '{0}'")]
    UnknownResourceType(String),

    /// Invoke or StreamInvoke was called with a token nobody serves
    #[error("Unknown Invoke token '{0}'")]
    UnknownInvokeToken(String),

    /// The lifecycle method is not supported by this provider
    #[error("{0} is not implemented")]
    Unimplemented(&'static str),

    /// Properties could not be interpreted as the resource's schema
    #[error("invalid properties: {0}")]
    InvalidProperties(String),

    /// Any other failure, with its context chain preserved
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Result type for provider operations
pub type Result<T> = std::result::Result<T, ProviderError>;
