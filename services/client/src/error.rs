//! services/client/src/error.rs
//!
//! Defines the primary error type for the entire client service.

use crate::config::ConfigError;
use nutripet_core::ports::{GatewayError, PortError};
use nutripet_core::stores::WorkflowError;


/// The primary error type for the `client` service.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// Represents an error that occurred during configuration loading.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Represents a failure normalized by the request gateway.
    #[error("Gateway error: {0}")]
    Gateway(#[from] GatewayError),

    /// Represents a failure surfaced by the detection workflow.
    #[error("Workflow error: {0}")]
    Workflow(#[from] WorkflowError),

    /// Represents an error that propagated up from one of the core service ports.
    #[error("Service Port Error: {0}")]
    Port(#[from] PortError),

    /// Represents an error from the underlying HTTP library.
    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    /// Represents a standard Input/Output error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A catch-all for any other unexpected errors.
    #[error("An unexpected internal error occurred: {0}")]
    Internal(String),
}
