//! Error types
//!
//! Gateway failures are split into "the CLI could not run or returned
//! non-zero" and "the CLI answered but we could not read it", so checks
//! and logs can tell a permissions problem from a schema drift.

use thiserror::Error;

/// Errors raised by a [`crate::ProviderGateway`] call
#[derive(Debug, Error)]
pub enum GatewayError {
    /// The CLI binary could not be started at all
    #[error("failed to run {binary}: {source}")]
    Spawn {
        binary: String,
        #[source]
        source: std::io::Error,
    },

    /// The CLI ran and exited unsuccessfully
    #[error("AWS CLI failed: {status}: {output}")]
    Transport { status: String, output: String },

    /// The response could not be decoded into the expected shape
    #[error("failed to parse {context} response: {source}")]
    Decode {
        context: String,
        #[source]
        source: serde_json::Error,
    },
}

impl GatewayError {
    pub fn decode(context: impl Into<String>, source: serde_json::Error) -> Self {
        GatewayError::Decode {
            context: context.into(),
            source,
        }
    }

    /// Whether the failure came from the call itself rather than decoding
    pub fn is_transport(&self) -> bool {
        matches!(self, GatewayError::Spawn { .. } | GatewayError::Transport { .. })
    }
}

/// Fatal errors raised before any check runs
#[derive(Debug, Error)]
pub enum StartupError {
    /// The identity check against STS failed
    #[error("unable to verify AWS credentials: {0}")]
    Credentials(GatewayError),

    /// The `aws` binary is missing or broken
    #[error("AWS CLI not found: {0}")]
    CliMissing(GatewayError),
}

/// Errors raised by the Cost Explorer query path
#[derive(Debug, Error)]
pub enum CostError {
    #[error("invalid days: {0} (must be 7, 30, or 90)")]
    InvalidDays(u32),

    #[error("AWS CLI query failed: {0}")]
    Query(#[from] GatewayError),

    #[error("invalid cost amount {amount:?} for {service}")]
    Amount { service: String, amount: String },
}
