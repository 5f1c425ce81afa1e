//! Provider Gateway
//!
//! Trait-based call surface for AWS. A gateway is bound to one region and
//! one identity at construction; every call is one round trip with no
//! caching and no retries.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::GatewayError;

pub mod cli;

#[cfg(test)]
pub(crate) mod testing;

pub use cli::AwsCli;

/// Identity returned by `sts get-caller-identity`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct CallerIdentity {
    pub account: String,
    pub arn: String,
    #[serde(default)]
    pub user_id: String,
}

/// Authenticated call surface for a single region
#[async_trait]
pub trait ProviderGateway: Send + Sync {
    /// Region every call is scoped to
    fn region(&self) -> &str;

    /// Execute `operation` of `service` and return the decoded JSON body
    async fn call(
        &self,
        service: &str,
        operation: &str,
        args: &[String],
    ) -> Result<Value, GatewayError>;

    /// Validate credentials before any check runs
    async fn caller_identity(&self) -> Result<CallerIdentity, GatewayError> {
        let response = self.call("sts", "get-caller-identity", &[]).await?;
        decode(response, "STS")
    }
}

/// Decode a raw response into a typed schema, tagging failures with `context`
pub fn decode<T: DeserializeOwned>(value: Value, context: &str) -> Result<T, GatewayError> {
    serde_json::from_value(value).map_err(|e| GatewayError::decode(context, e))
}

/// Build an owned argument list from string literals
pub fn args<I, S>(items: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    items.into_iter().map(Into::into).collect()
}
