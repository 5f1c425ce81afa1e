//! AWS CLI gateway
//!
//! Runs `aws <service> <operation> --region <r> --output json ...` as a
//! subprocess. Authentication is whatever the CLI resolves:
//! - Local: `aws configure` / `aws sso login`, optionally via `AWS_PROFILE`
//! - CI: environment credentials or an assumed role

use async_trait::async_trait;
use serde_json::Value;
use std::process::Output;
use tokio::process::Command;
use tracing::debug;

use super::ProviderGateway;
use crate::error::GatewayError;

const DEFAULT_BINARY: &str = "aws";

/// Gateway backed by the `aws` command line
#[derive(Debug, Clone)]
pub struct AwsCli {
    binary: String,
    profile: Option<String>,
    region: String,
}

impl AwsCli {
    /// Create a gateway for `region`, optionally pinned to a named profile
    pub fn new(region: impl Into<String>, profile: Option<String>) -> Self {
        Self {
            binary: DEFAULT_BINARY.to_string(),
            profile: profile.filter(|p| !p.is_empty()),
            region: region.into(),
        }
    }

    /// Use a different CLI binary (path or name on `PATH`)
    pub fn with_binary(mut self, binary: impl Into<String>) -> Self {
        self.binary = binary.into();
        self
    }

    pub fn profile(&self) -> Option<&str> {
        self.profile.as_deref()
    }

    /// Verify the CLI is installed by running `aws --version`
    pub async fn ensure_installed(&self) -> Result<(), GatewayError> {
        let output = self.command().arg("--version").output().await.map_err(|source| {
            GatewayError::Spawn {
                binary: self.binary.clone(),
                source,
            }
        })?;

        if !output.status.success() {
            return Err(transport_error(&output));
        }

        Ok(())
    }

    fn command(&self) -> Command {
        let mut cmd = Command::new(&self.binary);
        cmd.env("AWS_PAGER", "").kill_on_drop(true);
        if let Some(profile) = &self.profile {
            cmd.env("AWS_PROFILE", profile);
        }
        cmd
    }
}

#[async_trait]
impl ProviderGateway for AwsCli {
    fn region(&self) -> &str {
        &self.region
    }

    async fn call(
        &self,
        service: &str,
        operation: &str,
        args: &[String],
    ) -> Result<Value, GatewayError> {
        debug!(service, operation, region = %self.region, "Invoking AWS CLI");

        let output = self
            .command()
            .arg(service)
            .arg(operation)
            .args(["--region", self.region.as_str(), "--output", "json"])
            .args(args)
            .output()
            .await
            .map_err(|source| GatewayError::Spawn {
                binary: self.binary.clone(),
                source,
            })?;

        if !output.status.success() {
            let err = transport_error(&output);
            debug!(service, operation, error = %err, "AWS CLI call failed");
            return Err(err);
        }

        parse_body(&output.stdout, &format!("{} {}", service, operation))
    }
}

fn transport_error(output: &Output) -> GatewayError {
    let stderr = String::from_utf8_lossy(&output.stderr);
    let diagnostic = if stderr.trim().is_empty() {
        String::from_utf8_lossy(&output.stdout).trim().to_string()
    } else {
        stderr.trim().to_string()
    };

    GatewayError::Transport {
        status: output.status.to_string(),
        output: diagnostic,
    }
}

/// Parse CLI stdout; operations with no output decode as an empty object
fn parse_body(stdout: &[u8], context: &str) -> Result<Value, GatewayError> {
    if stdout.iter().all(u8::is_ascii_whitespace) {
        return Ok(Value::Object(Default::default()));
    }
    serde_json::from_slice(stdout).map_err(|e| GatewayError::decode(context, e))
}
