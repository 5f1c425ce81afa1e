//! spend-audit Library
//!
//! Audits one AWS region for resources that keep billing after a project
//! is torn down, and queries Cost Explorer for per-project spend.
//! All AWS access goes through the `aws` CLI behind the
//! [`ProviderGateway`] trait.

pub mod audit;
pub mod batch;
pub mod checks;
pub mod cli;
pub mod cost;
pub mod error;
pub mod finding;
pub mod gateway;
pub mod render;
pub mod result;

pub use audit::Auditor;
pub use checks::Check;
pub use error::{CostError, GatewayError, StartupError};
pub use gateway::{AwsCli, CallerIdentity, ProviderGateway};
pub use result::{AuditResult, ExitStatus};
