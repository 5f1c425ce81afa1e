//! Audit checks
//!
//! One check per billable resource family. Each check queries the
//! gateway, decodes into its own typed response schema, and renders one
//! finding string per resource:
//! - `ec2`: EC2 instances that are not terminated
//! - `ebs`: EBS volumes, attached or not
//! - `eip`: Elastic IPs, flagging unassociated ones
//! - `nat`: NAT gateways that are still up
//! - `elb`: ALB/NLB load balancers
//! - `rds`: RDS DB instances
//! - `eks`: EKS clusters
//! - `ecs`: ECS services with desired or running tasks
//! - `lambda`: Lambda functions

use anyhow::bail;
use async_trait::async_trait;
use std::sync::Arc;

use crate::error::GatewayError;
use crate::gateway::ProviderGateway;

mod ec2;
mod ecs;
mod eks;
mod elb;
mod lambda;
mod rds;

pub use ec2::{ElasticIps, Instances, NatGateways, Volumes};
pub use ecs::EcsServices;
pub use eks::EksClusters;
pub use elb::LoadBalancers;
pub use lambda::LambdaFunctions;
pub use rds::DbInstances;

/// Clusters fetched at once by checks that fan out per cluster
pub const FAN_OUT_LIMIT: usize = 4;

/// An independent audit unit scoped to one resource family
#[async_trait]
pub trait Check: Send + Sync {
    /// Short stable identifier used for `--only` / `--skip`
    fn id(&self) -> &'static str;

    /// Section title shown to the user
    fn name(&self) -> &'static str;

    /// Run the check and return one finding per billable resource
    async fn run(&self, gateway: &dyn ProviderGateway) -> Result<Vec<String>, GatewayError>;
}

/// The fixed check battery, in output order
pub fn registry() -> Vec<Arc<dyn Check>> {
    vec![
        Arc::new(Instances),
        Arc::new(Volumes),
        Arc::new(ElasticIps),
        Arc::new(NatGateways),
        Arc::new(LoadBalancers),
        Arc::new(DbInstances),
        Arc::new(EksClusters),
        Arc::new(EcsServices),
        Arc::new(LambdaFunctions),
    ]
}

/// Narrow a registry to `only` (when non-empty) minus `skip`, keeping order
pub fn select(
    checks: Vec<Arc<dyn Check>>,
    only: &[String],
    skip: &[String],
) -> anyhow::Result<Vec<Arc<dyn Check>>> {
    let known: Vec<&'static str> = checks.iter().map(|c| c.id()).collect();
    if let Some(unknown) = only
        .iter()
        .chain(skip)
        .find(|id| !known.iter().any(|k| *k == id.as_str()))
    {
        bail!(
            "unknown check `{}` (valid checks: {})",
            unknown,
            known.join(", ")
        );
    }

    Ok(checks
        .into_iter()
        .filter(|c| only.is_empty() || only.iter().any(|id| id == c.id()))
        .filter(|c| !skip.iter().any(|id| id == c.id()))
        .collect())
}
