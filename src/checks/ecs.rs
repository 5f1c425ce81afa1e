//! ECS services with desired or running tasks
//!
//! Two-level fan-out: clusters → service ARNs → batched
//! `describe-services` (at most 10 ARNs per call). A failure inside one
//! cluster becomes a single inline finding for that cluster; the other
//! clusters are still reported. Output is sorted so repeated runs agree.

use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use serde::Deserialize;
use tracing::{debug, warn};

use super::{Check, FAN_OUT_LIMIT};
use crate::batch::{describe_batched, BatchCall};
use crate::error::GatewayError;
use crate::finding::{item_error, Finding};
use crate::gateway::{args, decode, ProviderGateway};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListClusters {
    #[serde(default)]
    cluster_arns: Vec<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListServices {
    #[serde(default)]
    service_arns: Vec<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DescribeServices {
    #[serde(default)]
    services: Vec<Service>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Service {
    service_name: String,
    #[serde(default)]
    status: String,
    #[serde(default)]
    desired_count: u32,
    #[serde(default)]
    running_count: u32,
}

impl Service {
    /// Services scaled to zero are not billing
    fn is_active(&self) -> bool {
        self.desired_count > 0 || self.running_count > 0
    }
}

pub struct EcsServices;

#[async_trait]
impl Check for EcsServices {
    fn id(&self) -> &'static str {
        "ecs"
    }

    fn name(&self) -> &'static str {
        "ECS Services (desired/running > 0)"
    }

    async fn run(&self, gateway: &dyn ProviderGateway) -> Result<Vec<String>, GatewayError> {
        let response = gateway.call("ecs", "list-clusters", &[]).await?;
        let response: ListClusters = decode(response, "ECS clusters")?;

        let per_cluster: Vec<Vec<String>> = stream::iter(response.cluster_arns)
            .map(|arn| async move { audit_cluster(gateway, &arn).await })
            .buffered(FAN_OUT_LIMIT)
            .collect()
            .await;

        let mut items: Vec<String> = per_cluster.into_iter().flatten().collect();
        items.sort();
        Ok(items)
    }
}

/// Findings for one cluster, or a single inline error finding
async fn audit_cluster(gateway: &dyn ProviderGateway, cluster_arn: &str) -> Vec<String> {
    match active_services(gateway, cluster_arn).await {
        Ok(services) => services
            .iter()
            .map(|svc| {
                Finding::new(&svc.service_name)
                    .state(&svc.status)
                    .attr("desired", svc.desired_count)
                    .attr("running", svc.running_count)
                    .attr("cluster", cluster_arn)
                    .into()
            })
            .collect(),
        Err(e) => {
            warn!(cluster = cluster_arn, error = %e, "ECS cluster audit failed");
            vec![item_error(cluster_arn, e)]
        }
    }
}

async fn active_services(
    gateway: &dyn ProviderGateway,
    cluster_arn: &str,
) -> Result<Vec<Service>, GatewayError> {
    let response = gateway
        .call("ecs", "list-services", &args(["--cluster", cluster_arn]))
        .await?;
    let response: ListServices = decode(response, "ECS services")?;

    if response.service_arns.is_empty() {
        debug!(cluster = cluster_arn, "No ECS services");
        return Ok(Vec::new());
    }

    let call = BatchCall {
        service: "ecs",
        operation: "describe-services",
        args: args(["--cluster", cluster_arn]),
        ids_flag: "--services",
    };
    let services = describe_batched(gateway, &call, &response.service_arns, |r: DescribeServices| {
        r.services
    })
    .await?;

    Ok(services.into_iter().filter(Service::is_active).collect())
}
