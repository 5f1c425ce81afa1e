//! EKS clusters
//!
//! Lists cluster names, then describes each cluster for status and
//! version. Unlike every other check, a failing list call is not an
//! error: it is treated as missing EKS permissions and the check reports
//! nothing instead.

use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use serde::Deserialize;
use tracing::warn;

use super::{Check, FAN_OUT_LIMIT};
use crate::error::GatewayError;
use crate::finding::{item_error, Finding};
use crate::gateway::{args, decode, ProviderGateway};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListClusters {
    #[serde(default)]
    clusters: Vec<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DescribeCluster {
    cluster: Cluster,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Cluster {
    #[serde(default)]
    status: String,
    #[serde(default)]
    version: String,
}

pub struct EksClusters;

#[async_trait]
impl Check for EksClusters {
    fn id(&self) -> &'static str {
        "eks"
    }

    fn name(&self) -> &'static str {
        "EKS Clusters"
    }

    async fn run(&self, gateway: &dyn ProviderGateway) -> Result<Vec<String>, GatewayError> {
        // A failed list is a permissions gap, not an error
        let response = match gateway.call("eks", "list-clusters", &[]).await {
            Ok(response) => response,
            Err(e) => {
                warn!(error = %e, "EKS list-clusters failed; treating as no clusters");
                return Ok(Vec::new());
            }
        };
        let response: ListClusters = decode(response, "EKS")?;

        Ok(stream::iter(response.clusters)
            .map(|name| async move { describe(gateway, &name).await })
            .buffered(FAN_OUT_LIMIT)
            .collect()
            .await)
    }
}

/// Describe one cluster; failures become an inline finding for that cluster
async fn describe(gateway: &dyn ProviderGateway, name: &str) -> String {
    let described = match gateway
        .call("eks", "describe-cluster", &args(["--name", name]))
        .await
    {
        Ok(response) => decode::<DescribeCluster>(response, "EKS describe-cluster"),
        Err(e) => Err(e),
    };

    match described {
        Ok(desc) => Finding::new(name)
            .state(format!("status={}", desc.cluster.status))
            .attr("version", desc.cluster.version)
            .into(),
        Err(e) => {
            warn!(cluster = name, error = %e, "EKS describe-cluster failed");
            item_error(name, e)
        }
    }
}
