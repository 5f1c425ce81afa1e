//! Application and network load balancers (elbv2)

use async_trait::async_trait;
use serde::Deserialize;

use super::Check;
use crate::error::GatewayError;
use crate::finding::Finding;
use crate::gateway::{decode, ProviderGateway};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct DescribeLoadBalancers {
    #[serde(default)]
    load_balancers: Vec<LoadBalancer>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct LoadBalancer {
    load_balancer_name: String,
    #[serde(default)]
    scheme: String,
    #[serde(default, rename = "Type")]
    lb_type: String,
    #[serde(default)]
    load_balancer_arn: String,
    #[serde(default)]
    state: LoadBalancerState,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct LoadBalancerState {
    #[serde(default)]
    code: String,
}

pub struct LoadBalancers;

#[async_trait]
impl Check for LoadBalancers {
    fn id(&self) -> &'static str {
        "elb"
    }

    fn name(&self) -> &'static str {
        "Load Balancers (ALB/NLB)"
    }

    async fn run(&self, gateway: &dyn ProviderGateway) -> Result<Vec<String>, GatewayError> {
        let response = gateway
            .call("elbv2", "describe-load-balancers", &[])
            .await?;
        let response: DescribeLoadBalancers = decode(response, "Load Balancer")?;

        Ok(response
            .load_balancers
            .iter()
            .map(|lb| {
                Finding::new(&lb.load_balancer_name)
                    .state(&lb.state.code)
                    .attr("type", &lb.lb_type)
                    .attr("scheme", &lb.scheme)
                    .attr("arn", &lb.load_balancer_arn)
                    .into()
            })
            .collect())
    }
}
