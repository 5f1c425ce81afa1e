//! RDS DB instances

use async_trait::async_trait;
use serde::Deserialize;

use super::Check;
use crate::error::GatewayError;
use crate::finding::Finding;
use crate::gateway::{decode, ProviderGateway};

#[derive(Debug, Deserialize)]
struct DescribeDbInstances {
    #[serde(default, rename = "DBInstances")]
    db_instances: Vec<DbInstance>,
}

#[derive(Debug, Deserialize)]
struct DbInstance {
    #[serde(rename = "DBInstanceIdentifier")]
    identifier: String,
    #[serde(default, rename = "DBInstanceStatus")]
    status: String,
    #[serde(default, rename = "Engine")]
    engine: String,
    #[serde(default, rename = "DBInstanceClass")]
    class: String,
    #[serde(default, rename = "MultiAZ")]
    multi_az: bool,
}

pub struct DbInstances;

#[async_trait]
impl Check for DbInstances {
    fn id(&self) -> &'static str {
        "rds"
    }

    fn name(&self) -> &'static str {
        "RDS DB Instances"
    }

    async fn run(&self, gateway: &dyn ProviderGateway) -> Result<Vec<String>, GatewayError> {
        let response = gateway.call("rds", "describe-db-instances", &[]).await?;
        let response: DescribeDbInstances = decode(response, "RDS")?;

        Ok(response
            .db_instances
            .iter()
            .map(|db| {
                Finding::new(&db.identifier)
                    .state(&db.status)
                    .field(&db.engine)
                    .field(&db.class)
                    .attr("multiAZ", db.multi_az)
                    .into()
            })
            .collect())
    }
}
