//! Lambda functions (presence only; idle functions cost nothing but are
//! a sign something was left behind)

use async_trait::async_trait;
use serde::Deserialize;

use super::Check;
use crate::error::GatewayError;
use crate::finding::Finding;
use crate::gateway::{decode, ProviderGateway};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ListFunctions {
    #[serde(default)]
    functions: Vec<Function>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct Function {
    function_name: String,
    // Absent for container-image functions
    runtime: Option<String>,
    #[serde(default)]
    memory_size: u64,
}

pub struct LambdaFunctions;

#[async_trait]
impl Check for LambdaFunctions {
    fn id(&self) -> &'static str {
        "lambda"
    }

    fn name(&self) -> &'static str {
        "Lambda Functions (presence)"
    }

    async fn run(&self, gateway: &dyn ProviderGateway) -> Result<Vec<String>, GatewayError> {
        let response = gateway.call("lambda", "list-functions", &[]).await?;
        let response: ListFunctions = decode(response, "Lambda")?;

        Ok(response
            .functions
            .iter()
            .map(|func| {
                Finding::new(&func.function_name)
                    .attr("runtime", func.runtime.as_deref().unwrap_or("-"))
                    .attr("memory", format!("{}MB", func.memory_size))
                    .into()
            })
            .collect())
    }
}
