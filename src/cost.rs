//! Cost Explorer query
//!
//! Daily unblended cost per AWS service for resources tagged with a
//! project (and optionally an environment), over the last 7, 30 or 90
//! days.

use chrono::{Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::HashMap;
use tracing::{debug, info};

use crate::error::CostError;
use crate::gateway::{args, decode, ProviderGateway};

/// Cost Explorer only has an endpoint in us-east-1
pub const COST_EXPLORER_REGION: &str = "us-east-1";

const ALLOWED_DAYS: [u32; 3] = [7, 30, 90];
const METRIC: &str = "UnblendedCost";

/// What to query
#[derive(Debug, Clone)]
pub struct CostQuery {
    pub days: u32,
    pub project: String,
    pub environment: Option<String>,
    /// Tag key that carries the project name
    pub tag_key: String,
}

impl CostQuery {
    pub fn new(project: impl Into<String>, days: u32) -> Self {
        Self {
            days,
            project: project.into(),
            environment: None,
            tag_key: "project".to_string(),
        }
    }

    pub fn environment(mut self, environment: impl Into<String>) -> Self {
        self.environment = Some(environment.into()).filter(|e: &String| !e.is_empty());
        self
    }

    pub fn tag_key(mut self, tag_key: impl Into<String>) -> Self {
        self.tag_key = tag_key.into();
        self
    }

    pub fn validate(&self) -> Result<(), CostError> {
        if ALLOWED_DAYS.contains(&self.days) {
            Ok(())
        } else {
            Err(CostError::InvalidDays(self.days))
        }
    }

    /// `[end - days, end)`; Cost Explorer treats `End` as exclusive
    pub fn period(&self, end: NaiveDate) -> (NaiveDate, NaiveDate) {
        (end - Duration::days(i64::from(self.days)), end)
    }

    /// Cost Explorer filter expression for the project (and environment) tags
    pub fn filter(&self) -> Value {
        let project = json!({"Tags": {"Key": self.tag_key, "Values": [self.project]}});
        match &self.environment {
            Some(env) => json!({
                "And": [
                    project,
                    {"Tags": {"Key": "environment", "Values": [env]}}
                ]
            }),
            None => project,
        }
    }

    fn cli_args(&self, start: NaiveDate, end: NaiveDate) -> Vec<String> {
        args([
            "--time-period".to_string(),
            format!("Start={},End={}", start.format("%Y-%m-%d"), end.format("%Y-%m-%d")),
            "--granularity".to_string(),
            "DAILY".to_string(),
            "--metrics".to_string(),
            METRIC.to_string(),
            "--group-by".to_string(),
            "Type=DIMENSION,Key=SERVICE".to_string(),
            "--filter".to_string(),
            self.filter().to_string(),
        ])
    }
}

/// One service's cost on one day
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CostBreakdown {
    pub date: String,
    pub service: String,
    pub amount: f64,
    pub unit: String,
}

/// All rows for a query plus their sum
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CostReport {
    pub costs: Vec<CostBreakdown>,
    pub total: f64,
}

// ============================================================
// API Response Types
// ============================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct CostAndUsage {
    #[serde(default)]
    results_by_time: Vec<ResultByTime>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ResultByTime {
    time_period: TimePeriod,
    #[serde(default)]
    groups: Vec<Group>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct TimePeriod {
    start: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct Group {
    #[serde(default)]
    keys: Vec<String>,
    #[serde(default)]
    metrics: HashMap<String, Metric>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct Metric {
    amount: String,
    #[serde(default)]
    unit: String,
}

/// Query Cost Explorer for the window ending today (UTC)
pub async fn query_costs(
    gateway: &dyn ProviderGateway,
    query: &CostQuery,
) -> Result<CostReport, CostError> {
    query.validate()?;
    let (start, end) = query.period(Utc::now().date_naive());

    info!(
        project = %query.project,
        start = %start,
        end = %end,
        "Querying Cost Explorer"
    );

    let response = gateway
        .call("ce", "get-cost-and-usage", &query.cli_args(start, end))
        .await?;
    let report = parse_report(response)?;

    debug!(rows = report.costs.len(), total = report.total, "Cost query complete");
    Ok(report)
}

fn parse_report(response: Value) -> Result<CostReport, CostError> {
    let response: CostAndUsage = decode(response, "Cost Explorer")?;

    let mut costs = Vec::new();
    for day in response.results_by_time {
        for group in day.groups {
            let Some(service) = group.keys.into_iter().next() else {
                continue;
            };
            let (amount, unit) = match group.metrics.get(METRIC) {
                Some(metric) => {
                    let amount = metric.amount.parse::<f64>().map_err(|_| CostError::Amount {
                        service: service.clone(),
                        amount: metric.amount.clone(),
                    })?;
                    (amount, metric.unit.clone())
                }
                None => (0.0, String::new()),
            };

            costs.push(CostBreakdown {
                date: day.time_period.start.clone(),
                service,
                amount,
                unit,
            });
        }
    }

    let total = costs.iter().map(|c| c.amount).sum();
    Ok(CostReport { costs, total })
}
