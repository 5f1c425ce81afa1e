//! Audit Orchestrator
//!
//! Runs the check registry against one gateway and returns exactly one
//! [`AuditResult`] per check, in registry order. A failing (or panicking)
//! check is recorded and never stops the others. Checks may run
//! concurrently; results are reassembled in registry order either way.

use futures::stream::{self, StreamExt};
use futures::FutureExt;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info, warn};

use crate::checks::Check;
use crate::error::StartupError;
use crate::gateway::{CallerIdentity, ProviderGateway};
use crate::result::AuditResult;

/// Ordered check runner bound to one region/identity
pub struct Auditor {
    gateway: Arc<dyn ProviderGateway>,
    checks: Vec<Arc<dyn Check>>,
    concurrency: usize,
}

impl Auditor {
    /// Create an auditor that runs `checks` one at a time
    pub fn new(gateway: Arc<dyn ProviderGateway>, checks: Vec<Arc<dyn Check>>) -> Self {
        Self {
            gateway,
            checks,
            concurrency: 1,
        }
    }

    /// Allow up to `concurrency` checks in flight (minimum 1)
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    pub fn region(&self) -> &str {
        self.gateway.region()
    }

    /// Validate credentials; failure here is fatal for the whole run
    pub async fn verify_identity(&self) -> Result<CallerIdentity, StartupError> {
        let identity = self
            .gateway
            .caller_identity()
            .await
            .map_err(StartupError::Credentials)?;

        info!(
            account = %identity.account,
            arn = %identity.arn,
            region = self.gateway.region(),
            "Credentials verified"
        );
        Ok(identity)
    }

    /// Run every registered check
    pub async fn audit(&self) -> Vec<AuditResult> {
        info!(
            checks = self.checks.len(),
            concurrency = self.concurrency,
            region = self.gateway.region(),
            "Starting audit"
        );

        stream::iter(&self.checks)
            .map(|check| self.run_check(check.as_ref()))
            .buffered(self.concurrency)
            .collect()
            .await
    }

    async fn run_check(&self, check: &dyn Check) -> AuditResult {
        let started = Instant::now();
        let outcome = AssertUnwindSafe(check.run(self.gateway.as_ref()))
            .catch_unwind()
            .await;
        let elapsed_ms = started.elapsed().as_millis() as u64;

        match outcome {
            Ok(Ok(items)) => {
                info!(
                    check = check.id(),
                    findings = items.len(),
                    elapsed_ms,
                    "Check complete"
                );
                AuditResult::found(check.name(), items)
            }
            Ok(Err(e)) => {
                warn!(check = check.id(), error = %e, elapsed_ms, "Check failed");
                AuditResult::failed(check.name(), e.to_string())
            }
            Err(payload) => {
                let message = panic_message(payload.as_ref());
                error!(check = check.id(), panic = %message, "Check panicked");
                AuditResult::failed(check.name(), format!("check panicked: {}", message))
            }
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checks;
    use crate::error::GatewayError;
    use crate::gateway::testing::ScriptedGateway;
    use crate::result::ExitStatus;
    use async_trait::async_trait;
    use serde_json::json;
    use std::time::Duration;

    enum Outcome {
        Items(Vec<&'static str>),
        Fail(&'static str),
        Panic,
    }

    struct StubCheck {
        name: &'static str,
        outcome: Outcome,
        delay_ms: u64,
    }

    impl StubCheck {
        fn new(name: &'static str, outcome: Outcome) -> Arc<dyn Check> {
            Arc::new(Self {
                name,
                outcome,
                delay_ms: 0,
            })
        }

        fn slow(name: &'static str, items: Vec<&'static str>, delay_ms: u64) -> Arc<dyn Check> {
            Arc::new(Self {
                name,
                outcome: Outcome::Items(items),
                delay_ms,
            })
        }
    }

    #[async_trait]
    impl Check for StubCheck {
        fn id(&self) -> &'static str {
            self.name
        }

        fn name(&self) -> &'static str {
            self.name
        }

        async fn run(&self, _gateway: &dyn ProviderGateway) -> Result<Vec<String>, GatewayError> {
            tokio::time::sleep(Duration::from_millis(self.delay_ms)).await;
            match &self.outcome {
                Outcome::Items(items) => Ok(items.iter().map(|s| s.to_string()).collect()),
                Outcome::Fail(message) => Err(GatewayError::Transport {
                    status: "exit status: 254".to_string(),
                    output: message.to_string(),
                }),
                Outcome::Panic => panic!("decoder invariant broken"),
            }
        }
    }

    fn gateway() -> Arc<dyn ProviderGateway> {
        Arc::new(ScriptedGateway::new())
    }

    #[tokio::test]
    async fn test_end_to_end_ordering_and_isolation() {
        let registry = vec![
            StubCheck::new("A", Outcome::Fail("permission denied")),
            StubCheck::new("B", Outcome::Items(vec![])),
            StubCheck::new("C", Outcome::Items(vec!["item1", "item2"])),
        ];

        let results = Auditor::new(gateway(), registry).audit().await;

        assert_eq!(results.len(), 3);
        assert_eq!(results[0].service, "A");
        assert!(results[0].error.as_deref().unwrap().contains("permission denied"));
        assert!(results[0].items.is_empty());
        assert_eq!(results[1], AuditResult::found("B", vec![]));
        assert_eq!(
            results[2],
            AuditResult::found("C", vec!["item1".to_string(), "item2".to_string()])
        );
        assert_eq!(ExitStatus::from_results(&results), ExitStatus::FindingsPresent);
    }

    #[tokio::test]
    async fn test_every_registry_size_yields_one_result_per_check() {
        for n in 0..6 {
            let registry: Vec<Arc<dyn Check>> = (0..n)
                .map(|i| {
                    if i % 2 == 0 {
                        StubCheck::new("even", Outcome::Fail("denied"))
                    } else {
                        StubCheck::new("odd", Outcome::Items(vec!["x"]))
                    }
                })
                .collect();

            let results = Auditor::new(gateway(), registry).audit().await;
            assert_eq!(results.len(), n);
            for (i, result) in results.iter().enumerate() {
                assert_eq!(result.is_error(), i % 2 == 0);
            }
        }
    }

    #[tokio::test]
    async fn test_concurrent_run_keeps_registry_order() {
        let registry = vec![
            StubCheck::slow("slowest", vec!["a"], 60),
            StubCheck::slow("slow", vec!["b"], 30),
            StubCheck::slow("fast", vec!["c"], 0),
        ];

        let results = Auditor::new(gateway(), registry)
            .with_concurrency(3)
            .audit()
            .await;

        let names: Vec<&str> = results.iter().map(|r| r.service.as_str()).collect();
        assert_eq!(names, vec!["slowest", "slow", "fast"]);
    }

    #[tokio::test]
    async fn test_panicking_check_is_isolated() {
        let registry = vec![
            StubCheck::new("boom", Outcome::Panic),
            StubCheck::new("fine", Outcome::Items(vec!["ok"])),
        ];

        let results = Auditor::new(gateway(), registry).audit().await;

        assert_eq!(
            results[0].error.as_deref(),
            Some("check panicked: decoder invariant broken")
        );
        assert_eq!(results[1].items, vec!["ok".to_string()]);
    }

    #[tokio::test]
    async fn test_full_registry_against_sparse_account() {
        let scripted = ScriptedGateway::new()
            .respond(
                "ec2 describe-volumes --filters Name=status,Values=in-use,available",
                json!({"Volumes": [{
                    "VolumeId": "vol-1",
                    "State": "available",
                    "Size": 20,
                    "VolumeType": "gp3",
                    "AvailabilityZone": "us-east-2a",
                    "Attachments": []
                }]}),
            )
            .respond("ec2 describe-addresses", json!({"Addresses": []}))
            .respond("lambda list-functions", json!({"Functions": []}));

        let results = Auditor::new(Arc::new(scripted), checks::registry())
            .with_concurrency(4)
            .audit()
            .await;

        let names: Vec<&str> = results.iter().map(|r| r.service.as_str()).collect();
        let expected: Vec<&str> = checks::registry().iter().map(|c| c.name()).collect();
        assert_eq!(names, expected);

        // Unscripted calls fail like access-denied; EKS swallows its list failure
        assert!(results[0].is_error());
        assert_eq!(results[1].items, vec!["vol-1 [available/unattached] 20GiB gp3 us-east-2a"]);
        assert_eq!(results[2], AuditResult::found("Elastic IPs", vec![]));
        assert_eq!(results[6], AuditResult::found("EKS Clusters", vec![]));
        assert!(results[7].is_error());
        assert_eq!(results[8], AuditResult::found("Lambda Functions (presence)", vec![]));
        assert_eq!(ExitStatus::from_results(&results), ExitStatus::FindingsPresent);
    }

    #[tokio::test]
    async fn test_identity_failure_is_startup_error() {
        let scripted = ScriptedGateway::new().fail("sts get-caller-identity", "ExpiredToken");
        let auditor = Auditor::new(Arc::new(scripted), checks::registry());

        let err = auditor.verify_identity().await.unwrap_err();
        assert!(matches!(err, StartupError::Credentials(_)));
        assert!(err.to_string().contains("ExpiredToken"));
    }

    #[tokio::test]
    async fn test_identity_success() {
        let scripted = ScriptedGateway::new().respond(
            "sts get-caller-identity",
            json!({"Account": "123456789012", "Arn": "arn:aws:iam::123456789012:root"}),
        );
        let auditor = Auditor::new(Arc::new(scripted), vec![]);

        let identity = tokio_test::assert_ok!(auditor.verify_identity().await);
        assert_eq!(identity.account, "123456789012");
        assert_eq!(auditor.region(), "us-test-1");
    }
}
