//! Result model handed to rendering

use serde::Serialize;

/// Per-check output envelope: findings, or the error that stopped the check
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuditResult {
    pub service: String,
    pub items: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl AuditResult {
    /// Successful check; an empty `items` means "none found"
    pub fn found(service: impl Into<String>, items: Vec<String>) -> Self {
        Self {
            service: service.into(),
            items,
            error: None,
        }
    }

    /// Failed check; items are always empty
    pub fn failed(service: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            service: service.into(),
            items: Vec::new(),
            error: Some(error.into()),
        }
    }

    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }

    pub fn has_findings(&self) -> bool {
        self.error.is_none() && !self.items.is_empty()
    }
}

/// Process exit contract for scripted use
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitStatus {
    /// No check reported a finding
    Clean = 0,
    /// At least one check reported a finding
    FindingsPresent = 1,
    /// Credentials could not be verified; no check ran
    StartupFailed = 2,
}

impl ExitStatus {
    /// Check errors alone do not raise the status; only findings do
    pub fn from_results(results: &[AuditResult]) -> Self {
        if results.iter().any(AuditResult::has_findings) {
            ExitStatus::FindingsPresent
        } else {
            ExitStatus::Clean
        }
    }

    pub fn code(self) -> i32 {
        self as i32
    }
}
