//! Output rendering
//!
//! Audit results as sectioned text or JSON; cost reports as a table,
//! JSON or CSV. Everything writes to a caller-supplied writer.

use serde::Serialize;
use std::io::{self, Write};

use crate::cost::CostReport;
use crate::gateway::CallerIdentity;
use crate::result::AuditResult;

// ============================================================
// Audit
// ============================================================

/// Where and as whom an audit ran
#[derive(Debug, Clone, Serialize)]
pub struct AuditContext<'a> {
    pub account: &'a str,
    pub arn: &'a str,
    pub region: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub profile: Option<&'a str>,
}

impl<'a> AuditContext<'a> {
    pub fn new(identity: &'a CallerIdentity, region: &'a str, profile: Option<&'a str>) -> Self {
        Self {
            account: &identity.account,
            arn: &identity.arn,
            region,
            profile,
        }
    }
}

pub fn write_audit_text<W: Write>(
    out: &mut W,
    context: &AuditContext<'_>,
    results: &[AuditResult],
) -> io::Result<()> {
    writeln!(
        out,
        "Using account={} arn={} region={} profile={}",
        context.account,
        context.arn,
        context.region,
        context.profile.unwrap_or("")
    )?;
    writeln!(out)?;

    let mut any_findings = false;
    for result in results {
        write_section(out, &result.service)?;

        if let Some(error) = &result.error {
            writeln!(out, " - ERROR: {}", error)?;
            continue;
        }

        if result.items.is_empty() {
            writeln!(out, " - None found.")?;
            continue;
        }

        any_findings = true;
        for item in &result.items {
            writeln!(out, " - FOUND: {}", item)?;
        }
    }

    write_section(out, "Summary")?;
    if any_findings {
        writeln!(
            out,
            "Potentially billable resources were found in this region. Review the sections above."
        )
    } else {
        writeln!(
            out,
            "No resources found by these checks (or you lack permissions for some services)."
        )
    }
}

fn write_section<W: Write>(out: &mut W, title: &str) -> io::Result<()> {
    let rule = "=".repeat(title.chars().count().max(1));
    writeln!(out)?;
    writeln!(out, "{}", rule)?;
    writeln!(out, "{}", title)?;
    writeln!(out, "{}", rule)
}

pub fn write_audit_json<W: Write>(
    out: &mut W,
    context: &AuditContext<'_>,
    results: &[AuditResult],
) -> io::Result<()> {
    #[derive(Serialize)]
    struct Document<'a> {
        #[serde(flatten)]
        context: &'a AuditContext<'a>,
        results: &'a [AuditResult],
    }

    serde_json::to_writer_pretty(&mut *out, &Document { context, results })?;
    writeln!(out)
}

// ============================================================
// Cost
// ============================================================

pub fn write_cost_table<W: Write>(out: &mut W, report: &CostReport) -> io::Result<()> {
    let width = report
        .costs
        .iter()
        .map(|c| c.service.len())
        .max()
        .unwrap_or(0)
        .max("SERVICE".len());

    writeln!(out, "{:<10}  {:<width$}  {:>10}  {}", "DATE", "SERVICE", "COST", "UNIT")?;
    writeln!(out, "{}", "-".repeat(width + 30))?;
    for cost in &report.costs {
        writeln!(
            out,
            "{:<10}  {:<width$}  {:>10}  {}",
            cost.date,
            cost.service,
            format!("${:.2}", cost.amount),
            cost.unit
        )?;
    }
    writeln!(out, "{}", "-".repeat(width + 30))?;
    writeln!(
        out,
        "{:<10}  {:<width$}  {:>10}  {}",
        "",
        "TOTAL",
        format!("${:.2}", report.total),
        "USD"
    )
}

pub fn write_cost_json<W: Write>(out: &mut W, report: &CostReport) -> io::Result<()> {
    #[derive(Serialize)]
    struct Document<'a> {
        #[serde(flatten)]
        report: &'a CostReport,
        unit: &'static str,
    }

    serde_json::to_writer_pretty(&mut *out, &Document { report, unit: "USD" })?;
    writeln!(out)
}

pub fn write_cost_csv<W: Write>(out: &mut W, report: &CostReport) -> io::Result<()> {
    writeln!(out, "Date,Service,Cost,Unit")?;
    for cost in &report.costs {
        writeln!(
            out,
            "{},{},{:.2},{}",
            csv_field(&cost.date),
            csv_field(&cost.service),
            cost.amount,
            csv_field(&cost.unit)
        )?;
    }
    writeln!(out, ",TOTAL,{:.2},USD", report.total)
}

fn csv_field(value: &str) -> String {
    if value.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}
