//! spend-audit
//!
//! Lists the AWS resources in one region that keep costing money after a
//! project is torn down, and reports per-project spend from Cost Explorer.
//!
//! # Usage
//! ```bash
//! # Audit the default region (us-east-2)
//! spend-audit
//!
//! # Audit a region with a named profile, four checks at a time
//! spend-audit --profile sandbox audit --region eu-west-1 --concurrency 4
//!
//! # Only look at networking leftovers
//! spend-audit audit --only eip,nat,elb --format json
//!
//! # Last 30 days of spend for a project as CSV
//! spend-audit cost --project ghost --days 30 --format csv
//! ```

use anyhow::{Context, Result};
use std::io::Write;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use spend_audit::checks;
use spend_audit::cli::{AuditArgs, AuditFormat, Cli, Commands, CostArgs, CostFormat};
use spend_audit::cost::{query_costs, CostQuery, COST_EXPLORER_REGION};
use spend_audit::render::{self, AuditContext};
use spend_audit::{Auditor, AwsCli, ExitStatus, StartupError};

/// Conventional exit status after SIGINT
const INTERRUPTED: i32 = 130;

// ============================================================
// Main Entry Point
// ============================================================

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse_checked();
    init_logging(cli.verbose, cli.log_json)?;

    let code = match cli.action() {
        Commands::Audit(args) => run_audit(&cli, args).await?,
        Commands::Cost(args) => run_cost(&cli, args).await?,
    };

    std::process::exit(code);
}

fn init_logging(verbose: bool, json: bool) -> Result<()> {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr);

    let installed = if json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };
    installed.map_err(|e| anyhow::anyhow!("failed to initialize logging: {}", e))
}

// ============================================================
// Commands
// ============================================================

async fn run_audit(cli: &Cli, args: AuditArgs) -> Result<i32> {
    let gateway = Arc::new(
        AwsCli::new(&args.region, cli.profile.clone()).with_binary(&cli.aws_bin),
    );
    let selected = checks::select(checks::registry(), &args.only, &args.skip)?;
    let auditor = Auditor::new(gateway.clone(), selected).with_concurrency(args.concurrency);

    let identity = match auditor.verify_identity().await {
        Ok(identity) => identity,
        Err(e) => {
            eprintln!("[ERROR] {}", e);
            return Ok(ExitStatus::StartupFailed.code());
        }
    };

    let results = tokio::select! {
        results = auditor.audit() => results,
        _ = tokio::signal::ctrl_c() => {
            warn!("Interrupted; stopping in-flight AWS CLI calls");
            return Ok(INTERRUPTED);
        }
    };

    let context = AuditContext::new(&identity, auditor.region(), gateway.profile());
    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    let written = match args.format {
        AuditFormat::Text => render::write_audit_text(&mut out, &context, &results),
        AuditFormat::Json => render::write_audit_json(&mut out, &context, &results),
    };
    written.context("failed to write audit report")?;
    out.flush()?;

    let status = ExitStatus::from_results(&results);
    info!(exit_code = status.code(), "Audit finished");
    Ok(status.code())
}

async fn run_cost(cli: &Cli, args: CostArgs) -> Result<i32> {
    let gateway = AwsCli::new(COST_EXPLORER_REGION, cli.profile.clone()).with_binary(&cli.aws_bin);
    gateway
        .ensure_installed()
        .await
        .map_err(StartupError::CliMissing)?;

    let query = CostQuery::new(&args.project, args.days)
        .environment(&args.environment)
        .tag_key(&args.tag_key);

    let report = query_costs(&gateway, &query)
        .await
        .context("failed to get costs")?;

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    let written = match args.format {
        CostFormat::Table => render::write_cost_table(&mut out, &report),
        CostFormat::Json => render::write_cost_json(&mut out, &report),
        CostFormat::Csv => render::write_cost_csv(&mut out, &report),
    };
    written.context("failed to format output")?;
    out.flush()?;

    Ok(0)
}
