//! CLI Definition
//!
//! Flags fall back to environment variables, then to defaults. Running
//! with no subcommand is the same as `audit`.

use clap::error::ErrorKind;
use clap::parser::ValueSource;
use clap::{Args, CommandFactory, FromArgMatches, Parser, Subcommand, ValueEnum};
use std::ffi::OsString;

/// Audit flags accepted before any subcommand
const ROOT_AUDIT_ARGS: [&str; 5] = ["region", "concurrency", "only", "skip", "format"];

#[derive(Parser, Debug)]
#[command(name = "spend-audit")]
#[command(about = "Find billable AWS resources and query project spend", long_about = None)]
#[command(version)]
pub struct Cli {
    /// AWS CLI profile name to use
    #[arg(long, global = true, env = "AWS_PROFILE")]
    pub profile: Option<String>,

    /// AWS CLI binary (name on PATH or full path)
    #[arg(long, global = true, env = "SPEND_AUDIT_AWS_BIN", default_value = "aws")]
    pub aws_bin: String,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    pub log_json: bool,

    #[command(flatten)]
    pub audit: AuditArgs,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

impl Cli {
    /// Parse the process arguments, exiting with usage on error
    pub fn parse_checked() -> Self {
        Self::try_parse_checked(std::env::args_os()).unwrap_or_else(|e| e.exit())
    }

    /// Parse `args`, rejecting top-level audit flags combined with a
    /// subcommand (they would otherwise be ignored)
    pub fn try_parse_checked<I, T>(args: I) -> Result<Self, clap::Error>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
    {
        let mut cmd = Self::command();
        let matches = cmd.try_get_matches_from_mut(args)?;

        if let Some(subcommand) = matches.subcommand_name() {
            let misplaced = ROOT_AUDIT_ARGS
                .iter()
                .find(|id| matches.value_source(id) == Some(ValueSource::CommandLine));
            if let Some(id) = misplaced {
                return Err(cmd.error(
                    ErrorKind::ArgumentConflict,
                    format!(
                        "--{} must come after the `{}` subcommand, or drop the subcommand",
                        id, subcommand
                    ),
                ));
            }
        }

        Self::from_arg_matches(&matches).map_err(|e| e.format(&mut cmd))
    }

    /// The subcommand to run, defaulting to `audit` with top-level flags
    pub fn action(&self) -> Commands {
        self.command
            .clone()
            .unwrap_or_else(|| Commands::Audit(self.audit.clone()))
    }
}

#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Audit one region for billable resources
    Audit(AuditArgs),

    /// Get AWS spending for a project from Cost Explorer
    Cost(CostArgs),
}

#[derive(Args, Debug, Clone)]
pub struct AuditArgs {
    /// AWS region to scan
    #[arg(long, env = "AWS_REGION", default_value = "us-east-2")]
    pub region: String,

    /// Checks to run at once
    #[arg(long, default_value_t = 1)]
    pub concurrency: usize,

    /// Run only these checks (ec2, ebs, eip, nat, elb, rds, eks, ecs, lambda)
    #[arg(long, value_delimiter = ',')]
    pub only: Vec<String>,

    /// Skip these checks
    #[arg(long, value_delimiter = ',')]
    pub skip: Vec<String>,

    /// Output format
    #[arg(long, value_enum, default_value_t = AuditFormat::Text)]
    pub format: AuditFormat,
}

#[derive(Args, Debug, Clone)]
pub struct CostArgs {
    /// Project name (tag filter)
    #[arg(long, default_value = "ghost")]
    pub project: String,

    /// Environment (tag filter); empty to disable
    #[arg(long = "env", default_value = "free-tier")]
    pub environment: String,

    /// Tag key holding the project name
    #[arg(long, default_value = "project")]
    pub tag_key: String,

    /// Number of days back to query (7, 30, 90)
    #[arg(long, default_value_t = 7)]
    pub days: u32,

    /// Output format
    #[arg(long, value_enum, default_value_t = CostFormat::Table)]
    pub format: CostFormat,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuditFormat {
    Text,
    Json,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum CostFormat {
    Table,
    Json,
    Csv,
}
