//! Operator commands over a [`PlanRepository`].
//!
//! The `plan-admin` binary parses these with clap and hands them to
//! [`execute`], which writes a plain-text report to the given sink.

use std::io::{self, Write};

use clap::{Args, Subcommand};

use crate::domain::ports::{PlanRepository, PlanRepositoryError};
use crate::domain::{CpuBurst, Plan};

/// Plan management subcommands.
#[derive(Debug, Clone, PartialEq, Subcommand)]
pub enum PlanCommand {
    /// List every plan, ordered by name.
    List,
    /// Show one plan.
    Show {
        /// Plan name.
        name: String,
    },
    /// Show the default plan.
    Default,
    /// Create a plan.
    Create(CreatePlanArgs),
    /// Delete a plan.
    Delete {
        /// Plan name.
        name: String,
    },
}

/// Arguments for `create`.
#[derive(Debug, Clone, PartialEq, Args)]
pub struct CreatePlanArgs {
    /// Unique plan name.
    #[arg(long)]
    pub name: String,
    /// Memory in bytes.
    #[arg(long)]
    pub memory: i64,
    /// CPU share in milli-units.
    #[arg(long = "cpu-milli")]
    pub cpu_milli: i32,
    /// Make this the default plan, clearing any previous default.
    #[arg(long)]
    pub default: bool,
    /// Burst factor applied when an application chooses none.
    #[arg(long = "burst-default", requires = "burst_max")]
    pub burst_default: Option<f64>,
    /// Largest burst factor an application may request.
    #[arg(long = "burst-max", requires = "burst_default")]
    pub burst_max: Option<f64>,
}

impl From<CreatePlanArgs> for Plan {
    fn from(args: CreatePlanArgs) -> Self {
        let mut plan = Plan::new(args.name, args.memory, args.cpu_milli);
        if let (Some(default), Some(max_allowed)) = (args.burst_default, args.burst_max) {
            plan = plan.with_cpu_burst(CpuBurst {
                default,
                max_allowed,
            });
        }
        if args.default {
            plan = plan.as_default();
        }
        plan
    }
}

/// Failures surfaced by [`execute`].
#[derive(Debug, thiserror::Error)]
pub enum AdminError {
    #[error(transparent)]
    Repository(#[from] PlanRepositoryError),
    #[error("failed to write output: {0}")]
    Output(#[from] io::Error),
}

/// Run `command` against `repository`, reporting to `out`.
///
/// # Errors
///
/// Returns [`AdminError::Repository`] with the repository's error unchanged,
/// or [`AdminError::Output`] when writing the report fails.
pub async fn execute<W: Write>(
    repository: &dyn PlanRepository,
    command: PlanCommand,
    out: &mut W,
) -> Result<(), AdminError> {
    match command {
        PlanCommand::List => {
            let plans = repository.find_all().await?;
            if plans.is_empty() {
                writeln!(out, "no plans")?;
            }
            for plan in &plans {
                write_plan(out, plan)?;
            }
        }
        PlanCommand::Show { name } => write_plan(out, &repository.find_by_name(&name).await?)?,
        PlanCommand::Default => write_plan(out, &repository.find_default().await?)?,
        PlanCommand::Create(args) => {
            let plan = Plan::from(args);
            repository.insert(&plan).await?;
            writeln!(out, "created plan {}", plan.name)?;
        }
        PlanCommand::Delete { name } => {
            // Deletion is keyed by name alone.
            repository.delete(&Plan::new(name.as_str(), 0, 0)).await?;
            writeln!(out, "deleted plan {name}")?;
        }
    }
    Ok(())
}

fn write_plan<W: Write>(out: &mut W, plan: &Plan) -> io::Result<()> {
    write!(
        out,
        "{}\tmemory={}\tcpu_milli={}",
        plan.name, plan.memory, plan.cpu_milli
    )?;
    if let Some(burst) = plan.cpu_burst {
        write!(out, "\tburst={}/{}", burst.default, burst.max_allowed)?;
    }
    if plan.default {
        write!(out, "\t(default)")?;
    }
    writeln!(out)
}
