//! Manage service plans from the command line.
#![cfg_attr(not(any(test, doctest)), deny(clippy::unwrap_used))]
#![cfg_attr(not(any(test, doctest)), deny(clippy::expect_used))]

use std::ffi::OsString;
use std::io;

use clap::{Parser, Subcommand};
use ortho_config::OrthoConfig;
use plan_storage::admin::{PlanCommand, execute};
use plan_storage::domain::CorrelationId;
use plan_storage::outbound::persistence::{connect_plan_storage, run_migrations};
use plan_storage::telemetry::init_tracing;
use plan_storage::PlanStoreSettings;
use tokio::runtime::Builder;
use tracing::info;

/// `plan-admin` command arguments.
///
/// Storage settings come from `PLAN_STORE_*` environment variables; the
/// flags here only pick the command.
#[derive(Debug, Parser)]
#[command(
    name = "plan-admin",
    about = "Inspect and manage service plans in the plan store",
    version
)]
struct CliArgs {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Create the `plans` table and apply pending migrations.
    Migrate,
    #[command(flatten)]
    Plans(PlanCommand),
}

fn main() -> io::Result<()> {
    let runtime = Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|error| io::Error::other(format!("create Tokio runtime: {error}")))?;
    runtime.block_on(async_main())
}

async fn async_main() -> io::Result<()> {
    let args = CliArgs::try_parse().map_err(io::Error::other)?;
    let settings = PlanStoreSettings::load_from_iter([OsString::from("plan-admin")])
        .map_err(|error| io::Error::other(format!("load settings: {error}")))?;
    init_tracing(settings.log_json);

    CorrelationId::scope(CorrelationId::generate(), run(args.command, settings)).await
}

async fn run(command: Command, settings: PlanStoreSettings) -> io::Result<()> {
    match command {
        Command::Migrate => {
            let database_url = settings.database_url().ok_or_else(|| {
                io::Error::other(
                    "database URL must be provided via PLAN_STORE_DATABASE_URL or DATABASE_URL",
                )
            })?;
            let applied = run_migrations(&database_url)
                .await
                .map_err(io::Error::other)?;
            info!(applied, "migrations complete");
            println!("applied {applied} migration(s)");
            Ok(())
        }
        Command::Plans(command) => {
            let storage = connect_plan_storage(&settings)
                .await
                .map_err(io::Error::other)?;
            let mut stdout = io::stdout().lock();
            execute(&storage, command, &mut stdout)
                .await
                .map_err(io::Error::other)
        }
    }
}
