//! Embedded Diesel migrations for the `plans` table.

use diesel::Connection;
use diesel::pg::PgConnection;
use diesel_migrations::{EmbeddedMigrations, MigrationHarness, embed_migrations};
use tracing::info;

use super::setup::StorageSetupError;

/// Migrations from the crate's `migrations` directory.
pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");

/// Apply every pending migration to `database_url`.
///
/// Runs on a blocking thread with a synchronous connection and returns the
/// number of migrations applied.
///
/// # Errors
///
/// Returns [`StorageSetupError::Connection`] when the database cannot be
/// reached and [`StorageSetupError::Migration`] when a migration fails.
pub async fn run_migrations(database_url: &str) -> Result<usize, StorageSetupError> {
    let url = database_url.to_owned();
    tokio::task::spawn_blocking(move || apply_pending(&url))
        .await
        .map_err(|err| StorageSetupError::Migration {
            message: format!("migration task failed: {err}"),
        })?
}

fn apply_pending(database_url: &str) -> Result<usize, StorageSetupError> {
    let mut conn =
        PgConnection::establish(database_url).map_err(|err| StorageSetupError::Connection {
            message: err.to_string(),
        })?;
    let applied = conn
        .run_pending_migrations(MIGRATIONS)
        .map_err(|err| StorageSetupError::Migration {
            message: err.to_string(),
        })?;

    for version in &applied {
        info!(%version, "applied migration");
    }
    Ok(applied.len())
}
