//! Builds a [`PlanStorage`] from [`PlanStoreSettings`].
//!
//! Each configured generation gets its own pool; when reads and writes use
//! the same generation they share one collection.

use std::sync::Arc;

use tracing::info;

use crate::config::{BackendGeneration, BackendGenerationParseError, PlanStoreSettings};

use super::collection::PlanCollection;
use super::diesel_plan_collection::DieselPlanCollection;
use super::memory_plan_collection::InMemoryPlanCollection;
use super::plan_storage::PlanStorage;
use super::pool::{DbPool, PoolConfig, PoolError};
use super::sqlx_plan_collection::SqlxPlanCollection;

/// Failures while wiring plan storage at startup.
#[derive(Debug, thiserror::Error)]
pub enum StorageSetupError {
    /// A database-backed generation was selected without a URL.
    #[error(
        "the {generation} backend needs a database URL (set PLAN_STORE_DATABASE_URL or DATABASE_URL)"
    )]
    MissingDatabaseUrl { generation: BackendGeneration },

    /// A backend name in the settings is not recognised.
    #[error(transparent)]
    InvalidBackend(#[from] BackendGenerationParseError),

    /// A connection pool could not be built.
    #[error(transparent)]
    Pool(#[from] PoolError),

    /// A direct database connection failed.
    #[error("database connection failed: {message}")]
    Connection { message: String },

    /// Applying migrations failed.
    #[error("migration failed: {message}")]
    Migration { message: String },
}

/// Open the collections named by `settings` and wrap them in a [`PlanStorage`].
///
/// # Errors
///
/// Returns [`StorageSetupError`] when a backend name is invalid, a URL is
/// missing, or a pool cannot be built.
pub async fn connect_plan_storage(
    settings: &PlanStoreSettings,
) -> Result<PlanStorage, StorageSetupError> {
    let read = settings.read_backend()?;
    let write = settings.write_backend()?;
    let pool_config = database_pool_config(read, write, settings)?;

    let reader = open_collection(read, pool_config.as_ref()).await?;
    let writer = if write == read {
        Arc::clone(&reader)
    } else {
        open_collection(write, pool_config.as_ref()).await?
    };

    let mut storage = PlanStorage::with_backends(reader, writer);
    if let Some(timeout) = settings.operation_timeout() {
        storage = storage.with_operation_timeout(timeout);
    }

    info!(read = %read, write = %write, "plan storage ready");
    Ok(storage)
}

/// Pool settings shared by every database-backed generation.
///
/// `None` when neither direction touches a database.
fn database_pool_config(
    read: BackendGeneration,
    write: BackendGeneration,
    settings: &PlanStoreSettings,
) -> Result<Option<PoolConfig>, StorageSetupError> {
    let Some(generation) = [read, write]
        .into_iter()
        .find(|generation| generation.needs_database())
    else {
        return Ok(None);
    };
    let url = settings
        .database_url()
        .ok_or(StorageSetupError::MissingDatabaseUrl { generation })?;
    Ok(Some(
        PoolConfig::new(url).with_max_size(settings.pool_max_size()),
    ))
}

async fn open_collection(
    generation: BackendGeneration,
    pool_config: Option<&PoolConfig>,
) -> Result<Arc<dyn PlanCollection>, StorageSetupError> {
    let config = || {
        pool_config
            .cloned()
            .ok_or(StorageSetupError::MissingDatabaseUrl { generation })
    };

    let collection: Arc<dyn PlanCollection> = match generation {
        BackendGeneration::Memory => Arc::new(InMemoryPlanCollection::new()),
        BackendGeneration::Legacy => Arc::new(DieselPlanCollection::new(DbPool::new(config()?).await?)),
        BackendGeneration::Current => {
            Arc::new(SqlxPlanCollection::new(config()?.connect_sqlx().await?))
        }
    };
    Ok(collection)
}
