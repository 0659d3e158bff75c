//! PostgreSQL persistence adapters for service plans.
//!
//! Plans are stored as documents in one `plans` collection, carried by a
//! JSONB column. Two client generations can reach it while a migration is
//! in flight:
//!
//! - **legacy**: [`DieselPlanCollection`], Diesel over a `bb8` pool via
//!   `diesel-async`.
//! - **current**: [`SqlxPlanCollection`], sqlx over its own `PgPool`.
//!
//! [`InMemoryPlanCollection`] honours the same contract without a database.
//! [`PlanStorage`] sits on top of any of them and implements the domain
//! [`PlanRepository`](crate::domain::ports::PlanRepository) port.
//!
//! # Architecture
//!
//! - **Thin executors**: collections only run statements and classify native
//!   failures into [`CollectionError`] signals.
//! - **One translation point**: `error_mapping` turns those signals into
//!   domain errors, so both generations present the same contract.
//! - **Internal models**: the stored document shape, Diesel schema and row
//!   structs never leave this module.
//!
//! # Example
//!
//! ```ignore
//! use plan_storage::outbound::persistence::{DbPool, DieselPlanCollection, PlanStorage, PoolConfig};
//!
//! let pool = DbPool::new(PoolConfig::new("postgres://localhost/plans")).await?;
//! let storage = PlanStorage::new(Arc::new(DieselPlanCollection::new(pool)));
//! ```

mod collection;
mod diesel_plan_collection;
mod document;
mod error_mapping;
mod memory_plan_collection;
mod migrations;
mod models;
mod plan_storage;
mod pool;
mod schema;
mod setup;
mod sqlx_plan_collection;

pub use collection::{CollectionError, PLANS_COLLECTION, PlanCollection, PlanFilter};
pub use diesel_plan_collection::DieselPlanCollection;
pub use document::{CpuBurstDocument, PlanDocument};
pub use memory_plan_collection::InMemoryPlanCollection;
pub use migrations::{MIGRATIONS, run_migrations};
pub use plan_storage::PlanStorage;
pub use pool::{DbPool, PoolConfig, PoolError};
pub use setup::{StorageSetupError, connect_plan_storage};
pub use sqlx_plan_collection::SqlxPlanCollection;
