//! Persistence adapter for service plans.
//!
//! The crate stores named resource-allocation plans in a document collection,
//! keeps at most one of them flagged as the system-wide default, and reports
//! failures in a small domain vocabulary. See [`outbound::persistence`] for
//! the backends and [`domain::ports::PlanRepository`] for the contract.

pub mod admin;
pub mod config;
pub mod domain;
pub mod outbound;
pub mod telemetry;

pub use config::{BackendGeneration, PlanStoreSettings};
pub use outbound::persistence::{PlanStorage, connect_plan_storage};
