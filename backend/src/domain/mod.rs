//! Domain types and ports.
//!
//! Purpose: define the plan entity and the repository port the service layer
//! depends on. Nothing here knows about Diesel, sqlx, or any other store.
//!
//! Public surface:
//! - Plan, CpuBurst, PlanOverride: the persisted entity and its parts.
//! - CorrelationId: task-scoped identifier attached to storage observations.
//! - ports::PlanRepository: persistence port with typed errors.

pub mod correlation;
pub mod plan;
pub mod ports;

pub use self::correlation::CorrelationId;
pub use self::plan::{CpuBurst, Plan, PlanOverride};
