//! Outbound adapters implementing domain ports for external infrastructure.
//!
//! - **persistence**: the plan collection backends (Diesel, sqlx, in-memory)
//!   and the `PlanStorage` adapter that implements `PlanRepository` over them
//! - **observation**: the instrumentation hook wrapped around every
//!   collection call
//!
//! Adapters are thin translators that convert between domain types and
//! infrastructure-specific representations. They contain no business logic.

pub mod observation;
pub mod persistence;
