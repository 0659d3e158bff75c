//! Service plan data model.
//!
//! A plan is a named resource-allocation profile applied to applications:
//! memory, CPU share, optional burst behaviour, and a flag marking the
//! system-wide default. Plans are handed to persistence already validated;
//! nothing in this module enforces business rules beyond the shape.

use serde::{Deserialize, Serialize};

/// CPU burst allowance attached to a plan.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CpuBurst {
    /// Burst factor applied when the application does not choose one.
    pub default: f64,
    /// Largest burst factor an application may request.
    pub max_allowed: f64,
}

/// Per-application override of plan values.
///
/// Overrides travel with a [`Plan`] inside the service layer but are never
/// persisted; a plan read back from storage always has `overrides: None`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanOverride {
    pub memory: Option<i64>,
    pub cpu_milli: Option<i32>,
    pub cpu_burst: Option<f64>,
}

/// Named resource-allocation profile.
///
/// ## Invariants
/// - `name` is the unique, immutable key.
/// - At most one stored plan has `default == true`; the persistence adapter
///   maintains this when inserting a default plan.
///
/// # Examples
/// ```
/// use plan_storage::domain::{CpuBurst, Plan};
///
/// let plan = Plan::new("small", 512 * 1024 * 1024, 250)
///     .with_cpu_burst(CpuBurst { default: 1.0, max_allowed: 2.0 })
///     .as_default();
/// assert!(plan.default);
/// assert_eq!(plan.name, "small");
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Plan {
    pub name: String,
    /// Memory in bytes.
    pub memory: i64,
    /// CPU share in milli-units.
    pub cpu_milli: i32,
    pub cpu_burst: Option<CpuBurst>,
    pub default: bool,
    #[serde(rename = "override", skip_serializing_if = "Option::is_none")]
    pub overrides: Option<PlanOverride>,
}

impl Plan {
    /// Create a non-default plan without burst or overrides.
    pub fn new(name: impl Into<String>, memory: i64, cpu_milli: i32) -> Self {
        Self {
            name: name.into(),
            memory,
            cpu_milli,
            cpu_burst: None,
            default: false,
            overrides: None,
        }
    }

    /// Attach a CPU burst allowance.
    #[must_use]
    pub fn with_cpu_burst(mut self, cpu_burst: CpuBurst) -> Self {
        self.cpu_burst = Some(cpu_burst);
        self
    }

    /// Attach a per-application override.
    #[must_use]
    pub fn with_override(mut self, overrides: PlanOverride) -> Self {
        self.overrides = Some(overrides);
        self
    }

    /// Mark the plan as the system-wide default.
    #[must_use]
    pub fn as_default(mut self) -> Self {
        self.default = true;
        self
    }
}
