//! Stored document shape for plans and its mapping to the domain type.
//!
//! Keys are lower-cased to match documents already present in the `plans`
//! collection. The plan name doubles as the document `_id`. Per-application
//! overrides have no stored counterpart.

use serde::{Deserialize, Serialize};

use crate::domain::{CpuBurst, Plan};

/// Stored burst allowance.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CpuBurstDocument {
    pub default: f64,
    #[serde(rename = "maxallowed")]
    pub max_allowed: f64,
}

/// One plan as stored in the collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanDocument {
    #[serde(rename = "_id")]
    pub name: String,
    pub memory: i64,
    #[serde(rename = "cpumilli")]
    pub cpu_milli: i32,
    #[serde(rename = "cpuburst", default)]
    pub cpu_burst: Option<CpuBurstDocument>,
    /// Absent once a later default insert unset it.
    #[serde(default)]
    pub default: bool,
}

impl From<CpuBurst> for CpuBurstDocument {
    fn from(value: CpuBurst) -> Self {
        Self {
            default: value.default,
            max_allowed: value.max_allowed,
        }
    }
}

impl From<CpuBurstDocument> for CpuBurst {
    fn from(value: CpuBurstDocument) -> Self {
        Self {
            default: value.default,
            max_allowed: value.max_allowed,
        }
    }
}

impl From<&Plan> for PlanDocument {
    fn from(plan: &Plan) -> Self {
        Self {
            name: plan.name.clone(),
            memory: plan.memory,
            cpu_milli: plan.cpu_milli,
            cpu_burst: plan.cpu_burst.map(CpuBurstDocument::from),
            default: plan.default,
        }
    }
}

impl From<PlanDocument> for Plan {
    fn from(document: PlanDocument) -> Self {
        Self {
            name: document.name,
            memory: document.memory,
            cpu_milli: document.cpu_milli,
            cpu_burst: document.cpu_burst.map(CpuBurst::from),
            default: document.default,
            overrides: None,
        }
    }
}
