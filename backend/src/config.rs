//! Plan store configuration loaded via OrthoConfig.

use std::env;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use ortho_config::OrthoConfig;
use serde::Deserialize;

const DEFAULT_POOL_MAX_SIZE: u32 = 10;

/// Client generation serving a direction of traffic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BackendGeneration {
    /// Diesel over a bb8 pool.
    Legacy,
    /// sqlx over its own pool.
    Current,
    /// Process-local collection with no database.
    Memory,
}

impl BackendGeneration {
    /// Whether the generation needs a database connection.
    pub fn needs_database(self) -> bool {
        !matches!(self, Self::Memory)
    }

    /// Configuration spelling of the generation.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Legacy => "legacy",
            Self::Current => "current",
            Self::Memory => "memory",
        }
    }
}

impl fmt::Display for BackendGeneration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Raised when a backend name is not one of `legacy`, `current` or `memory`.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown plan store backend `{value}` (expected legacy, current or memory)")]
pub struct BackendGenerationParseError {
    pub value: String,
}

impl FromStr for BackendGeneration {
    type Err = BackendGenerationParseError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "legacy" | "diesel" => Ok(Self::Legacy),
            "current" | "sqlx" => Ok(Self::Current),
            "memory" => Ok(Self::Memory),
            _ => Err(BackendGenerationParseError {
                value: value.to_owned(),
            }),
        }
    }
}

/// Settings for building a [`PlanStorage`](crate::outbound::persistence::PlanStorage).
#[derive(Debug, Clone, Deserialize, OrthoConfig)]
#[ortho_config(prefix = "PLAN_STORE")]
pub struct PlanStoreSettings {
    /// PostgreSQL URL. Falls back to `DATABASE_URL` when unset.
    pub database_url: Option<String>,
    /// Generation serving reads.
    pub read_backend: Option<String>,
    /// Generation serving writes.
    pub write_backend: Option<String>,
    /// Maximum connections per pool.
    pub pool_max_size: Option<u32>,
    /// Per-operation deadline in milliseconds.
    pub operation_timeout_ms: Option<u64>,
    /// Emit logs as JSON lines.
    #[ortho_config(default = false)]
    pub log_json: bool,
}

impl PlanStoreSettings {
    /// Configured database URL, or `DATABASE_URL` from the environment.
    pub fn database_url(&self) -> Option<String> {
        self.database_url
            .clone()
            .or_else(|| env::var("DATABASE_URL").ok())
            .filter(|url| !url.trim().is_empty())
    }

    /// Generation serving reads; `current` unless configured.
    ///
    /// # Errors
    ///
    /// Returns [`BackendGenerationParseError`] for an unknown name.
    pub fn read_backend(&self) -> Result<BackendGeneration, BackendGenerationParseError> {
        parse_or(self.read_backend.as_deref(), BackendGeneration::Current)
    }

    /// Generation serving writes; `legacy` unless configured.
    ///
    /// # Errors
    ///
    /// Returns [`BackendGenerationParseError`] for an unknown name.
    pub fn write_backend(&self) -> Result<BackendGeneration, BackendGenerationParseError> {
        parse_or(self.write_backend.as_deref(), BackendGeneration::Legacy)
    }

    /// Maximum connections per pool.
    pub fn pool_max_size(&self) -> u32 {
        self.pool_max_size.unwrap_or(DEFAULT_POOL_MAX_SIZE)
    }

    /// Per-operation deadline, if any.
    pub fn operation_timeout(&self) -> Option<Duration> {
        self.operation_timeout_ms.map(Duration::from_millis)
    }
}

fn parse_or(
    value: Option<&str>,
    fallback: BackendGeneration,
) -> Result<BackendGeneration, BackendGenerationParseError> {
    value.map_or(Ok(fallback), str::parse)
}
