//! Port for service plan persistence.
//!
//! The [`PlanRepository`] trait is what the service layer consumes. Adapters
//! translate their backend failures into [`PlanRepositoryError`] so callers
//! can tell "plan already exists" apart from "database unreachable" without
//! inspecting driver error values.

use async_trait::async_trait;

use crate::domain::Plan;

use super::define_port_error;

define_port_error! {
    /// Errors raised by plan repository adapters.
    pub enum PlanRepositoryError {
        /// A plan with the same name is already stored.
        AlreadyExists { name: String } => "plan {name} already exists",
        /// No plan is stored under the requested name.
        NotFound { name: String } => "plan {name} not found",
        /// No stored plan is flagged as the default.
        DefaultNotFound => "default plan not found",
        /// More than one stored plan is flagged as the default.
        DefaultAmbiguous { count: usize } =>
            "more than one plan set as default ({count} found)",
        /// Repository connection could not be established.
        Connection { message: String } =>
            "plan repository connection failed: {message}",
        /// Query or mutation failed during execution or decoding.
        Query { message: String } =>
            "plan repository query failed: {message}",
        /// The operation deadline elapsed before the store answered.
        Cancelled { message: String } =>
            "plan repository operation cancelled: {message}",
    }
}

impl PlanRepositoryError {
    /// Whether the error belongs to the opaque infrastructure category rather
    /// than the plan error vocabulary.
    ///
    /// # Examples
    /// ```
    /// use plan_storage::domain::ports::PlanRepositoryError;
    ///
    /// assert!(PlanRepositoryError::connection("refused").is_infrastructure());
    /// assert!(!PlanRepositoryError::not_found("small").is_infrastructure());
    /// ```
    pub fn is_infrastructure(&self) -> bool {
        matches!(
            self,
            Self::Connection { .. } | Self::Query { .. } | Self::Cancelled { .. }
        )
    }
}

/// Port for storing and retrieving service plans.
///
/// # Default plan
///
/// Inserting a plan with `default == true` clears the flag on every stored
/// plan first. The clear and the insert are separate steps unless the
/// adapter's store offers multi-document transactions, so concurrent default
/// inserts can leave two defaults behind; [`PlanRepository::find_default`]
/// reports that as [`PlanRepositoryError::DefaultAmbiguous`] instead of
/// choosing one.
///
/// # Overrides
///
/// [`Plan::overrides`] is never persisted. Plans returned by any read have
/// `overrides: None`.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PlanRepository: Send + Sync {
    /// Store a new plan.
    ///
    /// Fails with [`PlanRepositoryError::AlreadyExists`] when the name is
    /// taken; the stored plan is left untouched.
    async fn insert(&self, plan: &Plan) -> Result<(), PlanRepositoryError>;

    /// Every stored plan, ordered ascending by name.
    async fn find_all(&self) -> Result<Vec<Plan>, PlanRepositoryError>;

    /// The single plan flagged as default.
    async fn find_default(&self) -> Result<Plan, PlanRepositoryError>;

    /// The plan stored under `name`.
    async fn find_by_name(&self, name: &str) -> Result<Plan, PlanRepositoryError>;

    /// Remove the stored plan with the same name as `plan`.
    async fn delete(&self, plan: &Plan) -> Result<(), PlanRepositoryError>;
}
