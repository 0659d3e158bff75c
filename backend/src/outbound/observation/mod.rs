//! Instrumentation hook around plan collection calls.
//!
//! Every executor call made by [`PlanStorage`](crate::outbound::persistence::PlanStorage)
//! is bracketed by one [`Observation`]: begun with the operation kind and
//! collection name, optionally annotated with the query predicate or the
//! target key, given the final error when the call fails, and finished
//! exactly once. Observers see the call; they never influence its outcome.
//!
//! The [`ObservedCall`] guard owns the observation so that it is finished on
//! every exit path, including when the caller drops the future mid-flight.

mod tracing_observer;

#[cfg(any(test, feature = "test-support"))]
mod recording;

use std::fmt;

use crate::domain::ports::PlanRepositoryError;

pub use tracing_observer::TracingObservations;

#[cfg(any(test, feature = "test-support"))]
pub use recording::{RecordedObservation, RecordingObservations};

/// Kind of collection operation being observed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperationKind {
    /// Plain insert of a non-default plan.
    Insert,
    /// Clear existing defaults, then insert the new default.
    ReplaceDefault,
    /// Predicate query returning many documents.
    Find,
    /// Point lookup by key.
    FindOne,
    /// Removal by key.
    Delete,
}

impl OperationKind {
    /// Stable label used in span fields and logs.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Insert => "insert",
            Self::ReplaceDefault => "replace_default",
            Self::Find => "find",
            Self::FindOne => "find_one",
            Self::Delete => "delete",
        }
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One in-flight observation.
pub trait Observation: Send {
    /// Attach the predicate the operation filters by.
    fn annotate_query(&mut self, predicate: &str);

    /// Attach the document key the operation targets.
    fn annotate_key(&mut self, key: &str);

    /// Record the error the operation finished with.
    fn record_error(&mut self, error: &PlanRepositoryError);

    /// Close the observation.
    fn finish(self: Box<Self>);
}

/// Source of observations, supplied to the adapter at construction.
pub trait ObservationProvider: Send + Sync {
    /// Begin observing `kind` against `collection`.
    fn begin(&self, kind: OperationKind, collection: &'static str) -> Box<dyn Observation>;
}

/// Provider whose observations discard everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopObservations;

struct NoopObservation;

impl Observation for NoopObservation {
    fn annotate_query(&mut self, _predicate: &str) {}

    fn annotate_key(&mut self, _key: &str) {}

    fn record_error(&mut self, _error: &PlanRepositoryError) {}

    fn finish(self: Box<Self>) {}
}

impl ObservationProvider for NoopObservations {
    fn begin(&self, _kind: OperationKind, _collection: &'static str) -> Box<dyn Observation> {
        Box::new(NoopObservation)
    }
}

/// Scoped observation that is always finished.
///
/// [`ObservedCall::complete`] records the error, if any, and finishes the
/// observation. A guard dropped without completing (the caller abandoned the
/// future) records a cancellation before finishing.
pub struct ObservedCall {
    observation: Option<Box<dyn Observation>>,
}

impl ObservedCall {
    /// Begin an observation through `provider`.
    pub fn begin(
        provider: &dyn ObservationProvider,
        kind: OperationKind,
        collection: &'static str,
    ) -> Self {
        Self {
            observation: Some(provider.begin(kind, collection)),
        }
    }

    /// Attach the query predicate.
    #[must_use]
    pub fn with_query(mut self, predicate: impl fmt::Display) -> Self {
        if let Some(observation) = self.observation.as_mut() {
            observation.annotate_query(&predicate.to_string());
        }
        self
    }

    /// Attach the target key.
    #[must_use]
    pub fn with_key(mut self, key: &str) -> Self {
        if let Some(observation) = self.observation.as_mut() {
            observation.annotate_key(key);
        }
        self
    }

    /// Record the outcome of the call and finish the observation.
    pub fn complete<T>(
        mut self,
        result: Result<T, PlanRepositoryError>,
    ) -> Result<T, PlanRepositoryError> {
        if let Some(mut observation) = self.observation.take() {
            if let Err(error) = &result {
                observation.record_error(error);
            }
            observation.finish();
        }
        result
    }
}

impl Drop for ObservedCall {
    fn drop(&mut self) {
        if let Some(mut observation) = self.observation.take() {
            observation.record_error(&PlanRepositoryError::cancelled(
                "caller dropped the operation before it completed",
            ));
            observation.finish();
        }
    }
}
