//! Observation provider backed by `tracing` spans.

use std::time::Instant;

use tracing::{Level, Span, debug, field, info_span, warn};

use crate::domain::CorrelationId;
use crate::domain::ports::PlanRepositoryError;

use super::{Observation, ObservationProvider, OperationKind};

/// Opens one `plan_storage.operation` span per observation.
///
/// Infrastructure failures are logged at `warn` with the error kind. Domain
/// outcomes such as a missing plan are logged at `debug`, as is the elapsed
/// time of every finished observation.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingObservations;

struct SpanObservation {
    span: Span,
    started: Instant,
}

impl Observation for SpanObservation {
    fn annotate_query(&mut self, predicate: &str) {
        self.span.record("db.query", predicate);
    }

    fn annotate_key(&mut self, key: &str) {
        self.span.record("db.key", key);
    }

    fn record_error(&mut self, error: &PlanRepositoryError) {
        self.span.record("error", error.kind());
        if failure_level(error) == Level::WARN {
            warn!(parent: &self.span, kind = error.kind(), %error, "plan storage operation failed");
        } else {
            debug!(parent: &self.span, kind = error.kind(), %error, "plan storage operation failed");
        }
    }

    fn finish(self: Box<Self>) {
        let elapsed_ms = u64::try_from(self.started.elapsed().as_millis()).unwrap_or(u64::MAX);
        debug!(parent: &self.span, elapsed_ms, "plan storage operation finished");
    }
}

fn failure_level(error: &PlanRepositoryError) -> Level {
    if error.is_infrastructure() {
        Level::WARN
    } else {
        Level::DEBUG
    }
}

impl ObservationProvider for TracingObservations {
    fn begin(&self, kind: OperationKind, collection: &'static str) -> Box<dyn Observation> {
        let span = info_span!(
            "plan_storage.operation",
            db.operation = kind.as_str(),
            db.collection = collection,
            db.query = field::Empty,
            db.key = field::Empty,
            correlation_id = field::Empty,
            error = field::Empty,
        );
        if let Some(id) = CorrelationId::current() {
            span.record("correlation_id", field::display(id));
        }
        Box::new(SpanObservation {
            span,
            started: Instant::now(),
        })
    }
}
