//! In-memory observation provider for assertions in tests.

use std::sync::{Arc, Mutex, MutexGuard};

use crate::domain::CorrelationId;
use crate::domain::ports::PlanRepositoryError;

use super::{Observation, ObservationProvider, OperationKind};

/// Snapshot of one observation as seen by [`RecordingObservations`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedObservation {
    pub kind: OperationKind,
    pub collection: &'static str,
    pub query: Option<String>,
    pub key: Option<String>,
    pub error: Option<PlanRepositoryError>,
    pub correlation_id: Option<CorrelationId>,
    /// Number of times `finish` ran; exactly one for a closed observation.
    pub finishes: u32,
}

/// Provider that keeps every observation it hands out.
///
/// Clones share the same log, so a test can keep one handle while the
/// adapter owns another.
#[derive(Debug, Clone, Default)]
pub struct RecordingObservations {
    log: Arc<Mutex<Vec<RecordedObservation>>>,
}

impl RecordingObservations {
    /// Copy of everything recorded so far, in begin order.
    pub fn observations(&self) -> Vec<RecordedObservation> {
        lock(&self.log).clone()
    }
}

fn lock(log: &Mutex<Vec<RecordedObservation>>) -> MutexGuard<'_, Vec<RecordedObservation>> {
    log.lock().unwrap_or_else(|err| err.into_inner())
}

struct RecordingObservation {
    log: Arc<Mutex<Vec<RecordedObservation>>>,
    index: usize,
}

impl RecordingObservation {
    fn update(&self, apply: impl FnOnce(&mut RecordedObservation)) {
        if let Some(entry) = lock(&self.log).get_mut(self.index) {
            apply(entry);
        }
    }
}

impl Observation for RecordingObservation {
    fn annotate_query(&mut self, predicate: &str) {
        self.update(|entry| entry.query = Some(predicate.to_owned()));
    }

    fn annotate_key(&mut self, key: &str) {
        self.update(|entry| entry.key = Some(key.to_owned()));
    }

    fn record_error(&mut self, error: &PlanRepositoryError) {
        self.update(|entry| entry.error = Some(error.clone()));
    }

    fn finish(self: Box<Self>) {
        self.update(|entry| entry.finishes += 1);
    }
}

impl ObservationProvider for RecordingObservations {
    fn begin(&self, kind: OperationKind, collection: &'static str) -> Box<dyn Observation> {
        let mut log = lock(&self.log);
        let index = log.len();
        log.push(RecordedObservation {
            kind,
            collection,
            query: None,
            key: None,
            error: None,
            correlation_id: CorrelationId::current(),
            finishes: 0,
        });
        Box::new(RecordingObservation {
            log: Arc::clone(&self.log),
            index,
        })
    }
}
