//! [`PlanRepository`] adapter over one or two plan collections.
//!
//! `PlanStorage` owns the write path that keeps a single default plan and
//! routes every call to the backend chosen for it at construction: reads go
//! to the reader collection, writes to the writer collection. During a
//! client migration the two can be different generations over the same
//! table.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;

use crate::domain::Plan;
use crate::domain::ports::{PlanRepository, PlanRepositoryError};
use crate::outbound::observation::{
    ObservationProvider, ObservedCall, OperationKind, TracingObservations,
};

use super::collection::{CollectionError, PlanCollection, PlanFilter};
use super::document::PlanDocument;
use super::error_mapping::{
    map_infrastructure_error, map_insert_error, map_lookup_error, single_default,
};

/// Plan repository backed by [`PlanCollection`] executors.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use plan_storage::domain::Plan;
/// use plan_storage::domain::ports::PlanRepository;
/// use plan_storage::outbound::persistence::{InMemoryPlanCollection, PlanStorage};
///
/// # tokio::runtime::Builder::new_current_thread().enable_all().build().unwrap().block_on(async {
/// let storage = PlanStorage::new(Arc::new(InMemoryPlanCollection::new()));
/// storage.insert(&Plan::new("small", 256, 250).as_default()).await.unwrap();
/// assert_eq!(storage.find_default().await.unwrap().name, "small");
/// # });
/// ```
#[derive(Clone)]
pub struct PlanStorage {
    reader: Arc<dyn PlanCollection>,
    writer: Arc<dyn PlanCollection>,
    observations: Arc<dyn ObservationProvider>,
    operation_timeout: Option<Duration>,
}

impl PlanStorage {
    /// Serve reads and writes from the same collection.
    pub fn new(collection: Arc<dyn PlanCollection>) -> Self {
        Self::with_backends(Arc::clone(&collection), collection)
    }

    /// Serve reads from `reader` and writes from `writer`.
    pub fn with_backends(reader: Arc<dyn PlanCollection>, writer: Arc<dyn PlanCollection>) -> Self {
        Self {
            reader,
            writer,
            observations: Arc::new(TracingObservations),
            operation_timeout: None,
        }
    }

    /// Replace the default tracing observations.
    #[must_use]
    pub fn with_observations(mut self, observations: Arc<dyn ObservationProvider>) -> Self {
        self.observations = observations;
        self
    }

    /// Fail any executor call that takes longer than `timeout` with
    /// [`PlanRepositoryError::Cancelled`].
    #[must_use]
    pub fn with_operation_timeout(mut self, timeout: Duration) -> Self {
        self.operation_timeout = Some(timeout);
        self
    }

    fn observe(&self, kind: OperationKind, collection: &dyn PlanCollection) -> ObservedCall {
        ObservedCall::begin(self.observations.as_ref(), kind, collection.name())
    }

    async fn bounded<T, F>(&self, call: F) -> Result<T, CollectionError>
    where
        F: Future<Output = Result<T, CollectionError>> + Send,
    {
        let Some(limit) = self.operation_timeout else {
            return call.await;
        };
        match tokio::time::timeout(limit, call).await {
            Ok(result) => result,
            Err(_) => Err(CollectionError::timeout(
                u64::try_from(limit.as_millis()).unwrap_or(u64::MAX),
            )),
        }
    }
}

#[async_trait]
impl PlanRepository for PlanStorage {
    async fn insert(&self, plan: &Plan) -> Result<(), PlanRepositoryError> {
        let document = PlanDocument::from(plan);
        let collection = self.writer.as_ref();

        if document.default {
            let call = self
                .observe(OperationKind::ReplaceDefault, collection)
                .with_query(PlanFilter::Default)
                .with_key(&document.name);
            let result = self
                .bounded(collection.replace_default(&document))
                .await
                .map(|cleared| {
                    debug!(plan = %document.name, cleared, "replaced default plan");
                })
                .map_err(|err| map_insert_error(err, &document.name));
            return call.complete(result);
        }

        let call = self
            .observe(OperationKind::Insert, collection)
            .with_key(&document.name);
        let result = self
            .bounded(collection.insert_one(&document))
            .await
            .map_err(|err| map_insert_error(err, &document.name));
        call.complete(result)
    }

    async fn find_all(&self) -> Result<Vec<Plan>, PlanRepositoryError> {
        let collection = self.reader.as_ref();
        let call = self
            .observe(OperationKind::Find, collection)
            .with_query(PlanFilter::All);
        let result = self
            .bounded(collection.find(PlanFilter::All))
            .await
            .map(|documents| documents.into_iter().map(Plan::from).collect())
            .map_err(map_infrastructure_error);
        call.complete(result)
    }

    async fn find_default(&self) -> Result<Plan, PlanRepositoryError> {
        let collection = self.reader.as_ref();
        let call = self
            .observe(OperationKind::Find, collection)
            .with_query(PlanFilter::Default);
        let result = self
            .bounded(collection.find(PlanFilter::Default))
            .await
            .map_err(map_infrastructure_error)
            .and_then(single_default)
            .map(Plan::from);
        call.complete(result)
    }

    async fn find_by_name(&self, name: &str) -> Result<Plan, PlanRepositoryError> {
        let collection = self.reader.as_ref();
        let call = self.observe(OperationKind::FindOne, collection).with_key(name);
        let result = self
            .bounded(collection.find_by_id(name))
            .await
            .map(Plan::from)
            .map_err(|err| map_lookup_error(err, name));
        call.complete(result)
    }

    async fn delete(&self, plan: &Plan) -> Result<(), PlanRepositoryError> {
        let collection = self.writer.as_ref();
        let call = self
            .observe(OperationKind::Delete, collection)
            .with_key(&plan.name);
        let result = self
            .bounded(collection.delete_by_id(&plan.name))
            .await
            .map_err(|err| map_lookup_error(err, &plan.name));
        call.complete(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{CorrelationId, CpuBurst, PlanOverride};
    use crate::outbound::observation::RecordingObservations;
    use crate::outbound::persistence::collection::{MockPlanCollection, PLANS_COLLECTION};
    use crate::outbound::persistence::InMemoryPlanCollection;
    use rstest::{fixture, rstest};

    struct Harness {
        collection: Arc<InMemoryPlanCollection>,
        recorder: RecordingObservations,
        storage: PlanStorage,
    }

    #[fixture]
    fn harness() -> Harness {
        let collection = Arc::new(InMemoryPlanCollection::new());
        let recorder = RecordingObservations::default();
        let storage = PlanStorage::new(collection.clone())
            .with_observations(Arc::new(recorder.clone()));
        Harness {
            collection,
            recorder,
            storage,
        }
    }

    fn plan(name: &str) -> Plan {
        Plan::new(name, 512 * 1024 * 1024, 250)
    }

    fn stored(name: &str, default: bool) -> PlanDocument {
        PlanDocument::from(&if default {
            plan(name).as_default()
        } else {
            plan(name)
        })
    }

    fn mock_named() -> MockPlanCollection {
        let mut mock = MockPlanCollection::new();
        mock.expect_name().return_const(PLANS_COLLECTION);
        mock
    }

    /// Collection whose calls never complete.
    struct Stalled;

    #[async_trait]
    impl PlanCollection for Stalled {
        fn name(&self) -> &'static str {
            PLANS_COLLECTION
        }

        async fn insert_one(&self, _document: &PlanDocument) -> Result<(), CollectionError> {
            std::future::pending().await
        }

        async fn find(&self, _filter: PlanFilter) -> Result<Vec<PlanDocument>, CollectionError> {
            std::future::pending().await
        }

        async fn find_by_id(&self, _id: &str) -> Result<PlanDocument, CollectionError> {
            std::future::pending().await
        }

        async fn unset_default_all(&self) -> Result<u64, CollectionError> {
            std::future::pending().await
        }

        async fn delete_by_id(&self, _id: &str) -> Result<(), CollectionError> {
            std::future::pending().await
        }
    }

    #[rstest]
    #[tokio::test]
    async fn duplicate_insert_is_rejected_and_keeps_original(harness: Harness) {
        harness.storage.insert(&plan("small")).await.expect("first");
        let changed = Plan::new("small", 1, 1);

        let err = harness
            .storage
            .insert(&changed)
            .await
            .expect_err("duplicate");

        assert_eq!(err, PlanRepositoryError::already_exists("small"));
        let found = harness.storage.find_by_name("small").await.expect("find");
        assert_eq!(found, plan("small"));
    }

    #[rstest]
    #[tokio::test]
    async fn find_all_lists_plans_by_name(harness: Harness) {
        for name in ["c", "a", "b"] {
            harness.storage.insert(&plan(name)).await.expect("insert");
        }

        let names: Vec<String> = harness
            .storage
            .find_all()
            .await
            .expect("list")
            .into_iter()
            .map(|plan| plan.name)
            .collect();

        assert_eq!(names, ["a", "b", "c"]);
    }

    #[rstest]
    #[tokio::test]
    async fn find_all_on_empty_collection_is_empty(harness: Harness) {
        assert_eq!(harness.storage.find_all().await, Ok(Vec::new()));
    }

    #[rstest]
    #[tokio::test]
    async fn later_default_replaces_earlier_default(harness: Harness) {
        harness
            .storage
            .insert(&plan("a").as_default())
            .await
            .expect("a");
        harness
            .storage
            .insert(&plan("b").as_default())
            .await
            .expect("b");

        let default = harness.storage.find_default().await.expect("default");
        assert_eq!(default.name, "b");
        let previous = harness.storage.find_by_name("a").await.expect("a");
        assert!(!previous.default);
    }

    #[rstest]
    #[tokio::test]
    async fn non_default_insert_leaves_default_alone(harness: Harness) {
        harness
            .storage
            .insert(&plan("a").as_default())
            .await
            .expect("a");
        harness.storage.insert(&plan("b")).await.expect("b");

        assert_eq!(
            harness.storage.find_default().await.map(|plan| plan.name),
            Ok("a".to_owned())
        );
    }

    #[rstest]
    #[tokio::test]
    async fn missing_default_is_reported(harness: Harness) {
        assert_eq!(
            harness.storage.find_default().await,
            Err(PlanRepositoryError::default_not_found())
        );

        harness.storage.insert(&plan("a")).await.expect("a");
        assert_eq!(
            harness.storage.find_default().await,
            Err(PlanRepositoryError::default_not_found())
        );
    }

    #[rstest]
    #[tokio::test]
    async fn two_defaults_are_ambiguous(harness: Harness) {
        harness.collection.seed(stored("a", true));
        harness.collection.seed(stored("b", true));

        assert_eq!(
            harness.storage.find_default().await,
            Err(PlanRepositoryError::default_ambiguous(2_usize))
        );
    }

    #[rstest]
    #[tokio::test]
    async fn round_trip_drops_overrides_only(harness: Harness) {
        let original = plan("burst")
            .with_cpu_burst(CpuBurst {
                default: 1.5,
                max_allowed: 4.0,
            })
            .with_override(PlanOverride {
                memory: Some(1),
                cpu_milli: Some(2),
                cpu_burst: Some(3.0),
            })
            .as_default();
        harness.storage.insert(&original).await.expect("insert");

        let found = harness.storage.find_by_name("burst").await.expect("find");

        let mut expected = original;
        expected.overrides = None;
        assert_eq!(found, expected);
    }

    #[rstest]
    #[tokio::test]
    async fn missing_plans_are_not_found(harness: Harness) {
        assert_eq!(
            harness.storage.find_by_name("missing").await,
            Err(PlanRepositoryError::not_found("missing"))
        );
        assert_eq!(
            harness.storage.delete(&plan("missing")).await,
            Err(PlanRepositoryError::not_found("missing"))
        );
    }

    #[rstest]
    #[tokio::test]
    async fn delete_removes_the_plan(harness: Harness) {
        harness.storage.insert(&plan("gone")).await.expect("insert");

        harness.storage.delete(&plan("gone")).await.expect("delete");

        assert!(harness.collection.is_empty());
    }

    #[rstest]
    #[tokio::test]
    async fn each_call_is_observed_once(harness: Harness) {
        harness.storage.insert(&plan("a")).await.expect("insert");
        harness
            .storage
            .insert(&plan("b").as_default())
            .await
            .expect("default insert");
        harness.storage.find_all().await.expect("list");
        harness.storage.find_default().await.expect("default");
        let _ = harness.storage.find_by_name("missing").await;
        harness.storage.delete(&plan("a")).await.expect("delete");

        let recorded = harness.recorder.observations();
        let kinds: Vec<OperationKind> = recorded.iter().map(|obs| obs.kind).collect();
        assert_eq!(
            kinds,
            [
                OperationKind::Insert,
                OperationKind::ReplaceDefault,
                OperationKind::Find,
                OperationKind::Find,
                OperationKind::FindOne,
                OperationKind::Delete,
            ]
        );
        assert!(recorded.iter().all(|obs| obs.finishes == 1));
        assert!(recorded.iter().all(|obs| obs.collection == "plans"));

        let failed: Vec<bool> = recorded.iter().map(|obs| obs.error.is_some()).collect();
        assert_eq!(failed, [false, false, false, false, true, false]);
        assert_eq!(recorded[3].query.as_deref(), Some(r#"{"default":true}"#));
        assert_eq!(recorded[4].key.as_deref(), Some("missing"));
    }

    #[rstest]
    #[tokio::test]
    async fn ambiguity_is_recorded_on_the_observation(harness: Harness) {
        harness.collection.seed(stored("a", true));
        harness.collection.seed(stored("b", true));

        let _ = harness.storage.find_default().await;

        let recorded = harness.recorder.observations();
        assert_eq!(
            recorded[0].error,
            Some(PlanRepositoryError::default_ambiguous(2_usize))
        );
    }

    #[rstest]
    #[tokio::test]
    async fn observations_carry_the_correlation_id(harness: Harness) {
        let id = CorrelationId::generate();

        CorrelationId::scope(id, harness.storage.find_all())
            .await
            .expect("list");

        assert_eq!(harness.recorder.observations()[0].correlation_id, Some(id));
    }

    #[rstest]
    #[tokio::test]
    async fn reads_and_writes_use_their_own_backends() {
        let reader = Arc::new(InMemoryPlanCollection::new());
        let writer = Arc::new(InMemoryPlanCollection::new());
        let storage = PlanStorage::with_backends(reader.clone(), writer.clone());
        reader.seed(stored("legacy", false));

        storage.insert(&plan("fresh")).await.expect("insert");

        assert_eq!(writer.len(), 1);
        let names: Vec<String> = storage
            .find_all()
            .await
            .expect("list")
            .into_iter()
            .map(|plan| plan.name)
            .collect();
        assert_eq!(names, ["legacy"]);
    }

    #[rstest]
    #[tokio::test]
    async fn failing_clear_surfaces_and_is_recorded() {
        let mut mock = mock_named();
        mock.expect_replace_default()
            .times(1)
            .returning(|_| Err(CollectionError::connection("connection reset")));
        let recorder = RecordingObservations::default();
        let storage =
            PlanStorage::new(Arc::new(mock)).with_observations(Arc::new(recorder.clone()));

        let err = storage
            .insert(&plan("a").as_default())
            .await
            .expect_err("clear fails");

        assert_eq!(err, PlanRepositoryError::connection("connection reset"));
        let recorded = recorder.observations();
        assert_eq!(recorded.len(), 1);
        assert_eq!(recorded[0].kind, OperationKind::ReplaceDefault);
        assert_eq!(recorded[0].error, Some(err));
    }

    #[rstest]
    #[case(CollectionError::connection("refused"), PlanRepositoryError::connection("refused"))]
    #[case(CollectionError::decode("bad document"), PlanRepositoryError::query("bad document"))]
    #[case(CollectionError::query("syntax"), PlanRepositoryError::query("syntax"))]
    #[tokio::test]
    async fn read_failures_are_infrastructure_errors(
        #[case] signal: CollectionError,
        #[case] expected: PlanRepositoryError,
    ) {
        let mut mock = mock_named();
        mock.expect_find()
            .times(1)
            .returning(move |_| Err(signal.clone()));
        let storage = PlanStorage::new(Arc::new(mock));

        let err = storage.find_all().await.expect_err("read fails");

        assert_eq!(err, expected);
        assert!(err.is_infrastructure());
    }

    #[rstest]
    #[tokio::test]
    async fn slow_calls_are_cancelled_at_the_deadline() {
        let recorder = RecordingObservations::default();
        let storage = PlanStorage::new(Arc::new(Stalled))
            .with_observations(Arc::new(recorder.clone()))
            .with_operation_timeout(Duration::from_millis(20));

        let err = storage.find_by_name("any").await.expect_err("deadline");

        assert_eq!(err.kind(), "cancelled");
        let recorded = recorder.observations();
        assert_eq!(recorded[0].finishes, 1);
        assert_eq!(recorded[0].error, Some(err));
    }

    #[rstest]
    #[tokio::test]
    async fn abandoned_calls_still_finish_their_observation() {
        let recorder = RecordingObservations::default();
        let storage =
            PlanStorage::new(Arc::new(Stalled)).with_observations(Arc::new(recorder.clone()));

        let outcome =
            tokio::time::timeout(Duration::from_millis(20), storage.insert(&plan("a"))).await;

        assert!(outcome.is_err());
        let recorded = recorder.observations();
        assert_eq!(recorded.len(), 1);
        assert_eq!(recorded[0].finishes, 1);
        assert_eq!(
            recorded[0].error.as_ref().map(PlanRepositoryError::kind),
            Some("cancelled")
        );
    }
}
