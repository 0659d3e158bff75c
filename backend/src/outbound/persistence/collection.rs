//! Query executor contract shared by every plan store backend.
//!
//! [`PlanCollection`] is the seam between [`PlanStorage`](super::PlanStorage)
//! and a concrete client generation. Each backend classifies its native
//! failures into [`CollectionError`] signals; translating those signals into
//! the domain vocabulary happens once, in the error mapping module, so both
//! client generations present the same contract.

use std::fmt;

use async_trait::async_trait;

use crate::domain::ports::define_port_error;

use super::document::PlanDocument;

/// Logical name of the collection holding plan documents.
pub const PLANS_COLLECTION: &str = "plans";

define_port_error! {
    /// Backend signals raised by [`PlanCollection`] implementations.
    pub enum CollectionError {
        /// A document with the same `_id` already exists.
        DuplicateKey { key: String } => "duplicate key {key}",
        /// The operation matched no document.
        NoDocuments => "no documents matched",
        /// Connection checkout or transport failed.
        Connection { message: String } => "collection connection failed: {message}",
        /// The statement was rejected or failed while executing.
        Query { message: String } => "collection query failed: {message}",
        /// A stored document could not be decoded.
        Decode { message: String } => "stored document could not be decoded: {message}",
        /// The operation deadline elapsed.
        Timeout { millis: u64 } => "operation exceeded its {millis}ms deadline",
    }
}

/// Predicate applied by [`PlanCollection::find`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlanFilter {
    /// Every document.
    All,
    /// Documents flagged as the default plan.
    Default,
}

impl PlanFilter {
    /// Whether `document` satisfies the predicate.
    pub fn matches(self, document: &PlanDocument) -> bool {
        match self {
            Self::All => true,
            Self::Default => document.default,
        }
    }
}

/// Renders the predicate in document-query form for observations.
impl fmt::Display for PlanFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::All => f.write_str("{}"),
            Self::Default => f.write_str(r#"{"default":true}"#),
        }
    }
}

/// Executor for the plan collection.
///
/// Contract every implementation honours:
///
/// - `find` returns documents sorted ascending by `_id`.
/// - `find_by_id` and `delete_by_id` signal [`CollectionError::NoDocuments`]
///   when nothing matches.
/// - `insert_one` signals [`CollectionError::DuplicateKey`] when `_id` is
///   taken and leaves the stored document unchanged.
/// - Connections are checked out per call and released before returning.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PlanCollection: Send + Sync {
    /// Logical collection name used when tagging observations.
    fn name(&self) -> &'static str;

    /// Insert one document keyed by its `_id`.
    async fn insert_one(&self, document: &PlanDocument) -> Result<(), CollectionError>;

    /// Documents matching `filter`, ascending by `_id`.
    async fn find(&self, filter: PlanFilter) -> Result<Vec<PlanDocument>, CollectionError>;

    /// The document stored under `id`.
    async fn find_by_id(&self, id: &str) -> Result<PlanDocument, CollectionError>;

    /// Unset the default flag on every document holding it.
    ///
    /// Returns the number of documents touched.
    async fn unset_default_all(&self) -> Result<u64, CollectionError>;

    /// Clear every existing default, then insert `document`.
    ///
    /// The provided implementation issues the two steps independently; a
    /// failed clear stops before the insert, but a failed insert leaves the
    /// previous defaults cleared. Backends with multi-document transactions
    /// override this to run both steps atomically.
    async fn replace_default(&self, document: &PlanDocument) -> Result<u64, CollectionError> {
        let cleared = self.unset_default_all().await?;
        self.insert_one(document).await?;
        Ok(cleared)
    }

    /// Remove the document stored under `id`.
    async fn delete_by_id(&self, id: &str) -> Result<(), CollectionError>;
}
