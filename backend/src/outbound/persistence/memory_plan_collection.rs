//! Process-local plan collection.
//!
//! Keeps documents in a `BTreeMap` keyed by `_id`, which gives the ascending
//! order `find` promises for free. Used by the operator tool when no database
//! is configured and by the behavioural tests.

use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;

use super::collection::{CollectionError, PLANS_COLLECTION, PlanCollection, PlanFilter};
use super::document::PlanDocument;

/// In-memory implementation of [`PlanCollection`].
#[derive(Debug, Default)]
pub struct InMemoryPlanCollection {
    documents: Mutex<BTreeMap<String, PlanDocument>>,
}

impl InMemoryPlanCollection {
    /// Create an empty collection.
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `document` as is, replacing any document with the same `_id`.
    ///
    /// Bypasses the default bookkeeping, which lets tests stage collections
    /// written by other clients (for example two documents flagged default).
    pub fn seed(&self, document: PlanDocument) {
        self.lock().insert(document.name.clone(), document);
    }

    /// Number of stored documents.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Whether the collection holds no documents.
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> MutexGuard<'_, BTreeMap<String, PlanDocument>> {
        self.documents
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

fn unset_defaults(documents: &mut BTreeMap<String, PlanDocument>) -> u64 {
    let mut cleared = 0;
    for document in documents.values_mut().filter(|doc| doc.default) {
        document.default = false;
        cleared += 1;
    }
    cleared
}

#[async_trait]
impl PlanCollection for InMemoryPlanCollection {
    fn name(&self) -> &'static str {
        PLANS_COLLECTION
    }

    async fn insert_one(&self, document: &PlanDocument) -> Result<(), CollectionError> {
        let mut documents = self.lock();
        if documents.contains_key(&document.name) {
            return Err(CollectionError::duplicate_key(document.name.as_str()));
        }
        documents.insert(document.name.clone(), document.clone());
        Ok(())
    }

    async fn find(&self, filter: PlanFilter) -> Result<Vec<PlanDocument>, CollectionError> {
        Ok(self
            .lock()
            .values()
            .filter(|document| filter.matches(document))
            .cloned()
            .collect())
    }

    async fn find_by_id(&self, id: &str) -> Result<PlanDocument, CollectionError> {
        self.lock()
            .get(id)
            .cloned()
            .ok_or_else(CollectionError::no_documents)
    }

    async fn unset_default_all(&self) -> Result<u64, CollectionError> {
        Ok(unset_defaults(&mut self.lock()))
    }

    async fn replace_default(&self, document: &PlanDocument) -> Result<u64, CollectionError> {
        let mut documents = self.lock();
        if documents.contains_key(&document.name) {
            return Err(CollectionError::duplicate_key(document.name.as_str()));
        }
        let cleared = unset_defaults(&mut documents);
        documents.insert(document.name.clone(), document.clone());
        Ok(cleared)
    }

    async fn delete_by_id(&self, id: &str) -> Result<(), CollectionError> {
        self.lock()
            .remove(id)
            .map(|_| ())
            .ok_or_else(CollectionError::no_documents)
    }
}
