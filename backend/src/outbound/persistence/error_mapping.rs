//! Translation of collection signals into plan repository errors.
//!
//! Backends already reduced their native errors to [`CollectionError`]. This
//! module decides what each signal means for the operation that raised it:
//! a duplicate key is only "already exists" for an insert, and "no
//! documents" is only "not found" for a point lookup or delete. Anything
//! else passes through as an infrastructure error.

use tracing::debug;

use crate::domain::ports::PlanRepositoryError;

use super::collection::CollectionError;
use super::document::PlanDocument;

/// Map a failure from `insert_one` or `replace_default`.
pub fn map_insert_error(error: CollectionError, name: &str) -> PlanRepositoryError {
    match error {
        CollectionError::DuplicateKey { .. } => PlanRepositoryError::already_exists(name),
        other => map_infrastructure_error(other),
    }
}

/// Map a failure from `find_by_id` or `delete_by_id`.
pub fn map_lookup_error(error: CollectionError, name: &str) -> PlanRepositoryError {
    match error {
        CollectionError::NoDocuments => PlanRepositoryError::not_found(name),
        other => map_infrastructure_error(other),
    }
}

/// Map a signal with no domain meaning for the current operation.
pub fn map_infrastructure_error(error: CollectionError) -> PlanRepositoryError {
    debug!(kind = error.kind(), %error, "plan collection operation failed");

    match error {
        CollectionError::Connection { message } => PlanRepositoryError::connection(message),
        CollectionError::Query { message } | CollectionError::Decode { message } => {
            PlanRepositoryError::query(message)
        }
        CollectionError::Timeout { millis } => {
            PlanRepositoryError::cancelled(format!("deadline of {millis}ms elapsed"))
        }
        unexpected @ (CollectionError::DuplicateKey { .. } | CollectionError::NoDocuments) => {
            PlanRepositoryError::query(unexpected.to_string())
        }
    }
}

/// Reduce the result of the default query to the single default document.
///
/// Zero matches is [`PlanRepositoryError::DefaultNotFound`]; more than one is
/// [`PlanRepositoryError::DefaultAmbiguous`]. Neither case picks a document.
pub fn single_default(
    documents: Vec<PlanDocument>,
) -> Result<PlanDocument, PlanRepositoryError> {
    let count = documents.len();
    let mut matches = documents.into_iter();
    match (matches.next(), matches.next()) {
        (None, _) => Err(PlanRepositoryError::default_not_found()),
        (Some(only), None) => Ok(only),
        (Some(_), Some(_)) => Err(PlanRepositoryError::default_ambiguous(count)),
    }
}
