//! Legacy-generation plan collection using Diesel ORM.
//!
//! Documents live in the `plans` table as JSONB. Predicates use JSONB
//! containment (`@>`) and the default flag is unset by removing the key
//! (`document - 'default'`), mirroring how the collection has always been
//! written. Clear-then-insert runs inside one transaction.

use async_trait::async_trait;
use diesel::expression_methods::PgJsonbExpressionMethods;
use diesel::prelude::*;
use diesel_async::scoped_futures::ScopedFutureExt;
use diesel_async::{AsyncConnection, AsyncPgConnection, RunQueryDsl};
use serde_json::{Value, json};
use tracing::debug;

use super::collection::{CollectionError, PLANS_COLLECTION, PlanCollection, PlanFilter};
use super::document::PlanDocument;
use super::models::NewPlanRow;
use super::pool::DbPool;
use super::schema::plans;

/// Diesel-backed implementation of [`PlanCollection`].
#[derive(Clone)]
pub struct DieselPlanCollection {
    pool: DbPool,
}

impl DieselPlanCollection {
    /// Create a collection using the given connection pool.
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

/// Map Diesel errors to collection signals.
///
/// `key` names the document the statement targeted so duplicate keys can be
/// reported against it.
fn map_diesel_error(error: diesel::result::Error, key: &str) -> CollectionError {
    use diesel::result::{DatabaseErrorKind, Error as DieselError};

    match &error {
        DieselError::DatabaseError(kind, info) => {
            debug!(?kind, message = info.message(), "diesel operation failed");
        }
        _ => debug!(
            error_type = %std::any::type_name_of_val(&error),
            "diesel operation failed"
        ),
    }

    match error {
        DieselError::NotFound => CollectionError::no_documents(),
        DieselError::QueryBuilderError(_) => CollectionError::query("database query error"),
        DieselError::DatabaseError(kind, info) => match kind {
            DatabaseErrorKind::UniqueViolation => CollectionError::duplicate_key(key),
            DatabaseErrorKind::ClosedConnection => {
                CollectionError::connection("database connection error")
            }
            _ => CollectionError::query(info.message()),
        },
        DieselError::DeserializationError(err) => CollectionError::decode(err.to_string()),
        other => CollectionError::query(other.to_string()),
    }
}

fn default_predicate() -> Value {
    json!({ "default": true })
}

fn encode(document: &PlanDocument) -> Result<Value, CollectionError> {
    serde_json::to_value(document).map_err(|err| CollectionError::query(err.to_string()))
}

fn decode(value: Value) -> Result<PlanDocument, CollectionError> {
    serde_json::from_value(value).map_err(|err| CollectionError::decode(err.to_string()))
}

async fn insert_document(
    conn: &mut AsyncPgConnection,
    name: &str,
    document: Value,
) -> Result<(), diesel::result::Error> {
    diesel::insert_into(plans::table)
        .values(NewPlanRow { id: name, document })
        .execute(conn)
        .await
        .map(|_| ())
}

async fn unset_defaults(conn: &mut AsyncPgConnection) -> Result<u64, diesel::result::Error> {
    let touched = diesel::update(plans::table.filter(plans::document.contains(default_predicate())))
        .set(plans::document.eq(plans::document.remove("default")))
        .execute(conn)
        .await?;
    Ok(u64::try_from(touched).unwrap_or(u64::MAX))
}

#[async_trait]
impl PlanCollection for DieselPlanCollection {
    fn name(&self) -> &'static str {
        PLANS_COLLECTION
    }

    async fn insert_one(&self, document: &PlanDocument) -> Result<(), CollectionError> {
        let value = encode(document)?;
        let mut conn = self.pool.get().await?;

        insert_document(&mut conn, &document.name, value)
            .await
            .map_err(|err| map_diesel_error(err, &document.name))
    }

    async fn find(&self, filter: PlanFilter) -> Result<Vec<PlanDocument>, CollectionError> {
        let mut conn = self.pool.get().await?;

        let mut query = plans::table
            .select(plans::document)
            .order(plans::id.asc())
            .into_boxed();
        if filter == PlanFilter::Default {
            query = query.filter(plans::document.contains(default_predicate()));
        }

        let values: Vec<Value> = query
            .load(&mut conn)
            .await
            .map_err(|err| map_diesel_error(err, ""))?;

        values.into_iter().map(decode).collect()
    }

    async fn find_by_id(&self, id: &str) -> Result<PlanDocument, CollectionError> {
        let mut conn = self.pool.get().await?;

        let value: Value = plans::table
            .find(id)
            .select(plans::document)
            .first(&mut conn)
            .await
            .map_err(|err| map_diesel_error(err, id))?;

        decode(value)
    }

    async fn unset_default_all(&self) -> Result<u64, CollectionError> {
        let mut conn = self.pool.get().await?;

        unset_defaults(&mut conn)
            .await
            .map_err(|err| map_diesel_error(err, ""))
    }

    async fn replace_default(&self, document: &PlanDocument) -> Result<u64, CollectionError> {
        let value = encode(document)?;
        let name = document.name.as_str();
        let mut conn = self.pool.get().await?;

        conn.transaction::<u64, diesel::result::Error, _>(|conn| {
            async move {
                let cleared = unset_defaults(conn).await?;
                insert_document(conn, name, value).await?;
                Ok(cleared)
            }
            .scope_boxed()
        })
        .await
        .map_err(|err| map_diesel_error(err, name))
    }

    async fn delete_by_id(&self, id: &str) -> Result<(), CollectionError> {
        let mut conn = self.pool.get().await?;

        let deleted = diesel::delete(plans::table.find(id))
            .execute(&mut conn)
            .await
            .map_err(|err| map_diesel_error(err, id))?;

        if deleted == 0 {
            return Err(CollectionError::no_documents());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use diesel::result::{DatabaseErrorKind, Error as DieselError};
    use rstest::rstest;

    fn database_error(kind: DatabaseErrorKind, message: &str) -> DieselError {
        DieselError::DatabaseError(kind, Box::new(message.to_owned()))
    }

    #[rstest]
    fn unique_violation_maps_to_duplicate_key() {
        let err = map_diesel_error(
            database_error(DatabaseErrorKind::UniqueViolation, "plans_pkey"),
            "small",
        );
        assert_eq!(err, CollectionError::duplicate_key("small"));
    }

    #[rstest]
    fn not_found_maps_to_no_documents() {
        let err = map_diesel_error(DieselError::NotFound, "missing");
        assert_eq!(err, CollectionError::no_documents());
    }

    #[rstest]
    fn closed_connection_maps_to_connection() {
        let err = map_diesel_error(
            database_error(DatabaseErrorKind::ClosedConnection, "gone"),
            "small",
        );
        assert_eq!(err.kind(), "connection");
    }

    #[rstest]
    fn other_database_errors_keep_their_message() {
        let err = map_diesel_error(
            database_error(DatabaseErrorKind::CheckViolation, "plans_document_id_matches"),
            "small",
        );
        assert_eq!(err, CollectionError::query("plans_document_id_matches"));
    }

    #[rstest]
    fn stored_documents_decode_through_serde() {
        let decoded = decode(json!({ "_id": "a", "memory": 1, "cpumilli": 2 })).expect("decode");
        assert_eq!(decoded.name, "a");

        let err = decode(json!({ "_id": "a" })).expect_err("missing fields");
        assert_eq!(err.kind(), "decode");
    }
}
