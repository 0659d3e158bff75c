//! Current-generation plan collection using sqlx.
//!
//! Shares the `plans` table and document shape with the Diesel backend so the
//! two generations can read each other's writes during a migration window.

use async_trait::async_trait;
use sqlx::PgPool;
use sqlx::types::Json;
use tracing::debug;

use super::collection::{CollectionError, PLANS_COLLECTION, PlanCollection, PlanFilter};
use super::document::PlanDocument;

const INSERT_PLAN: &str = "INSERT INTO plans (id, document) VALUES ($1, $2)";
const SELECT_ALL: &str = "SELECT document FROM plans ORDER BY id";
const SELECT_DEFAULTS: &str =
    r#"SELECT document FROM plans WHERE document @> '{"default": true}'::jsonb ORDER BY id"#;
const SELECT_BY_ID: &str = "SELECT document FROM plans WHERE id = $1";
const UNSET_DEFAULTS: &str = r#"UPDATE plans SET document = document - 'default'
    WHERE document @> '{"default": true}'::jsonb"#;
const DELETE_BY_ID: &str = "DELETE FROM plans WHERE id = $1";

/// sqlx-backed implementation of [`PlanCollection`].
#[derive(Clone)]
pub struct SqlxPlanCollection {
    pool: PgPool,
}

impl SqlxPlanCollection {
    /// Create a collection over an existing sqlx pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Classify sqlx errors into collection signals.
fn map_sqlx_error(error: sqlx::Error, key: &str) -> CollectionError {
    debug!(%error, "sqlx operation failed");

    match error {
        sqlx::Error::RowNotFound => CollectionError::no_documents(),
        sqlx::Error::Database(db) if db.is_unique_violation() => {
            CollectionError::duplicate_key(key)
        }
        sqlx::Error::Database(db) => CollectionError::query(db.message()),
        sqlx::Error::PoolTimedOut
        | sqlx::Error::PoolClosed
        | sqlx::Error::Io(_)
        | sqlx::Error::Tls(_) => CollectionError::connection(error.to_string()),
        sqlx::Error::ColumnDecode { .. } | sqlx::Error::Decode(_) => {
            CollectionError::decode(error.to_string())
        }
        other => CollectionError::query(other.to_string()),
    }
}

async fn unset_defaults<'e, E>(executor: E) -> Result<u64, sqlx::Error>
where
    E: sqlx::PgExecutor<'e>,
{
    let result = sqlx::query(UNSET_DEFAULTS).execute(executor).await?;
    Ok(result.rows_affected())
}

async fn insert_document<'e, E>(executor: E, document: &PlanDocument) -> Result<(), sqlx::Error>
where
    E: sqlx::PgExecutor<'e>,
{
    sqlx::query(INSERT_PLAN)
        .bind(&document.name)
        .bind(Json(document))
        .execute(executor)
        .await
        .map(|_| ())
}

#[async_trait]
impl PlanCollection for SqlxPlanCollection {
    fn name(&self) -> &'static str {
        PLANS_COLLECTION
    }

    async fn insert_one(&self, document: &PlanDocument) -> Result<(), CollectionError> {
        insert_document(&self.pool, document)
            .await
            .map_err(|err| map_sqlx_error(err, &document.name))
    }

    async fn find(&self, filter: PlanFilter) -> Result<Vec<PlanDocument>, CollectionError> {
        let sql = match filter {
            PlanFilter::All => SELECT_ALL,
            PlanFilter::Default => SELECT_DEFAULTS,
        };

        let rows = sqlx::query_scalar::<_, Json<PlanDocument>>(sql)
            .fetch_all(&self.pool)
            .await
            .map_err(|err| map_sqlx_error(err, ""))?;

        Ok(rows.into_iter().map(|Json(document)| document).collect())
    }

    async fn find_by_id(&self, id: &str) -> Result<PlanDocument, CollectionError> {
        let Json(document) = sqlx::query_scalar::<_, Json<PlanDocument>>(SELECT_BY_ID)
            .bind(id)
            .fetch_one(&self.pool)
            .await
            .map_err(|err| map_sqlx_error(err, id))?;
        Ok(document)
    }

    async fn unset_default_all(&self) -> Result<u64, CollectionError> {
        unset_defaults(&self.pool)
            .await
            .map_err(|err| map_sqlx_error(err, ""))
    }

    async fn replace_default(&self, document: &PlanDocument) -> Result<u64, CollectionError> {
        let run = async {
            let mut tx = self.pool.begin().await?;
            let cleared = unset_defaults(&mut *tx).await?;
            insert_document(&mut *tx, document).await?;
            tx.commit().await?;
            Ok::<_, sqlx::Error>(cleared)
        };

        run.await.map_err(|err| map_sqlx_error(err, &document.name))
    }

    async fn delete_by_id(&self, id: &str) -> Result<(), CollectionError> {
        let result = sqlx::query(DELETE_BY_ID)
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|err| map_sqlx_error(err, id))?;

        if result.rows_affected() == 0 {
            return Err(CollectionError::no_documents());
        }
        Ok(())
    }
}
