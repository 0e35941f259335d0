//! Index execution database queries.

use crate::db::models::ExecutionRow;
use crate::db::DbPool;

/// Create the schema and table if they do not exist yet.
pub async fn ensure_schema(pool: &DbPool) -> Result<(), sqlx::Error> {
    sqlx::query("CREATE SCHEMA IF NOT EXISTS fpl_indexer")
        .execute(pool)
        .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS fpl_indexer.index_execution (
            execution_id TEXT PRIMARY KEY,
            kind TEXT NOT NULL,
            status TEXT NOT NULL,
            version BIGINT NOT NULL DEFAULT 0,
            document JSONB NOT NULL,
            created_at TIMESTAMPTZ NOT NULL,
            updated_at TIMESTAMPTZ NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE INDEX IF NOT EXISTS index_execution_status_idx
        ON fpl_indexer.index_execution (status)
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Insert a new execution row.
///
/// Returns `false` if the id already exists.
pub async fn insert_execution(pool: &DbPool, row: &ExecutionRow) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        r#"
        INSERT INTO fpl_indexer.index_execution
            (execution_id, kind, status, version, document, created_at, updated_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        ON CONFLICT (execution_id) DO NOTHING
        "#,
    )
    .bind(&row.execution_id)
    .bind(&row.kind)
    .bind(&row.status)
    .bind(row.version)
    .bind(&row.document)
    .bind(row.created_at)
    .bind(row.updated_at)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() == 1)
}

/// Get an execution row by id.
pub async fn get_execution(
    pool: &DbPool,
    execution_id: &str,
) -> Result<Option<ExecutionRow>, sqlx::Error> {
    sqlx::query_as::<_, ExecutionRow>(
        r#"
        SELECT execution_id, kind, status, version, document, created_at, updated_at
        FROM fpl_indexer.index_execution
        WHERE execution_id = $1
        "#,
    )
    .bind(execution_id)
    .fetch_optional(pool)
    .await
}

/// Overwrite an execution row if its stored version is `expected_version`.
///
/// Returns `false` when no row matched, either because the id is unknown
/// or because the version moved on.
pub async fn update_execution_if_version(
    pool: &DbPool,
    row: &ExecutionRow,
    expected_version: i64,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        r#"
        UPDATE fpl_indexer.index_execution
        SET status = $2, version = $3, document = $4, updated_at = $5
        WHERE execution_id = $1 AND version = $6
        "#,
    )
    .bind(&row.execution_id)
    .bind(&row.status)
    .bind(row.version)
    .bind(&row.document)
    .bind(row.updated_at)
    .bind(expected_version)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() == 1)
}

/// Get the stored version of an execution.
pub async fn get_execution_version(
    pool: &DbPool,
    execution_id: &str,
) -> Result<Option<i64>, sqlx::Error> {
    sqlx::query_scalar(
        "SELECT version FROM fpl_indexer.index_execution WHERE execution_id = $1",
    )
    .bind(execution_id)
    .fetch_optional(pool)
    .await
}
