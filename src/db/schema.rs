use futures::FutureExt;
use sqlx::SqlitePool;

use crate::db::run_in_tx;

const SCHEMA_SQL: &str = include_str!("schema.sql");

pub const LEDGER_TABLES: &[&str] = &["companies", "invoices", "invoice_items"];

/// Create the ledger tables and indexes if they are missing.
///
/// Every statement is `IF NOT EXISTS`, so this runs on each open and leaves an
/// existing database untouched.
pub async fn ensure_schema(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    run_in_tx(pool, |conn| {
        async move {
            sqlx::Executor::execute(&mut *conn, sqlx::raw_sql(SCHEMA_SQL)).await?;
            Ok::<_, sqlx::Error>(())
        }
        .boxed()
    })
    .await?;
    tracing::info!(target: "invoicing", event = "schema_ready", tables = LEDGER_TABLES.len());
    Ok(())
}

pub async fn existing_tables(pool: &SqlitePool) -> Result<Vec<String>, sqlx::Error> {
    sqlx::query_scalar(
        "SELECT name FROM sqlite_master WHERE type = 'table' AND name IN \
         ('companies', 'invoices', 'invoice_items') ORDER BY name",
    )
    .fetch_all(pool)
    .await
}
