//! The ledger store: one SQLite database holding companies, invoices and
//! their line items.
//!
//! Mutations are serialized through a single async write gate and each one
//! runs inside [`db::run_in_tx`], so a multi-statement operation is either
//! fully committed or fully rolled back. Readers go straight to the pool; WAL
//! mode keeps them off the writer's back.

use std::path::Path;

use futures::future::BoxFuture;
use sqlx::{SqliteConnection, SqlitePool};
use tokio::sync::Mutex;

use crate::db::{self, schema};
use crate::error::LedgerResult;
use crate::model::LedgerStats;

mod companies;
mod invoices;
mod rows;

pub struct LedgerStore {
    pool: SqlitePool,
    writer: Mutex<()>,
}

impl LedgerStore {
    /// Open (creating if needed) the database file and ensure the schema.
    pub async fn open(db_path: &Path) -> LedgerResult<Self> {
        let pool = db::open_sqlite_pool(db_path).await.map_err(|err| {
            tracing::error!(
                target: "invoicing",
                event = "db_open_failed",
                path = %db_path.display(),
                error = %err
            );
            err
        })?;
        Self::from_pool(pool).await
    }

    /// Wrap an already configured pool. Foreign keys must be enabled on it.
    pub async fn from_pool(pool: SqlitePool) -> LedgerResult<Self> {
        schema::ensure_schema(&pool).await?;
        Ok(Self {
            pool,
            writer: Mutex::new(()),
        })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }

    /// Run a mutating unit of work while holding the write gate.
    async fn write<R, F>(&self, op: &'static str, f: F) -> LedgerResult<R>
    where
        F: for<'c> FnOnce(&'c mut SqliteConnection) -> BoxFuture<'c, LedgerResult<R>>,
    {
        let _gate = self.writer.lock().await;
        tracing::debug!(target: "invoicing", event = "write_begin", op);
        db::run_in_tx(&self.pool, f).await
    }

    pub async fn stats(&self) -> LedgerResult<LedgerStats> {
        let (companies, invoices, invoice_items, unpaid_invoices): (i64, i64, i64, i64) =
            sqlx::query_as(
                "SELECT \
                   (SELECT COUNT(*) FROM companies), \
                   (SELECT COUNT(*) FROM invoices), \
                   (SELECT COUNT(*) FROM invoice_items), \
                   (SELECT COUNT(*) FROM invoices WHERE is_paid = 0)",
            )
            .fetch_one(&self.pool)
            .await?;
        Ok(LedgerStats {
            companies,
            invoices,
            invoice_items,
            unpaid_invoices,
        })
    }
}
