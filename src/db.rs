use std::path::Path;
use std::time::Duration;

use futures::future::BoxFuture;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::{ConnectOptions, SqliteConnection, SqlitePool};

pub mod schema;

const MAX_CONNECTIONS: u32 = 4;

pub async fn open_sqlite_pool(db_path: &Path) -> Result<SqlitePool, sqlx::Error> {
    tracing::info!(target: "invoicing", event = "db_path", path = %db_path.display());

    let opts = SqliteConnectOptions::new()
        .filename(db_path)
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal)
        .synchronous(SqliteSynchronous::Full)
        .foreign_keys(true)
        .busy_timeout(Duration::from_secs(5))
        .log_statements(log::LevelFilter::Off);

    let pool = SqlitePoolOptions::new()
        .max_connections(MAX_CONNECTIONS)
        .after_connect(|conn, _| {
            Box::pin(async move {
                sqlx::query("PRAGMA wal_autocheckpoint = 1000;")
                    .execute(&mut *conn)
                    .await?;
                Ok(())
            })
        })
        .connect_with(opts)
        .await?;

    log_effective_pragmas(&pool).await;

    Ok(pool)
}

/// Effective connection settings, as reported by SQLite itself.
#[derive(Debug, Clone, serde::Serialize)]
pub struct Pragmas {
    pub sqlite_version: String,
    pub journal_mode: String,
    pub synchronous: i64,
    pub foreign_keys: i64,
    pub busy_timeout_ms: i64,
}

pub async fn read_pragmas(pool: &SqlitePool) -> Pragmas {
    let (sqlite_version,): (String,) = sqlx::query_as("select sqlite_version()")
        .fetch_one(pool)
        .await
        .unwrap_or((String::from("unknown"),));

    let (journal_mode,): (String,) = sqlx::query_as("PRAGMA journal_mode;")
        .fetch_one(pool)
        .await
        .unwrap_or((String::from("unknown"),));

    let (synchronous,): (i64,) = sqlx::query_as("PRAGMA synchronous;")
        .fetch_one(pool)
        .await
        .unwrap_or((i64::MIN,));

    let (foreign_keys,): (i64,) = sqlx::query_as("PRAGMA foreign_keys;")
        .fetch_one(pool)
        .await
        .unwrap_or((i64::MIN,));

    let (busy_timeout_ms,): (i64,) = sqlx::query_as("PRAGMA busy_timeout;")
        .fetch_one(pool)
        .await
        .unwrap_or((i64::MIN,));

    Pragmas {
        sqlite_version,
        journal_mode,
        synchronous,
        foreign_keys,
        busy_timeout_ms,
    }
}

async fn log_effective_pragmas(pool: &SqlitePool) {
    use tracing::{info, warn};

    let pragmas = read_pragmas(pool).await;

    info!(
        target: "invoicing",
        event = "db_open",
        sqlite_version = %pragmas.sqlite_version,
        journal_mode = %pragmas.journal_mode,
        synchronous = %pragmas.synchronous,
        foreign_keys = %pragmas.foreign_keys,
        busy_timeout_ms = %pragmas.busy_timeout_ms
    );

    if !pragmas.journal_mode.eq_ignore_ascii_case("wal") {
        warn!(
            target: "invoicing",
            event = "db_open_warning",
            msg = "journal_mode != WAL; running with reduced crash safety"
        );
    }
    if pragmas.foreign_keys != 1 {
        warn!(
            target: "invoicing",
            event = "db_open_warning",
            msg = "foreign_keys disabled; referential checks rely on explicit guards"
        );
    }
}

/// Run work inside a transaction. Commits on success, rolls back on error.
///
/// The unit of work receives the transaction's connection. If the future is
/// dropped or panics before completing, the transaction is dropped unfinished
/// and sqlx rolls it back.
pub async fn run_in_tx<R, E, F>(pool: &SqlitePool, f: F) -> Result<R, E>
where
    E: From<sqlx::Error>,
    F: for<'c> FnOnce(&'c mut SqliteConnection) -> BoxFuture<'c, Result<R, E>>,
{
    use tracing::{debug, error, warn};

    let mut tx = pool.begin().await.map_err(E::from)?;
    debug!(target: "invoicing", event = "db_tx_begin");
    match f(&mut *tx).await {
        Ok(val) => {
            tx.commit().await.map_err(E::from)?;
            debug!(target: "invoicing", event = "db_tx_commit");
            Ok(val)
        }
        Err(e) => {
            if let Err(rb) = tx.rollback().await {
                error!(target: "invoicing", event = "db_tx_rollback_failed", error = %rb);
            } else {
                warn!(target: "invoicing", event = "db_tx_rollback");
            }
            Err(e)
        }
    }
}
