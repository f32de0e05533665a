use std::path::PathBuf;
use std::process;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde_json::json;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::sync::mpsc;
use tokio::task::JoinSet;

use invoicing_lib::config::LedgerConfig;
use invoicing_lib::ipc::{decode_frame, dispatch, Envelope};
use invoicing_lib::{db, logging, AppError, LedgerStore};

#[derive(Debug, Parser)]
#[command(name = "invoicing", about = "Local invoicing ledger", version)]
struct Cli {
    /// Directory holding the database and logs.
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Answer line-delimited JSON requests on stdin (the default).
    Serve,
    /// Run a single request and print its envelope.
    Call {
        /// The request, e.g. '{"op":"getCompanies"}'.
        request: String,
    },
    /// Database inspection commands.
    #[command(subcommand)]
    Db(DbCommand),
}

#[derive(Debug, Subcommand)]
enum DbCommand {
    /// Report row counts and the effective SQLite settings.
    Status {
        /// Emit JSON instead of the table view.
        #[arg(long)]
        json: bool,
    },
}

fn main() {
    let cli = Cli::parse();
    let code = match run(cli) {
        Ok(code) => code,
        Err(err) => {
            eprintln!("Error: {err:#}");
            1
        }
    };
    logging::flush_file_logging();
    process::exit(code);
}

fn run(cli: Cli) -> Result<i32> {
    let command = cli.command.unwrap_or(Commands::Serve);
    let config = LedgerConfig::resolve(cli.data_dir)?;
    config.ensure_dirs()?;
    logging::init_logging(Some(&config.log_dir)).context("initialize logging")?;
    tracing::debug!(
        target: "invoicing",
        event = "app_booted",
        data_dir = %config.data_dir.display()
    );

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("start async runtime")?;

    runtime.block_on(async move {
        let store = Arc::new(
            LedgerStore::open(&config.db_path)
                .await
                .with_context(|| format!("open ledger database {}", config.db_path.display()))?,
        );
        let code = match command {
            Commands::Serve => serve(Arc::clone(&store)).await.map(|_| 0),
            Commands::Call { request } => Ok(call(&store, &request).await),
            Commands::Db(DbCommand::Status { json }) => db_status(&store, &config, json).await,
        };
        store.close().await;
        code
    })
}

fn encode(envelope: &Envelope) -> String {
    serde_json::to_string(envelope).unwrap_or_else(|err| {
        json!({ "ok": false, "error": AppError::from(err) }).to_string()
    })
}

async fn call(store: &LedgerStore, line: &str) -> i32 {
    let (id, request) = decode_frame(line);
    let result = match request {
        Ok(request) => dispatch(store, request).await,
        Err(err) => Err(err),
    };
    let envelope = Envelope::from_result(id, result);
    println!("{}", encode(&envelope));
    if envelope.ok {
        0
    } else {
        1
    }
}

async fn serve(store: Arc<LedgerStore>) -> Result<()> {
    let (replies, mut outbox) = mpsc::unbounded_channel::<String>();
    let writer = tokio::spawn(async move {
        let mut stdout = tokio::io::stdout();
        while let Some(line) = outbox.recv().await {
            stdout.write_all(line.as_bytes()).await?;
            stdout.write_all(b"\n").await?;
            stdout.flush().await?;
        }
        Ok::<_, std::io::Error>(())
    });

    tracing::info!(target: "invoicing", event = "serve_started");
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut in_flight = JoinSet::new();
    while let Some(line) = lines.next_line().await.context("read request line")? {
        if line.trim().is_empty() {
            continue;
        }
        let (id, request) = decode_frame(&line);
        match request {
            Ok(request) => {
                let store = Arc::clone(&store);
                let replies = replies.clone();
                in_flight.spawn(async move {
                    let result = dispatch(&store, request).await;
                    let _ = replies.send(encode(&Envelope::from_result(id, result)));
                });
            }
            Err(err) => {
                tracing::warn!(
                    target: "invoicing",
                    event = "ipc_decode_failed",
                    code = err.code(),
                    message = err.message()
                );
                let _ = replies.send(encode(&Envelope::from_result(id, Err(err))));
            }
        }
        while in_flight.try_join_next().is_some() {}
    }

    while in_flight.join_next().await.is_some() {}
    drop(replies);
    writer
        .await
        .context("join stdout writer")?
        .context("write reply")?;
    tracing::info!(target: "invoicing", event = "serve_stopped");
    Ok(())
}

async fn db_status(store: &LedgerStore, config: &LedgerConfig, emit_json: bool) -> Result<i32> {
    let stats = store.stats().await.context("count ledger rows")?;
    let pragmas = db::read_pragmas(store.pool()).await;
    let tables = db::schema::existing_tables(store.pool())
        .await
        .context("list tables")?;

    if emit_json {
        let payload = json!({
            "db_path": config.db_path.display().to_string(),
            "tables": tables,
            "stats": stats,
            "pragmas": pragmas,
        });
        let serialized =
            serde_json::to_string_pretty(&payload).context("serialize status payload")?;
        println!("{serialized}");
    } else {
        println!("Database: {}", config.db_path.display());
        println!("Tables: {}", tables.join(", "));
        println!("{:<18} {:>8}", "companies", stats.companies);
        println!("{:<18} {:>8}", "invoices", stats.invoices);
        println!("{:<18} {:>8}", "unpaid invoices", stats.unpaid_invoices);
        println!("{:<18} {:>8}", "invoice items", stats.invoice_items);
        println!(
            "SQLite {} journal_mode={} synchronous={} foreign_keys={} busy_timeout={}ms",
            pragmas.sqlite_version,
            pragmas.journal_mode,
            pragmas.synchronous,
            pragmas.foreign_keys,
            pragmas.busy_timeout_ms
        );
    }
    Ok(0)
}
