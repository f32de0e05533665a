use std::ffi::OsString;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

pub const APP_IDENTIFIER: &str = "com.invoicing.ledger";
pub const DB_FILE_NAME: &str = "invoices.db";
pub const DATA_DIR_ENV: &str = "INVOICING_DATA_DIR";

/// Where the ledger keeps its database and logs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerConfig {
    pub data_dir: PathBuf,
    pub db_path: PathBuf,
    pub log_dir: PathBuf,
}

impl LedgerConfig {
    pub fn in_dir(data_dir: impl Into<PathBuf>) -> Self {
        let data_dir = data_dir.into();
        Self {
            db_path: data_dir.join(DB_FILE_NAME),
            log_dir: data_dir.join("logs"),
            data_dir,
        }
    }

    /// Resolve from an explicit directory, then `INVOICING_DATA_DIR`, then
    /// the per-user data directory.
    pub fn resolve(explicit: Option<PathBuf>) -> Result<Self> {
        Self::from_sources(explicit, std::env::var_os(DATA_DIR_ENV))
    }

    fn from_sources(explicit: Option<PathBuf>, env: Option<OsString>) -> Result<Self> {
        if let Some(dir) = explicit {
            return Ok(Self::in_dir(dir));
        }
        if let Some(dir) = env.filter(|value| !value.is_empty()) {
            return Ok(Self::in_dir(PathBuf::from(dir)));
        }
        let base = match dirs::data_dir() {
            Some(dir) => dir,
            None => std::env::current_dir().context("resolve current directory")?,
        };
        Ok(Self::in_dir(base.join(APP_IDENTIFIER)))
    }

    pub fn ensure_dirs(&self) -> Result<()> {
        create_dir(&self.data_dir)?;
        create_dir(&self.log_dir)
    }
}

fn create_dir(dir: &Path) -> Result<()> {
    std::fs::create_dir_all(dir).with_context(|| format!("create directory {}", dir.display()))
}
