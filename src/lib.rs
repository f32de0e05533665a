//! Local invoicing ledger: companies, GST invoices and their line items kept
//! in one SQLite file, behind a typed request boundary.

pub mod config;
pub mod db;
pub mod error;
pub mod ipc;
pub mod logging;
pub mod model;
pub mod store;
pub mod util;

pub use error::{AppError, AppResult, ErrorKind, LedgerError, LedgerResult};
pub use model::{
    Company, Invoice, InvoiceDetails, InvoiceItem, InvoiceListRow, LedgerStats, NewCompany,
    NewInvoice, NewInvoiceItem,
};
pub use store::LedgerStore;
