//! The request boundary between the UI process and the ledger store.
//!
//! A request names one operation and carries its typed arguments. Every
//! request goes through [`dispatch`], which logs it, runs it behind the panic
//! fence and turns store errors into [`AppError`]s.

use std::time::Instant;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{
    model::{Company, Invoice, InvoiceDetails, InvoiceListRow, NewCompany, NewInvoice},
    store::LedgerStore,
    util::dispatch_async_app_result,
    AppError, AppResult,
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", content = "args", rename_all = "camelCase")]
pub enum Request {
    CreateCompany(NewCompany),
    GetCompanies,
    EditCompany {
        id: i64,
        company: NewCompany,
    },
    DeleteCompany {
        id: i64,
    },
    CreateInvoice(NewInvoice),
    GetInvoices,
    GetInvoiceDetails {
        id: i64,
    },
    UpdateInvoicePaidStatus {
        id: i64,
        #[serde(alias = "isPaid")]
        is_paid: bool,
    },
    DeleteInvoice {
        id: i64,
    },
}

impl Request {
    pub fn op_name(&self) -> &'static str {
        match self {
            Request::CreateCompany(_) => "createCompany",
            Request::GetCompanies => "getCompanies",
            Request::EditCompany { .. } => "editCompany",
            Request::DeleteCompany { .. } => "deleteCompany",
            Request::CreateInvoice(_) => "createInvoice",
            Request::GetInvoices => "getInvoices",
            Request::GetInvoiceDetails { .. } => "getInvoiceDetails",
            Request::UpdateInvoicePaidStatus { .. } => "updateInvoicePaidStatus",
            Request::DeleteInvoice { .. } => "deleteInvoice",
        }
    }
}

/// The result of one operation, serialized as the bare value.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Response {
    Id(i64),
    Removed(bool),
    Company(Company),
    Companies(Vec<Company>),
    Invoice(Invoice),
    Invoices(Vec<InvoiceListRow>),
    Details(InvoiceDetails),
}

impl Response {
    fn row_count(&self) -> usize {
        match self {
            Response::Companies(rows) => rows.len(),
            Response::Invoices(rows) => rows.len(),
            Response::Details(details) => details.items.len(),
            Response::Removed(false) => 0,
            _ => 1,
        }
    }
}

/// One reply on a transport, correlated with the request by `id` when the
/// caller supplied one.
#[derive(Debug, Clone, Serialize)]
pub struct Envelope {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<Value>,
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Response>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<AppError>,
}

impl Envelope {
    pub fn from_result(id: Option<Value>, result: AppResult<Response>) -> Self {
        match result {
            Ok(response) => Envelope {
                id,
                ok: true,
                result: Some(response),
                error: None,
            },
            Err(error) => Envelope {
                id,
                ok: false,
                result: None,
                error: Some(error),
            },
        }
    }
}

fn request_error(err: serde_json::Error) -> AppError {
    let message = err.to_string();
    if err.is_data() && message.starts_with("missing field") {
        let field = message.split('`').nth(1).unwrap_or_default().to_string();
        return AppError::new(AppError::VALIDATION_CODE, format!("{field} is required"))
            .with_context("field", field);
    }
    AppError::from(err)
}

/// Decode one transport frame: a request object with an optional `id`.
///
/// The id is returned even when the request itself does not decode, so the
/// error reply can still be correlated.
pub fn decode_frame(line: &str) -> (Option<Value>, AppResult<Request>) {
    let mut value: Value = match serde_json::from_str(line) {
        Ok(value) => value,
        Err(err) => return (None, Err(AppError::from(err))),
    };
    let id = value.as_object_mut().and_then(|frame| frame.remove("id"));
    let request = serde_json::from_value(value).map_err(request_error);
    (id, request)
}

fn log_command_start(cmd: &'static str) {
    tracing::debug!(target: "invoicing", area = "ipc", cmd, "ipc_enter");
}

fn log_command_success(cmd: &'static str, start: Instant, row_count: usize) {
    tracing::info!(
        target: "invoicing",
        area = "ipc",
        cmd,
        elapsed_ms = start.elapsed().as_millis() as u64,
        row_count,
        "ipc_success"
    );
}

fn log_command_error(cmd: &'static str, start: Instant, err: &AppError) {
    let elapsed_ms = start.elapsed().as_millis() as u64;
    if err.is_caller_error() {
        tracing::warn!(
            target: "invoicing",
            area = "ipc",
            cmd,
            code = err.code(),
            message = err.message(),
            elapsed_ms,
            "ipc_failure"
        );
    } else {
        tracing::error!(
            target: "invoicing",
            area = "ipc",
            cmd,
            code = err.code(),
            message = err.message(),
            elapsed_ms,
            "ipc_failure"
        );
    }
}

async fn run(store: &LedgerStore, request: Request) -> AppResult<Response> {
    let response = match request {
        Request::CreateCompany(company) => Response::Id(store.create_company(company).await?),
        Request::GetCompanies => Response::Companies(store.get_companies().await?),
        Request::EditCompany { id, company } => {
            Response::Company(store.edit_company(id, company).await?)
        }
        Request::DeleteCompany { id } => Response::Removed(store.delete_company(id).await?),
        Request::CreateInvoice(invoice) => Response::Id(store.create_invoice(invoice).await?),
        Request::GetInvoices => Response::Invoices(store.get_invoices().await?),
        Request::GetInvoiceDetails { id } => {
            Response::Details(store.get_invoice_details(id).await?)
        }
        Request::UpdateInvoicePaidStatus { id, is_paid } => {
            Response::Invoice(store.update_invoice_paid_status(id, is_paid).await?)
        }
        Request::DeleteInvoice { id } => Response::Removed(store.delete_invoice(id).await?),
    };
    Ok(response)
}

/// Forward one request to the store and return its result.
pub async fn dispatch(store: &LedgerStore, request: Request) -> AppResult<Response> {
    let cmd = request.op_name();
    log_command_start(cmd);
    let start = Instant::now();

    let result = dispatch_async_app_result(move || run(store, request)).await;

    match &result {
        Ok(response) => log_command_success(cmd, start, response.row_count()),
        Err(err) => log_command_error(cmd, start, err),
    }
    result
}
