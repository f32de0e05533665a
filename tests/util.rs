#![allow(clippy::unwrap_used, clippy::expect_used, dead_code)]

use invoicing_lib::{LedgerStore, NewCompany, NewInvoice, NewInvoiceItem};
use rust_decimal::Decimal;
use tempfile::TempDir;

/// A store on a fresh database file. Keep the `TempDir` alive for the test.
pub async fn temp_store() -> (TempDir, LedgerStore) {
    let dir = tempfile::tempdir().expect("tempdir");
    let store = LedgerStore::open(&dir.path().join("invoices.db"))
        .await
        .expect("open store");
    (dir, store)
}

pub fn company(name: &str) -> NewCompany {
    NewCompany {
        name: name.into(),
        gstin: "29ABCDE1234F1Z5".into(),
        address_line1: "1 Main St".into(),
        address_line2: None,
        city: "Pune".into(),
        state: "MH".into(),
    }
}

pub fn item(description: &str, quantity: i64, rate: Decimal) -> NewInvoiceItem {
    NewInvoiceItem {
        description: description.into(),
        hsn_code: Some("9983".into()),
        quantity,
        rate,
        amount: rate * Decimal::from(quantity),
        tax_rate: None,
        cgst_amount: None,
        sgst_amount: None,
        igst_amount: None,
    }
}

pub fn invoice(company_id: i64, number: &str, date: &str, items: Vec<NewInvoiceItem>) -> NewInvoice {
    let total_amount = items.iter().map(|item| item.amount).sum();
    NewInvoice {
        invoice_number: number.into(),
        date: date.into(),
        company_id,
        total_amount,
        cgst_amount: None,
        sgst_amount: None,
        igst_amount: None,
        tax_rate: None,
        is_paid: false,
        items,
    }
}

pub async fn count(store: &LedgerStore, table: &str) -> i64 {
    sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {table}"))
        .fetch_one(store.pool())
        .await
        .expect("count rows")
}
