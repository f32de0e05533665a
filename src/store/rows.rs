use std::str::FromStr;

use rust_decimal::Decimal;
use sqlx::{sqlite::SqliteRow, Error as SqlxError, Row};

use crate::model::{Company, Invoice, InvoiceItem, InvoiceListRow};

pub(super) const COMPANY_COLUMNS: &str =
    "id, name, gstin, address_line1, address_line2, city, state, created_at";

pub(super) const INVOICE_COLUMNS: &str = "i.id, i.invoice_number, i.date, i.company_id, \
     i.total_amount, i.cgst_amount, i.sgst_amount, i.igst_amount, i.tax_rate, i.is_paid, \
     i.created_at";

pub(super) const ITEM_COLUMNS: &str = "id, invoice_id, position, description, hsn_code, \
     quantity, rate, amount, tax_rate, cgst_amount, sgst_amount, igst_amount, created_at";

/// Amounts are stored as canonical decimal text so they round-trip exactly.
pub(super) fn decimal_text(value: Decimal) -> String {
    value.to_string()
}

pub(super) fn optional_decimal_text(value: Option<Decimal>) -> Option<String> {
    value.map(decimal_text)
}

fn parse_decimal(column: &str, raw: &str) -> Result<Decimal, SqlxError> {
    Decimal::from_str(raw.trim()).map_err(|err| SqlxError::ColumnDecode {
        index: column.to_string(),
        source: Box::new(err),
    })
}

fn decimal(row: &SqliteRow, column: &str) -> Result<Decimal, SqlxError> {
    let raw: String = row.try_get(column)?;
    parse_decimal(column, &raw)
}

fn optional_decimal(row: &SqliteRow, column: &str) -> Result<Option<Decimal>, SqlxError> {
    let raw: Option<String> = row.try_get(column)?;
    raw.map(|value| parse_decimal(column, &value)).transpose()
}

pub(super) fn company_from_row(row: &SqliteRow) -> Result<Company, SqlxError> {
    Ok(Company {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        gstin: row.try_get("gstin")?,
        address_line1: row.try_get("address_line1")?,
        address_line2: row.try_get("address_line2")?,
        city: row.try_get("city")?,
        state: row.try_get("state")?,
        created_at: row.try_get("created_at")?,
    })
}

pub(super) fn invoice_from_row(row: &SqliteRow) -> Result<Invoice, SqlxError> {
    Ok(Invoice {
        id: row.try_get("id")?,
        invoice_number: row.try_get("invoice_number")?,
        date: row.try_get("date")?,
        company_id: row.try_get("company_id")?,
        total_amount: decimal(row, "total_amount")?,
        cgst_amount: optional_decimal(row, "cgst_amount")?,
        sgst_amount: optional_decimal(row, "sgst_amount")?,
        igst_amount: optional_decimal(row, "igst_amount")?,
        tax_rate: optional_decimal(row, "tax_rate")?,
        is_paid: row.try_get("is_paid")?,
        created_at: row.try_get("created_at")?,
    })
}

pub(super) fn list_row_from_row(row: &SqliteRow) -> Result<InvoiceListRow, SqlxError> {
    Ok(InvoiceListRow {
        invoice: invoice_from_row(row)?,
        company_name: row.try_get("company_name")?,
        gstin: row.try_get("company_gstin")?,
    })
}

pub(super) fn item_from_row(row: &SqliteRow) -> Result<InvoiceItem, SqlxError> {
    Ok(InvoiceItem {
        id: row.try_get("id")?,
        invoice_id: row.try_get("invoice_id")?,
        position: row.try_get("position")?,
        description: row.try_get("description")?,
        hsn_code: row.try_get("hsn_code")?,
        quantity: row.try_get("quantity")?,
        rate: decimal(row, "rate")?,
        amount: decimal(row, "amount")?,
        tax_rate: optional_decimal(row, "tax_rate")?,
        cgst_amount: optional_decimal(row, "cgst_amount")?,
        sgst_amount: optional_decimal(row, "sgst_amount")?,
        igst_amount: optional_decimal(row, "igst_amount")?,
        created_at: row.try_get("created_at")?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn decimal_text_keeps_scale() {
        assert_eq!(decimal_text(dec!(118.00)), "118.00");
        assert_eq!(parse_decimal("amount", "118.00").unwrap(), dec!(118));
        assert_eq!(optional_decimal_text(None), None);
    }

    #[test]
    fn garbage_amount_is_a_decode_error() {
        let err = parse_decimal("rate", "fifty").expect_err("not a number");
        match err {
            SqlxError::ColumnDecode { index, .. } => assert_eq!(index, "rate"),
            other => panic!("unexpected error {other:?}"),
        }
    }
}
