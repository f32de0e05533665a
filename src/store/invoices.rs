use futures::FutureExt;

use super::rows::{
    company_from_row, decimal_text, invoice_from_row, item_from_row, list_row_from_row,
    optional_decimal_text, COMPANY_COLUMNS, INVOICE_COLUMNS, ITEM_COLUMNS,
};
use super::LedgerStore;
use crate::error::{LedgerError, LedgerResult};
use crate::model::{require_id, Invoice, InvoiceDetails, InvoiceListRow, NewInvoice};

fn invoice_by_id_sql() -> String {
    format!("SELECT {INVOICE_COLUMNS} FROM invoices i WHERE i.id = ?")
}

impl LedgerStore {
    /// Create an invoice together with its items, in input order.
    ///
    /// The invoice row and every item row are written in one transaction; if
    /// any insert fails nothing is kept.
    pub async fn create_invoice(&self, invoice: NewInvoice) -> LedgerResult<i64> {
        invoice.validate()?;

        match invoice.computed_total() {
            Some(expected) if !invoice.items.is_empty() && expected != invoice.total_amount => {
                tracing::warn!(
                    target: "invoicing",
                    event = "invoice_total_mismatch",
                    invoice_number = %invoice.invoice_number,
                    total_amount = %invoice.total_amount,
                    computed = %expected
                );
            }
            Some(_) => {}
            None => {
                tracing::warn!(
                    target: "invoicing",
                    event = "invoice_total_unchecked",
                    invoice_number = %invoice.invoice_number,
                    total_amount = %invoice.total_amount
                );
            }
        }

        let item_count = invoice.items.len();
        let company_id = invoice.company_id;
        let id = self
            .write("create_invoice", move |conn| {
                async move {
                    let company: Option<i64> =
                        sqlx::query_scalar("SELECT id FROM companies WHERE id = ?")
                            .bind(invoice.company_id)
                            .fetch_optional(&mut *conn)
                            .await?;
                    if company.is_none() {
                        return Err(LedgerError::company_not_found(invoice.company_id));
                    }

                    let res = sqlx::query(
                        "INSERT INTO invoices (invoice_number, date, company_id, total_amount, \
                         cgst_amount, sgst_amount, igst_amount, tax_rate, is_paid) \
                         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
                    )
                    .bind(&invoice.invoice_number)
                    .bind(&invoice.date)
                    .bind(invoice.company_id)
                    .bind(decimal_text(invoice.total_amount))
                    .bind(optional_decimal_text(invoice.cgst_amount))
                    .bind(optional_decimal_text(invoice.sgst_amount))
                    .bind(optional_decimal_text(invoice.igst_amount))
                    .bind(optional_decimal_text(invoice.tax_rate))
                    .bind(invoice.is_paid)
                    .execute(&mut *conn)
                    .await?;
                    let invoice_id = res.last_insert_rowid();

                    for (position, item) in invoice.items.iter().enumerate() {
                        sqlx::query(
                            "INSERT INTO invoice_items (invoice_id, position, description, hsn_code, \
                             quantity, rate, amount, tax_rate, cgst_amount, sgst_amount, igst_amount) \
                             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
                        )
                        .bind(invoice_id)
                        .bind(position as i64)
                        .bind(&item.description)
                        .bind(&item.hsn_code)
                        .bind(item.quantity)
                        .bind(decimal_text(item.rate))
                        .bind(decimal_text(item.amount))
                        .bind(optional_decimal_text(item.tax_rate))
                        .bind(optional_decimal_text(item.cgst_amount))
                        .bind(optional_decimal_text(item.sgst_amount))
                        .bind(optional_decimal_text(item.igst_amount))
                        .execute(&mut *conn)
                        .await?;
                    }

                    Ok::<_, LedgerError>(invoice_id)
                }
                .boxed()
            })
            .await?;
        tracing::info!(
            target: "invoicing",
            event = "invoice_created",
            invoice_id = id,
            company_id,
            item_count
        );
        Ok(id)
    }

    /// All invoices with their company's name and GSTIN, newest date first.
    pub async fn get_invoices(&self) -> LedgerResult<Vec<InvoiceListRow>> {
        let sql = format!(
            "SELECT {INVOICE_COLUMNS}, c.name AS company_name, c.gstin AS company_gstin \
             FROM invoices i JOIN companies c ON i.company_id = c.id \
             ORDER BY i.date DESC, i.id DESC"
        );
        let rows = sqlx::query(&sql).fetch_all(&self.pool).await?;
        let invoices = rows
            .iter()
            .map(list_row_from_row)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(invoices)
    }

    /// The invoice, its company and its items in creation order.
    ///
    /// The three reads share one transaction so they see the same snapshot.
    pub async fn get_invoice_details(&self, id: i64) -> LedgerResult<InvoiceDetails> {
        require_id("invoice_id", id)?;
        let mut tx = self.pool.begin().await?;

        let invoice_row = sqlx::query(&invoice_by_id_sql())
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| LedgerError::invoice_not_found(id))?;
        let invoice = invoice_from_row(&invoice_row)?;

        let company_sql = format!("SELECT {COMPANY_COLUMNS} FROM companies WHERE id = ?");
        let company_row = sqlx::query(&company_sql)
            .bind(invoice.company_id)
            .fetch_one(&mut *tx)
            .await?;
        let company = company_from_row(&company_row)?;

        let items_sql = format!(
            "SELECT {ITEM_COLUMNS} FROM invoice_items WHERE invoice_id = ? ORDER BY position, id"
        );
        let items = sqlx::query(&items_sql)
            .bind(id)
            .fetch_all(&mut *tx)
            .await?
            .iter()
            .map(item_from_row)
            .collect::<Result<Vec<_>, _>>()?;

        tx.commit().await?;
        Ok(InvoiceDetails {
            invoice,
            company,
            items,
        })
    }

    /// Set the paid flag and return the updated invoice. No other column changes.
    pub async fn update_invoice_paid_status(&self, id: i64, is_paid: bool) -> LedgerResult<Invoice> {
        require_id("invoice_id", id)?;
        let updated = self
            .write("update_invoice_paid_status", move |conn| {
                async move {
                    let res = sqlx::query("UPDATE invoices SET is_paid = ? WHERE id = ?")
                        .bind(is_paid)
                        .bind(id)
                        .execute(&mut *conn)
                        .await?;
                    if res.rows_affected() == 0 {
                        return Err(LedgerError::invoice_not_found(id));
                    }
                    let row = sqlx::query(&invoice_by_id_sql())
                        .bind(id)
                        .fetch_one(&mut *conn)
                        .await?;
                    Ok::<_, LedgerError>(invoice_from_row(&row)?)
                }
                .boxed()
            })
            .await?;
        tracing::info!(
            target: "invoicing",
            event = "invoice_paid_status_updated",
            invoice_id = id,
            is_paid
        );
        Ok(updated)
    }

    /// Delete an invoice and all of its items. Items go first so the foreign
    /// key from `invoice_items` is never violated. Returns whether the invoice
    /// row was removed.
    pub async fn delete_invoice(&self, id: i64) -> LedgerResult<bool> {
        require_id("invoice_id", id)?;
        let (items_removed, removed) = self
            .write("delete_invoice", move |conn| {
                async move {
                    let items = sqlx::query("DELETE FROM invoice_items WHERE invoice_id = ?")
                        .bind(id)
                        .execute(&mut *conn)
                        .await?;
                    let invoice = sqlx::query("DELETE FROM invoices WHERE id = ?")
                        .bind(id)
                        .execute(&mut *conn)
                        .await?;
                    Ok::<_, LedgerError>((items.rows_affected(), invoice.rows_affected() > 0))
                }
                .boxed()
            })
            .await?;
        tracing::info!(
            target: "invoicing",
            event = "invoice_deleted",
            invoice_id = id,
            items_removed,
            removed
        );
        Ok(removed)
    }
}
