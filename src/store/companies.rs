use futures::FutureExt;

use super::rows::{company_from_row, COMPANY_COLUMNS};
use super::LedgerStore;
use crate::error::{LedgerError, LedgerResult};
use crate::model::{require_id, Company, NewCompany, CONFLICT_COMPANY_HAS_INVOICES};

fn blank_to_none(value: Option<String>) -> Option<String> {
    value.filter(|line| !line.trim().is_empty())
}

impl LedgerStore {
    /// Insert a company and return its assigned id. Names and GSTINs are not
    /// required to be unique.
    pub async fn create_company(&self, company: NewCompany) -> LedgerResult<i64> {
        company.validate()?;
        let id = self
            .write("create_company", move |conn| {
                async move {
                    let res = sqlx::query(
                        "INSERT INTO companies (name, gstin, address_line1, address_line2, city, state) \
                         VALUES (?, ?, ?, ?, ?, ?)",
                    )
                    .bind(&company.name)
                    .bind(&company.gstin)
                    .bind(&company.address_line1)
                    .bind(blank_to_none(company.address_line2))
                    .bind(&company.city)
                    .bind(&company.state)
                    .execute(&mut *conn)
                    .await?;
                    Ok::<_, LedgerError>(res.last_insert_rowid())
                }
                .boxed()
            })
            .await?;
        tracing::info!(target: "invoicing", event = "company_created", company_id = id);
        Ok(id)
    }

    pub async fn edit_company(&self, id: i64, company: NewCompany) -> LedgerResult<Company> {
        require_id("company_id", id)?;
        company.validate()?;
        let updated = self
            .write("edit_company", move |conn| {
                async move {
                    let res = sqlx::query(
                        "UPDATE companies SET name = ?, gstin = ?, address_line1 = ?, \
                         address_line2 = ?, city = ?, state = ? WHERE id = ?",
                    )
                    .bind(&company.name)
                    .bind(&company.gstin)
                    .bind(&company.address_line1)
                    .bind(blank_to_none(company.address_line2))
                    .bind(&company.city)
                    .bind(&company.state)
                    .bind(id)
                    .execute(&mut *conn)
                    .await?;
                    if res.rows_affected() == 0 {
                        return Err(LedgerError::company_not_found(id));
                    }

                    let sql = format!("SELECT {COMPANY_COLUMNS} FROM companies WHERE id = ?");
                    let row = sqlx::query(&sql).bind(id).fetch_one(&mut *conn).await?;
                    Ok::<_, LedgerError>(company_from_row(&row)?)
                }
                .boxed()
            })
            .await?;
        tracing::info!(target: "invoicing", event = "company_updated", company_id = id);
        Ok(updated)
    }

    pub async fn get_companies(&self) -> LedgerResult<Vec<Company>> {
        let sql = format!("SELECT {COMPANY_COLUMNS} FROM companies ORDER BY name, id");
        let rows = sqlx::query(&sql).fetch_all(&self.pool).await?;
        let companies = rows
            .iter()
            .map(company_from_row)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(companies)
    }

    /// Delete a company that no invoice references.
    ///
    /// The invoice check and the delete share one transaction under the write
    /// gate, so no invoice can be created for the company in between. Returns
    /// whether a row was removed.
    pub async fn delete_company(&self, id: i64) -> LedgerResult<bool> {
        require_id("company_id", id)?;
        let removed = self
            .write("delete_company", move |conn| {
                async move {
                    let has_invoices: i64 = sqlx::query_scalar(
                        "SELECT EXISTS(SELECT 1 FROM invoices WHERE company_id = ?)",
                    )
                    .bind(id)
                    .fetch_one(&mut *conn)
                    .await?;
                    if has_invoices != 0 {
                        return Err(LedgerError::Conflict(
                            CONFLICT_COMPANY_HAS_INVOICES.to_string(),
                        ));
                    }

                    let res = sqlx::query("DELETE FROM companies WHERE id = ?")
                        .bind(id)
                        .execute(&mut *conn)
                        .await?;
                    Ok::<_, LedgerError>(res.rows_affected() > 0)
                }
                .boxed()
            })
            .await
            .map_err(|err| {
                if matches!(err, LedgerError::Conflict(_)) {
                    tracing::warn!(
                        target: "invoicing",
                        event = "company_delete_blocked",
                        company_id = id
                    );
                }
                err
            })?;
        tracing::info!(target: "invoicing", event = "company_deleted", company_id = id, removed);
        Ok(removed)
    }
}
