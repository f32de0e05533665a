use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::{LedgerError, LedgerResult};

pub const INVOICE_DATE_FORMAT: &str = "%Y-%m-%d";

pub const CONFLICT_COMPANY_HAS_INVOICES: &str = "Cannot delete company with existing invoices";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Company {
    #[ts(type = "number")]
    pub id: i64,
    pub name: String,
    pub gstin: String,
    pub address_line1: String,
    pub address_line2: Option<String>,
    pub city: String,
    pub state: String,
    pub created_at: String,
}

/// Company attributes supplied by the caller for create and edit.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct NewCompany {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub gstin: String,
    #[serde(default, alias = "addressLine1")]
    pub address_line1: String,
    #[serde(default, alias = "addressLine2")]
    pub address_line2: Option<String>,
    #[serde(default)]
    pub city: String,
    #[serde(default)]
    pub state: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Invoice {
    #[ts(type = "number")]
    pub id: i64,
    pub invoice_number: String,
    pub date: String,
    #[ts(type = "number")]
    pub company_id: i64,
    #[ts(type = "number")]
    pub total_amount: Decimal,
    #[ts(type = "number | null")]
    pub cgst_amount: Option<Decimal>,
    #[ts(type = "number | null")]
    pub sgst_amount: Option<Decimal>,
    #[ts(type = "number | null")]
    pub igst_amount: Option<Decimal>,
    #[ts(type = "number | null")]
    pub tax_rate: Option<Decimal>,
    pub is_paid: bool,
    pub created_at: String,
}

/// An invoice as shown in listings, with its company's name and GSTIN.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct InvoiceListRow {
    #[serde(flatten)]
    pub invoice: Invoice,
    pub company_name: String,
    pub gstin: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct InvoiceItem {
    #[ts(type = "number")]
    pub id: i64,
    #[ts(type = "number")]
    pub invoice_id: i64,
    #[ts(type = "number")]
    pub position: i64,
    pub description: String,
    pub hsn_code: Option<String>,
    #[ts(type = "number")]
    pub quantity: i64,
    #[ts(type = "number")]
    pub rate: Decimal,
    #[ts(type = "number")]
    pub amount: Decimal,
    #[ts(type = "number | null")]
    pub tax_rate: Option<Decimal>,
    #[ts(type = "number | null")]
    pub cgst_amount: Option<Decimal>,
    #[ts(type = "number | null")]
    pub sgst_amount: Option<Decimal>,
    #[ts(type = "number | null")]
    pub igst_amount: Option<Decimal>,
    pub created_at: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct NewInvoiceItem {
    #[serde(default)]
    pub description: String,
    #[serde(default, alias = "hsnCode")]
    pub hsn_code: Option<String>,
    #[ts(type = "number")]
    pub quantity: i64,
    #[ts(type = "number")]
    pub rate: Decimal,
    #[ts(type = "number")]
    pub amount: Decimal,
    #[serde(default, alias = "taxRate")]
    #[ts(type = "number | null")]
    pub tax_rate: Option<Decimal>,
    #[serde(default, alias = "cgstAmount")]
    #[ts(type = "number | null")]
    pub cgst_amount: Option<Decimal>,
    #[serde(default, alias = "sgstAmount")]
    #[ts(type = "number | null")]
    pub sgst_amount: Option<Decimal>,
    #[serde(default, alias = "igstAmount")]
    #[ts(type = "number | null")]
    pub igst_amount: Option<Decimal>,
}

/// An invoice and its ordered line items, created in one transaction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct NewInvoice {
    #[serde(default, alias = "invoiceNumber")]
    pub invoice_number: String,
    #[serde(default)]
    pub date: String,
    #[serde(alias = "companyId")]
    #[ts(type = "number")]
    pub company_id: i64,
    #[serde(alias = "totalAmount")]
    #[ts(type = "number")]
    pub total_amount: Decimal,
    #[serde(default, alias = "cgstAmount")]
    #[ts(type = "number | null")]
    pub cgst_amount: Option<Decimal>,
    #[serde(default, alias = "sgstAmount")]
    #[ts(type = "number | null")]
    pub sgst_amount: Option<Decimal>,
    #[serde(default, alias = "igstAmount")]
    #[ts(type = "number | null")]
    pub igst_amount: Option<Decimal>,
    #[serde(default, alias = "taxRate")]
    #[ts(type = "number | null")]
    pub tax_rate: Option<Decimal>,
    #[serde(default, alias = "isPaid")]
    pub is_paid: bool,
    #[serde(default)]
    pub items: Vec<NewInvoiceItem>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct InvoiceDetails {
    pub invoice: Invoice,
    pub company: Company,
    pub items: Vec<InvoiceItem>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct LedgerStats {
    #[ts(type = "number")]
    pub companies: i64,
    #[ts(type = "number")]
    pub invoices: i64,
    #[ts(type = "number")]
    pub invoice_items: i64,
    #[ts(type = "number")]
    pub unpaid_invoices: i64,
}

fn require_text(field: &str, value: &str) -> LedgerResult<()> {
    if value.trim().is_empty() {
        return Err(LedgerError::validation(field, "is required"));
    }
    Ok(())
}

fn require_non_negative(field: &str, value: Decimal) -> LedgerResult<()> {
    if value.is_sign_negative() && !value.is_zero() {
        return Err(LedgerError::validation(field, "must not be negative"));
    }
    Ok(())
}

fn optional_non_negative(field: &str, value: Option<Decimal>) -> LedgerResult<()> {
    match value {
        Some(value) => require_non_negative(field, value),
        None => Ok(()),
    }
}

pub fn require_id(field: &str, id: i64) -> LedgerResult<()> {
    if id <= 0 {
        return Err(LedgerError::validation(field, "must be a positive id"));
    }
    Ok(())
}

fn validate_date(value: &str) -> LedgerResult<()> {
    require_text("date", value)?;
    let parsed = NaiveDate::parse_from_str(value, INVOICE_DATE_FORMAT)
        .map_err(|_| LedgerError::validation("date", "must be a YYYY-MM-DD date"))?;
    // Dates are sorted as text, so only the zero-padded form is accepted.
    if parsed.format(INVOICE_DATE_FORMAT).to_string() != value {
        return Err(LedgerError::validation("date", "must be a YYYY-MM-DD date"));
    }
    Ok(())
}

impl NewCompany {
    pub fn validate(&self) -> LedgerResult<()> {
        require_text("name", &self.name)?;
        require_text("gstin", &self.gstin)?;
        require_text("address_line1", &self.address_line1)?;
        require_text("city", &self.city)?;
        require_text("state", &self.state)?;
        Ok(())
    }
}

impl NewInvoiceItem {
    pub fn validate(&self, index: usize) -> LedgerResult<()> {
        let field = |name: &str| format!("items[{index}].{name}");
        if self.description.trim().is_empty() {
            return Err(LedgerError::validation(field("description"), "is required"));
        }
        if self.quantity < 1 {
            return Err(LedgerError::validation(
                field("quantity"),
                "must be at least 1",
            ));
        }
        require_non_negative(&field("rate"), self.rate)?;
        require_non_negative(&field("amount"), self.amount)?;
        optional_non_negative(&field("tax_rate"), self.tax_rate)?;
        optional_non_negative(&field("cgst_amount"), self.cgst_amount)?;
        optional_non_negative(&field("sgst_amount"), self.sgst_amount)?;
        optional_non_negative(&field("igst_amount"), self.igst_amount)?;
        Ok(())
    }
}

impl NewInvoice {
    pub fn validate(&self) -> LedgerResult<()> {
        require_text("invoice_number", &self.invoice_number)?;
        validate_date(&self.date)?;
        require_id("company_id", self.company_id)?;
        require_non_negative("total_amount", self.total_amount)?;
        optional_non_negative("cgst_amount", self.cgst_amount)?;
        optional_non_negative("sgst_amount", self.sgst_amount)?;
        optional_non_negative("igst_amount", self.igst_amount)?;
        optional_non_negative("tax_rate", self.tax_rate)?;
        for (index, item) in self.items.iter().enumerate() {
            item.validate(index)?;
        }
        Ok(())
    }

    /// Sum of the item amounts, or `None` if it does not fit in a `Decimal`.
    /// The store does not require this to match `total_amount`, since the
    /// caller decides how tax is folded in.
    pub fn items_subtotal(&self) -> Option<Decimal> {
        checked_sum(self.items.iter().map(|item| item.amount))
    }

    /// Sum of the invoice-level tax components that are present.
    pub fn tax_total(&self) -> Option<Decimal> {
        checked_sum(
            [self.cgst_amount, self.sgst_amount, self.igst_amount]
                .into_iter()
                .flatten(),
        )
    }

    /// Item subtotal plus tax, the figure `total_amount` is compared against.
    pub fn computed_total(&self) -> Option<Decimal> {
        self.items_subtotal()?.checked_add(self.tax_total()?)
    }
}

fn checked_sum(values: impl IntoIterator<Item = Decimal>) -> Option<Decimal> {
    values
        .into_iter()
        .try_fold(Decimal::ZERO, |acc, value| acc.checked_add(value))
}
