#![allow(clippy::unwrap_used, clippy::expect_used)]

mod util;

use invoicing_lib::{ErrorKind, LedgerError};
use rust_decimal_macros::dec;
use util::{company, count, invoice, item, temp_store};

#[tokio::test]
async fn created_companies_list_sorted_by_name() {
    let (_dir, store) = temp_store().await;
    let zeta = store.create_company(company("Zeta Traders")).await.unwrap();
    let acme = store.create_company(company("Acme")).await.unwrap();
    assert!(zeta > 0 && acme > zeta);

    let companies = store.get_companies().await.unwrap();
    let names: Vec<_> = companies.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(names, ["Acme", "Zeta Traders"]);
    assert_eq!(companies[0].id, acme);
    assert!(!companies[0].created_at.is_empty());
}

#[tokio::test]
async fn empty_store_lists_nothing() {
    let (_dir, store) = temp_store().await;
    assert!(store.get_companies().await.unwrap().is_empty());
}

#[tokio::test]
async fn blank_required_field_is_rejected() {
    let (_dir, store) = temp_store().await;
    let mut bad = company("Acme");
    bad.city = "   ".into();
    let err = store.create_company(bad).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
    match err {
        LedgerError::Validation { field, .. } => assert_eq!(field, "city"),
        other => panic!("unexpected error {other:?}"),
    }
    assert_eq!(count(&store, "companies").await, 0);
}

#[tokio::test]
async fn blank_address_line2_is_stored_as_null() {
    let (_dir, store) = temp_store().await;
    let mut acme = company("Acme");
    acme.address_line2 = Some(" ".into());
    store.create_company(acme).await.unwrap();
    let stored = store.get_companies().await.unwrap().remove(0);
    assert_eq!(stored.address_line2, None);
}

#[tokio::test]
async fn edit_replaces_fields_and_keeps_id() {
    let (_dir, store) = temp_store().await;
    let id = store.create_company(company("Acme")).await.unwrap();

    let mut changed = company("Acme Industries");
    changed.address_line2 = Some("Unit 4".into());
    changed.state = "KA".into();
    let updated = store.edit_company(id, changed).await.unwrap();
    assert_eq!(updated.id, id);
    assert_eq!(updated.name, "Acme Industries");
    assert_eq!(updated.address_line2.as_deref(), Some("Unit 4"));
    assert_eq!(updated.state, "KA");

    let listed = store.get_companies().await.unwrap();
    assert_eq!(listed, vec![updated]);
}

#[tokio::test]
async fn edit_missing_company_is_not_found() {
    let (_dir, store) = temp_store().await;
    let err = store.edit_company(42, company("Ghost")).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
    assert_eq!(count(&store, "companies").await, 0);
}

#[tokio::test]
async fn delete_unreferenced_company() {
    let (_dir, store) = temp_store().await;
    let id = store.create_company(company("Acme")).await.unwrap();
    assert!(store.delete_company(id).await.unwrap());
    assert!(store.get_companies().await.unwrap().is_empty());
    assert!(!store.delete_company(id).await.unwrap());
}

#[tokio::test]
async fn delete_company_with_invoices_conflicts() {
    let (_dir, store) = temp_store().await;
    let id = store.create_company(company("Acme")).await.unwrap();
    store
        .create_invoice(invoice(id, "INV-1", "2024-01-01", vec![item("Design", 1, dec!(100))]))
        .await
        .unwrap();

    let err = store.delete_company(id).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Conflict);
    assert_eq!(
        err.to_string(),
        "Cannot delete company with existing invoices"
    );
    assert_eq!(count(&store, "companies").await, 1);
    assert_eq!(count(&store, "invoices").await, 1);
}

#[tokio::test]
async fn company_deletable_once_its_invoices_are_gone() {
    let (_dir, store) = temp_store().await;
    let id = store.create_company(company("Acme")).await.unwrap();
    let invoice_id = store
        .create_invoice(invoice(id, "INV-1", "2024-01-01", vec![]))
        .await
        .unwrap();
    assert!(store.delete_company(id).await.is_err());
    assert!(store.delete_invoice(invoice_id).await.unwrap());
    assert!(store.delete_company(id).await.unwrap());
}

#[tokio::test]
async fn non_positive_id_is_a_validation_error() {
    let (_dir, store) = temp_store().await;
    let err = store.delete_company(0).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
}
