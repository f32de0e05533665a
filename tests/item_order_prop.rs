#![allow(clippy::unwrap_used, clippy::expect_used)]

mod util;

use proptest::prelude::*;
use rust_decimal::Decimal;
use util::{company, count, invoice, item, temp_store};

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    #[test]
    fn items_come_back_in_input_order(
        lines in prop::collection::vec(("[a-z]{1,12}", 1_i64..50, 0_i64..100_000), 0..12)
    ) {
        let (descriptions, stored) = runtime().block_on(async {
            let (_dir, store) = temp_store().await;
            let company_id = store.create_company(company("Acme")).await.unwrap();
            let items: Vec<_> = lines
                .iter()
                .map(|(description, quantity, paise)| {
                    item(description, *quantity, Decimal::new(*paise, 2))
                })
                .collect();
            let descriptions: Vec<String> =
                items.iter().map(|item| item.description.clone()).collect();
            let id = store
                .create_invoice(invoice(company_id, "INV-P", "2024-06-30", items))
                .await
                .unwrap();
            let details = store.get_invoice_details(id).await.unwrap();
            assert_eq!(count(&store, "invoice_items").await, lines.len() as i64);
            (descriptions, details.items)
        });

        prop_assert_eq!(stored.len(), lines.len());
        let stored_descriptions: Vec<String> =
            stored.iter().map(|item| item.description.clone()).collect();
        prop_assert_eq!(stored_descriptions, descriptions);
        for (position, (stored_item, (_, quantity, paise))) in stored.iter().zip(&lines).enumerate() {
            prop_assert_eq!(stored_item.position, position as i64);
            prop_assert_eq!(stored_item.quantity, *quantity);
            prop_assert_eq!(stored_item.rate, Decimal::new(*paise, 2));
        }
    }
}
