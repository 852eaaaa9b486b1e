//! Order number allocation under contention.
//!
//! The generator picks random 5-digit numbers and relies on the store's
//! uniqueness guarantee plus retry to survive collisions. With 1,000 orders
//! drawn from 90,000 candidates collisions are likely across a run but each
//! one must be absorbed by the retry loop, never surfaced as a duplicate.

use std::collections::HashSet;

use marigold_core::{IntentSource, PaymentMethod, Price, UserId};
use marigold_storefront::db::Store;
use marigold_storefront::models::{AddressSnapshot, LineItem, PurchaseIntent};
use marigold_storefront::services::{OrderService, ShippingPolicy};

fn service() -> OrderService {
    OrderService::new(
        Store::memory(),
        ShippingPolicy {
            fee: Price::from_rupees(49),
            free_threshold: Price::from_rupees(499),
        },
    )
}

fn intent() -> PurchaseIntent {
    PurchaseIntent {
        items: vec![LineItem {
            product_id: marigold_core::ProductId::new(1),
            name: "Kurta".to_owned(),
            unit_price: Price::from_rupees(799),
            quantity: 1,
            variant: None,
        }],
        source: IntentSource::Cart,
    }
}

fn snapshot() -> AddressSnapshot {
    AddressSnapshot {
        full_name: "Asha Rao".to_owned(),
        line1: "14 MG Road".to_owned(),
        city: "Bengaluru".to_owned(),
        state: "Karnataka".to_owned(),
        pin_code: "560001".to_owned(),
        phone: "9876543210".to_owned(),
    }
}

#[tokio::test]
async fn concurrent_placements_never_share_a_number() {
    let service = service();

    let mut tasks = tokio::task::JoinSet::new();
    for i in 0..1_000 {
        let service = service.clone();
        tasks.spawn(async move {
            service
                .place_order(
                    &intent(),
                    Some(UserId::new(i)),
                    snapshot(),
                    PaymentMethod::Cod,
                    None,
                    None,
                )
                .await
        });
    }

    let mut numbers = HashSet::new();
    while let Some(result) = tasks.join_next().await {
        let placed = result.unwrap().unwrap();
        assert!(
            numbers.insert(placed.order.order_number.clone()),
            "duplicate order number {}",
            placed.order.order_number
        );
    }
    assert_eq!(numbers.len(), 1_000);
}

#[tokio::test]
async fn numbers_use_the_prefixed_five_digit_format() {
    let service = service();
    let placed = service
        .place_order(
            &intent(),
            Some(UserId::new(1)),
            snapshot(),
            PaymentMethod::Cod,
            None,
            None,
        )
        .await
        .unwrap();

    let number = &placed.order.order_number;
    assert!(number.starts_with("MG-"), "unexpected prefix: {number}");
    let digits = number.trim_start_matches("MG-");
    assert_eq!(digits.len(), 5);
    assert!(digits.chars().all(|c| c.is_ascii_digit()));
}
