mod common;

use uuid::Uuid;

use common::{before_all, charges, customer, harness, jan, vendor};
use rental_backend::{
    common::error::AppError,
    models::{
        auth::{Principal, Role},
        orders::PaymentType,
        reservation::ReservationFilter,
    },
};

#[tokio::test]
async fn restock_past_the_counter_limit_changes_nothing() {
    let h = harness();
    let v = vendor();
    let item = h.product(&v, 5, 100).await;

    let err = h.products.increase_quantity(&v, item.id, i32::MAX).await.unwrap_err();
    assert!(matches!(err, AppError::Validation(_)));

    let inv = h.store.snapshot().await.inventory(item.id).cloned().unwrap();
    assert_eq!((inv.total_quantity, inv.available_quantity, inv.reserved_quantity), (5, 5, 0));
}

#[tokio::test]
async fn decrease_takes_free_units_off_total_and_available() {
    let h = harness();
    let v = vendor();
    let item = h.product(&v, 5, 100).await;

    let inv = h.products.decrease_quantity(&v, item.id, 2).await.unwrap();
    assert_eq!((inv.total_quantity, inv.available_quantity, inv.reserved_quantity), (3, 3, 0));
    h.assert_ledger_sound().await;
}

#[tokio::test]
async fn decrease_below_zero_or_by_nothing_is_a_validation_error() {
    let h = harness();
    let v = vendor();
    let item = h.product(&v, 2, 100).await;

    let err = h.products.decrease_quantity(&v, item.id, 3).await.unwrap_err();
    assert!(matches!(err, AppError::Validation(_)));
    let err = h.products.decrease_quantity(&v, item.id, 0).await.unwrap_err();
    assert!(matches!(err, AppError::Validation(_)));

    assert_eq!(h.store.snapshot().await.inventory(item.id).unwrap().total_quantity, 2);
}

#[tokio::test]
async fn decrease_cannot_cut_into_units_held_at_the_same_time() {
    let h = harness();
    let (v, c) = (vendor(), customer());
    let item = h.product(&v, 3, 100).await;

    // Duas reservas cruzadas (pico 2) e uma terceira depois delas
    let a = h.quotation(&v, item.id, Some(c.id), 1, jan(1, 0), jan(5, 0), 400, charges(0, 0)).await;
    let b = h.quotation(&v, item.id, Some(c.id), 1, jan(3, 0), jan(7, 0), 400, charges(0, 0)).await;
    let later = h.quotation(&v, item.id, Some(c.id), 1, jan(10, 0), jan(12, 0), 200, charges(0, 0)).await;
    h.quotations
        .accept_many(&c, &[a.id, b.id, later.id], PaymentType::FullUpfront, before_all())
        .await
        .unwrap();

    let inv = h.products.decrease_quantity(&v, item.id, 1).await.unwrap();
    assert_eq!((inv.total_quantity, inv.available_quantity, inv.reserved_quantity), (2, 0, 2));

    let before = h.store.snapshot().await;
    let err = h.products.decrease_quantity(&v, item.id, 1).await.unwrap_err();
    assert!(matches!(err, AppError::Conflict(_)));
    assert_eq!(h.store.snapshot().await.inventories, before.inventories);
    h.assert_ledger_sound().await;
}

#[tokio::test]
async fn only_the_owner_decreases_stock() {
    let h = harness();
    let (owner, other) = (vendor(), vendor());
    let item = h.product(&owner, 4, 100).await;

    let err = h.products.decrease_quantity(&other, item.id, 1).await.unwrap_err();
    assert!(matches!(err, AppError::Forbidden(_)));

    let admin = Principal::new(Uuid::new_v4(), Role::Admin);
    let inv = h.products.decrease_quantity(&admin, item.id, 1).await.unwrap();
    assert_eq!(inv.total_quantity, 3);
}

#[tokio::test]
async fn reservations_are_listed_per_customer_and_per_vendor() {
    let h = harness();
    let (v1, v2, c1, c2) = (vendor(), vendor(), customer(), customer());
    let drill = h.product(&v1, 5, 100).await;
    let ladder = h.product(&v2, 5, 100).await;

    let q1 = h.quotation(&v1, drill.id, Some(c1.id), 1, jan(1, 0), jan(3, 0), 200, charges(0, 0)).await;
    let q2 = h.quotation(&v2, ladder.id, Some(c1.id), 2, jan(1, 0), jan(3, 0), 200, charges(0, 0)).await;
    let q3 = h.quotation(&v1, drill.id, Some(c2.id), 1, jan(5, 0), jan(6, 0), 100, charges(0, 0)).await;
    h.quotations
        .accept_many(&c1, &[q1.id, q2.id], PaymentType::FullUpfront, before_all())
        .await
        .unwrap();
    let second = h
        .quotations
        .accept_many(&c2, &[q3.id], PaymentType::FullUpfront, before_all())
        .await
        .unwrap();

    let mine = h.inventory.list_reservations(&c1, ReservationFilter::default()).await.unwrap();
    assert_eq!(mine.len(), 2);

    // Cliente não enxerga reservas alheias, mesmo pedindo
    let asked = ReservationFilter { customer_id: Some(c1.id), ..Default::default() };
    let theirs = h.inventory.list_reservations(&c2, asked).await.unwrap();
    assert_eq!(theirs.len(), 1);
    assert_eq!(theirs[0].id, second.reservations[0].id);

    // Fornecedor vê as reservas dos próprios produtos, mais recentes primeiro
    let drill_side = h.inventory.list_reservations(&v1, ReservationFilter::default()).await.unwrap();
    assert_eq!(drill_side.len(), 2);
    assert!(drill_side.iter().all(|r| r.product_id == drill.id));
    assert_eq!(drill_side[0].id, second.reservations[0].id);

    let admin = Principal::new(Uuid::new_v4(), Role::Admin);
    let err = h.inventory.list_reservations(&admin, ReservationFilter::default()).await.unwrap_err();
    assert!(matches!(err, AppError::Validation(_)));
    let by_vendor = ReservationFilter { vendor_id: Some(v2.id), ..Default::default() };
    let ladder_side = h.inventory.list_reservations(&admin, by_vendor).await.unwrap();
    assert_eq!(ladder_side.len(), 1);
    assert_eq!(ladder_side[0].quantity, 2);
}

#[tokio::test]
async fn notifications_are_read_back_from_the_inbox() {
    let h = harness();
    let (v, c) = (vendor(), customer());
    let item = h.product(&v, 1, 100).await;
    let q = h.quotation(&v, item.id, Some(c.id), 1, jan(1, 0), jan(3, 0), 200, charges(0, 0)).await;
    h.quotations
        .accept_many(&c, &[q.id], PaymentType::FullUpfront, before_all())
        .await
        .unwrap();

    let inbox = h.notifications.list_notifications(&c).await.unwrap();
    assert!(!inbox.is_empty());
    assert!(inbox.iter().all(|n| n.recipient_id == c.id && !n.read));
    assert!(inbox.iter().any(|n| n.kind == "order_created"));

    let stranger = h.notifications.list_notifications(&customer()).await.unwrap();
    assert!(stranger.is_empty());
}
