mod common;

use chrono::Duration;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use common::{before_all, charges, customer, harness, jan, vendor};
use rental_backend::{
    common::error::AppError,
    models::{
        notification::NotificationKind,
        orders::{CustomerOrderStatus, LineStatus, PaymentType},
        quotation::{QuotationPatch, QuotationStatus},
        reservation::ReservationStatus,
    },
};

#[tokio::test]
async fn multi_vendor_accept_builds_one_order_with_a_slice_per_vendor() {
    let h = harness();
    let (v1, v2, c) = (vendor(), vendor(), customer());
    let drill = h.product(&v1, 1, 100).await;
    let ladder = h.product(&v2, 1, 100).await;

    let q1 = h.quotation(&v1, drill.id, Some(c.id), 1, jan(1, 10), jan(3, 10), 1000, charges(50, 500)).await;
    let q2 = h.quotation(&v2, ladder.id, Some(c.id), 1, jan(1, 10), jan(3, 10), 1500, charges(50, 500)).await;

    let bundle = h
        .quotations
        .accept_many(&c, &[q1.id, q2.id], PaymentType::PartialDeposit, before_all())
        .await
        .unwrap();

    assert_eq!(bundle.customer_order.status, CustomerOrderStatus::Pending);
    assert_eq!(bundle.customer_order.total_amount, dec!(2500));
    assert_eq!(bundle.rental_orders.len(), 2);
    assert_eq!(bundle.lines.len(), 2);
    assert_eq!(bundle.reservations.len(), 2);
    assert!(bundle.lines.iter().all(|l| l.status == LineStatus::Reserved));
    assert!(bundle.reservations.iter().all(|r| r.status == ReservationStatus::Reserved));

    let vendors: Vec<_> = bundle.rental_orders.iter().map(|o| o.vendor_id).collect();
    assert!(vendors.contains(&v1.id) && vendors.contains(&v2.id));
    for order in &bundle.rental_orders {
        let slice: Decimal = bundle
            .lines
            .iter()
            .filter(|l| l.rental_order_id == order.id)
            .map(|l| l.line_total)
            .sum();
        assert_eq!(order.total_amount, slice);
    }

    let state = h.store.snapshot().await;
    assert!(state.quotations.iter().all(|q| q.status == QuotationStatus::Accepted));
    assert_eq!(state.inventory(drill.id).unwrap().reserved_quantity, 1);
    assert_eq!(state.inventory(ladder.id).unwrap().available_quantity, 0);

    assert!(h.notifier.kinds_for(c.id).contains(&NotificationKind::OrderCreated));
    assert!(h.notifier.kinds_for(v1.id).contains(&NotificationKind::OrderCreated));
    assert!(h.notifier.kinds_for(v2.id).contains(&NotificationKind::OrderCreated));
    h.assert_ledger_sound().await;
}

#[tokio::test]
async fn failed_accept_leaves_no_orders_holds_or_status_changes() {
    let h = harness();
    let (v, c) = (vendor(), customer());
    let scarce = h.product(&v, 1, 100).await;
    let plenty = h.product(&v, 5, 100).await;

    let ok = h.quotation(&v, plenty.id, Some(c.id), 1, jan(1, 0), jan(5, 0), 400, charges(0, 0)).await;
    let first = h.quotation(&v, scarce.id, Some(c.id), 1, jan(1, 0), jan(5, 0), 400, charges(0, 0)).await;
    // Cruza com `first` no mesmo lote: a única unidade já foi pedida
    let clash = h.quotation(&v, scarce.id, Some(c.id), 1, jan(3, 0), jan(7, 0), 400, charges(0, 0)).await;

    let before = h.store.snapshot().await;
    let err = h
        .quotations
        .accept_many(&c, &[ok.id, first.id, clash.id], PaymentType::FullUpfront, before_all())
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Conflict(_)));
    assert!(err.is_retryable());

    let after = h.store.snapshot().await;
    assert!(after.customer_orders.is_empty());
    assert!(after.rental_orders.is_empty());
    assert!(after.lines.is_empty());
    assert!(after.reservations.is_empty());
    assert_eq!(after.inventories, before.inventories);
    assert!(after.quotations.iter().all(|q| q.status == QuotationStatus::Pending));
    assert!(h.notifier.kinds_for(c.id).iter().all(|k| *k != NotificationKind::OrderCreated));
}

#[tokio::test]
async fn back_to_back_windows_share_a_single_unit() {
    let h = harness();
    let v = vendor();
    let item = h.product(&v, 1, 100).await;

    let first = h.quotation(&v, item.id, None, 1, jan(1, 0), jan(5, 0), 400, charges(0, 0)).await;
    let next = h.quotation(&v, item.id, None, 1, jan(5, 0), jan(10, 0), 500, charges(0, 0)).await;
    let overlapping = h.quotation(&v, item.id, None, 1, jan(4, 0), jan(6, 0), 200, charges(0, 0)).await;

    h.quotations
        .accept_many(&customer(), &[first.id], PaymentType::FullUpfront, before_all())
        .await
        .unwrap();
    h.quotations
        .accept_many(&customer(), &[next.id], PaymentType::FullUpfront, before_all())
        .await
        .unwrap();
    let err = h
        .quotations
        .accept_many(&customer(), &[overlapping.id], PaymentType::FullUpfront, before_all())
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Conflict(_)));

    let state = h.store.snapshot().await;
    let inv = state.inventory(item.id).unwrap();
    assert_eq!((inv.available_quantity, inv.reserved_quantity), (0, 1));
    h.assert_ledger_sound().await;
}

#[tokio::test]
async fn capacity_two_admits_two_customers_then_refuses_the_third() {
    let h = harness();
    let v = vendor();
    let item = h.product(&v, 2, 100).await;

    let mut quotations = vec![];
    for _ in 0..3 {
        quotations.push(h.quotation(&v, item.id, None, 1, jan(1, 0), jan(3, 0), 200, charges(0, 0)).await);
    }

    h.quotations
        .accept_many(&customer(), &[quotations[0].id], PaymentType::FullUpfront, before_all())
        .await
        .unwrap();
    h.quotations
        .accept_many(&customer(), &[quotations[1].id], PaymentType::FullUpfront, before_all())
        .await
        .unwrap();
    let err = h
        .quotations
        .accept_many(&customer(), &[quotations[2].id], PaymentType::FullUpfront, before_all())
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Conflict(_)));
    h.assert_ledger_sound().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_accepts_for_the_last_unit_admit_exactly_one() {
    let h = harness();
    let v = vendor();
    let item = h.product(&v, 1, 100).await;
    let qa = h.quotation(&v, item.id, None, 1, jan(1, 0), jan(3, 0), 200, charges(0, 0)).await;
    let qb = h.quotation(&v, item.id, None, 1, jan(2, 0), jan(4, 0), 200, charges(0, 0)).await;

    let (ca, cb) = (customer(), customer());
    let (ia, ib) = ([qa.id], [qb.id]);
    let (a, b) = tokio::join!(
        h.quotations.accept_many(&ca, &ia, PaymentType::FullUpfront, before_all()),
        h.quotations.accept_many(&cb, &ib, PaymentType::FullUpfront, before_all()),
    );

    assert_eq!([a.is_ok(), b.is_ok()].iter().filter(|ok| **ok).count(), 1);
    let loser = if a.is_err() { a.unwrap_err() } else { b.unwrap_err() };
    assert!(matches!(loser, AppError::Conflict(_)));
    assert_eq!(h.store.snapshot().await.customer_orders.len(), 1);
    h.assert_ledger_sound().await;
}

#[tokio::test]
async fn accept_rejects_bad_batches_before_writing() {
    let h = harness();
    let (v, c, other) = (vendor(), customer(), customer());
    let item = h.product(&v, 3, 100).await;
    let mine = h.quotation(&v, item.id, Some(c.id), 1, jan(1, 0), jan(3, 0), 200, charges(0, 0)).await;
    let theirs = h.quotation(&v, item.id, Some(other.id), 1, jan(1, 0), jan(3, 0), 200, charges(0, 0)).await;

    let empty = h.quotations.accept_many(&c, &[], PaymentType::FullUpfront, before_all()).await;
    assert!(matches!(empty, Err(AppError::Validation(_))));

    let repeated = h
        .quotations
        .accept_many(&c, &[mine.id, mine.id], PaymentType::FullUpfront, before_all())
        .await;
    assert!(matches!(repeated, Err(AppError::Validation(_))));

    let unknown = h
        .quotations
        .accept_many(&c, &[uuid::Uuid::new_v4()], PaymentType::FullUpfront, before_all())
        .await;
    assert!(matches!(unknown, Err(AppError::Validation(_))));

    let foreign = h
        .quotations
        .accept_many(&c, &[mine.id, theirs.id], PaymentType::FullUpfront, before_all())
        .await;
    assert!(matches!(foreign, Err(AppError::Forbidden(_))));

    h.quotations
        .accept_many(&c, &[mine.id], PaymentType::FullUpfront, before_all())
        .await
        .unwrap();
    let again = h.quotations.accept_many(&c, &[mine.id], PaymentType::FullUpfront, before_all()).await;
    assert!(matches!(again, Err(AppError::Validation(_))));

    assert_eq!(h.store.snapshot().await.customer_orders.len(), 1);
}

#[tokio::test]
async fn expired_quotation_cannot_be_accepted_or_edited() {
    let h = harness();
    let (v, c) = (vendor(), customer());
    let item = h.product(&v, 1, 100).await;
    let q = h.quotation(&v, item.id, Some(c.id), 1, jan(10, 0), jan(12, 0), 200, charges(0, 0)).await;

    let deadline = before_all() + Duration::days(1);
    h.quotations
        .update_quotation(
            &v,
            q.id,
            QuotationPatch { expires_at: Some(deadline), ..Default::default() },
            before_all(),
        )
        .await
        .unwrap();

    let later = deadline + Duration::hours(1);
    let accept = h.quotations.accept_many(&c, &[q.id], PaymentType::FullUpfront, later).await;
    assert!(matches!(accept, Err(AppError::Validation(_))));

    let edit = h
        .quotations
        .update_quotation(&v, q.id, QuotationPatch { requested_quantity: Some(2), ..Default::default() }, later)
        .await;
    assert!(matches!(edit, Err(AppError::Conflict(_))));
}

#[tokio::test]
async fn only_the_owner_edits_and_only_while_pending() {
    let h = harness();
    let (v, c) = (vendor(), customer());
    let item = h.product(&v, 2, 100).await;
    let q = h.quotation(&v, item.id, Some(c.id), 1, jan(1, 0), jan(3, 0), 200, charges(0, 0)).await;

    let edited = h
        .quotations
        .update_quotation(
            &v,
            q.id,
            QuotationPatch { requested_quantity: Some(2), total_amount: Some(dec!(380)), ..Default::default() },
            before_all(),
        )
        .await
        .unwrap();
    assert_eq!(edited.requested_quantity, 2);
    assert_eq!(edited.total_amount, dec!(380));

    let stranger = h
        .quotations
        .update_quotation(&vendor(), q.id, QuotationPatch::default(), before_all())
        .await;
    assert!(matches!(stranger, Err(AppError::Forbidden(_))));

    let inverted = h
        .quotations
        .update_quotation(
            &v,
            q.id,
            QuotationPatch { return_at: Some(jan(1, 0) - Duration::hours(1)), ..Default::default() },
            before_all(),
        )
        .await;
    assert!(matches!(inverted, Err(AppError::Validation(_))));

    let bundle = h
        .quotations
        .accept_many(&c, &[q.id], PaymentType::FullUpfront, before_all())
        .await
        .unwrap();
    assert_eq!(bundle.lines[0].quantity, 2);
    assert_eq!(bundle.lines[0].unit_price, dec!(190));

    let after_accept = h
        .quotations
        .update_quotation(&v, q.id, QuotationPatch::default(), before_all())
        .await;
    assert!(matches!(after_accept, Err(AppError::Conflict(_))));
}

#[tokio::test]
async fn bound_quotation_is_hidden_from_other_customers() {
    let h = harness();
    let (v, c) = (vendor(), customer());
    let item = h.product(&v, 1, 100).await;
    let q = h.quotation(&v, item.id, Some(c.id), 1, jan(1, 0), jan(3, 0), 200, charges(0, 0)).await;

    assert!(h.quotations.get_quotation(&c, q.id).await.is_ok());
    assert!(h.quotations.get_quotation(&v, q.id).await.is_ok());
    let peek = h.quotations.get_quotation(&customer(), q.id).await;
    assert!(matches!(peek, Err(AppError::Forbidden(_))));

    assert!(h.notifier.kinds_for(c.id).contains(&NotificationKind::QuotationCreated));
    let listed = h.quotations.list_quotations(&c, Default::default()).await.unwrap();
    assert_eq!(listed.len(), 1);
    let listed_by_other = h.quotations.list_quotations(&vendor(), Default::default()).await.unwrap();
    assert!(listed_by_other.is_empty());
}

#[tokio::test]
async fn quotation_for_someone_elses_product_is_forbidden() {
    let h = harness();
    let (owner, intruder) = (vendor(), vendor());
    let item = h.product(&owner, 1, 100).await;

    let err = h
        .quotations
        .create_quotation(
            &intruder,
            rental_backend::models::quotation::NewQuotation {
                product_id: item.id,
                customer_id: None,
                requested_quantity: 1,
                charges: charges(0, 0),
                pickup_at: jan(1, 0),
                return_at: jan(2, 0),
                pickup_address: None,
                return_address: None,
                pricing_breakdown: vec![],
                total_amount: dec!(100),
                expires_at: None,
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Forbidden(_)));
}
