mod common;

use rust_decimal_macros::dec;

use common::{before_all, charges, customer, harness, jan, vendor, Harness};
use rental_backend::{
    common::error::AppError,
    db::RentalStore,
    models::{
        auth::Principal,
        notification::NotificationKind,
        orders::{
            CustomerOrderStatus, LineStatus, NewCustomerOrder, NewRentalOrderLine, OrderBundle, PaymentStatus,
            PaymentType, RentalOrderStatus, TransferDetails, TransferKind,
        },
        product::ProductSnapshot,
        reservation::{RentalWindow, ReservationStatus},
    },
};

struct Booked {
    vendor: Principal,
    customer: Principal,
    product_id: uuid::Uuid,
    bundle: OrderBundle,
}

impl Booked {
    fn line_id(&self) -> uuid::Uuid {
        self.bundle.lines[0].id
    }
}

/// Uma unidade alugada de 10/01 10h a 12/01 10h por 1000.
async fn book(h: &Harness, payment_type: PaymentType) -> Booked {
    let (v, c) = (vendor(), customer());
    let item = h.product(&v, 1, 100).await;
    let q = h.quotation(&v, item.id, Some(c.id), 1, jan(10, 10), jan(12, 10), 1000, charges(50, 500)).await;
    let bundle = h.quotations.accept_many(&c, &[q.id], payment_type, before_all()).await.unwrap();
    Booked { vendor: v, customer: c, product_id: item.id, bundle }
}

fn courier() -> TransferDetails {
    TransferDetails {
        carrier: Some("Transportadora Azul".into()),
        tracking_number: Some("BR123".into()),
        scheduled_at: Some(jan(10, 9)),
    }
}

#[tokio::test]
async fn late_return_on_a_deposit_order_charges_balance_plus_fee() {
    let h = harness();
    let b = book(&h, PaymentType::PartialDeposit).await;

    let picked = h.lifecycle.pickup(&b.vendor, b.line_id(), courier()).await.unwrap();
    assert_eq!(picked.status, LineStatus::Picked);
    assert!(picked.transfer_id.is_some());

    let state = h.store.snapshot().await;
    assert_eq!(state.reservations[0].status, ReservationStatus::Active);
    assert_eq!(state.rental_orders[0].status, RentalOrderStatus::InProgress);
    assert_eq!(state.transfers[0].kind, TransferKind::Pickup);
    assert_eq!(state.transfers[0].carrier.as_deref(), Some("Transportadora Azul"));
    assert!(h.notifier.kinds_for(b.customer.id).contains(&NotificationKind::PickupScheduled));

    let in_use = h.lifecycle.start_use(&b.vendor, b.line_id()).await.unwrap();
    assert_eq!(in_use.status, LineStatus::InUse);

    // 25h de atraso: cobra 1 dia (500), não 1 dia + 1 hora
    let outcome = h
        .lifecycle
        .return_line(&b.vendor, b.line_id(), TransferDetails::default(), jan(13, 11))
        .await
        .unwrap();
    assert_eq!(outcome.late_fee, dec!(500));
    assert_eq!(outcome.remaining_amount, dec!(1500));
    assert_eq!(outcome.line.status, LineStatus::ReturnedPendingPayment);
    assert_eq!(outcome.payment_link_url.as_deref(), Some("https://pay.test/1"));

    let requests = h.gateway.requests.lock().unwrap().clone();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].amount, dec!(1500));
    assert_eq!(requests[0].customer_id, b.customer.id);
    assert_eq!(requests[0].reference_id, b.line_id());

    let state = h.store.snapshot().await;
    assert_eq!(state.reservations[0].status, ReservationStatus::Returned);
    let inv = state.inventory(b.product_id).unwrap();
    assert_eq!((inv.available_quantity, inv.reserved_quantity), (1, 0));
    assert_eq!(state.rental_orders[0].status, RentalOrderStatus::Completed);
    assert_eq!(state.customer_orders[0].status, CustomerOrderStatus::Completed);
    assert_eq!(state.customer_orders[0].payment_status, PaymentStatus::Pending);

    let kinds = h.notifier.kinds_for(b.customer.id);
    assert!(kinds.contains(&NotificationKind::ItemReturned));
    assert!(kinds.contains(&NotificationKind::PaymentRequested));
    h.assert_ledger_sound().await;
}

#[tokio::test]
async fn on_time_return_of_a_prepaid_order_closes_without_a_link() {
    let h = harness();
    let b = book(&h, PaymentType::FullUpfront).await;

    h.lifecycle.pickup(&b.vendor, b.line_id(), courier()).await.unwrap();
    let outcome = h
        .lifecycle
        .return_line(&b.vendor, b.line_id(), TransferDetails::default(), jan(12, 9))
        .await
        .unwrap();

    assert_eq!(outcome.line.status, LineStatus::ReturnedPaid);
    assert_eq!(outcome.late_fee, dec!(0));
    assert_eq!(outcome.remaining_amount, dec!(0));
    assert!(outcome.payment_link_url.is_none());
    assert_eq!(h.gateway.calls(), 0);

    let state = h.store.snapshot().await;
    assert_eq!(state.rental_orders[0].status, RentalOrderStatus::Completed);
    assert_eq!(state.transfers.len(), 2);
    assert_eq!(state.transfers[1].kind, TransferKind::Return);
}

#[tokio::test]
async fn second_return_is_a_conflict_and_changes_nothing() {
    let h = harness();
    let b = book(&h, PaymentType::PartialDeposit).await;
    h.lifecycle.pickup(&b.vendor, b.line_id(), courier()).await.unwrap();
    h.lifecycle
        .return_line(&b.vendor, b.line_id(), TransferDetails::default(), jan(12, 10))
        .await
        .unwrap();

    let before = h.store.snapshot().await;
    let err = h
        .lifecycle
        .return_line(&b.vendor, b.line_id(), TransferDetails::default(), jan(14, 10))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Conflict(_)));

    let after = h.store.snapshot().await;
    assert_eq!(after.lines, before.lines);
    assert_eq!(after.inventories, before.inventories);
    assert_eq!(after.transfers.len(), before.transfers.len());
    assert_eq!(h.gateway.calls(), 1);
}

#[tokio::test]
async fn gateway_failure_keeps_the_release_and_retry_only_asks_for_the_link() {
    let h = harness();
    let b = book(&h, PaymentType::PartialDeposit).await;
    h.lifecycle.pickup(&b.vendor, b.line_id(), courier()).await.unwrap();

    h.gateway.fail_next(1);
    let err = h
        .lifecycle
        .return_line(&b.vendor, b.line_id(), TransferDetails::default(), jan(12, 10))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Gateway(_)));
    assert!(err.is_retryable());

    // Estoque já voltou; a linha guarda o saldo calculado
    let state = h.store.snapshot().await;
    let line = &state.lines[0];
    assert_eq!(line.status, LineStatus::Picked);
    assert_eq!(line.returned_at, Some(jan(12, 10)));
    assert_eq!(line.remaining_amount, dec!(1000));
    assert_eq!(state.reservations[0].status, ReservationStatus::Returned);
    assert_eq!(state.inventory(b.product_id).unwrap().available_quantity, 1);

    // Com a devolução iniciada a linha não volta para uso nem é cancelada
    let start_use = h.lifecycle.start_use(&b.vendor, b.line_id()).await;
    assert!(matches!(start_use, Err(AppError::Conflict(_))));
    let cancel = h.lifecycle.cancel_line(&b.customer, b.line_id()).await;
    assert!(matches!(cancel, Err(AppError::Conflict(_))));

    // Repetir, mesmo mais tarde, não recalcula a multa nem libera de novo
    let outcome = h
        .lifecycle
        .return_line(&b.vendor, b.line_id(), TransferDetails::default(), jan(15, 10))
        .await
        .unwrap();
    assert_eq!(outcome.line.status, LineStatus::ReturnedPendingPayment);
    assert_eq!(outcome.remaining_amount, dec!(1000));
    assert_eq!(outcome.late_fee, dec!(0));
    assert_eq!(h.gateway.calls(), 2);

    let state = h.store.snapshot().await;
    let returns = state.transfers.iter().filter(|t| t.kind == TransferKind::Return).count();
    assert_eq!(returns, 1);
    h.assert_ledger_sound().await;
}

#[tokio::test]
async fn paid_link_settles_the_line_and_the_order() {
    let h = harness();
    let b = book(&h, PaymentType::PartialDeposit).await;
    h.lifecycle.pickup(&b.vendor, b.line_id(), courier()).await.unwrap();
    let outcome = h
        .lifecycle
        .return_line(&b.vendor, b.line_id(), TransferDetails::default(), jan(12, 10))
        .await
        .unwrap();
    let link_id = outcome.line.payment_link_id.clone().unwrap();

    let settled = h.lifecycle.settle_payment_link(&link_id, Some(dec!(1000))).await.unwrap();
    assert_eq!(settled.status, LineStatus::ReturnedPaid);
    assert_eq!(settled.remaining_amount, dec!(0));

    // Redelivery do webhook não soma de novo
    h.lifecycle.settle_payment_link(&link_id, Some(dec!(1000))).await.unwrap();

    let state = h.store.snapshot().await;
    assert_eq!(state.customer_orders[0].paid_amount, dec!(1000));
    assert_eq!(state.customer_orders[0].payment_status, PaymentStatus::Paid);

    let unknown = h.lifecycle.settle_payment_link("plink_nope", None).await;
    assert!(matches!(unknown, Err(AppError::NotFound(_))));
}

#[tokio::test]
async fn return_requires_a_pickup_and_the_right_vendor() {
    let h = harness();
    let b = book(&h, PaymentType::FullUpfront).await;

    let early = h
        .lifecycle
        .return_line(&b.vendor, b.line_id(), TransferDetails::default(), jan(12, 10))
        .await;
    assert!(matches!(early, Err(AppError::Conflict(_))));

    let by_customer = h.lifecycle.pickup(&b.customer, b.line_id(), courier()).await;
    assert!(matches!(by_customer, Err(AppError::Forbidden(_))));
    let by_other_vendor = h.lifecycle.pickup(&vendor(), b.line_id(), courier()).await;
    assert!(matches!(by_other_vendor, Err(AppError::Forbidden(_))));

    h.lifecycle.pickup(&b.vendor, b.line_id(), courier()).await.unwrap();
    let twice = h.lifecycle.pickup(&b.vendor, b.line_id(), courier()).await;
    assert!(matches!(twice, Err(AppError::Conflict(_))));
}

#[tokio::test]
async fn cancelling_a_line_frees_the_window_immediately() {
    let h = harness();
    let b = book(&h, PaymentType::FullUpfront).await;

    let line = h.lifecycle.cancel_line(&b.customer, b.line_id()).await.unwrap();
    assert_eq!(line.status, LineStatus::Cancelled);

    let state = h.store.snapshot().await;
    assert_eq!(state.reservations[0].status, ReservationStatus::Cancelled);
    let inv = state.inventory(b.product_id).unwrap();
    assert_eq!((inv.available_quantity, inv.reserved_quantity), (1, 0));
    assert_eq!(state.rental_orders[0].status, RentalOrderStatus::Cancelled);
    assert_eq!(state.customer_orders[0].status, CustomerOrderStatus::Cancelled);
    assert_eq!(state.customer_orders[0].total_amount, dec!(0));

    // Mesma janela, outro cliente
    let q = h
        .quotation(&b.vendor, b.product_id, None, 1, jan(10, 10), jan(12, 10), 1000, charges(0, 0))
        .await;
    h.quotations
        .accept_many(&customer(), &[q.id], PaymentType::FullUpfront, before_all())
        .await
        .unwrap();
    h.assert_ledger_sound().await;
}

#[tokio::test]
async fn customer_order_cancel_cascades_or_fails_whole() {
    let h = harness();
    let (v1, v2, c) = (vendor(), vendor(), customer());
    let drill = h.product(&v1, 1, 100).await;
    let ladder = h.product(&v2, 1, 100).await;
    let q1 = h.quotation(&v1, drill.id, Some(c.id), 1, jan(1, 0), jan(3, 0), 300, charges(0, 0)).await;
    let q2 = h.quotation(&v2, ladder.id, Some(c.id), 1, jan(1, 0), jan(3, 0), 200, charges(0, 0)).await;
    let bundle = h
        .quotations
        .accept_many(&c, &[q1.id, q2.id], PaymentType::FullUpfront, before_all())
        .await
        .unwrap();
    let ladder_line = bundle.lines.iter().find(|l| l.product_id == ladder.id).unwrap().id;

    h.lifecycle.pickup(&v2, ladder_line, courier()).await.unwrap();
    h.lifecycle.start_use(&v2, ladder_line).await.unwrap();

    // Um item em uso impede o cancelamento; nada muda
    let before = h.store.snapshot().await;
    let blocked = h.lifecycle.cancel_customer_order(&c, bundle.customer_order.id).await;
    assert!(matches!(blocked, Err(AppError::Conflict(_))));
    let after = h.store.snapshot().await;
    assert_eq!(after.lines, before.lines);
    assert_eq!(after.inventories, before.inventories);

    let stranger = h.lifecycle.cancel_customer_order(&customer(), bundle.customer_order.id).await;
    assert!(matches!(stranger, Err(AppError::Forbidden(_))));

    // A fatia do outro fornecedor ainda pode sair sozinha
    let drill_order = bundle.rental_orders.iter().find(|o| o.vendor_id == v1.id).unwrap().id;
    let cancelled = h.lifecycle.cancel_rental_order(&v1, drill_order).await.unwrap();
    assert_eq!(cancelled.status, RentalOrderStatus::Cancelled);

    let state = h.store.snapshot().await;
    assert_eq!(state.customer_orders[0].total_amount, dec!(200));
    assert_eq!(state.customer_orders[0].status, CustomerOrderStatus::Pending);
    assert_eq!(state.inventory(drill.id).unwrap().available_quantity, 1);
    h.assert_ledger_sound().await;
}

#[tokio::test]
async fn full_cascade_cancels_every_slice() {
    let h = harness();
    let (v1, v2, c) = (vendor(), vendor(), customer());
    let drill = h.product(&v1, 1, 100).await;
    let ladder = h.product(&v2, 2, 100).await;
    let q1 = h.quotation(&v1, drill.id, Some(c.id), 1, jan(1, 0), jan(3, 0), 300, charges(0, 0)).await;
    let q2 = h.quotation(&v2, ladder.id, Some(c.id), 2, jan(1, 0), jan(3, 0), 200, charges(0, 0)).await;
    let bundle = h
        .quotations
        .accept_many(&c, &[q1.id, q2.id], PaymentType::FullUpfront, before_all())
        .await
        .unwrap();

    let order = h.lifecycle.cancel_customer_order(&c, bundle.customer_order.id).await.unwrap();
    assert_eq!(order.status, CustomerOrderStatus::Cancelled);

    let state = h.store.snapshot().await;
    assert!(state.rental_orders.iter().all(|o| o.status == RentalOrderStatus::Cancelled));
    assert!(state.lines.iter().all(|l| l.status == LineStatus::Cancelled));
    assert!(state.reservations.iter().all(|r| r.status == ReservationStatus::Cancelled));
    assert!(state.inventories.iter().all(|i| i.reserved_quantity == 0));
}

#[tokio::test]
async fn vendor_status_changes_follow_the_table() {
    let h = harness();
    let b = book(&h, PaymentType::FullUpfront).await;
    let order_id = b.bundle.rental_orders[0].id;

    let confirmed = h
        .lifecycle
        .update_rental_order_status(&b.vendor, order_id, RentalOrderStatus::Confirmed)
        .await
        .unwrap();
    assert_eq!(confirmed.status, RentalOrderStatus::Confirmed);

    let skip = h
        .lifecycle
        .update_rental_order_status(&b.vendor, order_id, RentalOrderStatus::Completed)
        .await;
    assert!(matches!(skip, Err(AppError::Conflict(_))));

    h.lifecycle.pickup(&b.vendor, b.line_id(), courier()).await.unwrap();
    let premature = h
        .lifecycle
        .update_rental_order_status(&b.vendor, order_id, RentalOrderStatus::Completed)
        .await;
    assert!(matches!(premature, Err(AppError::Conflict(_))));

    let not_mine = h
        .lifecycle
        .update_rental_order_status(&b.customer, order_id, RentalOrderStatus::Completed)
        .await;
    assert!(matches!(not_mine, Err(AppError::Forbidden(_))));
}

#[tokio::test]
async fn cart_line_return_bills_the_line_total_without_late_fee() {
    let h = harness();
    let (v, c) = (vendor(), customer());
    let item = h.product(&v, 1, 100).await;
    h.cart.add_to_cart(&c, item.id, 1, jan(1, 0), jan(3, 0), before_all()).await.unwrap();
    let bundle = h.cart.checkout(&c, PaymentType::PartialDeposit, before_all()).await.unwrap();
    let line_id = bundle.lines[0].id;

    h.lifecycle.pickup(&v, line_id, courier()).await.unwrap();
    let outcome = h
        .lifecycle
        .return_line(&v, line_id, TransferDetails::default(), jan(5, 0))
        .await
        .unwrap();
    assert_eq!(outcome.late_fee, dec!(0));
    assert_eq!(outcome.remaining_amount, dec!(200));
    assert_eq!(outcome.line.status, LineStatus::ReturnedPendingPayment);
}

#[tokio::test]
async fn rental_order_detail_is_visible_to_its_vendor_and_customer_only() {
    let h = harness();
    let b = book(&h, PaymentType::FullUpfront).await;
    let order_id = b.bundle.rental_orders[0].id;

    let detail = h.orders.get_rental_order(&b.vendor, order_id).await.unwrap();
    assert_eq!(detail.lines.len(), 1);
    assert!(h.orders.get_rental_order(&b.customer, order_id).await.is_ok());
    let stranger = h.orders.get_rental_order(&vendor(), order_id).await;
    assert!(matches!(stranger, Err(AppError::Forbidden(_))));

    let full = h.orders.get_customer_order(&b.customer, b.bundle.customer_order.id).await.unwrap();
    assert_eq!(full.reservations.len(), 1);
}

#[tokio::test]
async fn pickup_without_a_hold_is_refused() {
    let h = harness();
    let (v, c) = (vendor(), customer());
    let item = h.product(&v, 1, 100).await;
    let window = RentalWindow::new(jan(1, 0), jan(3, 0)).unwrap();

    // Linha confirmada sem reserva, gravada direto no store
    let mut tx = h.store.begin().await.unwrap();
    let order = tx
        .insert_customer_order(NewCustomerOrder {
            customer_id: c.id,
            status: CustomerOrderStatus::Pending,
            total_amount: dec!(200),
            payment_type: PaymentType::FullUpfront,
            window: Some(window),
        })
        .await
        .unwrap();
    let rental_order = tx.insert_rental_order(order.id, v.id, dec!(200)).await.unwrap();
    let line = tx
        .insert_line(NewRentalOrderLine {
            rental_order_id: rental_order.id,
            quotation_id: None,
            product_id: item.id,
            product_snapshot: ProductSnapshot::from(&item),
            quantity: 1,
            window,
            unit_price: dec!(100),
            extras: vec![],
            line_total: dec!(200),
            reservation_id: None,
        })
        .await
        .unwrap();
    tx.commit().await.unwrap();

    let err = h.lifecycle.pickup(&v, line.id, courier()).await.unwrap_err();
    assert!(matches!(err, AppError::Conflict(_)));

    let state = h.store.snapshot().await;
    assert_eq!(state.lines[0].status, LineStatus::Reserved);
    assert!(state.transfers.is_empty());
    assert_eq!(state.inventory(item.id).unwrap().reserved_quantity, 0);
}
