// src/services/order_service.rs

use std::{collections::BTreeMap, sync::Arc, time::Duration};

use rust_decimal::Decimal;
use uuid::Uuid;

use crate::{
    common::{error::AppError, lifecycle::Lifecycle, tx},
    db::store::{RentalStore, RentalTx},
    models::{
        auth::Principal,
        orders::{
            CustomerOrder, CustomerOrderStatus, LineStatus, NewCustomerOrder, NewRentalOrderLine,
            OrderBundle, PaymentType, RentalOrder, RentalOrderDetail, RentalOrderLine,
            RentalOrderStatus,
        },
        product::{Product, ProductSnapshot},
        quotation::PriceComponent,
        reservation::{NewReservation, RentalWindow, ReservationStatus},
    },
    services::inventory_service::InventoryService,
};

// =============================================================================
//  COMPOSIÇÃO (compartilhada entre aceite de cotações e checkout)
// =============================================================================

/// Uma linha já validada, pronta para virar linha + reserva.
#[derive(Debug, Clone)]
pub(crate) struct LineDraft {
    pub product: Product,
    pub quotation_id: Option<Uuid>,
    pub quantity: i32,
    pub window: RentalWindow,
    pub unit_price: Decimal,
    pub extras: Vec<PriceComponent>,
    pub line_total: Decimal,
}

/// Cria pedido do cliente, um pedido de locação por fornecedor, uma linha e
/// uma reserva por item, e segura o estoque. Pressupõe que as linhas de
/// estoque já estão travadas e que a disponibilidade já foi checada.
pub(crate) async fn compose(
    tx: &mut dyn RentalTx,
    customer_id: Uuid,
    payment_type: PaymentType,
    drafts: Vec<LineDraft>,
) -> Result<OrderBundle, AppError> {
    let (first, rest) = drafts
        .split_first()
        .ok_or_else(|| AppError::Validation("Nenhum item para compor o pedido.".into()))?;
    let window = rest.iter().fold(first.window, |acc, d| acc.union(&d.window));
    let total: Decimal = drafts.iter().map(|d| d.line_total).sum();

    let customer_order = tx
        .insert_customer_order(NewCustomerOrder {
            customer_id,
            status: CustomerOrderStatus::Pending,
            total_amount: total,
            payment_type,
            window: Some(window),
        })
        .await?;

    // Agrupa por fornecedor (ordem estável por id)
    let mut by_vendor: BTreeMap<Uuid, Vec<LineDraft>> = BTreeMap::new();
    for draft in drafts {
        by_vendor.entry(draft.product.owner_id).or_default().push(draft);
    }

    let mut bundle = OrderBundle {
        customer_order,
        rental_orders: Vec::with_capacity(by_vendor.len()),
        lines: vec![],
        reservations: vec![],
    };
    let mut touched = std::collections::BTreeSet::new();

    for (vendor_id, group) in by_vendor {
        let group_total: Decimal = group.iter().map(|d| d.line_total).sum();
        let rental_order = tx
            .insert_rental_order(bundle.customer_order.id, vendor_id, group_total)
            .await?;

        for draft in group {
            let reservation = tx
                .insert_reservation(NewReservation {
                    product_id: draft.product.id,
                    customer_order_id: Some(bundle.customer_order.id),
                    rental_order_id: Some(rental_order.id),
                    quotation_id: draft.quotation_id,
                    quantity: draft.quantity,
                    window: draft.window,
                    status: ReservationStatus::Reserved,
                })
                .await?;

            let line = tx
                .insert_line(NewRentalOrderLine {
                    rental_order_id: rental_order.id,
                    quotation_id: draft.quotation_id,
                    product_id: draft.product.id,
                    product_snapshot: ProductSnapshot::from(&draft.product),
                    quantity: draft.quantity,
                    window: draft.window,
                    unit_price: draft.unit_price,
                    extras: draft.extras,
                    line_total: draft.line_total,
                    reservation_id: Some(reservation.id),
                })
                .await?;

            touched.insert(draft.product.id);
            bundle.lines.push(line);
            bundle.reservations.push(reservation);
        }
        bundle.rental_orders.push(rental_order);
    }

    for product_id in touched {
        InventoryService::sync_holds(tx, product_id).await?;
    }

    Ok(bundle)
}

/// Recalcula os totais dos pedidos de locação e do pedido do cliente
/// (e a janela do pedido) a partir das linhas não canceladas.
pub(crate) async fn recompute_totals(
    tx: &mut dyn RentalTx,
    customer_order: CustomerOrder,
) -> Result<(CustomerOrder, Vec<RentalOrder>, Vec<RentalOrderLine>), AppError> {
    let rental_orders = tx.list_rental_orders(customer_order.id).await?;
    let ids: Vec<Uuid> = rental_orders.iter().map(|o| o.id).collect();
    let lines = tx.list_lines(&ids).await?;

    let live = |l: &&RentalOrderLine| l.status != LineStatus::Cancelled;

    let mut saved_orders = Vec::with_capacity(rental_orders.len());
    for order in rental_orders {
        let total: Decimal = lines
            .iter()
            .filter(live)
            .filter(|l| l.rental_order_id == order.id)
            .map(|l| l.line_total)
            .sum();
        if total != order.total_amount {
            let updated = RentalOrder { total_amount: total, ..order };
            saved_orders.push(tx.save_rental_order(&updated).await?);
        } else {
            saved_orders.push(order);
        }
    }

    let total: Decimal = lines.iter().filter(live).map(|l| l.line_total).sum();
    let window = lines
        .iter()
        .filter(live)
        .map(|l| l.window())
        .reduce(|acc, w| acc.union(&w));

    let next = CustomerOrder {
        total_amount: total,
        rent_from: window.map(|w| w.from),
        rent_to: window.map(|w| w.to),
        ..customer_order.clone()
    };
    let customer_order = if next != customer_order {
        tx.save_customer_order(&next).await?
    } else {
        customer_order
    };

    Ok((customer_order, saved_orders, lines))
}

pub(crate) async fn load_bundle(
    tx: &mut dyn RentalTx,
    customer_order: CustomerOrder,
) -> Result<OrderBundle, AppError> {
    let rental_orders = tx.list_rental_orders(customer_order.id).await?;
    let ids: Vec<Uuid> = rental_orders.iter().map(|o| o.id).collect();
    let lines = tx.list_lines(&ids).await?;

    let mut reservations = Vec::with_capacity(lines.len());
    for reservation_id in lines.iter().filter_map(|l| l.reservation_id) {
        if let Some(r) = tx.find_reservation(reservation_id).await? {
            reservations.push(r);
        }
    }

    Ok(OrderBundle { customer_order, rental_orders, lines, reservations })
}

/// Fecha pedido de locação e pedido do cliente quando não resta nada em andamento.
/// Tudo cancelado vira `cancelled`; caso contrário `completed`.
pub(crate) async fn advance_orders(tx: &mut dyn RentalTx, rental_order_id: Uuid) -> Result<(), AppError> {
    let rental_order = tx
        .find_rental_order(rental_order_id)
        .await?
        .ok_or_else(|| AppError::not_found("Pedido de locação", rental_order_id))?;
    let lines = tx.list_lines(&[rental_order.id]).await?;

    if !lines.is_empty() && lines.iter().all(|l| l.status.is_settled_physically()) {
        let target = if lines.iter().all(|l| l.status == LineStatus::Cancelled) {
            RentalOrderStatus::Cancelled
        } else {
            RentalOrderStatus::Completed
        };
        if rental_order.status.can_transition_to(target) {
            tx.save_rental_order(&RentalOrder { status: target, ..rental_order.clone() })
                .await?;
            tracing::info!("📋 Pedido de locação {} -> {:?}", rental_order.id, target);
        }
    }

    let customer_order = tx
        .find_customer_order(rental_order.customer_order_id)
        .await?
        .ok_or_else(|| AppError::not_found("Pedido do cliente", rental_order.customer_order_id))?;
    let siblings = tx.list_rental_orders(customer_order.id).await?;

    if !siblings.is_empty() && siblings.iter().all(|o| o.status.is_terminal()) {
        let target = if siblings.iter().all(|o| o.status == RentalOrderStatus::Cancelled) {
            CustomerOrderStatus::Cancelled
        } else {
            CustomerOrderStatus::Completed
        };
        if customer_order.status.can_transition_to(target) {
            tx.save_customer_order(&CustomerOrder { status: target, ..customer_order.clone() })
                .await?;
            tracing::info!("🧾 Pedido do cliente {} -> {:?}", customer_order.id, target);
        }
    }

    Ok(())
}

pub(crate) fn authorize_customer(principal: &Principal, order: &CustomerOrder) -> Result<(), AppError> {
    if order.customer_id == principal.id || principal.is_admin() {
        Ok(())
    } else {
        Err(AppError::Forbidden("Este pedido pertence a outro cliente.".into()))
    }
}

pub(crate) fn authorize_vendor(principal: &Principal, order: &RentalOrder) -> Result<(), AppError> {
    if order.vendor_id == principal.id || principal.is_admin() {
        Ok(())
    } else {
        Err(AppError::Forbidden("Este pedido de locação pertence a outro fornecedor.".into()))
    }
}

// =============================================================================
//  CONSULTAS
// =============================================================================

#[derive(Clone)]
pub struct OrderService {
    store: Arc<dyn RentalStore>,
    tx_timeout: Duration,
}

impl OrderService {
    pub fn new(store: Arc<dyn RentalStore>, tx_timeout: Duration) -> Self {
        Self { store, tx_timeout }
    }

    pub async fn get_customer_order(&self, principal: &Principal, id: Uuid) -> Result<OrderBundle, AppError> {
        tx::bounded(self.tx_timeout, "getCustomerOrder", async {
            let mut tx = self.store.begin().await?;
            let order = tx
                .find_customer_order(id)
                .await?
                .ok_or_else(|| AppError::not_found("Pedido do cliente", id))?;
            authorize_customer(principal, &order)?;
            load_bundle(tx.as_mut(), order).await
        })
        .await
    }

    /// Pedidos do próprio cliente (o carrinho em rascunho fica de fora).
    pub async fn list_customer_orders(&self, principal: &Principal) -> Result<Vec<CustomerOrder>, AppError> {
        tx::bounded(self.tx_timeout, "listCustomerOrders", async {
            let mut tx = self.store.begin().await?;
            tx.list_customer_orders(principal.id).await
        })
        .await
    }

    pub async fn list_vendor_orders(&self, principal: &Principal) -> Result<Vec<RentalOrder>, AppError> {
        tx::bounded(self.tx_timeout, "listVendorOrders", async {
            let mut tx = self.store.begin().await?;
            tx.list_vendor_rental_orders(principal.id).await
        })
        .await
    }

    pub async fn get_rental_order(&self, principal: &Principal, id: Uuid) -> Result<RentalOrderDetail, AppError> {
        tx::bounded(self.tx_timeout, "getRentalOrder", async {
            let mut tx = self.store.begin().await?;
            let rental_order = tx
                .find_rental_order(id)
                .await?
                .ok_or_else(|| AppError::not_found("Pedido de locação", id))?;

            // O fornecedor da fatia ou o cliente dono do pedido
            if authorize_vendor(principal, &rental_order).is_err() {
                let customer_order = tx
                    .find_customer_order(rental_order.customer_order_id)
                    .await?
                    .ok_or_else(|| AppError::not_found("Pedido do cliente", rental_order.customer_order_id))?;
                authorize_customer(principal, &customer_order)?;
            }

            let lines = tx.list_lines(&[rental_order.id]).await?;
            Ok(RentalOrderDetail { rental_order, lines })
        })
        .await
    }
}
