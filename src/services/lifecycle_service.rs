// src/services/lifecycle_service.rs

use std::{sync::Arc, time::Duration};

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde_json::json;
use uuid::Uuid;

use crate::{
    common::{error::AppError, lifecycle::Lifecycle, tx},
    db::store::{RentalStore, RentalTx},
    models::{
        auth::Principal,
        notification::{NotificationKind, NotificationMessage},
        orders::{
            CustomerOrder, CustomerOrderStatus, LineStatus, PaymentStatus, RentalOrder,
            RentalOrderLine, RentalOrderStatus, ReturnOutcome, TransferDetails, TransferKind,
        },
        quotation::Charges,
        reservation::ReservationStatus,
    },
    services::{
        inventory_service::InventoryService,
        notification_service::{dispatch, Notifier},
        order_service::{advance_orders, authorize_customer, authorize_vendor, recompute_totals},
        payment_gateway::{PaymentGateway, PaymentLinkRequest},
        settlement::{late_fee, remaining_balance},
    },
};

/// Linha com os dois pedidos acima dela.
struct LineContext {
    line: RentalOrderLine,
    rental_order: RentalOrder,
    customer_order: CustomerOrder,
}

async fn load_line(tx: &mut dyn RentalTx, line_id: Uuid) -> Result<LineContext, AppError> {
    let line = tx
        .find_line(line_id)
        .await?
        .ok_or_else(|| AppError::not_found("Linha do pedido", line_id))?;
    let rental_order = tx
        .find_rental_order(line.rental_order_id)
        .await?
        .ok_or_else(|| AppError::not_found("Pedido de locação", line.rental_order_id))?;
    let customer_order = tx
        .find_customer_order(rental_order.customer_order_id)
        .await?
        .ok_or_else(|| AppError::not_found("Pedido do cliente", rental_order.customer_order_id))?;
    Ok(LineContext { line, rental_order, customer_order })
}

fn ensure_committed(order: &CustomerOrder) -> Result<(), AppError> {
    if order.status == CustomerOrderStatus::Draft {
        return Err(AppError::Conflict("O pedido ainda está no carrinho.".into()));
    }
    Ok(())
}

/// Solta a reserva da linha (se houver) e reconcilia o estoque.
async fn release_reservation(
    tx: &mut dyn RentalTx,
    line: &RentalOrderLine,
    next: ReservationStatus,
) -> Result<(), AppError> {
    let Some(reservation_id) = line.reservation_id else {
        return Ok(());
    };
    let reservation = tx
        .find_reservation(reservation_id)
        .await?
        .ok_or_else(|| AppError::not_found("Reserva", reservation_id))?;
    if !reservation.is_holding() {
        return Ok(());
    }
    reservation.status.transition(next)?;
    tx.set_reservation_status(reservation.id, next).await?;
    InventoryService::sync_holds(tx, line.product_id).await?;
    Ok(())
}

/// Cancela uma linha: reserva cancelada e estoque liberado na hora.
async fn cancel_line_in_tx(tx: &mut dyn RentalTx, line: RentalOrderLine) -> Result<RentalOrderLine, AppError> {
    if line.returned_at.is_some() {
        return Err(AppError::Conflict(format!(
            "A linha {} já foi devolvida e não pode ser cancelada.",
            line.id
        )));
    }
    let status = line.status.transition(LineStatus::Cancelled)?;
    release_reservation(tx, &line, ReservationStatus::Cancelled).await?;
    tx.save_line(&RentalOrderLine { status, ..line }).await
}

#[derive(Clone)]
pub struct LifecycleService {
    store: Arc<dyn RentalStore>,
    tx_timeout: Duration,
    notifier: Arc<dyn Notifier>,
    gateway: Arc<dyn PaymentGateway>,
}

impl LifecycleService {
    pub fn new(
        store: Arc<dyn RentalStore>,
        tx_timeout: Duration,
        notifier: Arc<dyn Notifier>,
        gateway: Arc<dyn PaymentGateway>,
    ) -> Self {
        Self { store, tx_timeout, notifier, gateway }
    }

    // =========================================================================
    //  RETIRADA
    // =========================================================================

    /// `reserved -> picked`. A reserva vira `active`; o estoque já foi
    /// segurado no aceite ou no checkout.
    pub async fn pickup(
        &self,
        principal: &Principal,
        line_id: Uuid,
        details: TransferDetails,
    ) -> Result<RentalOrderLine, AppError> {
        let (line, customer_id) = tx::bounded(self.tx_timeout, "pickup", async {
            let mut tx = self.store.begin().await?;
            let LineContext { line, rental_order, customer_order } = load_line(tx.as_mut(), line_id).await?;
            authorize_vendor(principal, &rental_order)?;
            ensure_committed(&customer_order)?;
            let status = line.status.transition(LineStatus::Picked)?;

            // Toda linha confirmada já nasce com a reserva que segura o estoque
            let reservation_id = line.reservation_id.ok_or_else(|| {
                AppError::Conflict(format!("A linha {} não tem reserva para retirar.", line.id))
            })?;
            let reservation = tx
                .find_reservation(reservation_id)
                .await?
                .ok_or_else(|| AppError::not_found("Reserva", reservation_id))?;
            let next = reservation.status.transition(ReservationStatus::Active)?;
            tx.set_reservation_status(reservation.id, next).await?;

            let transfer = tx
                .insert_transfer(line.id, TransferKind::Pickup, &details, principal.id)
                .await?;
            let line = tx
                .save_line(&RentalOrderLine {
                    status,
                    transfer_id: Some(transfer.id),
                    ..line
                })
                .await?;

            if rental_order.status != RentalOrderStatus::InProgress
                && rental_order.status.can_transition_to(RentalOrderStatus::InProgress)
            {
                tx.save_rental_order(&RentalOrder { status: RentalOrderStatus::InProgress, ..rental_order })
                    .await?;
            }

            tx.commit().await?;
            Ok((line, customer_order.customer_id))
        })
        .await?;

        tracing::info!("🚚 Linha {} retirada", line.id);
        let msg = NotificationMessage::new(
            customer_id,
            NotificationKind::PickupScheduled,
            "Retirada registrada",
            format!("{} foi retirado.", line.product_snapshot.name),
            json!({ "orderLineId": line.id, "transferId": line.transfer_id }),
        );
        dispatch(self.notifier.as_ref(), vec![msg]).await;
        Ok(line)
    }

    /// `picked -> in_use`.
    pub async fn start_use(&self, principal: &Principal, line_id: Uuid) -> Result<RentalOrderLine, AppError> {
        tx::bounded(self.tx_timeout, "startUse", async {
            let mut tx = self.store.begin().await?;
            let LineContext { line, rental_order, .. } = load_line(tx.as_mut(), line_id).await?;
            authorize_vendor(principal, &rental_order)?;
            if line.returned_at.is_some() {
                return Err(AppError::Conflict("A devolução desta linha já foi iniciada.".into()));
            }
            let status = line.status.transition(LineStatus::InUse)?;
            let line = tx.save_line(&RentalOrderLine { status, ..line }).await?;
            tx.commit().await?;
            Ok(line)
        })
        .await
    }

    // =========================================================================
    //  DEVOLUÇÃO
    // =========================================================================

    /// Devolução em duas etapas:
    /// 1. numa transação: libera o estoque, calcula multa e saldo e grava
    ///    `returned_at` (ou fecha como `returned_paid` se não há saldo);
    /// 2. fora dela, pede o link ao gateway e grava `returned_pending_payment`.
    ///
    /// Se o gateway falhar a operação retorna erro, e repetir a chamada pula
    /// a etapa 1 (o estoque já voltou) e tenta só o link de novo.
    pub async fn return_line(
        &self,
        principal: &Principal,
        line_id: Uuid,
        details: TransferDetails,
        now: DateTime<Utc>,
    ) -> Result<ReturnOutcome, AppError> {
        let (line, customer_id) = tx::bounded(self.tx_timeout, "returnLine", async {
            let mut tx = self.store.begin().await?;
            let LineContext { line, rental_order, customer_order } = load_line(tx.as_mut(), line_id).await?;
            authorize_vendor(principal, &rental_order)?;

            if line.status.is_returned() {
                return Err(AppError::Conflict(format!("A linha {} já foi devolvida.", line.id)));
            }
            // Retomada: estoque já liberado numa tentativa anterior
            if line.returned_at.is_some() {
                return Ok((line, customer_order.customer_id));
            }
            if !line.status.can_transition_to(LineStatus::ReturnedPaid) {
                return Err(AppError::Conflict(format!(
                    "A linha {} ainda não foi retirada ({:?}).",
                    line.id, line.status
                )));
            }

            let (charges, agreed_total) = match line.quotation_id {
                Some(quotation_id) => {
                    let quotation = tx
                        .find_quotation(quotation_id)
                        .await?
                        .ok_or_else(|| AppError::not_found("Cotação", quotation_id))?;
                    (quotation.charges, quotation.total_amount)
                }
                None => (Charges::default(), line.line_total),
            };
            let fee = late_fee(line.to_at, now, &charges);
            let remaining =
                remaining_balance(customer_order.payment_type, agreed_total, customer_order.paid_amount) + fee;

            // Estoque volta independente do pagamento
            release_reservation(tx.as_mut(), &line, ReservationStatus::Returned).await?;
            let transfer = tx
                .insert_transfer(line.id, TransferKind::Return, &details, principal.id)
                .await?;

            let status = if remaining.is_zero() { LineStatus::ReturnedPaid } else { line.status };
            let line = tx
                .save_line(&RentalOrderLine {
                    status,
                    late_fee: fee,
                    remaining_amount: remaining,
                    returned_at: Some(now),
                    transfer_id: Some(transfer.id),
                    ..line
                })
                .await?;
            if line.status.is_returned() {
                advance_orders(tx.as_mut(), line.rental_order_id).await?;
            }

            tx.commit().await?;
            Ok((line, customer_order.customer_id))
        })
        .await?;

        if line.status == LineStatus::ReturnedPaid {
            tracing::info!("📥 Linha {} devolvida e quitada", line.id);
            self.notify_returned(customer_id, &line).await;
            return Ok(ReturnOutcome {
                late_fee: line.late_fee,
                remaining_amount: line.remaining_amount,
                payment_link_url: None,
                line,
            });
        }

        // Fora da transação: o gateway pode demorar
        let request = PaymentLinkRequest {
            customer_id,
            amount: line.remaining_amount,
            description: format!("Saldo da locação: {}", line.product_snapshot.name),
            reference_id: line.id,
        };
        let link = self.gateway.create_payment_link(&request).await.inspect_err(|e| {
            tracing::error!("💳 Link de pagamento da linha {} falhou: {}", line.id, e);
        })?;

        let line = tx::bounded(self.tx_timeout, "returnLine.paymentLink", async {
            let mut tx = self.store.begin().await?;
            let current = tx
                .find_line(line.id)
                .await?
                .ok_or_else(|| AppError::not_found("Linha do pedido", line.id))?;
            let status = current.status.transition(LineStatus::ReturnedPendingPayment)?;
            let saved = tx
                .save_line(&RentalOrderLine {
                    status,
                    payment_link_id: Some(link.id.clone()),
                    payment_link_url: Some(link.short_url.clone()),
                    ..current
                })
                .await?;
            advance_orders(tx.as_mut(), saved.rental_order_id).await?;
            tx.commit().await?;
            Ok(saved)
        })
        .await?;

        tracing::info!(
            "📥 Linha {} devolvida, saldo {} cobrado via {}",
            line.id,
            line.remaining_amount,
            link.id
        );
        self.notify_returned(customer_id, &line).await;
        let msg = NotificationMessage::new(
            customer_id,
            NotificationKind::PaymentRequested,
            "Pagamento pendente",
            format!("Há um saldo de {} a pagar.", line.remaining_amount),
            json!({ "orderLineId": line.id, "paymentLink": link.short_url }),
        );
        dispatch(self.notifier.as_ref(), vec![msg]).await;

        Ok(ReturnOutcome {
            late_fee: line.late_fee,
            remaining_amount: line.remaining_amount,
            payment_link_url: line.payment_link_url.clone(),
            line,
        })
    }

    async fn notify_returned(&self, customer_id: Uuid, line: &RentalOrderLine) {
        let msg = NotificationMessage::new(
            customer_id,
            NotificationKind::ItemReturned,
            "Devolução registrada",
            format!("{} foi devolvido.", line.product_snapshot.name),
            json!({ "orderLineId": line.id, "lateFee": line.late_fee }),
        );
        dispatch(self.notifier.as_ref(), vec![msg]).await;
    }

    /// Webhook do gateway: o link foi pago.
    /// Sem valor informado, vale o saldo cobrado na linha.
    /// Redelivery de um link já quitado não soma o valor de novo.
    pub async fn settle_payment_link(
        &self,
        link_id: &str,
        amount: Option<Decimal>,
    ) -> Result<RentalOrderLine, AppError> {
        if amount.is_some_and(|a| a.is_sign_negative()) {
            return Err(AppError::Validation("Valor pago inválido.".into()));
        }

        let line = tx::bounded(self.tx_timeout, "settlePaymentLink", async {
            let mut tx = self.store.begin().await?;
            let line = tx
                .find_line_by_payment_link(link_id)
                .await?
                .ok_or_else(|| AppError::not_found("Link de pagamento", link_id))?;
            if line.status == LineStatus::ReturnedPaid {
                return Ok(line);
            }
            let status = line.status.transition(LineStatus::ReturnedPaid)?;
            let amount = amount.unwrap_or(line.remaining_amount);

            let LineContext { customer_order, .. } = load_line(tx.as_mut(), line.id).await?;
            let paid_amount = customer_order.paid_amount + amount;
            let fully_paid = paid_amount >= customer_order.total_amount;
            let order_status = if fully_paid && customer_order.status.can_transition_to(CustomerOrderStatus::Paid) {
                CustomerOrderStatus::Paid
            } else {
                customer_order.status
            };
            tx.save_customer_order(&CustomerOrder {
                paid_amount,
                payment_status: if fully_paid { PaymentStatus::Paid } else { customer_order.payment_status },
                status: order_status,
                ..customer_order
            })
            .await?;

            let line = tx
                .save_line(&RentalOrderLine { status, remaining_amount: Decimal::ZERO, ..line })
                .await?;
            advance_orders(tx.as_mut(), line.rental_order_id).await?;
            tx.commit().await?;
            Ok(line)
        })
        .await?;

        tracing::info!("💰 Link {} quitado, linha {}", link_id, line.id);
        Ok(line)
    }

    // =========================================================================
    //  CANCELAMENTOS
    // =========================================================================

    pub async fn cancel_line(&self, principal: &Principal, line_id: Uuid) -> Result<RentalOrderLine, AppError> {
        let line = tx::bounded(self.tx_timeout, "cancelLine", async {
            let mut tx = self.store.begin().await?;
            let LineContext { line, rental_order, customer_order } = load_line(tx.as_mut(), line_id).await?;
            if authorize_vendor(principal, &rental_order).is_err() {
                authorize_customer(principal, &customer_order)?;
            }
            ensure_committed(&customer_order)?;

            let line = cancel_line_in_tx(tx.as_mut(), line).await?;
            recompute_totals(tx.as_mut(), customer_order).await?;
            advance_orders(tx.as_mut(), rental_order.id).await?;
            tx.commit().await?;
            Ok(line)
        })
        .await?;

        tracing::info!("❌ Linha {} cancelada", line.id);
        Ok(line)
    }

    /// Cancela a fatia do fornecedor e todas as suas linhas.
    pub async fn cancel_rental_order(&self, principal: &Principal, id: Uuid) -> Result<RentalOrder, AppError> {
        let order = tx::bounded(self.tx_timeout, "cancelRentalOrder", async {
            let mut tx = self.store.begin().await?;
            let rental_order = tx
                .find_rental_order(id)
                .await?
                .ok_or_else(|| AppError::not_found("Pedido de locação", id))?;
            let customer_order = tx
                .find_customer_order(rental_order.customer_order_id)
                .await?
                .ok_or_else(|| AppError::not_found("Pedido do cliente", rental_order.customer_order_id))?;
            if authorize_vendor(principal, &rental_order).is_err() {
                authorize_customer(principal, &customer_order)?;
            }
            ensure_committed(&customer_order)?;

            let order = Self::cancel_rental_order_in_tx(tx.as_mut(), rental_order).await?;
            recompute_totals(tx.as_mut(), customer_order).await?;
            advance_orders(tx.as_mut(), order.id).await?;
            tx.commit().await?;
            Ok(order)
        })
        .await?;

        tracing::info!("❌ Pedido de locação {} cancelado", order.id);
        Ok(order)
    }

    async fn cancel_rental_order_in_tx(
        tx: &mut dyn RentalTx,
        rental_order: RentalOrder,
    ) -> Result<RentalOrder, AppError> {
        let status = rental_order.status.transition(RentalOrderStatus::Cancelled)?;
        for line in tx.list_lines(&[rental_order.id]).await? {
            if line.status != LineStatus::Cancelled {
                cancel_line_in_tx(tx, line).await?;
            }
        }
        tx.save_rental_order(&RentalOrder { status, ..rental_order }).await
    }

    /// Cancela o pedido inteiro, em cascata.
    pub async fn cancel_customer_order(&self, principal: &Principal, id: Uuid) -> Result<CustomerOrder, AppError> {
        let order = tx::bounded(self.tx_timeout, "cancelCustomerOrder", async {
            let mut tx = self.store.begin().await?;
            let customer_order = tx
                .find_customer_order(id)
                .await?
                .ok_or_else(|| AppError::not_found("Pedido do cliente", id))?;
            authorize_customer(principal, &customer_order)?;
            let status = customer_order.status.transition(CustomerOrderStatus::Cancelled)?;

            for rental_order in tx.list_rental_orders(customer_order.id).await? {
                if rental_order.status != RentalOrderStatus::Cancelled {
                    Self::cancel_rental_order_in_tx(tx.as_mut(), rental_order).await?;
                }
            }
            let order = tx
                .save_customer_order(&CustomerOrder { status, ..customer_order })
                .await?;
            let (order, _, _) = recompute_totals(tx.as_mut(), order).await?;
            tx.commit().await?;
            Ok(order)
        })
        .await?;

        tracing::info!("❌ Pedido do cliente {} cancelado", order.id);
        Ok(order)
    }

    /// Mudança manual de status pelo fornecedor, validada pela tabela.
    pub async fn update_rental_order_status(
        &self,
        principal: &Principal,
        id: Uuid,
        next: RentalOrderStatus,
    ) -> Result<RentalOrder, AppError> {
        if next == RentalOrderStatus::Cancelled {
            return self.cancel_rental_order(principal, id).await;
        }

        tx::bounded(self.tx_timeout, "updateRentalOrderStatus", async {
            let mut tx = self.store.begin().await?;
            let rental_order = tx
                .find_rental_order(id)
                .await?
                .ok_or_else(|| AppError::not_found("Pedido de locação", id))?;
            authorize_vendor(principal, &rental_order)?;
            let status = rental_order.status.transition(next)?;

            if status == RentalOrderStatus::Completed {
                let lines = tx.list_lines(&[rental_order.id]).await?;
                if !lines.iter().all(|l| l.status.is_settled_physically()) {
                    return Err(AppError::Conflict(
                        "Ainda há itens com o cliente neste pedido de locação.".into(),
                    ));
                }
            }

            let order = tx.save_rental_order(&RentalOrder { status, ..rental_order }).await?;
            advance_orders(tx.as_mut(), order.id).await?;
            tx.commit().await?;
            Ok(order)
        })
        .await
    }
}
