// src/services/quotation_service.rs

use std::{collections::HashMap, sync::Arc, time::Duration};

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde_json::json;
use uuid::Uuid;

use crate::{
    common::{error::AppError, lifecycle::Lifecycle, tx},
    db::store::RentalStore,
    models::{
        auth::{Principal, Role},
        notification::{NotificationKind, NotificationMessage},
        orders::{OrderBundle, PaymentType},
        quotation::{NewQuotation, Quotation, QuotationFilter, QuotationPatch, QuotationStatus},
        reservation::RentalWindow,
    },
    services::{
        inventory_service::InventoryService,
        notification_service::{dispatch, Notifier},
        order_service::{compose, LineDraft},
        product_service::owned_product,
    },
};

#[derive(Clone)]
pub struct QuotationService {
    store: Arc<dyn RentalStore>,
    tx_timeout: Duration,
    notifier: Arc<dyn Notifier>,
}

fn validate_terms(quantity: i32, total: Decimal) -> Result<(), AppError> {
    if quantity < 1 {
        return Err(AppError::Validation("A quantidade deve ser pelo menos 1.".into()));
    }
    if total.is_sign_negative() {
        return Err(AppError::Validation("O valor total não pode ser negativo.".into()));
    }
    Ok(())
}

impl QuotationService {
    pub fn new(store: Arc<dyn RentalStore>, tx_timeout: Duration, notifier: Arc<dyn Notifier>) -> Self {
        Self { store, tx_timeout, notifier }
    }

    // --- CREATE ---
    pub async fn create_quotation(&self, principal: &Principal, new: NewQuotation) -> Result<Quotation, AppError> {
        RentalWindow::new(new.pickup_at, new.return_at)?;
        validate_terms(new.requested_quantity, new.total_amount)?;

        let quotation = tx::bounded(self.tx_timeout, "createQuotation", async {
            let mut tx = self.store.begin().await?;
            let product = owned_product(tx.as_mut(), principal, new.product_id).await?;
            let quotation = tx.insert_quotation(product.owner_id, new).await?;
            tx.commit().await?;
            Ok(quotation)
        })
        .await?;

        tracing::info!("💬 Cotação {} criada para o produto {}", quotation.id, quotation.product_id);

        if let Some(customer_id) = quotation.customer_id {
            let msg = NotificationMessage::new(
                customer_id,
                NotificationKind::QuotationCreated,
                "Nova cotação",
                format!("Você recebeu uma cotação de {}.", quotation.total_amount),
                json!({ "quotationId": quotation.id }),
            );
            dispatch(self.notifier.as_ref(), vec![msg]).await;
        }
        Ok(quotation)
    }

    // --- UPDATE ---
    pub async fn update_quotation(
        &self,
        principal: &Principal,
        id: Uuid,
        patch: QuotationPatch,
        now: DateTime<Utc>,
    ) -> Result<Quotation, AppError> {
        let quotation = tx::bounded(self.tx_timeout, "updateQuotation", async {
            let mut tx = self.store.begin().await?;
            let current = tx
                .find_quotation(id)
                .await?
                .ok_or_else(|| AppError::not_found("Cotação", id))?;

            if current.owner_id != principal.id && !principal.is_admin() {
                return Err(AppError::Forbidden("Apenas o fornecedor da cotação pode editá-la.".into()));
            }
            if !current.is_open(now) {
                return Err(AppError::Conflict(format!(
                    "A cotação {} não está pendente e não pode ser editada.",
                    id
                )));
            }

            let next = Quotation {
                requested_quantity: patch.requested_quantity.unwrap_or(current.requested_quantity),
                charges: patch.charges.unwrap_or(current.charges),
                pickup_at: patch.pickup_at.unwrap_or(current.pickup_at),
                return_at: patch.return_at.unwrap_or(current.return_at),
                pickup_address: patch.pickup_address.or(current.pickup_address.clone()),
                return_address: patch.return_address.or(current.return_address.clone()),
                pricing_breakdown: patch
                    .pricing_breakdown
                    .unwrap_or_else(|| current.pricing_breakdown.clone()),
                total_amount: patch.total_amount.unwrap_or(current.total_amount),
                expires_at: patch.expires_at.or(current.expires_at),
                ..current.clone()
            };
            RentalWindow::new(next.pickup_at, next.return_at)?;
            validate_terms(next.requested_quantity, next.total_amount)?;

            let saved = tx.save_quotation(&next).await?;
            tx.commit().await?;
            Ok(saved)
        })
        .await?;

        tracing::info!("💬 Cotação {} atualizada", quotation.id);
        Ok(quotation)
    }

    pub async fn cancel_quotation(&self, principal: &Principal, id: Uuid) -> Result<Quotation, AppError> {
        tx::bounded(self.tx_timeout, "cancelQuotation", async {
            let mut tx = self.store.begin().await?;
            let current = tx
                .find_quotation(id)
                .await?
                .ok_or_else(|| AppError::not_found("Cotação", id))?;
            if current.owner_id != principal.id && !principal.is_admin() {
                return Err(AppError::Forbidden("Apenas o fornecedor da cotação pode cancelá-la.".into()));
            }
            let status = current.status.transition(QuotationStatus::Cancelled)?;
            let saved = tx.save_quotation(&Quotation { status, ..current }).await?;
            tx.commit().await?;
            Ok(saved)
        })
        .await
    }

    // --- READ ---
    pub async fn get_quotation(&self, principal: &Principal, id: Uuid) -> Result<Quotation, AppError> {
        tx::bounded(self.tx_timeout, "getQuotation", async {
            let mut tx = self.store.begin().await?;
            let quotation = tx
                .find_quotation(id)
                .await?
                .ok_or_else(|| AppError::not_found("Cotação", id))?;

            let visible = principal.is_admin()
                || quotation.owner_id == principal.id
                || quotation.customer_id.is_none_or(|c| c == principal.id);
            if !visible {
                return Err(AppError::Forbidden("Esta cotação é destinada a outro cliente.".into()));
            }
            Ok(quotation)
        })
        .await
    }

    /// Fornecedor vê as suas; cliente vê as endereçadas a ele; admin vê tudo.
    pub async fn list_quotations(
        &self,
        principal: &Principal,
        filter: QuotationFilter,
    ) -> Result<Vec<Quotation>, AppError> {
        let filter = match principal.role {
            Role::Admin => filter,
            Role::Vendor => QuotationFilter { vendor_id: Some(principal.id), ..filter },
            Role::Customer => QuotationFilter { customer_id: Some(principal.id), ..filter },
        };

        tx::bounded(self.tx_timeout, "listQuotations", async {
            let mut tx = self.store.begin().await?;
            tx.list_quotations(&filter).await
        })
        .await
    }

    // --- ACCEPT MANY ---
    /// Aceita N cotações de uma vez: tudo ou nada.
    ///
    /// Todas as checagens (existência, status, dono, disponibilidade) rodam
    /// antes da primeira escrita, e todas as escritas estão numa só transação.
    pub async fn accept_many(
        &self,
        principal: &Principal,
        ids: &[Uuid],
        payment_type: PaymentType,
        now: DateTime<Utc>,
    ) -> Result<OrderBundle, AppError> {
        if ids.is_empty() {
            return Err(AppError::Validation("Informe pelo menos uma cotação.".into()));
        }
        let mut unique: Vec<Uuid> = ids.to_vec();
        unique.sort();
        unique.dedup();
        if unique.len() != ids.len() {
            return Err(AppError::Validation("A mesma cotação foi informada mais de uma vez.".into()));
        }

        let bundle = tx::bounded(self.tx_timeout, "acceptMany", async {
            let mut tx = self.store.begin().await?;

            // 1. Existem e estão pendentes
            let quotations = tx.find_quotations_for_update(&unique).await?;
            let mut by_id: HashMap<Uuid, Quotation> = quotations.into_iter().map(|q| (q.id, q)).collect();
            let mut ordered = Vec::with_capacity(ids.len());
            for id in ids {
                let quotation = by_id
                    .remove(id)
                    .ok_or_else(|| AppError::Validation(format!("Cotação {} não encontrada.", id)))?;
                if !quotation.is_open(now) {
                    return Err(AppError::Validation(format!(
                        "Cotação {} não está pendente ({:?}).",
                        id, quotation.status
                    )));
                }
                ordered.push(quotation);
            }

            // 2. Endereçadas a este cliente (ou abertas)
            if let Some(q) = ordered
                .iter()
                .find(|q| q.customer_id.is_some_and(|c| c != principal.id))
            {
                return Err(AppError::Forbidden(format!(
                    "A cotação {} foi emitida para outro cliente.",
                    q.id
                )));
            }

            // 3. Disponibilidade, com as linhas de estoque travadas em ordem
            let inventories =
                InventoryService::lock_products(tx.as_mut(), ordered.iter().map(|q| q.product_id)).await?;
            let mut drafts = Vec::with_capacity(ordered.len());
            for (i, q) in ordered.iter().enumerate() {
                let window = q.window();
                let inventory = inventories
                    .get(&q.product_id)
                    .ok_or_else(|| AppError::not_found("Estoque do produto", q.product_id))?;
                // O que este mesmo lote já pediu do produto na janela
                let pending: i64 = ordered[..i]
                    .iter()
                    .filter(|p| p.product_id == q.product_id && p.window().overlaps(&window))
                    .map(|p| i64::from(p.requested_quantity))
                    .sum();
                InventoryService::ensure_capacity(tx.as_mut(), inventory, window, q.requested_quantity, pending)
                    .await?;

                let product = tx
                    .find_product(q.product_id)
                    .await?
                    .ok_or_else(|| AppError::not_found("Produto", q.product_id))?;
                drafts.push(LineDraft {
                    product,
                    quotation_id: Some(q.id),
                    quantity: q.requested_quantity,
                    window,
                    unit_price: q.total_amount / Decimal::from(q.requested_quantity),
                    extras: q.pricing_breakdown.clone(),
                    line_total: q.total_amount,
                });
            }

            // 4. Escritas
            let bundle = compose(tx.as_mut(), principal.id, payment_type, drafts).await?;
            tx.set_quotations_status(&unique, QuotationStatus::Accepted).await?;

            tx.commit().await?;
            Ok(bundle)
        })
        .await?;

        tracing::info!(
            "✅ {} cotação(ões) aceitas: pedido {} com {} pedido(s) de locação",
            ids.len(),
            bundle.customer_order.id,
            bundle.rental_orders.len()
        );

        let mut messages = vec![NotificationMessage::new(
            principal.id,
            NotificationKind::OrderCreated,
            "Pedido criado",
            format!("Seu pedido de {} foi criado.", bundle.customer_order.total_amount),
            json!({ "customerOrderId": bundle.customer_order.id }),
        )];
        messages.extend(bundle.rental_orders.iter().map(|ro| {
            NotificationMessage::new(
                ro.vendor_id,
                NotificationKind::OrderCreated,
                "Novo pedido de locação",
                format!("Você recebeu um pedido de {}.", ro.total_amount),
                json!({ "rentalOrderId": ro.id }),
            )
        }));
        dispatch(self.notifier.as_ref(), messages).await;

        Ok(bundle)
    }
}
