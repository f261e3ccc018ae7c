// src/services/cart_service.rs

use std::{collections::BTreeSet, sync::Arc, time::Duration};

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
            CartView, CustomerOrder, CustomerOrderStatus, NewCustomerOrder, NewRentalOrderLine,
            OrderBundle, PaymentType, RentalOrder, RentalOrderLine,
        },
        product::{Product, ProductSnapshot, ProductStatus},
        reservation::{NewReservation, RentalWindow, ReservationStatus},
    },
    services::{
        inventory_service::InventoryService,
        notification_service::{dispatch, Notifier},
        order_service::{authorize_customer, load_bundle, recompute_totals},
    },
};

/// Campos alteráveis de um item do carrinho.
#[derive(Debug, Clone, Default)]
pub struct CartItemPatch {
    pub quantity: Option<i32>,
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
}

/// Diária × quantidade × dias (fração de dia conta como dia inteiro).
pub fn cart_line_total(daily_rate: Decimal, quantity: i32, window: &RentalWindow) -> Decimal {
    daily_rate * Decimal::from(quantity) * Decimal::from(window.billable_days())
}

fn future_window(from: DateTime<Utc>, to: DateTime<Utc>, now: DateTime<Utc>) -> Result<RentalWindow, AppError> {
    if from < now {
        return Err(AppError::Validation("A data de retirada não pode estar no passado.".into()));
    }
    RentalWindow::new(from, to)
}

fn validate_quantity(quantity: i32) -> Result<(), AppError> {
    if quantity < 1 {
        return Err(AppError::Validation("A quantidade deve ser pelo menos 1.".into()));
    }
    Ok(())
}

/// Checagem grossa pelo contador agregado. Ainda não segura nada.
async fn coarse_check(tx: &mut dyn RentalTx, product: &Product, quantity: i32) -> Result<(), AppError> {
    if product.status != ProductStatus::Available {
        return Err(AppError::Validation(format!(
            "O produto {} não está disponível para locação.",
            product.id
        )));
    }
    let inventory = tx
        .lock_inventory(product.id)
        .await?
        .ok_or_else(|| AppError::not_found("Estoque do produto", product.id))?;
    if inventory.available_quantity < quantity {
        return Err(AppError::Conflict(format!(
            "Estoque insuficiente para o produto {}: {} disponível(is).",
            product.id, inventory.available_quantity
        )));
    }
    Ok(())
}

/// Linha + pedidos que a contêm, com a posse e o rascunho verificados.
async fn draft_line(
    tx: &mut dyn RentalTx,
    principal: &Principal,
    line_id: Uuid,
) -> Result<(RentalOrderLine, RentalOrder, CustomerOrder), AppError> {
    let line = tx
        .find_line(line_id)
        .await?
        .ok_or_else(|| AppError::not_found("Item do carrinho", line_id))?;
    let rental_order = tx
        .find_rental_order(line.rental_order_id)
        .await?
        .ok_or_else(|| AppError::not_found("Pedido de locação", line.rental_order_id))?;
    let customer_order = tx
        .find_customer_order(rental_order.customer_order_id)
        .await?
        .ok_or_else(|| AppError::not_found("Pedido do cliente", rental_order.customer_order_id))?;

    authorize_customer(principal, &customer_order)?;
    if customer_order.status != CustomerOrderStatus::Draft {
        return Err(AppError::Conflict("Este item não está mais no carrinho.".into()));
    }
    Ok((line, rental_order, customer_order))
}

fn cart_view(customer_order: CustomerOrder, rental_orders: Vec<RentalOrder>, lines: Vec<RentalOrderLine>) -> CartView {
    CartView {
        total_amount: customer_order.total_amount,
        customer_order: Some(customer_order),
        rental_orders,
        lines,
    }
}

#[derive(Clone)]
pub struct CartService {
    store: Arc<dyn RentalStore>,
    tx_timeout: Duration,
    notifier: Arc<dyn Notifier>,
}

impl CartService {
    pub fn new(store: Arc<dyn RentalStore>, tx_timeout: Duration, notifier: Arc<dyn Notifier>) -> Self {
        Self { store, tx_timeout, notifier }
    }

    // --- ADD ---
    pub async fn add_to_cart(
        &self,
        principal: &Principal,
        product_id: Uuid,
        quantity: i32,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Result<CartView, AppError> {
        let window = future_window(from, to, now)?;
        validate_quantity(quantity)?;

        let view = tx::bounded(self.tx_timeout, "addToCart", async {
            let mut tx = self.store.begin().await?;
            let product = tx
                .find_product(product_id)
                .await?
                .ok_or_else(|| AppError::not_found("Produto", product_id))?;
            coarse_check(tx.as_mut(), &product, quantity).await?;

            let customer_order = match tx.find_draft_order(principal.id).await? {
                Some(order) => order,
                None => {
                    tx.insert_customer_order(NewCustomerOrder {
                        customer_id: principal.id,
                        status: CustomerOrderStatus::Draft,
                        total_amount: Decimal::ZERO,
                        payment_type: PaymentType::PartialDeposit,
                        window: Some(window),
                    })
                    .await?
                }
            };

            let rental_order = match tx
                .find_rental_order_for_vendor(customer_order.id, product.owner_id)
                .await?
            {
                Some(order) => order,
                None => {
                    tx.insert_rental_order(customer_order.id, product.owner_id, Decimal::ZERO)
                        .await?
                }
            };

            if tx.find_line_for_product(rental_order.id, product.id).await?.is_some() {
                return Err(AppError::Conflict(
                    "Este produto já está no carrinho. Altere a quantidade do item existente.".into(),
                ));
            }

            tx.insert_line(NewRentalOrderLine {
                rental_order_id: rental_order.id,
                quotation_id: None,
                product_id: product.id,
                product_snapshot: ProductSnapshot::from(&product),
                quantity,
                window,
                unit_price: product.daily_rate,
                extras: vec![],
                line_total: cart_line_total(product.daily_rate, quantity, &window),
                reservation_id: None,
            })
            .await?;

            let (customer_order, rental_orders, lines) = recompute_totals(tx.as_mut(), customer_order).await?;
            tx.commit().await?;
            Ok(cart_view(customer_order, rental_orders, lines))
        })
        .await?;

        tracing::info!("🛒 Produto {} adicionado ao carrinho de {}", product_id, principal.id);
        Ok(view)
    }

    // --- GET ---
    pub async fn get_cart(&self, principal: &Principal) -> Result<CartView, AppError> {
        tx::bounded(self.tx_timeout, "getCart", async {
            let mut tx = self.store.begin().await?;
            let Some(customer_order) = tx.find_draft_order(principal.id).await? else {
                return Ok(CartView::empty());
            };
            let rental_orders = tx.list_rental_orders(customer_order.id).await?;
            let ids: Vec<Uuid> = rental_orders.iter().map(|o| o.id).collect();
            let lines = tx.list_lines(&ids).await?;
            Ok(cart_view(customer_order, rental_orders, lines))
        })
        .await
    }

    // --- UPDATE ---
    pub async fn update_cart_item(
        &self,
        principal: &Principal,
        line_id: Uuid,
        patch: CartItemPatch,
        now: DateTime<Utc>,
    ) -> Result<CartView, AppError> {
        tx::bounded(self.tx_timeout, "updateCartItem", async {
            let mut tx = self.store.begin().await?;
            let (line, _, customer_order) = draft_line(tx.as_mut(), principal, line_id).await?;

            let quantity = patch.quantity.unwrap_or(line.quantity);
            validate_quantity(quantity)?;
            let window = future_window(
                patch.from.unwrap_or(line.from_at),
                patch.to.unwrap_or(line.to_at),
                now,
            )?;

            let product = tx
                .find_product(line.product_id)
                .await?
                .ok_or_else(|| AppError::not_found("Produto", line.product_id))?;
            coarse_check(tx.as_mut(), &product, quantity).await?;

            let updated = RentalOrderLine {
                quantity,
                from_at: window.from,
                to_at: window.to,
                line_total: cart_line_total(line.unit_price, quantity, &window),
                ..line
            };
            tx.save_line(&updated).await?;

            let (customer_order, rental_orders, lines) = recompute_totals(tx.as_mut(), customer_order).await?;
            tx.commit().await?;
            Ok(cart_view(customer_order, rental_orders, lines))
        })
        .await
    }

    // --- REMOVE ---
    pub async fn remove_from_cart(&self, principal: &Principal, line_id: Uuid) -> Result<CartView, AppError> {
        tx::bounded(self.tx_timeout, "removeFromCart", async {
            let mut tx = self.store.begin().await?;
            let (line, rental_order, customer_order) = draft_line(tx.as_mut(), principal, line_id).await?;

            // Linhas de rascunho ainda não são registro financeiro
            tx.delete_line(line.id).await?;
            if tx.list_lines(&[rental_order.id]).await?.is_empty() {
                tx.delete_rental_order(rental_order.id).await?;
            }

            let (customer_order, rental_orders, lines) = recompute_totals(tx.as_mut(), customer_order).await?;
            tx.commit().await?;
            Ok(cart_view(customer_order, rental_orders, lines))
        })
        .await
    }

    // --- CHECKOUT ---
    /// Converte o carrinho em reservas firmes: checagem por janela em cada
    /// linha, uma reserva por linha, estoque segurado e pedido `pending`.
    pub async fn checkout(
        &self,
        principal: &Principal,
        payment_type: PaymentType,
        now: DateTime<Utc>,
    ) -> Result<OrderBundle, AppError> {
        let bundle = tx::bounded(self.tx_timeout, "checkout", async {
            let mut tx = self.store.begin().await?;
            let customer_order = tx
                .find_draft_order(principal.id)
                .await?
                .ok_or_else(|| AppError::NotFound("Carrinho vazio.".into()))?;
            let rental_orders = tx.list_rental_orders(customer_order.id).await?;
            let ids: Vec<Uuid> = rental_orders.iter().map(|o| o.id).collect();
            let lines = tx.list_lines(&ids).await?;
            if lines.is_empty() {
                return Err(AppError::Validation("Carrinho vazio.".into()));
            }

            for line in &lines {
                if line.from_at < now {
                    return Err(AppError::Validation(format!(
                        "O item {} tem retirada no passado; atualize as datas.",
                        line.id
                    )));
                }
            }

            let inventories = InventoryService::lock_products(tx.as_mut(), lines.iter().map(|l| l.product_id)).await?;
            for (i, line) in lines.iter().enumerate() {
                let window = line.window();
                let inventory = inventories
                    .get(&line.product_id)
                    .ok_or_else(|| AppError::not_found("Estoque do produto", line.product_id))?;
                let pending: i64 = lines[..i]
                    .iter()
                    .filter(|l| l.product_id == line.product_id && l.window().overlaps(&window))
                    .map(|l| i64::from(l.quantity))
                    .sum();
                InventoryService::ensure_capacity(tx.as_mut(), inventory, window, line.quantity, pending).await?;
            }

            let mut touched = BTreeSet::new();
            for line in lines {
                let reservation = tx
                    .insert_reservation(NewReservation {
                        product_id: line.product_id,
                        customer_order_id: Some(customer_order.id),
                        rental_order_id: Some(line.rental_order_id),
                        quotation_id: None,
                        quantity: line.quantity,
                        window: line.window(),
                        status: ReservationStatus::Reserved,
                    })
                    .await?;
                touched.insert(line.product_id);
                tx.save_line(&RentalOrderLine { reservation_id: Some(reservation.id), ..line })
                    .await?;
            }
            for product_id in touched {
                InventoryService::sync_holds(tx.as_mut(), product_id).await?;
            }

            let status = customer_order.status.transition(CustomerOrderStatus::Pending)?;
            let customer_order = tx
                .save_customer_order(&CustomerOrder { status, payment_type, ..customer_order })
                .await?;
            let (customer_order, _, _) = recompute_totals(tx.as_mut(), customer_order).await?;
            let bundle = load_bundle(tx.as_mut(), customer_order).await?;

            tx.commit().await?;
            Ok(bundle)
        })
        .await?;

        tracing::info!(
            "✅ Checkout do pedido {} ({} linha(s))",
            bundle.customer_order.id,
            bundle.lines.len()
        );

        let mut messages = vec![NotificationMessage::new(
            principal.id,
            NotificationKind::OrderCreated,
            "Pedido confirmado",
            format!("Seu pedido de {} foi confirmado.", bundle.customer_order.total_amount),
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
