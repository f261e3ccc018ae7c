// src/db/memory_store.rs

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use rust_decimal::Decimal;
use tokio::sync::{Mutex, OwnedMutexGuard};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::store::{RentalStore, RentalTx},
    models::{
        inventory::Inventory,
        orders::{
            CustomerOrder, CustomerOrderStatus, LineStatus, NewCustomerOrder, NewRentalOrderLine,
            PaymentStatus, RentalOrder, RentalOrderLine, RentalOrderStatus, Transfer,
            TransferDetails, TransferKind, DEFAULT_REMINDER_GAP_DAYS,
        },
        product::{NewProduct, Product, ProductStatus},
        quotation::{NewQuotation, Quotation, QuotationFilter, QuotationStatus},
        reservation::{NewReservation, RentalWindow, Reservation, ReservationFilter, ReservationStatus},
    },
};

/// Tabelas em memória, na ordem de inserção.
#[derive(Debug, Clone, Default)]
pub struct MemoryState {
    pub products: Vec<Product>,
    pub inventories: Vec<Inventory>,
    pub reservations: Vec<Reservation>,
    pub quotations: Vec<Quotation>,
    pub customer_orders: Vec<CustomerOrder>,
    pub rental_orders: Vec<RentalOrder>,
    pub lines: Vec<RentalOrderLine>,
    pub transfers: Vec<Transfer>,
}

impl MemoryState {
    pub fn inventory(&self, product_id: Uuid) -> Option<&Inventory> {
        self.inventories.iter().find(|i| i.product_id == product_id)
    }
}

/// Backend sem banco: uma transação por vez, com cópia de trabalho
/// publicada só no `commit`. Descartar a transação descarta a cópia.
#[derive(Clone, Default)]
pub struct MemoryRentalStore {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryRentalStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cópia do estado confirmado.
    pub async fn snapshot(&self) -> MemoryState {
        self.state.lock().await.clone()
    }
}

#[async_trait]
impl RentalStore for MemoryRentalStore {
    async fn begin(&self) -> Result<Box<dyn RentalTx>, AppError> {
        let guard = self.state.clone().lock_owned().await;
        let working = guard.clone();
        Ok(Box::new(MemoryRentalTx { guard, working }))
    }
}

pub struct MemoryRentalTx {
    guard: OwnedMutexGuard<MemoryState>,
    working: MemoryState,
}

fn find_mut<'a, T>(
    rows: &'a mut [T],
    entity: &str,
    id: Uuid,
    key: impl Fn(&T) -> Uuid,
) -> Result<&'a mut T, AppError> {
    rows.iter_mut()
        .find(|row| key(row) == id)
        .ok_or_else(|| AppError::not_found(entity, id))
}

#[async_trait]
impl RentalTx for MemoryRentalTx {
    // --- Produtos ---
    async fn insert_product(&mut self, new: NewProduct) -> Result<Product, AppError> {
        let now = Utc::now();
        let product = Product {
            id: Uuid::new_v4(),
            owner_id: new.owner_id,
            name: new.name,
            description: new.description,
            category_id: new.category_id,
            images: new.images,
            status: ProductStatus::Available,
            base_quantity: new.base_quantity,
            daily_rate: new.daily_rate,
            created_at: now,
            updated_at: now,
        };
        self.working.products.push(product.clone());
        Ok(product)
    }

    async fn find_product(&mut self, id: Uuid) -> Result<Option<Product>, AppError> {
        Ok(self.working.products.iter().find(|p| p.id == id).cloned())
    }

    async fn set_product_status(&mut self, id: Uuid, status: ProductStatus) -> Result<Product, AppError> {
        let product = find_mut(&mut self.working.products, "Produto", id, |p| p.id)?;
        product.status = status;
        product.updated_at = Utc::now();
        Ok(product.clone())
    }

    // --- Estoque ---
    async fn insert_inventory(&mut self, product_id: Uuid, total: i32) -> Result<Inventory, AppError> {
        if self.working.inventory(product_id).is_some() {
            return Err(AppError::Conflict(format!(
                "Produto {} já possui registro de estoque.",
                product_id
            )));
        }
        let inventory = Inventory {
            id: Uuid::new_v4(),
            product_id,
            total_quantity: total,
            available_quantity: total,
            reserved_quantity: 0,
            updated_at: Utc::now(),
        };
        self.working.inventories.push(inventory.clone());
        Ok(inventory)
    }

    async fn lock_inventory(&mut self, product_id: Uuid) -> Result<Option<Inventory>, AppError> {
        Ok(self.working.inventory(product_id).cloned())
    }

    async fn write_inventory(&mut self, inventory: &Inventory) -> Result<Inventory, AppError> {
        let row = find_mut(
            &mut self.working.inventories,
            "Estoque do produto",
            inventory.product_id,
            |i| i.product_id,
        )?;
        row.total_quantity = inventory.total_quantity;
        row.available_quantity = inventory.available_quantity;
        row.reserved_quantity = inventory.reserved_quantity;
        row.updated_at = Utc::now();
        Ok(row.clone())
    }

    // --- Reservas ---
    async fn overlapping_quantity(
        &mut self,
        product_id: Uuid,
        window: RentalWindow,
        statuses: &[ReservationStatus],
    ) -> Result<i64, AppError> {
        Ok(self
            .working
            .reservations
            .iter()
            .filter(|r| r.product_id == product_id)
            .filter(|r| statuses.contains(&r.status))
            .filter(|r| r.window().overlaps(&window))
            .map(|r| i64::from(r.quantity))
            .sum())
    }

    async fn list_holding_reservations(&mut self, product_id: Uuid) -> Result<Vec<Reservation>, AppError> {
        Ok(self
            .working
            .reservations
            .iter()
            .filter(|r| r.product_id == product_id && r.is_holding())
            .cloned()
            .collect())
    }

    async fn insert_reservation(&mut self, new: NewReservation) -> Result<Reservation, AppError> {
        let now = Utc::now();
        let reservation = Reservation {
            id: Uuid::new_v4(),
            product_id: new.product_id,
            customer_order_id: new.customer_order_id,
            rental_order_id: new.rental_order_id,
            quotation_id: new.quotation_id,
            quantity: new.quantity,
            from_at: new.window.from,
            to_at: new.window.to,
            status: new.status,
            created_at: now,
            updated_at: now,
        };
        self.working.reservations.push(reservation.clone());
        Ok(reservation)
    }

    async fn find_reservation(&mut self, id: Uuid) -> Result<Option<Reservation>, AppError> {
        Ok(self.working.reservations.iter().find(|r| r.id == id).cloned())
    }

    async fn list_reservations(&mut self, filter: &ReservationFilter) -> Result<Vec<Reservation>, AppError> {
        let state = &self.working;
        let customer_of = |r: &Reservation| {
            r.customer_order_id
                .and_then(|id| state.customer_orders.iter().find(|o| o.id == id))
                .map(|o| o.customer_id)
        };
        let owner_of = |r: &Reservation| {
            state.products.iter().find(|p| p.id == r.product_id).map(|p| p.owner_id)
        };
        Ok(state
            .reservations
            .iter()
            .rev()
            .filter(|r| filter.customer_id.is_none_or(|c| customer_of(r) == Some(c)))
            .filter(|r| filter.vendor_id.is_none_or(|v| owner_of(r) == Some(v)))
            .cloned()
            .collect())
    }

    async fn set_reservation_status(
        &mut self,
        id: Uuid,
        status: ReservationStatus,
    ) -> Result<Reservation, AppError> {
        let reservation = find_mut(&mut self.working.reservations, "Reserva", id, |r| r.id)?;
        reservation.status = status;
        reservation.updated_at = Utc::now();
        Ok(reservation.clone())
    }

    // --- Cotações ---
    async fn insert_quotation(&mut self, owner_id: Uuid, new: NewQuotation) -> Result<Quotation, AppError> {
        let now = Utc::now();
        let quotation = Quotation {
            id: Uuid::new_v4(),
            product_id: new.product_id,
            owner_id,
            customer_id: new.customer_id,
            requested_quantity: new.requested_quantity,
            charges: new.charges,
            pickup_at: new.pickup_at,
            return_at: new.return_at,
            pickup_address: new.pickup_address,
            return_address: new.return_address,
            pricing_breakdown: new.pricing_breakdown,
            total_amount: new.total_amount,
            status: QuotationStatus::Pending,
            expires_at: new.expires_at,
            created_at: now,
            updated_at: now,
        };
        self.working.quotations.push(quotation.clone());
        Ok(quotation)
    }

    async fn find_quotation(&mut self, id: Uuid) -> Result<Option<Quotation>, AppError> {
        Ok(self.working.quotations.iter().find(|q| q.id == id).cloned())
    }

    async fn find_quotations_for_update(&mut self, ids: &[Uuid]) -> Result<Vec<Quotation>, AppError> {
        let mut found: Vec<Quotation> = self
            .working
            .quotations
            .iter()
            .filter(|q| ids.contains(&q.id))
            .cloned()
            .collect();
        found.sort_by_key(|q| q.id);
        Ok(found)
    }

    async fn list_quotations(&mut self, filter: &QuotationFilter) -> Result<Vec<Quotation>, AppError> {
        // Mais recentes primeiro, como no SQL
        Ok(self
            .working
            .quotations
            .iter()
            .rev()
            .filter(|q| filter.matches(q))
            .cloned()
            .collect())
    }

    async fn save_quotation(&mut self, quotation: &Quotation) -> Result<Quotation, AppError> {
        let row = find_mut(&mut self.working.quotations, "Cotação", quotation.id, |q| q.id)?;
        *row = Quotation { updated_at: Utc::now(), ..quotation.clone() };
        Ok(row.clone())
    }

    async fn set_quotations_status(&mut self, ids: &[Uuid], status: QuotationStatus) -> Result<u64, AppError> {
        let now = Utc::now();
        let mut affected = 0;
        for q in self.working.quotations.iter_mut().filter(|q| ids.contains(&q.id)) {
            q.status = status;
            q.updated_at = now;
            affected += 1;
        }
        Ok(affected)
    }

    // --- Pedido do cliente ---
    async fn insert_customer_order(&mut self, new: NewCustomerOrder) -> Result<CustomerOrder, AppError> {
        // Mesmo efeito do índice único parcial: um carrinho por cliente
        if new.status == CustomerOrderStatus::Draft
            && self
                .working
                .customer_orders
                .iter()
                .any(|o| o.customer_id == new.customer_id && o.status == CustomerOrderStatus::Draft)
        {
            return Err(AppError::Conflict("O cliente já possui um carrinho aberto.".into()));
        }
        let now = Utc::now();
        let order = CustomerOrder {
            id: Uuid::new_v4(),
            customer_id: new.customer_id,
            status: new.status,
            total_amount: new.total_amount,
            payment_status: PaymentStatus::Pending,
            payment_type: new.payment_type,
            paid_amount: Decimal::ZERO,
            rent_from: new.window.map(|w| w.from),
            rent_to: new.window.map(|w| w.to),
            created_at: now,
            updated_at: now,
        };
        self.working.customer_orders.push(order.clone());
        Ok(order)
    }

    async fn find_customer_order(&mut self, id: Uuid) -> Result<Option<CustomerOrder>, AppError> {
        Ok(self.working.customer_orders.iter().find(|o| o.id == id).cloned())
    }

    async fn find_draft_order(&mut self, customer_id: Uuid) -> Result<Option<CustomerOrder>, AppError> {
        Ok(self
            .working
            .customer_orders
            .iter()
            .find(|o| o.customer_id == customer_id && o.status == CustomerOrderStatus::Draft)
            .cloned())
    }

    async fn list_customer_orders(&mut self, customer_id: Uuid) -> Result<Vec<CustomerOrder>, AppError> {
        Ok(self
            .working
            .customer_orders
            .iter()
            .rev()
            .filter(|o| o.customer_id == customer_id && o.status != CustomerOrderStatus::Draft)
            .cloned()
            .collect())
    }

    async fn save_customer_order(&mut self, order: &CustomerOrder) -> Result<CustomerOrder, AppError> {
        let row = find_mut(&mut self.working.customer_orders, "Pedido do cliente", order.id, |o| o.id)?;
        *row = CustomerOrder { updated_at: Utc::now(), ..order.clone() };
        Ok(row.clone())
    }

    // --- Pedido de locação ---
    async fn insert_rental_order(
        &mut self,
        customer_order_id: Uuid,
        vendor_id: Uuid,
        total_amount: Decimal,
    ) -> Result<RentalOrder, AppError> {
        let now = Utc::now();
        let order = RentalOrder {
            id: Uuid::new_v4(),
            customer_order_id,
            vendor_id,
            status: RentalOrderStatus::Pending,
            total_amount,
            owner_reminder_gap_days: DEFAULT_REMINDER_GAP_DAYS,
            customer_reminder_gap_days: DEFAULT_REMINDER_GAP_DAYS,
            created_at: now,
            updated_at: now,
        };
        self.working.rental_orders.push(order.clone());
        Ok(order)
    }

    async fn find_rental_order(&mut self, id: Uuid) -> Result<Option<RentalOrder>, AppError> {
        Ok(self.working.rental_orders.iter().find(|o| o.id == id).cloned())
    }

    async fn find_rental_order_for_vendor(
        &mut self,
        customer_order_id: Uuid,
        vendor_id: Uuid,
    ) -> Result<Option<RentalOrder>, AppError> {
        Ok(self
            .working
            .rental_orders
            .iter()
            .find(|o| o.customer_order_id == customer_order_id && o.vendor_id == vendor_id)
            .cloned())
    }

    async fn list_rental_orders(&mut self, customer_order_id: Uuid) -> Result<Vec<RentalOrder>, AppError> {
        Ok(self
            .working
            .rental_orders
            .iter()
            .filter(|o| o.customer_order_id == customer_order_id)
            .cloned()
            .collect())
    }

    async fn list_vendor_rental_orders(&mut self, vendor_id: Uuid) -> Result<Vec<RentalOrder>, AppError> {
        let drafts: Vec<Uuid> = self
            .working
            .customer_orders
            .iter()
            .filter(|o| o.status == CustomerOrderStatus::Draft)
            .map(|o| o.id)
            .collect();
        Ok(self
            .working
            .rental_orders
            .iter()
            .rev()
            .filter(|o| o.vendor_id == vendor_id && !drafts.contains(&o.customer_order_id))
            .cloned()
            .collect())
    }

    async fn save_rental_order(&mut self, order: &RentalOrder) -> Result<RentalOrder, AppError> {
        let row = find_mut(&mut self.working.rental_orders, "Pedido de locação", order.id, |o| o.id)?;
        *row = RentalOrder { updated_at: Utc::now(), ..order.clone() };
        Ok(row.clone())
    }

    async fn delete_rental_order(&mut self, id: Uuid) -> Result<(), AppError> {
        self.working.rental_orders.retain(|o| o.id != id);
        Ok(())
    }

    // --- Linhas ---
    async fn insert_line(&mut self, new: NewRentalOrderLine) -> Result<RentalOrderLine, AppError> {
        let now = Utc::now();
        let line = RentalOrderLine {
            id: Uuid::new_v4(),
            rental_order_id: new.rental_order_id,
            quotation_id: new.quotation_id,
            product_id: new.product_id,
            product_snapshot: new.product_snapshot,
            quantity: new.quantity,
            from_at: new.window.from,
            to_at: new.window.to,
            unit_price: new.unit_price,
            extras: new.extras,
            line_total: new.line_total,
            reservation_id: new.reservation_id,
            transfer_id: None,
            status: LineStatus::Reserved,
            late_fee: Decimal::ZERO,
            remaining_amount: Decimal::ZERO,
            returned_at: None,
            payment_link_id: None,
            payment_link_url: None,
            created_at: now,
            updated_at: now,
        };
        self.working.lines.push(line.clone());
        Ok(line)
    }

    async fn find_line(&mut self, id: Uuid) -> Result<Option<RentalOrderLine>, AppError> {
        Ok(self.working.lines.iter().find(|l| l.id == id).cloned())
    }

    async fn find_line_for_product(
        &mut self,
        rental_order_id: Uuid,
        product_id: Uuid,
    ) -> Result<Option<RentalOrderLine>, AppError> {
        Ok(self
            .working
            .lines
            .iter()
            .find(|l| l.rental_order_id == rental_order_id && l.product_id == product_id)
            .cloned())
    }

    async fn find_line_by_payment_link(&mut self, link_id: &str) -> Result<Option<RentalOrderLine>, AppError> {
        Ok(self
            .working
            .lines
            .iter()
            .find(|l| l.payment_link_id.as_deref() == Some(link_id))
            .cloned())
    }

    async fn list_lines(&mut self, rental_order_ids: &[Uuid]) -> Result<Vec<RentalOrderLine>, AppError> {
        Ok(self
            .working
            .lines
            .iter()
            .filter(|l| rental_order_ids.contains(&l.rental_order_id))
            .cloned()
            .collect())
    }

    async fn save_line(&mut self, line: &RentalOrderLine) -> Result<RentalOrderLine, AppError> {
        let row = find_mut(&mut self.working.lines, "Linha do pedido", line.id, |l| l.id)?;
        *row = RentalOrderLine { updated_at: Utc::now(), ..line.clone() };
        Ok(row.clone())
    }

    async fn delete_line(&mut self, id: Uuid) -> Result<(), AppError> {
        self.working.lines.retain(|l| l.id != id);
        Ok(())
    }

    // --- Transferências ---
    async fn insert_transfer(
        &mut self,
        line_id: Uuid,
        kind: TransferKind,
        details: &TransferDetails,
        created_by: Uuid,
    ) -> Result<Transfer, AppError> {
        let transfer = Transfer {
            id: Uuid::new_v4(),
            rental_order_line_id: line_id,
            kind,
            carrier: details.carrier.clone(),
            tracking_number: details.tracking_number.clone(),
            scheduled_at: details.scheduled_at,
            created_by,
            created_at: Utc::now(),
        };
        self.working.transfers.push(transfer.clone());
        Ok(transfer)
    }

    async fn commit(self: Box<Self>) -> Result<(), AppError> {
        let MemoryRentalTx { mut guard, working } = *self;
        *guard = working;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::inventory::InventoryDelta;
    use chrono::TimeZone;

    fn window(from_day: u32, to_day: u32) -> RentalWindow {
        RentalWindow::new(
            Utc.with_ymd_and_hms(2025, 1, from_day, 0, 0, 0).unwrap(),
            Utc.with_ymd_and_hms(2025, 1, to_day, 0, 0, 0).unwrap(),
        )
        .unwrap()
    }

    fn reservation(product_id: Uuid, qty: i32, w: RentalWindow, status: ReservationStatus) -> NewReservation {
        NewReservation {
            product_id,
            customer_order_id: None,
            rental_order_id: None,
            quotation_id: None,
            quantity: qty,
            window: w,
            status,
        }
    }

    #[tokio::test]
    async fn dropped_transaction_leaves_no_trace() {
        let store = MemoryRentalStore::new();
        let product_id = Uuid::new_v4();
        {
            let mut tx = store.begin().await.unwrap();
            tx.insert_inventory(product_id, 3).await.unwrap();
        }
        assert!(store.snapshot().await.inventories.is_empty());

        let mut tx = store.begin().await.unwrap();
        tx.insert_inventory(product_id, 3).await.unwrap();
        tx.commit().await.unwrap();
        assert_eq!(store.snapshot().await.inventories.len(), 1);
    }

    #[tokio::test]
    async fn overlap_sum_respects_half_open_windows_and_statuses() {
        let store = MemoryRentalStore::new();
        let product_id = Uuid::new_v4();
        let mut tx = store.begin().await.unwrap();
        tx.insert_reservation(reservation(product_id, 2, window(1, 5), ReservationStatus::Reserved))
            .await
            .unwrap();
        tx.insert_reservation(reservation(product_id, 1, window(3, 8), ReservationStatus::Cancelled))
            .await
            .unwrap();

        let touching = tx
            .overlapping_quantity(product_id, window(5, 10), &ReservationStatus::HOLDING)
            .await
            .unwrap();
        assert_eq!(touching, 0);

        let inside = tx
            .overlapping_quantity(product_id, window(4, 6), &ReservationStatus::HOLDING)
            .await
            .unwrap();
        assert_eq!(inside, 2);

        let all = tx
            .overlapping_quantity(
                product_id,
                window(4, 6),
                &[ReservationStatus::Reserved, ReservationStatus::Cancelled],
            )
            .await
            .unwrap();
        assert_eq!(all, 3);
    }

    #[tokio::test]
    async fn adjust_inventory_aborts_on_negative_counter() {
        let store = MemoryRentalStore::new();
        let product_id = Uuid::new_v4();
        let mut tx = store.begin().await.unwrap();
        tx.insert_inventory(product_id, 1).await.unwrap();
        tx.commit().await.unwrap();

        let mut tx = store.begin().await.unwrap();
        let err = tx.adjust_inventory(product_id, InventoryDelta::hold(2)).await.unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
        drop(tx);

        let state = store.snapshot().await;
        let inv = state.inventory(product_id).unwrap();
        assert_eq!(inv.available_quantity, 1);
        assert!(inv.is_balanced());
    }

    #[tokio::test]
    async fn only_one_draft_order_per_customer() {
        let store = MemoryRentalStore::new();
        let customer = Uuid::new_v4();
        let mut tx = store.begin().await.unwrap();
        let draft = NewCustomerOrder {
            customer_id: customer,
            status: CustomerOrderStatus::Draft,
            total_amount: Decimal::ZERO,
            payment_type: crate::models::orders::PaymentType::PartialDeposit,
            window: None,
        };
        tx.insert_customer_order(draft.clone()).await.unwrap();
        assert!(matches!(tx.insert_customer_order(draft).await, Err(AppError::Conflict(_))));
    }
}
