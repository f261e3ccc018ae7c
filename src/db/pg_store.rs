// src/db/pg_store.rs

use std::time::Duration;

use async_trait::async_trait;
use rust_decimal::Decimal;
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use crate::{
    common::{db_utils::begin_serializable, error::AppError},
    db::{
        store::{RentalStore, RentalTx},
        InventoryRepository, OrderRepository, ProductRepository, QuotationRepository,
    },
    models::{
        inventory::Inventory,
        orders::{
            CustomerOrder, NewCustomerOrder, NewRentalOrderLine, RentalOrder, RentalOrderLine,
            Transfer, TransferDetails, TransferKind,
        },
        product::{NewProduct, Product, ProductStatus},
        quotation::{NewQuotation, Quotation, QuotationFilter, QuotationStatus},
        reservation::{NewReservation, RentalWindow, Reservation, ReservationFilter, ReservationStatus},
    },
};

#[derive(Clone)]
pub struct PgRentalStore {
    pool: PgPool,
    lock_timeout: Duration,
}

impl PgRentalStore {
    pub fn new(pool: PgPool, lock_timeout: Duration) -> Self {
        Self { pool, lock_timeout }
    }
}

#[async_trait]
impl RentalStore for PgRentalStore {
    async fn begin(&self) -> Result<Box<dyn RentalTx>, AppError> {
        let tx = begin_serializable(&self.pool, self.lock_timeout).await?;
        Ok(Box::new(PgRentalTx {
            tx,
            products: ProductRepository,
            inventory: InventoryRepository,
            quotations: QuotationRepository,
            orders: OrderRepository,
        }))
    }
}

// Cada método repassa `&mut *self.tx` como executor para o repositório.
pub struct PgRentalTx {
    tx: Transaction<'static, Postgres>,
    products: ProductRepository,
    inventory: InventoryRepository,
    quotations: QuotationRepository,
    orders: OrderRepository,
}

#[async_trait]
impl RentalTx for PgRentalTx {
    async fn insert_product(&mut self, new: NewProduct) -> Result<Product, AppError> {
        self.products.create_product(&mut *self.tx, &new).await
    }

    async fn find_product(&mut self, id: Uuid) -> Result<Option<Product>, AppError> {
        self.products.find_by_id(&mut *self.tx, id).await
    }

    async fn set_product_status(&mut self, id: Uuid, status: ProductStatus) -> Result<Product, AppError> {
        self.products.set_status(&mut *self.tx, id, status).await
    }

    async fn insert_inventory(&mut self, product_id: Uuid, total: i32) -> Result<Inventory, AppError> {
        self.inventory.create_inventory(&mut *self.tx, product_id, total).await
    }

    async fn lock_inventory(&mut self, product_id: Uuid) -> Result<Option<Inventory>, AppError> {
        self.inventory.get_inventory_for_update(&mut *self.tx, product_id).await
    }

    async fn write_inventory(&mut self, inventory: &Inventory) -> Result<Inventory, AppError> {
        self.inventory.write_counters(&mut *self.tx, inventory).await
    }

    async fn overlapping_quantity(
        &mut self,
        product_id: Uuid,
        window: RentalWindow,
        statuses: &[ReservationStatus],
    ) -> Result<i64, AppError> {
        self.inventory
            .overlapping_quantity(&mut *self.tx, product_id, window, statuses)
            .await
    }

    async fn list_holding_reservations(&mut self, product_id: Uuid) -> Result<Vec<Reservation>, AppError> {
        self.inventory.list_holding_reservations(&mut *self.tx, product_id).await
    }

    async fn insert_reservation(&mut self, new: NewReservation) -> Result<Reservation, AppError> {
        self.inventory.create_reservation(&mut *self.tx, &new).await
    }

    async fn find_reservation(&mut self, id: Uuid) -> Result<Option<Reservation>, AppError> {
        self.inventory.find_reservation(&mut *self.tx, id).await
    }

    async fn list_reservations(&mut self, filter: &ReservationFilter) -> Result<Vec<Reservation>, AppError> {
        self.inventory.list_reservations(&mut *self.tx, filter).await
    }

    async fn set_reservation_status(
        &mut self,
        id: Uuid,
        status: ReservationStatus,
    ) -> Result<Reservation, AppError> {
        self.inventory.set_reservation_status(&mut *self.tx, id, status).await
    }

    async fn insert_quotation(&mut self, owner_id: Uuid, new: NewQuotation) -> Result<Quotation, AppError> {
        self.quotations.create_quotation(&mut *self.tx, owner_id, &new).await
    }

    async fn find_quotation(&mut self, id: Uuid) -> Result<Option<Quotation>, AppError> {
        self.quotations.find_by_id(&mut *self.tx, id).await
    }

    async fn find_quotations_for_update(&mut self, ids: &[Uuid]) -> Result<Vec<Quotation>, AppError> {
        self.quotations.find_many_for_update(&mut *self.tx, ids).await
    }

    async fn list_quotations(&mut self, filter: &QuotationFilter) -> Result<Vec<Quotation>, AppError> {
        self.quotations.list(&mut *self.tx, filter).await
    }

    async fn save_quotation(&mut self, quotation: &Quotation) -> Result<Quotation, AppError> {
        self.quotations.update(&mut *self.tx, quotation).await
    }

    async fn set_quotations_status(&mut self, ids: &[Uuid], status: QuotationStatus) -> Result<u64, AppError> {
        self.quotations.set_status_many(&mut *self.tx, ids, status).await
    }

    async fn insert_customer_order(&mut self, new: NewCustomerOrder) -> Result<CustomerOrder, AppError> {
        self.orders.create_customer_order(&mut *self.tx, &new).await
    }

    async fn find_customer_order(&mut self, id: Uuid) -> Result<Option<CustomerOrder>, AppError> {
        self.orders.find_customer_order(&mut *self.tx, id).await
    }

    async fn find_draft_order(&mut self, customer_id: Uuid) -> Result<Option<CustomerOrder>, AppError> {
        self.orders.find_draft_order(&mut *self.tx, customer_id).await
    }

    async fn list_customer_orders(&mut self, customer_id: Uuid) -> Result<Vec<CustomerOrder>, AppError> {
        self.orders.list_customer_orders(&mut *self.tx, customer_id).await
    }

    async fn save_customer_order(&mut self, order: &CustomerOrder) -> Result<CustomerOrder, AppError> {
        self.orders.update_customer_order(&mut *self.tx, order).await
    }

    async fn insert_rental_order(
        &mut self,
        customer_order_id: Uuid,
        vendor_id: Uuid,
        total_amount: Decimal,
    ) -> Result<RentalOrder, AppError> {
        self.orders
            .create_rental_order(&mut *self.tx, customer_order_id, vendor_id, total_amount)
            .await
    }

    async fn find_rental_order(&mut self, id: Uuid) -> Result<Option<RentalOrder>, AppError> {
        self.orders.find_rental_order(&mut *self.tx, id).await
    }

    async fn find_rental_order_for_vendor(
        &mut self,
        customer_order_id: Uuid,
        vendor_id: Uuid,
    ) -> Result<Option<RentalOrder>, AppError> {
        self.orders
            .find_rental_order_for_vendor(&mut *self.tx, customer_order_id, vendor_id)
            .await
    }

    async fn list_rental_orders(&mut self, customer_order_id: Uuid) -> Result<Vec<RentalOrder>, AppError> {
        self.orders.list_rental_orders(&mut *self.tx, customer_order_id).await
    }

    async fn list_vendor_rental_orders(&mut self, vendor_id: Uuid) -> Result<Vec<RentalOrder>, AppError> {
        self.orders.list_vendor_rental_orders(&mut *self.tx, vendor_id).await
    }

    async fn save_rental_order(&mut self, order: &RentalOrder) -> Result<RentalOrder, AppError> {
        self.orders.update_rental_order(&mut *self.tx, order).await
    }

    async fn delete_rental_order(&mut self, id: Uuid) -> Result<(), AppError> {
        self.orders.delete_rental_order(&mut *self.tx, id).await
    }

    async fn insert_line(&mut self, new: NewRentalOrderLine) -> Result<RentalOrderLine, AppError> {
        self.orders.create_line(&mut *self.tx, &new).await
    }

    async fn find_line(&mut self, id: Uuid) -> Result<Option<RentalOrderLine>, AppError> {
        self.orders.find_line(&mut *self.tx, id).await
    }

    async fn find_line_for_product(
        &mut self,
        rental_order_id: Uuid,
        product_id: Uuid,
    ) -> Result<Option<RentalOrderLine>, AppError> {
        self.orders
            .find_line_for_product(&mut *self.tx, rental_order_id, product_id)
            .await
    }

    async fn find_line_by_payment_link(&mut self, link_id: &str) -> Result<Option<RentalOrderLine>, AppError> {
        self.orders.find_line_by_payment_link(&mut *self.tx, link_id).await
    }

    async fn list_lines(&mut self, rental_order_ids: &[Uuid]) -> Result<Vec<RentalOrderLine>, AppError> {
        self.orders.list_lines(&mut *self.tx, rental_order_ids).await
    }

    async fn save_line(&mut self, line: &RentalOrderLine) -> Result<RentalOrderLine, AppError> {
        self.orders.update_line(&mut *self.tx, line).await
    }

    async fn delete_line(&mut self, id: Uuid) -> Result<(), AppError> {
        self.orders.delete_line(&mut *self.tx, id).await
    }

    async fn insert_transfer(
        &mut self,
        line_id: Uuid,
        kind: TransferKind,
        details: &TransferDetails,
        created_by: Uuid,
    ) -> Result<Transfer, AppError> {
        self.orders
            .create_transfer(&mut *self.tx, line_id, kind, details, created_by)
            .await
    }

    async fn commit(self: Box<Self>) -> Result<(), AppError> {
        self.tx.commit().await?;
        Ok(())
    }
}
