// src/db/store.rs

use async_trait::async_trait;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::{
        inventory::{Inventory, InventoryDelta},
        orders::{
            CustomerOrder, NewCustomerOrder, NewRentalOrderLine, RentalOrder, RentalOrderLine,
            Transfer, TransferDetails, TransferKind,
        },
        product::{NewProduct, Product, ProductStatus},
        quotation::{NewQuotation, Quotation, QuotationFilter, QuotationStatus},
        reservation::{NewReservation, RentalWindow, Reservation, ReservationFilter, ReservationStatus},
    },
};

/// Fábrica de unidades de trabalho. Cada operação do núcleo abre exatamente
/// uma transação, faz todas as leituras e escritas nela e chama `commit`.
#[async_trait]
pub trait RentalStore: Send + Sync {
    async fn begin(&self) -> Result<Box<dyn RentalTx>, AppError>;
}

/// Uma transação aberta. Descartar sem `commit` desfaz tudo.
#[async_trait]
pub trait RentalTx: Send {
    // --- Produtos ---
    async fn insert_product(&mut self, new: NewProduct) -> Result<Product, AppError>;
    async fn find_product(&mut self, id: Uuid) -> Result<Option<Product>, AppError>;
    async fn set_product_status(&mut self, id: Uuid, status: ProductStatus) -> Result<Product, AppError>;

    // --- Livro de estoque ---
    async fn insert_inventory(&mut self, product_id: Uuid, total: i32) -> Result<Inventory, AppError>;
    /// Lê a linha de estoque e a mantém travada até o fim da transação.
    async fn lock_inventory(&mut self, product_id: Uuid) -> Result<Option<Inventory>, AppError>;
    /// Grava os contadores já validados de `inventory`.
    async fn write_inventory(&mut self, inventory: &Inventory) -> Result<Inventory, AppError>;

    /// Aplica deltas com sinal aos contadores de um produto.
    /// Contador negativo aborta a transação inteira.
    async fn adjust_inventory(
        &mut self,
        product_id: Uuid,
        delta: InventoryDelta,
    ) -> Result<Inventory, AppError> {
        let current = self
            .lock_inventory(product_id)
            .await?
            .ok_or_else(|| AppError::not_found("Estoque do produto", product_id))?;
        let next = current.apply(delta)?;
        self.write_inventory(&next).await
    }

    // --- Reservas ---
    /// Soma de `quantity` das reservas do produto cuja janela cruza `window`
    /// e cujo status está em `statuses`.
    async fn overlapping_quantity(
        &mut self,
        product_id: Uuid,
        window: RentalWindow,
        statuses: &[ReservationStatus],
    ) -> Result<i64, AppError>;
    async fn list_holding_reservations(&mut self, product_id: Uuid) -> Result<Vec<Reservation>, AppError>;
    async fn insert_reservation(&mut self, new: NewReservation) -> Result<Reservation, AppError>;
    async fn find_reservation(&mut self, id: Uuid) -> Result<Option<Reservation>, AppError>;
    /// Mais recentes primeiro.
    async fn list_reservations(&mut self, filter: &ReservationFilter) -> Result<Vec<Reservation>, AppError>;
    async fn set_reservation_status(
        &mut self,
        id: Uuid,
        status: ReservationStatus,
    ) -> Result<Reservation, AppError>;

    // --- Cotações ---
    async fn insert_quotation(&mut self, owner_id: Uuid, new: NewQuotation) -> Result<Quotation, AppError>;
    async fn find_quotation(&mut self, id: Uuid) -> Result<Option<Quotation>, AppError>;
    /// Carrega e trava as cotações (ids ausentes simplesmente não voltam).
    async fn find_quotations_for_update(&mut self, ids: &[Uuid]) -> Result<Vec<Quotation>, AppError>;
    async fn list_quotations(&mut self, filter: &QuotationFilter) -> Result<Vec<Quotation>, AppError>;
    async fn save_quotation(&mut self, quotation: &Quotation) -> Result<Quotation, AppError>;
    async fn set_quotations_status(&mut self, ids: &[Uuid], status: QuotationStatus) -> Result<u64, AppError>;

    // --- Pedido do cliente ---
    async fn insert_customer_order(&mut self, new: NewCustomerOrder) -> Result<CustomerOrder, AppError>;
    async fn find_customer_order(&mut self, id: Uuid) -> Result<Option<CustomerOrder>, AppError>;
    async fn find_draft_order(&mut self, customer_id: Uuid) -> Result<Option<CustomerOrder>, AppError>;
    async fn list_customer_orders(&mut self, customer_id: Uuid) -> Result<Vec<CustomerOrder>, AppError>;
    async fn save_customer_order(&mut self, order: &CustomerOrder) -> Result<CustomerOrder, AppError>;

    // --- Pedido de locação (por fornecedor) ---
    async fn insert_rental_order(
        &mut self,
        customer_order_id: Uuid,
        vendor_id: Uuid,
        total_amount: rust_decimal::Decimal,
    ) -> Result<RentalOrder, AppError>;
    async fn find_rental_order(&mut self, id: Uuid) -> Result<Option<RentalOrder>, AppError>;
    async fn find_rental_order_for_vendor(
        &mut self,
        customer_order_id: Uuid,
        vendor_id: Uuid,
    ) -> Result<Option<RentalOrder>, AppError>;
    async fn list_rental_orders(&mut self, customer_order_id: Uuid) -> Result<Vec<RentalOrder>, AppError>;
    async fn list_vendor_rental_orders(&mut self, vendor_id: Uuid) -> Result<Vec<RentalOrder>, AppError>;
    async fn save_rental_order(&mut self, order: &RentalOrder) -> Result<RentalOrder, AppError>;
    async fn delete_rental_order(&mut self, id: Uuid) -> Result<(), AppError>;

    // --- Linhas ---
    async fn insert_line(&mut self, new: NewRentalOrderLine) -> Result<RentalOrderLine, AppError>;
    /// Carrega e trava a linha.
    async fn find_line(&mut self, id: Uuid) -> Result<Option<RentalOrderLine>, AppError>;
    async fn find_line_for_product(
        &mut self,
        rental_order_id: Uuid,
        product_id: Uuid,
    ) -> Result<Option<RentalOrderLine>, AppError>;
    async fn find_line_by_payment_link(&mut self, link_id: &str) -> Result<Option<RentalOrderLine>, AppError>;
    async fn list_lines(&mut self, rental_order_ids: &[Uuid]) -> Result<Vec<RentalOrderLine>, AppError>;
    async fn save_line(&mut self, line: &RentalOrderLine) -> Result<RentalOrderLine, AppError>;
    async fn delete_line(&mut self, id: Uuid) -> Result<(), AppError>;

    // --- Transferências ---
    async fn insert_transfer(
        &mut self,
        line_id: Uuid,
        kind: TransferKind,
        details: &TransferDetails,
        created_by: Uuid,
    ) -> Result<Transfer, AppError>;

    async fn commit(self: Box<Self>) -> Result<(), AppError>;
}
