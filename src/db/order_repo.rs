// src/db/order_repo.rs

use rust_decimal::Decimal;
use sqlx::{types::Json, Executor, Postgres};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::orders::{
        CustomerOrder, NewCustomerOrder, NewRentalOrderLine, RentalOrder, RentalOrderLine,
        Transfer, TransferDetails, TransferKind, DEFAULT_REMINDER_GAP_DAYS,
    },
};

#[derive(Clone, Copy, Default)]
pub struct OrderRepository;

impl OrderRepository {
    // =========================================================================
    //  CUSTOMER ORDERS
    // =========================================================================

    pub async fn create_customer_order<'e, E>(
        &self,
        executor: E,
        new: &NewCustomerOrder,
    ) -> Result<CustomerOrder, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let order = sqlx::query_as::<_, CustomerOrder>(
            r#"
            INSERT INTO customer_orders (
                customer_id, status, total_amount, payment_status, payment_type,
                paid_amount, rent_from, rent_to
            )
            VALUES ($1, $2, $3, 'pending', $4, 0, $5, $6)
            RETURNING *
            "#,
        )
        .bind(new.customer_id)
        .bind(new.status)
        .bind(new.total_amount)
        .bind(new.payment_type)
        .bind(new.window.map(|w| w.from))
        .bind(new.window.map(|w| w.to))
        .fetch_one(executor)
        .await
        .map_err(|e| {
            // Índice parcial: um único carrinho 'draft' por cliente
            if let sqlx::Error::Database(db_err) = &e {
                if db_err.is_unique_violation() {
                    return AppError::Conflict("O cliente já possui um carrinho aberto.".into());
                }
            }
            e.into()
        })?;

        Ok(order)
    }

    pub async fn find_customer_order<'e, E>(
        &self,
        executor: E,
        id: Uuid,
    ) -> Result<Option<CustomerOrder>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let order = sqlx::query_as::<_, CustomerOrder>(
            "SELECT * FROM customer_orders WHERE id = $1 FOR UPDATE",
        )
        .bind(id)
        .fetch_optional(executor)
        .await?;
        Ok(order)
    }

    pub async fn find_draft_order<'e, E>(
        &self,
        executor: E,
        customer_id: Uuid,
    ) -> Result<Option<CustomerOrder>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let order = sqlx::query_as::<_, CustomerOrder>(
            "SELECT * FROM customer_orders WHERE customer_id = $1 AND status = 'draft' FOR UPDATE",
        )
        .bind(customer_id)
        .fetch_optional(executor)
        .await?;
        Ok(order)
    }

    pub async fn list_customer_orders<'e, E>(
        &self,
        executor: E,
        customer_id: Uuid,
    ) -> Result<Vec<CustomerOrder>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let orders = sqlx::query_as::<_, CustomerOrder>(
            "SELECT * FROM customer_orders WHERE customer_id = $1 AND status <> 'draft' ORDER BY created_at DESC",
        )
        .bind(customer_id)
        .fetch_all(executor)
        .await?;
        Ok(orders)
    }

    pub async fn update_customer_order<'e, E>(
        &self,
        executor: E,
        order: &CustomerOrder,
    ) -> Result<CustomerOrder, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let updated = sqlx::query_as::<_, CustomerOrder>(
            r#"
            UPDATE customer_orders
            SET status = $2,
                total_amount = $3,
                payment_status = $4,
                payment_type = $5,
                paid_amount = $6,
                rent_from = $7,
                rent_to = $8,
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(order.id)
        .bind(order.status)
        .bind(order.total_amount)
        .bind(order.payment_status)
        .bind(order.payment_type)
        .bind(order.paid_amount)
        .bind(order.rent_from)
        .bind(order.rent_to)
        .fetch_optional(executor)
        .await?;

        updated.ok_or_else(|| AppError::not_found("Pedido do cliente", order.id))
    }

    // =========================================================================
    //  RENTAL ORDERS
    // =========================================================================

    pub async fn create_rental_order<'e, E>(
        &self,
        executor: E,
        customer_order_id: Uuid,
        vendor_id: Uuid,
        total_amount: Decimal,
    ) -> Result<RentalOrder, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let order = sqlx::query_as::<_, RentalOrder>(
            r#"
            INSERT INTO rental_orders (
                customer_order_id, vendor_id, status, total_amount,
                owner_reminder_gap_days, customer_reminder_gap_days
            )
            VALUES ($1, $2, 'pending', $3, $4, $4)
            RETURNING *
            "#,
        )
        .bind(customer_order_id)
        .bind(vendor_id)
        .bind(total_amount)
        .bind(DEFAULT_REMINDER_GAP_DAYS)
        .fetch_one(executor)
        .await?;

        Ok(order)
    }

    pub async fn find_rental_order<'e, E>(&self, executor: E, id: Uuid) -> Result<Option<RentalOrder>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let order = sqlx::query_as::<_, RentalOrder>("SELECT * FROM rental_orders WHERE id = $1 FOR UPDATE")
            .bind(id)
            .fetch_optional(executor)
            .await?;
        Ok(order)
    }

    pub async fn find_rental_order_for_vendor<'e, E>(
        &self,
        executor: E,
        customer_order_id: Uuid,
        vendor_id: Uuid,
    ) -> Result<Option<RentalOrder>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let order = sqlx::query_as::<_, RentalOrder>(
            "SELECT * FROM rental_orders WHERE customer_order_id = $1 AND vendor_id = $2",
        )
        .bind(customer_order_id)
        .bind(vendor_id)
        .fetch_optional(executor)
        .await?;
        Ok(order)
    }

    pub async fn list_rental_orders<'e, E>(
        &self,
        executor: E,
        customer_order_id: Uuid,
    ) -> Result<Vec<RentalOrder>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let orders = sqlx::query_as::<_, RentalOrder>(
            "SELECT * FROM rental_orders WHERE customer_order_id = $1 ORDER BY created_at ASC",
        )
        .bind(customer_order_id)
        .fetch_all(executor)
        .await?;
        Ok(orders)
    }

    pub async fn list_vendor_rental_orders<'e, E>(
        &self,
        executor: E,
        vendor_id: Uuid,
    ) -> Result<Vec<RentalOrder>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        // Carrinhos ('draft') ainda não são pedidos para o fornecedor
        let orders = sqlx::query_as::<_, RentalOrder>(
            r#"
            SELECT ro.* FROM rental_orders ro
            JOIN customer_orders co ON co.id = ro.customer_order_id
            WHERE ro.vendor_id = $1 AND co.status <> 'draft'
            ORDER BY ro.created_at DESC
            "#,
        )
        .bind(vendor_id)
        .fetch_all(executor)
        .await?;
        Ok(orders)
    }

    pub async fn update_rental_order<'e, E>(
        &self,
        executor: E,
        order: &RentalOrder,
    ) -> Result<RentalOrder, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let updated = sqlx::query_as::<_, RentalOrder>(
            r#"
            UPDATE rental_orders
            SET status = $2,
                total_amount = $3,
                owner_reminder_gap_days = $4,
                customer_reminder_gap_days = $5,
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(order.id)
        .bind(order.status)
        .bind(order.total_amount)
        .bind(order.owner_reminder_gap_days)
        .bind(order.customer_reminder_gap_days)
        .fetch_optional(executor)
        .await?;

        updated.ok_or_else(|| AppError::not_found("Pedido de locação", order.id))
    }

    pub async fn delete_rental_order<'e, E>(&self, executor: E, id: Uuid) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query("DELETE FROM rental_orders WHERE id = $1")
            .bind(id)
            .execute(executor)
            .await?;
        Ok(())
    }

    // =========================================================================
    //  LINES
    // =========================================================================

    pub async fn create_line<'e, E>(
        &self,
        executor: E,
        new: &NewRentalOrderLine,
    ) -> Result<RentalOrderLine, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let line = sqlx::query_as::<_, RentalOrderLine>(
            r#"
            INSERT INTO rental_order_lines (
                rental_order_id, quotation_id, product_id, product_snapshot, quantity,
                from_at, to_at, unit_price, extras, line_total, reservation_id, status
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, 'reserved')
            RETURNING *
            "#,
        )
        .bind(new.rental_order_id)
        .bind(new.quotation_id)
        .bind(new.product_id)
        .bind(Json(&new.product_snapshot))
        .bind(new.quantity)
        .bind(new.window.from)
        .bind(new.window.to)
        .bind(new.unit_price)
        .bind(Json(&new.extras))
        .bind(new.line_total)
        .bind(new.reservation_id)
        .fetch_one(executor)
        .await?;

        Ok(line)
    }

    pub async fn find_line<'e, E>(&self, executor: E, id: Uuid) -> Result<Option<RentalOrderLine>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let line = sqlx::query_as::<_, RentalOrderLine>(
            "SELECT * FROM rental_order_lines WHERE id = $1 FOR UPDATE",
        )
        .bind(id)
        .fetch_optional(executor)
        .await?;
        Ok(line)
    }

    pub async fn find_line_for_product<'e, E>(
        &self,
        executor: E,
        rental_order_id: Uuid,
        product_id: Uuid,
    ) -> Result<Option<RentalOrderLine>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let line = sqlx::query_as::<_, RentalOrderLine>(
            "SELECT * FROM rental_order_lines WHERE rental_order_id = $1 AND product_id = $2 LIMIT 1",
        )
        .bind(rental_order_id)
        .bind(product_id)
        .fetch_optional(executor)
        .await?;
        Ok(line)
    }

    pub async fn find_line_by_payment_link<'e, E>(
        &self,
        executor: E,
        link_id: &str,
    ) -> Result<Option<RentalOrderLine>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let line = sqlx::query_as::<_, RentalOrderLine>(
            "SELECT * FROM rental_order_lines WHERE payment_link_id = $1 FOR UPDATE",
        )
        .bind(link_id)
        .fetch_optional(executor)
        .await?;
        Ok(line)
    }

    pub async fn list_lines<'e, E>(
        &self,
        executor: E,
        rental_order_ids: &[Uuid],
    ) -> Result<Vec<RentalOrderLine>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let lines = sqlx::query_as::<_, RentalOrderLine>(
            "SELECT * FROM rental_order_lines WHERE rental_order_id = ANY($1) ORDER BY created_at ASC",
        )
        .bind(rental_order_ids)
        .fetch_all(executor)
        .await?;
        Ok(lines)
    }

    pub async fn update_line<'e, E>(&self, executor: E, line: &RentalOrderLine) -> Result<RentalOrderLine, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let updated = sqlx::query_as::<_, RentalOrderLine>(
            r#"
            UPDATE rental_order_lines
            SET quantity = $2,
                from_at = $3,
                to_at = $4,
                unit_price = $5,
                line_total = $6,
                reservation_id = $7,
                transfer_id = $8,
                status = $9,
                late_fee = $10,
                remaining_amount = $11,
                returned_at = $12,
                payment_link_id = $13,
                payment_link_url = $14,
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(line.id)
        .bind(line.quantity)
        .bind(line.from_at)
        .bind(line.to_at)
        .bind(line.unit_price)
        .bind(line.line_total)
        .bind(line.reservation_id)
        .bind(line.transfer_id)
        .bind(line.status)
        .bind(line.late_fee)
        .bind(line.remaining_amount)
        .bind(line.returned_at)
        .bind(&line.payment_link_id)
        .bind(&line.payment_link_url)
        .fetch_optional(executor)
        .await?;

        updated.ok_or_else(|| AppError::not_found("Linha do pedido", line.id))
    }

    pub async fn delete_line<'e, E>(&self, executor: E, id: Uuid) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query("DELETE FROM rental_order_lines WHERE id = $1")
            .bind(id)
            .execute(executor)
            .await?;
        Ok(())
    }

    // =========================================================================
    //  TRANSFERS
    // =========================================================================

    pub async fn create_transfer<'e, E>(
        &self,
        executor: E,
        line_id: Uuid,
        kind: TransferKind,
        details: &TransferDetails,
        created_by: Uuid,
    ) -> Result<Transfer, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let transfer = sqlx::query_as::<_, Transfer>(
            r#"
            INSERT INTO transfers (
                rental_order_line_id, kind, carrier, tracking_number, scheduled_at, created_by
            )
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *
            "#,
        )
        .bind(line_id)
        .bind(kind)
        .bind(&details.carrier)
        .bind(&details.tracking_number)
        .bind(details.scheduled_at)
        .bind(created_by)
        .fetch_one(executor)
        .await?;

        Ok(transfer)
    }
}
