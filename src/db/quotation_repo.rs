// src/db/quotation_repo.rs

use sqlx::{types::Json, Executor, Postgres, QueryBuilder};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::quotation::{NewQuotation, Quotation, QuotationFilter, QuotationStatus},
};

#[derive(Clone, Copy, Default)]
pub struct QuotationRepository;

impl QuotationRepository {
    pub async fn create_quotation<'e, E>(
        &self,
        executor: E,
        owner_id: Uuid,
        new: &NewQuotation,
    ) -> Result<Quotation, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        // Nasce 'pending': pronta para o cliente aceitar
        let quotation = sqlx::query_as::<_, Quotation>(
            r#"
            INSERT INTO quotations (
                product_id, owner_id, customer_id, requested_quantity, charges,
                pickup_at, return_at, pickup_address, return_address,
                pricing_breakdown, total_amount, status, expires_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, 'pending', $12)
            RETURNING *
            "#,
        )
        .bind(new.product_id)
        .bind(owner_id)
        .bind(new.customer_id)
        .bind(new.requested_quantity)
        .bind(Json(&new.charges))
        .bind(new.pickup_at)
        .bind(new.return_at)
        .bind(&new.pickup_address)
        .bind(&new.return_address)
        .bind(Json(&new.pricing_breakdown))
        .bind(new.total_amount)
        .bind(new.expires_at)
        .fetch_one(executor)
        .await?;

        Ok(quotation)
    }

    pub async fn find_by_id<'e, E>(&self, executor: E, id: Uuid) -> Result<Option<Quotation>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let quotation = sqlx::query_as::<_, Quotation>("SELECT * FROM quotations WHERE id = $1")
            .bind(id)
            .fetch_optional(executor)
            .await?;
        Ok(quotation)
    }

    /// Trava em ordem de id para que dois aceites concorrentes não se cruzem.
    pub async fn find_many_for_update<'e, E>(
        &self,
        executor: E,
        ids: &[Uuid],
    ) -> Result<Vec<Quotation>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let quotations = sqlx::query_as::<_, Quotation>(
            "SELECT * FROM quotations WHERE id = ANY($1) ORDER BY id FOR UPDATE",
        )
        .bind(ids)
        .fetch_all(executor)
        .await?;
        Ok(quotations)
    }

    pub async fn list<'e, E>(&self, executor: E, filter: &QuotationFilter) -> Result<Vec<Quotation>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let mut qb: QueryBuilder<Postgres> = QueryBuilder::new("SELECT * FROM quotations WHERE TRUE");
        if let Some(vendor_id) = filter.vendor_id {
            qb.push(" AND owner_id = ").push_bind(vendor_id);
        }
        if let Some(customer_id) = filter.customer_id {
            qb.push(" AND customer_id = ").push_bind(customer_id);
        }
        if let Some(product_id) = filter.product_id {
            qb.push(" AND product_id = ").push_bind(product_id);
        }
        if let Some(status) = filter.status {
            qb.push(" AND status = ").push_bind(status);
        }
        qb.push(" ORDER BY created_at DESC");

        let quotations = qb.build_query_as::<Quotation>().fetch_all(executor).await?;
        Ok(quotations)
    }

    pub async fn update<'e, E>(&self, executor: E, q: &Quotation) -> Result<Quotation, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let quotation = sqlx::query_as::<_, Quotation>(
            r#"
            UPDATE quotations
            SET requested_quantity = $2,
                charges = $3,
                pickup_at = $4,
                return_at = $5,
                pickup_address = $6,
                return_address = $7,
                pricing_breakdown = $8,
                total_amount = $9,
                status = $10,
                expires_at = $11,
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(q.id)
        .bind(q.requested_quantity)
        .bind(Json(&q.charges))
        .bind(q.pickup_at)
        .bind(q.return_at)
        .bind(&q.pickup_address)
        .bind(&q.return_address)
        .bind(Json(&q.pricing_breakdown))
        .bind(q.total_amount)
        .bind(q.status)
        .bind(q.expires_at)
        .fetch_optional(executor)
        .await?;

        quotation.ok_or_else(|| AppError::not_found("Cotação", q.id))
    }

    pub async fn set_status_many<'e, E>(
        &self,
        executor: E,
        ids: &[Uuid],
        status: QuotationStatus,
    ) -> Result<u64, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let result = sqlx::query("UPDATE quotations SET status = $2, updated_at = NOW() WHERE id = ANY($1)")
            .bind(ids)
            .bind(status)
            .execute(executor)
            .await?;
        Ok(result.rows_affected())
    }
}
