// src/db/product_repo.rs

use sqlx::{Executor, Postgres};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::product::{NewProduct, Product, ProductStatus},
};

#[derive(Clone, Copy, Default)]
pub struct ProductRepository;

impl ProductRepository {
    pub async fn create_product<'e, E>(
        &self,
        executor: E,
        new: &NewProduct,
    ) -> Result<Product, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let product = sqlx::query_as::<_, Product>(
            r#"
            INSERT INTO products (
                owner_id, name, description, category_id, images, status, base_quantity, daily_rate
            )
            VALUES ($1, $2, $3, $4, $5, 'available', $6, $7)
            RETURNING *
            "#,
        )
        .bind(new.owner_id)
        .bind(&new.name)
        .bind(&new.description)
        .bind(new.category_id)
        .bind(&new.images)
        .bind(new.base_quantity)
        .bind(new.daily_rate)
        .fetch_one(executor)
        .await?;

        Ok(product)
    }

    pub async fn find_by_id<'e, E>(&self, executor: E, id: Uuid) -> Result<Option<Product>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let product = sqlx::query_as::<_, Product>("SELECT * FROM products WHERE id = $1")
            .bind(id)
            .fetch_optional(executor)
            .await?;
        Ok(product)
    }

    pub async fn set_status<'e, E>(
        &self,
        executor: E,
        id: Uuid,
        status: ProductStatus,
    ) -> Result<Product, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let product = sqlx::query_as::<_, Product>(
            "UPDATE products SET status = $2, updated_at = NOW() WHERE id = $1 RETURNING *",
        )
        .bind(id)
        .bind(status)
        .fetch_optional(executor)
        .await?;

        product.ok_or_else(|| AppError::not_found("Produto", id))
    }
}
