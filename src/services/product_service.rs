// src/services/product_service.rs

use std::{sync::Arc, time::Duration};

use uuid::Uuid;

use crate::{
    common::{error::AppError, tx},
    db::store::{RentalStore, RentalTx},
    models::{
        auth::{Principal, Role},
        inventory::Inventory,
        product::{NewProduct, Product, ProductStatus},
    },
    services::inventory_service::InventoryService,
};

#[derive(Clone)]
pub struct ProductService {
    store: Arc<dyn RentalStore>,
    tx_timeout: Duration,
}

/// Só o dono do produto (ou um admin) pode alterá-lo.
pub(crate) async fn owned_product(
    tx: &mut dyn RentalTx,
    principal: &Principal,
    product_id: Uuid,
) -> Result<Product, AppError> {
    let product = tx
        .find_product(product_id)
        .await?
        .ok_or_else(|| AppError::not_found("Produto", product_id))?;
    if product.owner_id != principal.id && !principal.is_admin() {
        return Err(AppError::Forbidden("Você não é o dono deste produto.".into()));
    }
    Ok(product)
}

impl ProductService {
    pub fn new(store: Arc<dyn RentalStore>, tx_timeout: Duration) -> Self {
        Self { store, tx_timeout }
    }

    /// Cria o produto e sua linha única de estoque na mesma transação.
    pub async fn create_product(&self, principal: &Principal, new: NewProduct) -> Result<(Product, Inventory), AppError> {
        if principal.role == Role::Customer {
            return Err(AppError::Forbidden("Apenas fornecedores cadastram produtos.".into()));
        }
        if new.name.trim().is_empty() {
            return Err(AppError::Validation("O nome do produto é obrigatório.".into()));
        }
        if new.base_quantity < 1 {
            return Err(AppError::Validation("A quantidade deve ser pelo menos 1.".into()));
        }
        if new.daily_rate.is_sign_negative() {
            return Err(AppError::Validation("O valor da diária não pode ser negativo.".into()));
        }

        let new = NewProduct { owner_id: principal.id, ..new };
        let (product, inventory) = tx::bounded(self.tx_timeout, "createProduct", async {
            let mut tx = self.store.begin().await?;
            let product = tx.insert_product(new).await?;
            let inventory = tx.insert_inventory(product.id, product.base_quantity).await?;
            tx.commit().await?;
            Ok((product, inventory))
        })
        .await?;

        tracing::info!("📦 Produto {} criado por {} ({} unidades)", product.id, principal.id, inventory.total_quantity);
        Ok((product, inventory))
    }

    pub async fn get_product(&self, product_id: Uuid) -> Result<Product, AppError> {
        tx::bounded(self.tx_timeout, "getProduct", async {
            let mut tx = self.store.begin().await?;
            tx.find_product(product_id)
                .await?
                .ok_or_else(|| AppError::not_found("Produto", product_id))
        })
        .await
    }

    pub async fn set_status(
        &self,
        principal: &Principal,
        product_id: Uuid,
        status: ProductStatus,
    ) -> Result<Product, AppError> {
        let product = tx::bounded(self.tx_timeout, "setProductStatus", async {
            let mut tx = self.store.begin().await?;
            owned_product(tx.as_mut(), principal, product_id).await?;
            let product = tx.set_product_status(product_id, status).await?;
            tx.commit().await?;
            Ok(product)
        })
        .await?;

        tracing::info!("📦 Produto {} agora está {:?}", product.id, product.status);
        Ok(product)
    }

    /// Novas unidades físicas: `total += n`, `available += n`.
    pub async fn increase_quantity(
        &self,
        principal: &Principal,
        product_id: Uuid,
        amount: i32,
    ) -> Result<Inventory, AppError> {
        if amount <= 0 {
            return Err(AppError::Validation("A quantidade adicionada deve ser positiva.".into()));
        }

        let inventory = tx::bounded(self.tx_timeout, "increaseQuantity", async {
            let mut tx = self.store.begin().await?;
            owned_product(tx.as_mut(), principal, product_id).await?;
            let inventory = InventoryService::restock(tx.as_mut(), product_id, amount).await?;
            tx.commit().await?;
            Ok(inventory)
        })
        .await?;

        tracing::info!("📦 Estoque de {} ampliado em {} (total {})", product_id, amount, inventory.total_quantity);
        Ok(inventory)
    }

    /// Baixa de unidades físicas: `total -= n`, `available -= n`.
    pub async fn decrease_quantity(
        &self,
        principal: &Principal,
        product_id: Uuid,
        amount: i32,
    ) -> Result<Inventory, AppError> {
        if amount <= 0 {
            return Err(AppError::Validation("A quantidade retirada deve ser positiva.".into()));
        }

        let inventory = tx::bounded(self.tx_timeout, "decreaseQuantity", async {
            let mut tx = self.store.begin().await?;
            owned_product(tx.as_mut(), principal, product_id).await?;
            let inventory = InventoryService::retire(tx.as_mut(), product_id, amount).await?;
            tx.commit().await?;
            Ok(inventory)
        })
        .await?;

        tracing::info!("📦 Estoque de {} reduzido em {} (total {})", product_id, amount, inventory.total_quantity);
        Ok(inventory)
    }
}
