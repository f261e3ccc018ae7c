// src/services/inventory_service.rs

use std::{collections::BTreeMap, sync::Arc, time::Duration};

use uuid::Uuid;

use crate::{
    common::{error::AppError, tx},
    db::store::{RentalStore, RentalTx},
    models::{
        auth::{Principal, Role},
        inventory::{Availability, Inventory, InventoryDelta, WindowAvailability},
        reservation::{peak_concurrent, RentalWindow, Reservation, ReservationFilter, ReservationStatus},
    },
};

/// Livro de estoque + consulta de sobreposição.
///
/// As leituras públicas abrem a própria transação; os demais métodos recebem
/// a transação do chamador para que a checagem e a escrita aconteçam juntas.
#[derive(Clone)]
pub struct InventoryService {
    store: Arc<dyn RentalStore>,
    tx_timeout: Duration,
}

impl InventoryService {
    pub fn new(store: Arc<dyn RentalStore>, tx_timeout: Duration) -> Self {
        Self { store, tx_timeout }
    }

    // --- LEITURAS ---

    pub async fn get_availability(&self, product_id: Uuid) -> Result<Availability, AppError> {
        tx::bounded(self.tx_timeout, "getAvailability", async {
            let mut tx = self.store.begin().await?;
            let inventory = Self::require_inventory(tx.as_mut(), product_id).await?;
            Ok(inventory.availability())
        })
        .await
    }

    pub async fn window_availability(
        &self,
        product_id: Uuid,
        window: RentalWindow,
    ) -> Result<WindowAvailability, AppError> {
        tx::bounded(self.tx_timeout, "windowAvailability", async {
            let mut tx = self.store.begin().await?;
            let inventory = Self::require_inventory(tx.as_mut(), product_id).await?;
            Self::window_capacity(tx.as_mut(), &inventory, window).await
        })
        .await
    }

    /// Clientes e fornecedores só enxergam as próprias reservas; admin
    /// precisa dizer de quem.
    pub async fn list_reservations(
        &self,
        principal: &Principal,
        filter: ReservationFilter,
    ) -> Result<Vec<Reservation>, AppError> {
        let filter = match principal.role {
            Role::Admin if filter.is_empty() => {
                return Err(AppError::Validation("Informe customerId ou vendorId.".into()));
            }
            Role::Admin => filter,
            Role::Vendor => ReservationFilter { vendor_id: Some(principal.id), ..filter },
            Role::Customer => ReservationFilter { customer_id: Some(principal.id), ..filter },
        };

        tx::bounded(self.tx_timeout, "getReservations", async {
            let mut tx = self.store.begin().await?;
            tx.list_reservations(&filter).await
        })
        .await
    }

    // --- DENTRO DA TRANSAÇÃO DO CHAMADOR ---

    async fn require_inventory(tx: &mut dyn RentalTx, product_id: Uuid) -> Result<Inventory, AppError> {
        tx.lock_inventory(product_id)
            .await?
            .ok_or_else(|| AppError::not_found("Estoque do produto", product_id))
    }

    /// Trava as linhas de estoque em ordem crescente de id de produto.
    /// Ordem fixa: duas transações nunca esperam uma pela outra em ciclo.
    pub async fn lock_products(
        tx: &mut dyn RentalTx,
        product_ids: impl IntoIterator<Item = Uuid>,
    ) -> Result<BTreeMap<Uuid, Inventory>, AppError> {
        let ordered: std::collections::BTreeSet<Uuid> = product_ids.into_iter().collect();
        let mut locked = BTreeMap::new();
        for product_id in ordered {
            let inventory = Self::require_inventory(tx, product_id).await?;
            locked.insert(product_id, inventory);
        }
        Ok(locked)
    }

    pub async fn window_capacity(
        tx: &mut dyn RentalTx,
        inventory: &Inventory,
        window: RentalWindow,
    ) -> Result<WindowAvailability, AppError> {
        let overlapping = tx
            .overlapping_quantity(inventory.product_id, window, &ReservationStatus::HOLDING)
            .await?;
        Ok(WindowAvailability {
            product_id: inventory.product_id,
            total: inventory.total_quantity,
            overlapping,
            available_for_window: i64::from(inventory.total_quantity) - overlapping,
        })
    }

    /// Checagem autoritativa: `total - sobreposição >= pedido`.
    /// `pending` soma o que o próprio lote já vai segurar nessa janela.
    pub async fn ensure_capacity(
        tx: &mut dyn RentalTx,
        inventory: &Inventory,
        window: RentalWindow,
        quantity: i32,
        pending: i64,
    ) -> Result<(), AppError> {
        let capacity = Self::window_capacity(tx, inventory, window).await?;
        let free = capacity.available_for_window - pending;
        if free < i64::from(quantity) {
            tracing::warn!(
                "🚫 Sem disponibilidade: produto {} pediu {} em {} .. {} (livre {})",
                inventory.product_id,
                quantity,
                window.from,
                window.to,
                free.max(0)
            );
            return Err(AppError::Conflict(format!(
                "Disponibilidade insuficiente para o produto {}: {} solicitado(s), {} livre(s) no período.",
                inventory.product_id,
                quantity,
                free.max(0)
            )));
        }
        Ok(())
    }

    /// Reconcilia `reserved` com o pico de unidades seguradas ao mesmo tempo
    /// pelas reservas ativas do produto e move a diferença de/para `available`.
    /// Chamado depois de criar, cancelar ou devolver reservas.
    pub async fn sync_holds(tx: &mut dyn RentalTx, product_id: Uuid) -> Result<Inventory, AppError> {
        let current = Self::require_inventory(tx, product_id).await?;
        let holding = tx.list_holding_reservations(product_id).await?;
        let peak = peak_concurrent(&holding);

        let shift = i32::try_from(peak - i64::from(current.reserved_quantity))
            .map_err(|_| anyhow::anyhow!("Pico de reservas fora do intervalo para {}", product_id))?;
        if shift == 0 {
            return Ok(current);
        }
        tx.adjust_inventory(product_id, InventoryDelta::hold(shift)).await
    }

    pub async fn restock(tx: &mut dyn RentalTx, product_id: Uuid, amount: i32) -> Result<Inventory, AppError> {
        tx.adjust_inventory(product_id, InventoryDelta::restock(amount)).await
    }

    /// Baixa `amount` unidades. O total restante precisa cobrir o pico das
    /// reservas que ainda seguram estoque.
    pub async fn retire(tx: &mut dyn RentalTx, product_id: Uuid, amount: i32) -> Result<Inventory, AppError> {
        let current = Self::require_inventory(tx, product_id).await?;
        let remaining = i64::from(current.total_quantity) - i64::from(amount);
        if remaining < 0 {
            return Err(AppError::Validation(format!(
                "A quantidade não pode ficar negativa (total atual {}).",
                current.total_quantity
            )));
        }

        let peak = peak_concurrent(&tx.list_holding_reservations(product_id).await?);
        if remaining < peak {
            tracing::warn!(
                "🚫 Baixa recusada: produto {} ficaria com {} para {} reservada(s)",
                product_id,
                remaining,
                peak
            );
            return Err(AppError::Conflict(format!(
                "Não é possível baixar {} unidade(s) do produto {}: {} estão reservadas ao mesmo tempo.",
                amount, product_id, peak
            )));
        }
        tx.adjust_inventory(product_id, InventoryDelta::retire(amount)).await
    }
}
