// src/models/inventory.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::common::error::AppError;

// --- Livro de estoque: uma linha por produto ---
// Invariante em repouso: available + reserved == total
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Inventory {
    pub id: Uuid,
    pub product_id: Uuid,
    pub total_quantity: i32,
    pub available_quantity: i32,
    pub reserved_quantity: i32,
    pub updated_at: DateTime<Utc>,
}

impl Inventory {
    pub fn availability(&self) -> Availability {
        Availability {
            product_id: self.product_id,
            total: self.total_quantity,
            available: self.available_quantity,
            reserved: self.reserved_quantity,
        }
    }

    pub fn is_balanced(&self) -> bool {
        self.available_quantity + self.reserved_quantity == self.total_quantity
    }

    /// Aplica o delta em memória, recusando contadores negativos.
    /// Quem persiste usa o resultado; a transação aborta no erro.
    pub fn apply(&self, delta: InventoryDelta) -> Result<Inventory, AppError> {
        let (Some(available), Some(reserved), Some(total)) = (
            self.available_quantity.checked_add(delta.available),
            self.reserved_quantity.checked_add(delta.reserved),
            self.total_quantity.checked_add(delta.total),
        ) else {
            return Err(AppError::Validation(format!(
                "Quantidade fora do limite para o produto {}.",
                self.product_id
            )));
        };
        if available < 0 || reserved < 0 || total < 0 {
            return Err(AppError::Conflict(format!(
                "Estoque insuficiente para o produto {} (disponível {}, reservado {}).",
                self.product_id, self.available_quantity, self.reserved_quantity
            )));
        }
        Ok(Inventory {
            total_quantity: total,
            available_quantity: available,
            reserved_quantity: reserved,
            updated_at: Utc::now(),
            ..self.clone()
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Availability {
    pub product_id: Uuid,
    pub total: i32,
    pub available: i32,
    pub reserved: i32,
}

/// Disponibilidade real para uma janela: total menos o que se sobrepõe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct WindowAvailability {
    pub product_id: Uuid,
    pub total: i32,
    pub overlapping: i64,
    pub available_for_window: i64,
}

/// Deltas com sinal aplicados atomicamente aos contadores.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InventoryDelta {
    pub total: i32,
    pub available: i32,
    pub reserved: i32,
}

impl InventoryDelta {
    /// available -> reserved (segurar unidades)
    pub fn hold(qty: i32) -> Self {
        Self { total: 0, available: -qty, reserved: qty }
    }

    /// reserved -> available (devolução ou cancelamento)
    pub fn release(qty: i32) -> Self {
        Self { total: 0, available: qty, reserved: -qty }
    }

    /// Novas unidades físicas
    pub fn restock(qty: i32) -> Self {
        Self { total: qty, available: qty, reserved: 0 }
    }

    /// Baixa de unidades físicas (só sai do que está livre)
    pub fn retire(qty: i32) -> Self {
        Self { total: -qty, available: -qty, reserved: 0 }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn inventory(total: i32, available: i32, reserved: i32) -> Inventory {
        Inventory {
            id: Uuid::new_v4(),
            product_id: Uuid::new_v4(),
            total_quantity: total,
            available_quantity: available,
            reserved_quantity: reserved,
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn hold_then_release_keeps_the_ledger_balanced() {
        let inv = inventory(3, 3, 0);
        let held = inv.apply(InventoryDelta::hold(2)).unwrap();
        assert_eq!((held.available_quantity, held.reserved_quantity), (1, 2));
        assert!(held.is_balanced());

        let released = held.apply(InventoryDelta::release(2)).unwrap();
        assert_eq!(released.availability().available, 3);
        assert!(released.is_balanced());
    }

    #[test]
    fn negative_counters_are_rejected() {
        let inv = inventory(1, 1, 0);
        assert!(matches!(inv.apply(InventoryDelta::hold(2)), Err(AppError::Conflict(_))));
        assert!(matches!(inv.apply(InventoryDelta::release(1)), Err(AppError::Conflict(_))));
    }

    #[test]
    fn overflowing_restock_is_rejected() {
        let inv = inventory(5, 5, 0);
        assert!(matches!(inv.apply(InventoryDelta::restock(i32::MAX)), Err(AppError::Validation(_))));
    }

    #[test]
    fn retire_never_touches_reserved_units() {
        let inv = inventory(5, 3, 2);
        let retired = inv.apply(InventoryDelta::retire(3)).unwrap();
        assert_eq!((retired.total_quantity, retired.available_quantity, retired.reserved_quantity), (2, 0, 2));
        assert!(retired.is_balanced());
        assert!(matches!(inv.apply(InventoryDelta::retire(4)), Err(AppError::Conflict(_))));
    }
}
