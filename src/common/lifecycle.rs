// src/common/lifecycle.rs

use std::fmt::Debug;

use crate::common::error::AppError;

/// Máquina de estados de um campo `status`.
///
/// Cada entidade declara apenas a sua tabela de transições legais; a
/// verificação (e a mensagem de erro) fica centralizada aqui.
pub trait Lifecycle: Copy + PartialEq + Debug + Send + Sync + 'static {
    /// Nome da entidade usado nas mensagens de erro.
    const ENTITY: &'static str;

    fn allowed_next(self) -> &'static [Self];

    fn can_transition_to(self, next: Self) -> bool {
        self.allowed_next().contains(&next)
    }

    fn is_terminal(self) -> bool {
        self.allowed_next().is_empty()
    }

    /// Valida `self -> next`. Transições ilegais são `Conflict`.
    fn transition(self, next: Self) -> Result<Self, AppError> {
        if self.can_transition_to(next) {
            Ok(next)
        } else {
            Err(AppError::Conflict(format!(
                "{}: transição inválida de {:?} para {:?}.",
                Self::ENTITY,
                self,
                next
            )))
        }
    }
}
