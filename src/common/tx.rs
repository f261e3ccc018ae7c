// src/common/tx.rs

use std::future::Future;
use std::time::Duration;

use crate::common::error::AppError;

/// Executa uma unidade de trabalho transacional com prazo máximo.
///
/// Se o prazo estourar o future é descartado junto com a transação que ele
/// segura (rollback no drop), e o chamador recebe um `Conflict` que pode ser
/// repetido.
pub async fn bounded<T, F>(limit: Duration, op: &'static str, work: F) -> Result<T, AppError>
where
    F: Future<Output = Result<T, AppError>>,
{
    match tokio::time::timeout(limit, work).await {
        Ok(result) => result,
        Err(_) => {
            tracing::warn!("⏱️ {} excedeu {:?}, transação abortada", op, limit);
            Err(AppError::Conflict(format!(
                "A operação '{}' não concluiu a tempo. Tente novamente.",
                op
            )))
        }
    }
}
