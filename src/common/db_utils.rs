use std::time::Duration;

use sqlx::{PgPool, Postgres, Transaction};

use crate::common::error::AppError;

// ---
// Helper: abre a transação "forte" usada por toda escrita de reserva/estoque
// ---
/// Abre uma transação SERIALIZABLE e limita quanto tempo ela espera por locks.
/// Fecha o check-then-act entre a consulta de sobreposição e a escrita.
pub(crate) async fn begin_serializable(
    pool: &PgPool,
    lock_timeout: Duration,
) -> Result<Transaction<'static, Postgres>, AppError> {
    // O operador '?' converte sqlx::Error -> AppError (40001/55P03 viram Conflict)
    let mut tx = pool.begin().await?;

    // Precisa ser o primeiro comando da transação.
    sqlx::query("SET TRANSACTION ISOLATION LEVEL SERIALIZABLE")
        .execute(&mut *tx)
        .await?;

    // 'true' = vale só para esta transação (equivalente a SET LOCAL)
    sqlx::query("SELECT set_config('lock_timeout', $1, true)")
        .bind(format!("{}ms", lock_timeout.as_millis()))
        .execute(&mut *tx)
        .await?;

    Ok(tx)
}
