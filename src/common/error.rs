use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use serde_json::json;
use thiserror::Error;

/// Taxonomia visível ao cliente. Todo `AppError` cai em exatamente uma delas.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ErrorKind {
    ValidationError,
    NotFound,
    Forbidden,
    Conflict,
    ServerError,
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Erro de validação")]
    ValidationErrors(#[from] validator::ValidationErrors),

    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    Conflict(String),

    // Falha de um colaborador externo (gateway de pagamento)
    #[error("{0}")]
    Gateway(String),

    #[error("Token de autenticação inválido ou ausente.")]
    InvalidToken,

    #[error("Erro de banco de dados: {0}")]
    DatabaseError(sqlx::Error),

    #[error("Erro interno do servidor: {0}")]
    InternalServerError(#[from] anyhow::Error),
}

// Conversão manual: falhas de serialização e timeout de lock são conflitos
// que o cliente pode repetir, não erros internos.
impl From<sqlx::Error> for AppError {
    fn from(e: sqlx::Error) -> Self {
        if let Some(db_err) = e.as_database_error() {
            match db_err.code().as_deref() {
                Some("40001") | Some("40P01") => {
                    return AppError::Conflict(
                        "Operação concorrente sobre o mesmo estoque. Tente novamente.".into(),
                    );
                }
                Some("55P03") => {
                    return AppError::Conflict(
                        "Tempo de espera pelo estoque esgotado. Tente novamente.".into(),
                    );
                }
                _ => {}
            }
        }
        AppError::DatabaseError(e)
    }
}

impl AppError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            AppError::ValidationErrors(_) | AppError::Validation(_) => ErrorKind::ValidationError,
            AppError::NotFound(_) => ErrorKind::NotFound,
            AppError::Forbidden(_) | AppError::InvalidToken => ErrorKind::Forbidden,
            AppError::Conflict(_) => ErrorKind::Conflict,
            AppError::Gateway(_)
            | AppError::DatabaseError(_)
            | AppError::InternalServerError(_) => ErrorKind::ServerError,
        }
    }

    /// Só erros de autorização e de entrada exigem correção por parte do cliente.
    pub fn is_retryable(&self) -> bool {
        !matches!(self.kind(), ErrorKind::Forbidden | ErrorKind::ValidationError)
    }

    pub fn not_found(entity: &str, id: impl std::fmt::Display) -> Self {
        AppError::NotFound(format!("{} {} não encontrado(a).", entity, id))
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let kind = self.kind();
        let (status, message) = match &self {
            // Retorna todos os detalhes da validação, campo a campo.
            AppError::ValidationErrors(errors) => {
                let mut details = std::collections::HashMap::new();
                for (field, field_errors) in errors.field_errors() {
                    let messages: Vec<String> = field_errors
                        .iter()
                        .filter_map(|e| e.message.as_ref().map(|m| m.to_string()))
                        .collect();
                    details.insert(field.to_string(), messages);
                }
                let body = Json(json!({
                    "error": kind,
                    "message": "Um ou mais campos são inválidos.",
                    "details": details,
                }));
                return (StatusCode::BAD_REQUEST, body).into_response();
            }
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            AppError::Forbidden(msg) => (StatusCode::FORBIDDEN, msg.clone()),
            AppError::InvalidToken => (StatusCode::UNAUTHORIZED, self.to_string()),
            AppError::Conflict(msg) => (StatusCode::CONFLICT, msg.clone()),
            AppError::Gateway(msg) => {
                tracing::error!("Falha no gateway de pagamento: {}", msg);
                (
                    StatusCode::BAD_GATEWAY,
                    "Falha ao processar o pagamento. Tente novamente.".to_string(),
                )
            }
            // Nunca expomos detalhes de banco/transação para o cliente.
            e => {
                tracing::error!("Erro Interno do Servidor: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Ocorreu um erro inesperado.".to_string(),
                )
            }
        };

        let body = Json(json!({ "error": kind, "message": message }));
        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn forbidden_and_validation_are_not_retryable() {
        assert!(!AppError::Forbidden("x".into()).is_retryable());
        assert!(!AppError::Validation("x".into()).is_retryable());
        assert!(AppError::Conflict("x".into()).is_retryable());
        assert!(AppError::Gateway("x".into()).is_retryable());
        assert!(AppError::NotFound("x".into()).is_retryable());
    }

    #[test]
    fn conflict_maps_to_409() {
        let resp = AppError::Conflict("Produto já está no carrinho.".into()).into_response();
        assert_eq!(resp.status(), StatusCode::CONFLICT);
    }

    #[test]
    fn gateway_failure_is_a_server_error() {
        let err = AppError::Gateway("timeout".into());
        assert_eq!(err.kind(), ErrorKind::ServerError);
        assert_eq!(err.into_response().status(), StatusCode::BAD_GATEWAY);
    }
}
