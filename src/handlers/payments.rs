// src/handlers/payments.rs

use axum::{
    body::Bytes,
    extract::State,
    http::HeaderMap,
    response::IntoResponse,
    Json,
};
use hmac::{Hmac, Mac};
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::json;
use sha2::Sha256;

use crate::{common::error::AppError, config::AppState};

pub const SIGNATURE_HEADER: &str = "x-payment-signature";
const LINK_PAID_EVENT: &str = "payment_link.paid";

type HmacSha256 = Hmac<Sha256>;

/// HMAC-SHA256 do corpo cru, em hex, comparado em tempo constante.
pub fn verify_signature(secret: &str, body: &[u8], signature_hex: &str) -> bool {
    let Ok(expected) = hex::decode(signature_hex.trim()) else {
        return false;
    };
    let Ok(mut mac) = HmacSha256::new_from_slice(secret.as_bytes()) else {
        return false;
    };
    mac.update(body);
    mac.verify_slice(&expected).is_ok()
}

// --- Formato do evento do gateway (só o que usamos) ---
#[derive(Debug, Deserialize)]
struct WebhookEvent {
    event: String,
    payload: Option<WebhookPayload>,
}

#[derive(Debug, Deserialize)]
struct WebhookPayload {
    payment_link: Option<EntityWrapper>,
}

#[derive(Debug, Deserialize)]
struct EntityWrapper {
    entity: PaymentLinkEntity,
}

#[derive(Debug, Deserialize)]
struct PaymentLinkEntity {
    id: String,
    // Em unidades mínimas da moeda
    amount_paid: Option<i64>,
}

// POST /api/payments/webhook
#[utoipa::path(
    post,
    path = "/api/payments/webhook",
    tag = "Payments",
    request_body(content = String, description = "Evento do gateway, assinado em x-payment-signature"),
    responses(
        (status = 200, description = "Evento processado ou ignorado"),
        (status = 400, description = "Assinatura inválida")
    )
)]
pub async fn payment_webhook(
    State(app_state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<impl IntoResponse, AppError> {
    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();
    if !verify_signature(&app_state.webhook_secret, &body, signature) {
        tracing::warn!("🔏 Webhook de pagamento com assinatura inválida");
        return Err(AppError::Validation("Assinatura inválida.".into()));
    }

    let event: WebhookEvent = serde_json::from_slice(&body)
        .map_err(|e| AppError::Validation(format!("Evento malformado: {}", e)))?;
    if event.event != LINK_PAID_EVENT {
        return Ok(Json(json!({ "status": "ignored" })));
    }

    let entity = event
        .payload
        .and_then(|p| p.payment_link)
        .map(|w| w.entity)
        .ok_or_else(|| AppError::Validation("Evento sem payment_link.".into()))?;
    let amount = entity.amount_paid.map(|minor| Decimal::new(minor, 2));

    app_state
        .lifecycle_service
        .settle_payment_link(&entity.id, amount)
        .await?;

    Ok(Json(json!({ "status": "ok" })))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sign(secret: &str, body: &[u8]) -> String {
        let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).unwrap();
        mac.update(body);
        hex::encode(mac.finalize().into_bytes())
    }

    #[test]
    fn accepts_the_gateway_signature() {
        let body = br#"{"event":"payment_link.paid"}"#;
        let signature = sign("whsec", body);
        assert!(verify_signature("whsec", body, &signature));
    }

    #[test]
    fn rejects_tampered_body_wrong_secret_and_garbage() {
        let body = br#"{"event":"payment_link.paid"}"#;
        let signature = sign("whsec", body);
        assert!(!verify_signature("whsec", br#"{"event":"payment_link.cancelled"}"#, &signature));
        assert!(!verify_signature("outro", body, &signature));
        assert!(!verify_signature("whsec", body, "not-hex"));
        assert!(!verify_signature("whsec", body, ""));
    }

    #[test]
    fn event_payload_parses_link_id_and_minor_units() {
        let raw = r#"{
            "event": "payment_link.paid",
            "payload": { "payment_link": { "entity": { "id": "plink_123", "amount_paid": 55050 } } }
        }"#;
        let event: WebhookEvent = serde_json::from_str(raw).unwrap();
        let entity = event.payload.unwrap().payment_link.unwrap().entity;
        assert_eq!(entity.id, "plink_123");
        assert_eq!(entity.amount_paid.map(|m| Decimal::new(m, 2)), Some(Decimal::new(55050, 2)));
    }
}
