// src/services/payment_gateway.rs

use std::time::Duration;

use async_trait::async_trait;
use rust_decimal::{prelude::ToPrimitive, Decimal};
use serde::{Deserialize, Serialize};
use serde_json::json;
use uuid::Uuid;

use crate::common::error::AppError;

#[derive(Debug, Clone, PartialEq)]
pub struct PaymentLinkRequest {
    pub customer_id: Uuid,
    pub amount: Decimal,
    pub description: String,
    /// Linha do pedido que originou a cobrança.
    pub reference_id: Uuid,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentLink {
    pub id: String,
    pub short_url: String,
}

/// Colaborador de pagamento: só sabe criar um link para um valor.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    async fn create_payment_link(&self, req: &PaymentLinkRequest) -> Result<PaymentLink, AppError>;
}

#[derive(Debug, Clone)]
pub struct GatewayConfig {
    pub base_url: String,
    pub key_id: String,
    pub key_secret: String,
    pub currency: String,
    pub callback_url: Option<String>,
    /// Prazo de cada chamada HTTP (conexão + resposta).
    pub timeout: Duration,
}

/// API HTTP de links de pagamento (autenticação básica com key id/secret).
#[derive(Clone)]
pub struct HttpPaymentGateway {
    client: reqwest::Client,
    config: GatewayConfig,
}

enum Attempt {
    Done(PaymentLink),
    // Falha de transporte ou 5xx: vale uma nova tentativa
    Retry(String),
    Fail(String),
}

impl HttpPaymentGateway {
    pub fn new(config: GatewayConfig) -> Result<Self, AppError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| AppError::Gateway(format!("cliente HTTP do gateway: {}", e)))?;
        Ok(Self { client, config })
    }

    fn body(&self, req: &PaymentLinkRequest) -> Result<serde_json::Value, AppError> {
        // Valor em centavos (unidade mínima da moeda)
        let minor_units = (req.amount * Decimal::ONE_HUNDRED)
            .round()
            .to_i64()
            .ok_or_else(|| AppError::Validation(format!("Valor inválido para cobrança: {}", req.amount)))?;

        let mut body = json!({
            "amount": minor_units,
            "currency": self.config.currency,
            "description": req.description,
            "reference_id": req.reference_id.to_string(),
            "customer": { "id": req.customer_id.to_string() },
        });
        if let Some(url) = &self.config.callback_url {
            body["callback_url"] = json!(url);
            body["callback_method"] = json!("get");
        }
        Ok(body)
    }

    async fn attempt(&self, body: &serde_json::Value) -> Attempt {
        let url = format!("{}/payment_links", self.config.base_url.trim_end_matches('/'));
        let res = match self
            .client
            .post(&url)
            .basic_auth(&self.config.key_id, Some(&self.config.key_secret))
            .json(body)
            .send()
            .await
        {
            Ok(res) => res,
            Err(e) => return Attempt::Retry(e.to_string()),
        };

        let status = res.status();
        if status.is_server_error() {
            return Attempt::Retry(format!("gateway respondeu {}", status));
        }
        if !status.is_success() {
            return Attempt::Fail(format!("gateway recusou a cobrança ({})", status));
        }

        match res.json::<PaymentLink>().await {
            Ok(link) => Attempt::Done(link),
            Err(e) => Attempt::Fail(format!("resposta inválida do gateway: {}", e)),
        }
    }
}

#[async_trait]
impl PaymentGateway for HttpPaymentGateway {
    async fn create_payment_link(&self, req: &PaymentLinkRequest) -> Result<PaymentLink, AppError> {
        let body = self.body(req)?;

        // No máximo uma repetição
        let reason = match self.attempt(&body).await {
            Attempt::Done(link) => return Ok(link),
            Attempt::Fail(reason) => return Err(AppError::Gateway(reason)),
            Attempt::Retry(reason) => reason,
        };
        tracing::warn!("🔁 Link de pagamento falhou ({}), repetindo uma vez", reason);

        match self.attempt(&body).await {
            Attempt::Done(link) => Ok(link),
            Attempt::Fail(reason) | Attempt::Retry(reason) => Err(AppError::Gateway(reason)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn gateway(server: &MockServer) -> HttpPaymentGateway {
        HttpPaymentGateway::new(GatewayConfig {
            base_url: server.uri(),
            key_id: "key".into(),
            key_secret: "secret".into(),
            currency: "INR".into(),
            callback_url: None,
            timeout: Duration::from_millis(200),
        })
        .unwrap()
    }

    fn request(amount: Decimal) -> PaymentLinkRequest {
        PaymentLinkRequest {
            customer_id: Uuid::new_v4(),
            amount,
            description: "Saldo da locação".into(),
            reference_id: Uuid::new_v4(),
        }
    }

    #[tokio::test]
    async fn sends_amount_in_minor_units() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/payment_links"))
            .and(body_partial_json(json!({ "amount": 55050, "currency": "INR" })))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({ "id": "plink_1", "short_url": "https://pay.test/plink_1" })),
            )
            .expect(1)
            .mount(&server)
            .await;

        let link = gateway(&server).create_payment_link(&request(dec!(550.50))).await.unwrap();
        assert_eq!(link.id, "plink_1");
        assert_eq!(link.short_url, "https://pay.test/plink_1");
    }

    #[tokio::test]
    async fn server_error_is_retried_exactly_once() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/payment_links"))
            .respond_with(ResponseTemplate::new(503))
            .expect(2)
            .mount(&server)
            .await;

        let err = gateway(&server).create_payment_link(&request(dec!(10))).await.unwrap_err();
        assert!(matches!(err, AppError::Gateway(_)));
    }

    #[tokio::test]
    async fn client_error_is_not_retried() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/payment_links"))
            .respond_with(ResponseTemplate::new(400))
            .expect(1)
            .mount(&server)
            .await;

        let err = gateway(&server).create_payment_link(&request(dec!(10))).await.unwrap_err();
        assert!(matches!(err, AppError::Gateway(_)));
    }

    #[tokio::test]
    async fn silent_gateway_times_out_instead_of_hanging() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/payment_links"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({ "id": "plink_1", "short_url": "https://pay.test/plink_1" }))
                    .set_delay(Duration::from_secs(5)),
            )
            .expect(2)
            .mount(&server)
            .await;

        let started = std::time::Instant::now();
        let err = gateway(&server).create_payment_link(&request(dec!(10))).await.unwrap_err();
        assert!(matches!(err, AppError::Gateway(_)));
        assert!(started.elapsed() < Duration::from_secs(4));
    }
}
