// src/models/notification.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    QuotationCreated,
    OrderCreated,
    PickupScheduled,
    ItemReturned,
    PaymentRequested,
}

impl NotificationKind {
    pub fn as_str(self) -> &'static str {
        match self {
            NotificationKind::QuotationCreated => "quotation_created",
            NotificationKind::OrderCreated => "order_created",
            NotificationKind::PickupScheduled => "pickup_scheduled",
            NotificationKind::ItemReturned => "item_returned",
            NotificationKind::PaymentRequested => "payment_requested",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct NotificationMessage {
    pub recipient_id: Uuid,
    pub kind: NotificationKind,
    pub title: String,
    pub message: String,
    pub payload: serde_json::Value,
}

impl NotificationMessage {
    pub fn new(
        recipient_id: Uuid,
        kind: NotificationKind,
        title: impl Into<String>,
        message: impl Into<String>,
        payload: serde_json::Value,
    ) -> Self {
        Self {
            recipient_id,
            kind,
            title: title.into(),
            message: message.into(),
            payload,
        }
    }
}

// --- Linha gravada em `notifications` ---
#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub id: Uuid,
    pub recipient_id: Uuid,
    #[schema(example = "order_created")]
    pub kind: String,
    pub title: String,
    pub message: String,
    #[schema(value_type = Object)]
    pub payload: serde_json::Value,
    pub read: bool,
    pub created_at: DateTime<Utc>,
}

impl Notification {
    pub fn from_message(msg: &NotificationMessage) -> Self {
        Self {
            id: Uuid::new_v4(),
            recipient_id: msg.recipient_id,
            kind: msg.kind.as_str().to_string(),
            title: msg.title.clone(),
            message: msg.message.clone(),
            payload: msg.payload.clone(),
            read: false,
            created_at: Utc::now(),
        }
    }
}
