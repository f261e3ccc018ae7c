// src/services/notification_service.rs

use std::sync::Arc;

use async_trait::async_trait;
use sqlx::PgPool;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::NotificationRepository,
    models::{
        auth::Principal,
        notification::{Notification, NotificationMessage},
    },
};

/// Colaborador de notificação: "dispara e esquece".
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, msg: &NotificationMessage) -> Result<(), AppError>;

    /// Caixa de entrada do destinatário, mais recentes primeiro.
    async fn list_for(&self, recipient_id: Uuid) -> Result<Vec<Notification>, AppError>;
}

/// Grava a notificação na tabela `notifications`, fora da transação do núcleo.
#[derive(Clone)]
pub struct PgNotifier {
    pool: PgPool,
    repo: NotificationRepository,
}

impl PgNotifier {
    pub fn new(pool: PgPool) -> Self {
        Self { pool, repo: NotificationRepository }
    }
}

#[async_trait]
impl Notifier for PgNotifier {
    async fn notify(&self, msg: &NotificationMessage) -> Result<(), AppError> {
        self.repo.create_notification(&self.pool, msg).await
    }

    async fn list_for(&self, recipient_id: Uuid) -> Result<Vec<Notification>, AppError> {
        self.repo.list_for_recipient(&self.pool, recipient_id).await
    }
}

/// Caixa de entrada em memória, para o backend sem banco.
#[derive(Clone, Default)]
pub struct MemoryNotifier {
    inbox: Arc<Mutex<Vec<Notification>>>,
}

impl MemoryNotifier {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Notifier for MemoryNotifier {
    async fn notify(&self, msg: &NotificationMessage) -> Result<(), AppError> {
        tracing::info!(
            "🔔 [{}] para {}: {}",
            msg.kind.as_str(),
            msg.recipient_id,
            msg.title
        );
        self.inbox.lock().await.push(Notification::from_message(msg));
        Ok(())
    }

    async fn list_for(&self, recipient_id: Uuid) -> Result<Vec<Notification>, AppError> {
        let inbox = self.inbox.lock().await;
        Ok(inbox
            .iter()
            .rev()
            .filter(|n| n.recipient_id == recipient_id)
            .cloned()
            .collect())
    }
}

/// Leitura das notificações do próprio usuário.
#[derive(Clone)]
pub struct NotificationService {
    notifier: Arc<dyn Notifier>,
}

impl NotificationService {
    pub fn new(notifier: Arc<dyn Notifier>) -> Self {
        Self { notifier }
    }

    pub async fn list_notifications(&self, principal: &Principal) -> Result<Vec<Notification>, AppError> {
        self.notifier.list_for(principal.id).await
    }
}

/// Entrega depois do commit. Falhas viram log e nunca sobem.
pub async fn dispatch(notifier: &dyn Notifier, messages: Vec<NotificationMessage>) {
    for msg in messages {
        if let Err(e) = notifier.notify(&msg).await {
            tracing::warn!(
                "⚠️ Falha ao notificar {} ({}): {}",
                msg.recipient_id,
                msg.kind.as_str(),
                e
            );
        }
    }
}
