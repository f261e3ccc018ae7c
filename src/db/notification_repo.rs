// src/db/notification_repo.rs

use sqlx::{Executor, Postgres};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::notification::{Notification, NotificationMessage},
};

#[derive(Clone, Copy, Default)]
pub struct NotificationRepository;

impl NotificationRepository {
    pub async fn create_notification<'e, E>(
        &self,
        executor: E,
        msg: &NotificationMessage,
    ) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query(
            r#"
            INSERT INTO notifications (recipient_id, kind, title, message, payload)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(msg.recipient_id)
        .bind(msg.kind.as_str())
        .bind(&msg.title)
        .bind(&msg.message)
        .bind(&msg.payload)
        .execute(executor)
        .await?;

        Ok(())
    }

    pub async fn list_for_recipient<'e, E>(
        &self,
        executor: E,
        recipient_id: Uuid,
    ) -> Result<Vec<Notification>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let notifications = sqlx::query_as::<_, Notification>(
            "SELECT * FROM notifications WHERE recipient_id = $1 ORDER BY created_at DESC",
        )
        .bind(recipient_id)
        .fetch_all(executor)
        .await?;

        Ok(notifications)
    }
}
