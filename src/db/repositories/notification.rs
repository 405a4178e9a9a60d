//! Notification repository

use crate::models::{NewNotification, Notification, NotificationKind};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::{sqlite::SqliteRow, Row, SqlitePool};
use std::str::FromStr;
use std::sync::Arc;

#[async_trait]
pub trait NotificationRepository: Send + Sync {
    async fn create(&self, notification: &NewNotification) -> Result<i64>;

    /// Unread notifications of a user, newest first
    async fn list_unread(&self, recipient_id: i64) -> Result<Vec<Notification>>;

    /// Mark the given (or, with `None`, all) unread notifications of the
    /// recipient as read. Returns the number of rows changed.
    async fn mark_read(&self, recipient_id: i64, ids: Option<&[i64]>) -> Result<u64>;
}

pub struct SqlxNotificationRepository {
    pool: SqlitePool,
}

impl SqlxNotificationRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn boxed(pool: SqlitePool) -> Arc<dyn NotificationRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl NotificationRepository for SqlxNotificationRepository {
    async fn create(&self, notification: &NewNotification) -> Result<i64> {
        let result = sqlx::query(
            r#"
            INSERT INTO notifications (recipient_id, actor_id, kind, post_id, comment_id, message, is_read, created_at)
            VALUES (?, ?, ?, ?, ?, ?, 0, ?)
            "#,
        )
        .bind(notification.recipient_id)
        .bind(notification.actor_id)
        .bind(notification.kind.to_string())
        .bind(notification.post_id)
        .bind(notification.comment_id)
        .bind(&notification.message)
        .bind(Utc::now())
        .execute(&self.pool)
        .await
        .context("Failed to create notification")?;

        Ok(result.last_insert_rowid())
    }

    async fn list_unread(&self, recipient_id: i64) -> Result<Vec<Notification>> {
        let rows = sqlx::query(
            r#"
            SELECT n.id, n.recipient_id, n.actor_id, u.username AS actor_username, n.kind,
                n.post_id, n.comment_id, n.message, n.is_read, n.created_at
            FROM notifications n
            JOIN users u ON u.id = n.actor_id
            WHERE n.recipient_id = ? AND n.is_read = 0
            ORDER BY n.created_at DESC, n.id DESC
            "#,
        )
        .bind(recipient_id)
        .fetch_all(&self.pool)
        .await
        .context("Failed to list notifications")?;

        rows.iter().map(row_to_notification).collect()
    }

    async fn mark_read(&self, recipient_id: i64, ids: Option<&[i64]>) -> Result<u64> {
        let result = match ids {
            Some([]) => return Ok(0),
            Some(ids) => {
                let placeholders = vec!["?"; ids.len()].join(", ");
                let sql = format!(
                    "UPDATE notifications SET is_read = 1 WHERE recipient_id = ? AND is_read = 0 AND id IN ({})",
                    placeholders
                );
                let mut query = sqlx::query(&sql).bind(recipient_id);
                for id in ids {
                    query = query.bind(*id);
                }
                query.execute(&self.pool).await
            }
            None => {
                sqlx::query("UPDATE notifications SET is_read = 1 WHERE recipient_id = ? AND is_read = 0")
                    .bind(recipient_id)
                    .execute(&self.pool)
                    .await
            }
        }
        .context("Failed to mark notifications read")?;

        Ok(result.rows_affected())
    }
}

fn row_to_notification(row: &SqliteRow) -> Result<Notification> {
    let kind: String = row.get("kind");
    let kind = NotificationKind::from_str(&kind)?;

    Ok(Notification {
        id: row.get("id"),
        recipient_id: row.get("recipient_id"),
        actor_id: row.get("actor_id"),
        actor_username: row.get("actor_username"),
        kind,
        post_id: row.get("post_id"),
        comment_id: row.get("comment_id"),
        message: row.get("message"),
        is_read: row.get("is_read"),
        created_at: row.get("created_at"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::test_support::{insert_post, insert_user, setup_pool};

    async fn seed() -> (SqlxNotificationRepository, i64, i64, i64) {
        let pool = setup_pool().await;
        let recipient = insert_user(&pool, "owner").await;
        let actor = insert_user(&pool, "actor").await;
        let post_id = insert_post(&pool, recipient, "post").await;
        (SqlxNotificationRepository::new(pool), recipient, actor, post_id)
    }

    fn like(recipient: i64, actor: i64, post_id: i64) -> NewNotification {
        NewNotification {
            recipient_id: recipient,
            actor_id: actor,
            kind: NotificationKind::PostLike,
            post_id: Some(post_id),
            comment_id: None,
            message: NotificationKind::PostLike.message("actor"),
        }
    }

    #[tokio::test]
    async fn test_list_unread_newest_first() {
        let (repo, recipient, actor, post_id) = seed().await;
        let first = repo.create(&like(recipient, actor, post_id)).await.unwrap();
        let second = repo.create(&like(recipient, actor, post_id)).await.unwrap();

        let unread = repo.list_unread(recipient).await.unwrap();
        assert_eq!(unread.iter().map(|n| n.id).collect::<Vec<_>>(), vec![second, first]);
        assert_eq!(unread[0].actor_username, "actor");
        assert!(repo.list_unread(actor).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_mark_selected_then_all() {
        let (repo, recipient, actor, post_id) = seed().await;
        let first = repo.create(&like(recipient, actor, post_id)).await.unwrap();
        repo.create(&like(recipient, actor, post_id)).await.unwrap();
        repo.create(&like(recipient, actor, post_id)).await.unwrap();

        assert_eq!(repo.mark_read(recipient, Some(&[first])).await.unwrap(), 1);
        assert_eq!(repo.mark_read(recipient, Some(&[first])).await.unwrap(), 0);
        assert_eq!(repo.mark_read(actor, None).await.unwrap(), 0);
        assert_eq!(repo.mark_read(recipient, None).await.unwrap(), 2);
        assert!(repo.list_unread(recipient).await.unwrap().is_empty());
    }
}
