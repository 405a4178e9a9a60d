//! Notification service

use crate::db::repositories::NotificationRepository;
use crate::models::Notification;
use anyhow::Result;
use std::sync::Arc;

pub struct NotificationService {
    repo: Arc<dyn NotificationRepository>,
}

impl NotificationService {
    pub fn new(repo: Arc<dyn NotificationRepository>) -> Self {
        Self { repo }
    }

    /// Unread notifications of a user, newest first
    pub async fn unread(&self, user_id: i64) -> Result<Vec<Notification>> {
        self.repo.list_unread(user_id).await
    }

    /// Mark the given (or, with `None`, every) unread notification read.
    ///
    /// Ids belonging to other users are ignored. Returns how many changed.
    pub async fn mark_read(&self, user_id: i64, ids: Option<&[i64]>) -> Result<u64> {
        let updated = self.repo.mark_read(user_id, ids).await?;
        tracing::debug!("Marked {} notifications read for user {}", updated, user_id);
        Ok(updated)
    }
}
