//! Community comment repository

use super::reaction;
use crate::models::{
    Comment, CommentWithMeta, LikeStatus, ReactionTarget, ReportOutcome, ReportReason,
};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::{sqlite::SqliteRow, Row, SqlitePool};
use std::sync::Arc;

const COMMENT_COLUMNS: &str =
    "id, post_id, user_id, parent_id, comment, is_active, created_at, updated_at";

#[async_trait]
pub trait CommentRepository: Send + Sync {
    /// Every comment of a post, including soft-deleted ones, oldest first
    async fn list_by_post(&self, post_id: i64) -> Result<Vec<CommentWithMeta>>;

    async fn get_by_id(&self, id: i64) -> Result<Option<Comment>>;

    async fn create(&self, post_id: i64, user_id: i64, parent_id: Option<i64>, text: &str) -> Result<Comment>;

    /// Mark the comment inactive; the row stays so replies keep their root
    async fn soft_delete(&self, id: i64) -> Result<bool>;

    async fn toggle_like(&self, comment_id: i64, user_id: i64) -> Result<LikeStatus>;

    async fn has_reported(&self, comment_id: i64, reporter_id: i64) -> Result<bool>;

    async fn report(
        &self,
        comment_id: i64,
        reporter_id: i64,
        reason: ReportReason,
        detail: Option<&str>,
        hide_threshold: i64,
    ) -> Result<ReportOutcome>;
}

pub struct SqlxCommentRepository {
    pool: SqlitePool,
}

impl SqlxCommentRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn boxed(pool: SqlitePool) -> Arc<dyn CommentRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl CommentRepository for SqlxCommentRepository {
    async fn list_by_post(&self, post_id: i64) -> Result<Vec<CommentWithMeta>> {
        let rows = sqlx::query(
            r#"
            SELECT c.id, c.post_id, c.user_id, u.username, c.parent_id, c.comment, c.is_active,
                c.created_at,
                (SELECT COUNT(*) FROM comment_likes cl WHERE cl.comment_id = c.id) AS like_count
            FROM community_comments c
            JOIN users u ON u.id = c.user_id
            WHERE c.post_id = ?
            ORDER BY c.created_at ASC, c.id ASC
            "#,
        )
        .bind(post_id)
        .fetch_all(&self.pool)
        .await
        .context("Failed to list comments")?;

        Ok(rows
            .iter()
            .map(|row| CommentWithMeta {
                id: row.get("id"),
                post_id: row.get("post_id"),
                user_id: row.get("user_id"),
                username: row.get("username"),
                parent_id: row.get("parent_id"),
                comment: row.get("comment"),
                is_active: row.get("is_active"),
                is_deleted: false,
                like_count: row.get("like_count"),
                created_at: row.get("created_at"),
                replies: Vec::new(),
            })
            .collect())
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<Comment>> {
        let sql = format!("SELECT {} FROM community_comments WHERE id = ?", COMMENT_COLUMNS);
        let row = sqlx::query(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .context("Failed to get comment")?;

        Ok(row.as_ref().map(row_to_comment))
    }

    async fn create(&self, post_id: i64, user_id: i64, parent_id: Option<i64>, text: &str) -> Result<Comment> {
        let now = Utc::now();
        let result = sqlx::query(
            r#"
            INSERT INTO community_comments (post_id, user_id, parent_id, comment, is_active, created_at, updated_at)
            VALUES (?, ?, ?, ?, 1, ?, ?)
            "#,
        )
        .bind(post_id)
        .bind(user_id)
        .bind(parent_id)
        .bind(text)
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await
        .context("Failed to create comment")?;

        Ok(Comment {
            id: result.last_insert_rowid(),
            post_id,
            user_id,
            parent_id,
            comment: text.to_string(),
            is_active: true,
            created_at: now,
            updated_at: now,
        })
    }

    async fn soft_delete(&self, id: i64) -> Result<bool> {
        let result = sqlx::query(
            "UPDATE community_comments SET is_active = 0, updated_at = ? WHERE id = ? AND is_active = 1",
        )
        .bind(Utc::now())
        .bind(id)
        .execute(&self.pool)
        .await
        .context("Failed to delete comment")?;
        Ok(result.rows_affected() > 0)
    }

    async fn toggle_like(&self, comment_id: i64, user_id: i64) -> Result<LikeStatus> {
        reaction::toggle_like(&self.pool, ReactionTarget::Comment, comment_id, user_id).await
    }

    async fn has_reported(&self, comment_id: i64, reporter_id: i64) -> Result<bool> {
        reaction::has_reported(&self.pool, ReactionTarget::Comment, comment_id, reporter_id).await
    }

    async fn report(
        &self,
        comment_id: i64,
        reporter_id: i64,
        reason: ReportReason,
        detail: Option<&str>,
        hide_threshold: i64,
    ) -> Result<ReportOutcome> {
        reaction::file_report(
            &self.pool,
            ReactionTarget::Comment,
            comment_id,
            reporter_id,
            reason,
            detail,
            hide_threshold,
        )
        .await
    }
}

fn row_to_comment(row: &SqliteRow) -> Comment {
    Comment {
        id: row.get("id"),
        post_id: row.get("post_id"),
        user_id: row.get("user_id"),
        parent_id: row.get("parent_id"),
        comment: row.get("comment"),
        is_active: row.get("is_active"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::test_support::{insert_post, insert_user, setup_pool};
    use crate::models::build_comment_tree;

    #[tokio::test]
    async fn test_create_and_list_oldest_first() {
        let pool = setup_pool().await;
        let user_id = insert_user(&pool, "commenter").await;
        let post_id = insert_post(&pool, user_id, "post").await;
        let repo = SqlxCommentRepository::new(pool);

        let root = repo.create(post_id, user_id, None, "첫 댓글").await.unwrap();
        let reply = repo.create(post_id, user_id, Some(root.id), "답글").await.unwrap();
        repo.toggle_like(reply.id, user_id).await.unwrap();

        let flat = repo.list_by_post(post_id).await.unwrap();
        assert_eq!(flat.iter().map(|c| c.id).collect::<Vec<_>>(), vec![root.id, reply.id]);
        assert_eq!(flat[1].username, "commenter");
        assert_eq!(flat[1].like_count, 1);
    }

    #[tokio::test]
    async fn test_soft_delete_keeps_row_for_tree() {
        let pool = setup_pool().await;
        let user_id = insert_user(&pool, "deleter").await;
        let post_id = insert_post(&pool, user_id, "post").await;
        let repo = SqlxCommentRepository::new(pool);

        let root = repo.create(post_id, user_id, None, "지울 댓글").await.unwrap();
        repo.create(post_id, user_id, Some(root.id), "남은 답글").await.unwrap();

        assert!(repo.soft_delete(root.id).await.unwrap());
        assert!(!repo.soft_delete(root.id).await.unwrap());

        let stored = repo.get_by_id(root.id).await.unwrap().unwrap();
        assert!(!stored.is_active);

        let tree = build_comment_tree(repo.list_by_post(post_id).await.unwrap());
        assert_eq!(tree.len(), 1);
        assert!(tree[0].is_deleted);
        assert_eq!(tree[0].replies.len(), 1);
    }
}
