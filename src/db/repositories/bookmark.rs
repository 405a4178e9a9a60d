//! Bookmark repository

use super::room::{row_to_room, ROOM_COLUMNS, THUMBNAIL_SUBQUERY};
use crate::models::{BookmarkEntry, ListParams, PagedResult, RoomCard};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::{sqlite::SqliteRow, Row, SqlitePool};
use std::sync::Arc;

#[async_trait]
pub trait BookmarkRepository: Send + Sync {
    /// A user's bookmarks with room cards, newest first
    async fn list_by_user(&self, user_id: i64, params: &ListParams) -> Result<PagedResult<BookmarkEntry>>;

    /// Every bookmarked room of a user as a card, newest bookmark first
    async fn cards_by_user(&self, user_id: i64) -> Result<Vec<RoomCard>>;

    /// Add the bookmark if missing, remove it otherwise.
    /// Returns whether the room is bookmarked afterwards.
    async fn toggle(&self, user_id: i64, room_id: i64) -> Result<bool>;
}

pub struct SqlxBookmarkRepository {
    pool: SqlitePool,
}

impl SqlxBookmarkRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn boxed(pool: SqlitePool) -> Arc<dyn BookmarkRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl BookmarkRepository for SqlxBookmarkRepository {
    async fn list_by_user(&self, user_id: i64, params: &ListParams) -> Result<PagedResult<BookmarkEntry>> {
        let total: i64 = sqlx::query("SELECT COUNT(*) AS count FROM bookmarks WHERE user_id = ?")
            .bind(user_id)
            .fetch_one(&self.pool)
            .await
            .context("Failed to count bookmarks")?
            .get("count");

        let sql = format!(
            r#"
            SELECT b.id AS bookmark_id, b.created_at AS bookmarked_at, {}, {} AS thumbnail_url
            FROM bookmarks b
            JOIN rooms r ON r.id = b.room_id
            WHERE b.user_id = ?
            ORDER BY b.created_at DESC, b.id DESC
            LIMIT ? OFFSET ?
            "#,
            ROOM_COLUMNS, THUMBNAIL_SUBQUERY
        );
        let rows = sqlx::query(&sql)
            .bind(user_id)
            .bind(params.limit())
            .bind(params.offset())
            .fetch_all(&self.pool)
            .await
            .context("Failed to list bookmarks")?;

        let entries = rows
            .iter()
            .map(|row| BookmarkEntry {
                id: row.get("bookmark_id"),
                room: row_to_card(row),
                created_at: row.get("bookmarked_at"),
            })
            .collect();

        Ok(PagedResult::new(entries, total, params))
    }

    async fn cards_by_user(&self, user_id: i64) -> Result<Vec<RoomCard>> {
        let sql = format!(
            r#"
            SELECT {}, {} AS thumbnail_url
            FROM bookmarks b
            JOIN rooms r ON r.id = b.room_id
            WHERE b.user_id = ?
            ORDER BY b.created_at DESC, b.id DESC
            "#,
            ROOM_COLUMNS, THUMBNAIL_SUBQUERY
        );
        let rows = sqlx::query(&sql)
            .bind(user_id)
            .fetch_all(&self.pool)
            .await
            .context("Failed to list bookmarked rooms")?;

        Ok(rows.iter().map(row_to_card).collect())
    }

    async fn toggle(&self, user_id: i64, room_id: i64) -> Result<bool> {
        let mut tx = self.pool.begin().await.context("Failed to begin transaction")?;

        let removed = sqlx::query("DELETE FROM bookmarks WHERE user_id = ? AND room_id = ?")
            .bind(user_id)
            .bind(room_id)
            .execute(&mut *tx)
            .await
            .context("Failed to remove bookmark")?
            .rows_affected();

        if removed == 0 {
            sqlx::query("INSERT INTO bookmarks (user_id, room_id, created_at) VALUES (?, ?, ?)")
                .bind(user_id)
                .bind(room_id)
                .bind(Utc::now())
                .execute(&mut *tx)
                .await
                .context("Failed to add bookmark")?;
        }

        tx.commit().await?;
        Ok(removed == 0)
    }
}

fn row_to_card(row: &SqliteRow) -> RoomCard {
    let room = row_to_room(row);
    RoomCard::new(&room, row.get("thumbnail_url"))
}
