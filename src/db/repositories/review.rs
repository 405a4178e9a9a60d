//! Review repository

use crate::models::{CreateReviewInput, RatingAverages, Review};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::{sqlite::SqliteRow, Row, SqlitePool};
use std::sync::Arc;

const REVIEW_SELECT: &str = r#"
    SELECT rv.id, rv.user_id, u.username, rv.room_id, rv.rating_safety, rv.rating_noise,
        rv.rating_light, rv.rating_traffic, rv.rating_clean, rv.content, rv.created_at
    FROM reviews rv
    JOIN users u ON u.id = rv.user_id
"#;

#[async_trait]
pub trait ReviewRepository: Send + Sync {
    /// Reviews of a room, newest first
    async fn list_by_room(&self, room_id: i64) -> Result<Vec<Review>>;

    async fn get_by_id(&self, id: i64) -> Result<Option<Review>>;

    async fn create(&self, user_id: i64, room_id: i64, input: &CreateReviewInput) -> Result<Review>;

    async fn delete(&self, id: i64) -> Result<bool>;

    /// Per-dimension averages over the reviews that rated each dimension
    async fn averages(&self, room_id: i64) -> Result<RatingAverages>;
}

pub struct SqlxReviewRepository {
    pool: SqlitePool,
}

impl SqlxReviewRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn boxed(pool: SqlitePool) -> Arc<dyn ReviewRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl ReviewRepository for SqlxReviewRepository {
    async fn list_by_room(&self, room_id: i64) -> Result<Vec<Review>> {
        let sql = format!("{} WHERE rv.room_id = ? ORDER BY rv.created_at DESC, rv.id DESC", REVIEW_SELECT);
        let rows = sqlx::query(&sql)
            .bind(room_id)
            .fetch_all(&self.pool)
            .await
            .context("Failed to list reviews")?;

        Ok(rows.iter().map(row_to_review).collect())
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<Review>> {
        let sql = format!("{} WHERE rv.id = ?", REVIEW_SELECT);
        let row = sqlx::query(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .context("Failed to get review")?;

        Ok(row.as_ref().map(row_to_review))
    }

    async fn create(&self, user_id: i64, room_id: i64, input: &CreateReviewInput) -> Result<Review> {
        let result = sqlx::query(
            r#"
            INSERT INTO reviews (user_id, room_id, rating_safety, rating_noise, rating_light,
                rating_traffic, rating_clean, content, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(user_id)
        .bind(room_id)
        .bind(input.rating_safety)
        .bind(input.rating_noise)
        .bind(input.rating_light)
        .bind(input.rating_traffic)
        .bind(input.rating_clean)
        .bind(input.content.as_deref())
        .bind(Utc::now())
        .execute(&self.pool)
        .await
        .context("Failed to create review")?;

        let id = result.last_insert_rowid();
        self.get_by_id(id)
            .await?
            .ok_or_else(|| anyhow::anyhow!("Review {} missing after insert", id))
    }

    async fn delete(&self, id: i64) -> Result<bool> {
        let result = sqlx::query("DELETE FROM reviews WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await
            .context("Failed to delete review")?;
        Ok(result.rows_affected() > 0)
    }

    async fn averages(&self, room_id: i64) -> Result<RatingAverages> {
        let row = sqlx::query(
            r#"
            SELECT COUNT(*) AS review_count,
                AVG(rating_safety) AS safety,
                AVG(rating_noise) AS noise,
                AVG(rating_light) AS light,
                AVG(rating_traffic) AS traffic,
                AVG(rating_clean) AS clean
            FROM reviews
            WHERE room_id = ?
            "#,
        )
        .bind(room_id)
        .fetch_one(&self.pool)
        .await
        .context("Failed to aggregate review ratings")?;

        Ok(RatingAverages {
            review_count: row.get("review_count"),
            safety: row.get("safety"),
            noise: row.get("noise"),
            light: row.get("light"),
            traffic: row.get("traffic"),
            clean: row.get("clean"),
        })
    }
}

fn row_to_review(row: &SqliteRow) -> Review {
    Review {
        id: row.get("id"),
        user_id: row.get("user_id"),
        username: row.get("username"),
        room_id: row.get("room_id"),
        rating_safety: row.get("rating_safety"),
        rating_noise: row.get("rating_noise"),
        rating_light: row.get("rating_light"),
        rating_traffic: row.get("rating_traffic"),
        rating_clean: row.get("rating_clean"),
        content: row.get("content"),
        created_at: row.get("created_at"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::test_support::{insert_room, insert_user, setup_pool};

    #[tokio::test]
    async fn test_create_and_list_reviews() {
        let pool = setup_pool().await;
        let user_id = insert_user(&pool, "reviewer").await;
        let room_id = insert_room(&pool, "room").await;
        let repo = SqlxReviewRepository::new(pool);

        let first = repo
            .create(user_id, room_id, &CreateReviewInput { rating_safety: Some(4), ..Default::default() })
            .await
            .unwrap();
        let second = repo
            .create(
                user_id,
                room_id,
                &CreateReviewInput { content: Some("조용해요".to_string()), ..Default::default() },
            )
            .await
            .unwrap();

        assert_eq!(first.username, "reviewer");
        let reviews = repo.list_by_room(room_id).await.unwrap();
        assert_eq!(reviews.iter().map(|r| r.id).collect::<Vec<_>>(), vec![second.id, first.id]);

        assert!(repo.delete(first.id).await.unwrap());
        assert!(repo.get_by_id(first.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_averages_skip_missing_dimensions() {
        let pool = setup_pool().await;
        let user_id = insert_user(&pool, "avg").await;
        let room_id = insert_room(&pool, "room").await;
        let repo = SqlxReviewRepository::new(pool);

        for (safety, noise) in [(Some(5), Some(2)), (Some(4), None), (Some(3), None)] {
            let input = CreateReviewInput {
                rating_safety: safety,
                rating_noise: noise,
                ..Default::default()
            };
            repo.create(user_id, room_id, &input).await.unwrap();
        }

        let avg = repo.averages(room_id).await.unwrap();
        assert_eq!(avg.review_count, 3);
        assert_eq!(avg.safety, Some(4.0));
        assert_eq!(avg.noise, Some(2.0));
        assert_eq!(avg.light, None);
    }

    #[tokio::test]
    async fn test_averages_for_unreviewed_room() {
        let pool = setup_pool().await;
        let room_id = insert_room(&pool, "empty").await;
        let repo = SqlxReviewRepository::new(pool);

        assert_eq!(repo.averages(room_id).await.unwrap(), RatingAverages::default());
    }
}
