//! AI comparison report repository

use crate::models::{ComparisonAnalysis, ComparisonReport, Recommendation};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use serde_json::Value;
use sqlx::{sqlite::SqliteRow, Row, SqlitePool};
use std::str::FromStr;
use std::sync::Arc;

const REPORT_COLUMNS: &str = "id, user_id, room_a_id, room_b_id, comparison_criteria, \
    analysis_summary, detailed_comparison, recommendation, reasoning, created_at, updated_at";

#[async_trait]
pub trait ComparisonRepository: Send + Sync {
    /// Store the analysis for `(user, room_a, room_b)`, replacing an earlier one
    async fn upsert(
        &self,
        user_id: i64,
        room_a_id: i64,
        room_b_id: i64,
        criteria: &Value,
        analysis: &ComparisonAnalysis,
    ) -> Result<ComparisonReport>;

    /// Reports of a user, most recently updated first
    async fn list_by_user(&self, user_id: i64) -> Result<Vec<ComparisonReport>>;

    /// Report `id` if it belongs to `user_id`
    async fn get_for_user(&self, id: i64, user_id: i64) -> Result<Option<ComparisonReport>>;
}

pub struct SqlxComparisonRepository {
    pool: SqlitePool,
}

impl SqlxComparisonRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn boxed(pool: SqlitePool) -> Arc<dyn ComparisonRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl ComparisonRepository for SqlxComparisonRepository {
    async fn upsert(
        &self,
        user_id: i64,
        room_a_id: i64,
        room_b_id: i64,
        criteria: &Value,
        analysis: &ComparisonAnalysis,
    ) -> Result<ComparisonReport> {
        let now = Utc::now();
        sqlx::query(
            r#"
            INSERT INTO ai_comparison_reports (user_id, room_a_id, room_b_id, comparison_criteria,
                analysis_summary, detailed_comparison, recommendation, reasoning, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT (user_id, room_a_id, room_b_id) DO UPDATE SET
                comparison_criteria = excluded.comparison_criteria,
                analysis_summary = excluded.analysis_summary,
                detailed_comparison = excluded.detailed_comparison,
                recommendation = excluded.recommendation,
                reasoning = excluded.reasoning,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(user_id)
        .bind(room_a_id)
        .bind(room_b_id)
        .bind(criteria.to_string())
        .bind(&analysis.summary)
        .bind(analysis.detailed_comparison.to_string())
        .bind(analysis.recommendation.to_string())
        .bind(&analysis.reasoning)
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await
        .context("Failed to save comparison report")?;

        let sql = format!(
            "SELECT {} FROM ai_comparison_reports WHERE user_id = ? AND room_a_id = ? AND room_b_id = ?",
            REPORT_COLUMNS
        );
        let row = sqlx::query(&sql)
            .bind(user_id)
            .bind(room_a_id)
            .bind(room_b_id)
            .fetch_one(&self.pool)
            .await
            .context("Failed to reload comparison report")?;

        row_to_report(&row)
    }

    async fn list_by_user(&self, user_id: i64) -> Result<Vec<ComparisonReport>> {
        let sql = format!(
            "SELECT {} FROM ai_comparison_reports WHERE user_id = ? ORDER BY updated_at DESC, id DESC",
            REPORT_COLUMNS
        );
        let rows = sqlx::query(&sql)
            .bind(user_id)
            .fetch_all(&self.pool)
            .await
            .context("Failed to list comparison reports")?;

        rows.iter().map(row_to_report).collect()
    }

    async fn get_for_user(&self, id: i64, user_id: i64) -> Result<Option<ComparisonReport>> {
        let sql = format!(
            "SELECT {} FROM ai_comparison_reports WHERE id = ? AND user_id = ?",
            REPORT_COLUMNS
        );
        let row = sqlx::query(&sql)
            .bind(id)
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await
            .context("Failed to get comparison report")?;

        row.as_ref().map(row_to_report).transpose()
    }
}

fn row_to_report(row: &SqliteRow) -> Result<ComparisonReport> {
    let criteria: String = row.get("comparison_criteria");
    let detailed: String = row.get("detailed_comparison");
    let recommendation: String = row.get("recommendation");

    Ok(ComparisonReport {
        id: row.get("id"),
        user_id: row.get("user_id"),
        room_a_id: row.get("room_a_id"),
        room_b_id: row.get("room_b_id"),
        comparison_criteria: serde_json::from_str(&criteria)
            .context("Invalid comparison criteria JSON")?,
        analysis_summary: row.get("analysis_summary"),
        detailed_comparison: serde_json::from_str(&detailed)
            .context("Invalid detailed comparison JSON")?,
        recommendation: Recommendation::from_str(&recommendation)?,
        reasoning: row.get("reasoning"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::test_support::{insert_room, insert_user, setup_pool};
    use serde_json::json;

    fn analysis(summary: &str, recommendation: Recommendation) -> ComparisonAnalysis {
        ComparisonAnalysis {
            summary: summary.to_string(),
            detailed_comparison: json!({"comparison": "상세"}),
            recommendation,
            reasoning: "이유".to_string(),
        }
    }

    #[tokio::test]
    async fn test_upsert_overwrites_same_pair() {
        let pool = setup_pool().await;
        let user_id = insert_user(&pool, "cmp").await;
        let a = insert_room(&pool, "a").await;
        let b = insert_room(&pool, "b").await;
        let repo = SqlxComparisonRepository::new(pool);

        let first = repo
            .upsert(user_id, a, b, &json!({"price": true}), &analysis("첫 분석", Recommendation::RoomA))
            .await
            .unwrap();
        let second = repo
            .upsert(user_id, a, b, &json!({}), &analysis("다시 분석", Recommendation::RoomB))
            .await
            .unwrap();

        assert_eq!(first.id, second.id);
        assert_eq!(second.analysis_summary, "다시 분석");
        assert_eq!(second.winner_room_id(), b);
        assert_eq!(second.detailed_comparison["comparison"], "상세");
        assert_eq!(repo.list_by_user(user_id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_reports_are_private() {
        let pool = setup_pool().await;
        let owner = insert_user(&pool, "owner").await;
        let stranger = insert_user(&pool, "stranger").await;
        let a = insert_room(&pool, "a").await;
        let b = insert_room(&pool, "b").await;
        let repo = SqlxComparisonRepository::new(pool);

        let report = repo
            .upsert(owner, a, b, &json!({}), &analysis("요약", Recommendation::RoomA))
            .await
            .unwrap();

        assert!(repo.get_for_user(report.id, owner).await.unwrap().is_some());
        assert!(repo.get_for_user(report.id, stranger).await.unwrap().is_none());
        assert!(repo.list_by_user(stranger).await.unwrap().is_empty());
    }
}
