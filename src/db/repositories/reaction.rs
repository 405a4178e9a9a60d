//! Likes and reports shared by posts and comments
//!
//! Both targets use the same table layout (`*_likes`, `*_reports` keyed by
//! the target id column), so the queries are written once and picked by
//! [`ReactionTarget`].

use crate::models::{LikeStatus, ReactionTarget, ReportOutcome, ReportReason};
use anyhow::{Context, Result};
use chrono::Utc;
use sqlx::{Row, SqlitePool};

struct Tables {
    target: &'static str,
    likes: &'static str,
    reports: &'static str,
    column: &'static str,
}

fn tables(target: ReactionTarget) -> Tables {
    match target {
        ReactionTarget::Post => Tables {
            target: "community_posts",
            likes: "post_likes",
            reports: "post_reports",
            column: "post_id",
        },
        ReactionTarget::Comment => Tables {
            target: "community_comments",
            likes: "comment_likes",
            reports: "comment_reports",
            column: "comment_id",
        },
    }
}

/// Flip the like of `user_id` on the target and return the new state
pub(crate) async fn toggle_like(
    pool: &SqlitePool,
    target: ReactionTarget,
    target_id: i64,
    user_id: i64,
) -> Result<LikeStatus> {
    let t = tables(target);
    let mut tx = pool.begin().await.context("Failed to begin transaction")?;

    let delete_sql = format!("DELETE FROM {} WHERE user_id = ? AND {} = ?", t.likes, t.column);
    let removed = sqlx::query(&delete_sql)
        .bind(user_id)
        .bind(target_id)
        .execute(&mut *tx)
        .await
        .with_context(|| format!("Failed to remove {} like", target))?
        .rows_affected();

    if removed == 0 {
        let insert_sql = format!(
            "INSERT INTO {} (user_id, {}, created_at) VALUES (?, ?, ?)",
            t.likes, t.column
        );
        sqlx::query(&insert_sql)
            .bind(user_id)
            .bind(target_id)
            .bind(Utc::now())
            .execute(&mut *tx)
            .await
            .with_context(|| format!("Failed to add {} like", target))?;
    }

    let count_sql = format!("SELECT COUNT(*) AS count FROM {} WHERE {} = ?", t.likes, t.column);
    let like_count: i64 = sqlx::query(&count_sql)
        .bind(target_id)
        .fetch_one(&mut *tx)
        .await
        .context("Failed to count likes")?
        .get("count");

    tx.commit().await?;

    Ok(LikeStatus {
        liked: removed == 0,
        like_count,
    })
}

pub(crate) async fn has_reported(
    pool: &SqlitePool,
    target: ReactionTarget,
    target_id: i64,
    reporter_id: i64,
) -> Result<bool> {
    let t = tables(target);
    let sql = format!(
        "SELECT COUNT(*) AS count FROM {} WHERE reporter_id = ? AND {} = ?",
        t.reports, t.column
    );
    let count: i64 = sqlx::query(&sql)
        .bind(reporter_id)
        .bind(target_id)
        .fetch_one(pool)
        .await
        .context("Failed to check existing report")?
        .get("count");
    Ok(count > 0)
}

/// Store a report and deactivate the target once `hide_threshold` reports
/// have accumulated
pub(crate) async fn file_report(
    pool: &SqlitePool,
    target: ReactionTarget,
    target_id: i64,
    reporter_id: i64,
    reason: ReportReason,
    detail: Option<&str>,
    hide_threshold: i64,
) -> Result<ReportOutcome> {
    let t = tables(target);
    let mut tx = pool.begin().await.context("Failed to begin transaction")?;

    let insert_sql = format!(
        "INSERT INTO {} (reporter_id, {}, reason, detail, created_at) VALUES (?, ?, ?, ?, ?)",
        t.reports, t.column
    );
    sqlx::query(&insert_sql)
        .bind(reporter_id)
        .bind(target_id)
        .bind(reason.to_string())
        .bind(detail)
        .bind(Utc::now())
        .execute(&mut *tx)
        .await
        .with_context(|| format!("Failed to report {}", target))?;

    let count_sql = format!("SELECT COUNT(*) AS count FROM {} WHERE {} = ?", t.reports, t.column);
    let report_count: i64 = sqlx::query(&count_sql)
        .bind(target_id)
        .fetch_one(&mut *tx)
        .await
        .context("Failed to count reports")?
        .get("count");

    let mut hidden = false;
    if report_count >= hide_threshold {
        let hide_sql = format!(
            "UPDATE {} SET is_active = 0, updated_at = ? WHERE id = ? AND is_active = 1",
            t.target
        );
        hidden = sqlx::query(&hide_sql)
            .bind(Utc::now())
            .bind(target_id)
            .execute(&mut *tx)
            .await
            .with_context(|| format!("Failed to hide reported {}", target))?
            .rows_affected()
            > 0;
    }

    tx.commit().await?;

    Ok(ReportOutcome {
        report_count,
        hidden,
    })
}

pub(crate) async fn like_count(pool: &SqlitePool, target: ReactionTarget, target_id: i64) -> Result<i64> {
    let t = tables(target);
    let sql = format!("SELECT COUNT(*) AS count FROM {} WHERE {} = ?", t.likes, t.column);
    let row = sqlx::query(&sql)
        .bind(target_id)
        .fetch_one(pool)
        .await
        .context("Failed to count likes")?;
    Ok(row.get("count"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::test_support::{insert_post, insert_user, setup_pool};

    #[tokio::test]
    async fn test_toggle_like_counts() {
        let pool = setup_pool().await;
        let author = insert_user(&pool, "author").await;
        let fan = insert_user(&pool, "fan").await;
        let post_id = insert_post(&pool, author, "hello").await;

        let status = toggle_like(&pool, ReactionTarget::Post, post_id, fan).await.unwrap();
        assert_eq!(status, LikeStatus { liked: true, like_count: 1 });

        toggle_like(&pool, ReactionTarget::Post, post_id, author).await.unwrap();
        assert_eq!(like_count(&pool, ReactionTarget::Post, post_id).await.unwrap(), 2);

        let status = toggle_like(&pool, ReactionTarget::Post, post_id, fan).await.unwrap();
        assert_eq!(status, LikeStatus { liked: false, like_count: 1 });
    }

    #[tokio::test]
    async fn test_report_hides_at_threshold() {
        let pool = setup_pool().await;
        let author = insert_user(&pool, "author").await;
        let post_id = insert_post(&pool, author, "spammy").await;

        let first = insert_user(&pool, "r1").await;
        let outcome = file_report(&pool, ReactionTarget::Post, post_id, first, ReportReason::Spam, None, 2)
            .await
            .unwrap();
        assert_eq!(outcome, ReportOutcome { report_count: 1, hidden: false });
        assert!(has_reported(&pool, ReactionTarget::Post, post_id, first).await.unwrap());

        let second = insert_user(&pool, "r2").await;
        let outcome = file_report(
            &pool,
            ReactionTarget::Post,
            post_id,
            second,
            ReportReason::Other,
            Some("광고글"),
            2,
        )
        .await
        .unwrap();
        assert!(outcome.hidden);

        let active: bool = sqlx::query("SELECT is_active FROM community_posts WHERE id = ?")
            .bind(post_id)
            .fetch_one(&pool)
            .await
            .unwrap()
            .get("is_active");
        assert!(!active);
    }

    #[tokio::test]
    async fn test_duplicate_report_rejected_by_schema() {
        let pool = setup_pool().await;
        let author = insert_user(&pool, "author").await;
        let reporter = insert_user(&pool, "reporter").await;
        let post_id = insert_post(&pool, author, "post").await;

        file_report(&pool, ReactionTarget::Post, post_id, reporter, ReportReason::Abuse, None, 5)
            .await
            .unwrap();
        let again =
            file_report(&pool, ReactionTarget::Post, post_id, reporter, ReportReason::Abuse, None, 5).await;
        assert!(again.is_err());
    }
}
