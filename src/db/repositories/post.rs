//! Community post repository
//!
//! Posts are always read together with their author, category and the
//! comment / like / report counters.

use super::{like_pattern, reaction};
use crate::models::{
    CommunityCategory, CreatePostInput, LikeStatus, ListParams, PagedResult, Post, PostFilter,
    PostWithMeta, ReactionTarget, ReportOutcome, ReportReason, UpdatePostInput,
};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::{sqlite::SqliteRow, Row, SqlitePool};
use std::sync::Arc;

const POST_META_SELECT: &str = r#"
    SELECT p.id, p.user_id, u.username AS author, p.category_id,
        c.name AS category_name, c.slug AS category_slug,
        p.title, p.content, p.image, p.created_at, p.updated_at,
        (SELECT COUNT(*) FROM community_comments cm WHERE cm.post_id = p.id AND cm.is_active = 1) AS comment_count,
        (SELECT COUNT(*) FROM post_likes pl WHERE pl.post_id = p.id) AS like_count,
        (SELECT COUNT(*) FROM post_reports pr WHERE pr.post_id = p.id) AS report_count
    FROM community_posts p
    JOIN users u ON u.id = p.user_id
    LEFT JOIN community_categories c ON c.id = p.category_id
"#;

#[async_trait]
pub trait PostRepository: Send + Sync {
    async fn categories(&self) -> Result<Vec<CommunityCategory>>;

    async fn category_by_id(&self, id: i64) -> Result<Option<CommunityCategory>>;

    /// Active posts matching the filter, newest first
    async fn list(&self, filter: &PostFilter, params: &ListParams) -> Result<PagedResult<PostWithMeta>>;

    /// Active post with counters
    async fn get_with_meta(&self, id: i64) -> Result<Option<PostWithMeta>>;

    /// Raw post row regardless of its active flag
    async fn get_by_id(&self, id: i64) -> Result<Option<Post>>;

    async fn create(&self, user_id: i64, input: &CreatePostInput) -> Result<PostWithMeta>;

    async fn update(&self, id: i64, input: &UpdatePostInput) -> Result<Option<PostWithMeta>>;

    async fn delete(&self, id: i64) -> Result<bool>;

    async fn toggle_like(&self, post_id: i64, user_id: i64) -> Result<LikeStatus>;

    async fn has_reported(&self, post_id: i64, reporter_id: i64) -> Result<bool>;

    async fn report(
        &self,
        post_id: i64,
        reporter_id: i64,
        reason: ReportReason,
        detail: Option<&str>,
        hide_threshold: i64,
    ) -> Result<ReportOutcome>;
}

pub struct SqlxPostRepository {
    pool: SqlitePool,
}

impl SqlxPostRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn boxed(pool: SqlitePool) -> Arc<dyn PostRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl PostRepository for SqlxPostRepository {
    async fn categories(&self) -> Result<Vec<CommunityCategory>> {
        let rows = sqlx::query("SELECT id, name, slug FROM community_categories ORDER BY id")
            .fetch_all(&self.pool)
            .await
            .context("Failed to list community categories")?;

        Ok(rows.iter().map(row_to_category).collect())
    }

    async fn category_by_id(&self, id: i64) -> Result<Option<CommunityCategory>> {
        let row = sqlx::query("SELECT id, name, slug FROM community_categories WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .context("Failed to get community category")?;

        Ok(row.as_ref().map(row_to_category))
    }

    async fn list(&self, filter: &PostFilter, params: &ListParams) -> Result<PagedResult<PostWithMeta>> {
        list_posts(&self.pool, filter, params).await
    }

    async fn get_with_meta(&self, id: i64) -> Result<Option<PostWithMeta>> {
        let sql = format!("{} WHERE p.id = ? AND p.is_active = 1", POST_META_SELECT);
        let row = sqlx::query(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .context("Failed to get post")?;

        Ok(row.as_ref().map(row_to_post_meta))
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<Post>> {
        let row = sqlx::query(
            r#"
            SELECT id, user_id, category_id, title, content, image, is_active, created_at, updated_at
            FROM community_posts WHERE id = ?
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to get post by ID")?;

        Ok(row.map(|row| Post {
            id: row.get("id"),
            user_id: row.get("user_id"),
            category_id: row.get("category_id"),
            title: row.get("title"),
            content: row.get("content"),
            image: row.get("image"),
            is_active: row.get("is_active"),
            created_at: row.get("created_at"),
            updated_at: row.get("updated_at"),
        }))
    }

    async fn create(&self, user_id: i64, input: &CreatePostInput) -> Result<PostWithMeta> {
        let now = Utc::now();
        let result = sqlx::query(
            r#"
            INSERT INTO community_posts (user_id, category_id, title, content, image, is_active, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, 1, ?, ?)
            "#,
        )
        .bind(user_id)
        .bind(input.category_id)
        .bind(&input.title)
        .bind(&input.content)
        .bind(input.image.as_deref())
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await
        .context("Failed to create post")?;

        let id = result.last_insert_rowid();
        self.get_with_meta(id)
            .await?
            .ok_or_else(|| anyhow::anyhow!("Post {} missing after insert", id))
    }

    async fn update(&self, id: i64, input: &UpdatePostInput) -> Result<Option<PostWithMeta>> {
        let result = sqlx::query(
            r#"
            UPDATE community_posts SET
                title = COALESCE(?, title),
                content = COALESCE(?, content),
                category_id = COALESCE(?, category_id),
                image = COALESCE(?, image),
                updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(input.title.as_deref())
        .bind(input.content.as_deref())
        .bind(input.category_id)
        .bind(input.image.as_deref())
        .bind(Utc::now())
        .bind(id)
        .execute(&self.pool)
        .await
        .with_context(|| format!("Failed to update post {}", id))?;

        if result.rows_affected() == 0 {
            return Ok(None);
        }
        self.get_with_meta(id).await
    }

    async fn delete(&self, id: i64) -> Result<bool> {
        let result = sqlx::query("DELETE FROM community_posts WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await
            .context("Failed to delete post")?;
        Ok(result.rows_affected() > 0)
    }

    async fn toggle_like(&self, post_id: i64, user_id: i64) -> Result<LikeStatus> {
        reaction::toggle_like(&self.pool, ReactionTarget::Post, post_id, user_id).await
    }

    async fn has_reported(&self, post_id: i64, reporter_id: i64) -> Result<bool> {
        reaction::has_reported(&self.pool, ReactionTarget::Post, post_id, reporter_id).await
    }

    async fn report(
        &self,
        post_id: i64,
        reporter_id: i64,
        reason: ReportReason,
        detail: Option<&str>,
        hide_threshold: i64,
    ) -> Result<ReportOutcome> {
        reaction::file_report(
            &self.pool,
            ReactionTarget::Post,
            post_id,
            reporter_id,
            reason,
            detail,
            hide_threshold,
        )
        .await
    }
}

async fn list_posts(pool: &SqlitePool, filter: &PostFilter, params: &ListParams) -> Result<PagedResult<PostWithMeta>> {
    let mut conditions = vec!["p.is_active = 1"];
    if filter.category.is_some() {
        conditions.push("c.slug = ?");
    }
    let pattern = filter.query.as_deref().map(like_pattern);
    if pattern.is_some() {
        conditions.push("(p.title LIKE ? ESCAPE '\\' OR p.content LIKE ? ESCAPE '\\')");
    }
    let where_clause = format!("WHERE {}", conditions.join(" AND "));

    let count_sql = format!(
        r#"
        SELECT COUNT(*) AS count
        FROM community_posts p
        LEFT JOIN community_categories c ON c.id = p.category_id
        {}
        "#,
        where_clause
    );
    let mut count_query = sqlx::query(&count_sql);
    if let Some(slug) = &filter.category {
        count_query = count_query.bind(slug);
    }
    if let Some(p) = &pattern {
        count_query = count_query.bind(p).bind(p);
    }
    let total: i64 = count_query
        .fetch_one(pool)
        .await
        .context("Failed to count posts")?
        .get("count");

    let sql = format!(
        "{} {} ORDER BY p.created_at DESC, p.id DESC LIMIT ? OFFSET ?",
        POST_META_SELECT, where_clause
    );
    let mut query = sqlx::query(&sql);
    if let Some(slug) = &filter.category {
        query = query.bind(slug);
    }
    if let Some(p) = &pattern {
        query = query.bind(p).bind(p);
    }
    let rows = query
        .bind(params.limit())
        .bind(params.offset())
        .fetch_all(pool)
        .await
        .context("Failed to list posts")?;

    let posts = rows.iter().map(row_to_post_meta).collect();
    Ok(PagedResult::new(posts, total, params))
}

fn row_to_category(row: &SqliteRow) -> CommunityCategory {
    CommunityCategory {
        id: row.get("id"),
        name: row.get("name"),
        slug: row.get("slug"),
    }
}

fn row_to_post_meta(row: &SqliteRow) -> PostWithMeta {
    let category_id: Option<i64> = row.get("category_id");
    let category_name: Option<String> = row.get("category_name");
    let category_slug: Option<String> = row.get("category_slug");
    let category = match (category_id, category_name, category_slug) {
        (Some(id), Some(name), Some(slug)) => Some(CommunityCategory { id, name, slug }),
        _ => None,
    };

    PostWithMeta {
        id: row.get("id"),
        user_id: row.get("user_id"),
        author: row.get("author"),
        category,
        title: row.get("title"),
        content: row.get("content"),
        image: row.get("image"),
        comment_count: row.get("comment_count"),
        like_count: row.get("like_count"),
        report_count: row.get("report_count"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}
