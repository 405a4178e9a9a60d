//! News repository
//!
//! Sources are created on demand by the importer; articles are unique by url.

use super::like_pattern;
use crate::models::{
    ListParams, NewNewsArticle, NewsArticle, NewsCategory, NewsFilter, NewsSource, PagedResult,
};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::{sqlite::SqliteRow, Row, SqliteConnection, SqlitePool};
use std::str::FromStr;
use std::sync::Arc;

#[async_trait]
pub trait NewsRepository: Send + Sync {
    async fn list(&self, filter: &NewsFilter, params: &ListParams) -> Result<PagedResult<NewsArticle>>;

    /// Enabled sources ordered by name
    async fn sources(&self) -> Result<Vec<NewsSource>>;

    /// Upsert articles by url in one transaction, returning how many were new
    async fn import(&self, articles: &[NewNewsArticle]) -> Result<usize>;
}

pub struct SqlxNewsRepository {
    pool: SqlitePool,
}

impl SqlxNewsRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn boxed(pool: SqlitePool) -> Arc<dyn NewsRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl NewsRepository for SqlxNewsRepository {
    async fn list(&self, filter: &NewsFilter, params: &ListParams) -> Result<PagedResult<NewsArticle>> {
        list_articles(&self.pool, filter, params).await
    }

    async fn sources(&self) -> Result<Vec<NewsSource>> {
        let rows = sqlx::query(
            "SELECT id, name, homepage, rss_url, enabled FROM news_sources WHERE enabled = 1 ORDER BY name",
        )
        .fetch_all(&self.pool)
        .await
        .context("Failed to list news sources")?;

        Ok(rows
            .iter()
            .map(|row| NewsSource {
                id: row.get("id"),
                name: row.get("name"),
                homepage: row.get("homepage"),
                rss_url: row.get("rss_url"),
                enabled: row.get("enabled"),
            })
            .collect())
    }

    async fn import(&self, articles: &[NewNewsArticle]) -> Result<usize> {
        let mut tx = self.pool.begin().await.context("Failed to begin news import")?;
        let mut created = 0;

        for article in articles {
            let source_id = source_id_for(&mut *tx, &article.source_name).await?;

            let existing = sqlx::query("SELECT id FROM news_articles WHERE url = ?")
                .bind(&article.url)
                .fetch_optional(&mut *tx)
                .await
                .context("Failed to look up article by url")?;

            match existing {
                Some(row) => {
                    let id: i64 = row.get("id");
                    sqlx::query(
                        r#"
                        UPDATE news_articles
                        SET source_id = ?, title = ?, published_at = ?, thumbnail = ?, category = ?
                        WHERE id = ?
                        "#,
                    )
                    .bind(source_id)
                    .bind(&article.title)
                    .bind(article.published_at)
                    .bind(&article.thumbnail)
                    .bind(article.category.label())
                    .bind(id)
                    .execute(&mut *tx)
                    .await
                    .context("Failed to update news article")?;
                }
                None => {
                    sqlx::query(
                        r#"
                        INSERT INTO news_articles (source_id, title, url, published_at, thumbnail, category, created_at)
                        VALUES (?, ?, ?, ?, ?, ?, ?)
                        "#,
                    )
                    .bind(source_id)
                    .bind(&article.title)
                    .bind(&article.url)
                    .bind(article.published_at)
                    .bind(&article.thumbnail)
                    .bind(article.category.label())
                    .bind(Utc::now())
                    .execute(&mut *tx)
                    .await
                    .context("Failed to insert news article")?;
                    created += 1;
                }
            }
        }

        tx.commit().await.context("Failed to commit news import")?;
        Ok(created)
    }
}

async fn source_id_for(conn: &mut SqliteConnection, name: &str) -> Result<i64> {
    let existing = sqlx::query("SELECT id FROM news_sources WHERE name = ?")
        .bind(name)
        .fetch_optional(&mut *conn)
        .await
        .context("Failed to look up news source")?;

    if let Some(row) = existing {
        return Ok(row.get("id"));
    }

    let result = sqlx::query("INSERT INTO news_sources (name, homepage, rss_url, enabled) VALUES (?, '', '', 1)")
        .bind(name)
        .execute(&mut *conn)
        .await
        .with_context(|| format!("Failed to create news source {}", name))?;
    Ok(result.last_insert_rowid())
}

async fn list_articles(pool: &SqlitePool, filter: &NewsFilter, params: &ListParams) -> Result<PagedResult<NewsArticle>> {
    let mut conditions: Vec<&str> = Vec::new();
    let pattern = filter.query.as_deref().map(like_pattern);
    if pattern.is_some() {
        conditions.push("(a.title LIKE ? ESCAPE '\\' OR a.category LIKE ? ESCAPE '\\')");
    }
    if filter.source_id.is_some() {
        conditions.push("a.source_id = ?");
    }
    if filter.category.is_some() {
        conditions.push("a.category = ?");
    }
    if filter.date_from.is_some() {
        conditions.push("date(a.published_at) >= date(?)");
    }
    if filter.date_to.is_some() {
        conditions.push("date(a.published_at) <= date(?)");
    }
    let where_clause = if conditions.is_empty() {
        String::new()
    } else {
        format!("WHERE {}", conditions.join(" AND "))
    };

    let date_from = filter.date_from.map(|d| d.format("%Y-%m-%d").to_string());
    let date_to = filter.date_to.map(|d| d.format("%Y-%m-%d").to_string());

    let count_sql = format!("SELECT COUNT(*) AS count FROM news_articles a {}", where_clause);
    let mut count_query = sqlx::query(&count_sql);
    if let Some(p) = &pattern {
        count_query = count_query.bind(p).bind(p);
    }
    if let Some(source_id) = filter.source_id {
        count_query = count_query.bind(source_id);
    }
    if let Some(category) = filter.category {
        count_query = count_query.bind(category.label());
    }
    if let Some(d) = &date_from {
        count_query = count_query.bind(d);
    }
    if let Some(d) = &date_to {
        count_query = count_query.bind(d);
    }
    let total: i64 = count_query
        .fetch_one(pool)
        .await
        .context("Failed to count news articles")?
        .get("count");

    let sql = format!(
        r#"
        SELECT a.id, a.source_id, s.name AS source_name, a.title, a.url, a.published_at,
            a.thumbnail, a.category, a.created_at
        FROM news_articles a
        JOIN news_sources s ON s.id = a.source_id
        {}
        ORDER BY {}
        LIMIT ? OFFSET ?
        "#,
        where_clause,
        filter.ordering.sql()
    );
    let mut query = sqlx::query(&sql);
    if let Some(p) = &pattern {
        query = query.bind(p).bind(p);
    }
    if let Some(source_id) = filter.source_id {
        query = query.bind(source_id);
    }
    if let Some(category) = filter.category {
        query = query.bind(category.label());
    }
    if let Some(d) = &date_from {
        query = query.bind(d);
    }
    if let Some(d) = &date_to {
        query = query.bind(d);
    }
    let rows = query
        .bind(params.limit())
        .bind(params.offset())
        .fetch_all(pool)
        .await
        .context("Failed to list news articles")?;

    let articles = rows.iter().map(row_to_article).collect::<Result<Vec<_>>>()?;
    Ok(PagedResult::new(articles, total, params))
}

fn row_to_article(row: &SqliteRow) -> Result<NewsArticle> {
    let category: String = row.get("category");
    Ok(NewsArticle {
        id: row.get("id"),
        source_id: row.get("source_id"),
        source_name: row.get("source_name"),
        title: row.get("title"),
        url: row.get("url"),
        published_at: row.get("published_at"),
        thumbnail: row.get("thumbnail"),
        category: NewsCategory::from_str(&category)?,
        created_at: row.get("created_at"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::test_support::setup_pool;
    use crate::models::NewsOrdering;
    use chrono::{NaiveDate, TimeZone};

    fn article(source: &str, title: &str, url: &str, day: u32, category: NewsCategory) -> NewNewsArticle {
        NewNewsArticle {
            source_name: source.to_string(),
            title: title.to_string(),
            url: url.to_string(),
            published_at: Some(Utc.with_ymd_and_hms(2024, 3, day, 9, 0, 0).unwrap()),
            thumbnail: String::new(),
            category,
        }
    }

    async fn seeded_repo() -> SqlxNewsRepository {
        let repo = SqlxNewsRepository::new(setup_pool().await);
        let created = repo
            .import(&[
                article("연합뉴스", "전세 대출 규제 강화", "https://n/1", 1, NewsCategory::Policy),
                article("한겨레", "자취 요리 꿀팁", "https://n/2", 5, NewsCategory::Life),
                article("연합뉴스", "아파트 시세 동향", "https://n/3", 10, NewsCategory::News),
            ])
            .await
            .unwrap();
        assert_eq!(created, 3);
        repo
    }

    #[tokio::test]
    async fn test_import_upserts_by_url() {
        let repo = seeded_repo().await;

        let again = repo
            .import(&[
                article("연합뉴스", "전세 대출 규제 완화", "https://n/1", 2, NewsCategory::Policy),
                article("조선일보", "새 기사", "https://n/4", 11, NewsCategory::Info),
            ])
            .await
            .unwrap();
        assert_eq!(again, 1);

        let all = repo.list(&NewsFilter::default(), &ListParams::default()).await.unwrap();
        assert_eq!(all.total, 4);
        assert!(all.items.iter().any(|a| a.title == "전세 대출 규제 완화"));
        assert_eq!(repo.sources().await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_query_matches_wildcards_literally() {
        let repo = seeded_repo().await;
        repo.import(&[article("연합뉴스", "월세 5% 상승", "https://n/5", 12, NewsCategory::News)])
            .await
            .unwrap();

        let query = |q: &str| NewsFilter {
            query: Some(q.to_string()),
            ..Default::default()
        };
        let percent = repo.list(&query("5%"), &ListParams::default()).await.unwrap();
        assert_eq!(percent.total, 1);
        assert_eq!(percent.items[0].url, "https://n/5");
        assert_eq!(repo.list(&query("%"), &ListParams::default()).await.unwrap().total, 1);
        assert_eq!(repo.list(&query("_"), &ListParams::default()).await.unwrap().total, 0);
    }

    #[tokio::test]
    async fn test_default_order_and_filters() {
        let repo = seeded_repo().await;

        let all = repo.list(&NewsFilter::default(), &ListParams::default()).await.unwrap();
        assert_eq!(all.items[0].url, "https://n/3");
        assert_eq!(all.items[0].source_name, "연합뉴스");

        let policy = NewsFilter {
            category: Some(NewsCategory::Policy),
            ..Default::default()
        };
        assert_eq!(repo.list(&policy, &ListParams::default()).await.unwrap().total, 1);

        let by_query = NewsFilter {
            query: Some("생활".to_string()),
            ..Default::default()
        };
        let found = repo.list(&by_query, &ListParams::default()).await.unwrap();
        assert_eq!(found.items[0].url, "https://n/2");

        let range = NewsFilter {
            date_from: NaiveDate::from_ymd_opt(2024, 3, 5),
            date_to: NaiveDate::from_ymd_opt(2024, 3, 10),
            ordering: NewsOrdering::PublishedAsc,
            ..Default::default()
        };
        let ranged = repo.list(&range, &ListParams::default()).await.unwrap();
        assert_eq!(ranged.items.iter().map(|a| a.url.as_str()).collect::<Vec<_>>(), vec!["https://n/2", "https://n/3"]);
    }

    #[tokio::test]
    async fn test_source_filter() {
        let repo = seeded_repo().await;
        let sources = repo.sources().await.unwrap();
        let yonhap = sources.iter().find(|s| s.name == "연합뉴스").unwrap();

        let filter = NewsFilter {
            source_id: Some(yonhap.id),
            ..Default::default()
        };
        assert_eq!(repo.list(&filter, &ListParams::default()).await.unwrap().total, 2);
    }
}
