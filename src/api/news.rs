//! News API endpoints (public)
//!
//! - GET /api/v1/community/news         - Paged, filterable article list
//! - GET /api/v1/community/news/sources - Enabled sources

use axum::{
    extract::{Query, State},
    routing::get,
    Json, Router,
};
use chrono::NaiveDate;
use serde::Deserialize;

use crate::api::common::{default_page, default_page_size, non_blank, PageResponse};
use crate::api::middleware::{ApiError, AppState};
use crate::models::{
    ListParams, NewsArticle, NewsCategory, NewsFilter, NewsOrdering, NewsSource, MAX_PAGE_SIZE,
};

#[derive(Debug, Default, Deserialize)]
pub struct NewsQuery {
    #[serde(default)]
    pub q: Option<String>,
    #[serde(default)]
    pub source_id: Option<i64>,
    #[serde(default)]
    pub category: Option<String>,
    /// `YYYY-MM-DD`, inclusive
    #[serde(default)]
    pub date_from: Option<String>,
    #[serde(default)]
    pub date_to: Option<String>,
    #[serde(default)]
    pub ordering: Option<String>,
    #[serde(default = "default_page")]
    pub page: u32,
    #[serde(default = "default_page_size")]
    pub page_size: u32,
}

impl NewsQuery {
    /// Validate the raw query into a repository filter
    pub fn filter(self) -> Result<NewsFilter, ApiError> {
        let category = match non_blank(self.category) {
            Some(raw) => Some(
                raw.parse::<NewsCategory>()
                    .map_err(|e| ApiError::validation_error(e.to_string()))?,
            ),
            None => None,
        };

        let ordering = match non_blank(self.ordering) {
            Some(raw) => NewsOrdering::parse(&raw).ok_or_else(|| {
                ApiError::validation_error(format!("Invalid ordering: {}", raw))
            })?,
            None => NewsOrdering::default(),
        };

        Ok(NewsFilter {
            query: non_blank(self.q),
            source_id: self.source_id,
            category,
            date_from: parse_date("date_from", self.date_from)?,
            date_to: parse_date("date_to", self.date_to)?,
            ordering,
        })
    }
}

fn parse_date(field: &str, value: Option<String>) -> Result<Option<NaiveDate>, ApiError> {
    match non_blank(value) {
        Some(raw) => NaiveDate::parse_from_str(&raw, "%Y-%m-%d")
            .map(Some)
            .map_err(|_| ApiError::validation_error(format!("Invalid {}: {}", field, raw))),
        None => Ok(None),
    }
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_news))
        .route("/sources", get(list_sources))
}

/// GET /api/v1/community/news
async fn list_news(
    State(state): State<AppState>,
    Query(query): Query<NewsQuery>,
) -> Result<Json<PageResponse<NewsArticle>>, ApiError> {
    let params = ListParams::with_max(query.page, query.page_size, MAX_PAGE_SIZE);
    let filter = query.filter()?;
    let articles = state.news_service.list(&filter, &params).await?;
    Ok(Json(articles.into()))
}

/// GET /api/v1/community/news/sources
async fn list_sources(State(state): State<AppState>) -> Result<Json<Vec<NewsSource>>, ApiError> {
    Ok(Json(state.news_service.sources().await?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filter_parsing() {
        let query = NewsQuery {
            q: Some(" 월세 ".to_string()),
            category: Some("정책".to_string()),
            date_from: Some("2024-03-01".to_string()),
            ordering: Some("created_at".to_string()),
            ..Default::default()
        };
        let filter = query.filter().unwrap();
        assert_eq!(filter.query.as_deref(), Some("월세"));
        assert_eq!(filter.category, Some(NewsCategory::Policy));
        assert_eq!(filter.date_from, NaiveDate::from_ymd_opt(2024, 3, 1));
        assert_eq!(filter.date_to, None);
        assert_eq!(filter.ordering, NewsOrdering::CreatedAsc);
    }

    #[test]
    fn test_filter_defaults_to_newest_published() {
        let filter = NewsQuery::default().filter().unwrap();
        assert_eq!(filter.ordering, NewsOrdering::PublishedDesc);
        assert!(filter.category.is_none());
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        let bad_category = NewsQuery {
            category: Some("sports".to_string()),
            ..Default::default()
        };
        assert_eq!(bad_category.filter().unwrap_err().error.code, "VALIDATION_ERROR");

        let bad_date = NewsQuery {
            date_to: Some("03/01/2024".to_string()),
            ..Default::default()
        };
        assert!(bad_date.filter().is_err());

        let bad_ordering = NewsQuery {
            ordering: Some("title".to_string()),
            ..Default::default()
        };
        assert!(bad_ordering.filter().is_err());
    }
}
