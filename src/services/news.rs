//! News service
//!
//! Listing of imported articles, the keyword classifier and the parser for
//! Daum news cluster exports.

use crate::db::repositories::NewsRepository;
use crate::models::{
    ListParams, NewNewsArticle, NewsArticle, NewsCategory, NewsFilter, NewsSource, PagedResult,
};
use anyhow::Result;
use chrono::{DateTime, NaiveDateTime, Utc};
use serde_json::Value;
use std::sync::Arc;

/// Source name used when an item has no publisher
pub const UNKNOWN_SOURCE: &str = "Unknown";

const POLICY_KEYWORDS: &[&str] = &[
    "정부지원", "정부 지원", "지원금", "보조금", "정책", "대책", "공고", "모집", "신청", "접수",
    "발표", "시행", "개편", "개정", "지침", "안내문", "국토부", "국토교통부", "복지부", "기재부",
    "지자체", "서울시", "경기도", "조례", "공공임대", "청년월세", "전세대출", "대출제도",
];

const LIFE_KEYWORDS: &[&str] = &[
    "자취", "원룸", "생활", "꿀팁", "노하우", "체크리스트", "청소", "정리", "인테리어", "이사",
    "계약 팁", "생활 팁", "절약", "공과금", "하숙", "기숙사",
];

const INFO_KEYWORDS: &[&str] = &[
    "가이드", "총정리", "정리", "핵심", "FAQ", "Q&A", "알아두면", "해설", "분석", "데이터",
    "통계", "리포트", "전망", "인사이트", "리서치", "브리핑",
];

/// Classify an article by keyword hits, checking policy, life and info in
/// that order; anything else is plain news.
pub fn categorize_article(title: &str, summary: Option<&str>, section_title: Option<&str>) -> NewsCategory {
    let blob = [
        title.trim(),
        summary.unwrap_or_default().trim(),
        section_title.unwrap_or_default().trim(),
    ]
    .join(" ");

    let contains_any = |keywords: &[&str]| keywords.iter().any(|kw| blob.contains(kw));

    if contains_any(POLICY_KEYWORDS) {
        NewsCategory::Policy
    } else if contains_any(LIFE_KEYWORDS) {
        NewsCategory::Life
    } else if contains_any(INFO_KEYWORDS) {
        NewsCategory::Info
    } else {
        NewsCategory::News
    }
}

/// Parse `createdAt`: RFC 3339, or a naive timestamp taken as UTC
pub fn parse_published_at(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .map(|naive| naive.and_utc())
}

/// Extract articles from a Daum cluster export.
///
/// The export is a list of documents, each holding
/// `data.document.data.{title, contents[]}`. Items without a title or
/// `pcUrl` are skipped; a payload that is not a list yields nothing.
pub fn parse_daum_export(blob: &Value) -> Vec<NewNewsArticle> {
    let Some(documents) = blob.as_array() else {
        return Vec::new();
    };

    let mut articles = Vec::new();
    for document in documents {
        let inner = document
            .pointer("/data/document/data")
            .unwrap_or(&Value::Null);
        let section_title = str_field(inner, "title");
        let Some(contents) = inner.get("contents").and_then(Value::as_array) else {
            continue;
        };

        for item in contents.iter().filter(|item| item.is_object()) {
            let title = str_field(item, "title");
            let url = str_field(item, "pcUrl");
            if title.is_empty() || url.is_empty() {
                continue;
            }
            let summary = str_field(item, "summary");
            let source_name = match str_field(item, "cpName") {
                "" => UNKNOWN_SOURCE,
                name => name,
            };

            articles.push(NewNewsArticle {
                source_name: source_name.to_string(),
                title: title.to_string(),
                url: url.to_string(),
                published_at: item
                    .get("createdAt")
                    .and_then(Value::as_str)
                    .and_then(parse_published_at),
                thumbnail: str_field(item, "image").to_string(),
                category: categorize_article(title, Some(summary), Some(section_title)),
            });
        }
    }
    articles
}

fn str_field<'a>(value: &'a Value, key: &str) -> &'a str {
    value.get(key).and_then(Value::as_str).unwrap_or_default().trim()
}

pub struct NewsService {
    repo: Arc<dyn NewsRepository>,
}

impl NewsService {
    pub fn new(repo: Arc<dyn NewsRepository>) -> Self {
        Self { repo }
    }

    pub async fn list(&self, filter: &NewsFilter, params: &ListParams) -> Result<PagedResult<NewsArticle>> {
        self.repo.list(filter, params).await
    }

    pub async fn sources(&self) -> Result<Vec<NewsSource>> {
        self.repo.sources().await
    }

    /// Import a Daum export, returning the number of new articles
    pub async fn import(&self, blob: &Value) -> Result<usize> {
        let articles = parse_daum_export(blob);
        let created = self.repo.import(&articles).await?;
        tracing::info!(
            "News import finished: {} parsed, {} created",
            articles.len(),
            created
        );
        Ok(created)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::test_support::setup_pool;
    use crate::db::repositories::SqlxNewsRepository;
    use chrono::{Datelike, Timelike};
    use proptest::prelude::*;
    use serde_json::json;

    fn export() -> Value {
        json!([
            {"data": {"document": {"data": {
                "title": "부동산 뉴스",
                "contents": [
                    {"title": "청년월세 지원 확대", "pcUrl": "https://news/1", "cpName": "연합뉴스",
                     "createdAt": "2024-03-01T09:30:00+09:00", "image": "https://img/1.jpg"},
                    {"title": "자취생 청소 루틴", "pcUrl": "https://news/2", "cpName": "  ",
                     "createdAt": "2024-03-02T10:00:00"},
                    {"title": "", "pcUrl": "https://news/3"},
                    {"title": "no url"},
                    "not an object"
                ]
            }}}},
            {"data": {"document": {"data": {"title": "비어 있음", "contents": "nope"}}}},
            {"unexpected": true}
        ])
    }

    #[test]
    fn test_categorize_priority() {
        assert_eq!(categorize_article("서울시 공공임대 모집", None, None), NewsCategory::Policy);
        // Policy wins over life
        assert_eq!(categorize_article("원룸 정책", None, None), NewsCategory::Policy);
        assert_eq!(categorize_article("원룸 인테리어", None, None), NewsCategory::Life);
        assert_eq!(categorize_article("시장", Some("데이터로 본 전망"), None), NewsCategory::Info);
        assert_eq!(categorize_article("집값", None, Some("생활 팁")), NewsCategory::Life);
        assert_eq!(categorize_article("아파트 매매가 상승", None, None), NewsCategory::News);
    }

    #[test]
    fn test_parse_published_at() {
        let kst = parse_published_at("2024-03-01T09:30:00+09:00").unwrap();
        assert_eq!(kst.hour(), 0);

        let naive = parse_published_at("2024-03-02T10:00:00").unwrap();
        assert_eq!((naive.day(), naive.hour()), (2, 10));

        assert!(parse_published_at("2024-03-02 10:00:00").is_some());
        assert!(parse_published_at("어제").is_none());
        assert!(parse_published_at("").is_none());
    }

    #[test]
    fn test_parse_daum_export() {
        let articles = parse_daum_export(&export());
        assert_eq!(articles.len(), 2);

        assert_eq!(articles[0].source_name, "연합뉴스");
        assert_eq!(articles[0].category, NewsCategory::Policy);
        assert_eq!(articles[0].thumbnail, "https://img/1.jpg");

        assert_eq!(articles[1].source_name, UNKNOWN_SOURCE);
        assert_eq!(articles[1].category, NewsCategory::Life);
        assert_eq!(articles[1].thumbnail, "");

        assert!(parse_daum_export(&json!({"data": []})).is_empty());
    }

    #[tokio::test]
    async fn test_import_counts_only_new_articles() {
        let pool = setup_pool().await;
        let service = NewsService::new(SqlxNewsRepository::boxed(pool));

        assert_eq!(service.import(&export()).await.unwrap(), 2);
        assert_eq!(service.import(&export()).await.unwrap(), 0);
        assert_eq!(service.import(&json!("nothing")).await.unwrap(), 0);

        let sources: Vec<String> = service.sources().await.unwrap().into_iter().map(|s| s.name).collect();
        assert!(sources.contains(&UNKNOWN_SOURCE.to_string()));
        assert!(sources.contains(&"연합뉴스".to_string()));

        let page = service.list(&NewsFilter::default(), &ListParams::default()).await.unwrap();
        assert_eq!(page.total, 2);
        // Newest publication first
        assert_eq!(page.items[0].url, "https://news/2");
    }

    proptest! {
        #[test]
        fn categorize_never_panics_and_is_deterministic(title in "\\PC{0,40}", summary in "\\PC{0,40}") {
            let first = categorize_article(&title, Some(&summary), None);
            let second = categorize_article(&title, Some(&summary), None);
            prop_assert_eq!(first, second);
        }

        #[test]
        fn policy_keyword_always_wins(prefix in "[a-z ]{0,10}", kw in proptest::sample::select(POLICY_KEYWORDS)) {
            let title = format!("{}{} 원룸 가이드", prefix, kw);
            prop_assert_eq!(categorize_article(&title, None, None), NewsCategory::Policy);
        }
    }
}
