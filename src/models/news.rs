//! News sources and imported articles

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Article category assigned by the keyword classifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum NewsCategory {
    #[default]
    #[serde(rename = "뉴스")]
    News,
    #[serde(rename = "정책")]
    Policy,
    #[serde(rename = "생활")]
    Life,
    #[serde(rename = "정보")]
    Info,
}

impl NewsCategory {
    pub fn label(&self) -> &'static str {
        match self {
            Self::News => "뉴스",
            Self::Policy => "정책",
            Self::Life => "생활",
            Self::Info => "정보",
        }
    }
}

impl fmt::Display for NewsCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for NewsCategory {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "뉴스" => Ok(Self::News),
            "정책" => Ok(Self::Policy),
            "생활" => Ok(Self::Life),
            "정보" => Ok(Self::Info),
            other => Err(anyhow::anyhow!("Invalid news category: {}", other)),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct NewsSource {
    pub id: i64,
    pub name: String,
    pub homepage: String,
    pub rss_url: String,
    pub enabled: bool,
}

/// Article joined with its source name
#[derive(Debug, Clone, Serialize)]
pub struct NewsArticle {
    pub id: i64,
    pub source_id: i64,
    pub source_name: String,
    pub title: String,
    pub url: String,
    pub published_at: Option<DateTime<Utc>>,
    pub thumbnail: String,
    pub category: NewsCategory,
    pub created_at: DateTime<Utc>,
}

/// Article about to be upserted by url
#[derive(Debug, Clone, PartialEq)]
pub struct NewNewsArticle {
    pub source_name: String,
    pub title: String,
    pub url: String,
    pub published_at: Option<DateTime<Utc>>,
    pub thumbnail: String,
    pub category: NewsCategory,
}

/// Sort order of the news list
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NewsOrdering {
    PublishedAsc,
    #[default]
    PublishedDesc,
    CreatedAsc,
    CreatedDesc,
}

impl NewsOrdering {
    /// Accepts `published_at`, `-published_at`, `created_at`, `-created_at`
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim() {
            "published_at" => Some(Self::PublishedAsc),
            "-published_at" => Some(Self::PublishedDesc),
            "created_at" => Some(Self::CreatedAsc),
            "-created_at" => Some(Self::CreatedDesc),
            _ => None,
        }
    }

    pub fn sql(&self) -> &'static str {
        match self {
            Self::PublishedAsc => "a.published_at ASC, a.id ASC",
            Self::PublishedDesc => "a.published_at DESC, a.id DESC",
            Self::CreatedAsc => "a.created_at ASC, a.id ASC",
            Self::CreatedDesc => "a.created_at DESC, a.id DESC",
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct NewsFilter {
    /// Substring of title or category
    pub query: Option<String>,
    pub source_id: Option<i64>,
    pub category: Option<NewsCategory>,
    /// Inclusive calendar bounds on `published_at`
    pub date_from: Option<NaiveDate>,
    pub date_to: Option<NaiveDate>,
    pub ordering: NewsOrdering,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_serializes_as_korean_label() {
        assert_eq!(serde_json::to_value(NewsCategory::Policy).unwrap(), "정책");
        assert_eq!("생활".parse::<NewsCategory>().unwrap(), NewsCategory::Life);
        assert!("sports".parse::<NewsCategory>().is_err());
    }

    #[test]
    fn test_ordering_parse() {
        assert_eq!(NewsOrdering::parse("created_at"), Some(NewsOrdering::CreatedAsc));
        assert_eq!(NewsOrdering::parse("-published_at"), Some(NewsOrdering::PublishedDesc));
        assert_eq!(NewsOrdering::parse("title"), None);
    }
}
