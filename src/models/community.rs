//! Community board posts and categories

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Board category (seeded by migrations)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommunityCategory {
    pub id: i64,
    pub name: String,
    pub slug: String,
}

/// Stored post row
#[derive(Debug, Clone, Serialize)]
pub struct Post {
    pub id: i64,
    pub user_id: i64,
    pub category_id: Option<i64>,
    pub title: String,
    pub content: String,
    pub image: Option<String>,
    /// Cleared when the post is hidden by reports
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Post with author, category and engagement counters
#[derive(Debug, Clone, Serialize)]
pub struct PostWithMeta {
    pub id: i64,
    pub user_id: i64,
    pub author: String,
    pub category: Option<CommunityCategory>,
    pub title: String,
    pub content: String,
    pub image: Option<String>,
    pub comment_count: i64,
    pub like_count: i64,
    pub report_count: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreatePostInput {
    pub title: String,
    pub content: String,
    #[serde(default)]
    pub category_id: Option<i64>,
    #[serde(default)]
    pub image: Option<String>,
}

/// Partial post update; absent fields are left untouched
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdatePostInput {
    pub title: Option<String>,
    pub content: Option<String>,
    pub category_id: Option<i64>,
    pub image: Option<String>,
}

/// Post list filters
#[derive(Debug, Clone, Default)]
pub struct PostFilter {
    /// Category slug
    pub category: Option<String>,
    /// Substring of title or content
    pub query: Option<String>,
}
