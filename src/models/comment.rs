//! Community comments, likes and reports

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Text shown in place of a deleted comment that still has replies
pub const DELETED_COMMENT_TEXT: &str = "삭제된 댓글입니다.";

/// Stored comment row
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Comment {
    pub id: i64,
    pub post_id: i64,
    pub user_id: i64,
    pub parent_id: Option<i64>,
    pub comment: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Comment with author and like count, nested under its root comment
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommentWithMeta {
    pub id: i64,
    pub post_id: i64,
    pub user_id: i64,
    pub username: String,
    pub parent_id: Option<i64>,
    pub comment: String,
    #[serde(skip)]
    pub is_active: bool,
    pub is_deleted: bool,
    pub like_count: i64,
    pub created_at: DateTime<Utc>,
    pub replies: Vec<CommentWithMeta>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateCommentInput {
    pub comment: String,
    #[serde(default)]
    pub parent_id: Option<i64>,
}

/// What a like or report points at
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReactionTarget {
    Post,
    Comment,
}

impl std::fmt::Display for ReactionTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Post => write!(f, "post"),
            Self::Comment => write!(f, "comment"),
        }
    }
}

/// Result of toggling a like
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LikeStatus {
    pub liked: bool,
    pub like_count: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportReason {
    Spam,
    Abuse,
    Obscene,
    Illegal,
    Other,
}

impl std::fmt::Display for ReportReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Spam => "spam",
            Self::Abuse => "abuse",
            Self::Obscene => "obscene",
            Self::Illegal => "illegal",
            Self::Other => "other",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ReportInput {
    pub reason: ReportReason,
    #[serde(default)]
    pub detail: Option<String>,
}

/// Outcome of filing a report
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ReportOutcome {
    pub report_count: i64,
    /// True when this report pushed the target over the hide threshold
    pub hidden: bool,
}

/// Arrange a flat, oldest-first comment list into root comments with replies.
///
/// Inactive replies are dropped. An inactive root is kept, with its text
/// replaced by [`DELETED_COMMENT_TEXT`], only while it has visible replies.
pub fn build_comment_tree(flat: Vec<CommentWithMeta>) -> Vec<CommentWithMeta> {
    let mut roots: Vec<CommentWithMeta> = Vec::new();
    let mut replies_map: HashMap<i64, Vec<CommentWithMeta>> = HashMap::new();

    for comment in flat {
        match comment.parent_id {
            Some(parent_id) => {
                if comment.is_active {
                    replies_map.entry(parent_id).or_default().push(comment);
                }
            }
            None => roots.push(comment),
        }
    }

    roots
        .into_iter()
        .filter_map(|mut root| {
            root.replies = replies_map.remove(&root.id).unwrap_or_default();
            if root.is_active {
                Some(root)
            } else if !root.replies.is_empty() {
                root.comment = DELETED_COMMENT_TEXT.to_string();
                root.is_deleted = true;
                root.like_count = 0;
                Some(root)
            } else {
                None
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn meta(id: i64, parent_id: Option<i64>, is_active: bool) -> CommentWithMeta {
        CommentWithMeta {
            id,
            post_id: 1,
            user_id: 1,
            username: "writer".to_string(),
            parent_id,
            comment: format!("comment {}", id),
            is_active,
            is_deleted: false,
            like_count: 2,
            created_at: Utc::now(),
            replies: Vec::new(),
        }
    }

    #[test]
    fn test_replies_nested_under_root() {
        let flat = vec![
            meta(1, None, true),
            meta(2, Some(1), true),
            meta(3, None, true),
            meta(4, Some(1), true),
        ];

        let tree = build_comment_tree(flat);

        assert_eq!(tree.len(), 2);
        assert_eq!(tree[0].replies.iter().map(|c| c.id).collect::<Vec<_>>(), vec![2, 4]);
        assert!(tree[1].replies.is_empty());
    }

    #[test]
    fn test_deleted_root_with_replies_becomes_placeholder() {
        let flat = vec![meta(1, None, false), meta(2, Some(1), true)];

        let tree = build_comment_tree(flat);

        assert_eq!(tree.len(), 1);
        assert!(tree[0].is_deleted);
        assert_eq!(tree[0].comment, DELETED_COMMENT_TEXT);
        assert_eq!(tree[0].replies.len(), 1);
    }

    #[test]
    fn test_deleted_root_without_visible_replies_is_dropped() {
        let flat = vec![meta(1, None, false), meta(2, Some(1), false), meta(3, None, true)];

        let tree = build_comment_tree(flat);

        assert_eq!(tree.len(), 1);
        assert_eq!(tree[0].id, 3);
    }

    #[test]
    fn test_report_reason_serde() {
        let input: ReportInput = serde_json::from_str(r#"{"reason":"spam"}"#).unwrap();
        assert_eq!(input.reason, ReportReason::Spam);
        assert!(serde_json::from_str::<ReportInput>(r#"{"reason":"boring"}"#).is_err());
    }
}
