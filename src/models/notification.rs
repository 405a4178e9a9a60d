//! In-app notifications for community activity

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    /// Someone commented on your post
    PostComment,
    /// Someone replied to your comment
    CommentReply,
    PostLike,
    CommentLike,
}

impl fmt::Display for NotificationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::PostComment => "post_comment",
            Self::CommentReply => "comment_reply",
            Self::PostLike => "post_like",
            Self::CommentLike => "comment_like",
        };
        f.write_str(s)
    }
}

impl FromStr for NotificationKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "post_comment" => Ok(Self::PostComment),
            "comment_reply" => Ok(Self::CommentReply),
            "post_like" => Ok(Self::PostLike),
            "comment_like" => Ok(Self::CommentLike),
            _ => Err(anyhow::anyhow!("Invalid notification kind: {}", s)),
        }
    }
}

impl NotificationKind {
    /// Message shown to the recipient
    pub fn message(&self, actor: &str) -> String {
        match self {
            Self::PostComment => format!("{}님이 회원님의 게시글에 댓글을 남겼습니다.", actor),
            Self::CommentReply => format!("{}님이 회원님의 댓글에 답글을 남겼습니다.", actor),
            Self::PostLike => format!("{}님이 회원님의 게시글을 좋아합니다.", actor),
            Self::CommentLike => format!("{}님이 회원님의 댓글을 좋아합니다.", actor),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Notification {
    pub id: i64,
    pub recipient_id: i64,
    pub actor_id: i64,
    pub actor_username: String,
    pub kind: NotificationKind,
    pub post_id: Option<i64>,
    pub comment_id: Option<i64>,
    pub message: String,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
}

/// A notification about to be stored
#[derive(Debug, Clone)]
pub struct NewNotification {
    pub recipient_id: i64,
    pub actor_id: i64,
    pub kind: NotificationKind,
    pub post_id: Option<i64>,
    pub comment_id: Option<i64>,
    pub message: String,
}
