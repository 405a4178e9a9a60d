//! Bookmark model

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::room::RoomCard;

/// A user's saved room
#[derive(Debug, Clone, Serialize)]
pub struct Bookmark {
    pub id: i64,
    pub user_id: i64,
    pub room_id: i64,
    pub created_at: DateTime<Utc>,
}

/// Bookmark joined with the card of the bookmarked room
#[derive(Debug, Clone, Serialize)]
pub struct BookmarkEntry {
    pub id: i64,
    pub room: RoomCard,
    pub created_at: DateTime<Utc>,
}
