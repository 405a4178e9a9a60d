//! Bookmark service

use crate::db::repositories::{BookmarkRepository, RoomRepository};
use crate::models::{BookmarkEntry, ListParams, PagedResult, RoomCard};
use std::sync::Arc;

pub const DEFAULT_PAGE_SIZE: u32 = 6;
pub const MAX_PAGE_SIZE: u32 = 10;

#[derive(Debug, thiserror::Error)]
pub enum BookmarkServiceError {
    #[error("Room not found")]
    NotFound,

    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

pub struct BookmarkService {
    bookmark_repo: Arc<dyn BookmarkRepository>,
    room_repo: Arc<dyn RoomRepository>,
}

impl BookmarkService {
    pub fn new(bookmark_repo: Arc<dyn BookmarkRepository>, room_repo: Arc<dyn RoomRepository>) -> Self {
        Self {
            bookmark_repo,
            room_repo,
        }
    }

    /// Newest bookmarks first
    pub async fn list(
        &self,
        user_id: i64,
        page: Option<u32>,
        page_size: Option<u32>,
    ) -> Result<PagedResult<BookmarkEntry>, BookmarkServiceError> {
        let params = ListParams::with_max(
            page.unwrap_or(1),
            page_size.unwrap_or(DEFAULT_PAGE_SIZE),
            MAX_PAGE_SIZE,
        );
        Ok(self.bookmark_repo.list_by_user(user_id, &params).await?)
    }

    /// All bookmarked rooms as cards
    pub async fn cards(&self, user_id: i64) -> Result<Vec<RoomCard>, BookmarkServiceError> {
        Ok(self.bookmark_repo.cards_by_user(user_id).await?)
    }

    /// Add the bookmark if absent, remove it otherwise.
    ///
    /// Returns whether the room is bookmarked afterwards.
    pub async fn toggle(&self, user_id: i64, room_id: i64) -> Result<bool, BookmarkServiceError> {
        if self.room_repo.get_by_id(room_id).await?.is_none() {
            return Err(BookmarkServiceError::NotFound);
        }
        Ok(self.bookmark_repo.toggle(user_id, room_id).await?)
    }
}
