//! Data models
//!
//! Database entities, service inputs and the small pieces of pure logic
//! that belong to them (labels, rating aggregation, comment threading).

mod bookmark;
mod comment;
mod community;
mod comparison;
mod news;
mod notification;
mod pagination;
mod review;
mod room;
mod session;
mod user;

pub use bookmark::{Bookmark, BookmarkEntry};
pub use comment::{
    build_comment_tree, Comment, CommentWithMeta, CreateCommentInput, LikeStatus,
    ReactionTarget, ReportInput, ReportOutcome, ReportReason, DELETED_COMMENT_TEXT,
};
pub use community::{CommunityCategory, CreatePostInput, Post, PostFilter, PostWithMeta, UpdatePostInput};
pub use comparison::{ComparisonAnalysis, ComparisonReport, Recommendation};
pub use news::{NewNewsArticle, NewsArticle, NewsCategory, NewsFilter, NewsOrdering, NewsSource};
pub use notification::{NewNotification, Notification, NotificationKind};
pub use pagination::{ListParams, PagedResult, MAX_PAGE_SIZE};
pub use review::{CreateReviewInput, RatingAverages, RatingSummary, Review};
pub use room::{
    format_thousands, price_label, RegionCount, Room, RoomCard, RoomImage, RoomImportRecord,
    RoomImportSummary, RoomInput, RoomPatch, RoomSearch, RoomTypeCount,
};
pub use session::Session;
pub use user::{User, UserRole};
