//! Services layer - Business logic
//!
//! Services sit between the HTTP handlers and the repositories. They:
//! - validate input and enforce ownership rules
//! - coordinate several repositories for one operation
//! - translate missing rows into typed `NotFound` errors

pub mod ai_client;
pub mod bookmark;
pub mod community;
pub mod comparison;
pub mod news;
pub mod notification;
pub mod password;
pub mod rate_limiter;
pub mod review;
pub mod room;
pub mod room_import;
pub mod user;

pub use ai_client::{ChatCompletion, ChatMessage, OpenAiChatClient};
pub use bookmark::{BookmarkService, BookmarkServiceError};
pub use community::{CommunityService, CommunityServiceError};
pub use comparison::{CompareInput, ComparisonService, ComparisonServiceError};
pub use news::{categorize_article, NewsService};
pub use notification::NotificationService;
pub use password::{hash_password, verify_password};
pub use rate_limiter::LoginRateLimiter;
pub use review::{ReviewService, ReviewServiceError};
pub use room::{RoomService, RoomServiceError};
pub use room_import::ImportError;
pub use user::{LoginInput, SignupInput, UserService, UserServiceError};
