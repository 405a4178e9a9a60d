//! Database repositories
//!
//! Repository pattern implementations for database access.
//! Each repository handles the queries for one aggregate.

pub mod bookmark;
pub mod comment;
pub mod comparison;
pub mod news;
pub mod notification;
pub mod post;
pub(crate) mod reaction;
pub mod review;
pub mod room;
pub mod session;
pub mod user;

pub use bookmark::{BookmarkRepository, SqlxBookmarkRepository};
pub use comment::{CommentRepository, SqlxCommentRepository};
pub use comparison::{ComparisonRepository, SqlxComparisonRepository};
pub use news::{NewsRepository, SqlxNewsRepository};
pub use notification::{NotificationRepository, SqlxNotificationRepository};
pub use post::{PostRepository, SqlxPostRepository};
pub use review::{ReviewRepository, SqlxReviewRepository};
pub use room::{RoomRepository, SqlxRoomRepository};
pub use session::{SessionRepository, SqlxSessionRepository};
pub use user::{SqlxUserRepository, UserRepository};

/// `%term%` pattern for `LIKE ? ESCAPE '\'` with `\`, `%` and `_` matched literally
pub(crate) fn like_pattern(term: &str) -> String {
    let mut pattern = String::with_capacity(term.len() + 2);
    pattern.push('%');
    for ch in term.chars() {
        if matches!(ch, '\\' | '%' | '_') {
            pattern.push('\\');
        }
        pattern.push(ch);
    }
    pattern.push('%');
    pattern
}


#[cfg(test)]
pub(crate) mod test_support {
    use crate::db::{create_test_pool, migrations};
    use chrono::Utc;
    use sqlx::SqlitePool;

    pub async fn setup_pool() -> SqlitePool {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");
        pool
    }

    pub async fn insert_user(pool: &SqlitePool, username: &str) -> i64 {
        let now = Utc::now();
        sqlx::query(
            "INSERT INTO users (username, email, password_hash, role, created_at, updated_at) VALUES (?, ?, 'hash', 'member', ?, ?)",
        )
        .bind(username)
        .bind(format!("{}@example.com", username))
        .bind(now)
        .bind(now)
        .execute(pool)
        .await
        .expect("Failed to insert test user")
        .last_insert_rowid()
    }

    pub async fn insert_room(pool: &SqlitePool, title: &str) -> i64 {
        let now = Utc::now();
        sqlx::query("INSERT INTO rooms (title, deposit, monthly_fee, created_at, updated_at) VALUES (?, 1000, 50, ?, ?)")
            .bind(title)
            .bind(now)
            .bind(now)
            .execute(pool)
            .await
            .expect("Failed to insert test room")
            .last_insert_rowid()
    }

    pub async fn insert_post(pool: &SqlitePool, user_id: i64, title: &str) -> i64 {
        let now = Utc::now();
        sqlx::query(
            "INSERT INTO community_posts (user_id, category_id, title, content, created_at, updated_at) VALUES (?, 1, ?, 'body', ?, ?)",
        )
        .bind(user_id)
        .bind(title)
        .bind(now)
        .bind(now)
        .execute(pool)
        .await
        .expect("Failed to insert test post")
        .last_insert_rowid()
    }
}
