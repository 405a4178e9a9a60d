//! Database layer
//!
//! SQLite through `sqlx`. Repositories hold a cloned [`SqlitePool`] and
//! expose their operations behind `async_trait` traits so services can be
//! tested against the in-memory pool.
//!
//! ```ignore
//! let pool = create_pool(&config.database).await?;
//! migrations::run_migrations(&pool).await?;
//! let rooms = SqlxRoomRepository::boxed(pool.clone());
//! ```

pub mod migrations;
pub mod pool;
pub mod repositories;

pub use pool::{create_pool, create_test_pool, ping};
pub use sqlx::SqlitePool;

/// True when `err` wraps a unique-constraint violation from the database
pub fn is_unique_violation(err: &anyhow::Error) -> bool {
    err.chain().any(|cause| {
        cause
            .downcast_ref::<sqlx::Error>()
            .and_then(|e| e.as_database_error())
            .is_some_and(|e| e.is_unique_violation())
    })
}
