//! SQLite credit store for the credit-gated query service.
//!
//! This crate provides async database operations for user credit balances and
//! the mentor data set using SQLx with SQLite.
//!
//! # Example
//!
//! ```no_run
//! use database::{credit, user, Database, GrantOutcome};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Connect and run migrations
//!     let db = Database::connect("sqlite:credit_gate.db?mode=rwc").await?;
//!     db.migrate().await?;
//!
//!     user::ensure_user(db.pool(), "a@x.com", 5).await?;
//!     let outcome = credit::grant_if_exhausted(db.pool(), "a@x.com", 5).await?;
//!     assert!(matches!(outcome, GrantOutcome::AlreadyFunded { .. }));
//!
//!     Ok(())
//! }
//! ```

pub mod credit;
pub mod error;
pub mod mentor;
pub mod models;
pub mod user;
pub mod validation;

pub use error::{DatabaseError, Result};
pub use models::{DebitOutcome, GrantOutcome, Mentor, RefundOutcome, UserCredit};
pub use validation::ValidationError;

use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::str::FromStr;

/// Database connection wrapper.
#[derive(Debug, Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Default pool size for database connections.
    /// One connection serves the recharge task, the rest serve requests.
    const DEFAULT_POOL_SIZE: u32 = 10;

    /// Connect to a SQLite database.
    ///
    /// The URL should be in the format `sqlite:path/to/db.sqlite?mode=rwc`.
    /// Use `?mode=rwc` to create the database file if it doesn't exist.
    ///
    /// # Example
    ///
    /// ```no_run
    /// # async fn example() -> database::Result<()> {
    /// // File database
    /// let db = database::Database::connect("sqlite:data/credit_gate.db?mode=rwc").await?;
    ///
    /// // In-memory database (for testing)
    /// let db = database::Database::connect("sqlite::memory:").await?;
    /// # Ok(())
    /// # }
    /// ```
    pub async fn connect(url: &str) -> Result<Self> {
        Self::connect_with_pool_size(url, Self::DEFAULT_POOL_SIZE).await
    }

    /// Connect to a SQLite database with a custom pool size.
    pub async fn connect_with_pool_size(url: &str, pool_size: u32) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(url)?
            .create_if_missing(true)
            .foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(pool_size)
            .acquire_timeout(std::time::Duration::from_secs(30))
            .connect_with(options)
            .await?;

        tracing::info!(
            "Connected to database: {} (pool size: {})",
            url,
            pool_size
        );

        Ok(Self { pool })
    }

    /// Run database migrations.
    ///
    /// This should be called once after connecting to ensure the schema is up to date.
    pub async fn migrate(&self) -> Result<()> {
        tracing::info!("Running database migrations...");

        sqlx::migrate!("./migrations").run(&self.pool).await?;

        tracing::info!("Migrations complete");
        Ok(())
    }

    /// Get a reference to the connection pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Close the database connection pool.
    pub async fn close(&self) {
        self.pool.close().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn test_db() -> Database {
        let db = Database::connect("sqlite::memory:").await.unwrap();
        db.migrate().await.unwrap();
        db
    }

    #[tokio::test]
    async fn test_user_lifecycle() {
        let db = test_db().await;

        // Create
        let created = user::create_user(db.pool(), "Alice@X.com", 5).await.unwrap();
        assert_eq!(created.email, "alice@x.com");

        // Duplicate
        let dup = user::create_user(db.pool(), "alice@x.com", 5).await;
        assert!(matches!(dup, Err(DatabaseError::AlreadyExists { .. })));

        // ensure_user keeps the existing balance
        credit::set_credits(db.pool(), "alice@x.com", 2).await.unwrap();
        let ensured = user::ensure_user(db.pool(), "alice@x.com", 5).await.unwrap();
        assert_eq!(ensured.credits, 2);

        // ensure_user registers a new address
        let fresh = user::ensure_user(db.pool(), "bob@x.com", 5).await.unwrap();
        assert_eq!(fresh.credits, 5);

        // List
        let users = user::list_users(db.pool()).await.unwrap();
        assert_eq!(users.len(), 2);

        // Delete
        user::delete_user(db.pool(), "alice@x.com").await.unwrap();
        let result = user::get_user(db.pool(), "alice@x.com").await;
        assert!(matches!(result, Err(DatabaseError::NotFound { .. })));
    }

    #[tokio::test]
    async fn test_invalid_email_rejected() {
        let db = test_db().await;
        let result = user::create_user(db.pool(), "not-an-email", 5).await;
        assert!(matches!(result, Err(DatabaseError::Validation(_))));
    }

    #[tokio::test]
    async fn test_credits_cannot_go_negative() {
        let db = test_db().await;
        user::create_user(db.pool(), "a@x.com", 0).await.unwrap();
        let result = credit::set_credits(db.pool(), "a@x.com", -1).await;
        assert!(matches!(result, Err(DatabaseError::Sqlx(_))));
    }

    #[tokio::test]
    async fn test_mentors() {
        let db = test_db().await;
        mentor::insert_mentor(db.pool(), "Ada", "fintech", "Angel investor")
            .await
            .unwrap();
        mentor::insert_mentor(db.pool(), "Grace", "climate", "")
            .await
            .unwrap();

        let mentors = mentor::list_mentors(db.pool()).await.unwrap();
        assert_eq!(mentors.len(), 2);
        assert_eq!(mentors[0].name, "Ada");
        assert_eq!(mentors[1].expertise, "climate");
    }
}
