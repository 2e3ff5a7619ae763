//! User registration and lookup.

use sqlx::SqlitePool;

use crate::error::{DatabaseError, Result};
use crate::models::UserCredit;
use crate::validation::{normalize_email, validate_email};

/// Create a new user with the given starting balance.
pub async fn create_user(pool: &SqlitePool, email: &str, credits: i64) -> Result<UserCredit> {
    validate_email(email)?;
    let email = normalize_email(email);

    sqlx::query(
        r#"
        INSERT INTO users (email, credits)
        VALUES (?, ?)
        "#,
    )
    .bind(&email)
    .bind(credits)
    .execute(pool)
    .await
    .map_err(|e| {
        if let sqlx::Error::Database(ref db_err) = e {
            if db_err.is_unique_violation() {
                return DatabaseError::AlreadyExists {
                    entity: "User",
                    id: email.clone(),
                };
            }
        }
        DatabaseError::Sqlx(e)
    })?;

    Ok(UserCredit { email, credits })
}

/// Register a user on first login, leaving an existing balance untouched.
pub async fn ensure_user(pool: &SqlitePool, email: &str, initial_credits: i64) -> Result<UserCredit> {
    validate_email(email)?;
    let email = normalize_email(email);

    let inserted = sqlx::query(
        r#"
        INSERT INTO users (email, credits)
        VALUES (?, ?)
        ON CONFLICT(email) DO NOTHING
        "#,
    )
    .bind(&email)
    .bind(initial_credits)
    .execute(pool)
    .await?
    .rows_affected();

    if inserted > 0 {
        tracing::info!(email = %email, credits = initial_credits, "Registered new user");
    }

    get_user(pool, &email).await
}

/// Get a user by email.
pub async fn get_user(pool: &SqlitePool, email: &str) -> Result<UserCredit> {
    let email = normalize_email(email);

    sqlx::query_as::<_, UserCredit>(
        r#"
        SELECT email, credits
        FROM users
        WHERE email = ?
        "#,
    )
    .bind(&email)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| DatabaseError::NotFound {
        entity: "User",
        id: email.clone(),
    })
}

/// Delete a user by email.
pub async fn delete_user(pool: &SqlitePool, email: &str) -> Result<()> {
    let email = normalize_email(email);

    let result = sqlx::query(
        r#"
        DELETE FROM users
        WHERE email = ?
        "#,
    )
    .bind(&email)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DatabaseError::NotFound {
            entity: "User",
            id: email,
        });
    }

    Ok(())
}

/// List all users.
pub async fn list_users(pool: &SqlitePool) -> Result<Vec<UserCredit>> {
    let users = sqlx::query_as::<_, UserCredit>(
        r#"
        SELECT email, credits
        FROM users
        ORDER BY email
        "#,
    )
    .fetch_all(pool)
    .await?;

    Ok(users)
}
