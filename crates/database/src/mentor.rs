//! The mentor data set queries are classified against.

use sqlx::SqlitePool;

use crate::models::Mentor;
use crate::Result;

/// Add a mentor.
pub async fn insert_mentor(
    pool: &SqlitePool,
    name: &str,
    expertise: &str,
    bio: &str,
) -> Result<i64> {
    let id = sqlx::query_scalar::<_, i64>(
        r#"
        INSERT INTO mentors (name, expertise, bio)
        VALUES (?, ?, ?)
        RETURNING id
        "#,
    )
    .bind(name)
    .bind(expertise)
    .bind(bio)
    .fetch_one(pool)
    .await?;

    Ok(id)
}

/// List every mentor.
pub async fn list_mentors(pool: &SqlitePool) -> Result<Vec<Mentor>> {
    let mentors = sqlx::query_as::<_, Mentor>(
        r#"
        SELECT id, name, expertise, bio
        FROM mentors
        ORDER BY id
        "#,
    )
    .fetch_all(pool)
    .await?;

    Ok(mentors)
}
