//! Credit balance mutations.
//!
//! The grant and the debit race each other (mail task vs. request tasks), so
//! both are single conditional statements instead of read-then-write pairs.
//! SQLite serializes writers, which makes each statement atomic on its own.

use sqlx::SqlitePool;

use crate::error::{DatabaseError, Result};
use crate::models::{DebitOutcome, GrantOutcome, RefundOutcome};
use crate::validation::normalize_email;

/// Reset an exhausted balance to `quantity`.
///
/// Only a balance of exactly 0 is reset. A non-zero balance is left alone,
/// which makes a replayed or duplicated trigger a no-op.
pub async fn grant_if_exhausted(
    pool: &SqlitePool,
    email: &str,
    quantity: i64,
) -> Result<GrantOutcome> {
    let email = normalize_email(email);

    let granted = sqlx::query_scalar::<_, i64>(
        r#"
        UPDATE users
        SET credits = ?, recharges = recharges + 1, updated_at = datetime('now')
        WHERE email = ? AND credits = 0
        RETURNING credits
        "#,
    )
    .bind(quantity)
    .bind(&email)
    .fetch_optional(pool)
    .await?;

    if let Some(credits) = granted {
        return Ok(GrantOutcome::Granted { credits });
    }

    match current_credits(pool, &email).await? {
        Some(credits) => Ok(GrantOutcome::AlreadyFunded { credits }),
        None => Ok(GrantOutcome::UnknownUser),
    }
}

/// Take one credit if the balance allows it.
pub async fn debit_credit(pool: &SqlitePool, email: &str) -> Result<DebitOutcome> {
    let email = normalize_email(email);

    let debited = sqlx::query_as::<_, (i64, i64)>(
        r#"
        UPDATE users
        SET credits = credits - 1, updated_at = datetime('now')
        WHERE email = ? AND credits > 0
        RETURNING credits, recharges
        "#,
    )
    .bind(&email)
    .fetch_optional(pool)
    .await?;

    if let Some((remaining, recharges)) = debited {
        return Ok(DebitOutcome::Debited {
            remaining,
            recharges,
        });
    }

    match current_credits(pool, &email).await? {
        Some(_) => Ok(DebitOutcome::Exhausted),
        None => Ok(DebitOutcome::UnknownUser),
    }
}

/// Give back a credit taken by [`debit_credit`] for a query that failed.
///
/// `recharges` is the count [`debit_credit`] reported. If a grant landed
/// since then the balance was already reset, and the credit is not added
/// on top of it.
pub async fn refund_credit(
    pool: &SqlitePool,
    email: &str,
    recharges: i64,
) -> Result<RefundOutcome> {
    let email = normalize_email(email);

    let refunded = sqlx::query_scalar::<_, i64>(
        r#"
        UPDATE users
        SET credits = credits + 1, updated_at = datetime('now')
        WHERE email = ? AND recharges = ?
        RETURNING credits
        "#,
    )
    .bind(&email)
    .bind(recharges)
    .fetch_optional(pool)
    .await?;

    if let Some(credits) = refunded {
        return Ok(RefundOutcome::Refunded { credits });
    }

    match current_credits(pool, &email).await? {
        Some(credits) => Ok(RefundOutcome::Superseded { credits }),
        None => Err(DatabaseError::NotFound {
            entity: "User",
            id: email,
        }),
    }
}

/// Overwrite a balance.
pub async fn set_credits(pool: &SqlitePool, email: &str, credits: i64) -> Result<()> {
    let email = normalize_email(email);

    let result = sqlx::query(
        r#"
        UPDATE users
        SET credits = ?, updated_at = datetime('now')
        WHERE email = ?
        "#,
    )
    .bind(credits)
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

/// Current balance, or `None` if the user does not exist.
pub async fn current_credits(pool: &SqlitePool, email: &str) -> Result<Option<i64>> {
    let credits = sqlx::query_scalar::<_, i64>(
        r#"
        SELECT credits FROM users WHERE email = ?
        "#,
    )
    .bind(normalize_email(email))
    .fetch_optional(pool)
    .await?;

    Ok(credits)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{user, Database};

    async fn test_db() -> Database {
        let db = Database::connect("sqlite::memory:").await.unwrap();
        db.migrate().await.unwrap();
        db
    }

    #[tokio::test]
    async fn test_grant_resets_exhausted_balance_once() {
        let db = test_db().await;
        user::create_user(db.pool(), "a@x.com", 0).await.unwrap();

        let first = grant_if_exhausted(db.pool(), "a@x.com", 5).await.unwrap();
        assert_eq!(first, GrantOutcome::Granted { credits: 5 });

        // A second trigger must not stack credits
        let second = grant_if_exhausted(db.pool(), "a@x.com", 5).await.unwrap();
        assert_eq!(second, GrantOutcome::AlreadyFunded { credits: 5 });

        assert_eq!(current_credits(db.pool(), "a@x.com").await.unwrap(), Some(5));
    }

    #[tokio::test]
    async fn test_grant_never_touches_funded_balance() {
        let db = test_db().await;
        for credits in [1, 3, 5, 42] {
            let email = format!("user{}@x.com", credits);
            user::create_user(db.pool(), &email, credits).await.unwrap();

            let outcome = grant_if_exhausted(db.pool(), &email, 5).await.unwrap();
            assert_eq!(outcome, GrantOutcome::AlreadyFunded { credits });
            assert_eq!(current_credits(db.pool(), &email).await.unwrap(), Some(credits));
        }
    }

    #[tokio::test]
    async fn test_grant_unknown_user() {
        let db = test_db().await;
        let outcome = grant_if_exhausted(db.pool(), "ghost@x.com", 5).await.unwrap();
        assert_eq!(outcome, GrantOutcome::UnknownUser);
        assert!(user::list_users(db.pool()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_grant_matches_case_insensitively() {
        let db = test_db().await;
        user::create_user(db.pool(), "alice@example.com", 0).await.unwrap();

        let outcome = grant_if_exhausted(db.pool(), "Alice@Example.com", 5).await.unwrap();
        assert_eq!(outcome, GrantOutcome::Granted { credits: 5 });
    }

    #[tokio::test]
    async fn test_debit_stops_at_zero() {
        let db = test_db().await;
        user::create_user(db.pool(), "b@x.com", 2).await.unwrap();

        assert_eq!(
            debit_credit(db.pool(), "b@x.com").await.unwrap(),
            DebitOutcome::Debited {
                remaining: 1,
                recharges: 0
            }
        );
        assert_eq!(
            debit_credit(db.pool(), "b@x.com").await.unwrap(),
            DebitOutcome::Debited {
                remaining: 0,
                recharges: 0
            }
        );
        assert_eq!(
            debit_credit(db.pool(), "b@x.com").await.unwrap(),
            DebitOutcome::Exhausted
        );
        assert_eq!(current_credits(db.pool(), "b@x.com").await.unwrap(), Some(0));

        assert_eq!(
            debit_credit(db.pool(), "nobody@x.com").await.unwrap(),
            DebitOutcome::UnknownUser
        );
    }

    #[tokio::test]
    async fn test_refund_restores_credit() {
        let db = test_db().await;
        user::create_user(db.pool(), "c@x.com", 1).await.unwrap();

        debit_credit(db.pool(), "c@x.com").await.unwrap();
        assert_eq!(
            refund_credit(db.pool(), "c@x.com", 0).await.unwrap(),
            RefundOutcome::Refunded { credits: 1 }
        );

        assert!(matches!(
            refund_credit(db.pool(), "nobody@x.com", 0).await,
            Err(DatabaseError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_refund_does_not_stack_on_a_grant() {
        let db = test_db().await;
        user::create_user(db.pool(), "d@x.com", 1).await.unwrap();

        debit_credit(db.pool(), "d@x.com").await.unwrap();
        grant_if_exhausted(db.pool(), "d@x.com", 5).await.unwrap();

        assert_eq!(
            refund_credit(db.pool(), "d@x.com", 0).await.unwrap(),
            RefundOutcome::Superseded { credits: 5 }
        );
        assert_eq!(current_credits(db.pool(), "d@x.com").await.unwrap(), Some(5));
    }

    #[tokio::test]
    async fn test_overlapping_refunds_each_return_their_credit() {
        let db = test_db().await;
        user::create_user(db.pool(), "e@x.com", 5).await.unwrap();

        debit_credit(db.pool(), "e@x.com").await.unwrap();
        debit_credit(db.pool(), "e@x.com").await.unwrap();

        // Refunds land in the opposite order of the debits
        for _ in 0..2 {
            assert!(matches!(
                refund_credit(db.pool(), "e@x.com", 0).await.unwrap(),
                RefundOutcome::Refunded { .. }
            ));
        }
        assert_eq!(current_credits(db.pool(), "e@x.com").await.unwrap(), Some(5));
    }

    #[tokio::test]
    async fn test_concurrent_grants_and_debits_stay_in_range() {
        // Shared-cache in-memory databases report table locks instead of
        // waiting, so the writers share one connection here.
        let db = Database::connect_with_pool_size("sqlite::memory:", 1)
            .await
            .unwrap();
        db.migrate().await.unwrap();
        user::create_user(db.pool(), "race@x.com", 0).await.unwrap();

        let mut handles = Vec::new();
        for i in 0..20 {
            let pool = db.pool().clone();
            handles.push(tokio::spawn(async move {
                if i % 2 == 0 {
                    grant_if_exhausted(&pool, "race@x.com", 5).await.map(|_| ())
                } else {
                    debit_credit(&pool, "race@x.com").await.map(|_| ())
                }
            }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        let credits = current_credits(db.pool(), "race@x.com").await.unwrap().unwrap();
        assert!((0..=5).contains(&credits), "credits out of range: {}", credits);
    }
}
