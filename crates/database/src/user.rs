//! User and executor operations.
//!
//! Functions take any SQLite executor so they can run against the pool or
//! inside a caller's transaction.

use chrono::{DateTime, Utc};
use sqlx::{Executor, Sqlite};

use crate::error::{DatabaseError, Result};
use crate::models::{User, UserRole};

const USER_COLUMNS: &str = r#"
    id, name, username, role, status, blocked_until, priority, average_rating,
    review_count, consecutive_declines, supervisor_id, created_at
"#;

/// Create a new user.
pub async fn create_user<'e, E>(executor: E, user: &User) -> Result<()>
where
    E: Executor<'e, Database = Sqlite>,
{
    sqlx::query(
        r#"
        INSERT INTO users (
            id, name, username, role, status, blocked_until, priority, average_rating,
            review_count, consecutive_declines, supervisor_id, created_at
        )
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(user.id)
    .bind(&user.name)
    .bind(&user.username)
    .bind(user.role)
    .bind(user.status)
    .bind(user.blocked_until)
    .bind(user.priority)
    .bind(user.average_rating)
    .bind(user.review_count)
    .bind(user.consecutive_declines)
    .bind(user.supervisor_id)
    .bind(user.created_at)
    .execute(executor)
    .await
    .map_err(|e| DatabaseError::from_insert(e, "User", user.id))?;

    Ok(())
}

/// Get a user by Telegram id.
pub async fn get_user<'e, E>(executor: E, id: i64) -> Result<User>
where
    E: Executor<'e, Database = Sqlite>,
{
    sqlx::query_as::<_, User>(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?"))
        .bind(id)
        .fetch_optional(executor)
        .await?
        .ok_or_else(|| DatabaseError::not_found("User", id))
}

/// List users with a given role, oldest first.
pub async fn list_users_by_role<'e, E>(executor: E, role: UserRole) -> Result<Vec<User>>
where
    E: Executor<'e, Database = Sqlite>,
{
    let users = sqlx::query_as::<_, User>(&format!(
        "SELECT {USER_COLUMNS} FROM users WHERE role = ? ORDER BY id"
    ))
    .bind(role)
    .fetch_all(executor)
    .await?;

    Ok(users)
}

/// List executors eligible for offers: role `executor` and status `active`.
///
/// Rows come back in id order so ranking ties stay stable between calls.
pub async fn list_active_executors<'e, E>(executor: E) -> Result<Vec<User>>
where
    E: Executor<'e, Database = Sqlite>,
{
    let users = sqlx::query_as::<_, User>(&format!(
        r#"
        SELECT {USER_COLUMNS}
        FROM users
        WHERE role = 'executor' AND status = 'active'
        ORDER BY id
        "#
    ))
    .fetch_all(executor)
    .await?;

    Ok(users)
}

/// Increment an executor's consecutive decline counter and return the new value.
pub async fn increment_consecutive_declines<'e, E>(executor: E, id: i64) -> Result<i64>
where
    E: Executor<'e, Database = Sqlite>,
{
    sqlx::query_scalar::<_, i64>(
        r#"
        UPDATE users
        SET consecutive_declines = consecutive_declines + 1
        WHERE id = ?
        RETURNING consecutive_declines
        "#,
    )
    .bind(id)
    .fetch_optional(executor)
    .await?
    .ok_or_else(|| DatabaseError::not_found("User", id))
}

/// Reset the consecutive decline counter to zero.
pub async fn reset_consecutive_declines<'e, E>(executor: E, id: i64) -> Result<()>
where
    E: Executor<'e, Database = Sqlite>,
{
    let result = sqlx::query(
        r#"
        UPDATE users
        SET consecutive_declines = 0
        WHERE id = ?
        "#,
    )
    .bind(id)
    .execute(executor)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DatabaseError::not_found("User", id));
    }

    Ok(())
}

/// Block a user until `until` and reset their decline counter.
pub async fn block_user<'e, E>(executor: E, id: i64, until: DateTime<Utc>) -> Result<()>
where
    E: Executor<'e, Database = Sqlite>,
{
    let result = sqlx::query(
        r#"
        UPDATE users
        SET status = 'blocked', blocked_until = ?, consecutive_declines = 0
        WHERE id = ?
        "#,
    )
    .bind(until)
    .bind(id)
    .execute(executor)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DatabaseError::not_found("User", id));
    }

    Ok(())
}

/// Unblock a user if their block has run out at `now`.
///
/// Returns `true` if the user transitioned back to `active`.
pub async fn release_if_expired<'e, E>(executor: E, id: i64, now: DateTime<Utc>) -> Result<bool>
where
    E: Executor<'e, Database = Sqlite>,
{
    let result = sqlx::query(
        r#"
        UPDATE users
        SET status = 'active', blocked_until = NULL
        WHERE id = ? AND status = 'blocked'
          AND (blocked_until IS NULL OR blocked_until <= ?)
        "#,
    )
    .bind(id)
    .bind(now)
    .execute(executor)
    .await?;

    Ok(result.rows_affected() == 1)
}

/// Unblock every user whose block has run out. Returns the released ids.
pub async fn release_expired_blocks<'e, E>(executor: E, now: DateTime<Utc>) -> Result<Vec<i64>>
where
    E: Executor<'e, Database = Sqlite>,
{
    let ids = sqlx::query_scalar::<_, i64>(
        r#"
        UPDATE users
        SET status = 'active', blocked_until = NULL
        WHERE status = 'blocked' AND blocked_until IS NOT NULL AND blocked_until <= ?
        RETURNING id
        "#,
    )
    .bind(now)
    .fetch_all(executor)
    .await?;

    Ok(ids)
}

/// Lift a block immediately and clear the decline counter (admin override).
pub async fn clear_penalty<'e, E>(executor: E, id: i64) -> Result<()>
where
    E: Executor<'e, Database = Sqlite>,
{
    let result = sqlx::query(
        r#"
        UPDATE users
        SET status = 'active', blocked_until = NULL, consecutive_declines = 0
        WHERE id = ?
        "#,
    )
    .bind(id)
    .execute(executor)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DatabaseError::not_found("User", id));
    }

    Ok(())
}

/// Set an executor's matching priority.
pub async fn set_priority<'e, E>(executor: E, id: i64, priority: i64) -> Result<()>
where
    E: Executor<'e, Database = Sqlite>,
{
    let result = sqlx::query(
        r#"
        UPDATE users
        SET priority = ?
        WHERE id = ?
        "#,
    )
    .bind(priority)
    .bind(id)
    .execute(executor)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DatabaseError::not_found("User", id));
    }

    Ok(())
}

/// Store recomputed rating statistics.
pub async fn update_rating_stats<'e, E>(
    executor: E,
    id: i64,
    average_rating: f64,
    review_count: i64,
) -> Result<()>
where
    E: Executor<'e, Database = Sqlite>,
{
    let result = sqlx::query(
        r#"
        UPDATE users
        SET average_rating = ?, review_count = ?
        WHERE id = ?
        "#,
    )
    .bind(average_rating)
    .bind(review_count)
    .bind(id)
    .execute(executor)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DatabaseError::not_found("User", id));
    }

    Ok(())
}

/// Count users grouped by role.
pub async fn count_users_by_role<'e, E>(executor: E) -> Result<Vec<(UserRole, i64)>>
where
    E: Executor<'e, Database = Sqlite>,
{
    let rows = sqlx::query_as::<_, (UserRole, i64)>(
        r#"
        SELECT role, COUNT(*) as count
        FROM users
        GROUP BY role
        ORDER BY count DESC
        "#,
    )
    .fetch_all(executor)
    .await?;

    Ok(rows)
}
