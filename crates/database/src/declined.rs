//! Append-only decline records.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use sqlx::{Executor, Sqlite};

use crate::models::DeclinedOrder;
use crate::Result;

/// Record that an executor must not be offered an order again.
///
/// Returns `false` if the record already existed.
pub async fn record_decline<'e, E>(
    executor: E,
    order_id: i64,
    executor_id: i64,
    now: DateTime<Utc>,
) -> Result<bool>
where
    E: Executor<'e, Database = Sqlite>,
{
    let result = sqlx::query(
        r#"
        INSERT OR IGNORE INTO declined_orders (order_id, executor_id, created_at)
        VALUES (?, ?, ?)
        "#,
    )
    .bind(order_id)
    .bind(executor_id)
    .bind(now)
    .execute(executor)
    .await?;

    Ok(result.rows_affected() == 1)
}

/// Ids of executors who declined an order.
pub async fn declined_executor_ids<'e, E>(executor: E, order_id: i64) -> Result<HashSet<i64>>
where
    E: Executor<'e, Database = Sqlite>,
{
    let ids = sqlx::query_scalar::<_, i64>(
        r#"
        SELECT executor_id FROM declined_orders WHERE order_id = ?
        "#,
    )
    .bind(order_id)
    .fetch_all(executor)
    .await?;

    Ok(ids.into_iter().collect())
}

/// Check whether an executor declined an order.
pub async fn has_declined<'e, E>(executor: E, order_id: i64, executor_id: i64) -> Result<bool>
where
    E: Executor<'e, Database = Sqlite>,
{
    let result = sqlx::query_scalar::<_, i32>(
        r#"
        SELECT 1
        FROM declined_orders
        WHERE order_id = ? AND executor_id = ?
        "#,
    )
    .bind(order_id)
    .bind(executor_id)
    .fetch_optional(executor)
    .await?;

    Ok(result.is_some())
}

/// All decline records for an order.
pub async fn list_declines<'e, E>(executor: E, order_id: i64) -> Result<Vec<DeclinedOrder>>
where
    E: Executor<'e, Database = Sqlite>,
{
    let rows = sqlx::query_as::<_, DeclinedOrder>(
        r#"
        SELECT order_id, executor_id, created_at
        FROM declined_orders
        WHERE order_id = ?
        ORDER BY created_at
        "#,
    )
    .bind(order_id)
    .fetch_all(executor)
    .await?;

    Ok(rows)
}
