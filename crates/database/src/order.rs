//! Order operations.
//!
//! Status changes are conditional updates on the expected current status;
//! they return `false` instead of overwriting a concurrent change.

use chrono::{DateTime, Utc};
use sqlx::{Executor, Sqlite};

use crate::error::{DatabaseError, Result};
use crate::models::{NewOrder, Order, OrderStatus, OrderTerms};
use crate::validation::{validate_new_order, validate_terms};

const ORDER_COLUMNS: &str = r#"
    id, client_tg_id, executor_tg_id, status, selected_date, selected_time, address_text,
    total_price, executor_payment, rating, reminder_24h_sent, reminder_2h_sent, created_at
"#;

/// Which reminder flag to set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reminder {
    DayBefore,
    TwoHoursBefore,
}

impl Reminder {
    fn column_name(&self) -> &'static str {
        match self {
            Reminder::DayBefore => "reminder_24h_sent",
            Reminder::TwoHoursBefore => "reminder_2h_sent",
        }
    }
}

/// Insert a new order in status `new` and return its id.
pub async fn create_order<'e, E>(
    executor: E,
    order: &NewOrder,
    created_at: DateTime<Utc>,
) -> Result<i64>
where
    E: Executor<'e, Database = Sqlite>,
{
    validate_new_order(order)?;

    let id = sqlx::query_scalar::<_, i64>(
        r#"
        INSERT INTO orders (client_tg_id, status, selected_date, selected_time, address_text,
                            total_price, created_at)
        VALUES (?, 'new', ?, ?, ?, ?, ?)
        RETURNING id
        "#,
    )
    .bind(order.client_tg_id)
    .bind(&order.selected_date)
    .bind(&order.selected_time)
    .bind(&order.address_text)
    .bind(order.total_price)
    .bind(created_at)
    .fetch_one(executor)
    .await?;

    Ok(id)
}

/// Get an order by id.
pub async fn get_order<'e, E>(executor: E, id: i64) -> Result<Order>
where
    E: Executor<'e, Database = Sqlite>,
{
    sqlx::query_as::<_, Order>(&format!("SELECT {ORDER_COLUMNS} FROM orders WHERE id = ?"))
        .bind(id)
        .fetch_optional(executor)
        .await?
        .ok_or_else(|| DatabaseError::not_found("Order", id))
}

/// List orders in a status, oldest first.
pub async fn list_orders_by_status<'e, E>(executor: E, status: OrderStatus) -> Result<Vec<Order>>
where
    E: Executor<'e, Database = Sqlite>,
{
    let orders = sqlx::query_as::<_, Order>(&format!(
        "SELECT {ORDER_COLUMNS} FROM orders WHERE status = ? ORDER BY id"
    ))
    .bind(status)
    .fetch_all(executor)
    .await?;

    Ok(orders)
}

/// List orders assigned to an executor, most recent first.
pub async fn list_executor_orders<'e, E>(executor: E, executor_id: i64) -> Result<Vec<Order>>
where
    E: Executor<'e, Database = Sqlite>,
{
    let orders = sqlx::query_as::<_, Order>(&format!(
        "SELECT {ORDER_COLUMNS} FROM orders WHERE executor_tg_id = ? ORDER BY id DESC"
    ))
    .bind(executor_id)
    .fetch_all(executor)
    .await?;

    Ok(orders)
}

/// Orders an executor may pick from the new-orders list.
///
/// Excludes orders the executor declined and orders currently offered to
/// someone else.
pub async fn list_available_for_executor<'e, E>(
    executor: E,
    executor_id: i64,
) -> Result<Vec<Order>>
where
    E: Executor<'e, Database = Sqlite>,
{
    let orders = sqlx::query_as::<_, Order>(&format!(
        r#"
        SELECT {ORDER_COLUMNS}
        FROM orders o
        WHERE o.status = 'new'
          AND NOT EXISTS (
              SELECT 1 FROM declined_orders d
              WHERE d.order_id = o.id AND d.executor_id = ?
          )
          AND NOT EXISTS (
              SELECT 1 FROM order_offers f
              WHERE f.order_id = o.id AND f.status = 'active' AND f.executor_id <> ?
          )
        ORDER BY o.selected_date, o.id
        "#
    ))
    .bind(executor_id)
    .bind(executor_id)
    .fetch_all(executor)
    .await?;

    Ok(orders)
}

/// Move an order from `from` to `to`. Returns `false` if it was not in `from`.
pub async fn transition_status<'e, E>(
    executor: E,
    id: i64,
    from: OrderStatus,
    to: OrderStatus,
) -> Result<bool>
where
    E: Executor<'e, Database = Sqlite>,
{
    let result = sqlx::query(
        r#"
        UPDATE orders
        SET status = ?
        WHERE id = ? AND status = ?
        "#,
    )
    .bind(to)
    .bind(id)
    .bind(from)
    .execute(executor)
    .await?;

    Ok(result.rows_affected() == 1)
}

/// Assign an executor to a `new`, unassigned order and mark it `accepted`.
pub async fn assign_executor<'e, E>(
    executor: E,
    id: i64,
    executor_id: i64,
    executor_payment: f64,
) -> Result<bool>
where
    E: Executor<'e, Database = Sqlite>,
{
    let result = sqlx::query(
        r#"
        UPDATE orders
        SET status = 'accepted', executor_tg_id = ?, executor_payment = ?
        WHERE id = ? AND status = 'new' AND executor_tg_id IS NULL
        "#,
    )
    .bind(executor_id)
    .bind(executor_payment)
    .bind(id)
    .execute(executor)
    .await?;

    Ok(result.rows_affected() == 1)
}

/// Detach the assigned executor and return the order to `new`.
pub async fn release_executor<'e, E>(executor: E, id: i64, from: OrderStatus) -> Result<bool>
where
    E: Executor<'e, Database = Sqlite>,
{
    let result = sqlx::query(
        r#"
        UPDATE orders
        SET status = 'new', executor_tg_id = NULL, executor_payment = NULL
        WHERE id = ? AND status = ?
        "#,
    )
    .bind(id)
    .bind(from)
    .execute(executor)
    .await?;

    Ok(result.rows_affected() == 1)
}

/// Replace date, time, address and price, moving the order from `from` to `to`.
pub async fn update_terms<'e, E>(
    executor: E,
    id: i64,
    from: OrderStatus,
    to: OrderStatus,
    terms: &OrderTerms,
    executor_payment: Option<f64>,
) -> Result<bool>
where
    E: Executor<'e, Database = Sqlite>,
{
    validate_terms(terms)?;

    let result = sqlx::query(
        r#"
        UPDATE orders
        SET status = ?, selected_date = ?, selected_time = ?, address_text = ?,
            total_price = ?, executor_payment = ?
        WHERE id = ? AND status = ?
        "#,
    )
    .bind(to)
    .bind(&terms.selected_date)
    .bind(&terms.selected_time)
    .bind(&terms.address_text)
    .bind(terms.total_price)
    .bind(executor_payment)
    .bind(id)
    .bind(from)
    .execute(executor)
    .await?;

    Ok(result.rows_affected() == 1)
}

/// Record a client rating on a completed, not yet rated order.
pub async fn set_rating<'e, E>(executor: E, id: i64, rating: i64) -> Result<bool>
where
    E: Executor<'e, Database = Sqlite>,
{
    crate::validation::validate_rating(rating)?;

    let result = sqlx::query(
        r#"
        UPDATE orders
        SET rating = ?
        WHERE id = ? AND status = 'completed' AND rating IS NULL
        "#,
    )
    .bind(rating)
    .bind(id)
    .execute(executor)
    .await?;

    Ok(result.rows_affected() == 1)
}

/// Average rating and review count over an executor's completed, rated orders.
pub async fn executor_rating_stats<'e, E>(executor: E, executor_id: i64) -> Result<(f64, i64)>
where
    E: Executor<'e, Database = Sqlite>,
{
    let stats = sqlx::query_as::<_, (f64, i64)>(
        r#"
        SELECT CAST(COALESCE(AVG(rating), 0.0) AS REAL), COUNT(rating)
        FROM orders
        WHERE executor_tg_id = ? AND status = 'completed' AND rating IS NOT NULL
        "#,
    )
    .bind(executor_id)
    .fetch_one(executor)
    .await?;

    Ok(stats)
}

/// Orders that may still need a reminder.
pub async fn list_reminder_candidates<'e, E>(executor: E) -> Result<Vec<Order>>
where
    E: Executor<'e, Database = Sqlite>,
{
    let orders = sqlx::query_as::<_, Order>(&format!(
        r#"
        SELECT {ORDER_COLUMNS}
        FROM orders
        WHERE status IN ('new', 'accepted')
          AND (reminder_24h_sent = 0 OR reminder_2h_sent = 0)
        ORDER BY id
        "#
    ))
    .fetch_all(executor)
    .await?;

    Ok(orders)
}

/// Mark a reminder as sent.
pub async fn mark_reminder_sent<'e, E>(executor: E, id: i64, reminder: Reminder) -> Result<()>
where
    E: Executor<'e, Database = Sqlite>,
{
    // Column name comes from the Reminder enum, never from input.
    let query = format!(
        "UPDATE orders SET {} = 1 WHERE id = ?",
        reminder.column_name()
    );

    let result = sqlx::query(&query).bind(id).execute(executor).await?;

    if result.rows_affected() == 0 {
        return Err(DatabaseError::not_found("Order", id));
    }

    Ok(())
}

/// Count orders grouped by status.
pub async fn count_orders_by_status<'e, E>(executor: E) -> Result<Vec<(OrderStatus, i64)>>
where
    E: Executor<'e, Database = Sqlite>,
{
    let rows = sqlx::query_as::<_, (OrderStatus, i64)>(
        r#"
        SELECT status, COUNT(*) as count
        FROM orders
        GROUP BY status
        ORDER BY count DESC
        "#,
    )
    .fetch_all(executor)
    .await?;

    Ok(rows)
}
