//! Order offer operations.

use chrono::{DateTime, Utc};
use sqlx::{Executor, Sqlite};

use crate::error::{DatabaseError, Result};
use crate::models::{OfferStatus, OrderOffer};

const OFFER_COLUMNS: &str =
    "id, order_id, executor_id, expires_at, status, created_at, resolved_at";

/// Insert an `active` offer.
///
/// Fails with [`DatabaseError::AlreadyExists`] if the order already has an
/// active offer.
pub async fn create_offer<'e, E>(
    executor: E,
    order_id: i64,
    executor_id: i64,
    expires_at: DateTime<Utc>,
    now: DateTime<Utc>,
) -> Result<OrderOffer>
where
    E: Executor<'e, Database = Sqlite>,
{
    sqlx::query_as::<_, OrderOffer>(&format!(
        r#"
        INSERT INTO order_offers (order_id, executor_id, expires_at, status, created_at)
        VALUES (?, ?, ?, 'active', ?)
        RETURNING {OFFER_COLUMNS}
        "#
    ))
    .bind(order_id)
    .bind(executor_id)
    .bind(expires_at)
    .bind(now)
    .fetch_one(executor)
    .await
    .map_err(|e| DatabaseError::from_insert(e, "Active offer for order", order_id))
}

/// Get an offer by id.
pub async fn get_offer<'e, E>(executor: E, id: i64) -> Result<OrderOffer>
where
    E: Executor<'e, Database = Sqlite>,
{
    sqlx::query_as::<_, OrderOffer>(&format!(
        "SELECT {OFFER_COLUMNS} FROM order_offers WHERE id = ?"
    ))
    .bind(id)
    .fetch_optional(executor)
    .await?
    .ok_or_else(|| DatabaseError::not_found("Offer", id))
}

/// Get the active offer for an order, if any.
pub async fn get_active_offer<'e, E>(executor: E, order_id: i64) -> Result<Option<OrderOffer>>
where
    E: Executor<'e, Database = Sqlite>,
{
    let offer = sqlx::query_as::<_, OrderOffer>(&format!(
        "SELECT {OFFER_COLUMNS} FROM order_offers WHERE order_id = ? AND status = 'active'"
    ))
    .bind(order_id)
    .fetch_optional(executor)
    .await?;

    Ok(offer)
}

/// Close an offer if it is still active.
///
/// Returns `true` only for the caller that performed the transition, so
/// concurrent resolutions of the same offer resolve it exactly once.
pub async fn resolve_offer<'e, E>(
    executor: E,
    id: i64,
    status: OfferStatus,
    now: DateTime<Utc>,
) -> Result<bool>
where
    E: Executor<'e, Database = Sqlite>,
{
    let result = sqlx::query(
        r#"
        UPDATE order_offers
        SET status = ?, resolved_at = ?
        WHERE id = ? AND status = 'active'
        "#,
    )
    .bind(status)
    .bind(now)
    .bind(id)
    .execute(executor)
    .await?;

    Ok(result.rows_affected() == 1)
}

/// Active offers whose deadline has passed at `now`, oldest deadline first.
pub async fn list_expired_offers<'e, E>(executor: E, now: DateTime<Utc>) -> Result<Vec<OrderOffer>>
where
    E: Executor<'e, Database = Sqlite>,
{
    let offers = sqlx::query_as::<_, OrderOffer>(&format!(
        r#"
        SELECT {OFFER_COLUMNS}
        FROM order_offers
        WHERE status = 'active' AND expires_at <= ?
        ORDER BY expires_at, id
        "#
    ))
    .bind(now)
    .fetch_all(executor)
    .await?;

    Ok(offers)
}

/// All offers made for an order, in creation order.
pub async fn list_offers_for_order<'e, E>(executor: E, order_id: i64) -> Result<Vec<OrderOffer>>
where
    E: Executor<'e, Database = Sqlite>,
{
    let offers = sqlx::query_as::<_, OrderOffer>(&format!(
        "SELECT {OFFER_COLUMNS} FROM order_offers WHERE order_id = ? ORDER BY id"
    ))
    .bind(order_id)
    .fetch_all(executor)
    .await?;

    Ok(offers)
}

/// Count active offers across all orders.
pub async fn count_active_offers<'e, E>(executor: E) -> Result<i64>
where
    E: Executor<'e, Database = Sqlite>,
{
    let count = sqlx::query_scalar::<_, i64>(
        r#"
        SELECT COUNT(*) FROM order_offers WHERE status = 'active'
        "#,
    )
    .fetch_one(executor)
    .await?;

    Ok(count)
}
