//! Offer lifecycle: creation, acceptance and refusal.
//!
//! Every function here runs on a caller-supplied connection, normally an open
//! transaction, and never sends anything itself. Notifications are returned so
//! the caller can deliver them after commit.

use chrono::{DateTime, FixedOffset, Utc};
use database::{
    declined, offer, order, Commission, OfferStatus, Order, OrderOffer, OrderStatus,
    SqliteConnection, User,
};
use tracing::info;

use crate::error::{MatchingError, Result};
use crate::payment::calculate_executor_payment;
use crate::penalty::{self, PenaltyOutcome, PenaltyPolicy};
use crate::sender::Notification;
use crate::texts;
use crate::timing::offer_timeout_for;

/// A stored offer and the message that presents it to the executor.
#[derive(Debug, Clone)]
pub struct CreatedOffer {
    pub offer: OrderOffer,
    pub notification: Notification,
}

/// Offer `order` to `executor` with a deadline derived from the lead time.
///
/// Fails with `AlreadyExists` if the order already has an active offer.
pub async fn create_offer(
    conn: &mut SqliteConnection,
    order: &Order,
    executor: &User,
    commission: &Commission,
    now: DateTime<Utc>,
    tz: &FixedOffset,
) -> Result<CreatedOffer> {
    let timeout = offer_timeout_for(&order.selected_date, &order.selected_time, now, tz);
    let expires_at = now + timeout;

    let offer = offer::create_offer(&mut *conn, order.id, executor.id, expires_at, now).await?;
    let payment = calculate_executor_payment(order.total_price, commission);

    info!(
        "Offered order {} to executor {} for {} minutes",
        order.id,
        executor.id,
        timeout.num_minutes()
    );

    let notification = Notification::text(executor.id, texts::offer(order, payment, expires_at, tz))
        .with_actions(texts::offer_actions(order.id));

    Ok(CreatedOffer {
        offer,
        notification,
    })
}

/// Close an active offer. Returns `false` if it was already resolved.
pub async fn close_offer(
    conn: &mut SqliteConnection,
    offer: &OrderOffer,
    status: OfferStatus,
    now: DateTime<Utc>,
) -> Result<bool> {
    Ok(offer::resolve_offer(&mut *conn, offer.id, status, now).await?)
}

/// Assign `order` to an executor.
///
/// If the executor holds the order's active offer it is closed as accepted
/// first; losing that race fails with [`MatchingError::NotOffered`].
pub async fn accept(
    conn: &mut SqliteConnection,
    order: &Order,
    executor_id: i64,
    active: Option<&OrderOffer>,
    commission: &Commission,
    now: DateTime<Utc>,
) -> Result<Order> {
    if let Some(offer) = active {
        if offer.executor_id != executor_id
            || !close_offer(conn, offer, OfferStatus::Accepted, now).await?
        {
            return Err(MatchingError::NotOffered {
                order_id: order.id,
                executor_id,
            });
        }
    }

    let payment = calculate_executor_payment(order.total_price, commission);
    if !order::assign_executor(&mut *conn, order.id, executor_id, payment).await? {
        return Err(MatchingError::InvalidTransition {
            from: order.status,
            to: OrderStatus::Accepted,
        });
    }

    penalty::on_accept(conn, executor_id).await?;
    info!("Executor {} accepted order {}", executor_id, order.id);

    Ok(order::get_order(&mut *conn, order.id).await?)
}

/// Record a refusal and count it against the executor.
pub async fn refuse(
    conn: &mut SqliteConnection,
    order_id: i64,
    executor_id: i64,
    policy: &PenaltyPolicy,
    now: DateTime<Utc>,
) -> Result<PenaltyOutcome> {
    declined::record_decline(&mut *conn, order_id, executor_id, now).await?;
    Ok(policy.on_decline(conn, executor_id, now).await?)
}
