//! Candidate selection for an order.
//!
//! Executors whose schedule contains the order's slot come first, then
//! executors without a schedule. Each group is ranked independently.

use std::collections::HashSet;

use chrono::Weekday;
use database::{declined, user, Order, Result, SqliteConnection, User};
use tracing::debug;

use crate::ranking::rank_executors;
use crate::schedule::{ScheduleIndex, SlotFit};
use crate::timing::order_weekday;

/// Full preference order of executors for a slot, excluded executors removed.
pub fn candidate_order(
    executors: Vec<User>,
    index: &ScheduleIndex,
    weekday: Option<Weekday>,
    slot: &str,
) -> Vec<User> {
    let mut matching = Vec::new();
    let mut unconstrained = Vec::new();

    for executor in executors.into_iter().filter(User::is_active_executor) {
        match index.fit(executor.id, weekday, slot) {
            SlotFit::Matching => matching.push(executor),
            SlotFit::Unconstrained => unconstrained.push(executor),
            SlotFit::Excluded => {}
        }
    }

    rank_executors(&mut matching);
    rank_executors(&mut unconstrained);
    matching.extend(unconstrained);
    matching
}

/// Best executor for an order who is not in `excluded`.
pub fn select_candidate(
    executors: Vec<User>,
    index: &ScheduleIndex,
    order: &Order,
    excluded: &HashSet<i64>,
) -> Option<User> {
    let weekday = order_weekday(&order.selected_date);
    candidate_order(executors, index, weekday, &order.selected_time)
        .into_iter()
        .find(|executor| !excluded.contains(&executor.id))
}

/// Load the pool and decline history, then pick the next executor for an order.
pub async fn next_candidate(conn: &mut SqliteConnection, order: &Order) -> Result<Option<User>> {
    let executors = user::list_active_executors(&mut *conn).await?;
    let index = ScheduleIndex::load(conn).await?;
    let excluded = declined::declined_executor_ids(&mut *conn, order.id).await?;

    debug!(
        "Selecting executor for order {} from {} active, {} excluded",
        order.id,
        executors.len(),
        excluded.len()
    );

    Ok(select_candidate(executors, &index, order, &excluded))
}
