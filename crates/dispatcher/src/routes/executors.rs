//! Executor-facing endpoints: open orders and the weekly schedule.

use std::collections::HashSet;

use axum::extract::{Path, State};
use axum::Json;
use chrono::{Utc, Weekday};
use database::validation::validate_time_slot;
use database::{Availability, Order};
use serde::{Deserialize, Serialize};

use crate::error::{ApiError, Result};
use crate::state::AppState;

/// Orders the executor can still take.
pub async fn new_orders(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<Vec<Order>>> {
    Ok(Json(state.engine.new_orders_for(id).await?))
}

/// One `(weekday, slot)` pair as sent over the wire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlotEntry {
    /// Weekday name, e.g. `monday` or `Mon`.
    pub weekday: String,
    /// Slot label such as `9:00 - 12:00`.
    pub slot: String,
}

#[derive(Debug, Serialize)]
pub struct ScheduleView {
    /// `false` means the executor is available for every slot.
    pub constrained: bool,
    pub slots: Vec<SlotEntry>,
}

impl From<Availability> for ScheduleView {
    fn from(availability: Availability) -> Self {
        match availability {
            Availability::Unconstrained => ScheduleView {
                constrained: false,
                slots: Vec::new(),
            },
            Availability::Constrained(set) => {
                let mut pairs: Vec<(Weekday, String)> = set.into_iter().collect();
                pairs.sort_by(|a, b| {
                    a.0.num_days_from_monday()
                        .cmp(&b.0.num_days_from_monday())
                        .then_with(|| a.1.cmp(&b.1))
                });
                ScheduleView {
                    constrained: true,
                    slots: pairs
                        .into_iter()
                        .map(|(weekday, slot)| SlotEntry {
                            weekday: weekday.to_string(),
                            slot,
                        })
                        .collect(),
                }
            }
        }
    }
}

pub async fn get_schedule(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<ScheduleView>> {
    let availability = database::schedule::get_availability(state.db.pool(), id).await?;
    Ok(Json(availability.into()))
}

#[derive(Deserialize)]
pub struct ScheduleRequest {
    pub slots: Vec<SlotEntry>,
}

fn parse_slots(entries: &[SlotEntry]) -> Result<HashSet<(Weekday, String)>> {
    entries
        .iter()
        .map(|entry| {
            let weekday: Weekday = entry
                .weekday
                .trim()
                .parse()
                .map_err(|_| ApiError::BadRequest(format!("Unknown weekday: {}", entry.weekday)))?;
            validate_time_slot(&entry.slot)
                .map_err(|e| ApiError::BadRequest(e.to_string()))?;
            Ok((weekday, entry.slot.clone()))
        })
        .collect()
}

/// Replace the executor's schedule. An empty list means "no availability".
pub async fn put_schedule(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(req): Json<ScheduleRequest>,
) -> Result<Json<ScheduleView>> {
    let slots = parse_slots(&req.slots)?;

    // Unknown executors surface as 404 rather than a foreign-key failure.
    database::user::get_user(state.db.pool(), id).await?;

    let mut conn = state
        .db
        .pool()
        .acquire()
        .await
        .map_err(database::DatabaseError::from)?;
    database::schedule::set_schedule(&mut conn, id, &slots, Utc::now()).await?;

    let availability = database::schedule::get_availability(state.db.pool(), id).await?;
    Ok(Json(availability.into()))
}

/// Drop the schedule; the executor becomes available for every slot.
pub async fn delete_schedule(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<ScheduleView>> {
    database::schedule::clear_schedule(state.db.pool(), id).await?;
    Ok(Json(Availability::Unconstrained.into()))
}
