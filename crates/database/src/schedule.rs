//! Executor weekly schedules.
//!
//! A `schedules` row marks the executor as constrained; its slots live in
//! `schedule_slots`. No row means the executor is available for every slot.

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc, Weekday};
use sqlx::{Connection, Executor, Sqlite, SqliteConnection};

use crate::models::{weekday_from_index, Availability};
use crate::Result;

type SlotRow = (i64, Option<i64>, Option<String>);

fn fold_rows(rows: Vec<SlotRow>) -> HashMap<i64, Availability> {
    let mut schedules: HashMap<i64, HashSet<(Weekday, String)>> = HashMap::new();
    for (executor_id, weekday, slot) in rows {
        let slots = schedules.entry(executor_id).or_default();
        if let (Some(weekday), Some(slot)) = (weekday.and_then(weekday_from_index), slot) {
            slots.insert((weekday, slot));
        }
    }
    schedules
        .into_iter()
        .map(|(id, slots)| (id, Availability::Constrained(slots)))
        .collect()
}

/// Get one executor's availability.
pub async fn get_availability<'e, E>(executor: E, executor_id: i64) -> Result<Availability>
where
    E: Executor<'e, Database = Sqlite>,
{
    let rows = sqlx::query_as::<_, SlotRow>(
        r#"
        SELECT s.executor_id, sl.weekday, sl.slot
        FROM schedules s
        LEFT JOIN schedule_slots sl ON sl.executor_id = s.executor_id
        WHERE s.executor_id = ?
        "#,
    )
    .bind(executor_id)
    .fetch_all(executor)
    .await?;

    Ok(fold_rows(rows).remove(&executor_id).unwrap_or_default())
}

/// Load every stored schedule. Executors missing from the map are unconstrained.
pub async fn load_schedules<'e, E>(executor: E) -> Result<HashMap<i64, Availability>>
where
    E: Executor<'e, Database = Sqlite>,
{
    let rows = sqlx::query_as::<_, SlotRow>(
        r#"
        SELECT s.executor_id, sl.weekday, sl.slot
        FROM schedules s
        LEFT JOIN schedule_slots sl ON sl.executor_id = s.executor_id
        "#,
    )
    .fetch_all(executor)
    .await?;

    Ok(fold_rows(rows))
}

/// Replace an executor's schedule with the given slots.
///
/// An empty set is stored as a constrained schedule with no availability.
pub async fn set_schedule(
    conn: &mut SqliteConnection,
    executor_id: i64,
    slots: &HashSet<(Weekday, String)>,
    now: DateTime<Utc>,
) -> Result<()> {
    let mut tx = conn.begin().await?;

    sqlx::query(
        r#"
        INSERT INTO schedules (executor_id, updated_at)
        VALUES (?, ?)
        ON CONFLICT(executor_id) DO UPDATE SET updated_at = excluded.updated_at
        "#,
    )
    .bind(executor_id)
    .bind(now)
    .execute(&mut *tx)
    .await?;

    sqlx::query("DELETE FROM schedule_slots WHERE executor_id = ?")
        .bind(executor_id)
        .execute(&mut *tx)
        .await?;

    for (weekday, slot) in slots {
        sqlx::query(
            r#"
            INSERT INTO schedule_slots (executor_id, weekday, slot)
            VALUES (?, ?, ?)
            "#,
        )
        .bind(executor_id)
        .bind(i64::from(weekday.num_days_from_monday()))
        .bind(slot)
        .execute(&mut *tx)
        .await?;
    }

    tx.commit().await?;

    tracing::info!(
        "Saved schedule for executor {} ({} slots)",
        executor_id,
        slots.len()
    );
    Ok(())
}

/// Remove an executor's schedule, making them unconstrained again.
///
/// Returns `false` if no schedule was stored.
pub async fn clear_schedule<'e, E>(executor: E, executor_id: i64) -> Result<bool>
where
    E: Executor<'e, Database = Sqlite>,
{
    let result = sqlx::query(
        r#"
        DELETE FROM schedules
        WHERE executor_id = ?
        "#,
    )
    .bind(executor_id)
    .execute(executor)
    .await?;

    Ok(result.rows_affected() == 1)
}
