//! Schedule index over executor availability.

use std::collections::HashMap;

use chrono::Weekday;
use database::{schedule, Availability, Result, SqliteConnection};

/// How an executor relates to a requested slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotFit {
    /// A stored schedule contains the slot.
    Matching,
    /// No stored schedule.
    Unconstrained,
    /// A stored schedule does not contain the slot.
    Excluded,
}

/// Availability of every executor, keyed by executor id.
#[derive(Debug, Clone, Default)]
pub struct ScheduleIndex {
    schedules: HashMap<i64, Availability>,
}

impl ScheduleIndex {
    pub fn new(schedules: HashMap<i64, Availability>) -> Self {
        Self { schedules }
    }

    /// Load every stored schedule.
    pub async fn load(conn: &mut SqliteConnection) -> Result<Self> {
        Ok(Self::new(schedule::load_schedules(&mut *conn).await?))
    }

    /// Classify an executor against a slot. An unknown weekday only matches
    /// unconstrained executors.
    pub fn fit(&self, executor_id: i64, weekday: Option<Weekday>, slot: &str) -> SlotFit {
        match (self.schedules.get(&executor_id), weekday) {
            (None, _) | (Some(Availability::Unconstrained), _) => SlotFit::Unconstrained,
            (Some(availability), Some(day)) if availability.allows(day, slot) => SlotFit::Matching,
            (Some(_), _) => SlotFit::Excluded,
        }
    }
}
