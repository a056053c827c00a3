//! Reminder windows before a scheduled cleaning.

use chrono::{DateTime, Duration, FixedOffset, Utc};
use database::order::Reminder;
use database::{Order, OrderStatus};

use crate::timing::scheduled_start;

/// Width of each reminder window in seconds.
pub const WINDOW_SECS: i64 = 60;

fn lead(reminder: Reminder) -> Duration {
    match reminder {
        Reminder::DayBefore => Duration::hours(24),
        Reminder::TwoHoursBefore => Duration::hours(2),
    }
}

fn already_sent(reminder: Reminder, order: &Order) -> bool {
    match reminder {
        Reminder::DayBefore => order.reminder_24h_sent,
        Reminder::TwoHoursBefore => order.reminder_2h_sent,
    }
}

/// Reminders that fall due for an order at `now`.
///
/// A reminder is due when the scheduled start lies in
/// `(now + lead - 1min, now + lead]`. Orders with unparseable timing never
/// get reminders.
pub fn due_reminders(order: &Order, now: DateTime<Utc>, tz: &FixedOffset) -> Vec<Reminder> {
    if !matches!(order.status, OrderStatus::New | OrderStatus::Accepted) {
        return Vec::new();
    }

    let Some(start) = scheduled_start(&order.selected_date, &order.selected_time, tz) else {
        return Vec::new();
    };
    let start = start.with_timezone(&Utc);

    [Reminder::DayBefore, Reminder::TwoHoursBefore]
        .into_iter()
        .filter(|reminder| !already_sent(*reminder, order))
        .filter(|reminder| {
            let to = now + lead(*reminder);
            start > to - Duration::seconds(WINDOW_SECS) && start <= to
        })
        .collect()
}
