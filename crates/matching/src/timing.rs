//! Scheduled start, lead time and offer timeout tiers.
//!
//! All order dates and slots are wall-clock values in the service's fixed
//! timezone.

use chrono::{
    DateTime, Datelike, Duration, FixedOffset, NaiveDate, NaiveTime, Offset, TimeZone, Utc,
    Weekday,
};

use database::validation::DATE_FORMAT;

/// Default service timezone offset (UTC+5).
pub const DEFAULT_UTC_OFFSET_HOURS: i32 = 5;

/// Response window for offers starting in under 24 hours.
pub const SHORT_NOTICE_TIMEOUT_MINUTES: i64 = 15;
/// Response window for offers starting in 24 hours to 3 days.
pub const MEDIUM_NOTICE_TIMEOUT_MINUTES: i64 = 30;
/// Response window for offers starting 3 days out or later.
pub const LONG_NOTICE_TIMEOUT_MINUTES: i64 = 60;

/// Build the service timezone from an hour offset. Out-of-range offsets fall back to UTC+5.
pub fn service_timezone(utc_offset_hours: i32) -> FixedOffset {
    FixedOffset::east_opt(utc_offset_hours.saturating_mul(3600))
        .or_else(|| FixedOffset::east_opt(DEFAULT_UTC_OFFSET_HOURS * 3600))
        .unwrap_or_else(|| Utc.fix())
}

/// Parse an order date.
pub fn parse_order_date(date: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(date.trim(), DATE_FORMAT).ok()
}

/// Weekday of an order date.
pub fn order_weekday(date: &str) -> Option<Weekday> {
    parse_order_date(date).map(|d| d.weekday())
}

/// Start time of a slot label such as `"9:00 - 12:00"`.
pub fn slot_start(slot: &str) -> Option<NaiveTime> {
    let start = slot.split_whitespace().next()?;
    let (hours, minutes) = start.split_once(':')?;
    NaiveTime::from_hms_opt(hours.parse().ok()?, minutes.parse().ok()?, 0)
}

/// Scheduled start of an order in the service timezone.
pub fn scheduled_start(date: &str, slot: &str, tz: &FixedOffset) -> Option<DateTime<FixedOffset>> {
    let naive = parse_order_date(date)?.and_time(slot_start(slot)?);
    tz.from_local_datetime(&naive).single()
}

/// Interval between `now` and the scheduled start. Negative for past orders.
pub fn lead_time(date: &str, slot: &str, now: DateTime<Utc>, tz: &FixedOffset) -> Option<Duration> {
    scheduled_start(date, slot, tz).map(|start| start.with_timezone(&Utc) - now)
}

/// Offer response window for a given lead time.
pub fn offer_timeout(lead: Duration) -> Duration {
    if lead < Duration::hours(24) {
        Duration::minutes(SHORT_NOTICE_TIMEOUT_MINUTES)
    } else if lead < Duration::days(3) {
        Duration::minutes(MEDIUM_NOTICE_TIMEOUT_MINUTES)
    } else {
        Duration::minutes(LONG_NOTICE_TIMEOUT_MINUTES)
    }
}

/// Offer response window for an order. Unparseable timing gets the shortest window.
pub fn offer_timeout_for(date: &str, slot: &str, now: DateTime<Utc>, tz: &FixedOffset) -> Duration {
    match lead_time(date, slot, now, tz) {
        Some(lead) => offer_timeout(lead),
        None => {
            tracing::warn!("Unparseable order timing '{} {}', using shortest offer window", date, slot);
            Duration::minutes(SHORT_NOTICE_TIMEOUT_MINUTES)
        }
    }
}

/// Human-readable date and slot, falling back to the raw strings.
pub fn format_when(date: &str, slot: &str) -> String {
    match parse_order_date(date) {
        Some(d) => format!("{}, {}", d.format("%-d %B %Y"), slot),
        None => format!("{} {}", date, slot),
    }
}

/// Format an instant as local service time (`HH:MM`).
pub fn format_local_time(instant: DateTime<Utc>, tz: &FixedOffset) -> String {
    instant.with_timezone(tz).format("%H:%M").to_string()
}
