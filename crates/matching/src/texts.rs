//! User-facing message texts and action keyboards.

use chrono::{DateTime, FixedOffset, Utc};
use database::{Order, OrderStatus, User};

use crate::sender::Action;
use crate::timing::{format_local_time, format_when};

/// Client-facing label for an order status.
pub fn status_label(status: OrderStatus) -> &'static str {
    match status {
        OrderStatus::New => "✅ Received, looking for a cleaner",
        OrderStatus::Accepted => "🤝 Cleaner assigned",
        OrderStatus::OnTheWay => "🚀 Cleaner on the way",
        OrderStatus::InProgress => "🧼 Cleaning in progress",
        OrderStatus::Completed => "🎉 Completed",
        OrderStatus::Cancelled => "❌ Cancelled",
        OrderStatus::PendingConfirmation => "⏳ Waiting for the cleaner to confirm changes",
    }
}

fn format_money(amount: f64) -> String {
    format!("{:.0} ₽", amount)
}

fn summary(order: &Order) -> String {
    format!(
        "Order #{}\n🗓 {}\n📍 {}",
        order.id,
        format_when(&order.selected_date, &order.selected_time),
        order.address_text
    )
}

/// Accept and decline buttons for an offer.
pub fn offer_actions(order_id: i64) -> Vec<Action> {
    vec![
        Action::new("✅ Accept", format!("executor_accept_order:{order_id}")),
        Action::new("⛔️ Decline", format!("executor_decline_order:{order_id}")),
    ]
}

/// Confirm and refuse buttons after an order was edited.
pub fn changes_actions(order_id: i64) -> Vec<Action> {
    vec![
        Action::new("✅ Accept changes", format!("executor_accept_changes:{order_id}")),
        Action::new("❌ Give up the order", format!("executor_decline_changes:{order_id}")),
    ]
}

pub fn offer(order: &Order, payment: f64, expires_at: DateTime<Utc>, tz: &FixedOffset) -> String {
    format!(
        "🔔 New order for you!\n\n{}\n💰 Your payout: {}\n\nPlease answer by {}.",
        summary(order),
        format_money(payment),
        format_local_time(expires_at, tz)
    )
}

pub fn offer_expired(order_id: i64) -> String {
    format!("⌛️ The offer for order #{order_id} has expired and was passed to another cleaner.")
}

pub fn offer_withdrawn(order_id: i64) -> String {
    format!("Order #{order_id} is no longer available.")
}

pub fn assigned_to_executor(order: &Order) -> String {
    format!(
        "✅ Order #{} is yours.\n\n{}\n💰 Your payout: {}",
        order.id,
        summary(order),
        format_money(order.executor_payment.unwrap_or(0.0))
    )
}

pub fn assigned_to_client(order: &Order, executor: &User) -> String {
    format!(
        "🤝 A cleaner has been assigned to your order #{}: {}.",
        order.id, executor.name
    )
}

/// Warning after a decline that did not yet trigger a block.
pub fn decline_warning(consecutive_declines: i64, threshold: i64) -> String {
    let left = (threshold.max(1) - consecutive_declines).max(1);
    format!(
        "ℹ️ Declines in a row: {}. After {} more, new orders will be paused.",
        consecutive_declines, left
    )
}

pub fn executor_blocked(until: DateTime<Utc>, tz: &FixedOffset) -> String {
    format!(
        "⛔️ You declined too many orders in a row. New orders are paused until {}.",
        until.with_timezone(tz).format("%d.%m %H:%M")
    )
}

pub fn admin_executor_blocked(executor: &User, until: DateTime<Utc>, tz: &FixedOffset) -> String {
    format!(
        "⚠️ Executor {} ({}) was blocked for repeated declines until {}.",
        executor.mention(),
        executor.id,
        until.with_timezone(tz).format("%d.%m %H:%M")
    )
}

pub fn admin_no_candidate(order: &Order) -> String {
    format!(
        "‼️ No available cleaner for order #{}. Manual assignment needed.\n\n{}",
        order.id,
        summary(order)
    )
}

pub fn unassigned_executor(order_id: i64) -> String {
    format!("ℹ️ You have been removed from order #{order_id} by an administrator.")
}

pub fn changes_request(order: &Order) -> String {
    format!(
        "✏️ Order #{} was changed.\n\n{}\n💰 Your payout: {}\n\nDo you still take it?",
        order.id,
        summary(order),
        format_money(order.executor_payment.unwrap_or(0.0))
    )
}

pub fn changes_refused_admin(order_id: i64, executor: &User) -> String {
    format!(
        "❗️ Executor {} refused the changes to order #{order_id}. Searching for a new cleaner.",
        executor.mention()
    )
}

pub fn status_changed(order: &Order) -> String {
    format!("Order #{}: {}", order.id, status_label(order.status))
}

pub fn cancelled(order_id: i64) -> String {
    format!("❌ Order #{order_id} has been cancelled by the client.")
}

pub fn rate_request(order_id: i64) -> String {
    format!("🎉 Order #{order_id} is completed. Please rate the cleaning from 1 to 5.")
}

pub fn reminder_day_before(order: &Order) -> String {
    format!(
        "👋 Reminder: your cleaning is tomorrow.\n\n{}",
        summary(order)
    )
}

pub fn reminder_two_hours(order: &Order) -> String {
    format!(
        "⏰ Your cleaner will arrive in about 2 hours.\n\n{}",
        summary(order)
    )
}

pub fn admin_still_unassigned(order: &Order) -> String {
    format!(
        "‼️ Order #{} starts in 2 hours and still has no cleaner.\n\n{}",
        order.id,
        summary(order)
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_action_callbacks() {
        let actions = offer_actions(42);
        assert_eq!(actions[0].callback, "executor_accept_order:42");
        assert_eq!(actions[1].callback, "executor_decline_order:42");
        assert_eq!(changes_actions(7)[1].callback, "executor_decline_changes:7");
    }

    #[test]
    fn test_decline_warning_counts_down() {
        let text = decline_warning(1, 3);
        assert!(text.contains("Declines in a row: 1"));
        assert!(text.contains("After 2 more"));
        assert!(decline_warning(2, 3).contains("After 1 more"));
    }

    #[test]
    fn test_offer_text_shows_local_deadline() {
        use chrono::TimeZone;

        let order = Order {
            id: 3,
            client_tg_id: 1,
            executor_tg_id: None,
            status: OrderStatus::New,
            selected_date: "2026-10-26".into(),
            selected_time: "9:00 - 12:00".into(),
            address_text: "Lenina 1".into(),
            total_price: 3000.0,
            executor_payment: None,
            rating: None,
            reminder_24h_sent: false,
            reminder_2h_sent: false,
            created_at: Utc::now(),
        };
        let tz = FixedOffset::east_opt(5 * 3600).unwrap();
        let expires = Utc.with_ymd_and_hms(2026, 10, 19, 10, 15, 0).unwrap();

        let text = offer(&order, 2400.0, expires, &tz);
        assert!(text.contains("Order #3"));
        assert!(text.contains("26 October 2026, 9:00 - 12:00"));
        assert!(text.contains("2400 ₽"));
        assert!(text.contains("15:15"));
    }
}
