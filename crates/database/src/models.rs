//! Database models.

use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc, Weekday};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Role of a user across the client, executor and admin bots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    Client,
    Executor,
    Admin,
    Supervisor,
}

/// Account status. Blocking is temporary, see [`User::blocked_until`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum UserStatus {
    Active,
    Blocked,
}

/// A user in the system, identified by their Telegram id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct User {
    /// Telegram id.
    pub id: i64,
    /// Display name
    pub name: String,
    /// Telegram handle without the leading `@`.
    pub username: Option<String>,
    pub role: UserRole,
    pub status: UserStatus,
    /// End of a temporary block. Set whenever `status` is `Blocked`.
    pub blocked_until: Option<DateTime<Utc>>,
    /// Admin-tunable preference weight, higher is offered first.
    pub priority: i64,
    /// Mean rating over completed and rated orders.
    pub average_rating: f64,
    pub review_count: i64,
    /// Declines since the last acceptance.
    pub consecutive_declines: i64,
    /// Supervising user, lookup only.
    pub supervisor_id: Option<i64>,
    pub created_at: DateTime<Utc>,
}

impl User {
    /// Build a fresh active user with neutral matching fields.
    pub fn new(id: i64, name: impl Into<String>, role: UserRole) -> Self {
        Self {
            id,
            name: name.into(),
            username: None,
            role,
            status: UserStatus::Active,
            blocked_until: None,
            priority: 0,
            average_rating: 0.0,
            review_count: 0,
            consecutive_declines: 0,
            supervisor_id: None,
            created_at: Utc::now(),
        }
    }

    /// Whether this user is an executor in the `active` status.
    pub fn is_active_executor(&self) -> bool {
        self.role == UserRole::Executor && self.status == UserStatus::Active
    }

    /// Name used in messages: `@handle` when known, otherwise the display name.
    pub fn mention(&self) -> String {
        match &self.username {
            Some(handle) => format!("@{}", handle),
            None => self.name.clone(),
        }
    }
}

/// Order lifecycle states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    /// Waiting for an executor.
    New,
    Accepted,
    OnTheWay,
    InProgress,
    Completed,
    Cancelled,
    /// Assigned executor must re-confirm after an edit.
    PendingConfirmation,
}

impl OrderStatus {
    /// Check if this is a terminal state (no further transitions allowed)
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled)
    }

    /// Check if an executor is assigned while in this state.
    pub fn is_assigned(&self) -> bool {
        matches!(
            self,
            Self::Accepted | Self::OnTheWay | Self::InProgress | Self::PendingConfirmation
        )
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::New => write!(f, "new"),
            Self::Accepted => write!(f, "accepted"),
            Self::OnTheWay => write!(f, "on_the_way"),
            Self::InProgress => write!(f, "in_progress"),
            Self::Completed => write!(f, "completed"),
            Self::Cancelled => write!(f, "cancelled"),
            Self::PendingConfirmation => write!(f, "pending_confirmation"),
        }
    }
}

impl FromStr for OrderStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "new" => Ok(Self::New),
            "accepted" => Ok(Self::Accepted),
            "on_the_way" => Ok(Self::OnTheWay),
            "in_progress" => Ok(Self::InProgress),
            "completed" => Ok(Self::Completed),
            "cancelled" => Ok(Self::Cancelled),
            "pending_confirmation" => Ok(Self::PendingConfirmation),
            _ => Err(format!("Invalid order status: {s}")),
        }
    }
}

/// A cleaning order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Order {
    pub id: i64,
    pub client_tg_id: i64,
    /// Set only while an executor is assigned.
    pub executor_tg_id: Option<i64>,
    pub status: OrderStatus,
    /// Calendar date, `YYYY-MM-DD`.
    pub selected_date: String,
    /// Slot label such as `"9:00 - 12:00"`.
    pub selected_time: String,
    pub address_text: String,
    pub total_price: f64,
    /// Set once an executor is assigned.
    pub executor_payment: Option<f64>,
    /// Client rating, 1 to 5.
    pub rating: Option<i64>,
    pub reminder_24h_sent: bool,
    pub reminder_2h_sent: bool,
    pub created_at: DateTime<Utc>,
}

/// Fields supplied by the client flow when an order is placed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewOrder {
    pub client_tg_id: i64,
    pub selected_date: String,
    pub selected_time: String,
    pub address_text: String,
    pub total_price: f64,
}

/// The editable scope of an order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderTerms {
    pub selected_date: String,
    pub selected_time: String,
    pub address_text: String,
    pub total_price: f64,
}

impl From<&Order> for OrderTerms {
    fn from(order: &Order) -> Self {
        Self {
            selected_date: order.selected_date.clone(),
            selected_time: order.selected_time.clone(),
            address_text: order.address_text.clone(),
            total_price: order.total_price,
        }
    }
}

/// Status of a single offer attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum OfferStatus {
    Active,
    Declined,
    Accepted,
    Expired,
}

/// A time-boxed proposal of one order to one executor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct OrderOffer {
    pub id: i64,
    pub order_id: i64,
    pub executor_id: i64,
    pub expires_at: DateTime<Utc>,
    pub status: OfferStatus,
    pub created_at: DateTime<Utc>,
    pub resolved_at: Option<DateTime<Utc>>,
}

/// Permanent marker that an executor must not be offered an order again.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct DeclinedOrder {
    pub order_id: i64,
    pub executor_id: i64,
    pub created_at: DateTime<Utc>,
}

/// Weekly availability of an executor.
///
/// Executors without a stored schedule are available for every slot.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Availability {
    #[default]
    Unconstrained,
    /// Explicit set of `(weekday, slot label)` pairs. May be empty.
    Constrained(HashSet<(Weekday, String)>),
}

impl Availability {
    /// Whether the executor can take the given slot on the given weekday.
    pub fn allows(&self, weekday: Weekday, slot: &str) -> bool {
        match self {
            Availability::Unconstrained => true,
            Availability::Constrained(slots) => slots.contains(&(weekday, slot.to_string())),
        }
    }

    pub fn is_constrained(&self) -> bool {
        matches!(self, Availability::Constrained(_))
    }
}

/// How the platform commission is charged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommissionType {
    /// `value` percent of the order total.
    Percent,
    /// A fixed amount per order.
    Fixed,
}

impl fmt::Display for CommissionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Percent => write!(f, "percent"),
            Self::Fixed => write!(f, "fixed"),
        }
    }
}

impl FromStr for CommissionType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "percent" => Ok(Self::Percent),
            "fixed" => Ok(Self::Fixed),
            _ => Err(format!("Invalid commission type: {s}")),
        }
    }
}

/// Admin-configured commission rule.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Commission {
    pub commission_type: CommissionType,
    pub commission_value: f64,
}

impl Default for Commission {
    fn default() -> Self {
        Self {
            commission_type: CommissionType::Percent,
            commission_value: 0.0,
        }
    }
}

/// Map a stored weekday index (0 = Monday) to a [`Weekday`].
pub fn weekday_from_index(index: i64) -> Option<Weekday> {
    match index {
        0 => Some(Weekday::Mon),
        1 => Some(Weekday::Tue),
        2 => Some(Weekday::Wed),
        3 => Some(Weekday::Thu),
        4 => Some(Weekday::Fri),
        5 => Some(Weekday::Sat),
        6 => Some(Weekday::Sun),
        _ => None,
    }
}
