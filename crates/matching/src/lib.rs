//! Executor matching and offer sequencing for the cleaning marketplace.
//!
//! This crate provides the [`MatchingEngine`] type which picks an executor
//! for every new order, sends them a time-boxed offer and cascades to the
//! next executor on decline or timeout.
//!
//! # Features
//!
//! - Ranks executors by priority, rating and review count
//! - Prefers executors whose weekly schedule covers the order's slot
//! - Scales the response window with the lead time before the cleaning
//! - Blocks executors who keep declining
//! - Keeps at most one active offer per order
//! - Delivers notifications only after the state change is committed
//!
//! # Architecture
//!
//! ```text
//! New order (from the client bot)
//!          ↓
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     MATCHING ENGINE                         │
//! │                                                             │
//! │  1. Candidate selection                                     │
//! │     schedule index → ranking → minus decliners              │
//! │         ↓                                                   │
//! │  2. Offer with deadline (15 / 30 / 60 min by lead time)     │
//! │         ↓                                                   │
//! │  3. Executor answers or the sweeper expires the offer:      │
//! │     • accept  → assign, compute payout, reset declines      │
//! │     • decline → record, penalty, back to 1                  │
//! │     • expire  → record, penalty, back to 1                  │
//! │         ↓                                                   │
//! │  4. Nobody left → order stays new, admins alerted           │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```rust,no_run
//! use matching::{EngineConfig, LoggingSender, MatchingEngine};
//! use database::Database;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let db = Database::connect("sqlite:cleaning.db?mode=rwc").await?;
//!     db.migrate().await?;
//!
//!     let engine = MatchingEngine::new(db, LoggingSender, EngineConfig::new(vec![1001]));
//!     let outcome = engine.dispatch_new_order(42).await?;
//!
//!     println!("{:?}", outcome);
//!     Ok(())
//! }
//! ```

pub mod clock;
pub mod config;
mod engine;
mod error;
pub mod offers;
pub mod payment;
pub mod penalty;
pub mod permissions;
pub mod ranking;
pub mod reminders;
pub mod schedule;
pub mod selector;
mod sender;
pub mod status;
mod sweeper;
pub mod texts;
pub mod timing;

pub use clock::{Clock, FixedClock, SystemClock};
pub use config::EngineConfig;
pub use engine::{DispatchOutcome, MatchingEngine, SweepReport};
pub use error::{MatchingError, NotifyError, Result};
pub use payment::calculate_executor_payment;
pub use penalty::{PenaltyOutcome, PenaltyPolicy};
pub use permissions::{Capabilities, Permission};
pub use sender::{
    deliver_all, Action, LoggingSender, NoOpSender, Notification, NotificationSender,
    RecordingSender,
};
pub use sweeper::{Sweeper, DEFAULT_SWEEP_INTERVAL};
