//! Decline penalties and temporary blocks.

use chrono::{DateTime, Duration, Utc};
use database::{user, Result, SqliteConnection, User, UserStatus};
use tracing::info;

/// Consecutive declines that trigger a block.
pub const DEFAULT_DECLINE_THRESHOLD: i64 = 3;
/// Default block length in hours.
pub const DEFAULT_BLOCK_HOURS: i64 = 12;

/// Thresholds for blocking executors who keep declining.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PenaltyPolicy {
    pub threshold: i64,
    pub block_duration: Duration,
}

impl Default for PenaltyPolicy {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_DECLINE_THRESHOLD,
            block_duration: Duration::hours(DEFAULT_BLOCK_HOURS),
        }
    }
}

/// Effect of a decline on the executor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PenaltyOutcome {
    /// Counter incremented, still active.
    Counted { consecutive_declines: i64 },
    /// Threshold reached; counter reset.
    Blocked { until: DateTime<Utc> },
}

impl PenaltyPolicy {
    /// Count a decline or expiry, blocking the executor at the threshold.
    pub async fn on_decline(
        &self,
        conn: &mut SqliteConnection,
        executor_id: i64,
        now: DateTime<Utc>,
    ) -> Result<PenaltyOutcome> {
        let declines = user::increment_consecutive_declines(&mut *conn, executor_id).await?;

        if declines < self.threshold.max(1) {
            return Ok(PenaltyOutcome::Counted {
                consecutive_declines: declines,
            });
        }

        let until = now + self.block_duration;
        user::block_user(&mut *conn, executor_id, until).await?;
        info!(
            "Executor {} blocked until {} after {} consecutive declines",
            executor_id, until, declines
        );

        Ok(PenaltyOutcome::Blocked { until })
    }
}

/// Reset the decline counter after an acceptance.
pub async fn on_accept(conn: &mut SqliteConnection, executor_id: i64) -> Result<()> {
    user::reset_consecutive_declines(&mut *conn, executor_id).await
}

/// Lift an expired block for an executor and return their current record.
pub async fn on_access_check(
    conn: &mut SqliteConnection,
    executor_id: i64,
    now: DateTime<Utc>,
) -> Result<User> {
    let current = user::get_user(&mut *conn, executor_id).await?;
    if current.status != UserStatus::Blocked {
        return Ok(current);
    }

    if user::release_if_expired(&mut *conn, executor_id, now).await? {
        info!("Executor {} block expired, reactivated", executor_id);
        return user::get_user(&mut *conn, executor_id).await;
    }

    Ok(current)
}
