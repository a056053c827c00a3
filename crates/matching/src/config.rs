//! Engine settings.

use chrono::FixedOffset;

use crate::penalty::PenaltyPolicy;
use crate::timing::{service_timezone, DEFAULT_UTC_OFFSET_HOURS};

/// Settings for [`crate::MatchingEngine`].
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Telegram ids that receive admin alerts.
    pub admin_ids: Vec<i64>,
    /// Owner id; holds every permission even if not listed as admin.
    pub owner_id: i64,
    /// Timezone order dates and slots are expressed in.
    pub timezone: FixedOffset,
    pub penalty: PenaltyPolicy,
}

impl EngineConfig {
    /// Create a config with the given admins. The first admin is the owner.
    pub fn new(admin_ids: Vec<i64>) -> Self {
        let owner_id = admin_ids.first().copied().unwrap_or_default();
        Self {
            admin_ids,
            owner_id,
            timezone: service_timezone(DEFAULT_UTC_OFFSET_HOURS),
            penalty: PenaltyPolicy::default(),
        }
    }

    pub fn with_owner(mut self, owner_id: i64) -> Self {
        self.owner_id = owner_id;
        self
    }

    pub fn with_utc_offset_hours(mut self, hours: i32) -> Self {
        self.timezone = service_timezone(hours);
        self
    }

    pub fn with_penalty(mut self, penalty: PenaltyPolicy) -> Self {
        self.penalty = penalty;
        self
    }
}
