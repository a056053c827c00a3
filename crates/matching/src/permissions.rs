//! Capability resolution for administrative actions.

use std::collections::HashSet;

use database::{User, UserRole};
use serde::{Deserialize, Serialize};

use crate::error::{MatchingError, Result};

/// An administrative capability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Permission {
    ViewOrders,
    /// Unassign executors and trigger reassignment.
    AssignOrders,
    EditOrders,
    /// Priorities and penalties.
    ManageExecutors,
    /// Commission and other global settings.
    ManageSettings,
}

impl Permission {
    pub const ALL: [Permission; 5] = [
        Permission::ViewOrders,
        Permission::AssignOrders,
        Permission::EditOrders,
        Permission::ManageExecutors,
        Permission::ManageSettings,
    ];
}

/// Resolved permission set of one acting user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Capabilities {
    actor_id: i64,
    granted: HashSet<Permission>,
}

impl Capabilities {
    /// Resolve what `actor_id` may do.
    ///
    /// The owner and configured admin ids get everything, as do users stored
    /// with the admin role. Supervisors can view, unassign and edit orders.
    pub fn resolve(actor_id: i64, actor: Option<&User>, owner_id: i64, admin_ids: &[i64]) -> Self {
        let role = actor.map(|u| u.role);
        let granted: HashSet<Permission> =
            if actor_id == owner_id || admin_ids.contains(&actor_id) || role == Some(UserRole::Admin) {
                Permission::ALL.into_iter().collect()
            } else if role == Some(UserRole::Supervisor) {
                [
                    Permission::ViewOrders,
                    Permission::AssignOrders,
                    Permission::EditOrders,
                ]
                .into_iter()
                .collect()
            } else {
                HashSet::new()
            };

        Self { actor_id, granted }
    }

    pub fn actor_id(&self) -> i64 {
        self.actor_id
    }

    pub fn allows(&self, permission: Permission) -> bool {
        self.granted.contains(&permission)
    }

    /// Fail with [`MatchingError::Forbidden`] unless `permission` is granted.
    pub fn require(&self, permission: Permission) -> Result<()> {
        if self.allows(permission) {
            Ok(())
        } else {
            Err(MatchingError::Forbidden {
                actor_id: self.actor_id,
                permission,
            })
        }
    }
}
