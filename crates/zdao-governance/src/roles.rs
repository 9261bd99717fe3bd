//! Role-based access control for the timelock.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use zdao_types::Address;

use crate::error::GovernanceError;

/// Sentinel member of the executor set meaning "anyone may execute".
pub const OPEN_ROLE: Address = Address::ZERO;

/// Timelock roles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Manages role membership and cancels operations
    Admin,
    /// Schedules operations
    Proposer,
    /// Executes ready operations
    Executor,
}

impl Role {
    pub fn name(&self) -> &'static str {
        match self {
            Role::Admin => "TIMELOCK_ADMIN_ROLE",
            Role::Proposer => "PROPOSER_ROLE",
            Role::Executor => "EXECUTOR_ROLE",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Role {
    type Err = GovernanceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "admin" | "timelock_admin_role" => Ok(Role::Admin),
            "proposer" | "proposer_role" => Ok(Role::Proposer),
            "executor" | "executor_role" => Ok(Role::Executor),
            _ => Err(GovernanceError::InvalidConfig(format!("unknown role: {s}"))),
        }
    }
}

/// Role membership sets.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleStore {
    members: BTreeMap<Role, BTreeSet<Address>>,
}

impl RoleStore {
    /// Create a store whose only member is `admin`, holding the admin role.
    pub fn new(admin: Address) -> Self {
        let mut store = Self::default();
        store.insert(Role::Admin, admin);
        store
    }

    fn insert(&mut self, role: Role, account: Address) -> bool {
        self.members.entry(role).or_default().insert(account)
    }

    pub fn has_role(&self, role: Role, account: &Address) -> bool {
        self.members.get(&role).map(|set| set.contains(account)).unwrap_or(false)
    }

    /// Fail with `Unauthorized` unless `account` holds `role`.
    pub fn check_role(&self, role: Role, account: &Address) -> Result<(), GovernanceError> {
        if self.has_role(role, account) {
            Ok(())
        } else {
            Err(GovernanceError::Unauthorized { account: *account, role })
        }
    }

    /// Like [`RoleStore::check_role`], but passes anyone when the role is open.
    pub fn check_role_or_open(&self, role: Role, account: &Address) -> Result<(), GovernanceError> {
        if self.has_role(role, &OPEN_ROLE) {
            return Ok(());
        }
        self.check_role(role, account)
    }

    /// Grant `role` to `account`. Returns false if it was already held.
    pub fn grant_role(&mut self, caller: &Address, role: Role, account: Address) -> Result<bool, GovernanceError> {
        self.check_role(Role::Admin, caller)?;
        let granted = self.insert(role, account);
        if granted {
            tracing::info!("Role {} granted to {:x} by {:x}", role, account, caller);
        }
        Ok(granted)
    }

    /// Revoke `role` from `account`. Returns false if it was not held.
    pub fn revoke_role(&mut self, caller: &Address, role: Role, account: &Address) -> Result<bool, GovernanceError> {
        self.check_role(Role::Admin, caller)?;
        let revoked = self.remove(role, account);
        if revoked {
            tracing::info!("Role {} revoked from {:x} by {:x}", role, account, caller);
        }
        Ok(revoked)
    }

    /// Give up a role held by `caller` itself.
    pub fn renounce_role(&mut self, caller: &Address, role: Role) -> Result<bool, GovernanceError> {
        let renounced = self.remove(role, caller);
        if renounced {
            tracing::info!("Role {} renounced by {:x}", role, caller);
        }
        Ok(renounced)
    }

    fn remove(&mut self, role: Role, account: &Address) -> bool {
        let Some(set) = self.members.get_mut(&role) else {
            return false;
        };
        let removed = set.remove(account);
        if set.is_empty() {
            self.members.remove(&role);
        }
        removed
    }

    /// Members of `role`, in address order.
    pub fn members(&self, role: Role) -> Vec<Address> {
        self.members.get(&role).map(|set| set.iter().copied().collect()).unwrap_or_default()
    }
}
