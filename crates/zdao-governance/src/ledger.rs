//! Checkpointed voting power ledger.
//!
//! Voting power always accrues to an account's delegatee, never to the holder
//! directly. Units held by an account that has not delegated (not even to
//! itself) count towards the total supply but towards nobody's votes.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use zdao_types::Address;

use crate::checkpoints::{Checkpoint, Trace};
use crate::error::GovernanceError;

/// Per-account checkpoint histories plus the delegation table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VotingPowerLedger {
    /// account -> delegatee
    delegates: BTreeMap<Address, Address>,
    /// Voting units currently held by each account
    units: BTreeMap<Address, u128>,
    /// Vote checkpoints per delegatee
    traces: BTreeMap<Address, Trace>,
    /// Total voting units in existence
    total_supply: Trace,
}

impl VotingPowerLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current delegatee of `account`.
    pub fn delegates(&self, account: &Address) -> Option<Address> {
        self.delegates.get(account).copied()
    }

    /// Voting units currently held by `account`.
    pub fn units_of(&self, account: &Address) -> u128 {
        self.units.get(account).copied().unwrap_or(0)
    }

    /// Point `account`'s voting units at `delegatee`.
    ///
    /// Returns false when `delegatee` already is the current delegatee, in
    /// which case nothing is written.
    pub fn delegate(
        &mut self,
        account: Address,
        delegatee: Address,
        height: u64,
    ) -> Result<bool, GovernanceError> {
        let previous = self.delegates(&account);
        if previous == Some(delegatee) {
            return Ok(false);
        }

        let units = self.units_of(&account);
        self.move_votes(previous, Some(delegatee), units, height)?;
        self.delegates.insert(account, delegatee);

        tracing::debug!(
            "Delegation: {:x} -> {:x} ({} units at height {})",
            account,
            delegatee,
            units,
            height
        );
        Ok(true)
    }

    /// Apply a holding change reported by the asset ledger.
    ///
    /// `from == None` is a mint and `to == None` is a burn. Both sides move in
    /// one step: on error nothing has been changed.
    pub fn on_transfer(
        &mut self,
        from: Option<Address>,
        to: Option<Address>,
        amount: u128,
        height: u64,
    ) -> Result<(), GovernanceError> {
        if amount == 0 {
            return Ok(());
        }

        let from_units = match from {
            Some(account) => {
                let have = self.units_of(&account);
                Some(have.checked_sub(amount).ok_or(GovernanceError::InsufficientUnits {
                    account,
                    have,
                    need: amount,
                })?)
            }
            None => None,
        };
        let to_units = match to {
            Some(account) if Some(account) == from => from_units.map(|u| u + amount),
            Some(account) => Some(
                self.units_of(&account)
                    .checked_add(amount)
                    .ok_or(GovernanceError::Overflow)?,
            ),
            None => None,
        };
        let supply = match (from, to) {
            (None, Some(_)) => Some(
                self.total_supply
                    .latest()
                    .checked_add(amount)
                    .ok_or(GovernanceError::Overflow)?,
            ),
            (Some(_), None) => Some(self.total_supply.latest() - amount),
            _ => None,
        };

        let src = from.and_then(|a| self.delegates(&a));
        let dst = to.and_then(|a| self.delegates(&a));
        self.check_move(src, dst, amount, height)?;
        if supply.is_some() {
            self.total_supply.ensure_writable(height)?;
        }

        if let (Some(account), Some(units)) = (from, from_units) {
            self.set_units(account, units);
        }
        if let (Some(account), Some(units)) = (to, to_units) {
            self.set_units(account, units);
        }
        if let Some(supply) = supply {
            self.total_supply.push(height, supply)?;
        }
        self.move_votes(src, dst, amount, height)
    }

    /// Signed holding change of a single account (mint when positive, burn when negative).
    pub fn on_balance_change(
        &mut self,
        account: Address,
        delta: i128,
        height: u64,
    ) -> Result<(), GovernanceError> {
        if delta >= 0 {
            self.on_transfer(None, Some(account), delta.unsigned_abs(), height)
        } else {
            self.on_transfer(Some(account), None, delta.unsigned_abs(), height)
        }
    }

    fn set_units(&mut self, account: Address, units: u128) {
        if units == 0 {
            self.units.remove(&account);
        } else {
            self.units.insert(account, units);
        }
    }

    fn check_move(
        &self,
        src: Option<Address>,
        dst: Option<Address>,
        amount: u128,
        height: u64,
    ) -> Result<(), GovernanceError> {
        if src == dst || amount == 0 {
            return Ok(());
        }
        if let Some(src) = src {
            let trace = self.traces.get(&src);
            let have = trace.map(Trace::latest).unwrap_or(0);
            if have < amount {
                return Err(GovernanceError::InsufficientUnits { account: src, have, need: amount });
            }
            if let Some(trace) = trace {
                trace.ensure_writable(height)?;
            }
        }
        if let Some(dst) = dst {
            if let Some(trace) = self.traces.get(&dst) {
                trace.ensure_writable(height)?;
                trace.latest().checked_add(amount).ok_or(GovernanceError::Overflow)?;
            }
        }
        Ok(())
    }

    fn move_votes(
        &mut self,
        src: Option<Address>,
        dst: Option<Address>,
        amount: u128,
        height: u64,
    ) -> Result<(), GovernanceError> {
        if src == dst || amount == 0 {
            return Ok(());
        }
        self.check_move(src, dst, amount, height)?;

        if let Some(src) = src {
            let trace = self.traces.entry(src).or_default();
            let votes = trace.latest() - amount;
            let (old, new) = trace.push(height, votes)?;
            tracing::debug!("Checkpoint {:x} at height {}: {} -> {}", src, height, old, new);
        }
        if let Some(dst) = dst {
            let trace = self.traces.entry(dst).or_default();
            let votes = trace.latest() + amount;
            let (old, new) = trace.push(height, votes)?;
            tracing::debug!("Checkpoint {:x} at height {}: {} -> {}", dst, height, old, new);
        }
        Ok(())
    }

    /// Voting power of `account` at a strictly past `height`.
    pub fn get_votes(&self, account: &Address, height: u64, current: u64) -> Result<u128, GovernanceError> {
        if height >= current {
            return Err(GovernanceError::FutureLookup { height, current });
        }
        Ok(self.traces.get(account).map(|t| t.upper_lookup(height)).unwrap_or(0))
    }

    /// Total voting units at a strictly past `height`.
    pub fn get_past_total_supply(&self, height: u64, current: u64) -> Result<u128, GovernanceError> {
        if height >= current {
            return Err(GovernanceError::FutureLookup { height, current });
        }
        Ok(self.total_supply.upper_lookup(height))
    }

    /// Voting power of `account` as of its latest checkpoint.
    pub fn get_current_votes(&self, account: &Address) -> u128 {
        self.traces.get(account).map(Trace::latest).unwrap_or(0)
    }

    pub fn total_supply(&self) -> u128 {
        self.total_supply.latest()
    }

    pub fn num_checkpoints(&self, account: &Address) -> usize {
        self.traces.get(account).map(Trace::len).unwrap_or(0)
    }

    pub fn checkpoint_at(&self, account: &Address, index: usize) -> Option<Checkpoint> {
        self.traces.get(account).and_then(|t| t.get(index))
    }
}
