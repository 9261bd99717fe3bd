//! Voting unit variants.
//!
//! A holding either counts by value (fungible balances, one unit per unit of
//! balance) or by item (one unit per discrete item owned). Both expose the same
//! [`VotingUnits`] contract and report changes to the ledger the same way.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use zdao_types::Address;

use crate::error::GovernanceError;

/// How holdings translate into voting units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnitKind {
    /// Each unit of balance is one vote
    #[default]
    Weighted,
    /// Each item owned is one vote
    Counted,
}

/// Source of the per-account voting unit signal.
pub trait VotingUnits {
    fn kind(&self) -> UnitKind;

    /// Units currently held by `account`.
    fn voting_units(&self, account: &Address) -> u128;

    /// Units in existence.
    fn total_units(&self) -> u128;
}

/// Fungible balances.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FungibleHoldings {
    balances: BTreeMap<Address, u128>,
    supply: u128,
}

impl FungibleHoldings {
    fn check(&self, from: Option<Address>, amount: u128) -> Result<u128, GovernanceError> {
        if let Some(account) = from {
            let have = self.voting_units(&account);
            if have < amount {
                return Err(GovernanceError::InsufficientUnits { account, have, need: amount });
            }
        }
        if from.is_none() {
            self.supply.checked_add(amount).ok_or(GovernanceError::Overflow)?;
        }
        Ok(amount)
    }

    fn apply(&mut self, from: Option<Address>, to: Option<Address>, amount: u128) {
        match from {
            Some(account) => {
                let balance = self.balances.entry(account).or_default();
                *balance -= amount;
                if *balance == 0 {
                    self.balances.remove(&account);
                }
            }
            None => self.supply += amount,
        }
        match to {
            Some(account) => *self.balances.entry(account).or_default() += amount,
            None => self.supply -= amount,
        }
    }
}

impl VotingUnits for FungibleHoldings {
    fn kind(&self) -> UnitKind {
        UnitKind::Weighted
    }

    fn voting_units(&self, account: &Address) -> u128 {
        self.balances.get(account).copied().unwrap_or(0)
    }

    fn total_units(&self) -> u128 {
        self.supply
    }
}

/// Discrete items keyed by item id.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemHoldings {
    owners: BTreeMap<u64, Address>,
    counts: BTreeMap<Address, u128>,
}

impl ItemHoldings {
    pub fn owner_of(&self, item: u64) -> Option<Address> {
        self.owners.get(&item).copied()
    }

    fn check(&self, from: Option<Address>, item: u64) -> Result<u128, GovernanceError> {
        match (from, self.owner_of(item)) {
            (None, Some(_)) => Err(GovernanceError::ItemExists(item)),
            (None, None) => Ok(1),
            (Some(_), None) => Err(GovernanceError::UnknownItem(item)),
            (Some(account), Some(owner)) if owner != account => {
                Err(GovernanceError::InsufficientUnits { account, have: 0, need: 1 })
            }
            (Some(_), Some(_)) => Ok(1),
        }
    }

    fn apply(&mut self, from: Option<Address>, to: Option<Address>, item: u64) {
        if let Some(account) = from {
            let count = self.counts.entry(account).or_default();
            *count -= 1;
            if *count == 0 {
                self.counts.remove(&account);
            }
            self.owners.remove(&item);
        }
        if let Some(account) = to {
            *self.counts.entry(account).or_default() += 1;
            self.owners.insert(item, account);
        }
    }
}

impl VotingUnits for ItemHoldings {
    fn kind(&self) -> UnitKind {
        UnitKind::Counted
    }

    fn voting_units(&self, account: &Address) -> u128 {
        self.counts.get(account).copied().unwrap_or(0)
    }

    fn total_units(&self) -> u128 {
        self.owners.len() as u128
    }
}

/// Holdings of either kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Holdings {
    Weighted(FungibleHoldings),
    Counted(ItemHoldings),
}

impl Holdings {
    pub fn new(kind: UnitKind) -> Self {
        match kind {
            UnitKind::Weighted => Holdings::Weighted(FungibleHoldings::default()),
            UnitKind::Counted => Holdings::Counted(ItemHoldings::default()),
        }
    }

    /// Validate a holding change and return the voting units it moves.
    ///
    /// `value` is an amount for weighted holdings and an item id for counted ones.
    pub fn check(&self, from: Option<Address>, value: u128) -> Result<u128, GovernanceError> {
        match self {
            Holdings::Weighted(h) => h.check(from, value),
            Holdings::Counted(h) => h.check(from, item_id(value)?),
        }
    }

    /// Apply a change previously accepted by [`Holdings::check`].
    pub fn apply(&mut self, from: Option<Address>, to: Option<Address>, value: u128) {
        match self {
            Holdings::Weighted(h) => h.apply(from, to, value),
            Holdings::Counted(h) => {
                if let Ok(item) = item_id(value) {
                    h.apply(from, to, item)
                }
            }
        }
    }

    pub fn owner_of(&self, item: u64) -> Option<Address> {
        match self {
            Holdings::Weighted(_) => None,
            Holdings::Counted(h) => h.owner_of(item),
        }
    }

    fn units(&self) -> &dyn VotingUnits {
        match self {
            Holdings::Weighted(h) => h,
            Holdings::Counted(h) => h,
        }
    }
}

impl VotingUnits for Holdings {
    fn kind(&self) -> UnitKind {
        self.units().kind()
    }

    fn voting_units(&self, account: &Address) -> u128 {
        self.units().voting_units(account)
    }

    fn total_units(&self) -> u128 {
        self.units().total_units()
    }
}

fn item_id(value: u128) -> Result<u64, GovernanceError> {
    u64::try_from(value).map_err(|_| GovernanceError::InvalidCall(format!("item id {value} out of range")))
}
