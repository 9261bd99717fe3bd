//! Minimal votes-bearing asset.
//!
//! Holds balances (or items) and reports every change to the
//! [`VotingPowerLedger`] within the same step. Mint is restricted to the token
//! owner, which in a governed deployment is the timelock.

use borsh::{BorshDeserialize, BorshSerialize};
use serde::{Deserialize, Serialize};
use zdao_types::Address;

use crate::clock::Clock;
use crate::error::GovernanceError;
use crate::ledger::VotingPowerLedger;
use crate::timelock::{Call, Dispatch};
use crate::units::{Holdings, UnitKind, VotingUnits};

/// Calldata accepted by the token when targeted by a timelock call.
///
/// `value` is an amount for weighted tokens and an item id for counted ones.
#[derive(Debug, Clone, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub enum TokenCall {
    Mint { to: Address, value: u128 },
    Burn { from: Address, value: u128 },
    Transfer { to: Address, value: u128 },
}

impl TokenCall {
    pub fn encode(&self) -> Result<Vec<u8>, GovernanceError> {
        borsh::to_vec(self).map_err(|e| GovernanceError::InvalidCall(format!("cannot encode token call: {e}")))
    }

    pub fn decode(data: &[u8]) -> Result<Self, GovernanceError> {
        borsh::from_slice(data).map_err(|e| GovernanceError::InvalidCall(format!("bad token calldata: {e}")))
    }
}

/// Asset ledger plus the voting power ledger it feeds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VotesToken {
    address: Address,
    owner: Address,
    holdings: Holdings,
    ledger: VotingPowerLedger,
}

impl VotesToken {
    pub fn new(address: Address, owner: Address, kind: UnitKind) -> Self {
        Self {
            address,
            owner,
            holdings: Holdings::new(kind),
            ledger: VotingPowerLedger::new(),
        }
    }

    pub fn address(&self) -> Address {
        self.address
    }

    pub fn owner(&self) -> Address {
        self.owner
    }

    pub fn kind(&self) -> UnitKind {
        self.holdings.kind()
    }

    pub fn ledger(&self) -> &VotingPowerLedger {
        &self.ledger
    }

    fn move_holding(
        &mut self,
        from: Option<Address>,
        to: Option<Address>,
        value: u128,
        height: u64,
    ) -> Result<(), GovernanceError> {
        let units = self.holdings.check(from, value)?;
        self.ledger.on_transfer(from, to, units, height)?;
        self.holdings.apply(from, to, value);
        Ok(())
    }

    pub fn mint(&mut self, caller: &Address, to: Address, value: u128, height: u64) -> Result<(), GovernanceError> {
        if *caller != self.owner {
            return Err(GovernanceError::NotTokenOwner(*caller));
        }
        self.move_holding(None, Some(to), value, height)?;
        tracing::info!("Minted {} to {:x}", value, to);
        Ok(())
    }

    /// Burn from `from`; allowed for the holder itself and for the owner.
    pub fn burn(&mut self, caller: &Address, from: Address, value: u128, height: u64) -> Result<(), GovernanceError> {
        if *caller != from && *caller != self.owner {
            return Err(GovernanceError::NotTokenOwner(*caller));
        }
        self.move_holding(Some(from), None, value, height)?;
        tracing::info!("Burned {} from {:x}", value, from);
        Ok(())
    }

    pub fn transfer(&mut self, caller: &Address, to: Address, value: u128, height: u64) -> Result<(), GovernanceError> {
        self.move_holding(Some(*caller), Some(to), value, height)?;
        tracing::debug!("Transfer {} from {:x} to {:x}", value, caller, to);
        Ok(())
    }

    pub fn delegate(&mut self, account: Address, delegatee: Address, height: u64) -> Result<bool, GovernanceError> {
        self.ledger.delegate(account, delegatee, height)
    }

    pub fn transfer_ownership(&mut self, caller: &Address, new_owner: Address) -> Result<(), GovernanceError> {
        if *caller != self.owner {
            return Err(GovernanceError::NotTokenOwner(*caller));
        }
        tracing::info!("Token ownership moved from {:x} to {:x}", self.owner, new_owner);
        self.owner = new_owner;
        Ok(())
    }

    /// Amount held (weighted) or number of items held (counted).
    pub fn balance_of(&self, account: &Address) -> u128 {
        self.holdings.voting_units(account)
    }

    pub fn owner_of(&self, item: u64) -> Option<Address> {
        self.holdings.owner_of(item)
    }

    pub fn total_supply(&self) -> u128 {
        self.holdings.total_units()
    }

    /// Apply decoded calldata on behalf of `caller`.
    pub fn handle_call(&mut self, caller: &Address, call: TokenCall, height: u64) -> Result<(), GovernanceError> {
        match call {
            TokenCall::Mint { to, value } => self.mint(caller, to, value, height),
            TokenCall::Burn { from, value } => self.burn(caller, from, value, height),
            TokenCall::Transfer { to, value } => self.transfer(caller, to, value, height),
        }
    }
}

impl Dispatch for VotesToken {
    fn dispatch(&mut self, caller: Address, call: &Call, clock: &Clock) -> Result<(), GovernanceError> {
        if call.target != self.address {
            return Err(GovernanceError::InvalidCall(format!("no callable target at {:x}", call.target)));
        }
        if call.value != 0 {
            return Err(GovernanceError::InvalidCall("token calls carry no value".to_string()));
        }
        let decoded = TokenCall::decode(&call.calldata)?;
        self.handle_call(&caller, decoded, clock.height)
    }
}
