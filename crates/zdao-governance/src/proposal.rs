//! Proposal records and the lifecycle state machine.
//!
//! Proposals go through: Pending -> Active -> Succeeded/Defeated -> Queued -> Executed/Expired,
//! with Canceled reachable from every state before execution. Only the flags are
//! stored; the state itself is derived from them and the clock on every query.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use zdao_types::{Address, Hash};

use crate::clock::Clock;
use crate::error::GovernanceError;
use crate::tally::{VoteSupport, VoteTally};

/// Proposal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProposalState {
    /// Created, voting has not started
    Pending,
    /// Voting is open
    Active,
    /// Canceled before execution
    Canceled,
    /// Voting ended without majority or quorum
    Defeated,
    /// Voting ended with majority and quorum
    Succeeded,
    /// Scheduled on the timelock
    Queued,
    /// Queued but not executed within the expiry window
    Expired,
    /// Executed through the timelock
    Executed,
}

impl fmt::Display for ProposalState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// A recorded vote.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoteReceipt {
    pub support: VoteSupport,
    pub weight: u128,
}

/// Governance proposal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Proposal {
    pub id: Hash,
    pub proposer: Address,
    pub targets: Vec<Address>,
    pub values: Vec<u128>,
    pub calldatas: Vec<Vec<u8>>,
    pub description_hash: Hash,
    pub description: String,
    /// Voting weights are read at this height
    pub snapshot_height: u64,
    /// Last height at which votes are accepted
    pub deadline_height: u64,
    pub tally: VoteTally,
    pub receipts: BTreeMap<Address, VoteReceipt>,
    pub canceled: bool,
    pub queued: bool,
    pub executed: bool,
    /// Timelock operation id, once queued
    pub timelock_op: Option<Hash>,
    /// Timestamp the timelock operation becomes ready
    pub eta: Option<u64>,
    /// Height at creation
    pub created_at: u64,
}

impl Proposal {
    /// Derive the current state.
    ///
    /// `quorum_at` returns the quorum at a past height; it is only consulted
    /// once voting has ended and the proposal is neither canceled, executed
    /// nor queued.
    pub fn state<F>(&self, clock: &Clock, expiry_window: u64, quorum_at: F) -> Result<ProposalState, GovernanceError>
    where
        F: FnOnce(u64) -> Result<u128, GovernanceError>,
    {
        if self.canceled {
            return Ok(ProposalState::Canceled);
        }
        if self.executed {
            return Ok(ProposalState::Executed);
        }
        if clock.height <= self.snapshot_height {
            return Ok(ProposalState::Pending);
        }
        if clock.height <= self.deadline_height {
            return Ok(ProposalState::Active);
        }
        if self.queued {
            let expires_at = self.eta.map(|eta| eta.saturating_add(expiry_window));
            return Ok(match expires_at {
                Some(at) if clock.timestamp >= at => ProposalState::Expired,
                _ => ProposalState::Queued,
            });
        }

        let quorum = quorum_at(self.snapshot_height)?;
        if self.tally.vote_succeeded() && self.tally.quorum_reached(quorum) {
            Ok(ProposalState::Succeeded)
        } else {
            Ok(ProposalState::Defeated)
        }
    }

    pub fn has_voted(&self, account: &Address) -> bool {
        self.receipts.contains_key(account)
    }

    /// Record one vote. The caller has already checked that voting is open.
    pub fn record_vote(&mut self, voter: Address, support: VoteSupport, weight: u128) -> Result<(), GovernanceError> {
        if self.has_voted(&voter) {
            return Err(GovernanceError::DoubleVote { id: self.id, voter });
        }
        self.tally.record(support, weight)?;
        self.receipts.insert(voter, VoteReceipt { support, weight });
        Ok(())
    }
}

/// Append-only proposal table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProposalRegistry {
    proposals: BTreeMap<Hash, Proposal>,
    /// Ids in creation order
    order: Vec<Hash>,
}

impl ProposalRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, proposal: Proposal) -> Result<(), GovernanceError> {
        let id = proposal.id;
        if self.proposals.contains_key(&id) {
            return Err(GovernanceError::DuplicateProposal(id));
        }
        self.proposals.insert(id, proposal);
        self.order.push(id);
        Ok(())
    }

    pub fn get(&self, id: &Hash) -> Result<&Proposal, GovernanceError> {
        self.proposals.get(id).ok_or(GovernanceError::UnknownProposal(*id))
    }

    pub fn get_mut(&mut self, id: &Hash) -> Result<&mut Proposal, GovernanceError> {
        self.proposals.get_mut(id).ok_or(GovernanceError::UnknownProposal(*id))
    }

    /// Proposals in creation order.
    pub fn all(&self) -> impl Iterator<Item = &Proposal> {
        self.order.iter().filter_map(|id| self.proposals.get(id))
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}
