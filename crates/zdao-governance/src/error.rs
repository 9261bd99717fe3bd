use thiserror::Error;
use zdao_types::{Address, Hash};

use crate::proposal::ProposalState;
use crate::roles::Role;

/// Errors that can occur in governance operations.
///
/// Every mutating operation either applies completely or fails with one of
/// these and leaves no trace.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum GovernanceError {
    #[error("Proposer {proposer:x} has {votes} votes, below proposal threshold {threshold}")]
    InsufficientProposerVotes { proposer: Address, votes: u128, threshold: u128 },

    #[error("Proposal already exists: {0}")]
    DuplicateProposal(Hash),

    #[error("Unknown proposal: {0}")]
    UnknownProposal(Hash),

    #[error("Proposal {id} is {state}, cannot {operation}")]
    InvalidStateForOperation { id: Hash, state: ProposalState, operation: &'static str },

    #[error("Account {voter:x} already voted on proposal {id}")]
    DoubleVote { id: Hash, voter: Address },

    #[error("Lookup at height {height} is not in the past (current height {current})")]
    FutureLookup { height: u64, current: u64 },

    #[error("Timelock operation is not ready: {0}")]
    TimelockNotReady(Hash),

    #[error("Timelock operation already scheduled: {0}")]
    TimelockAlreadyScheduled(Hash),

    #[error("Already executed: {0}")]
    AlreadyExecuted(Hash),

    #[error("Account {account:x} is missing role {role}")]
    Unauthorized { account: Address, role: Role },

    #[error("Invalid proposal: {0}")]
    InvalidProposal(String),

    #[error("Invalid vote type: {0}")]
    InvalidVoteType(u8),

    #[error("Invalid timelock batch: {0}")]
    InvalidBatch(String),

    #[error("Unknown timelock operation: {0}")]
    UnknownOperation(Hash),

    #[error("Timelock operation was canceled: {0}")]
    OperationCanceled(Hash),

    #[error("Timelock delay {delay}s is below the minimum delay {min_delay}s")]
    InsufficientDelay { delay: u64, min_delay: u64 },

    #[error("Predecessor operation not executed: {0}")]
    PredecessorNotExecuted(Hash),

    #[error("Call {index} failed: {reason}")]
    CallFailed { index: usize, reason: String },

    #[error("Invalid call: {0}")]
    InvalidCall(String),

    #[error("Account {account:x} holds {have} voting units, needs {need}")]
    InsufficientUnits { account: Address, have: u128, need: u128 },

    #[error("Account {0:x} is not the token owner")]
    NotTokenOwner(Address),

    #[error("Item {0} does not exist")]
    UnknownItem(u64),

    #[error("Item {0} already exists")]
    ItemExists(u64),

    #[error("Checkpoint at height {height} would precede latest checkpoint at {latest}")]
    CheckpointOutOfOrder { height: u64, latest: u64 },

    #[error("Clock cannot move backwards: at ({height}, {timestamp}), requested ({to_height}, {to_timestamp})")]
    ClockRegression { height: u64, timestamp: u64, to_height: u64, to_timestamp: u64 },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Arithmetic overflow")]
    Overflow,
}

impl From<zdao_storage::StorageError> for GovernanceError {
    fn from(e: zdao_storage::StorageError) -> Self {
        GovernanceError::Storage(e.to_string())
    }
}
