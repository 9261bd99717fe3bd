//! ZDAO Governance - Token-weighted governance with timelocked execution.
//!
//! This crate provides:
//! - Checkpointed voting power with delegation
//! - Weighted and counted voting units
//! - Proposal lifecycle state machine and vote tallying
//! - Role-gated timelock scheduler with atomic batch execution
//! - A durable governor backed by a journal and snapshots

pub mod checkpoints;
pub mod clock;
pub mod config;
pub mod error;
pub mod governor;
pub mod hashing;
pub mod journal;
pub mod ledger;
pub mod proposal;
pub mod roles;
pub mod tally;
pub mod timelock;
pub mod token;
pub mod units;

pub use checkpoints::{Checkpoint, Trace};
pub use clock::Clock;
pub use config::GovernorConfig;
pub use error::GovernanceError;
pub use governor::{Governor, GovernorState};
pub use hashing::{hash_description, hash_operation, hash_proposal, timelock_salt};
pub use journal::{Command, CommandOutput, JournalEntry, PersistentGovernor};
pub use ledger::VotingPowerLedger;
pub use proposal::{Proposal, ProposalRegistry, ProposalState};
pub use roles::{Role, RoleStore, OPEN_ROLE};
pub use tally::{Quorum, VoteSupport, VoteTally};
pub use timelock::{Call, Dispatch, OperationState, TimelockScheduler};
pub use token::{TokenCall, VotesToken};
pub use units::{UnitKind, VotingUnits};
