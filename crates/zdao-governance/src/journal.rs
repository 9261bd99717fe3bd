//! Durable governor.
//!
//! Every successful mutating operation is journaled as a [`JournalEntry`]
//! together with the clock it ran at. Recovery loads the latest snapshot and
//! replays the journal over it.

use std::path::Path;

use serde::{Deserialize, Serialize};
use zdao_storage::{StorageConfig, Store};
use zdao_types::{Address, Hash};

use crate::clock::Clock;
use crate::config::GovernorConfig;
use crate::error::GovernanceError;
use crate::governor::{Governor, GovernorState};
use crate::roles::Role;

/// A mutating governor operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Command {
    AdvanceBlocks { blocks: u64, seconds_per_block: u64 },
    IncreaseTime { seconds: u64 },
    AdvanceTo { height: u64, timestamp: u64 },
    Delegate { account: Address, delegatee: Address },
    Mint { caller: Address, to: Address, value: u128 },
    Burn { caller: Address, from: Address, value: u128 },
    Transfer { caller: Address, to: Address, value: u128 },
    TransferTokenOwnership { caller: Address, new_owner: Address },
    GrantRole { caller: Address, role: Role, account: Address },
    RevokeRole { caller: Address, role: Role, account: Address },
    RenounceRole { caller: Address, role: Role },
    Propose {
        proposer: Address,
        targets: Vec<Address>,
        values: Vec<u128>,
        calldatas: Vec<Vec<u8>>,
        description: String,
    },
    CastVote {
        voter: Address,
        id: Hash,
        support: u8,
        #[serde(default)]
        reason: String,
    },
    Queue {
        targets: Vec<Address>,
        values: Vec<u128>,
        calldatas: Vec<Vec<u8>>,
        description_hash: Hash,
    },
    Execute {
        targets: Vec<Address>,
        values: Vec<u128>,
        calldatas: Vec<Vec<u8>>,
        description_hash: Hash,
    },
    Cancel {
        caller: Address,
        targets: Vec<Address>,
        values: Vec<u128>,
        calldatas: Vec<Vec<u8>>,
        description_hash: Hash,
    },
    TimelockSchedule {
        caller: Address,
        targets: Vec<Address>,
        values: Vec<u128>,
        calldatas: Vec<Vec<u8>>,
        predecessor: Hash,
        salt: Hash,
        delay: u64,
    },
    TimelockExecute {
        caller: Address,
        targets: Vec<Address>,
        values: Vec<u128>,
        calldatas: Vec<Vec<u8>>,
        predecessor: Hash,
        salt: Hash,
    },
    TimelockCancel { caller: Address, op: Hash },
}

/// Result of a [`Command`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandOutput {
    Clock(Clock),
    /// Whether membership or delegation changed
    Changed(bool),
    /// Proposal or operation id
    Id(Hash),
    /// Vote weight counted
    Weight(u128),
    Done,
}

impl Command {
    pub fn apply(&self, gov: &mut Governor) -> Result<CommandOutput, GovernanceError> {
        Ok(match self {
            Command::AdvanceBlocks { blocks, seconds_per_block } => CommandOutput::Clock(gov.advance_blocks(*blocks, *seconds_per_block)?),
            Command::IncreaseTime { seconds } => CommandOutput::Clock(gov.increase_time(*seconds)?),
            Command::AdvanceTo { height, timestamp } => CommandOutput::Clock(gov.advance_to(*height, *timestamp)?),
            Command::Delegate { account, delegatee } => CommandOutput::Changed(gov.delegate(*account, *delegatee)?),
            Command::Mint { caller, to, value } => {
                gov.mint(*caller, *to, *value)?;
                CommandOutput::Done
            }
            Command::Burn { caller, from, value } => {
                gov.burn(*caller, *from, *value)?;
                CommandOutput::Done
            }
            Command::Transfer { caller, to, value } => {
                gov.transfer(*caller, *to, *value)?;
                CommandOutput::Done
            }
            Command::TransferTokenOwnership { caller, new_owner } => {
                gov.transfer_token_ownership(*caller, *new_owner)?;
                CommandOutput::Done
            }
            Command::GrantRole { caller, role, account } => CommandOutput::Changed(gov.grant_role(*caller, *role, *account)?),
            Command::RevokeRole { caller, role, account } => CommandOutput::Changed(gov.revoke_role(*caller, *role, *account)?),
            Command::RenounceRole { caller, role } => CommandOutput::Changed(gov.renounce_role(*caller, *role)?),
            Command::Propose { proposer, targets, values, calldatas, description } => CommandOutput::Id(gov.propose(
                *proposer,
                targets.clone(),
                values.clone(),
                calldatas.clone(),
                description.clone(),
            )?),
            Command::CastVote { voter, id, support, reason } => {
                CommandOutput::Weight(gov.cast_vote_with_reason(*voter, *id, *support, reason)?)
            }
            Command::Queue { targets, values, calldatas, description_hash } => {
                CommandOutput::Id(gov.queue(targets, values, calldatas, *description_hash)?)
            }
            Command::Execute { targets, values, calldatas, description_hash } => {
                CommandOutput::Id(gov.execute(targets, values, calldatas, *description_hash)?)
            }
            Command::Cancel { caller, targets, values, calldatas, description_hash } => {
                CommandOutput::Id(gov.cancel(*caller, targets, values, calldatas, *description_hash)?)
            }
            Command::TimelockSchedule { caller, targets, values, calldatas, predecessor, salt, delay } => CommandOutput::Id(
                gov.timelock_schedule(*caller, targets, values, calldatas, *predecessor, *salt, *delay)?,
            ),
            Command::TimelockExecute { caller, targets, values, calldatas, predecessor, salt } => {
                CommandOutput::Id(gov.timelock_execute(*caller, targets, values, calldatas, *predecessor, *salt)?)
            }
            Command::TimelockCancel { caller, op } => {
                gov.timelock_cancel(*caller, *op)?;
                CommandOutput::Done
            }
        })
    }
}

/// Journal record: a command and the clock it was applied at.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JournalEntry {
    pub height: u64,
    pub timestamp: u64,
    pub command: Command,
}

/// Governor whose state survives restarts.
pub struct PersistentGovernor {
    governor: Governor,
    store: Store<GovernorState, JournalEntry>,
}

impl PersistentGovernor {
    /// Deploy a new governor in `dir`, which must not hold one already.
    pub fn create(
        dir: &Path,
        storage: StorageConfig,
        config: GovernorConfig,
        admin: Address,
    ) -> Result<Self, GovernanceError> {
        let (store, recovered) = Store::<GovernorState, JournalEntry>::open(dir, storage)?;
        if recovered.snapshot.is_some() || !recovered.entries.is_empty() {
            return Err(GovernanceError::Storage(format!(
                "{} already holds a governor",
                dir.display()
            )));
        }

        let governor = Governor::new(config, admin)?;
        store.snapshot(governor.as_state())?;
        Ok(Self { governor, store })
    }

    /// Recover the governor stored in `dir`.
    pub fn open(dir: &Path, storage: StorageConfig) -> Result<Self, GovernanceError> {
        let (store, recovered) = Store::<GovernorState, JournalEntry>::open(dir, storage)?;
        let state = recovered.snapshot.ok_or_else(|| {
            GovernanceError::Storage(format!("no governor snapshot in {}", dir.display()))
        })?;

        let mut governor = Governor::from_state(state)?;
        let replayed = recovered.entries.len();
        for (index, entry) in recovered.entries.into_iter().enumerate() {
            let clock = governor.clock();
            if clock.height != entry.height || clock.timestamp != entry.timestamp {
                return Err(GovernanceError::Storage(format!(
                    "replay diverged at entry {index}: journal clock ({}, {}), state clock ({}, {})",
                    entry.height, entry.timestamp, clock.height, clock.timestamp
                )));
            }
            entry.command.apply(&mut governor).map_err(|e| {
                GovernanceError::Storage(format!("replay diverged at entry {index}: {e}"))
            })?;
        }

        tracing::info!(
            "Recovered governor {:x} at height {} ({} journal entries replayed)",
            governor.address(),
            governor.clock().height,
            replayed
        );
        Ok(Self { governor, store })
    }

    /// Apply a command and journal it. Failed commands are not journaled.
    ///
    /// Once the journal append succeeds the command is committed; a failed
    /// periodic snapshot after that point is logged and retried on the next
    /// command.
    pub fn apply(&mut self, command: Command) -> Result<CommandOutput, GovernanceError> {
        let clock = self.governor.clock();
        let seq = self.store.last_seq();
        // Governor operations stage their own changes; a failing command leaves it untouched.
        let output = command.apply(&mut self.governor)?;

        let entry = JournalEntry {
            height: clock.height,
            timestamp: clock.timestamp,
            command,
        };
        let snapshot_due = match self.store.append(&entry) {
            Ok(due) => due,
            Err(e) => {
                tracing::error!("Journal append failed, reloading governor from disk: {}", e);
                self.reload()?;
                if self.store.last_seq() > seq {
                    return Ok(output);
                }
                return Err(e.into());
            }
        };

        if snapshot_due {
            if let Err(e) = self.store.snapshot(self.governor.as_state()) {
                tracing::warn!("Snapshot after seq {} failed, journal kept: {}", self.store.last_seq(), e);
            }
        }
        Ok(output)
    }

    /// Rebuild the in-memory governor from the snapshot and journal on disk.
    fn reload(&mut self) -> Result<(), GovernanceError> {
        let dir = self.store.path().to_path_buf();
        let storage = self.store.config().clone();
        *self = Self::open(&dir, storage)?;
        Ok(())
    }

    /// Write a snapshot now and drop the journal.
    pub fn compact(&self) -> Result<(), GovernanceError> {
        self.store.snapshot(self.governor.as_state())?;
        Ok(())
    }

    pub fn governor(&self) -> &Governor {
        &self.governor
    }

    /// Sequence number of the last journaled command.
    pub fn last_seq(&self) -> u64 {
        self.store.last_seq()
    }

    pub fn data_dir(&self) -> &Path {
        self.store.path()
    }
}
