//! Timelocked execution of call batches.
//!
//! An operation is scheduled by a proposer, becomes ready once its delay has
//! elapsed, and is executed at most once. A batch runs against a staged copy
//! of its target; the copy replaces the target only if every call succeeds.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use zdao_types::{Address, Hash};

use crate::clock::Clock;
use crate::error::GovernanceError;
use crate::hashing::hash_operation;
use crate::roles::{Role, RoleStore};

/// One call of a batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Call {
    pub target: Address,
    pub value: u128,
    pub calldata: Vec<u8>,
}

/// Something the timelock can execute calls against.
pub trait Dispatch: Clone {
    fn dispatch(&mut self, caller: Address, call: &Call, clock: &Clock) -> Result<(), GovernanceError>;
}

/// Scheduled operation record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimelockOperation {
    pub id: Hash,
    /// Timestamp from which the operation may execute
    pub ready_at: u64,
    pub predecessor: Hash,
    pub executed: bool,
    pub canceled: bool,
}

/// Derived state of an operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OperationState {
    Unset,
    Waiting,
    Ready,
    Done,
    Canceled,
}

/// Operation table plus the minimum delay.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimelockScheduler {
    address: Address,
    min_delay: u64,
    operations: BTreeMap<Hash, TimelockOperation>,
}

fn check_batch(targets: &[Address], values: &[u128], calldatas: &[Vec<u8>]) -> Result<(), GovernanceError> {
    if targets.is_empty() {
        return Err(GovernanceError::InvalidBatch("empty batch".to_string()));
    }
    if targets.len() != values.len() || targets.len() != calldatas.len() {
        return Err(GovernanceError::InvalidBatch(format!(
            "length mismatch: {} targets, {} values, {} calldatas",
            targets.len(),
            values.len(),
            calldatas.len()
        )));
    }
    Ok(())
}

impl TimelockScheduler {
    pub fn new(address: Address, min_delay: u64) -> Self {
        Self {
            address,
            min_delay,
            operations: BTreeMap::new(),
        }
    }

    /// Identity the timelock uses as caller of dispatched calls.
    pub fn address(&self) -> Address {
        self.address
    }

    pub fn min_delay(&self) -> u64 {
        self.min_delay
    }

    /// Schedule a batch to become ready after `delay` seconds.
    #[allow(clippy::too_many_arguments)]
    pub fn schedule(
        &mut self,
        roles: &RoleStore,
        caller: &Address,
        targets: &[Address],
        values: &[u128],
        calldatas: &[Vec<u8>],
        predecessor: Hash,
        salt: Hash,
        delay: u64,
        clock: &Clock,
    ) -> Result<Hash, GovernanceError> {
        roles.check_role(Role::Proposer, caller)?;
        check_batch(targets, values, calldatas)?;
        if delay < self.min_delay {
            return Err(GovernanceError::InsufficientDelay { delay, min_delay: self.min_delay });
        }

        let id = hash_operation(targets, values, calldatas, &predecessor, &salt);
        if let Some(existing) = self.operations.get(&id) {
            if existing.executed {
                return Err(GovernanceError::AlreadyExecuted(id));
            }
            if !existing.canceled {
                return Err(GovernanceError::TimelockAlreadyScheduled(id));
            }
        }

        let ready_at = clock.timestamp.checked_add(delay).ok_or(GovernanceError::Overflow)?;
        self.operations.insert(
            id,
            TimelockOperation {
                id,
                ready_at,
                predecessor,
                executed: false,
                canceled: false,
            },
        );

        tracing::info!("Timelock operation {} scheduled by {:x}, ready at {}", id, caller, ready_at);
        Ok(id)
    }

    /// Execute a ready batch atomically against `target`.
    #[allow(clippy::too_many_arguments)]
    pub fn execute<D: Dispatch>(
        &mut self,
        roles: &RoleStore,
        caller: &Address,
        targets: &[Address],
        values: &[u128],
        calldatas: &[Vec<u8>],
        predecessor: Hash,
        salt: Hash,
        clock: &Clock,
        target: &mut D,
    ) -> Result<Hash, GovernanceError> {
        roles.check_role_or_open(Role::Executor, caller)?;
        check_batch(targets, values, calldatas)?;

        let id = hash_operation(targets, values, calldatas, &predecessor, &salt);
        if self.is_done(&id) {
            return Err(GovernanceError::AlreadyExecuted(id));
        }
        if !self.is_ready(&id, clock.timestamp) {
            return Err(GovernanceError::TimelockNotReady(id));
        }
        if !predecessor.is_zero() && !self.is_done(&predecessor) {
            return Err(GovernanceError::PredecessorNotExecuted(predecessor));
        }

        let mut staged = target.clone();
        for (index, ((to, value), calldata)) in targets.iter().zip(values).zip(calldatas).enumerate() {
            let call = Call {
                target: *to,
                value: *value,
                calldata: calldata.clone(),
            };
            staged
                .dispatch(self.address, &call, clock)
                .map_err(|e| GovernanceError::CallFailed { index, reason: e.to_string() })?;
        }
        *target = staged;

        if let Some(op) = self.operations.get_mut(&id) {
            op.executed = true;
        }
        tracing::info!("Timelock operation {} executed by {:x} ({} calls)", id, caller, targets.len());
        Ok(id)
    }

    /// Cancel a pending operation.
    pub fn cancel(&mut self, roles: &RoleStore, caller: &Address, id: &Hash) -> Result<(), GovernanceError> {
        roles.check_role(Role::Admin, caller)?;
        let op = self
            .operations
            .get_mut(id)
            .ok_or(GovernanceError::UnknownOperation(*id))?;
        if op.executed {
            return Err(GovernanceError::AlreadyExecuted(*id));
        }
        if op.canceled {
            return Err(GovernanceError::OperationCanceled(*id));
        }
        op.canceled = true;

        tracing::info!("Timelock operation {} canceled by {:x}", id, caller);
        Ok(())
    }

    pub fn operation_state(&self, id: &Hash, now: u64) -> OperationState {
        match self.operations.get(id) {
            None => OperationState::Unset,
            Some(op) if op.executed => OperationState::Done,
            Some(op) if op.canceled => OperationState::Canceled,
            Some(op) if now >= op.ready_at => OperationState::Ready,
            Some(_) => OperationState::Waiting,
        }
    }

    /// Whether the id has ever been scheduled.
    pub fn is_operation(&self, id: &Hash) -> bool {
        self.operations.contains_key(id)
    }

    /// Scheduled and neither executed nor canceled.
    pub fn is_pending(&self, id: &Hash) -> bool {
        self.operations.get(id).map(|op| !op.executed && !op.canceled).unwrap_or(false)
    }

    /// Pending and past its ready timestamp.
    pub fn is_ready(&self, id: &Hash, now: u64) -> bool {
        self.operation_state(id, now) == OperationState::Ready
    }

    pub fn is_done(&self, id: &Hash) -> bool {
        self.operations.get(id).map(|op| op.executed).unwrap_or(false)
    }

    /// Ready timestamp of a scheduled operation.
    pub fn timestamp(&self, id: &Hash) -> Option<u64> {
        self.operations.get(id).map(|op| op.ready_at)
    }
}
