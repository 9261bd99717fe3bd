//! Checkpoint histories.
//!
//! A [`Trace`] is an append-only sequence of `(height, votes)` pairs, strictly
//! increasing by height. Historical lookups binary-search it.

use serde::{Deserialize, Serialize};

use crate::error::GovernanceError;

/// Voting power recorded at a block height.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Checkpoint {
    /// Height the value took effect
    pub height: u64,
    /// Voting power from that height on
    pub votes: u128,
}

/// Checkpoint history of one account (or of the total supply).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Trace {
    checkpoints: Vec<Checkpoint>,
}

impl Trace {
    pub fn new() -> Self {
        Self::default()
    }

    /// Value of the most recent checkpoint, or zero.
    pub fn latest(&self) -> u128 {
        self.checkpoints.last().map(|c| c.votes).unwrap_or(0)
    }

    /// Height of the most recent checkpoint.
    pub fn latest_height(&self) -> Option<u64> {
        self.checkpoints.last().map(|c| c.height)
    }

    /// Fail unless a checkpoint may be written at `height`.
    pub fn ensure_writable(&self, height: u64) -> Result<(), GovernanceError> {
        match self.latest_height() {
            Some(latest) if latest > height => {
                Err(GovernanceError::CheckpointOutOfOrder { height, latest })
            }
            _ => Ok(()),
        }
    }

    /// Record `votes` at `height`.
    ///
    /// A second write within the same height replaces that height's value;
    /// earlier heights are never touched. Returns `(previous, new)`.
    pub fn push(&mut self, height: u64, votes: u128) -> Result<(u128, u128), GovernanceError> {
        self.ensure_writable(height)?;
        let previous = self.latest();

        match self.checkpoints.last_mut() {
            Some(last) if last.height == height => last.votes = votes,
            _ => self.checkpoints.push(Checkpoint { height, votes }),
        }

        Ok((previous, votes))
    }

    /// Value at the latest checkpoint with height <= `height`, or zero if none.
    pub fn upper_lookup(&self, height: u64) -> u128 {
        let idx = self.checkpoints.partition_point(|c| c.height <= height);
        if idx == 0 {
            0
        } else {
            self.checkpoints[idx - 1].votes
        }
    }

    pub fn len(&self) -> usize {
        self.checkpoints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.checkpoints.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<Checkpoint> {
        self.checkpoints.get(index).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Checkpoint> {
        self.checkpoints.iter()
    }
}
