//! Monotonic height/timestamp source.
//!
//! Heights drive the voting windows, timestamps drive the timelock. Both only
//! move forward; expiry and readiness are evaluated lazily against them.

use serde::{Deserialize, Serialize};

use crate::error::GovernanceError;

/// Current position on the global timeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Clock {
    /// Current block height
    pub height: u64,
    /// Current timestamp in seconds
    pub timestamp: u64,
}

impl Clock {
    pub fn new(height: u64, timestamp: u64) -> Self {
        Self { height, timestamp }
    }

    /// Mine `blocks` blocks, each `seconds_per_block` apart.
    pub fn advance_blocks(&mut self, blocks: u64, seconds_per_block: u64) -> Result<(), GovernanceError> {
        let height = self.height.checked_add(blocks).ok_or(GovernanceError::Overflow)?;
        let elapsed = blocks.checked_mul(seconds_per_block).ok_or(GovernanceError::Overflow)?;
        let timestamp = self.timestamp.checked_add(elapsed).ok_or(GovernanceError::Overflow)?;
        self.height = height;
        self.timestamp = timestamp;
        Ok(())
    }

    /// Move time forward without producing blocks.
    pub fn increase_time(&mut self, seconds: u64) -> Result<(), GovernanceError> {
        self.timestamp = self.timestamp.checked_add(seconds).ok_or(GovernanceError::Overflow)?;
        Ok(())
    }

    /// Jump to an absolute position, which must not be behind the current one.
    pub fn advance_to(&mut self, height: u64, timestamp: u64) -> Result<(), GovernanceError> {
        if height < self.height || timestamp < self.timestamp {
            return Err(GovernanceError::ClockRegression {
                height: self.height,
                timestamp: self.timestamp,
                to_height: height,
                to_timestamp: timestamp,
            });
        }
        self.height = height;
        self.timestamp = timestamp;
        Ok(())
    }
}
