//! Vote accumulation and outcome rules.

use serde::{Deserialize, Serialize};

use crate::error::GovernanceError;

/// Denominator of [`Quorum::Fraction`].
pub const QUORUM_DENOMINATOR: u128 = 100;

/// Vote direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u8)]
pub enum VoteSupport {
    Against = 0,
    For = 1,
    Abstain = 2,
}

impl TryFrom<u8> for VoteSupport {
    type Error = GovernanceError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(VoteSupport::Against),
            1 => Ok(VoteSupport::For),
            2 => Ok(VoteSupport::Abstain),
            other => Err(GovernanceError::InvalidVoteType(other)),
        }
    }
}

/// Participation needed for a proposal to pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Quorum {
    /// Percentage of the total supply at the snapshot height
    Fraction { numerator: u8 },
    /// Fixed number of votes
    Absolute {
        #[serde(with = "crate::config::amount")]
        votes: u128,
    },
}

impl Default for Quorum {
    fn default() -> Self {
        Quorum::Fraction { numerator: 4 }
    }
}

impl Quorum {
    pub fn validate(&self) -> Result<(), GovernanceError> {
        match self {
            Quorum::Fraction { numerator } if u128::from(*numerator) > QUORUM_DENOMINATOR => Err(
                GovernanceError::InvalidConfig(format!("quorum numerator {numerator} exceeds {QUORUM_DENOMINATOR}")),
            ),
            _ => Ok(()),
        }
    }

    /// Votes required given the total supply at the snapshot, rounded down.
    pub fn votes_required(&self, total_supply: u128) -> u128 {
        match *self {
            Quorum::Fraction { numerator } => {
                let n = u128::from(numerator);
                (total_supply / QUORUM_DENOMINATOR) * n + (total_supply % QUORUM_DENOMINATOR) * n / QUORUM_DENOMINATOR
            }
            Quorum::Absolute { votes } => votes,
        }
    }
}

/// Running totals for one proposal.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoteTally {
    pub for_votes: u128,
    pub against_votes: u128,
    pub abstain_votes: u128,
}

impl VoteTally {
    pub fn record(&mut self, support: VoteSupport, weight: u128) -> Result<(), GovernanceError> {
        let bucket = match support {
            VoteSupport::For => &mut self.for_votes,
            VoteSupport::Against => &mut self.against_votes,
            VoteSupport::Abstain => &mut self.abstain_votes,
        };
        *bucket = bucket.checked_add(weight).ok_or(GovernanceError::Overflow)?;
        Ok(())
    }

    /// Participation counted towards quorum; saturates instead of overflowing.
    pub fn total(&self) -> u128 {
        self.for_votes
            .saturating_add(self.against_votes)
            .saturating_add(self.abstain_votes)
    }

    /// Abstentions count towards quorum.
    pub fn quorum_reached(&self, quorum: u128) -> bool {
        self.total() >= quorum
    }

    /// Strict majority of for over against; abstentions do not count.
    pub fn vote_succeeded(&self) -> bool {
        self.for_votes > self.against_votes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_support_from_u8() {
        assert_eq!(VoteSupport::try_from(1).unwrap(), VoteSupport::For);
        assert_eq!(VoteSupport::try_from(3), Err(GovernanceError::InvalidVoteType(3)));
    }

    #[test]
    fn test_fraction_rounds_down() {
        let quorum = Quorum::Fraction { numerator: 4 };
        assert_eq!(quorum.votes_required(2_000), 80);
        assert_eq!(quorum.votes_required(99), 3);
        assert_eq!(quorum.votes_required(0), 0);
        assert_eq!(
            Quorum::Fraction { numerator: 100 }.votes_required(u128::MAX),
            u128::MAX
        );
    }

    #[test]
    fn test_absolute_ignores_supply() {
        let quorum = Quorum::Absolute { votes: 500 };
        assert_eq!(quorum.votes_required(1), 500);
        assert_eq!(quorum.votes_required(1_000_000), 500);
    }

    #[test]
    fn test_validate_numerator() {
        assert!(Quorum::Fraction { numerator: 100 }.validate().is_ok());
        assert!(Quorum::Fraction { numerator: 101 }.validate().is_err());
    }

    #[test]
    fn test_outcome_rules() {
        let mut tally = VoteTally::default();
        tally.record(VoteSupport::For, 1_500).unwrap();
        tally.record(VoteSupport::Against, 500).unwrap();
        tally.record(VoteSupport::Abstain, 100).unwrap();

        assert!(tally.vote_succeeded());
        assert!(tally.quorum_reached(2_100));
        assert!(!tally.quorum_reached(2_101));

        let tie = VoteTally { for_votes: 5, against_votes: 5, abstain_votes: 0 };
        assert!(!tie.vote_succeeded());
    }

    #[test]
    fn test_quorum_serde_forms() {
        let fraction: Quorum = serde_json::from_str(r#"{"type":"fraction","numerator":10}"#).unwrap();
        assert_eq!(fraction, Quorum::Fraction { numerator: 10 });

        let absolute: Quorum = serde_json::from_str(r#"{"type":"absolute","votes":"1000"}"#).unwrap();
        assert_eq!(absolute, Quorum::Absolute { votes: 1_000 });
    }
}
