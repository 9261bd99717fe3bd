//! Governor configuration.

use serde::{Deserialize, Serialize};

use crate::error::GovernanceError;
use crate::tally::Quorum;
use crate::units::UnitKind;

/// Parameters of one governor deployment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GovernorConfig {
    /// Governor name; also seeds the governor, timelock and token identities
    pub name: String,
    /// Blocks between proposal creation and the snapshot height
    pub voting_delay: u64,
    /// Blocks during which votes are accepted
    pub voting_period: u64,
    /// Votes a proposer needs at the previous height
    #[serde(with = "amount")]
    pub proposal_threshold: u128,
    #[serde(default)]
    pub quorum: Quorum,
    /// Timelock minimum delay in seconds
    pub min_delay: u64,
    /// Seconds after the timelock eta before a queued proposal expires
    pub expiry_window: u64,
    #[serde(default)]
    pub voting_units: UnitKind,
}

impl GovernorConfig {
    /// Local development parameters: short windows, one-hour delay, two-week expiry.
    pub fn devnet() -> Self {
        Self {
            name: "zdao".to_string(),
            voting_delay: 1,
            voting_period: 50,
            proposal_threshold: 0,
            quorum: Quorum::default(),
            min_delay: 3_600,
            expiry_window: 14 * 24 * 3_600,
            voting_units: UnitKind::Weighted,
        }
    }

    pub fn validate(&self) -> Result<(), GovernanceError> {
        if self.name.trim().is_empty() {
            return Err(GovernanceError::InvalidConfig("name cannot be empty".to_string()));
        }
        if self.voting_period == 0 {
            return Err(GovernanceError::InvalidConfig("voting period cannot be 0".to_string()));
        }
        if self.expiry_window == 0 {
            return Err(GovernanceError::InvalidConfig("expiry window cannot be 0".to_string()));
        }
        self.quorum.validate()
    }
}

/// Serde helper for `u128` amounts.
///
/// Written as decimal strings (TOML has no 128-bit integers); read from a
/// string or any integer.
pub mod amount {
    use serde::de::{self, Visitor};
    use serde::{Deserializer, Serializer};
    use std::fmt;

    pub fn serialize<S: Serializer>(value: &u128, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&value.to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u128, D::Error> {
        deserializer.deserialize_any(AmountVisitor)
    }

    struct AmountVisitor;

    impl<'de> Visitor<'de> for AmountVisitor {
        type Value = u128;

        fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
            f.write_str("a non-negative integer or decimal string")
        }

        fn visit_u64<E: de::Error>(self, v: u64) -> Result<u128, E> {
            Ok(u128::from(v))
        }

        fn visit_u128<E: de::Error>(self, v: u128) -> Result<u128, E> {
            Ok(v)
        }

        fn visit_i64<E: de::Error>(self, v: i64) -> Result<u128, E> {
            u128::try_from(v).map_err(|_| E::custom(format!("negative amount: {v}")))
        }

        fn visit_str<E: de::Error>(self, v: &str) -> Result<u128, E> {
            v.trim().parse().map_err(|_| E::custom(format!("invalid amount: {v}")))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_devnet_is_valid() {
        assert!(GovernorConfig::devnet().validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_zero_windows() {
        let mut config = GovernorConfig::devnet();
        config.expiry_window = 0;
        assert!(config.validate().is_err());

        let mut config = GovernorConfig::devnet();
        config.voting_period = 0;
        assert!(config.validate().is_err());

        let mut config = GovernorConfig::devnet();
        config.quorum = Quorum::Fraction { numerator: 150 };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_toml_roundtrip() {
        let mut config = GovernorConfig::devnet();
        config.proposal_threshold = 340_282_366_920_938_463_463_374_607_431_768_211_455;
        config.quorum = Quorum::Absolute { votes: 1_000 };
        config.voting_units = UnitKind::Counted;

        let text = toml::to_string(&config).unwrap();
        let back: GovernorConfig = toml::from_str(&text).unwrap();
        assert_eq!(back, config);
    }

    #[test]
    fn test_toml_accepts_plain_integers_and_defaults() {
        let text = r#"
            name = "dao"
            voting_delay = 1
            voting_period = 5
            proposal_threshold = 1
            min_delay = 60
            expiry_window = 600
        "#;
        let config: GovernorConfig = toml::from_str(text).unwrap();
        assert_eq!(config.proposal_threshold, 1);
        assert_eq!(config.quorum, Quorum::Fraction { numerator: 4 });
        assert_eq!(config.voting_units, UnitKind::Weighted);
    }

    #[test]
    fn test_expiry_window_is_required() {
        let text = r#"
            name = "dao"
            voting_delay = 1
            voting_period = 5
            proposal_threshold = 1
            min_delay = 60
        "#;
        assert!(toml::from_str::<GovernorConfig>(text).is_err());
    }
}
