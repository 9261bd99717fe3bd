//! Node configuration.
//!
//! Loaded from a TOML file; command-line flags override individual values.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use zdao_governance::GovernorConfig;
use zdao_storage::StorageConfig;
use zdao_types::Address;

/// Node configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeConfig {
    /// Data directory holding the journal and snapshot
    pub data_dir: PathBuf,
    /// Account that deploys the governor and initially owns the token
    pub admin: Address,
    /// Seconds per block when advancing the clock
    pub block_time: u64,
    /// Governor parameters (used by `init` only; afterwards the stored state wins)
    pub governor: GovernorConfig,
    /// Storage configuration
    #[serde(default)]
    pub storage: StorageConfig,
    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./data"),
            admin: Address::from_label("zdao.admin"),
            block_time: 12,
            governor: GovernorConfig::devnet(),
            storage: StorageConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

fn check_path(path: &Path) -> anyhow::Result<()> {
    if path.to_string_lossy().contains("..") {
        anyhow::bail!("Invalid path '{}': directory traversal detected", path.display());
    }
    Ok(())
}

impl NodeConfig {
    /// Load configuration from file.
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        check_path(path)?;
        let contents = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("Failed to read config file '{}': {}", path.display(), e))?;
        let config: NodeConfig = toml::from_str(&contents)
            .map_err(|e| anyhow::anyhow!("Failed to parse config file '{}': {}", path.display(), e))?;
        Ok(config)
    }

    /// Save configuration to file.
    pub fn to_file(&self, path: &Path) -> anyhow::Result<()> {
        check_path(path)?;
        let contents = toml::to_string_pretty(self)?;
        std::fs::write(path, contents)
            .map_err(|e| anyhow::anyhow!("Failed to write config file '{}': {}", path.display(), e))?;
        Ok(())
    }

    /// Validate configuration.
    pub fn validate(&self) -> anyhow::Result<()> {
        check_path(&self.data_dir)?;
        if self.block_time == 0 {
            anyhow::bail!("Block time cannot be 0");
        }
        self.governor.validate()?;
        Ok(())
    }
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level filter (e.g. "info", "zdao_governance=debug")
    pub level: String,
    /// JSON output
    pub json: bool,
    /// Log file; stdout when unset
    pub file: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "warn".to_string(),
            json: false,
            file: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config_is_valid() {
        assert!(NodeConfig::default().validate().is_ok());
    }

    #[test]
    fn test_file_roundtrip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("zdao.toml");

        let mut config = NodeConfig::default();
        config.logging.file = Some(PathBuf::from("zdao.log"));
        config.governor.proposal_threshold = 1_000;
        config.to_file(&path).unwrap();

        assert_eq!(NodeConfig::from_file(&path).unwrap(), config);
    }

    #[test]
    fn test_rejects_traversal() {
        let mut config = NodeConfig::default();
        config.data_dir = PathBuf::from("../elsewhere");
        assert!(config.validate().is_err());
        assert!(NodeConfig::from_file(Path::new("../zdao.toml")).is_err());
    }

    #[test]
    fn test_rejects_invalid_governor() {
        let mut config = NodeConfig::default();
        config.governor.expiry_window = 0;
        assert!(config.validate().is_err());
    }
}
