use std::path::{Path, PathBuf};

use alloy::primitives::Address;
use serde::Deserialize;

/// Top-level deployment configuration loaded from TOML.
#[derive(Debug, Deserialize)]
pub struct DeployConfig {
    pub chain: ChainConfig,
    pub deployment: DeploymentConfig,
}

/// Chain connection configuration.
#[derive(Debug, Deserialize)]
pub struct ChainConfig {
    pub rpc_url: String,
    pub deployer_private_key: String,
    /// Block explorer base URL for transaction links (e.g. "https://sepolia.etherscan.io/tx").
    /// When absent, raw tx hashes are printed instead.
    pub explorer_url: Option<String>,
}

/// Parameters for the contract stack.
#[derive(Debug, Deserialize)]
pub struct DeploymentConfig {
    /// Contract owner. Defaults to the deployer address when absent.
    pub owner: Option<Address>,
    /// Content URI of the registry's genesis token.
    pub genesis_uri: String,
    /// Path to the whitelist member file (JSON, `{ "members": [...] }`).
    pub whitelist: PathBuf,
    /// Directory holding the compiled contract artifacts.
    pub artifacts_dir: PathBuf,
    /// Where to record deployed addresses. Defaults to "deployments.toml".
    pub out: Option<PathBuf>,
}

/// Errors from config loading and validation.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("failed to parse whitelist file: {0}")]
    WhitelistParse(#[from] serde_json::Error),

    #[error("validation error: {0}")]
    Validation(String),
}

impl DeployConfig {
    /// Load and validate a config from a TOML file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration invariants.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.chain.rpc_url.is_empty() {
            return Err(ConfigError::Validation("chain.rpc_url must be set".into()));
        }
        if self.chain.deployer_private_key.is_empty() {
            return Err(ConfigError::Validation(
                "chain.deployer_private_key must be set".into(),
            ));
        }
        if self.deployment.genesis_uri.is_empty() {
            return Err(ConfigError::Validation(
                "deployment.genesis_uri must be set".into(),
            ));
        }
        Ok(())
    }

    /// Output path for the deployment record.
    pub fn out_path(&self) -> PathBuf {
        self.deployment
            .out
            .clone()
            .unwrap_or_else(|| PathBuf::from("deployments.toml"))
    }
}

/// Whitelist member file, as consumed by the registry module.
#[derive(Debug, Deserialize)]
struct MembersFile {
    members: Vec<Address>,
}

/// Load whitelist member addresses from a JSON file.
pub fn load_members(path: &Path) -> Result<Vec<Address>, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    let file: MembersFile = serde_json::from_str(&content)?;
    Ok(file.members)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_minimal_config() {
        let toml = r#"
[chain]
rpc_url = "http://localhost:8545"
deployer_private_key = "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80"

[deployment]
genesis_uri = "bafybeigdyrzt5sfp7udm7hu76uh7y26nf3efuylqabf3oclgtqy55fbzdi"
whitelist = "whitelist.json"
artifacts_dir = "artifacts"
"#;
        let config: DeployConfig = toml::from_str(toml).unwrap();
        config.validate().unwrap();
        assert!(config.deployment.owner.is_none());
        assert_eq!(config.out_path(), PathBuf::from("deployments.toml"));
    }

    #[test]
    fn test_missing_genesis_uri_rejected() {
        let toml = r#"
[chain]
rpc_url = "http://localhost:8545"
deployer_private_key = "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80"

[deployment]
genesis_uri = ""
whitelist = "whitelist.json"
artifacts_dir = "artifacts"
"#;
        let config: DeployConfig = toml::from_str(toml).unwrap();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("genesis_uri"));
    }

    #[test]
    fn test_explicit_owner_parsed() {
        let toml = r#"
[chain]
rpc_url = "http://localhost:8545"
deployer_private_key = "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80"

[deployment]
owner = "0x9e7dd23be678960fd1a4873c35a87d1ee4f3d63e"
genesis_uri = "bafybeigdyrzt5sfp7udm7hu76uh7y26nf3efuylqabf3oclgtqy55fbzdi"
whitelist = "whitelist.json"
artifacts_dir = "artifacts"
out = "target/deployments.toml"
"#;
        let config: DeployConfig = toml::from_str(toml).unwrap();
        config.validate().unwrap();
        assert!(config.deployment.owner.is_some());
        assert_eq!(config.out_path(), PathBuf::from("target/deployments.toml"));
    }
}
