//! Declarative deployment recipes.
//!
//! Each contract module pairs a compiled artifact with its constructor
//! parameters and produces a [`DeployRequest`] — the init code a
//! [`crate::ports::deployer::Deployer`] can submit as a create
//! transaction. Parameter assembly is kept separate from execution so
//! the wiring can be tested without a node.

use std::path::{Path, PathBuf};

use alloy::primitives::{Address, Bytes, B256};
use alloy::sol_types::SolValue;
use serde::Deserialize;
use thiserror::Error;

use super::whitelist::WhitelistTree;

/// Contract name expected by the DAO module.
pub const DAO_CONTRACT: &str = "MembershipDAO";
/// Contract name expected by the certifier NFT module.
pub const CERTIFIER_CONTRACT: &str = "CertifierNFT";
/// Contract name expected by the registry module.
pub const REGISTRY_CONTRACT: &str = "CertRegistry";

#[derive(Debug, Error)]
pub enum ArtifactError {
    #[error("failed to read artifact {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse artifact {path:?}: {reason}")]
    Parse { path: PathBuf, reason: String },

    #[error("artifact {0} has no deployable bytecode")]
    MissingBytecode(String),

    #[error("expected artifact for {expected}, found {found}")]
    WrongContract { expected: String, found: String },
}

/// A compiled contract artifact.
///
/// Accepts both artifact shapes in the wild: `"bytecode": "0x..."`
/// and `"bytecode": { "object": "0x..." }`. When the JSON carries no
/// `contractName`, the file stem is used.
#[derive(Debug, Clone)]
pub struct ContractArtifact {
    pub contract_name: String,
    pub abi: serde_json::Value,
    pub bytecode: Bytes,
}

#[derive(Deserialize)]
struct RawArtifact {
    #[serde(rename = "contractName")]
    contract_name: Option<String>,
    abi: serde_json::Value,
    bytecode: RawBytecode,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawBytecode {
    Hex(String),
    Object { object: String },
}

impl ContractArtifact {
    /// Load an artifact from a compiler-output JSON file.
    pub fn load(path: &Path) -> Result<Self, ArtifactError> {
        let content = std::fs::read_to_string(path).map_err(|source| ArtifactError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let name_hint = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        Self::from_json(&name_hint, &content).map_err(|err| match err {
            ArtifactError::Parse { reason, .. } => ArtifactError::Parse {
                path: path.to_path_buf(),
                reason,
            },
            other => other,
        })
    }

    /// Parse an artifact from a JSON string, falling back to
    /// `name_hint` when the document has no `contractName`.
    pub fn from_json(name_hint: &str, json: &str) -> Result<Self, ArtifactError> {
        let raw: RawArtifact = serde_json::from_str(json).map_err(|e| ArtifactError::Parse {
            path: PathBuf::from(name_hint),
            reason: e.to_string(),
        })?;

        let contract_name = raw
            .contract_name
            .unwrap_or_else(|| name_hint.to_string());
        let hex = match raw.bytecode {
            RawBytecode::Hex(s) => s,
            RawBytecode::Object { object } => object,
        };
        let bytecode: Bytes = hex.parse().map_err(|e| ArtifactError::Parse {
            path: PathBuf::from(&contract_name),
            reason: format!("bad bytecode hex: {e}"),
        })?;
        if bytecode.is_empty() {
            return Err(ArtifactError::MissingBytecode(contract_name));
        }

        Ok(Self {
            contract_name,
            abi: raw.abi,
            bytecode,
        })
    }
}

/// A contract deployment ready for submission.
#[derive(Debug, Clone)]
pub struct DeployRequest {
    pub contract_name: String,
    pub bytecode: Bytes,
    pub constructor_args: Bytes,
}

impl DeployRequest {
    /// Creation code: bytecode followed by the ABI-encoded args.
    pub fn init_code(&self) -> Bytes {
        let mut code = Vec::with_capacity(self.bytecode.len() + self.constructor_args.len());
        code.extend_from_slice(&self.bytecode);
        code.extend_from_slice(&self.constructor_args);
        code.into()
    }
}

/// Constructor parameters for the certifier NFT module.
#[derive(Debug, Clone)]
pub struct CertifierParams {
    pub owner: Address,
}

/// Constructor parameters for the registry module.
#[derive(Debug, Clone)]
pub struct RegistryParams {
    pub owner: Address,
    pub genesis_uri: String,
    pub merkle_root: B256,
}

impl RegistryParams {
    /// Wire the Merkle root from a whitelist tree.
    pub fn from_whitelist(owner: Address, genesis_uri: String, whitelist: &WhitelistTree) -> Self {
        Self {
            owner,
            genesis_uri,
            merkle_root: whitelist.root(),
        }
    }
}

fn check_name(artifact: &ContractArtifact, expected: &str) -> Result<(), ArtifactError> {
    if artifact.contract_name != expected {
        return Err(ArtifactError::WrongContract {
            expected: expected.to_string(),
            found: artifact.contract_name.clone(),
        });
    }
    Ok(())
}

/// DAO module: `MembershipDAO()`. The deployer becomes the owner and
/// first member, so the constructor takes no arguments.
pub fn dao_request(artifact: &ContractArtifact) -> Result<DeployRequest, ArtifactError> {
    check_name(artifact, DAO_CONTRACT)?;
    Ok(DeployRequest {
        contract_name: artifact.contract_name.clone(),
        bytecode: artifact.bytecode.clone(),
        constructor_args: Bytes::new(),
    })
}

/// Certifier NFT module: `CertifierNFT(address owner)`.
pub fn certifier_request(
    artifact: &ContractArtifact,
    params: &CertifierParams,
) -> Result<DeployRequest, ArtifactError> {
    check_name(artifact, CERTIFIER_CONTRACT)?;
    Ok(DeployRequest {
        contract_name: artifact.contract_name.clone(),
        bytecode: artifact.bytecode.clone(),
        constructor_args: params.owner.abi_encode().into(),
    })
}

/// Registry module: `CertRegistry(address owner, string genesisUri, bytes32 merkleRoot)`.
pub fn registry_request(
    artifact: &ContractArtifact,
    params: &RegistryParams,
) -> Result<DeployRequest, ArtifactError> {
    check_name(artifact, REGISTRY_CONTRACT)?;
    let args = (
        params.owner,
        params.genesis_uri.clone(),
        params.merkle_root,
    )
        .abi_encode_params();
    Ok(DeployRequest {
        contract_name: artifact.contract_name.clone(),
        bytecode: artifact.bytecode.clone(),
        constructor_args: args.into(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn artifact(name: &str) -> ContractArtifact {
        ContractArtifact {
            contract_name: name.to_string(),
            abi: serde_json::json!([]),
            bytecode: Bytes::from(vec![0x60, 0x80, 0x60, 0x40]),
        }
    }

    #[test]
    fn test_parse_flat_bytecode() {
        let json = r#"{"contractName":"MembershipDAO","abi":[],"bytecode":"0x6080"}"#;
        let artifact = ContractArtifact::from_json("MembershipDAO", json).unwrap();
        assert_eq!(artifact.contract_name, "MembershipDAO");
        assert_eq!(artifact.bytecode.len(), 2);
    }

    #[test]
    fn test_parse_nested_bytecode_uses_name_hint() {
        let json = r#"{"abi":[],"bytecode":{"object":"0x6080"}}"#;
        let artifact = ContractArtifact::from_json("CertRegistry", json).unwrap();
        assert_eq!(artifact.contract_name, "CertRegistry");
    }

    #[test]
    fn test_empty_bytecode_rejected() {
        let json = r#"{"contractName":"CertRegistry","abi":[],"bytecode":"0x"}"#;
        assert!(matches!(
            ContractArtifact::from_json("CertRegistry", json),
            Err(ArtifactError::MissingBytecode(_))
        ));
    }

    #[test]
    fn test_wrong_contract_rejected() {
        let err = dao_request(&artifact("CertRegistry")).unwrap_err();
        assert!(matches!(err, ArtifactError::WrongContract { .. }));
    }

    #[test]
    fn test_dao_request_has_no_args() {
        let request = dao_request(&artifact(DAO_CONTRACT)).unwrap();
        assert!(request.constructor_args.is_empty());
        assert_eq!(request.init_code(), request.bytecode);
    }

    #[test]
    fn test_certifier_args_encode_owner() {
        let owner = Address::repeat_byte(0xAB);
        let request =
            certifier_request(&artifact(CERTIFIER_CONTRACT), &CertifierParams { owner }).unwrap();
        assert_eq!(request.constructor_args.len(), 32);
        assert_eq!(&request.constructor_args[12..], owner.as_slice());
    }

    #[test]
    fn test_registry_args_wire_root_and_uri() {
        let whitelist =
            WhitelistTree::new([Address::repeat_byte(0x01), Address::repeat_byte(0x02)]).unwrap();
        let params = RegistryParams::from_whitelist(
            Address::repeat_byte(0xAB),
            "bafkreigh2akiscaildcqabsyg3dfr6chu3fgpregiymsck7e7aqa4s52zy".to_string(),
            &whitelist,
        );
        let request = registry_request(&artifact(REGISTRY_CONTRACT), &params).unwrap();
        // Static head (address, offset, bytes32) plus the string tail.
        assert!(request.constructor_args.len() > 96);
        assert_eq!(params.merkle_root, whitelist.root());
        let init = request.init_code();
        assert!(init.starts_with(&request.bytecode));
        assert!(init.ends_with(&request.constructor_args));
    }
}
