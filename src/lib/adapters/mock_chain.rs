//! In-memory mock of the contract stack.
//!
//! Models the observable behavior of the deployed contracts behind
//! the same ports as the RPC adapter, so deployment recipes and the
//! client library can be exercised end-to-end without a node. One
//! handle per (contract address, caller) mirrors the
//! one-adapter-per-signer convention of [`super::ethereum::EthereumRpc`].

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;

use alloy::primitives::{keccak256, Address, B256, U256};
use alloy::sol_types::SolValue;
use tokio::sync::Mutex;

use crate::domain::deployment::{
    DeployRequest, CERTIFIER_CONTRACT, DAO_CONTRACT, REGISTRY_CONTRACT,
};
use crate::domain::whitelist;
use crate::ports::{
    certifier::{CertifierError, CertifierPort},
    dao::{ContractRegistration, DaoError, DaoPort, MembershipUpdate},
    deployer::{Deployed, Deployer, DeployerError},
    registry::{
        AddressBalance, CertificationBurn, CertificationMint, RegistryError, RegistryPort,
    },
    TxReceipt,
};

/// Collection name of the registry contract.
pub const REGISTRY_NAME: &str = "CertRegistry";
/// Collection symbol of the registry contract.
pub const REGISTRY_SYMBOL: &str = "CREG";
/// Collection name of the plain certifier contract.
pub const CERTIFIER_NAME: &str = "Certifier";
/// Collection symbol of the plain certifier contract.
pub const CERTIFIER_SYMBOL: &str = "CFR";

/// Certification mint fee in wei (0.00004 ETH).
pub const CERTIFICATION_VALUE: u64 = 40_000_000_000_000;
/// Content generation fee in wei (0.00002 ETH).
pub const GENERATION_VALUE: u64 = 20_000_000_000_000;

/// Token id of the registry's genesis token.
pub const GENESIS_TOKEN_ID: u64 = 0;

/// The DAO never drops below this many members.
const MIN_MEMBERS: usize = 1;

#[derive(Debug, Clone)]
struct Token {
    owner: Address,
    uri: String,
}

#[derive(Debug)]
struct DaoState {
    owner: Address,
    members: Vec<Address>,
    registered: Vec<Address>,
}

#[derive(Debug)]
struct CertifierState {
    owner: Address,
    tokens: BTreeMap<u64, Token>,
    next_token_id: u64,
}

#[derive(Debug)]
struct RegistryState {
    owner: Address,
    merkle_root: B256,
    tokens: BTreeMap<u64, Token>,
    certified: HashSet<Address>,
    spend: HashMap<Address, AddressBalance>,
    next_token_id: u64,
}

#[derive(Debug)]
enum ContractState {
    Dao(DaoState),
    Certifier(CertifierState),
    Registry(RegistryState),
}

#[derive(Debug)]
struct ChainMeta {
    block_number: u64,
    tx_count: u64,
}

impl ChainMeta {
    fn next_receipt(&mut self) -> TxReceipt {
        self.tx_count += 1;
        self.block_number += 1;
        TxReceipt {
            tx_hash: keccak256(self.tx_count.to_be_bytes()),
            block_number: self.block_number,
            gas_used: 60_000,
            success: true,
        }
    }
}

#[derive(Debug)]
struct ChainState {
    contracts: HashMap<Address, ContractState>,
    meta: ChainMeta,
}

/// Shared in-memory chain. Cheap to clone; handles reference it.
#[derive(Clone)]
pub struct MockChain {
    state: Arc<Mutex<ChainState>>,
}

impl MockChain {
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(ChainState {
                contracts: HashMap::new(),
                meta: ChainMeta {
                    block_number: 0,
                    tx_count: 0,
                },
            })),
        }
    }

    /// Deployer handle signing as `caller`.
    pub fn deployer(&self, caller: Address) -> MockDeployer {
        MockDeployer {
            chain: self.clone(),
            caller,
        }
    }

    /// DAO handle bound to `address`, calling as `caller`.
    pub fn dao(&self, address: Address, caller: Address) -> MockDao {
        MockDao {
            chain: self.clone(),
            address,
            caller,
        }
    }

    /// Certifier handle bound to `address`, calling as `caller`.
    pub fn certifier(&self, address: Address, caller: Address) -> MockCertifier {
        MockCertifier {
            chain: self.clone(),
            address,
            caller,
        }
    }

    /// Registry handle bound to `address`, calling as `caller`.
    pub fn registry(&self, address: Address, caller: Address) -> MockRegistry {
        MockRegistry {
            chain: self.clone(),
            address,
            caller,
        }
    }
}

impl Default for MockChain {
    fn default() -> Self {
        Self::new()
    }
}

fn contract_address(n: u64) -> Address {
    Address::from_slice(&keccak256(n.to_be_bytes())[12..])
}

/// Mock implementation of the [`Deployer`] port.
///
/// Allocates a deterministic address and instantiates the matching
/// contract state from the decoded constructor arguments.
pub struct MockDeployer {
    chain: MockChain,
    caller: Address,
}

impl Deployer for MockDeployer {
    async fn deploy(&self, request: &DeployRequest) -> Result<Deployed, DeployerError> {
        let mut guard = self.chain.state.lock().await;
        let state = &mut *guard;

        let contract = match request.contract_name.as_str() {
            DAO_CONTRACT => {
                if !request.constructor_args.is_empty() {
                    return Err(DeployerError::BadConstructorArgs {
                        contract: request.contract_name.clone(),
                        reason: "constructor takes no arguments".into(),
                    });
                }
                ContractState::Dao(DaoState {
                    owner: self.caller,
                    members: vec![self.caller],
                    registered: Vec::new(),
                })
            }
            CERTIFIER_CONTRACT => {
                let owner = Address::abi_decode(&request.constructor_args).map_err(|e| {
                    DeployerError::BadConstructorArgs {
                        contract: request.contract_name.clone(),
                        reason: e.to_string(),
                    }
                })?;
                ContractState::Certifier(CertifierState {
                    owner,
                    tokens: BTreeMap::new(),
                    next_token_id: 0,
                })
            }
            REGISTRY_CONTRACT => {
                let (owner, genesis_uri, merkle_root) =
                    <(Address, String, B256)>::abi_decode_params(&request.constructor_args)
                        .map_err(|e| DeployerError::BadConstructorArgs {
                            contract: request.contract_name.clone(),
                            reason: e.to_string(),
                        })?;
                // The constructor mints the genesis token to the owner
                // and flags it as certified.
                let mut tokens = BTreeMap::new();
                tokens.insert(
                    GENESIS_TOKEN_ID,
                    Token {
                        owner,
                        uri: genesis_uri,
                    },
                );
                let mut certified = HashSet::new();
                certified.insert(owner);
                ContractState::Registry(RegistryState {
                    owner,
                    merkle_root,
                    tokens,
                    certified,
                    spend: HashMap::new(),
                    next_token_id: GENESIS_TOKEN_ID + 1,
                })
            }
            other => return Err(DeployerError::UnknownContract(other.to_string())),
        };

        let receipt = state.meta.next_receipt();
        let address = contract_address(state.meta.tx_count);
        state.contracts.insert(address, contract);

        Ok(Deployed {
            address,
            tx_hash: receipt.tx_hash,
            block_number: receipt.block_number,
        })
    }
}

/// Mock implementation of the [`DaoPort`].
pub struct MockDao {
    chain: MockChain,
    address: Address,
    caller: Address,
}

fn dao_state<'a>(
    state: &'a mut ChainState,
    address: Address,
) -> Result<&'a mut DaoState, DaoError> {
    match state.contracts.get_mut(&address) {
        Some(ContractState::Dao(dao)) => Ok(dao),
        Some(_) => Err(DaoError::ContractError(format!(
            "{address} is not a MembershipDAO"
        ))),
        None => Err(DaoError::ContractError(format!("no contract at {address}"))),
    }
}

impl DaoPort for MockDao {
    async fn owner(&self) -> Result<Address, DaoError> {
        let mut guard = self.chain.state.lock().await;
        Ok(dao_state(&mut guard, self.address)?.owner)
    }

    async fn is_member(&self, account: Address) -> Result<bool, DaoError> {
        let mut guard = self.chain.state.lock().await;
        Ok(dao_state(&mut guard, self.address)?.members.contains(&account))
    }

    async fn member_count(&self) -> Result<u64, DaoError> {
        let mut guard = self.chain.state.lock().await;
        Ok(dao_state(&mut guard, self.address)?.members.len() as u64)
    }

    async fn add_member(
        &self,
        account: Address,
    ) -> Result<(MembershipUpdate, TxReceipt), DaoError> {
        let mut guard = self.chain.state.lock().await;
        let state = &mut *guard;
        let dao = dao_state(state, self.address)?;

        if !dao.members.contains(&self.caller) {
            return Err(DaoError::NotMember);
        }
        if dao.members.contains(&account) {
            return Err(DaoError::AlreadyMember(account));
        }
        dao.members.push(account);

        let update = MembershipUpdate {
            member_count: dao.members.len() as u64,
            changed_by: self.caller,
        };
        Ok((update, state.meta.next_receipt()))
    }

    async fn remove_member(
        &self,
        account: Address,
    ) -> Result<(MembershipUpdate, TxReceipt), DaoError> {
        let mut guard = self.chain.state.lock().await;
        let state = &mut *guard;
        let dao = dao_state(state, self.address)?;

        if !dao.members.contains(&self.caller) {
            return Err(DaoError::NotMember);
        }
        let position = dao
            .members
            .iter()
            .position(|m| *m == account)
            .ok_or(DaoError::UnknownMember(account))?;
        if dao.members.len() <= MIN_MEMBERS {
            return Err(DaoError::MinimumMembership);
        }
        dao.members.remove(position);

        let update = MembershipUpdate {
            member_count: dao.members.len() as u64,
            changed_by: self.caller,
        };
        Ok((update, state.meta.next_receipt()))
    }

    async fn register_contract(
        &self,
        contract: Address,
    ) -> Result<(ContractRegistration, TxReceipt), DaoError> {
        let mut guard = self.chain.state.lock().await;
        let state = &mut *guard;
        let dao = dao_state(state, self.address)?;

        if !dao.members.contains(&self.caller) {
            return Err(DaoError::NotMember);
        }
        dao.registered.push(contract);

        let registration = ContractRegistration {
            contract,
            registrant: self.caller,
        };
        Ok((registration, state.meta.next_receipt()))
    }

    async fn registered_contract(&self, index: u64) -> Result<Address, DaoError> {
        let mut guard = self.chain.state.lock().await;
        let dao = dao_state(&mut guard, self.address)?;
        dao.registered
            .get(index as usize)
            .copied()
            .ok_or(DaoError::NoSuchContract(index))
    }
}

/// Mock implementation of the [`CertifierPort`].
pub struct MockCertifier {
    chain: MockChain,
    address: Address,
    caller: Address,
}

fn certifier_state<'a>(
    state: &'a mut ChainState,
    address: Address,
) -> Result<&'a mut CertifierState, CertifierError> {
    match state.contracts.get_mut(&address) {
        Some(ContractState::Certifier(certifier)) => Ok(certifier),
        Some(_) => Err(CertifierError::ContractError(format!(
            "{address} is not a CertifierNFT"
        ))),
        None => Err(CertifierError::ContractError(format!(
            "no contract at {address}"
        ))),
    }
}

impl CertifierPort for MockCertifier {
    async fn owner(&self) -> Result<Address, CertifierError> {
        let mut guard = self.chain.state.lock().await;
        Ok(certifier_state(&mut guard, self.address)?.owner)
    }

    async fn name(&self) -> Result<String, CertifierError> {
        let mut guard = self.chain.state.lock().await;
        certifier_state(&mut guard, self.address)?;
        Ok(CERTIFIER_NAME.to_string())
    }

    async fn symbol(&self) -> Result<String, CertifierError> {
        let mut guard = self.chain.state.lock().await;
        certifier_state(&mut guard, self.address)?;
        Ok(CERTIFIER_SYMBOL.to_string())
    }

    async fn total_supply(&self) -> Result<u64, CertifierError> {
        let mut guard = self.chain.state.lock().await;
        Ok(certifier_state(&mut guard, self.address)?.tokens.len() as u64)
    }

    async fn mint(
        &self,
        to: Address,
        uri: &str,
    ) -> Result<(CertificationMint, TxReceipt), CertifierError> {
        let mut guard = self.chain.state.lock().await;
        let state = &mut *guard;
        let certifier = certifier_state(state, self.address)?;

        if certifier.owner != self.caller {
            return Err(CertifierError::NotOwner);
        }

        let token_id = certifier.next_token_id;
        certifier.next_token_id += 1;
        certifier.tokens.insert(
            token_id,
            Token {
                owner: to,
                uri: uri.to_string(),
            },
        );

        let mint = CertificationMint {
            to,
            token_id,
            uri: uri.to_string(),
        };
        Ok((mint, state.meta.next_receipt()))
    }
}

/// Mock implementation of the [`RegistryPort`].
pub struct MockRegistry {
    chain: MockChain,
    address: Address,
    caller: Address,
}

fn registry_state<'a>(
    state: &'a mut ChainState,
    address: Address,
) -> Result<&'a mut RegistryState, RegistryError> {
    match state.contracts.get_mut(&address) {
        Some(ContractState::Registry(registry)) => Ok(registry),
        Some(_) => Err(RegistryError::ContractError(format!(
            "{address} is not a CertRegistry"
        ))),
        None => Err(RegistryError::ContractError(format!(
            "no contract at {address}"
        ))),
    }
}

impl RegistryPort for MockRegistry {
    async fn owner(&self) -> Result<Address, RegistryError> {
        let mut guard = self.chain.state.lock().await;
        Ok(registry_state(&mut guard, self.address)?.owner)
    }

    async fn name(&self) -> Result<String, RegistryError> {
        let mut guard = self.chain.state.lock().await;
        registry_state(&mut guard, self.address)?;
        Ok(REGISTRY_NAME.to_string())
    }

    async fn symbol(&self) -> Result<String, RegistryError> {
        let mut guard = self.chain.state.lock().await;
        registry_state(&mut guard, self.address)?;
        Ok(REGISTRY_SYMBOL.to_string())
    }

    async fn merkle_root(&self) -> Result<B256, RegistryError> {
        let mut guard = self.chain.state.lock().await;
        Ok(registry_state(&mut guard, self.address)?.merkle_root)
    }

    async fn is_member(&self, account: Address, proof: &[B256]) -> Result<bool, RegistryError> {
        let mut guard = self.chain.state.lock().await;
        let root = registry_state(&mut guard, self.address)?.merkle_root;
        Ok(whitelist::verify_proof(root, account, proof))
    }

    async fn total_supply(&self) -> Result<u64, RegistryError> {
        let mut guard = self.chain.state.lock().await;
        Ok(registry_state(&mut guard, self.address)?.tokens.len() as u64)
    }

    async fn token_uri(&self, token_id: u64) -> Result<String, RegistryError> {
        let mut guard = self.chain.state.lock().await;
        let registry = registry_state(&mut guard, self.address)?;
        registry
            .tokens
            .get(&token_id)
            .map(|token| token.uri.clone())
            .ok_or(RegistryError::InvalidTokenId(token_id))
    }

    async fn owner_of(&self, token_id: u64) -> Result<Address, RegistryError> {
        let mut guard = self.chain.state.lock().await;
        let registry = registry_state(&mut guard, self.address)?;
        registry
            .tokens
            .get(&token_id)
            .map(|token| token.owner)
            .ok_or(RegistryError::InvalidTokenId(token_id))
    }

    async fn balance_of(&self, account: Address) -> Result<u64, RegistryError> {
        let mut guard = self.chain.state.lock().await;
        let registry = registry_state(&mut guard, self.address)?;
        Ok(registry
            .tokens
            .values()
            .filter(|token| token.owner == account)
            .count() as u64)
    }

    async fn has_minted_certification(&self, account: Address) -> Result<bool, RegistryError> {
        let mut guard = self.chain.state.lock().await;
        Ok(registry_state(&mut guard, self.address)?
            .certified
            .contains(&account))
    }

    async fn certification_value(&self) -> Result<U256, RegistryError> {
        let mut guard = self.chain.state.lock().await;
        registry_state(&mut guard, self.address)?;
        Ok(U256::from(CERTIFICATION_VALUE))
    }

    async fn generation_value(&self) -> Result<U256, RegistryError> {
        let mut guard = self.chain.state.lock().await;
        registry_state(&mut guard, self.address)?;
        Ok(U256::from(GENERATION_VALUE))
    }

    async fn address_balance(&self, account: Address) -> Result<AddressBalance, RegistryError> {
        let mut guard = self.chain.state.lock().await;
        let registry = registry_state(&mut guard, self.address)?;
        Ok(registry.spend.get(&account).cloned().unwrap_or_default())
    }

    async fn mint_certification(
        &self,
        to: Address,
        uri: &str,
    ) -> Result<(CertificationMint, TxReceipt), RegistryError> {
        let mut guard = self.chain.state.lock().await;
        let state = &mut *guard;
        let registry = registry_state(state, self.address)?;

        if registry.certified.contains(&to) {
            return Err(RegistryError::AlreadyCertified(to));
        }

        let token_id = registry.next_token_id;
        registry.next_token_id += 1;
        registry.tokens.insert(
            token_id,
            Token {
                owner: to,
                uri: uri.to_string(),
            },
        );
        registry.certified.insert(to);
        registry.spend.entry(self.caller).or_default().certification +=
            U256::from(CERTIFICATION_VALUE);

        let mint = CertificationMint {
            to,
            token_id,
            uri: uri.to_string(),
        };
        Ok((mint, state.meta.next_receipt()))
    }

    async fn burn_certification(
        &self,
        token_id: u64,
    ) -> Result<(CertificationBurn, TxReceipt), RegistryError> {
        let mut guard = self.chain.state.lock().await;
        let state = &mut *guard;
        let registry = registry_state(state, self.address)?;

        let token = registry
            .tokens
            .get(&token_id)
            .ok_or(RegistryError::InvalidTokenId(token_id))?;
        if token.owner != self.caller {
            return Err(RegistryError::NotTokenOwner(token_id));
        }
        registry.tokens.remove(&token_id);

        let burn = CertificationBurn {
            owner: self.caller,
            token_id,
        };
        Ok((burn, state.meta.next_receipt()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::deployment::{dao_request, ContractArtifact};
    use alloy::primitives::Bytes;

    fn artifact(name: &str) -> ContractArtifact {
        ContractArtifact {
            contract_name: name.to_string(),
            abi: serde_json::json!([]),
            bytecode: Bytes::from(vec![0x60, 0x80]),
        }
    }

    #[tokio::test]
    async fn test_deploy_allocates_distinct_addresses() {
        let chain = MockChain::new();
        let deployer = chain.deployer(Address::repeat_byte(0x01));
        let request = dao_request(&artifact(DAO_CONTRACT)).unwrap();

        let first = deployer.deploy(&request).await.unwrap();
        let second = deployer.deploy(&request).await.unwrap();
        assert_ne!(first.address, second.address);
        assert!(second.block_number > first.block_number);
    }

    #[tokio::test]
    async fn test_unknown_contract_rejected() {
        let chain = MockChain::new();
        let deployer = chain.deployer(Address::repeat_byte(0x01));
        let request = DeployRequest {
            contract_name: "Unrelated".to_string(),
            bytecode: Bytes::from(vec![0x60]),
            constructor_args: Bytes::new(),
        };
        assert!(matches!(
            deployer.deploy(&request).await,
            Err(DeployerError::UnknownContract(_))
        ));
    }

    #[tokio::test]
    async fn test_dao_deployer_is_owner_and_member() {
        let chain = MockChain::new();
        let caller = Address::repeat_byte(0x01);
        let deployed = chain
            .deployer(caller)
            .deploy(&dao_request(&artifact(DAO_CONTRACT)).unwrap())
            .await
            .unwrap();

        let dao = chain.dao(deployed.address, caller);
        assert_eq!(dao.owner().await.unwrap(), caller);
        assert!(dao.is_member(caller).await.unwrap());
        assert_eq!(dao.member_count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_wrong_contract_kind_rejected() {
        let chain = MockChain::new();
        let caller = Address::repeat_byte(0x01);
        let deployed = chain
            .deployer(caller)
            .deploy(&dao_request(&artifact(DAO_CONTRACT)).unwrap())
            .await
            .unwrap();

        let registry = chain.registry(deployed.address, caller);
        assert!(matches!(
            registry.owner().await,
            Err(RegistryError::ContractError(_))
        ));
    }
}
