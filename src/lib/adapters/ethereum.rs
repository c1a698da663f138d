use alloy::{
    network::EthereumWallet,
    primitives::{Address, B256, U256},
    providers::{DynProvider, ProviderBuilder},
    signers::local::PrivateKeySigner,
    sol,
};
use thiserror::Error;

use crate::ports::{
    certifier::{CertifierError, CertifierPort},
    dao::{ContractRegistration, DaoError, DaoPort, MembershipUpdate},
    registry::{
        AddressBalance, CertificationBurn, CertificationMint, RegistryError, RegistryPort,
    },
    TxReceipt,
};

// Generate contract bindings using Alloy's sol! macro
sol! {
    #[sol(rpc)]
    interface IMembershipDao {
        function owner() external view returns (address);
        function isMember(address account) external view returns (bool);
        function memberCount() external view returns (uint256);
        function deployedContracts(uint256 index) external view returns (address);

        function addMember(address account) external;
        function removeMember(address account) external;
        function registerDeployedContract(address contractAddress) external;

        event MemberCountChanged(uint256 memberCount, address changedBy);
        event ContractRegistered(address contractAddress, address registrant);
    }

    #[sol(rpc)]
    interface ICertifierNft {
        function owner() external view returns (address);
        function name() external view returns (string memory);
        function symbol() external view returns (string memory);
        function totalSupply() external view returns (uint256);

        function mintCertifier(address to, string calldata uri) external returns (uint256);

        event CertifierMinted(address to, uint256 tokenId, string uri);
    }

    #[sol(rpc)]
    interface ICertRegistry {
        function owner() external view returns (address);
        function name() external view returns (string memory);
        function symbol() external view returns (string memory);
        function getMerkleRoot() external view returns (bytes32);
        function isMember(address account, bytes32[] calldata proof) external view returns (bool);
        function totalSupply() external view returns (uint256);
        function tokenURI(uint256 tokenId) external view returns (string memory);
        function ownerOf(uint256 tokenId) external view returns (address);
        function balanceOf(address account) external view returns (uint256);
        function hasAddressMintedCertification(address account) external view returns (bool);
        function mintCertificationValue() external view returns (uint256);
        function generationValue() external view returns (uint256);
        function getAddressBalance(address account) external view returns (uint256 certification, uint256 generation);

        function mintCertification(address to, string calldata uri) external returns (uint256);
        function deleteCertificationToken(uint256 tokenId) external;

        event CertificationMinted(address to, uint256 tokenId, string uri);
        event CertificationBurned(address owner, uint256 tokenId);
    }
}

/// Errors constructing an RPC adapter.
#[derive(Debug, Error)]
pub enum RpcSetupError {
    #[error("invalid private key: {0}")]
    Signer(String),

    #[error("invalid RPC URL: {0}")]
    Url(String),
}

/// Build a provider with a local private-key wallet.
pub(crate) fn build_provider(
    rpc_url: &str,
    private_key: &str,
) -> Result<(DynProvider, Address), RpcSetupError> {
    let signer: PrivateKeySigner = private_key
        .parse()
        .map_err(|e| RpcSetupError::Signer(format!("{e}")))?;
    let signer_address = signer.address();
    let wallet = EthereumWallet::from(signer);
    let provider = DynProvider::new(
        ProviderBuilder::new()
            .wallet(wallet)
            .connect_http(rpc_url.parse().map_err(|e| RpcSetupError::Url(format!("{e}")))?),
    );
    Ok((provider, signer_address))
}

/// Ethereum RPC adapter for the deployed contract stack.
///
/// One instance per signing identity; contract addresses are bound at
/// construction.
pub struct EthereumRpc {
    provider: DynProvider,
    dao: Address,
    certifier: Address,
    registry: Address,
    signer_address: Address,
}

impl EthereumRpc {
    /// Create a new EthereumRpc instance.
    ///
    /// # Arguments
    /// * `rpc_url` - The HTTP RPC endpoint URL
    /// * `private_key` - The private key for signing transactions
    /// * `dao` - The MembershipDAO contract address
    /// * `certifier` - The CertifierNFT contract address
    /// * `registry` - The CertRegistry contract address
    pub fn new(
        rpc_url: &str,
        private_key: &str,
        dao: Address,
        certifier: Address,
        registry: Address,
    ) -> Result<Self, RpcSetupError> {
        let (provider, signer_address) = build_provider(rpc_url, private_key)?;
        Ok(Self {
            provider,
            dao,
            certifier,
            registry,
            signer_address,
        })
    }

    /// Get the signer's address.
    pub fn signer_address(&self) -> Address {
        self.signer_address
    }

    /// Helper to convert alloy transaction receipt to our TxReceipt type.
    fn convert_receipt(receipt: &alloy::rpc::types::TransactionReceipt) -> TxReceipt {
        TxReceipt {
            tx_hash: receipt.transaction_hash,
            block_number: receipt.block_number.unwrap_or(0),
            gas_used: receipt.gas_used,
            success: receipt.status(),
        }
    }
}

impl DaoPort for EthereumRpc {
    async fn owner(&self) -> Result<Address, DaoError> {
        let dao = IMembershipDao::new(self.dao, &self.provider);
        dao.owner()
            .call()
            .await
            .map_err(|e| DaoError::ContractError(e.to_string()))
    }

    async fn is_member(&self, account: Address) -> Result<bool, DaoError> {
        let dao = IMembershipDao::new(self.dao, &self.provider);
        dao.isMember(account)
            .call()
            .await
            .map_err(|e| DaoError::ContractError(e.to_string()))
    }

    async fn member_count(&self) -> Result<u64, DaoError> {
        let dao = IMembershipDao::new(self.dao, &self.provider);
        let count = dao
            .memberCount()
            .call()
            .await
            .map_err(|e| DaoError::ContractError(e.to_string()))?;
        Ok(count.try_into().unwrap_or(u64::MAX))
    }

    async fn add_member(
        &self,
        account: Address,
    ) -> Result<(MembershipUpdate, TxReceipt), DaoError> {
        let dao = IMembershipDao::new(self.dao, &self.provider);

        let receipt = dao
            .addMember(account)
            .send()
            .await
            .map_err(|e| DaoError::TransactionFailed(e.to_string()))?
            .get_receipt()
            .await
            .map_err(|e| DaoError::TransactionFailed(e.to_string()))?;

        if !receipt.status() {
            return Err(DaoError::TransactionReverted("addMember reverted".into()));
        }

        let update = decode_membership_update(&receipt)
            .ok_or_else(|| DaoError::InvalidResponse("MemberCountChanged event not found".into()))?;

        Ok((update, Self::convert_receipt(&receipt)))
    }

    async fn remove_member(
        &self,
        account: Address,
    ) -> Result<(MembershipUpdate, TxReceipt), DaoError> {
        let dao = IMembershipDao::new(self.dao, &self.provider);

        let receipt = dao
            .removeMember(account)
            .send()
            .await
            .map_err(|e| DaoError::TransactionFailed(e.to_string()))?
            .get_receipt()
            .await
            .map_err(|e| DaoError::TransactionFailed(e.to_string()))?;

        if !receipt.status() {
            return Err(DaoError::TransactionReverted("removeMember reverted".into()));
        }

        let update = decode_membership_update(&receipt)
            .ok_or_else(|| DaoError::InvalidResponse("MemberCountChanged event not found".into()))?;

        Ok((update, Self::convert_receipt(&receipt)))
    }

    async fn register_contract(
        &self,
        contract: Address,
    ) -> Result<(ContractRegistration, TxReceipt), DaoError> {
        let dao = IMembershipDao::new(self.dao, &self.provider);

        let receipt = dao
            .registerDeployedContract(contract)
            .send()
            .await
            .map_err(|e| DaoError::TransactionFailed(e.to_string()))?
            .get_receipt()
            .await
            .map_err(|e| DaoError::TransactionFailed(e.to_string()))?;

        if !receipt.status() {
            return Err(DaoError::TransactionReverted(
                "registerDeployedContract reverted".into(),
            ));
        }

        let registration = receipt
            .inner
            .logs()
            .iter()
            .find_map(|log| {
                log.log_decode::<IMembershipDao::ContractRegistered>()
                    .ok()
                    .map(|event| {
                        let inner = event.inner;
                        ContractRegistration {
                            contract: inner.contractAddress,
                            registrant: inner.registrant,
                        }
                    })
            })
            .ok_or_else(|| {
                DaoError::InvalidResponse("ContractRegistered event not found".into())
            })?;

        Ok((registration, Self::convert_receipt(&receipt)))
    }

    async fn registered_contract(&self, index: u64) -> Result<Address, DaoError> {
        let dao = IMembershipDao::new(self.dao, &self.provider);
        dao.deployedContracts(U256::from(index))
            .call()
            .await
            .map_err(|e| DaoError::ContractError(e.to_string()))
    }
}

fn decode_membership_update(
    receipt: &alloy::rpc::types::TransactionReceipt,
) -> Option<MembershipUpdate> {
    receipt.inner.logs().iter().find_map(|log| {
        log.log_decode::<IMembershipDao::MemberCountChanged>()
            .ok()
            .map(|event| {
                let inner = event.inner;
                MembershipUpdate {
                    member_count: inner.memberCount.try_into().unwrap_or(u64::MAX),
                    changed_by: inner.changedBy,
                }
            })
    })
}

impl CertifierPort for EthereumRpc {
    async fn owner(&self) -> Result<Address, CertifierError> {
        let certifier = ICertifierNft::new(self.certifier, &self.provider);
        certifier
            .owner()
            .call()
            .await
            .map_err(|e| CertifierError::ContractError(e.to_string()))
    }

    async fn name(&self) -> Result<String, CertifierError> {
        let certifier = ICertifierNft::new(self.certifier, &self.provider);
        certifier
            .name()
            .call()
            .await
            .map_err(|e| CertifierError::ContractError(e.to_string()))
    }

    async fn symbol(&self) -> Result<String, CertifierError> {
        let certifier = ICertifierNft::new(self.certifier, &self.provider);
        certifier
            .symbol()
            .call()
            .await
            .map_err(|e| CertifierError::ContractError(e.to_string()))
    }

    async fn total_supply(&self) -> Result<u64, CertifierError> {
        let certifier = ICertifierNft::new(self.certifier, &self.provider);
        let supply = certifier
            .totalSupply()
            .call()
            .await
            .map_err(|e| CertifierError::ContractError(e.to_string()))?;
        Ok(supply.try_into().unwrap_or(u64::MAX))
    }

    async fn mint(
        &self,
        to: Address,
        uri: &str,
    ) -> Result<(CertificationMint, TxReceipt), CertifierError> {
        let certifier = ICertifierNft::new(self.certifier, &self.provider);

        let receipt = certifier
            .mintCertifier(to, uri.to_string())
            .send()
            .await
            .map_err(|e| CertifierError::TransactionFailed(e.to_string()))?
            .get_receipt()
            .await
            .map_err(|e| CertifierError::TransactionFailed(e.to_string()))?;

        if !receipt.status() {
            return Err(CertifierError::TransactionReverted(
                "mintCertifier reverted".into(),
            ));
        }

        let mint = receipt
            .inner
            .logs()
            .iter()
            .find_map(|log| {
                log.log_decode::<ICertifierNft::CertifierMinted>()
                    .ok()
                    .map(|event| {
                        let inner = event.inner;
                        CertificationMint {
                            to: inner.to,
                            token_id: inner.tokenId.try_into().unwrap_or(u64::MAX),
                            uri: inner.uri.clone(),
                        }
                    })
            })
            .ok_or_else(|| {
                CertifierError::InvalidResponse("CertifierMinted event not found".into())
            })?;

        Ok((mint, Self::convert_receipt(&receipt)))
    }
}

impl RegistryPort for EthereumRpc {
    async fn owner(&self) -> Result<Address, RegistryError> {
        let registry = ICertRegistry::new(self.registry, &self.provider);
        registry
            .owner()
            .call()
            .await
            .map_err(|e| RegistryError::ContractError(e.to_string()))
    }

    async fn name(&self) -> Result<String, RegistryError> {
        let registry = ICertRegistry::new(self.registry, &self.provider);
        registry
            .name()
            .call()
            .await
            .map_err(|e| RegistryError::ContractError(e.to_string()))
    }

    async fn symbol(&self) -> Result<String, RegistryError> {
        let registry = ICertRegistry::new(self.registry, &self.provider);
        registry
            .symbol()
            .call()
            .await
            .map_err(|e| RegistryError::ContractError(e.to_string()))
    }

    async fn merkle_root(&self) -> Result<B256, RegistryError> {
        let registry = ICertRegistry::new(self.registry, &self.provider);
        let root = registry
            .getMerkleRoot()
            .call()
            .await
            .map_err(|e| RegistryError::ContractError(e.to_string()))?;
        Ok(root)
    }

    async fn is_member(&self, account: Address, proof: &[B256]) -> Result<bool, RegistryError> {
        let registry = ICertRegistry::new(self.registry, &self.provider);
        registry
            .isMember(account, proof.to_vec())
            .call()
            .await
            .map_err(|e| RegistryError::ContractError(e.to_string()))
    }

    async fn total_supply(&self) -> Result<u64, RegistryError> {
        let registry = ICertRegistry::new(self.registry, &self.provider);
        let supply = registry
            .totalSupply()
            .call()
            .await
            .map_err(|e| RegistryError::ContractError(e.to_string()))?;
        Ok(supply.try_into().unwrap_or(u64::MAX))
    }

    async fn token_uri(&self, token_id: u64) -> Result<String, RegistryError> {
        let registry = ICertRegistry::new(self.registry, &self.provider);
        registry
            .tokenURI(U256::from(token_id))
            .call()
            .await
            .map_err(|e| RegistryError::ContractError(e.to_string()))
    }

    async fn owner_of(&self, token_id: u64) -> Result<Address, RegistryError> {
        let registry = ICertRegistry::new(self.registry, &self.provider);
        registry
            .ownerOf(U256::from(token_id))
            .call()
            .await
            .map_err(|e| RegistryError::ContractError(e.to_string()))
    }

    async fn balance_of(&self, account: Address) -> Result<u64, RegistryError> {
        let registry = ICertRegistry::new(self.registry, &self.provider);
        let balance = registry
            .balanceOf(account)
            .call()
            .await
            .map_err(|e| RegistryError::ContractError(e.to_string()))?;
        Ok(balance.try_into().unwrap_or(u64::MAX))
    }

    async fn has_minted_certification(&self, account: Address) -> Result<bool, RegistryError> {
        let registry = ICertRegistry::new(self.registry, &self.provider);
        registry
            .hasAddressMintedCertification(account)
            .call()
            .await
            .map_err(|e| RegistryError::ContractError(e.to_string()))
    }

    async fn certification_value(&self) -> Result<U256, RegistryError> {
        let registry = ICertRegistry::new(self.registry, &self.provider);
        registry
            .mintCertificationValue()
            .call()
            .await
            .map_err(|e| RegistryError::ContractError(e.to_string()))
    }

    async fn generation_value(&self) -> Result<U256, RegistryError> {
        let registry = ICertRegistry::new(self.registry, &self.provider);
        registry
            .generationValue()
            .call()
            .await
            .map_err(|e| RegistryError::ContractError(e.to_string()))
    }

    async fn address_balance(&self, account: Address) -> Result<AddressBalance, RegistryError> {
        let registry = ICertRegistry::new(self.registry, &self.provider);
        let balance = registry
            .getAddressBalance(account)
            .call()
            .await
            .map_err(|e| RegistryError::ContractError(e.to_string()))?;
        Ok(AddressBalance {
            certification: balance.certification,
            generation: balance.generation,
        })
    }

    async fn mint_certification(
        &self,
        to: Address,
        uri: &str,
    ) -> Result<(CertificationMint, TxReceipt), RegistryError> {
        let registry = ICertRegistry::new(self.registry, &self.provider);

        let receipt = registry
            .mintCertification(to, uri.to_string())
            .send()
            .await
            .map_err(|e| RegistryError::TransactionFailed(e.to_string()))?
            .get_receipt()
            .await
            .map_err(|e| RegistryError::TransactionFailed(e.to_string()))?;

        if !receipt.status() {
            return Err(RegistryError::TransactionReverted(
                "mintCertification reverted".into(),
            ));
        }

        let mint = receipt
            .inner
            .logs()
            .iter()
            .find_map(|log| {
                log.log_decode::<ICertRegistry::CertificationMinted>()
                    .ok()
                    .map(|event| {
                        let inner = event.inner;
                        CertificationMint {
                            to: inner.to,
                            token_id: inner.tokenId.try_into().unwrap_or(u64::MAX),
                            uri: inner.uri.clone(),
                        }
                    })
            })
            .ok_or_else(|| {
                RegistryError::InvalidResponse("CertificationMinted event not found".into())
            })?;

        Ok((mint, Self::convert_receipt(&receipt)))
    }

    async fn burn_certification(
        &self,
        token_id: u64,
    ) -> Result<(CertificationBurn, TxReceipt), RegistryError> {
        let registry = ICertRegistry::new(self.registry, &self.provider);

        let receipt = registry
            .deleteCertificationToken(U256::from(token_id))
            .send()
            .await
            .map_err(|e| RegistryError::TransactionFailed(e.to_string()))?
            .get_receipt()
            .await
            .map_err(|e| RegistryError::TransactionFailed(e.to_string()))?;

        if !receipt.status() {
            return Err(RegistryError::TransactionReverted(
                "deleteCertificationToken reverted".into(),
            ));
        }

        let burn = receipt
            .inner
            .logs()
            .iter()
            .find_map(|log| {
                log.log_decode::<ICertRegistry::CertificationBurned>()
                    .ok()
                    .map(|event| {
                        let inner = event.inner;
                        CertificationBurn {
                            owner: inner.owner,
                            token_id: inner.tokenId.try_into().unwrap_or(u64::MAX),
                        }
                    })
            })
            .ok_or_else(|| {
                RegistryError::InvalidResponse("CertificationBurned event not found".into())
            })?;

        Ok((burn, Self::convert_receipt(&receipt)))
    }
}
