use std::future::Future;

use alloy::primitives::{Address, B256, U256};
use thiserror::Error;

use super::TxReceipt;

/// Mint data from a `CertificationMinted` event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CertificationMint {
    /// Recipient of the certification
    pub to: Address,
    /// Token id assigned to it
    pub token_id: u64,
    /// Content URI stored with the token
    pub uri: String,
}

/// Burn data from a `CertificationBurned` event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CertificationBurn {
    /// Owner that burned the token
    pub owner: Address,
    /// The burned token id
    pub token_id: u64,
}

/// Fee counters tracked per address.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AddressBalance {
    /// Total paid for certification mints
    pub certification: U256,
    /// Total paid for content generation
    pub generation: U256,
}

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("invalid token id: {0}")]
    InvalidTokenId(u64),

    #[error("caller does not own token {0}")]
    NotTokenOwner(u64),

    #[error("address already holds a certification: {0}")]
    AlreadyCertified(Address),

    #[error("RPC error: {0}")]
    Rpc(String),

    #[error("transaction failed: {0}")]
    TransactionFailed(String),

    #[error("transaction reverted: {0}")]
    TransactionReverted(String),

    #[error("contract error: {0}")]
    ContractError(String),

    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

/// Port for the whitelist-gated certification registry contract.
pub trait RegistryPort: Send + Sync {
    // ========== Reads ==========

    /// Contract owner (the deployer).
    fn owner(&self) -> impl Future<Output = Result<Address, RegistryError>> + Send;

    /// Token collection name.
    fn name(&self) -> impl Future<Output = Result<String, RegistryError>> + Send;

    /// Token collection symbol.
    fn symbol(&self) -> impl Future<Output = Result<String, RegistryError>> + Send;

    /// Whitelist Merkle root committed at deployment.
    fn merkle_root(&self) -> impl Future<Output = Result<B256, RegistryError>> + Send;

    /// Verify whitelist membership with a Merkle proof.
    fn is_member(
        &self,
        account: Address,
        proof: &[B256],
    ) -> impl Future<Output = Result<bool, RegistryError>> + Send;

    /// Number of live tokens.
    fn total_supply(&self) -> impl Future<Output = Result<u64, RegistryError>> + Send;

    /// Content URI of a token.
    fn token_uri(
        &self,
        token_id: u64,
    ) -> impl Future<Output = Result<String, RegistryError>> + Send;

    /// Owner of a token. Fails with [`RegistryError::InvalidTokenId`]
    /// for burned or never-minted ids.
    fn owner_of(
        &self,
        token_id: u64,
    ) -> impl Future<Output = Result<Address, RegistryError>> + Send;

    /// Number of tokens held by `account`.
    fn balance_of(
        &self,
        account: Address,
    ) -> impl Future<Output = Result<u64, RegistryError>> + Send;

    /// Whether `account` has ever been issued a certification.
    fn has_minted_certification(
        &self,
        account: Address,
    ) -> impl Future<Output = Result<bool, RegistryError>> + Send;

    /// Fee for minting a certification, in wei.
    fn certification_value(&self) -> impl Future<Output = Result<U256, RegistryError>> + Send;

    /// Fee for content generation, in wei.
    fn generation_value(&self) -> impl Future<Output = Result<U256, RegistryError>> + Send;

    /// Accumulated fee spend of `account`.
    fn address_balance(
        &self,
        account: Address,
    ) -> impl Future<Output = Result<AddressBalance, RegistryError>> + Send;

    // ========== Writes ==========

    /// Mint a certification token for `to`. One certification per
    /// address; ids are assigned from a monotonic counter.
    fn mint_certification(
        &self,
        to: Address,
        uri: &str,
    ) -> impl Future<Output = Result<(CertificationMint, TxReceipt), RegistryError>> + Send;

    /// Burn a certification token. Only the token owner may burn it.
    fn burn_certification(
        &self,
        token_id: u64,
    ) -> impl Future<Output = Result<(CertificationBurn, TxReceipt), RegistryError>> + Send;
}
