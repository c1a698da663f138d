use std::future::Future;

use alloy::primitives::Address;
use thiserror::Error;

use super::registry::CertificationMint;
use super::TxReceipt;

#[derive(Debug, Error)]
pub enum CertifierError {
    #[error("caller is not the contract owner")]
    NotOwner,

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

/// Port for the plain certifier NFT contract (no whitelist gating,
/// no genesis token).
pub trait CertifierPort: Send + Sync {
    /// Contract owner.
    fn owner(&self) -> impl Future<Output = Result<Address, CertifierError>> + Send;

    /// Token collection name.
    fn name(&self) -> impl Future<Output = Result<String, CertifierError>> + Send;

    /// Token collection symbol.
    fn symbol(&self) -> impl Future<Output = Result<String, CertifierError>> + Send;

    /// Number of minted tokens. Zero right after deployment.
    fn total_supply(&self) -> impl Future<Output = Result<u64, CertifierError>> + Send;

    /// Mint a token for `to` with the given content URI (owner-only).
    fn mint(
        &self,
        to: Address,
        uri: &str,
    ) -> impl Future<Output = Result<(CertificationMint, TxReceipt), CertifierError>> + Send;
}
