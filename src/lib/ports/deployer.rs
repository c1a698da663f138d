use std::future::Future;

use alloy::primitives::{Address, B256};
use thiserror::Error;

use crate::domain::deployment::DeployRequest;

/// Result of a successful contract deployment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Deployed {
    /// Address of the created contract
    pub address: Address,
    /// Hash of the create transaction
    pub tx_hash: B256,
    /// Block the deployment was mined in
    pub block_number: u64,
}

#[derive(Debug, Error)]
pub enum DeployerError {
    #[error("RPC error: {0}")]
    Rpc(String),

    #[error("deployment transaction failed: {0}")]
    TransactionFailed(String),

    #[error("deployment of {0} reverted")]
    TransactionReverted(String),

    #[error("receipt for {0} carries no contract address")]
    MissingContractAddress(String),

    #[error("unknown contract: {0}")]
    UnknownContract(String),

    #[error("bad constructor arguments for {contract}: {reason}")]
    BadConstructorArgs { contract: String, reason: String },
}

/// Port for submitting create transactions.
pub trait Deployer: Send + Sync {
    /// Deploy a contract from its init code and wait for the receipt.
    fn deploy(
        &self,
        request: &DeployRequest,
    ) -> impl Future<Output = Result<Deployed, DeployerError>> + Send;
}
