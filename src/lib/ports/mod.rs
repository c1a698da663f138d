pub mod certifier;
pub mod dao;
pub mod deployer;
pub mod registry;

use alloy::primitives::B256;

/// Transaction receipt information.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxReceipt {
    /// Transaction hash
    pub tx_hash: B256,
    /// Block number
    pub block_number: u64,
    /// Gas used
    pub gas_used: u64,
    /// Whether the transaction succeeded
    pub success: bool,
}
