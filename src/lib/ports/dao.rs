use std::future::Future;

use alloy::primitives::Address;
use thiserror::Error;

use super::TxReceipt;

/// Membership change data from a `MemberCountChanged` event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MembershipUpdate {
    /// Member count after the change
    pub member_count: u64,
    /// The member that performed the change
    pub changed_by: Address,
}

/// Registration data from a `ContractRegistered` event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContractRegistration {
    /// The registered contract address
    pub contract: Address,
    /// The member that registered it
    pub registrant: Address,
}

#[derive(Debug, Error)]
pub enum DaoError {
    #[error("caller is not a DAO member")]
    NotMember,

    #[error("already a member: {0}")]
    AlreadyMember(Address),

    #[error("not a member: {0}")]
    UnknownMember(Address),

    #[error("minimum member count reached")]
    MinimumMembership,

    #[error("no registered contract at index {0}")]
    NoSuchContract(u64),

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

/// Port for the DAO membership contract.
///
/// Implementations bind a contract address and a calling identity at
/// construction; member-gated operations are checked against that
/// caller on-chain (or by the mock).
pub trait DaoPort: Send + Sync {
    /// Contract owner (the deployer).
    fn owner(&self) -> impl Future<Output = Result<Address, DaoError>> + Send;

    /// Whether `account` is currently a member.
    fn is_member(
        &self,
        account: Address,
    ) -> impl Future<Output = Result<bool, DaoError>> + Send;

    /// Current number of members.
    fn member_count(&self) -> impl Future<Output = Result<u64, DaoError>> + Send;

    /// Add a member (member-only).
    fn add_member(
        &self,
        account: Address,
    ) -> impl Future<Output = Result<(MembershipUpdate, TxReceipt), DaoError>> + Send;

    /// Remove a member (member-only; the DAO never drops below one member).
    fn remove_member(
        &self,
        account: Address,
    ) -> impl Future<Output = Result<(MembershipUpdate, TxReceipt), DaoError>> + Send;

    /// Record a deployed contract address (member-only).
    fn register_contract(
        &self,
        contract: Address,
    ) -> impl Future<Output = Result<(ContractRegistration, TxReceipt), DaoError>> + Send;

    /// Registered contract at `index`, in registration order.
    fn registered_contract(
        &self,
        index: u64,
    ) -> impl Future<Output = Result<Address, DaoError>> + Send;
}
