use alloy::network::TransactionBuilder;
use alloy::primitives::Address;
use alloy::providers::{DynProvider, Provider};
use alloy::rpc::types::TransactionRequest;
use tracing::debug;

use super::ethereum::{build_provider, RpcSetupError};
use crate::domain::deployment::DeployRequest;
use crate::ports::deployer::{Deployed, Deployer, DeployerError};

/// Deploys contracts by submitting raw create transactions.
pub struct EthereumDeployer {
    provider: DynProvider,
    signer_address: Address,
}

impl EthereumDeployer {
    pub fn new(rpc_url: &str, private_key: &str) -> Result<Self, RpcSetupError> {
        let (provider, signer_address) = build_provider(rpc_url, private_key)?;
        Ok(Self {
            provider,
            signer_address,
        })
    }

    /// Get the deployer's signing address.
    pub fn signer_address(&self) -> Address {
        self.signer_address
    }
}

impl Deployer for EthereumDeployer {
    async fn deploy(&self, request: &DeployRequest) -> Result<Deployed, DeployerError> {
        let init_code = request.init_code();
        debug!(
            contract = %request.contract_name,
            init_code_len = init_code.len(),
            "submitting create transaction"
        );

        let tx = TransactionRequest::default().with_deploy_code(init_code);

        let receipt = self
            .provider
            .send_transaction(tx)
            .await
            .map_err(|e| DeployerError::TransactionFailed(e.to_string()))?
            .get_receipt()
            .await
            .map_err(|e| DeployerError::TransactionFailed(e.to_string()))?;

        if !receipt.status() {
            return Err(DeployerError::TransactionReverted(
                request.contract_name.clone(),
            ));
        }

        let address = receipt.contract_address.ok_or_else(|| {
            DeployerError::MissingContractAddress(request.contract_name.clone())
        })?;

        Ok(Deployed {
            address,
            tx_hash: receipt.transaction_hash,
            block_number: receipt.block_number.unwrap_or(0),
        })
    }
}
