//! Deployment orchestrator for the certification contract stack.
//!
//! Deploys the MembershipDAO, CertifierNFT and CertRegistry contracts
//! with wired constructor arguments (owner, genesis token URI, and the
//! whitelist Merkle root computed off-chain), then registers the
//! certifier in the DAO and records the addresses in deployments.toml.
//!
//! Run with:
//!   cargo run --bin deploy -- --config config.toml

use std::path::PathBuf;

use alloy::primitives::B256;
use alloy::providers::Provider;
use alloy::signers::local::PrivateKeySigner;
use clap::Parser;
use tracing::{debug, info};

mod config;

use config::{load_members, DeployConfig};

use cert_registry::adapters::deployer::EthereumDeployer;
use cert_registry::adapters::ethereum::{EthereumRpc, RpcSetupError};
use cert_registry::domain::deployment::{
    certifier_request, dao_request, registry_request, ArtifactError, CertifierParams,
    ContractArtifact, DeployRequest, RegistryParams, CERTIFIER_CONTRACT, DAO_CONTRACT,
    REGISTRY_CONTRACT,
};
use cert_registry::domain::whitelist::{WhitelistError, WhitelistTree};
use cert_registry::ports::dao::{DaoError, DaoPort};
use cert_registry::ports::deployer::{Deployed, Deployer, DeployerError};
use cert_registry::ports::registry::{RegistryError, RegistryPort};

#[derive(clap::Parser)]
#[command(name = "deploy", about = "Deploy the certification contract stack")]
struct Args {
    /// Path to the TOML configuration file.
    #[arg(long, default_value = "./config.toml")]
    config: PathBuf,

    /// Assemble the deployment recipes and print the whitelist root
    /// without sending any transaction.
    #[arg(long)]
    dry_run: bool,
}

#[derive(Debug, thiserror::Error)]
enum DeployError {
    #[error("config error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("whitelist error: {0}")]
    Whitelist(#[from] WhitelistError),

    #[error("artifact error: {0}")]
    Artifact(#[from] ArtifactError),

    #[error("rpc setup error: {0}")]
    Setup(#[from] RpcSetupError),

    #[error("deployer error: {0}")]
    Deployer(#[from] DeployerError),

    #[error("dao error: {0}")]
    Dao(#[from] DaoError),

    #[error("registry error: {0}")]
    Registry(#[from] RegistryError),

    #[error("invalid deployer key: {0}")]
    Key(String),

    #[error("RPC error: {0}")]
    Rpc(String),

    #[error("on-chain Merkle root {on_chain} does not match local root {local}")]
    RootMismatch { local: B256, on_chain: B256 },

    #[error("failed to write {0:?}: {1}")]
    WriteOut(PathBuf, std::io::Error),
}

/// Returns a block explorer link for the given transaction hash, or a raw hash if no explorer is configured.
fn tx_link(explorer_url: Option<&str>, tx_hash: B256) -> String {
    match explorer_url {
        Some(base) => format!("{base}/{tx_hash:#x}"),
        None => format!("{tx_hash:#x}"),
    }
}

/// Print a step header — called at the start of each named phase.
fn step(n: u8, total: u8, msg: &str) {
    info!("");
    info!("┌─[{n}/{total}] {msg}");
}

const TOTAL_STEPS: u8 = 8;

#[tokio::main(flavor = "multi_thread")]
async fn main() -> Result<(), DeployError> {
    // Init tracing — no timestamps or level prefix so output is clean for demos.
    tracing_subscriber::fmt()
        .without_time()
        .with_target(false)
        .with_level(false)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    // ── Step 1: Parse config ──
    step(1, TOTAL_STEPS, &format!("Loading config from {}", args.config.display()));
    let config = DeployConfig::load(&args.config)?;

    // ── Step 2: Parse deployer key ──
    step(2, TOTAL_STEPS, "Parsing deployer key...");
    let deployer_signer: PrivateKeySigner = config
        .chain
        .deployer_private_key
        .parse()
        .map_err(|e| DeployError::Key(format!("{e}")))?;
    let owner = config
        .deployment
        .owner
        .unwrap_or_else(|| deployer_signer.address());
    info!("  Deployer:  {}", deployer_signer.address());
    info!("  Owner:     {owner}");

    // ── Step 3: Build the whitelist Merkle tree ──
    step(3, TOTAL_STEPS, &format!(
        "Building whitelist from {}",
        config.deployment.whitelist.display()
    ));
    let members = load_members(&config.deployment.whitelist)?;
    for member in &members {
        debug!("  member {member}");
    }
    let whitelist = WhitelistTree::new(members)?;
    info!("  Members:     {}", whitelist.len());
    info!("  Merkle root: {}", whitelist.root());

    // ── Step 4: Load artifacts and assemble recipes ──
    step(4, TOTAL_STEPS, &format!(
        "Loading artifacts from {}",
        config.deployment.artifacts_dir.display()
    ));
    let load = |name: &str| -> Result<ContractArtifact, ArtifactError> {
        ContractArtifact::load(&config.deployment.artifacts_dir.join(format!("{name}.json")))
    };
    let dao_artifact = load(DAO_CONTRACT)?;
    let certifier_artifact = load(CERTIFIER_CONTRACT)?;
    let registry_artifact = load(REGISTRY_CONTRACT)?;

    let dao_req = dao_request(&dao_artifact)?;
    let certifier_req = certifier_request(&certifier_artifact, &CertifierParams { owner })?;
    let registry_req = registry_request(
        &registry_artifact,
        &RegistryParams::from_whitelist(
            owner,
            config.deployment.genesis_uri.clone(),
            &whitelist,
        ),
    )?;

    for request in [&dao_req, &certifier_req, &registry_req] {
        info!(
            "  {}: {} bytes of init code",
            request.contract_name,
            request.init_code().len()
        );
    }

    if args.dry_run {
        info!("");
        info!("Dry run: no transactions sent.");
        return Ok(());
    }

    // ── Step 5: Connect to the chain ──
    step(5, TOTAL_STEPS, "Connecting to the chain...");
    let provider = alloy::providers::DynProvider::new(
        alloy::providers::ProviderBuilder::new().connect_http(
            config
                .chain
                .rpc_url
                .parse()
                .map_err(|e| DeployError::Rpc(format!("invalid RPC URL: {e}")))?,
        ),
    );
    let chain_id = provider
        .get_chain_id()
        .await
        .map_err(|e| DeployError::Rpc(format!("chain ID query: {e}")))?;
    info!("  RPC:      {}", config.chain.rpc_url);
    info!("  Chain id: {chain_id}");

    // ── Step 6: Deploy contracts ──
    step(6, TOTAL_STEPS, "Deploying contracts...");
    let deployer = EthereumDeployer::new(
        &config.chain.rpc_url,
        &config.chain.deployer_private_key,
    )?;

    // Sequential sends keep the deployer nonces ordered.
    let explorer = config.chain.explorer_url.as_deref();
    let deploy_one = |req: DeployRequest| {
        let deployer = &deployer;
        async move {
            let deployed = deployer.deploy(&req).await?;
            info!("  {}:", req.contract_name);
            info!("    address: {}", deployed.address);
            info!("    tx:      {}", tx_link(explorer, deployed.tx_hash));
            Ok::<Deployed, DeployError>(deployed)
        }
    };
    let dao = deploy_one(dao_req).await?;
    let certifier = deploy_one(certifier_req).await?;
    let registry = deploy_one(registry_req).await?;

    // ── Step 7: Wire the DAO to the certifier and verify the root ──
    step(7, TOTAL_STEPS, "Registering the certifier in the DAO...");
    let rpc = EthereumRpc::new(
        &config.chain.rpc_url,
        &config.chain.deployer_private_key,
        dao.address,
        certifier.address,
        registry.address,
    )?;

    let (registration, receipt) = rpc.register_contract(certifier.address).await?;
    info!(
        "  Registered {} by {}",
        registration.contract, registration.registrant
    );
    info!("  tx: {}", tx_link(explorer, receipt.tx_hash));

    let on_chain_root = rpc.merkle_root().await?;
    if on_chain_root != whitelist.root() {
        return Err(DeployError::RootMismatch {
            local: whitelist.root(),
            on_chain: on_chain_root,
        });
    }
    info!("  Merkle root verified on-chain");

    // ── Step 8: Record deployment ──
    step(8, TOTAL_STEPS, "Recording deployment...");
    let out_path = config.out_path();
    let record = format!(
        "\
[{chain_id}]
endpoint_url = \"{}\"

[{chain_id}.address]
membership_dao_address = \"{}\"
certifier_nft_address = \"{}\"
cert_registry_address = \"{}\"

[{chain_id}.merkle]
root = \"{}\"
",
        config.chain.rpc_url,
        dao.address,
        certifier.address,
        registry.address,
        whitelist.root(),
    );
    std::fs::write(&out_path, record)
        .map_err(|e| DeployError::WriteOut(out_path.clone(), e))?;
    info!("  Wrote {}", out_path.display());

    // ── Summary ──
    info!("");
    info!("╔══════════════════════════════════════════════════════════════════╗");
    info!("║                      DEPLOYMENT COMPLETE                         ║");
    info!("╠══════════════════════════════════════════════════════════════════╣");
    info!("║  MembershipDAO  {}", dao.address);
    info!("║  CertifierNFT   {}", certifier.address);
    info!("║  CertRegistry   {}", registry.address);
    info!("║  Merkle root    {}", whitelist.root());
    info!("╚══════════════════════════════════════════════════════════════════╝");

    Ok(())
}
