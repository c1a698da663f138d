//! Deployment toolkit and chain client for the certification registry
//! contracts: a simple certification NFT (`CertifierNFT`), a DAO
//! membership contract (`MembershipDAO`), and a whitelist-gated
//! certification registry (`CertRegistry`).
//!
//! The Solidity contracts are compiled and shipped separately; this
//! crate owns everything that happens off-chain:
//!
//! - the Merkle whitelist protocol (`domain::whitelist`) — leaf
//!   encoding, tree construction, proof generation — matching the
//!   on-chain `MerkleProof.verify` bit-for-bit,
//! - declarative deployment recipes (`domain::deployment`) that wire
//!   constructor arguments to contract init code,
//! - typed ports (`ports`) and their Ethereum RPC / in-memory mock
//!   adapters (`adapters`).
//!
//! The `deploy` binary orchestrates a full stack deployment from a
//! TOML config and a `whitelist.json` member file.

pub mod adapters;
pub mod domain;
pub mod ports;
