pub mod deployer;
pub mod ethereum;
pub mod mock_chain;
