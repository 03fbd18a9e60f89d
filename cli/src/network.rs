//! Network argument type for CLI commands

use clap::ValueEnum;
use psbt_validator::Network;

/// CLI argument type for network selection
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum NetworkArg {
    Btc,
    Tbtc,
}

impl From<NetworkArg> for Network {
    fn from(arg: NetworkArg) -> Self {
        match arg {
            NetworkArg::Btc => Network::Mainnet,
            NetworkArg::Tbtc => Network::Testnet,
        }
    }
}
