use std::fmt;
use std::str::FromStr;

use crate::bitcoin::NetworkKind;

/// The networks the signer validates transactions for.
///
/// Selects the address version bytes, the segwit human-readable part and the
/// BIP44 coin type that change paths are expected to carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Network {
    Mainnet,
    Testnet,
}

impl Network {
    pub const ALL: &'static [Network] = &[Network::Mainnet, Network::Testnet];

    pub fn all() -> &'static [Network] {
        Self::ALL
    }

    pub fn p2pkh_version(self) -> u8 {
        match self {
            Network::Mainnet => 0x00,
            Network::Testnet => 0x6f,
        }
    }

    pub fn p2sh_version(self) -> u8 {
        match self {
            Network::Mainnet => 0x05,
            Network::Testnet => 0xc4,
        }
    }

    /// Bech32 human-readable part for witness addresses
    pub fn hrp(self) -> &'static str {
        match self {
            Network::Mainnet => "bc",
            Network::Testnet => "tb",
        }
    }

    /// BIP44 coin type (hardened index without the hardening bit)
    pub fn coin_type(self) -> u32 {
        match self {
            Network::Mainnet => 0,
            Network::Testnet => 1,
        }
    }

    pub fn kind(self) -> NetworkKind {
        match self {
            Network::Mainnet => NetworkKind::Main,
            Network::Testnet => NetworkKind::Test,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Network::Mainnet => "mainnet",
            Network::Testnet => "testnet",
        }
    }
}

impl fmt::Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Network {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "mainnet" | "bitcoin" | "btc" => Ok(Network::Mainnet),
            "testnet" | "tbtc" => Ok(Network::Testnet),
            _ => Err(format!("unknown network: {}", s)),
        }
    }
}
