//! Liquid network parameters and wallet-wide constants.
//!
//! Address version bytes and the policy asset are not global state: every
//! [`Wallet`](crate::Wallet) is built with a [`NetworkParams`] value, so one
//! binary can target mainnet, testnet and a local regtest without recompiling.

use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use simplicityhl::elements::bitcoin::bip32::{ChildNumber, DerivationPath, Fingerprint};
use simplicityhl::elements::hashes::sha256;
use simplicityhl::elements::{AddressParams, AssetId, Sequence};

/// Policy asset id (hex, BE) for Liquid mainnet.
pub const LIQUID_POLICY_ASSET_STR: &str =
    "6f0279e9ed041c3d710a9f57d0c02928416460c4b722ae3457a11eec381c526d";

/// Policy asset id (hex, BE) for Liquid testnet.
pub const LIQUID_TESTNET_POLICY_ASSET_STR: &str =
    "144c654344aa716d6f3abcc1ca90e5641e4e2a7f633bc09fe3baf64585819a49";

/// Policy asset id (hex, BE) for Elements regtest.
pub const LIQUID_DEFAULT_REGTEST_ASSET_STR: &str =
    "5ac9f65c0efcc4775e0baec4ec03abdde22473cd3cf33c0419ca290e0751b225";

/// Fee paid by [`Wallet::send`](crate::Wallet::send) when the caller has no better number.
///
/// This is a flat amount, not a rate. There is no size-based estimation in this crate.
pub const DEFAULT_FEE_SAT: u64 = 500;

/// Sequence for every spent input: final for relative locktime, RBF not signalled.
pub const INPUT_SEQUENCE: Sequence = Sequence(0xFFFF_FFFE);

/// LBTC asset id for Liquid mainnet.
pub static LIQUID_BITCOIN_ASSET: LazyLock<AssetId> = LazyLock::new(|| {
    AssetId::from_inner(sha256::Midstate([
        0x6d, 0x52, 0x1c, 0x38, 0xec, 0x1e, 0xa1, 0x57, 0x34, 0xae, 0x22, 0xb7, 0xc4, 0x60, 0x64,
        0x41, 0x28, 0x29, 0xc0, 0xd0, 0x57, 0x9f, 0x0a, 0x71, 0x3d, 0x1c, 0x04, 0xed, 0xe9, 0x79,
        0x02, 0x6f,
    ]))
});

/// LBTC asset id for Liquid testnet.
pub static LIQUID_TESTNET_BITCOIN_ASSET: LazyLock<AssetId> = LazyLock::new(|| {
    AssetId::from_inner(sha256::Midstate([
        0x49, 0x9a, 0x81, 0x85, 0x45, 0xf6, 0xba, 0xe3, 0x9f, 0xc0, 0x3b, 0x63, 0x7f, 0x2a, 0x4e,
        0x1e, 0x64, 0xe5, 0x90, 0xca, 0xc1, 0xbc, 0x3a, 0x6f, 0x6d, 0x71, 0xaa, 0x44, 0x43, 0x65,
        0x4c, 0x14,
    ]))
});

/// Default policy asset of an `elementsd` regtest chain.
pub static ELEMENTS_REGTEST_BITCOIN_ASSET: LazyLock<AssetId> = LazyLock::new(|| {
    AssetId::from_inner(sha256::Midstate([
        0x25, 0xb2, 0x51, 0x07, 0x0e, 0x29, 0xca, 0x19, 0x04, 0x3c, 0xf3, 0x3c, 0xcd, 0x73, 0x24,
        0xe2, 0xdd, 0xab, 0x03, 0xec, 0xc4, 0xae, 0x0b, 0x5e, 0x77, 0xc4, 0xfc, 0x0e, 0x5c, 0xf6,
        0xc9, 0x5a,
    ]))
});

/// Key origin attached to every signing key in a PSET input: zero fingerprint, path `m/0`.
#[must_use]
pub fn key_origin() -> (Fingerprint, DerivationPath) {
    (
        Fingerprint::from([0u8; 4]),
        DerivationPath::from(vec![ChildNumber::Normal { index: 0 }]),
    )
}

/// Everything that differs between the chains a wallet can live on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NetworkParams {
    /// Address version bytes and bech32/blech32 human readable parts.
    pub address_params: &'static AddressParams,
    /// The asset fees are paid in.
    pub policy_asset: AssetId,
    /// Default Esplora API base URL.
    pub esplora_url: &'static str,
}

impl NetworkParams {
    #[must_use]
    pub fn liquid() -> Self {
        Self {
            address_params: &AddressParams::LIQUID,
            policy_asset: *LIQUID_BITCOIN_ASSET,
            esplora_url: "https://blockstream.info/liquid/api",
        }
    }

    #[must_use]
    pub fn liquid_testnet() -> Self {
        Self {
            address_params: &AddressParams::LIQUID_TESTNET,
            policy_asset: *LIQUID_TESTNET_BITCOIN_ASSET,
            esplora_url: "https://blockstream.info/liquidtestnet/api",
        }
    }

    #[must_use]
    pub fn elements_regtest() -> Self {
        Self {
            address_params: &AddressParams::ELEMENTS,
            policy_asset: *ELEMENTS_REGTEST_BITCOIN_ASSET,
            esplora_url: "http://localhost:3000",
        }
    }
}

/// Named networks, convertible into [`NetworkParams`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Network {
    Liquid,
    LiquidTestnet,
    ElementsRegtest,
}

impl Network {
    #[must_use]
    pub fn params(self) -> NetworkParams {
        match self {
            Network::Liquid => NetworkParams::liquid(),
            Network::LiquidTestnet => NetworkParams::liquid_testnet(),
            Network::ElementsRegtest => NetworkParams::elements_regtest(),
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Network::Liquid => "liquid",
            Network::LiquidTestnet => "liquid-testnet",
            Network::ElementsRegtest => "elements-regtest",
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
        match s.to_lowercase().as_str() {
            "liquid" | "mainnet" => Ok(Network::Liquid),
            "liquid-testnet" | "liquidtestnet" | "testnet" => Ok(Network::LiquidTestnet),
            "elements-regtest" | "regtest" => Ok(Network::ElementsRegtest),
            _ => Err(format!("invalid network: {s}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn policy_assets_match_their_hex_ids() {
        assert_eq!(
            NetworkParams::liquid().policy_asset.to_string(),
            LIQUID_POLICY_ASSET_STR
        );
        assert_eq!(
            NetworkParams::liquid_testnet().policy_asset.to_string(),
            LIQUID_TESTNET_POLICY_ASSET_STR
        );
        assert_eq!(
            NetworkParams::elements_regtest().policy_asset.to_string(),
            LIQUID_DEFAULT_REGTEST_ASSET_STR
        );
    }

    #[test]
    fn network_names_round_trip() {
        for network in [
            Network::Liquid,
            Network::LiquidTestnet,
            Network::ElementsRegtest,
        ] {
            assert_eq!(network.as_str().parse::<Network>(), Ok(network));
        }
        assert!("signet".parse::<Network>().is_err());
    }
}
