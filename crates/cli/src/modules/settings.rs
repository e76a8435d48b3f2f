use anyhow::{Context, Result, anyhow};
use config::{Case, Config, ConfigError};

use elements_wallet::{KeyPair, OutputDescriptor};

/// Wallet configuration read from the environment (and `.env`, loaded by `main`).
#[derive(Clone, Debug)]
pub struct Settings {
    /// `WALLET_KEYS`: comma-separated 64-hex private or 66-hex public keys, in script order.
    pub keys: String,
    /// `WALLET_THRESHOLD`: present for a threshold multisig wallet.
    pub threshold: Option<usize>,
    /// `WALLET_BLINDING_KEY`: 64-hex private blinding key.
    pub blinding_key: String,
    /// `ESPLORA_URL`: overrides the network's default explorer.
    pub esplora_url: Option<String>,
}

impl Settings {
    /// # Errors
    /// Returns error if a required variable is missing or `WALLET_THRESHOLD` is not a number.
    pub fn load() -> Result<Self> {
        let cfg = Config::builder()
            .add_source(
                config::Environment::default()
                    .separator("__")
                    .convert_case(Case::ScreamingSnake),
            )
            .build()?;

        let keys = cfg
            .get_string("WALLET_KEYS")
            .map_err(|_| anyhow!("WALLET_KEYS not set in environment or .env"))?;
        let blinding_key = cfg
            .get_string("WALLET_BLINDING_KEY")
            .map_err(|_| anyhow!("WALLET_BLINDING_KEY not set in environment or .env"))?;

        let threshold = optional(&cfg, "WALLET_THRESHOLD")?
            .map(|value| value.parse::<usize>())
            .transpose()
            .context("WALLET_THRESHOLD must be a positive integer")?;
        let esplora_url = optional(&cfg, "ESPLORA_URL")?;

        Ok(Self {
            keys,
            threshold,
            blinding_key,
            esplora_url,
        })
    }

    /// # Errors
    /// Returns error if a key is malformed or the threshold does not fit the key count.
    pub fn descriptor(&self) -> Result<OutputDescriptor> {
        parse_descriptor(&self.keys, self.threshold, &self.blinding_key)
    }
}

fn optional(cfg: &Config, key: &str) -> Result<Option<String>> {
    match cfg.get_string(key) {
        Ok(value) => Ok(Some(value)),
        Err(ConfigError::NotFound(_)) => Ok(None),
        Err(err) => Err(err.into()),
    }
}

/// Single key without a threshold, threshold multisig with one.
///
/// # Errors
/// Returns error if a key is malformed, a single key wallet lists several keys, or the
/// threshold is out of range.
pub fn parse_descriptor(
    keys: &str,
    threshold: Option<usize>,
    blinding_key: &str,
) -> Result<OutputDescriptor> {
    let keys = keys
        .split(',')
        .map(str::trim)
        .filter(|key| !key.is_empty())
        .map(KeyPair::from_hex)
        .collect::<Result<Vec<_>, _>>()?;
    let blinding_key = KeyPair::from_hex(blinding_key)?;

    match threshold {
        Some(threshold) => Ok(OutputDescriptor::threshold_multisig(
            threshold,
            keys,
            blinding_key,
        )?),
        None => match <[KeyPair; 1]>::try_from(keys) {
            Ok([key]) => Ok(OutputDescriptor::single_key(key, blinding_key)),
            Err(keys) => Err(anyhow!(
                "expected exactly one key without WALLET_THRESHOLD, got {}",
                keys.len()
            )),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use elements_wallet::SpendCondition;

    const PRIVATE_1: &str = "0101010101010101010101010101010101010101010101010101010101010101";
    const PRIVATE_2: &str = "0202020202020202020202020202020202020202020202020202020202020202";
    const GENERATOR: &str = "0279be667ef9dcbbac55a06295ce870b07029bfcdb2dce28d959f2815b16f81798";

    #[test]
    fn one_key_without_threshold_is_single_key() {
        let descriptor = parse_descriptor(PRIVATE_1, None, PRIVATE_2).expect("single key");

        assert!(matches!(descriptor.condition(), SpendCondition::SingleKey(_)));
    }

    #[test]
    fn threshold_selects_multisig_and_keeps_key_order() {
        let keys = format!("{PRIVATE_1}, {GENERATOR},{PRIVATE_2}");

        let descriptor = parse_descriptor(&keys, Some(2), PRIVATE_2).expect("2-of-3");

        assert_eq!(descriptor.threshold(), 2);
        assert_eq!(descriptor.keys().len(), 3);
        assert!(!descriptor.keys()[1].has_secret());
        assert_eq!(descriptor.keys()[1].public_key().to_string(), GENERATOR);
    }

    #[test]
    fn several_keys_without_threshold_are_rejected() {
        let keys = format!("{PRIVATE_1},{PRIVATE_2}");

        assert!(parse_descriptor(&keys, None, PRIVATE_2).is_err());
    }

    #[test]
    fn bad_threshold_is_rejected() {
        let keys = format!("{PRIVATE_1},{PRIVATE_2}");

        assert!(parse_descriptor(&keys, Some(3), PRIVATE_2).is_err());
    }
}
