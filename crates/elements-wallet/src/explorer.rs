//! Chain access: the [`ChainSource`] seam and an Esplora implementation.

use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::str::FromStr;

use serde::Deserialize;

use simplicityhl::elements::{Address, OutPoint, Transaction, TxOut, Txid, encode};

use crate::error::ExplorerError;
use crate::utxo::UtxoCandidate;

/// Anything that can list, fetch and broadcast. Calls block and are never retried here.
pub trait ChainSource {
    /// Unspent outputs paying to `address`.
    ///
    /// # Errors
    /// Returns error if the source cannot be queried.
    fn list_unspent(&self, address: &Address) -> Result<Vec<EsploraUtxo>, ExplorerError>;

    /// # Errors
    /// Returns error if the transaction is unknown or undecodable.
    fn fetch_transaction(&self, txid: &Txid) -> Result<Transaction, ExplorerError>;

    /// # Errors
    /// Returns error if the transaction is rejected.
    fn broadcast(&self, tx: &Transaction) -> Result<Txid, ExplorerError>;
}

/// One entry of Esplora's `/address/:address/utxo`.
///
/// Confidential outputs list commitments instead of `value`/`asset`; any missing field just
/// means the output is still blinded.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct EsploraUtxo {
    pub txid: String,
    pub vout: u32,
    pub value: Option<u64>,
    pub asset: Option<String>,
    pub valuecommitment: Option<String>,
    pub assetcommitment: Option<String>,
    pub noncecommitment: Option<String>,
    #[serde(default)]
    pub status: EsploraStatus,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct EsploraStatus {
    #[serde(default)]
    pub confirmed: bool,
    pub block_height: Option<u32>,
}

/// List unspent outputs of `address` and pair each with its output from the full transaction.
///
/// Only plain data comes back; ownership and unblinding happen in
/// [`Wallet::ingest`](crate::Wallet::ingest).
///
/// # Errors
/// Returns error if a call fails or the listing disagrees with the fetched transaction.
pub fn fetch_candidates(
    source: &impl ChainSource,
    address: &Address,
) -> Result<Vec<UtxoCandidate>, ExplorerError> {
    let listing = source.list_unspent(address)?;
    let mut transactions: HashMap<Txid, Transaction> = HashMap::new();
    let mut candidates = Vec::with_capacity(listing.len());

    for entry in listing {
        let txid =
            Txid::from_str(&entry.txid).map_err(|_| ExplorerError::InvalidTxid(entry.txid.clone()))?;

        let tx = match transactions.entry(txid) {
            Entry::Occupied(slot) => slot.into_mut(),
            Entry::Vacant(slot) => slot.insert(source.fetch_transaction(&txid)?),
        };

        let outpoint = OutPoint::new(txid, entry.vout);
        let txout = tx.output.get(entry.vout as usize).cloned().ok_or_else(|| {
            ExplorerError::OutputIndexOutOfBounds {
                vout: entry.vout,
                txid: txid.to_string(),
            }
        })?;

        check_listing(&entry, outpoint, &txout)?;

        candidates.push(UtxoCandidate {
            outpoint,
            txout,
            height: entry.status.block_height,
        });
    }

    tracing::debug!(candidates = candidates.len(), "fetched UTXO candidates");

    Ok(candidates)
}

fn check_listing(
    entry: &EsploraUtxo,
    outpoint: OutPoint,
    txout: &TxOut,
) -> Result<(), ExplorerError> {
    let inconsistent = |reason: &str| ExplorerError::Inconsistent {
        outpoint,
        reason: reason.to_string(),
    };

    if let Some(value) = entry.value
        && txout.value.explicit() != Some(value)
    {
        return Err(inconsistent("listed value differs from the transaction output"));
    }
    if let Some(asset) = &entry.asset
        && txout.asset.explicit().map(|id| id.to_string()).as_ref() != Some(asset)
    {
        return Err(inconsistent("listed asset differs from the transaction output"));
    }
    if let Some(commitment) = &entry.valuecommitment
        && encode::serialize_hex(&txout.value) != *commitment
    {
        return Err(inconsistent("listed value commitment differs from the transaction output"));
    }
    if let Some(commitment) = &entry.assetcommitment
        && encode::serialize_hex(&txout.asset) != *commitment
    {
        return Err(inconsistent("listed asset commitment differs from the transaction output"));
    }

    Ok(())
}

#[cfg(feature = "esplora")]
pub use client::EsploraClient;

#[cfg(feature = "esplora")]
mod client {
    use std::str::FromStr;
    use std::time::Duration;

    use simplicityhl::elements::{Address, Transaction, Txid, encode};

    use super::{ChainSource, EsploraUtxo};
    use crate::error::ExplorerError;

    /// Default request timeout in seconds.
    pub const DEFAULT_TIMEOUT_SECS: u64 = 10;

    /// Blocking client for an Esplora HTTP API.
    #[derive(Debug, Clone)]
    pub struct EsploraClient {
        base_url: String,
        timeout: Duration,
    }

    impl EsploraClient {
        #[must_use]
        pub fn new(base_url: &str) -> Self {
            Self {
                base_url: base_url.trim_end_matches('/').to_owned(),
                timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            }
        }

        #[must_use]
        pub const fn with_timeout(mut self, timeout: Duration) -> Self {
            self.timeout = timeout;
            self
        }

        #[must_use]
        pub fn base_url(&self) -> &str {
            &self.base_url
        }

        fn get(&self, path: &str) -> Result<minreq::Response, ExplorerError> {
            let url = format!("{}{path}", self.base_url);
            let response = minreq::get(&url)
                .with_timeout(self.timeout.as_secs())
                .send()
                .map_err(|e| ExplorerError::HttpRequest(e.to_string()))?;

            if !(200..300).contains(&response.status_code) {
                return Err(ExplorerError::HttpStatus {
                    status: status_code(&response),
                    url,
                    message: body(&response),
                });
            }

            Ok(response)
        }
    }

    impl ChainSource for EsploraClient {
        fn list_unspent(&self, address: &Address) -> Result<Vec<EsploraUtxo>, ExplorerError> {
            self.get(&format!("/address/{address}/utxo"))?
                .json()
                .map_err(|e| ExplorerError::Deserialize(e.to_string()))
        }

        fn fetch_transaction(&self, txid: &Txid) -> Result<Transaction, ExplorerError> {
            let response = self.get(&format!("/tx/{txid}/hex"))?;
            let tx_bytes = hex::decode(body(&response))?;

            Ok(encode::deserialize(&tx_bytes)?)
        }

        fn broadcast(&self, tx: &Transaction) -> Result<Txid, ExplorerError> {
            let url = format!("{}/tx", self.base_url);
            let response = minreq::post(&url)
                .with_timeout(self.timeout.as_secs())
                .with_body(encode::serialize_hex(tx))
                .send()
                .map_err(|e| ExplorerError::HttpRequest(e.to_string()))?;

            let message = body(&response);
            if !(200..300).contains(&response.status_code) {
                return Err(ExplorerError::BroadcastRejected {
                    status: status_code(&response),
                    url,
                    message,
                });
            }

            tracing::info!(txid = %message, "transaction broadcast");

            Txid::from_str(&message).map_err(|_| ExplorerError::InvalidTxid(message))
        }
    }

    fn body(response: &minreq::Response) -> String {
        response.as_str().unwrap_or("").trim().to_owned()
    }

    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    fn status_code(response: &minreq::Response) -> u16 {
        response.status_code as u16
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::cell::Cell;

    use crate::constants::NetworkParams;
    use crate::descriptor::OutputDescriptor;
    use crate::fixtures::{confidential_txout, explicit_txout, funding_tx, key};

    struct OneTransaction {
        tx: Transaction,
        listing: Vec<EsploraUtxo>,
        fetches: Cell<usize>,
    }

    impl ChainSource for OneTransaction {
        fn list_unspent(&self, _address: &Address) -> Result<Vec<EsploraUtxo>, ExplorerError> {
            Ok(self.listing.clone())
        }

        fn fetch_transaction(&self, txid: &Txid) -> Result<Transaction, ExplorerError> {
            self.fetches.set(self.fetches.get() + 1);
            assert_eq!(*txid, self.tx.txid());
            Ok(self.tx.clone())
        }

        fn broadcast(&self, tx: &Transaction) -> Result<Txid, ExplorerError> {
            Ok(tx.txid())
        }
    }

    #[test]
    fn listing_with_missing_fields_parses_as_blinded() {
        let json = r#"[{
            "txid": "0000000000000000000000000000000000000000000000000000000000000001",
            "vout": 1,
            "status": {"confirmed": false},
            "valuecommitment": "08aa",
            "assetcommitment": "0bbb",
            "noncecommitment": "02cc"
        }]"#;

        let listing: Vec<EsploraUtxo> = serde_json::from_str(json).expect("valid listing");

        assert_eq!(listing.len(), 1);
        assert_eq!(listing[0].vout, 1);
        assert!(listing[0].value.is_none());
        assert!(listing[0].asset.is_none());
        assert!(listing[0].status.block_height.is_none());
    }

    #[test]
    fn candidates_pair_listing_with_outputs() {
        let network = NetworkParams::liquid_testnet();
        let descriptor = OutputDescriptor::single_key(key(0x11), key(0x12));
        let address = descriptor
            .address(network.address_params, true)
            .expect("address");
        let (blinded, _) = confidential_txout(9_000, network.policy_asset, &address);
        let tx = funding_tx(vec![
            explicit_txout(1_000, network.policy_asset, descriptor.script_pubkey()),
            blinded.clone(),
        ]);
        let txid = tx.txid().to_string();
        let source = OneTransaction {
            listing: vec![
                EsploraUtxo {
                    txid: txid.clone(),
                    vout: 0,
                    value: Some(1_000),
                    asset: Some(network.policy_asset.to_string()),
                    status: EsploraStatus {
                        confirmed: true,
                        block_height: Some(7),
                    },
                    ..EsploraUtxo::default()
                },
                EsploraUtxo {
                    txid,
                    vout: 1,
                    valuecommitment: Some(encode::serialize_hex(&blinded.value)),
                    assetcommitment: Some(encode::serialize_hex(&blinded.asset)),
                    ..EsploraUtxo::default()
                },
            ],
            tx,
            fetches: Cell::new(0),
        };

        let candidates = fetch_candidates(&source, &address).expect("candidates");

        assert_eq!(candidates.len(), 2);
        assert_eq!(candidates[0].height, Some(7));
        assert_eq!(candidates[1].txout, blinded);
        assert_eq!(candidates[1].height, None);
        assert_eq!(source.fetches.get(), 1);
    }

    #[test]
    fn inconsistent_listing_is_rejected() {
        let network = NetworkParams::liquid_testnet();
        let descriptor = OutputDescriptor::single_key(key(0x11), key(0x12));
        let address = descriptor
            .address(network.address_params, true)
            .expect("address");
        let tx = funding_tx(vec![explicit_txout(
            1_000,
            network.policy_asset,
            descriptor.script_pubkey(),
        )]);
        let source = OneTransaction {
            listing: vec![EsploraUtxo {
                txid: tx.txid().to_string(),
                vout: 0,
                value: Some(2_000),
                ..EsploraUtxo::default()
            }],
            tx,
            fetches: Cell::new(0),
        };

        let err = fetch_candidates(&source, &address).expect_err("value mismatch");

        assert!(matches!(err, ExplorerError::Inconsistent { .. }));
    }

    #[test]
    fn listed_vout_past_the_outputs_is_rejected() {
        let network = NetworkParams::liquid_testnet();
        let descriptor = OutputDescriptor::single_key(key(0x11), key(0x12));
        let address = descriptor
            .address(network.address_params, true)
            .expect("address");
        let tx = funding_tx(vec![explicit_txout(
            1_000,
            network.policy_asset,
            descriptor.script_pubkey(),
        )]);
        let source = OneTransaction {
            listing: vec![EsploraUtxo {
                txid: tx.txid().to_string(),
                vout: 5,
                ..EsploraUtxo::default()
            }],
            tx,
            fetches: Cell::new(0),
        };

        let err = fetch_candidates(&source, &address).expect_err("no output 5");

        assert!(matches!(err, ExplorerError::OutputIndexOutOfBounds { vout: 5, .. }));
    }
}
