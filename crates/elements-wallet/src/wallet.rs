use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

use simplicityhl::elements::pset::PartiallySignedTransaction;
use simplicityhl::elements::secp256k1_zkp::PublicKey;
use simplicityhl::elements::{Address, AssetId, OutPoint, Script, Transaction, Txid};
use tracing::instrument;

use crate::constants::NetworkParams;
use crate::descriptor::OutputDescriptor;
use crate::error::WalletError;
use crate::explorer::{ChainSource, fetch_candidates};
use crate::pipeline::{
    Payment, blind_pset, build_pset, decode_pset, encode_pset, extract_transaction,
    finalize_pset, sign_pset,
};
use crate::utxo::{ConfidentialUtxo, SpendableUtxo, UtxoCandidate};

/// A single-descriptor wallet holding every known unspent output.
///
/// The UTXO set only grows: synchronization appends outputs it has not seen, and spending
/// does not remove anything. Not meant to be shared between threads without a lock.
#[derive(Debug, Clone)]
pub struct Wallet {
    descriptor: Arc<OutputDescriptor>,
    network: NetworkParams,
    utxos: Vec<SpendableUtxo>,
}

impl Wallet {
    /// # Errors
    /// Returns [`WalletError::MissingPrivateKey`] if the blinding key has no private half.
    pub fn new(descriptor: OutputDescriptor, network: NetworkParams) -> Result<Self, WalletError> {
        descriptor.blinding_key().require_secret()?;

        Ok(Self {
            descriptor: Arc::new(descriptor),
            network,
            utxos: Vec::new(),
        })
    }

    #[must_use]
    pub fn descriptor(&self) -> &OutputDescriptor {
        &self.descriptor
    }

    #[must_use]
    pub const fn network(&self) -> &NetworkParams {
        &self.network
    }

    /// Confidential receive address.
    ///
    /// # Errors
    /// Returns [`WalletError::AddressEncoding`] if the script has no address form.
    pub fn address(&self) -> Result<Address, WalletError> {
        self.descriptor.address(self.network.address_params, true)
    }

    /// # Errors
    /// Returns [`WalletError::AddressEncoding`] if the script has no address form.
    pub fn unconfidential_address(&self) -> Result<Address, WalletError> {
        self.descriptor.address(self.network.address_params, false)
    }

    #[must_use]
    pub fn script_pubkey(&self) -> Script {
        self.descriptor.script_pubkey()
    }

    #[must_use]
    pub fn blinding_public_key(&self) -> PublicKey {
        self.descriptor.blinding_key().public_key()
    }

    #[must_use]
    pub fn utxos(&self) -> &[SpendableUtxo] {
        &self.utxos
    }

    /// Outputs a payment spends: every held UTXO of the policy asset, in ingestion order.
    fn spendable(&self) -> Vec<SpendableUtxo> {
        self.utxos
            .iter()
            .filter(|utxo| utxo.asset() == self.network.policy_asset)
            .cloned()
            .collect()
    }

    /// Held UTXOs in the order `pset` spends them, looked up by outpoint.
    fn inputs_of(
        &self,
        pset: &PartiallySignedTransaction,
    ) -> Result<Vec<SpendableUtxo>, WalletError> {
        pset.inputs()
            .iter()
            .enumerate()
            .map(|(input_index, input)| {
                let prevout = OutPoint::new(input.previous_txid, input.previous_output_index);

                self.utxos
                    .iter()
                    .find(|utxo| utxo.outpoint() == prevout)
                    .cloned()
                    .ok_or(WalletError::UnknownInput {
                        input_index,
                        input: prevout,
                    })
            })
            .collect()
    }

    /// Sum of unblinded values per asset.
    ///
    /// # Errors
    /// Returns [`WalletError::AmountOverflow`] if an asset total exceeds `u64`.
    pub fn balance(&self) -> Result<BTreeMap<AssetId, u64>, WalletError> {
        let mut balance = BTreeMap::new();

        for utxo in &self.utxos {
            let total: &mut u64 = balance.entry(utxo.asset()).or_default();
            *total = total
                .checked_add(utxo.value())
                .ok_or(WalletError::AmountOverflow("balance"))?;
        }

        Ok(balance)
    }

    /// Claim and unblind candidates, appending the new ones.
    ///
    /// Outpoints already held are skipped. Either every new candidate is accepted or the
    /// wallet is left untouched.
    ///
    /// # Errors
    /// Returns the first ownership or unblinding failure.
    #[instrument(skip_all)]
    pub fn ingest(
        &mut self,
        candidates: impl IntoIterator<Item = UtxoCandidate>,
    ) -> Result<usize, WalletError> {
        let mut known: HashSet<OutPoint> = self.utxos.iter().map(SpendableUtxo::outpoint).collect();
        let mut accepted = Vec::new();

        for candidate in candidates {
            if !known.insert(candidate.outpoint) {
                continue;
            }

            let utxo = ConfidentialUtxo::from_candidate(candidate);
            accepted.push(SpendableUtxo::new(utxo, Arc::clone(&self.descriptor))?);
        }

        let added = accepted.len();
        self.utxos.extend(accepted);

        tracing::info!(added, total = self.utxos.len(), "ingested UTXOs");

        Ok(added)
    }

    /// Fetch candidates listed under the unconfidential address from `source` and ingest them.
    ///
    /// # Errors
    /// Returns error if fetching fails or any candidate cannot be ingested.
    #[instrument(skip_all)]
    pub fn sync(&mut self, source: &impl ChainSource) -> Result<usize, WalletError> {
        let address = self.unconfidential_address()?;
        let candidates = fetch_candidates(source, &address)?;

        self.ingest(candidates)
    }

    /// Build an unblinded PSET spending every policy asset UTXO, as base64.
    ///
    /// # Errors
    /// See [`build_pset`].
    pub fn create_pset(
        &self,
        destination: &Address,
        asset: AssetId,
        amount: u64,
        fee: u64,
    ) -> Result<String, WalletError> {
        let payment = Payment {
            destination: destination.clone(),
            asset,
            amount,
            fee,
        };
        let pset = build_pset(&self.spendable(), &payment, &self.address()?, &self.network)?;

        Ok(encode_pset(&pset))
    }

    /// # Errors
    /// Returns [`WalletError::UnknownInput`] for an outpoint the wallet does not hold, see also
    /// [`blind_pset`].
    pub fn blind_pset(&self, pset: &str) -> Result<String, WalletError> {
        let pset = decode_pset(pset)?;
        let utxos = self.inputs_of(&pset)?;
        let pset = blind_pset(pset, &utxos)?;

        Ok(encode_pset(&pset))
    }

    /// Sign every input this wallet holds a key for, whatever order a cosigner's sync produced.
    ///
    /// # Errors
    /// Returns [`WalletError::UnknownInput`] for an outpoint the wallet does not hold, see also
    /// [`sign_pset`].
    pub fn sign_pset(&self, pset: &str) -> Result<String, WalletError> {
        let pset = decode_pset(pset)?;
        let utxos = self.inputs_of(&pset)?;
        let pset = sign_pset(pset, &utxos)?;

        Ok(encode_pset(&pset))
    }

    /// Finalize and extract a signed PSET, verifying its proofs, without broadcasting.
    ///
    /// # Errors
    /// See [`finalize_pset`] and [`extract_transaction`].
    pub fn finalize_pset(&self, pset: &str) -> Result<Transaction, WalletError> {
        let pset = finalize_pset(decode_pset(pset)?)?;

        extract_transaction(&pset)
    }

    /// Finalize a signed PSET and hand the transaction to `source`.
    ///
    /// # Errors
    /// Returns error if finalization fails or the broadcast is rejected.
    #[instrument(skip_all)]
    pub fn send_pset(&self, pset: &str, source: &impl ChainSource) -> Result<Txid, WalletError> {
        let tx = self.finalize_pset(pset)?;
        let txid = source.broadcast(&tx)?;

        tracing::info!(%txid, "sent transaction");

        Ok(txid)
    }

    /// Pay `amount` of the policy asset to `destination` in one go.
    ///
    /// # Errors
    /// Returns the first failure of any pipeline stage or of the broadcast.
    pub fn send(
        &self,
        destination: &Address,
        amount: u64,
        fee: u64,
        source: &impl ChainSource,
    ) -> Result<Txid, WalletError> {
        let pset = self.create_pset(destination, self.network.policy_asset, amount, fee)?;
        let pset = self.blind_pset(&pset)?;
        let pset = self.sign_pset(&pset)?;

        self.send_pset(&pset, source)
    }
}
