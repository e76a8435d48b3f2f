use simplicityhl::elements::hashes::Hash;
use simplicityhl::elements::pset::PartiallySignedTransaction;
use simplicityhl::elements::secp256k1_zkp::Message;
use simplicityhl::elements::sighash::SighashCache;
use simplicityhl::elements::{EcdsaSighashType, bitcoin};
use tracing::instrument;

use super::ensure_inputs_match;
use crate::descriptor::signature_with_sighash;
use crate::error::WalletError;
use crate::utxo::SpendableUtxo;

/// Add a `SIGHASH_ALL` segwit v0 partial signature for every key that can sign each input.
///
/// Must run after blinding: the digest commits to the blinded outputs.
///
/// # Errors
/// Returns error if the UTXOs do not match the PSET inputs, the unsigned transaction cannot
/// be extracted, or a single key input has no private key.
#[instrument(skip_all, fields(inputs = utxos.len()))]
pub fn sign_pset(
    mut pset: PartiallySignedTransaction,
    utxos: &[SpendableUtxo],
) -> Result<PartiallySignedTransaction, WalletError> {
    ensure_inputs_match(&pset, utxos)?;

    let tx = pset.extract_tx()?;
    let mut cache = SighashCache::new(&tx);

    for (input_index, (input, utxo)) in pset.inputs_mut().iter_mut().zip(utxos).enumerate() {
        let descriptor = utxo.descriptor();
        let sighash = cache.segwitv0_sighash(
            input_index,
            &descriptor.script_code(),
            utxo.txout().value,
            EcdsaSighashType::All,
        );
        let digest = Message::from_digest(sighash.to_byte_array());

        let signatures = descriptor.signatures(&digest)?;
        tracing::debug!(input_index, signatures = signatures.len(), "signed input");

        for (public_key, signature) in signatures {
            input.partial_sigs.insert(
                bitcoin::PublicKey::new(public_key),
                signature_with_sighash(&signature, EcdsaSighashType::All),
            );
        }
    }

    Ok(pset)
}
