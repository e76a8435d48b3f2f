use std::collections::HashMap;

use simplicityhl::elements::TxOutSecrets;
use simplicityhl::elements::pset::PartiallySignedTransaction;
use simplicityhl::elements::secp256k1_zkp::SECP256K1;
use simplicityhl::elements::secp256k1_zkp::rand::thread_rng;
use tracing::instrument;

use super::ensure_inputs_match;
use crate::error::WalletError;
use crate::utxo::SpendableUtxo;

/// Blind every output that has a blinding key, balancing commitments against the inputs.
///
/// Input secrets come from the unblinded UTXOs; explicit inputs contribute zero blinding
/// factors. The last blinded output absorbs the balancing factors.
///
/// # Errors
/// Returns error if the UTXOs do not match the PSET inputs or blinding cannot balance.
#[instrument(skip_all, fields(inputs = utxos.len(), outputs = pset.outputs().len()))]
pub fn blind_pset(
    mut pset: PartiallySignedTransaction,
    utxos: &[SpendableUtxo],
) -> Result<PartiallySignedTransaction, WalletError> {
    ensure_inputs_match(&pset, utxos)?;

    let input_secrets: HashMap<usize, TxOutSecrets> = utxos
        .iter()
        .map(|utxo| *utxo.secrets())
        .enumerate()
        .collect();

    pset.blind_last(&mut thread_rng(), SECP256K1, &input_secrets)?;

    tracing::debug!("blinded PSET outputs");

    Ok(pset)
}
