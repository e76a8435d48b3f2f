use simplicityhl::elements::hashes::Hash;
use simplicityhl::elements::pset::{Input, PartiallySignedTransaction};
use simplicityhl::elements::secp256k1_zkp::SECP256K1;
use simplicityhl::elements::{Script, Transaction, TxOut, WPubkeyHash, WScriptHash, bitcoin};
use tracing::instrument;

use crate::descriptor::parse_multisig;
use crate::error::WalletError;

/// Turn collected partial signatures into final witnesses.
///
/// Inputs with a witness script are treated as multisig: signatures are taken in script key
/// order and exactly `threshold` of them are placed after the `OP_CHECKMULTISIG` dummy. Inputs
/// without one must be P2WPKH.
///
/// # Errors
/// Returns [`WalletError::MissingSignatures`] if an input is under-signed, or
/// [`WalletError::Finalization`] if its script is not one this wallet produces.
#[instrument(skip_all, fields(inputs = pset.inputs().len()))]
pub fn finalize_pset(
    mut pset: PartiallySignedTransaction,
) -> Result<PartiallySignedTransaction, WalletError> {
    for (input_index, input) in pset.inputs_mut().iter_mut().enumerate() {
        let script_pubkey = &input
            .witness_utxo
            .as_ref()
            .ok_or(WalletError::MissingWitnessUtxo(input_index))?
            .script_pubkey;

        let witness = match &input.witness_script {
            Some(witness_script) => {
                multisig_witness(input_index, input, script_pubkey, witness_script)?
            }
            None => p2wpkh_witness(input_index, input, script_pubkey)?,
        };

        input.final_script_witness = Some(witness);
        input.partial_sigs.clear();
    }

    Ok(pset)
}

/// Extract the finalized transaction and check its amount and asset proofs.
///
/// # Errors
/// Returns error if an input has no witness UTXO, extraction fails or a proof does not verify.
pub fn extract_transaction(pset: &PartiallySignedTransaction) -> Result<Transaction, WalletError> {
    let spent = pset
        .inputs()
        .iter()
        .enumerate()
        .map(|(input_index, input)| {
            input
                .witness_utxo
                .clone()
                .ok_or(WalletError::MissingWitnessUtxo(input_index))
        })
        .collect::<Result<Vec<TxOut>, _>>()?;

    let tx = pset.extract_tx()?;
    tx.verify_tx_amt_proofs(SECP256K1, &spent)?;

    Ok(tx)
}

fn p2wpkh_witness(
    input_index: usize,
    input: &Input,
    script_pubkey: &Script,
) -> Result<Vec<Vec<u8>>, WalletError> {
    if !script_pubkey.is_v0_p2wpkh() {
        return Err(WalletError::Finalization {
            input_index,
            reason: "script pubkey is neither P2WPKH nor backed by a witness script".to_string(),
        });
    }

    let (public_key, signature) = input
        .partial_sigs
        .iter()
        .find(|(public_key, _)| {
            Script::new_v0_wpkh(&WPubkeyHash::hash(&public_key.to_bytes())) == *script_pubkey
        })
        .ok_or(WalletError::MissingSignatures {
            input_index,
            required: 1,
            found: 0,
        })?;

    Ok(vec![signature.clone(), public_key.to_bytes()])
}

fn multisig_witness(
    input_index: usize,
    input: &Input,
    script_pubkey: &Script,
    witness_script: &Script,
) -> Result<Vec<Vec<u8>>, WalletError> {
    if Script::new_v0_wsh(&WScriptHash::hash(witness_script.as_bytes())) != *script_pubkey {
        return Err(WalletError::Finalization {
            input_index,
            reason: "witness script does not hash to the script pubkey".to_string(),
        });
    }

    let (threshold, keys) =
        parse_multisig(witness_script).ok_or_else(|| WalletError::Finalization {
            input_index,
            reason: "witness script is not a threshold multisig".to_string(),
        })?;

    let signatures = keys
        .into_iter()
        .filter_map(|key| input.partial_sigs.get(&bitcoin::PublicKey::new(key)))
        .take(threshold)
        .cloned()
        .collect::<Vec<_>>();

    if signatures.len() < threshold {
        return Err(WalletError::MissingSignatures {
            input_index,
            required: threshold,
            found: signatures.len(),
        });
    }

    let mut witness = Vec::with_capacity(threshold + 2);
    witness.push(Vec::new());
    witness.extend(signatures);
    witness.push(witness_script.to_bytes());

    Ok(witness)
}
