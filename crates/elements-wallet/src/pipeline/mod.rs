//! PSET stages: build, blind, sign, finalize.
//!
//! Every stage is a function from a PSET (plus the spent outputs) to a new PSET, so each one
//! can be run, inspected and replayed on its own. Between processes a PSET travels as base64
//! of its consensus encoding, see [`encode_pset`] and [`decode_pset`].

mod blind;
mod build;
mod finalize;
mod sign;

pub use blind::blind_pset;
pub use build::{Payment, build_pset};
pub use finalize::{extract_transaction, finalize_pset};
pub use sign::sign_pset;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;

use simplicityhl::elements::OutPoint;
use simplicityhl::elements::encode;
use simplicityhl::elements::pset::PartiallySignedTransaction;

use crate::error::WalletError;
use crate::utxo::SpendableUtxo;

#[must_use]
pub fn encode_pset(pset: &PartiallySignedTransaction) -> String {
    STANDARD.encode(encode::serialize(pset))
}

/// Parse the base64 form produced by [`encode_pset`].
///
/// # Errors
/// Returns error on invalid base64 or an undecodable PSET.
pub fn decode_pset(s: &str) -> Result<PartiallySignedTransaction, WalletError> {
    let bytes = STANDARD.decode(s.trim())?;

    Ok(encode::deserialize(&bytes)?)
}

/// Stages after build need the UTXOs in input order.
fn ensure_inputs_match(
    pset: &PartiallySignedTransaction,
    utxos: &[SpendableUtxo],
) -> Result<(), WalletError> {
    if pset.inputs().len() != utxos.len() {
        return Err(WalletError::UtxoCountMismatch {
            inputs: pset.inputs().len(),
            utxos: utxos.len(),
        });
    }

    for (input_index, (input, utxo)) in pset.inputs().iter().zip(utxos).enumerate() {
        let prevout = OutPoint::new(input.previous_txid, input.previous_output_index);
        if prevout != utxo.outpoint() {
            return Err(WalletError::UtxoInputMismatch {
                input_index,
                utxo: utxo.outpoint(),
                input: prevout,
            });
        }
    }

    Ok(())
}
