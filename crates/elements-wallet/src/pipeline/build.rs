use simplicityhl::elements::bitcoin;
use simplicityhl::elements::{BlindAssetProofs, BlindValueProofs};
use simplicityhl::elements::pset::{Input, Output, PartiallySignedTransaction};
use simplicityhl::elements::secp256k1_zkp::rand::thread_rng;
use simplicityhl::elements::secp256k1_zkp::{RangeProof, SECP256K1, SurjectionProof};
use simplicityhl::elements::{Address, AssetId, TxOut};
use tracing::instrument;

use crate::constants::{INPUT_SEQUENCE, NetworkParams, key_origin};
use crate::error::WalletError;
use crate::utxo::SpendableUtxo;

/// What a built transaction pays, apart from change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Payment {
    pub destination: Address,
    pub asset: AssetId,
    pub amount: u64,
    /// Explicit fee in the policy asset.
    pub fee: u64,
}

/// Spend every UTXO into `[payment, change, fee]`.
///
/// Payment and change are marked for blinding by input 0's owner; the fee output stays
/// explicit. Only the policy asset can be paid, and every input must hold it.
///
/// # Errors
/// Returns error if an address is for another network or not confidential, the asset is not
/// the policy asset, change would not be positive, or an input proof cannot be created.
#[instrument(skip_all, fields(inputs = utxos.len(), amount = payment.amount, fee = payment.fee))]
pub fn build_pset(
    utxos: &[SpendableUtxo],
    payment: &Payment,
    change_address: &Address,
    network: &NetworkParams,
) -> Result<PartiallySignedTransaction, WalletError> {
    let payment_blinder = confidential_blinder(&payment.destination, network)?;
    let change_blinder = confidential_blinder(change_address, network)?;

    if payment.asset != network.policy_asset {
        return Err(WalletError::UnsupportedAsset {
            asset: payment.asset.to_string(),
            policy_asset: network.policy_asset.to_string(),
        });
    }

    if let Some(utxo) = utxos.iter().find(|utxo| utxo.asset() != payment.asset) {
        return Err(WalletError::UnsupportedAsset {
            asset: utxo.asset().to_string(),
            policy_asset: network.policy_asset.to_string(),
        });
    }

    let available = utxos
        .iter()
        .try_fold(0u64, |sum, utxo| sum.checked_add(utxo.value()))
        .ok_or(WalletError::AmountOverflow("input values"))?;
    let required = payment
        .amount
        .checked_add(payment.fee)
        .ok_or(WalletError::AmountOverflow("amount and fee"))?;

    if available <= required {
        return Err(WalletError::InsufficientFunds {
            available,
            required,
        });
    }
    let change = available - required;

    let mut pset = PartiallySignedTransaction::new_v2();

    for utxo in utxos {
        pset.add_input(spend_input(utxo)?);
    }

    let mut payment_output = Output::new_explicit(
        payment.destination.script_pubkey(),
        payment.amount,
        payment.asset,
        Some(payment_blinder),
    );
    payment_output.blinder_index = Some(0);
    pset.add_output(payment_output);

    let mut change_output = Output::new_explicit(
        change_address.script_pubkey(),
        change,
        payment.asset,
        Some(change_blinder),
    );
    change_output.blinder_index = Some(0);
    pset.add_output(change_output);

    pset.add_output(Output::from_txout(TxOut::new_fee(
        payment.fee,
        network.policy_asset,
    )));

    tracing::debug!(available, change, "built unblinded PSET");

    Ok(pset)
}

fn spend_input(utxo: &SpendableUtxo) -> Result<Input, WalletError> {
    let txout = utxo.txout();
    let secrets = utxo.secrets();
    let descriptor = utxo.descriptor();

    let mut input = Input::from_prevout(utxo.outpoint());
    input.sequence = Some(INPUT_SEQUENCE);
    input.witness_utxo = Some(txout.clone());
    input.in_utxo_rangeproof.clone_from(&txout.witness.rangeproof);
    input.witness_script = descriptor.pset_witness_script();
    input.amount = Some(secrets.value);
    input.asset = Some(secrets.asset);

    // Explicit prevouts have nothing to prove.
    if let (Some(value_commit), Some(asset_gen)) =
        (txout.value.commitment(), txout.asset.commitment())
    {
        let mut rng = thread_rng();
        input.blind_value_proof = Some(Box::new(RangeProof::blind_value_proof(
            &mut rng,
            SECP256K1,
            secrets.value,
            value_commit,
            asset_gen,
            secrets.value_bf,
        )?));
        input.blind_asset_proof = Some(Box::new(SurjectionProof::blind_asset_proof(
            &mut rng,
            SECP256K1,
            secrets.asset,
            secrets.asset_bf,
        )?));
    }

    for key in descriptor.keys() {
        input
            .bip32_derivation
            .insert(key.bitcoin_public_key(), key_origin());
    }

    Ok(input)
}

fn confidential_blinder(
    address: &Address,
    network: &NetworkParams,
) -> Result<bitcoin::PublicKey, WalletError> {
    if address.params != network.address_params {
        return Err(WalletError::AddressNetworkMismatch(address.to_string()));
    }

    address
        .blinding_pubkey
        .map(bitcoin::PublicKey::new)
        .ok_or_else(|| WalletError::NonConfidentialAddress(address.to_string()))
}
