//! Shared builders for unit tests.

use simplicityhl::elements::confidential::{
    Asset, AssetBlindingFactor, Nonce, Value, ValueBlindingFactor,
};
use simplicityhl::elements::secp256k1_zkp::SECP256K1;
use simplicityhl::elements::secp256k1_zkp::rand::thread_rng;
use simplicityhl::elements::{
    Address, AssetId, LockTime, Script, Transaction, TxOut, TxOutSecrets, TxOutWitness,
};

use crate::keys::KeyPair;

pub fn key(tag: u8) -> KeyPair {
    KeyPair::from_secret_bytes(&[tag; 32]).expect("valid scalar")
}

/// Output paying `value` of `asset` to a confidential address, with the secrets used to blind it.
pub fn confidential_txout(value: u64, asset: AssetId, address: &Address) -> (TxOut, TxOutSecrets) {
    let funding_input = TxOutSecrets::new(
        asset,
        AssetBlindingFactor::zero(),
        value,
        ValueBlindingFactor::zero(),
    );

    let (txout, asset_bf, value_bf, _) = TxOut::new_not_last_confidential(
        &mut thread_rng(),
        SECP256K1,
        value,
        address.clone(),
        asset,
        &[funding_input],
    )
    .expect("confidential output");

    (txout, TxOutSecrets::new(asset, asset_bf, value, value_bf))
}

pub fn explicit_txout(value: u64, asset: AssetId, script_pubkey: Script) -> TxOut {
    TxOut {
        asset: Asset::Explicit(asset),
        value: Value::Explicit(value),
        nonce: Nonce::Null,
        script_pubkey,
        witness: TxOutWitness::default(),
    }
}

pub fn funding_tx(output: Vec<TxOut>) -> Transaction {
    Transaction {
        version: 2,
        lock_time: LockTime::ZERO,
        input: Vec::new(),
        output,
    }
}
