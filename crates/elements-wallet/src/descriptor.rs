//! Spending conditions for wallet outputs.
//!
//! An [`OutputDescriptor`] is a closed set of segwit v0 spending conditions plus the
//! blinding key used for confidential addresses. Everything a wallet needs from a
//! condition (scripts, addresses, signatures, witness stacks) is a method here, so the
//! pipeline never branches on the variant itself except through these methods.

use simplicityhl::elements::hashes::Hash;
use simplicityhl::elements::opcodes::all::OP_CHECKMULTISIG;
use simplicityhl::elements::script::{Builder, Instruction};
use simplicityhl::elements::secp256k1_zkp::ecdsa::Signature;
use simplicityhl::elements::secp256k1_zkp::{Message, PublicKey};
use simplicityhl::elements::{
    Address, AddressParams, EcdsaSighashType, PubkeyHash, Script, WPubkeyHash, WScriptHash,
};

use crate::error::WalletError;
use crate::keys::KeyPair;

/// Largest key count whose `n` still fits a single `OP_n` opcode.
pub const MAX_MULTISIG_KEYS: usize = 16;

/// The spending half of a descriptor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpendCondition {
    /// Pay to witness public key hash.
    SingleKey(KeyPair),
    /// Pay to witness script hash of `OP_m <keys..> OP_n OP_CHECKMULTISIG`.
    ///
    /// Key order is part of the script, so permuting `keys` changes the address.
    ThresholdMultisig { threshold: usize, keys: Vec<KeyPair> },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputDescriptor {
    condition: SpendCondition,
    blinding_key: KeyPair,
}

impl OutputDescriptor {
    #[must_use]
    pub const fn single_key(key: KeyPair, blinding_key: KeyPair) -> Self {
        Self {
            condition: SpendCondition::SingleKey(key),
            blinding_key,
        }
    }

    /// `threshold`-of-`keys.len()` multisig, keys kept in the given order.
    ///
    /// # Errors
    /// Returns [`WalletError::InvalidMultisig`] unless `1 <= threshold <= keys.len() <= 16`.
    pub fn threshold_multisig(
        threshold: usize,
        keys: Vec<KeyPair>,
        blinding_key: KeyPair,
    ) -> Result<Self, WalletError> {
        if threshold == 0 || threshold > keys.len() || keys.len() > MAX_MULTISIG_KEYS {
            return Err(WalletError::InvalidMultisig {
                threshold,
                keys: keys.len(),
            });
        }

        Ok(Self {
            condition: SpendCondition::ThresholdMultisig { threshold, keys },
            blinding_key,
        })
    }

    #[must_use]
    pub const fn condition(&self) -> &SpendCondition {
        &self.condition
    }

    #[must_use]
    pub const fn blinding_key(&self) -> &KeyPair {
        &self.blinding_key
    }

    /// All keys of the condition, in script order.
    #[must_use]
    pub fn keys(&self) -> &[KeyPair] {
        match &self.condition {
            SpendCondition::SingleKey(key) => std::slice::from_ref(key),
            SpendCondition::ThresholdMultisig { keys, .. } => keys,
        }
    }

    #[must_use]
    pub const fn threshold(&self) -> usize {
        match &self.condition {
            SpendCondition::SingleKey(_) => 1,
            SpendCondition::ThresholdMultisig { threshold, .. } => *threshold,
        }
    }

    /// Keys holding a private half, in script order. These are the keys that sign.
    pub fn signing_keys(&self) -> impl Iterator<Item = &KeyPair> {
        self.keys().iter().filter(|key| key.has_secret())
    }

    /// Last witness stack item: the public key for single key, the multisig script otherwise.
    #[must_use]
    pub fn witness_script(&self) -> Script {
        match &self.condition {
            SpendCondition::SingleKey(key) => Script::from(key.public_key().serialize().to_vec()),
            SpendCondition::ThresholdMultisig { threshold, keys } => {
                multisig_script(*threshold, keys)
            }
        }
    }

    /// Hash committed to by the v0 witness program.
    #[must_use]
    pub fn witness_program(&self) -> Vec<u8> {
        match &self.condition {
            SpendCondition::SingleKey(key) => WPubkeyHash::hash(&key.public_key().serialize())
                .to_byte_array()
                .to_vec(),
            SpendCondition::ThresholdMultisig { .. } => {
                WScriptHash::hash(self.witness_script().as_bytes())
                    .to_byte_array()
                    .to_vec()
            }
        }
    }

    /// Script the segwit v0 sighash commits to.
    #[must_use]
    pub fn script_code(&self) -> Script {
        match &self.condition {
            SpendCondition::SingleKey(key) => {
                Script::new_p2pkh(&PubkeyHash::hash(&key.public_key().serialize()))
            }
            SpendCondition::ThresholdMultisig { .. } => self.witness_script(),
        }
    }

    /// Witness script to publish in PSET inputs; single key has none.
    #[must_use]
    pub fn pset_witness_script(&self) -> Option<Script> {
        match &self.condition {
            SpendCondition::SingleKey(_) => None,
            SpendCondition::ThresholdMultisig { .. } => Some(self.witness_script()),
        }
    }

    #[must_use]
    pub fn script_pubkey(&self) -> Script {
        match &self.condition {
            SpendCondition::SingleKey(key) => {
                Script::new_v0_wpkh(&WPubkeyHash::hash(&key.public_key().serialize()))
            }
            SpendCondition::ThresholdMultisig { .. } => {
                Script::new_v0_wsh(&WScriptHash::hash(self.witness_script().as_bytes()))
            }
        }
    }

    /// Segwit address of the script pubkey, blech32 with the blinding key when `confidential`.
    ///
    /// # Errors
    /// Returns [`WalletError::AddressEncoding`] if the script has no address form.
    pub fn address(
        &self,
        params: &'static AddressParams,
        confidential: bool,
    ) -> Result<Address, WalletError> {
        let script_pubkey = self.script_pubkey();
        let blinder = confidential.then(|| self.blinding_key.public_key());

        Address::from_script(&script_pubkey, blinder, params)
            .ok_or_else(|| WalletError::AddressEncoding(script_pubkey.to_string()))
    }

    /// Sign `digest` with the key at `signer_index`; single key ignores the index.
    ///
    /// # Errors
    /// Returns error if the index is out of range or the key has no private half.
    pub fn sign(&self, digest: &Message, signer_index: usize) -> Result<Signature, WalletError> {
        let key = match &self.condition {
            SpendCondition::SingleKey(key) => key,
            SpendCondition::ThresholdMultisig { keys, .. } => {
                keys.get(signer_index)
                    .ok_or(WalletError::SignerIndexOutOfRange {
                        index: signer_index,
                        keys: keys.len(),
                    })?
            }
        };

        key.sign(digest)
    }

    /// Every signature this descriptor can produce over `digest`, in key order.
    ///
    /// Single key always yields one signature. Multisig yields one per key with a private
    /// half, anywhere from zero to `n`.
    ///
    /// # Errors
    /// Returns [`WalletError::MissingPrivateKey`] if a single key descriptor cannot sign.
    pub fn signatures(&self, digest: &Message) -> Result<Vec<(PublicKey, Signature)>, WalletError> {
        match &self.condition {
            SpendCondition::SingleKey(key) => Ok(vec![(key.public_key(), key.sign(digest)?)]),
            SpendCondition::ThresholdMultisig { .. } => self
                .signing_keys()
                .map(|key| Ok((key.public_key(), key.sign(digest)?)))
                .collect(),
        }
    }

    /// Fully signed witness stack for one input.
    ///
    /// Multisig puts the `OP_CHECKMULTISIG` dummy first and signs with every key that has a
    /// private half. Holding fewer than `threshold` such keys yields an unspendable stack;
    /// that is left to the caller.
    ///
    /// # Errors
    /// Returns error if a single key descriptor has no private key.
    pub fn build_witness_stack(
        &self,
        digest: &Message,
        sighash_type: EcdsaSighashType,
    ) -> Result<Vec<Vec<u8>>, WalletError> {
        let signatures = self
            .signatures(digest)?
            .into_iter()
            .map(|(_, signature)| signature_with_sighash(&signature, sighash_type));

        let mut stack = Vec::new();
        if matches!(self.condition, SpendCondition::ThresholdMultisig { .. }) {
            stack.push(Vec::new());
        }
        stack.extend(signatures);
        stack.push(self.witness_script().into_bytes());

        Ok(stack)
    }
}

/// DER signature followed by the sighash byte, as it appears in a witness.
#[must_use]
pub fn signature_with_sighash(signature: &Signature, sighash_type: EcdsaSighashType) -> Vec<u8> {
    let mut bytes = signature.serialize_der().to_vec();
    bytes.push(sighash_byte(sighash_type));
    bytes
}

#[allow(clippy::cast_possible_truncation)]
fn sighash_byte(sighash_type: EcdsaSighashType) -> u8 {
    sighash_type.as_u32() as u8
}

#[allow(clippy::cast_possible_wrap)]
fn multisig_script(threshold: usize, keys: &[KeyPair]) -> Script {
    let mut builder = Builder::new().push_int(threshold as i64);
    for key in keys {
        builder = builder.push_slice(&key.public_key().serialize());
    }

    builder
        .push_int(keys.len() as i64)
        .push_opcode(OP_CHECKMULTISIG)
        .into_script()
}

/// Decode `OP_m <keys..> OP_n OP_CHECKMULTISIG` into `(m, keys)`.
pub(crate) fn parse_multisig(script: &Script) -> Option<(usize, Vec<PublicKey>)> {
    let instructions = script.instructions().collect::<Result<Vec<_>, _>>().ok()?;

    let (first, rest) = instructions.split_first()?;
    let (last, rest) = rest.split_last()?;
    let (total, keys) = rest.split_last()?;

    if !matches!(last, Instruction::Op(op) if *op == OP_CHECKMULTISIG) {
        return None;
    }

    let threshold = small_int(first)?;
    let total = small_int(total)?;
    let keys = keys
        .iter()
        .map(|instruction| match instruction {
            Instruction::PushBytes(bytes) if bytes.len() == 33 => PublicKey::from_slice(bytes).ok(),
            _ => None,
        })
        .collect::<Option<Vec<_>>>()?;

    (keys.len() == total && threshold >= 1 && threshold <= total).then_some((threshold, keys))
}

fn small_int(instruction: &Instruction<'_>) -> Option<usize> {
    match instruction {
        Instruction::Op(op) => {
            let byte = op.into_u8();
            (0x51..=0x60).contains(&byte).then(|| usize::from(byte - 0x50))
        }
        Instruction::PushBytes(_) => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use simplicityhl::elements::secp256k1_zkp::SECP256K1;

    fn secret_key(tag: u8) -> KeyPair {
        KeyPair::from_secret_bytes(&[tag; 32]).expect("valid scalar")
    }

    fn public_only(tag: u8) -> KeyPair {
        KeyPair::from_public_key(secret_key(tag).public_key())
    }

    fn blinding() -> KeyPair {
        secret_key(0x01)
    }

    fn permutations(keys: &[KeyPair]) -> Vec<Vec<KeyPair>> {
        if keys.len() <= 1 {
            return vec![keys.to_vec()];
        }
        let mut out = Vec::new();
        for i in 0..keys.len() {
            let mut rest = keys.to_vec();
            let head = rest.remove(i);
            for mut tail in permutations(&rest) {
                tail.insert(0, head.clone());
                out.push(tail);
            }
        }
        out
    }

    #[test]
    fn single_key_script_pubkey_is_p2wpkh() {
        let key = secret_key(0x11);
        let descriptor = OutputDescriptor::single_key(key.clone(), blinding());

        let script_pubkey = descriptor.script_pubkey();

        assert!(script_pubkey.is_v0_p2wpkh());
        assert_eq!(&script_pubkey.as_bytes()[2..], descriptor.witness_program().as_slice());
        assert_eq!(
            descriptor.witness_script().as_bytes(),
            key.public_key().serialize().as_slice()
        );
        assert!(descriptor.pset_witness_script().is_none());
        assert!(descriptor.script_code().is_p2pkh());
    }

    #[test]
    fn single_key_address_matches_library_p2wpkh() {
        let key = secret_key(0x11);
        let descriptor = OutputDescriptor::single_key(key.clone(), blinding());

        let address = descriptor
            .address(&AddressParams::LIQUID_TESTNET, true)
            .expect("address");
        let expected = Address::p2wpkh(
            &key.bitcoin_public_key(),
            Some(blinding().public_key()),
            &AddressParams::LIQUID_TESTNET,
        );

        assert_eq!(address, expected);
        assert_eq!(address.blinding_pubkey, Some(blinding().public_key()));
        assert!(
            descriptor
                .address(&AddressParams::LIQUID_TESTNET, false)
                .expect("address")
                .blinding_pubkey
                .is_none()
        );
    }

    #[test]
    fn multisig_script_pubkey_is_p2wsh_of_witness_script() {
        let descriptor = OutputDescriptor::threshold_multisig(
            2,
            vec![secret_key(0x21), secret_key(0x22), public_only(0x23)],
            blinding(),
        )
        .expect("valid 2-of-3");

        assert!(descriptor.script_pubkey().is_v0_p2wsh());
        assert_eq!(descriptor.pset_witness_script(), Some(descriptor.witness_script()));
        assert_eq!(descriptor.script_code(), descriptor.witness_script());

        let (threshold, keys) =
            parse_multisig(&descriptor.witness_script()).expect("parsable multisig");
        assert_eq!(threshold, 2);
        assert_eq!(
            keys,
            descriptor.keys().iter().map(KeyPair::public_key).collect::<Vec<_>>()
        );
    }

    #[test]
    fn threshold_out_of_range_is_rejected() {
        let keys = vec![secret_key(0x21), secret_key(0x22), secret_key(0x23)];

        for threshold in [0, 4] {
            let err = OutputDescriptor::threshold_multisig(threshold, keys.clone(), blinding())
                .expect_err("invalid threshold");
            assert!(matches!(
                err,
                WalletError::InvalidMultisig { threshold: t, keys: 3 } if t == threshold
            ));
        }
    }

    #[test]
    fn key_order_changes_the_script_pubkey() {
        let keys = vec![secret_key(0x31), secret_key(0x32), secret_key(0x33)];

        for threshold in 1..=keys.len() {
            let base = OutputDescriptor::threshold_multisig(threshold, keys.clone(), blinding())
                .expect("valid multisig")
                .script_pubkey();

            for permuted in permutations(&keys).into_iter().skip(1) {
                let other = OutputDescriptor::threshold_multisig(threshold, permuted, blinding())
                    .expect("valid multisig")
                    .script_pubkey();
                assert_ne!(base, other, "threshold {threshold}");
            }
        }
    }

    #[test]
    fn multisig_sign_checks_index_and_private_key() {
        let descriptor = OutputDescriptor::threshold_multisig(
            2,
            vec![secret_key(0x21), secret_key(0x22), public_only(0x23)],
            blinding(),
        )
        .expect("valid 2-of-3");
        let digest = Message::from_digest([5u8; 32]);

        let signature = descriptor.sign(&digest, 1).expect("key 1 signs");
        SECP256K1
            .verify_ecdsa(&digest, &signature, &descriptor.keys()[1].public_key())
            .expect("valid signature");

        assert!(matches!(
            descriptor.sign(&digest, 3),
            Err(WalletError::SignerIndexOutOfRange { index: 3, keys: 3 })
        ));
        assert!(matches!(
            descriptor.sign(&digest, 2),
            Err(WalletError::MissingPrivateKey(_))
        ));
    }

    #[test]
    fn single_key_sign_ignores_index() {
        let descriptor = OutputDescriptor::single_key(secret_key(0x11), blinding());
        let digest = Message::from_digest([5u8; 32]);

        assert_eq!(
            descriptor.sign(&digest, 0).expect("signature"),
            descriptor.sign(&digest, 42).expect("signature")
        );
    }

    #[test]
    fn single_key_witness_stack_is_signature_and_pubkey() {
        let key = secret_key(0x11);
        let descriptor = OutputDescriptor::single_key(key.clone(), blinding());
        let digest = Message::from_digest([5u8; 32]);

        let stack = descriptor
            .build_witness_stack(&digest, EcdsaSighashType::All)
            .expect("witness stack");

        assert_eq!(stack.len(), 2);
        assert_eq!(stack[0].last(), Some(&0x01));
        assert_eq!(stack[1], key.public_key().serialize().to_vec());
    }

    #[test]
    fn two_of_three_witness_stack_has_four_items_for_any_signing_pair() {
        let digest = Message::from_digest([5u8; 32]);

        for missing in 0..3u8 {
            let keys = (0..3u8)
                .map(|i| {
                    if i == missing {
                        public_only(0x40 + i)
                    } else {
                        secret_key(0x40 + i)
                    }
                })
                .collect::<Vec<_>>();
            let descriptor =
                OutputDescriptor::threshold_multisig(2, keys, blinding()).expect("valid 2-of-3");

            let stack = descriptor
                .build_witness_stack(&digest, EcdsaSighashType::All)
                .expect("witness stack");

            assert_eq!(stack.len(), 4, "missing key {missing}");
            assert!(stack[0].is_empty());
            assert_eq!(stack[3], descriptor.witness_script().into_bytes());
        }
    }

    #[test]
    fn parse_multisig_rejects_other_scripts() {
        let descriptor = OutputDescriptor::single_key(secret_key(0x11), blinding());

        assert!(parse_multisig(&descriptor.script_pubkey()).is_none());
        assert!(parse_multisig(&Script::new()).is_none());
    }
}
