//! Owned outputs and their blinded/explicit lifecycle.

use std::sync::Arc;

use simplicityhl::elements::confidential::{AssetBlindingFactor, ValueBlindingFactor};
use simplicityhl::elements::secp256k1_zkp::{SECP256K1, SecretKey};
use simplicityhl::elements::{AssetId, OutPoint, Script, Transaction, TxOut, TxOutSecrets};

use crate::descriptor::OutputDescriptor;
use crate::error::WalletError;

/// Raw data about one output as reported by a chain source, before any ownership check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UtxoCandidate {
    pub outpoint: OutPoint,
    pub txout: TxOut,
    /// Confirmation height, `None` while in the mempool.
    pub height: Option<u32>,
}

impl UtxoCandidate {
    /// Pick output `vout` of `tx`.
    ///
    /// # Errors
    /// Returns [`WalletError::OutputIndexOutOfBounds`] if `tx` has no such output.
    pub fn from_transaction(
        tx: &Transaction,
        vout: u32,
        height: Option<u32>,
    ) -> Result<Self, WalletError> {
        let txid = tx.txid();
        let txout = tx.output.get(vout as usize).cloned().ok_or_else(|| {
            WalletError::OutputIndexOutOfBounds {
                vout,
                txid: txid.to_string(),
            }
        })?;

        Ok(Self {
            outpoint: OutPoint::new(txid, vout),
            txout,
            height,
        })
    }
}

/// One previous output, blinded until [`unblind`](Self::unblind) succeeds.
///
/// An output whose value and asset are both explicit on chain starts out unblinded with
/// zero blinding factors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfidentialUtxo {
    outpoint: OutPoint,
    txout: TxOut,
    height: Option<u32>,
    secrets: Option<TxOutSecrets>,
}

impl ConfidentialUtxo {
    #[must_use]
    pub fn new(outpoint: OutPoint, txout: TxOut, height: Option<u32>) -> Self {
        let secrets = match (txout.asset.explicit(), txout.value.explicit()) {
            (Some(asset), Some(value)) => Some(TxOutSecrets::new(
                asset,
                AssetBlindingFactor::zero(),
                value,
                ValueBlindingFactor::zero(),
            )),
            _ => None,
        };

        Self {
            outpoint,
            txout,
            height,
            secrets,
        }
    }

    #[must_use]
    pub fn from_candidate(candidate: UtxoCandidate) -> Self {
        Self::new(candidate.outpoint, candidate.txout, candidate.height)
    }

    #[must_use]
    pub const fn outpoint(&self) -> OutPoint {
        self.outpoint
    }

    #[must_use]
    pub const fn txout(&self) -> &TxOut {
        &self.txout
    }

    #[must_use]
    pub const fn script_pubkey(&self) -> &Script {
        &self.txout.script_pubkey
    }

    #[must_use]
    pub const fn height(&self) -> Option<u32> {
        self.height
    }

    /// Whether value and asset are known, either explicit on chain or recovered.
    #[must_use]
    pub const fn is_unblinded(&self) -> bool {
        self.secrets.is_some()
    }

    /// Whether the on-chain output carries commitments rather than plaintext.
    #[must_use]
    pub fn is_confidential(&self) -> bool {
        self.txout.value.explicit().is_none() || self.txout.asset.explicit().is_none()
    }

    #[must_use]
    pub const fn secrets(&self) -> Option<&TxOutSecrets> {
        self.secrets.as_ref()
    }

    /// Open the commitments with `blinding_key` and remember the result.
    ///
    /// Once secrets are known this returns them without touching the key.
    ///
    /// # Errors
    /// Returns [`WalletError::InvalidUnblind`] for a wrong key or a corrupted range proof.
    pub fn unblind(&mut self, blinding_key: &SecretKey) -> Result<TxOutSecrets, WalletError> {
        if let Some(secrets) = self.secrets {
            return Ok(secrets);
        }

        let secrets = self.txout.unblind(SECP256K1, *blinding_key).map_err(|e| {
            WalletError::InvalidUnblind {
                outpoint: self.outpoint,
                reason: e.to_string(),
            }
        })?;
        self.secrets = Some(secrets);

        Ok(secrets)
    }
}

/// An unblinded output paired with the descriptor that can spend it.
#[derive(Debug, Clone)]
pub struct SpendableUtxo {
    utxo: ConfidentialUtxo,
    secrets: TxOutSecrets,
    descriptor: Arc<OutputDescriptor>,
}

impl SpendableUtxo {
    /// Claim `utxo` for `descriptor`, unblinding it with the descriptor's blinding key.
    ///
    /// # Errors
    /// Returns [`WalletError::ScriptPubkeyMismatch`] if the output is locked by another
    /// script, [`WalletError::MissingPrivateKey`] if a confidential output meets a
    /// public-only blinding key, or [`WalletError::InvalidUnblind`].
    pub fn new(
        mut utxo: ConfidentialUtxo,
        descriptor: Arc<OutputDescriptor>,
    ) -> Result<Self, WalletError> {
        let expected = descriptor.script_pubkey();
        if *utxo.script_pubkey() != expected {
            return Err(WalletError::ScriptPubkeyMismatch {
                expected: hex::encode(expected.as_bytes()),
                actual: hex::encode(utxo.script_pubkey().as_bytes()),
            });
        }

        let secrets = match utxo.secrets {
            Some(secrets) => secrets,
            None => utxo.unblind(descriptor.blinding_key().require_secret()?)?,
        };

        Ok(Self {
            utxo,
            secrets,
            descriptor,
        })
    }

    #[must_use]
    pub const fn outpoint(&self) -> OutPoint {
        self.utxo.outpoint
    }

    #[must_use]
    pub const fn txout(&self) -> &TxOut {
        &self.utxo.txout
    }

    #[must_use]
    pub const fn height(&self) -> Option<u32> {
        self.utxo.height
    }

    #[must_use]
    pub fn is_confidential(&self) -> bool {
        self.utxo.is_confidential()
    }

    #[must_use]
    pub const fn secrets(&self) -> &TxOutSecrets {
        &self.secrets
    }

    #[must_use]
    pub const fn value(&self) -> u64 {
        self.secrets.value
    }

    #[must_use]
    pub const fn asset(&self) -> AssetId {
        self.secrets.asset
    }

    #[must_use]
    pub fn descriptor(&self) -> &OutputDescriptor {
        &self.descriptor
    }
}
