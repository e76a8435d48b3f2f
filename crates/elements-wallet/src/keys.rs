//! Key material for spending and blinding.

use std::fmt;

use simplicityhl::elements::bitcoin;
use simplicityhl::elements::secp256k1_zkp::ecdsa::Signature;
use simplicityhl::elements::secp256k1_zkp::{Message, PublicKey, SECP256K1, SecretKey};

use crate::error::WalletError;

/// A secp256k1 key whose private half may be absent.
///
/// Cosigners that only share their public key are represented with `secret: None`;
/// such a key takes part in scripts and addresses but can never sign or unblind.
#[derive(Clone, PartialEq, Eq)]
pub struct KeyPair {
    secret: Option<SecretKey>,
    public: PublicKey,
}

impl KeyPair {
    #[must_use]
    pub fn from_secret_key(secret: SecretKey) -> Self {
        Self {
            public: PublicKey::from_secret_key(SECP256K1, &secret),
            secret: Some(secret),
        }
    }

    /// Build a key from 32 private key bytes.
    ///
    /// # Errors
    /// Returns [`WalletError::InvalidPrivateKey`] if the bytes are not a valid scalar.
    pub fn from_secret_bytes(bytes: &[u8]) -> Result<Self, WalletError> {
        let secret = SecretKey::from_slice(bytes)
            .map_err(|e| WalletError::InvalidPrivateKey(e.to_string()))?;

        Ok(Self::from_secret_key(secret))
    }

    #[must_use]
    pub fn from_public_key(public: PublicKey) -> Self {
        Self {
            secret: None,
            public,
        }
    }

    /// Build a public-only key from 33 compressed point bytes.
    ///
    /// # Errors
    /// Returns [`WalletError::InvalidPublicKey`] for any other length or an invalid point.
    pub fn from_public_bytes(bytes: &[u8]) -> Result<Self, WalletError> {
        if bytes.len() != 33 {
            return Err(WalletError::InvalidPublicKey(format!(
                "expected 33 compressed bytes, got {}",
                bytes.len()
            )));
        }

        let public =
            PublicKey::from_slice(bytes).map_err(|e| WalletError::InvalidPublicKey(e.to_string()))?;

        Ok(Self::from_public_key(public))
    }

    /// Parse either a 64-char hex private key or a 66-char hex compressed public key.
    ///
    /// # Errors
    /// Returns an error if the hex is malformed or the key bytes are invalid.
    pub fn from_hex(s: &str) -> Result<Self, WalletError> {
        let bytes = hex::decode(s.trim())?;

        match bytes.len() {
            32 => Self::from_secret_bytes(&bytes),
            _ => Self::from_public_bytes(&bytes),
        }
    }

    /// Derive the compressed public point of a private scalar.
    ///
    /// # Errors
    /// Returns [`WalletError::InvalidPrivateKey`] if the scalar is out of range.
    pub fn derive_public(secret: &[u8]) -> Result<PublicKey, WalletError> {
        Ok(Self::from_secret_bytes(secret)?.public)
    }

    #[must_use]
    pub const fn public_key(&self) -> PublicKey {
        self.public
    }

    #[must_use]
    pub fn bitcoin_public_key(&self) -> bitcoin::PublicKey {
        bitcoin::PublicKey::new(self.public)
    }

    #[must_use]
    pub const fn secret_key(&self) -> Option<&SecretKey> {
        self.secret.as_ref()
    }

    #[must_use]
    pub const fn has_secret(&self) -> bool {
        self.secret.is_some()
    }

    /// Private key, or [`WalletError::MissingPrivateKey`] for a public-only key.
    ///
    /// # Errors
    /// Returns error if no private key is held.
    pub fn require_secret(&self) -> Result<&SecretKey, WalletError> {
        self.secret
            .as_ref()
            .ok_or(WalletError::MissingPrivateKey(self.public))
    }

    /// RFC6979 ECDSA signature over a 32-byte digest.
    ///
    /// # Errors
    /// Returns [`WalletError::MissingPrivateKey`] if no private key is held.
    pub fn sign(&self, digest: &Message) -> Result<Signature, WalletError> {
        Ok(SECP256K1.sign_ecdsa(digest, self.require_secret()?))
    }
}

impl fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyPair")
            .field("public", &self.public)
            .field("has_secret", &self.secret.is_some())
            .finish()
    }
}
