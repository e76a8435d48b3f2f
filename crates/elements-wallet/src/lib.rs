#![warn(clippy::all, clippy::pedantic)]

//! Minimal confidential wallet core for Liquid.
//!
//! Tracks outputs locked by one [`OutputDescriptor`], unblinds them, and spends them through
//! the PSET build, blind, sign and finalize stages in [`pipeline`].

mod constants;
mod descriptor;
mod error;
mod explorer;
mod keys;
mod utxo;
mod wallet;

pub mod pipeline;

#[cfg(test)]
mod fixtures;

pub use constants::*;
pub use descriptor::{MAX_MULTISIG_KEYS, OutputDescriptor, SpendCondition, signature_with_sighash};
pub use error::{ExplorerError, WalletError};
pub use explorer::{ChainSource, EsploraStatus, EsploraUtxo, fetch_candidates};
#[cfg(feature = "esplora")]
pub use explorer::EsploraClient;
pub use keys::KeyPair;
pub use utxo::{ConfidentialUtxo, SpendableUtxo, UtxoCandidate};
pub use wallet::Wallet;

pub use simplicityhl::elements;
