use simplicityhl::elements::{OutPoint, secp256k1_zkp};

/// Errors raised by key handling, UTXO ownership and the PSET pipeline.
///
/// Every failure is terminal for the operation that produced it. Nothing here is
/// retried internally; re-syncing or re-fetching is up to the caller.
#[derive(Debug, thiserror::Error)]
pub enum WalletError {
    /// Returned when private key bytes are malformed or outside the curve order.
    #[error("Invalid private key: {0}")]
    InvalidPrivateKey(String),

    /// Returned when public key bytes are not a valid compressed point.
    #[error("Invalid public key: {0}")]
    InvalidPublicKey(String),

    /// Returned when a signature or unblinding is requested from a public-only key.
    #[error("Missing private key for public key {0}")]
    MissingPrivateKey(secp256k1_zkp::PublicKey),

    #[error("Invalid multisig: threshold {threshold} out of range for {keys} keys")]
    InvalidMultisig { threshold: usize, keys: usize },

    #[error("Signer index {index} out of range for {keys} keys")]
    SignerIndexOutOfRange { index: usize, keys: usize },

    /// Returned when a UTXO is not locked by the descriptor claimed to own it.
    #[error("Script pubkey mismatch: expected {expected}, got {actual}")]
    ScriptPubkeyMismatch { expected: String, actual: String },

    /// Returned when the blinding key or the range proof does not open the commitments.
    #[error("Failed to unblind {outpoint}: {reason}")]
    InvalidUnblind { outpoint: OutPoint, reason: String },

    #[error("Output index {vout} out of bounds for transaction {txid}")]
    OutputIndexOutOfBounds { vout: u32, txid: String },

    /// Returned when a payment asset is not the policy asset.
    #[error("Unsupported asset {asset}: only the policy asset {policy_asset} can be sent")]
    UnsupportedAsset { asset: String, policy_asset: String },

    /// Returned when inputs cannot cover amount plus fee with a positive change.
    #[error("Insufficient funds: available {available}, required more than {required}")]
    InsufficientFunds { available: u64, required: u64 },

    #[error("Amount overflow while summing {0}")]
    AmountOverflow(&'static str),

    #[error("Address {0} belongs to a different network")]
    AddressNetworkMismatch(String),

    #[error("Address {0} is not confidential")]
    NonConfidentialAddress(String),

    #[error("Failed to encode address for script {0}")]
    AddressEncoding(String),

    /// Returned when a pipeline stage gets a different number of UTXOs than PSET inputs.
    #[error("PSET has {inputs} inputs but {utxos} UTXOs were provided")]
    UtxoCountMismatch { inputs: usize, utxos: usize },

    #[error("UTXO {utxo} does not match PSET input {input_index} ({input})")]
    UtxoInputMismatch {
        input_index: usize,
        utxo: OutPoint,
        input: OutPoint,
    },

    /// Returned when a PSET spends an outpoint the wallet does not hold.
    #[error("PSET input {input_index} spends unknown outpoint {input}")]
    UnknownInput { input_index: usize, input: OutPoint },

    #[error("PSET input {0} has no witness UTXO")]
    MissingWitnessUtxo(usize),

    /// Returned when an input lacks the signatures its script requires.
    #[error("PSET input {input_index} has {found} of {required} required signatures")]
    MissingSignatures {
        input_index: usize,
        required: usize,
        found: usize,
    },

    #[error("Failed to finalize PSET input {input_index}: {reason}")]
    Finalization { input_index: usize, reason: String },

    #[error("PSET error: {0}")]
    Pset(#[from] simplicityhl::elements::pset::Error),

    /// Returned when commitments cannot be balanced across inputs and outputs.
    #[error("PSET blinding error: {0}")]
    PsetBlind(#[from] simplicityhl::elements::pset::PsetBlindError),

    #[error("Transaction amount proof verification failed: {0}")]
    AmountProofVerification(#[from] simplicityhl::elements::VerificationError),

    #[error("Consensus encoding error: {0}")]
    Encode(#[from] simplicityhl::elements::encode::Error),

    #[error("Secp256k1 error: {0}")]
    Secp(#[from] secp256k1_zkp::Error),

    #[error("Invalid base64 PSET: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error("Hex decode error: {0}")]
    Hex(#[from] hex::FromHexError),

    #[error("Explorer error: {0}")]
    Explorer(#[from] ExplorerError),
}

/// Errors that occur when talking to the block explorer.
///
/// These errors are returned by [`ChainSource`](crate::ChainSource) implementations
/// when listing unspent outputs, fetching transactions and broadcasting.
#[derive(Debug, thiserror::Error)]
pub enum ExplorerError {
    /// Returned when the HTTP request itself fails.
    #[error("HTTP request failed: {0}")]
    HttpRequest(String),

    #[error("HTTP {status} for {url}: {message}")]
    HttpStatus {
        status: u16,
        url: String,
        message: String,
    },

    #[error("Broadcast failed with HTTP {status} for {url}: {message}")]
    BroadcastRejected {
        status: u16,
        url: String,
        message: String,
    },

    /// Returned when a response body is not the expected JSON.
    #[error("Failed to deserialize response: {0}")]
    Deserialize(String),

    /// Returned when transaction data is not valid hexadecimal.
    #[error("Invalid transaction hex: {0}")]
    InvalidTransactionHex(#[from] hex::FromHexError),

    /// Returned when raw transaction bytes cannot be parsed.
    #[error("Failed to deserialize transaction: {0}")]
    TransactionDeserialize(#[from] simplicityhl::elements::encode::Error),

    #[error("Invalid txid {0}")]
    InvalidTxid(String),

    /// Returned when the explorer listing disagrees with the fetched transaction.
    #[error("Explorer data for {outpoint} is inconsistent: {reason}")]
    Inconsistent { outpoint: OutPoint, reason: String },

    #[error("Output index {vout} out of bounds for transaction {txid}")]
    OutputIndexOutOfBounds { vout: u32, txid: String },
}
