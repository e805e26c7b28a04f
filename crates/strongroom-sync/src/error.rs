//! Error types for change propagation.

use thiserror::Error;

/// Errors from sealing, opening, or queueing change envelopes.
#[derive(Debug, Error)]
pub enum SyncError {
    /// Underlying cryptographic failure.
    #[error("crypto error: {0}")]
    Crypto(#[from] strongroom_core::CryptoError),

    /// Storage failure.
    #[error("store error: {0}")]
    Store(#[from] strongroom_store::StoreError),

    /// CBOR encoding/decoding failure.
    #[error("codec error: {0}")]
    Codec(String),

    /// The sender assertion failed verification or named the wrong
    /// sender.
    #[error("sender assertion rejected: {0}")]
    BadAssertion(String),

    /// The envelope names a sender the store no longer knows.
    #[error("unknown sender: {0}")]
    UnknownSender(String),
}

/// Result alias for sync operations.
pub type Result<T> = std::result::Result<T, SyncError>;
