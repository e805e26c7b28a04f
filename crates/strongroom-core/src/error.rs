//! Error types for the Strongroom core.

use std::fmt;

use thiserror::Error;

/// Why a decryption failed.
///
/// All three causes surface as the single [`CryptoError::Decryption`] kind so
/// that callers cannot be used as a padding/tag oracle; the cause is retained
/// for audit logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecryptCause {
    /// The ciphertext was not valid base64.
    Malformed,
    /// The decoded payload is shorter than a nonce.
    Truncated,
    /// Authentication tag mismatch: wrong key or tampered data.
    BadTag,
}

impl fmt::Display for DecryptCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DecryptCause::Malformed => write!(f, "malformed encoding"),
            DecryptCause::Truncated => write!(f, "payload shorter than nonce"),
            DecryptCause::BadTag => write!(f, "authentication failed"),
        }
    }
}

/// Errors from the cryptographic primitives.
#[derive(Debug, Error)]
pub enum CryptoError {
    /// The operating system RNG failed. Fatal to the operation; never
    /// downgraded to a weaker source.
    #[error("random number generation failed: {0}")]
    Rng(String),

    /// Key derivation failed (malformed salt or unusable scalar).
    #[error("key derivation failed: {0}")]
    KeyDerivation(String),

    /// Symmetric encryption failed.
    #[error("encryption failed: {0}")]
    Encryption(String),

    /// Symmetric decryption failed. One kind for all causes.
    #[error("decryption failed: {cause}")]
    Decryption {
        /// The underlying cause, for audit logs only.
        cause: DecryptCause,
    },

    /// A signature blob could not be decoded. A well-formed signature that
    /// merely fails verification is not an error.
    #[error("malformed signature encoding: {0}")]
    SignatureEncoding(String),

    /// ECDH produced or consumed a degenerate curve point.
    #[error("degenerate key agreement point")]
    InvalidPoint,

    /// A public key could not be decoded.
    #[error("malformed public key: {0}")]
    MalformedPublicKey(String),
}

impl CryptoError {
    /// Shorthand for a decryption failure with the given cause.
    pub fn decryption(cause: DecryptCause) -> Self {
        CryptoError::Decryption { cause }
    }
}

/// Result type for core operations.
pub type Result<T> = std::result::Result<T, CryptoError>;
