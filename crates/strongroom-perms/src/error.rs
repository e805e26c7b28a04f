//! Error types for permission handling.

use thiserror::Error;

/// Errors from minting or inspecting permission artifacts.
#[derive(Debug, Error)]
pub enum PermsError {
    /// Underlying cryptographic failure.
    #[error("crypto error: {0}")]
    Crypto(#[from] strongroom_core::CryptoError),

    /// A permission character outside the `{r, w, d}` alphabet.
    #[error("invalid permission character: {0:?}")]
    InvalidPermission(char),

    /// A grant token that could not be encoded or decoded.
    #[error("grant encoding error: {0}")]
    Encoding(String),
}

/// Result alias for permission operations.
pub type Result<T> = std::result::Result<T, PermsError>;
