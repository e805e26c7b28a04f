//! Field encryption: AES-256-GCM with base64-encoded `nonce ‖ ciphertext ‖ tag`.

use aes_gcm::{
    aead::{Aead, KeyInit, Payload},
    Aes256Gcm, Nonce,
};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use rand::rngs::OsRng;
use rand::RngCore;
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::error::{CryptoError, DecryptCause, Result};

/// Length of a symmetric key in bytes (AES-256).
pub const KEY_LENGTH: usize = 32;

/// Length of a GCM nonce in bytes (96 bits).
pub const NONCE_LENGTH: usize = 12;

/// A 256-bit symmetric encryption key. Zeroed on drop.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct SymmetricKey([u8; KEY_LENGTH]);

impl SymmetricKey {
    /// Create from raw bytes.
    pub const fn from_bytes(bytes: [u8; KEY_LENGTH]) -> Self {
        Self(bytes)
    }

    /// Generate a fresh random key from the OS RNG.
    pub fn generate() -> Result<Self> {
        let mut bytes = [0u8; KEY_LENGTH];
        OsRng
            .try_fill_bytes(&mut bytes)
            .map_err(|e| CryptoError::Rng(e.to_string()))?;
        Ok(Self(bytes))
    }

    /// Get the raw bytes.
    pub fn as_bytes(&self) -> &[u8; KEY_LENGTH] {
        &self.0
    }
}

impl std::fmt::Debug for SymmetricKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Key material never appears in debug output.
        write!(f, "SymmetricKey(..)")
    }
}

/// Encrypt plaintext under the given key.
///
/// A fresh random 96-bit nonce is drawn per call; the result is
/// `base64(nonce ‖ ciphertext ‖ tag)`.
pub fn encrypt(plaintext: &[u8], key: &SymmetricKey) -> Result<String> {
    encrypt_aad(plaintext, &[], key)
}

/// Encrypt with additional authenticated data.
///
/// The AAD is bound into the authentication tag but not carried in the
/// output; decryption must present the identical AAD.
pub fn encrypt_aad(plaintext: &[u8], aad: &[u8], key: &SymmetricKey) -> Result<String> {
    let cipher = Aes256Gcm::new_from_slice(key.as_bytes())
        .map_err(|e| CryptoError::Encryption(e.to_string()))?;

    let mut nonce_bytes = [0u8; NONCE_LENGTH];
    OsRng
        .try_fill_bytes(&mut nonce_bytes)
        .map_err(|e| CryptoError::Rng(e.to_string()))?;
    let nonce = Nonce::from_slice(&nonce_bytes);

    let ciphertext = cipher
        .encrypt(
            nonce,
            Payload {
                msg: plaintext,
                aad,
            },
        )
        .map_err(|e| CryptoError::Encryption(e.to_string()))?;

    let mut raw = Vec::with_capacity(NONCE_LENGTH + ciphertext.len());
    raw.extend_from_slice(&nonce_bytes);
    raw.extend_from_slice(&ciphertext);
    Ok(BASE64.encode(raw))
}

/// Decrypt a base64-encoded `nonce ‖ ciphertext ‖ tag` payload.
pub fn decrypt(encoded: &str, key: &SymmetricKey) -> Result<Vec<u8>> {
    decrypt_aad(encoded, &[], key)
}

/// Decrypt with additional authenticated data.
pub fn decrypt_aad(encoded: &str, aad: &[u8], key: &SymmetricKey) -> Result<Vec<u8>> {
    let raw = BASE64
        .decode(encoded)
        .map_err(|_| CryptoError::decryption(DecryptCause::Malformed))?;

    if raw.len() < NONCE_LENGTH {
        return Err(CryptoError::decryption(DecryptCause::Truncated));
    }

    let cipher = Aes256Gcm::new_from_slice(key.as_bytes())
        .map_err(|e| CryptoError::Encryption(e.to_string()))?;

    let (nonce_bytes, ciphertext) = raw.split_at(NONCE_LENGTH);
    cipher
        .decrypt(
            Nonce::from_slice(nonce_bytes),
            Payload {
                msg: ciphertext,
                aad,
            },
        )
        .map_err(|_| CryptoError::decryption(DecryptCause::BadTag))
}
