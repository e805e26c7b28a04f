//! Pairwise shared secrets via ECDH over P-521.
//!
//! Two users derive the same symmetric key from either (private A,
//! public B) or (private B, public A). The raw x-coordinate is
//! stretched through repeated SHA-512 before use as key material.

use p521::ecdh::diffie_hellman;
use p521::ecdsa::SigningKey;
use p521::PublicKey;
use sha2::{Digest, Sha512};
use zeroize::Zeroize;

use crate::aead::{SymmetricKey, KEY_LENGTH};
use crate::error::{CryptoError, Result};

/// SHA-512 iterations applied to the raw ECDH output.
const STRETCH_ROUNDS: usize = 10_000;

/// Parse a SEC1-encoded public key, rejecting the identity point.
pub fn parse_public_key(sec1: &[u8]) -> Result<PublicKey> {
    PublicKey::from_sec1_bytes(sec1).map_err(|_| CryptoError::InvalidPoint)
}

/// Derive the pairwise symmetric key between a local signing key and a
/// peer's public key.
pub fn shared_secret(local: &SigningKey, peer: &PublicKey) -> Result<SymmetricKey> {
    let shared = diffie_hellman(local.as_nonzero_scalar(), peer.as_affine());

    let mut buf = shared.raw_secret_bytes().to_vec();
    for _ in 0..STRETCH_ROUNDS {
        let digest = Sha512::digest(&buf);
        buf.zeroize();
        buf = digest.to_vec();
    }

    let mut key = [0u8; KEY_LENGTH];
    key.copy_from_slice(&buf[..KEY_LENGTH]);
    buf.zeroize();
    Ok(SymmetricKey::from_bytes(key))
}
