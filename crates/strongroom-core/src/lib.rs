//! # Strongroom Core
//!
//! Cryptographic identity primitives for strongroom: password-based key
//! derivation, field encryption, signing, and pairwise key agreement.
//!
//! This crate contains no I/O and no storage. Everything here is pure
//! computation over key material.
//!
//! ## Key Types
//!
//! - [`UserIdentity`] - The persisted public half of a user
//! - [`Session`] - An unlocked identity holding private keys
//! - [`SessionKeys`] - Symmetric key + signing key derived from a password
//! - [`SymmetricKey`] - 256-bit AES-GCM key, zeroized on drop
//!
//! ## Encodings
//!
//! Ciphertexts are `base64(nonce ‖ ct ‖ tag)`; signed blobs are
//! `base64(DER(R,S) ‖ data)` and carry their own framing.

pub mod aead;
pub mod agreement;
pub mod error;
pub mod identity;
pub mod keys;
pub mod signing;
pub mod types;

pub use aead::{decrypt, decrypt_aad, encrypt, encrypt_aad, SymmetricKey};
pub use agreement::{parse_public_key, shared_secret};
pub use error::{CryptoError, DecryptCause, Result};
pub use identity::{
    encode_public_key, new_salts, Encryptor, Session, Signer, UserIdentity, Verifier,
};
pub use keys::{derive_keys, derive_signing_key, derive_symmetric_key, KdfParams, SessionKeys};
pub use signing::{sign, verify, Verification};
pub use types::{EntryId, FieldClass, FieldName, UserId};
