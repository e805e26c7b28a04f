//! User identities and unlocked sessions.
//!
//! A [`UserIdentity`] is the public, persisted half of a user: their
//! name, the salts their keys were derived over, and their public key.
//! A [`Session`] pairs an identity with the private [`SessionKeys`]
//! reconstructed from the password, and is the only value that can
//! encrypt or sign on the user's behalf.

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use p521::ecdsa::VerifyingKey;
use p521::PublicKey;
use rand::rngs::OsRng;
use rand::RngCore;
use serde::{Deserialize, Serialize};

use crate::aead::{self, SymmetricKey};
use crate::agreement;
use crate::error::{CryptoError, Result};
use crate::keys::{derive_keys, KdfParams, SessionKeys};
use crate::signing::{self, Verification};
use crate::types::UserId;

/// Salt length in bytes.
pub const SALT_LENGTH: usize = 32;

/// Something that can encrypt and decrypt field payloads.
pub trait Encryptor {
    fn encrypt(&self, plaintext: &[u8]) -> Result<String>;
    fn decrypt(&self, payload: &str) -> Result<Vec<u8>>;
}

/// Something that can produce self-contained signed blobs.
pub trait Signer {
    fn sign(&self, data: &[u8]) -> Result<String>;
}

/// Something that can check a signed blob and recover its data.
pub trait Verifier {
    fn verify(&self, blob: &str) -> Result<Verification>;
}

/// The persisted public half of a user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserIdentity {
    pub id: UserId,
    pub name: String,
    /// Base64 salt for the symmetric key derivation.
    pub crypto_salt: String,
    /// Base64 salt for the signing key derivation.
    pub signing_salt: String,
    /// Base64 SEC1 (uncompressed) public key.
    pub public_key: String,
    pub created_at: i64,
    pub updated_at: i64,
}

impl UserIdentity {
    pub fn crypto_salt_bytes(&self) -> Result<Vec<u8>> {
        decode_b64(&self.crypto_salt, "crypto salt")
    }

    pub fn signing_salt_bytes(&self) -> Result<Vec<u8>> {
        decode_b64(&self.signing_salt, "signing salt")
    }

    /// Parse the stored public key for signature verification.
    pub fn verifying_key(&self) -> Result<VerifyingKey> {
        let raw = decode_b64(&self.public_key, "public key")?;
        VerifyingKey::from_sec1_bytes(&raw)
            .map_err(|e| CryptoError::MalformedPublicKey(e.to_string()))
    }

    /// Parse the stored public key for key agreement.
    pub fn agreement_key(&self) -> Result<PublicKey> {
        let raw = decode_b64(&self.public_key, "public key")?;
        agreement::parse_public_key(&raw)
    }
}

impl Verifier for UserIdentity {
    fn verify(&self, blob: &str) -> Result<Verification> {
        signing::verify(blob, &self.verifying_key()?)
    }
}

fn decode_b64(value: &str, what: &str) -> Result<Vec<u8>> {
    BASE64
        .decode(value)
        .map_err(|e| CryptoError::KeyDerivation(format!("bad base64 {what}: {e}")))
}

/// Generate a fresh (crypto, signing) salt pair, base64-encoded.
pub fn new_salts() -> Result<(String, String)> {
    let mut buf = [0u8; SALT_LENGTH * 2];
    OsRng
        .try_fill_bytes(&mut buf)
        .map_err(|e| CryptoError::Rng(e.to_string()))?;
    Ok((
        BASE64.encode(&buf[..SALT_LENGTH]),
        BASE64.encode(&buf[SALT_LENGTH..]),
    ))
}

/// Base64 SEC1 encoding of a verifying key, as stored on identities.
pub fn encode_public_key(key: &VerifyingKey) -> String {
    BASE64.encode(key.to_encoded_point(false).as_bytes())
}

/// An unlocked user: identity plus the private keys derived from the
/// password. Dropping the session wipes the symmetric key.
pub struct Session {
    identity: UserIdentity,
    keys: SessionKeys,
}

impl Session {
    /// Reconstruct the session keys from a password.
    ///
    /// This does not authenticate; callers compare the derived public
    /// key against the stored one to decide whether the password was
    /// right.
    pub fn unlock(identity: UserIdentity, password: &str, params: KdfParams) -> Result<Self> {
        let keys = derive_keys(
            password,
            &identity.crypto_salt_bytes()?,
            &identity.signing_salt_bytes()?,
            params,
        )?;
        Ok(Self { identity, keys })
    }

    pub fn from_parts(identity: UserIdentity, keys: SessionKeys) -> Self {
        Self { identity, keys }
    }

    pub fn identity(&self) -> &UserIdentity {
        &self.identity
    }

    pub fn user_id(&self) -> UserId {
        self.identity.id
    }

    pub fn name(&self) -> &str {
        &self.identity.name
    }

    pub fn keys(&self) -> &SessionKeys {
        &self.keys
    }

    /// Public key as derived from the password, base64 SEC1.
    pub fn derived_public_key(&self) -> String {
        encode_public_key(&self.keys.verifying_key())
    }

    /// Pairwise symmetric key shared with another user.
    pub fn shared_with(&self, peer: &UserIdentity) -> Result<SymmetricKey> {
        agreement::shared_secret(&self.keys.signing_key, &peer.agreement_key()?)
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("user", &self.identity.name)
            .finish_non_exhaustive()
    }
}

impl Encryptor for Session {
    fn encrypt(&self, plaintext: &[u8]) -> Result<String> {
        aead::encrypt(plaintext, &self.keys.crypto_key)
    }

    fn decrypt(&self, payload: &str) -> Result<Vec<u8>> {
        aead::decrypt(payload, &self.keys.crypto_key)
    }
}

impl Signer for Session {
    fn sign(&self, data: &[u8]) -> Result<String> {
        signing::sign(data, &self.keys.signing_key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TEST_PARAMS: KdfParams = KdfParams { rounds: 16 };

    fn test_identity(name: &str, password: &str) -> (UserIdentity, SessionKeys) {
        let (crypto_salt, signing_salt) = new_salts().unwrap();
        let keys = derive_keys(
            password,
            &BASE64.decode(&crypto_salt).unwrap(),
            &BASE64.decode(&signing_salt).unwrap(),
            TEST_PARAMS,
        )
        .unwrap();
        let identity = UserIdentity {
            id: UserId(1),
            name: name.to_string(),
            crypto_salt,
            signing_salt,
            public_key: encode_public_key(&keys.verifying_key()),
            created_at: 0,
            updated_at: 0,
        };
        (identity, keys)
    }

    #[test]
    fn test_unlock_reproduces_public_key() {
        let (identity, _) = test_identity("alice", "hunter2");
        let session = Session::unlock(identity.clone(), "hunter2", TEST_PARAMS).unwrap();
        assert_eq!(session.derived_public_key(), identity.public_key);
    }

    #[test]
    fn test_wrong_password_yields_different_public_key() {
        let (identity, _) = test_identity("alice", "hunter2");
        let session = Session::unlock(identity.clone(), "wrong", TEST_PARAMS).unwrap();
        assert_ne!(session.derived_public_key(), identity.public_key);
    }

    #[test]
    fn test_session_signs_identity_verifies() {
        let (identity, keys) = test_identity("alice", "hunter2");
        let session = Session::from_parts(identity.clone(), keys);

        let blob = session.sign(b"assertion").unwrap();
        let result = identity.verify(&blob).unwrap();

        assert!(result.valid);
        assert_eq!(result.data, b"assertion");
    }

    #[test]
    fn test_encrypt_decrypt_through_session() {
        let (identity, keys) = test_identity("alice", "hunter2");
        let session = Session::from_parts(identity, keys);

        let payload = session.encrypt(b"private field").unwrap();
        assert_eq!(session.decrypt(&payload).unwrap(), b"private field");
    }

    #[test]
    fn test_shared_with_is_symmetric() {
        let (alice_id, alice_keys) = test_identity("alice", "pw-a");
        let (bob_id, bob_keys) = test_identity("bob", "pw-b");

        let alice = Session::from_parts(alice_id.clone(), alice_keys);
        let bob = Session::from_parts(bob_id.clone(), bob_keys);

        let ab = alice.shared_with(&bob_id).unwrap();
        let ba = bob.shared_with(&alice_id).unwrap();
        assert_eq!(ab.as_bytes(), ba.as_bytes());
    }

    #[test]
    fn test_new_salts_are_distinct() {
        let (a, b) = new_salts().unwrap();
        assert_ne!(a, b);
        assert_eq!(BASE64.decode(&a).unwrap().len(), SALT_LENGTH);
    }
}
