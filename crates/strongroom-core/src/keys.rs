//! Password-based key derivation.
//!
//! Both keys a user holds are deterministic functions of their password
//! and a per-user random salt: a 256-bit symmetric encryption key and a
//! P-521 signing scalar. Deriving the same password over the same salts
//! always yields the same key pair, which is how login works.

use p521::ecdsa::{SigningKey, VerifyingKey};
use p521::elliptic_curve::bigint::{NonZero, U576};
use p521::elliptic_curve::scalar::ScalarPrimitive;
use p521::elliptic_curve::Curve;
use p521::{NistP521, NonZeroScalar, Scalar, SecretKey};
use pbkdf2::pbkdf2_hmac;
use sha2::Sha512;
use zeroize::Zeroize;

use crate::aead::{SymmetricKey, KEY_LENGTH};
use crate::error::{CryptoError, Result};

/// Width of the raw scalar derivation in bytes. Wide enough that the
/// reduction modulo the group order is statistically unbiased.
const SCALAR_DERIVE_LENGTH: usize = 72;

/// Tunable key-derivation parameters.
///
/// The default round count is the production setting; tests shrink it
/// to keep fixtures fast.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KdfParams {
    /// PBKDF2-HMAC-SHA512 iteration count.
    pub rounds: u32,
}

impl KdfParams {
    /// Production iteration count.
    pub const DEFAULT_ROUNDS: u32 = 100_000;
}

impl Default for KdfParams {
    fn default() -> Self {
        Self {
            rounds: Self::DEFAULT_ROUNDS,
        }
    }
}

/// The full private key material derived from a password.
pub struct SessionKeys {
    /// Symmetric key for the user's private fields.
    pub crypto_key: SymmetricKey,
    /// ECDSA signing key over P-521.
    pub signing_key: SigningKey,
}

impl SessionKeys {
    /// The public half of the signing key.
    pub fn verifying_key(&self) -> VerifyingKey {
        VerifyingKey::from(&self.signing_key)
    }
}

impl std::fmt::Debug for SessionKeys {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "SessionKeys(..)")
    }
}

/// Derive a user's key pair from their password and salts.
pub fn derive_keys(
    password: &str,
    crypto_salt: &[u8],
    signing_salt: &[u8],
    params: KdfParams,
) -> Result<SessionKeys> {
    let crypto_key = derive_symmetric_key(password, crypto_salt, params);
    let signing_key = derive_signing_key(password, signing_salt, params)?;
    Ok(SessionKeys {
        crypto_key,
        signing_key,
    })
}

/// Derive the symmetric encryption key half.
pub fn derive_symmetric_key(password: &str, salt: &[u8], params: KdfParams) -> SymmetricKey {
    let mut out = [0u8; KEY_LENGTH];
    pbkdf2_hmac::<Sha512>(password.as_bytes(), salt, params.rounds, &mut out);
    SymmetricKey::from_bytes(out)
}

/// Derive the ECDSA signing key half.
///
/// The PBKDF2 output, wider than the group order `n`, is mapped to
/// `k = (raw mod (n - 1)) + 1`, a non-zero scalar in `[1, n - 1]`.
pub fn derive_signing_key(password: &str, salt: &[u8], params: KdfParams) -> Result<SigningKey> {
    let mut raw = [0u8; SCALAR_DERIVE_LENGTH];
    pbkdf2_hmac::<Sha512>(password.as_bytes(), salt, params.rounds, &mut raw);

    let wide = U576::from_be_slice(&raw);
    raw.zeroize();

    let modulus = Option::from(NonZero::new(NistP521::ORDER.wrapping_sub(&U576::ONE)))
        .ok_or_else(|| CryptoError::KeyDerivation("degenerate group order".into()))?;
    let k = wide.rem(&modulus).wrapping_add(&U576::ONE);

    let scalar: Scalar = Option::<ScalarPrimitive<NistP521>>::from(ScalarPrimitive::new(k))
        .ok_or_else(|| CryptoError::KeyDerivation("derived scalar out of range".into()))?
        .into();
    let nonzero = Option::<NonZeroScalar>::from(NonZeroScalar::new(scalar))
        .ok_or_else(|| CryptoError::KeyDerivation("derived scalar is zero".into()))?;
    let secret = SecretKey::from(nonzero);
    SigningKey::from_bytes(&secret.to_bytes())
        .map_err(|e| CryptoError::KeyDerivation(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    const TEST_PARAMS: KdfParams = KdfParams { rounds: 16 };

    #[test]
    fn test_derivation_is_deterministic() {
        let a = derive_keys("hunter2", b"csalt", b"ssalt", TEST_PARAMS).unwrap();
        let b = derive_keys("hunter2", b"csalt", b"ssalt", TEST_PARAMS).unwrap();

        assert_eq!(a.crypto_key.as_bytes(), b.crypto_key.as_bytes());
        assert_eq!(
            a.verifying_key().to_encoded_point(false),
            b.verifying_key().to_encoded_point(false)
        );
    }

    #[test]
    fn test_different_password_different_keys() {
        let a = derive_keys("hunter2", b"csalt", b"ssalt", TEST_PARAMS).unwrap();
        let b = derive_keys("hunter3", b"csalt", b"ssalt", TEST_PARAMS).unwrap();

        assert_ne!(a.crypto_key.as_bytes(), b.crypto_key.as_bytes());
        assert_ne!(
            a.verifying_key().to_encoded_point(false),
            b.verifying_key().to_encoded_point(false)
        );
    }

    #[test]
    fn test_different_salts_different_keys() {
        let a = derive_keys("hunter2", b"salt-a", b"salt-a", TEST_PARAMS).unwrap();
        let b = derive_keys("hunter2", b"salt-b", b"salt-b", TEST_PARAMS).unwrap();

        assert_ne!(a.crypto_key.as_bytes(), b.crypto_key.as_bytes());
    }

    #[test]
    fn test_derived_scalar_signs_and_verifies() {
        // Degenerate inputs still land in [1, n-1] and produce a
        // working key pair.
        let key = derive_signing_key("", b"", TEST_PARAMS).unwrap();
        let blob = crate::signing::sign(b"payload", &key).unwrap();
        let result = crate::signing::verify(&blob, &VerifyingKey::from(&key)).unwrap();
        assert!(result.valid);
    }

    #[test]
    fn test_rounds_change_output() {
        let a = derive_symmetric_key("hunter2", b"salt", KdfParams { rounds: 16 });
        let b = derive_symmetric_key("hunter2", b"salt", KdfParams { rounds: 17 });
        assert_ne!(a.as_bytes(), b.as_bytes());
    }
}
