//! Test fixtures and helpers.
//!
//! Common setup code for integration tests.

use strongroom::{Session, Vault, VaultConfig};
use strongroom_core::{derive_keys, encode_public_key, KdfParams, UserId, UserIdentity};
use strongroom_store::MemoryStore;

/// KDF parameters cheap enough to run hundreds of derivations per test.
pub const TEST_KDF: KdfParams = KdfParams { rounds: 16 };

/// Vault configuration with test-speed key derivation.
pub fn test_config() -> VaultConfig {
    VaultConfig {
        kdf: TEST_KDF,
        ..VaultConfig::default()
    }
}

/// A vault over a memory store, configured for fast key derivation.
pub struct TestVault {
    pub vault: Vault<MemoryStore>,
}

impl TestVault {
    pub fn new() -> Self {
        Self {
            vault: Vault::new(MemoryStore::new(), test_config()),
        }
    }

    /// Register a user and log them in, in one step.
    pub fn user(&self, name: &str, password: &str) -> Session {
        self.vault
            .create_user(name, password)
            .expect("create test user");
        self.vault.login(name, password).expect("login test user")
    }
}

impl Default for TestVault {
    fn default() -> Self {
        Self::new()
    }
}

/// The standard two-party setup: one vault, alice and bob logged in.
pub fn alice_and_bob() -> (TestVault, Session, Session) {
    let tv = TestVault::new();
    let alice = tv.user("alice", "alice-password");
    let bob = tv.user("bob", "bob-password");
    (tv, alice, bob)
}

/// Build a session with no backing store, for pure crypto tests.
///
/// Salts come from the name so two calls with the same name agree on
/// key material.
pub fn standalone_session(name: &str) -> Session {
    let crypto_salt = format!("{name}-crypto-salt");
    let signing_salt = format!("{name}-signing-salt");
    let keys = derive_keys(
        &format!("{name}-password"),
        crypto_salt.as_bytes(),
        signing_salt.as_bytes(),
        TEST_KDF,
    )
    .expect("derive test keys");

    use base64::Engine as _;
    let b64 = base64::engine::general_purpose::STANDARD;
    let identity = UserIdentity {
        id: UserId(0),
        name: name.to_string(),
        crypto_salt: b64.encode(crypto_salt.as_bytes()),
        signing_salt: b64.encode(signing_salt.as_bytes()),
        public_key: encode_public_key(&keys.verifying_key()),
        created_at: 0,
        updated_at: 0,
    };
    Session::from_parts(identity, keys)
}

#[cfg(test)]
mod tests {
    use super::*;
    use strongroom::FieldName;

    #[test]
    fn test_fixture_round_trip() {
        let (tv, alice, _bob) = alice_and_bob();

        let entry = tv.vault.create_entry(&alice).unwrap();
        tv.vault
            .write_field(&alice, &entry, FieldName::Password, b"hunter2")
            .unwrap();
        let read = tv.vault.read_field(&alice, &entry, FieldName::Password);
        assert_eq!(read.unwrap(), Some(b"hunter2".to_vec()));
    }

    #[test]
    fn test_standalone_sessions_agree() {
        let a = standalone_session("carol");
        let b = standalone_session("carol");
        assert_eq!(a.derived_public_key(), b.derived_public_key());
    }
}
