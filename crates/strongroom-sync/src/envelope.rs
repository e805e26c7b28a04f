//! Sealing and opening change envelopes.
//!
//! A change envelope carries the plaintext values of changed fields,
//! CBOR-encoded and AEAD-encrypted under the pairwise secret of sender
//! and recipient. The sender's signed assertion is the AAD, so the
//! payload only opens with both the right pairwise key and the
//! untampered assertion.

use std::collections::BTreeMap;

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};

use strongroom_core::{
    decrypt_aad, encrypt_aad, EntryId, FieldName, Session, SymmetricKey, UserIdentity,
};
use strongroom_store::ChangeEnvelopeRecord;

use crate::assertion::SenderAssertion;
use crate::error::{Result, SyncError};

/// Plaintext field values keyed by field name.
pub type FieldChanges = BTreeMap<FieldName, Vec<u8>>;

fn encode_changes(changes: &FieldChanges) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    ciborium::into_writer(changes, &mut buf).map_err(|e| SyncError::Codec(e.to_string()))?;
    Ok(buf)
}

fn decode_changes(raw: &[u8]) -> Result<FieldChanges> {
    ciborium::from_reader(raw).map_err(|e| SyncError::Codec(e.to_string()))
}

fn assertion_aad(signed_assertion: &str) -> Result<Vec<u8>> {
    BASE64
        .decode(signed_assertion)
        .map_err(|e| SyncError::Codec(e.to_string()))
}

/// Seal changed field values into an envelope for one recipient.
pub fn seal(
    sender: &Session,
    recipient: &UserIdentity,
    entry_id: &EntryId,
    changes: &FieldChanges,
    now: i64,
) -> Result<ChangeEnvelopeRecord> {
    let signed_assertion = SenderAssertion::seal(sender.name(), now, sender)?;
    let aad = assertion_aad(&signed_assertion)?;

    let key = sender.shared_with(recipient)?;
    let payload = encrypt_aad(&encode_changes(changes)?, &aad, &key)?;

    Ok(ChangeEnvelopeRecord {
        entry_id: entry_id.clone(),
        recipient_id: recipient.id,
        sender_id: sender.user_id(),
        fields: changes.keys().copied().collect(),
        payload,
        signed_assertion,
        created_at: now,
    })
}

fn open_with(
    envelope: &ChangeEnvelopeRecord,
    key: &SymmetricKey,
) -> Result<FieldChanges> {
    let aad = assertion_aad(&envelope.signed_assertion)?;
    let plaintext = decrypt_aad(&envelope.payload, &aad, key)?;
    decode_changes(&plaintext)
}

/// Open an envelope as its recipient, authenticating the sender.
pub fn open(
    envelope: &ChangeEnvelopeRecord,
    recipient: &Session,
    sender: &UserIdentity,
) -> Result<FieldChanges> {
    SenderAssertion::open(&envelope.signed_assertion, &sender.name, sender)?;
    let key = recipient.shared_with(sender)?;
    open_with(envelope, &key)
}

/// Re-encrypt a pending envelope for a recipient whose key changed.
///
/// The sender's assertion (and hence the AAD) is untouched; only the
/// pairwise secret moves from the recipient's old scalar to the new
/// one. The sender never needs to participate.
pub fn migrate_recipient_key(
    envelope: &ChangeEnvelopeRecord,
    old_recipient: &Session,
    new_recipient: &Session,
    sender: &UserIdentity,
) -> Result<ChangeEnvelopeRecord> {
    let aad = assertion_aad(&envelope.signed_assertion)?;
    let old_key = old_recipient.shared_with(sender)?;
    let plaintext = decrypt_aad(&envelope.payload, &aad, &old_key)?;

    let new_key = new_recipient.shared_with(sender)?;
    let payload = encrypt_aad(&plaintext, &aad, &new_key)?;

    Ok(ChangeEnvelopeRecord {
        payload,
        ..envelope.clone()
    })
}

/// Re-seal a pending outbound envelope after the sender's key changed.
///
/// Recipients verify the assertion against the sender's stored public
/// key, so the assertion is re-signed under the new key and the payload
/// moves to the new pairwise secret. The original issue time is kept.
pub fn migrate_sender_key(
    envelope: &ChangeEnvelopeRecord,
    old_sender: &Session,
    new_sender: &Session,
    recipient: &UserIdentity,
) -> Result<ChangeEnvelopeRecord> {
    let old_key = old_sender.shared_with(recipient)?;
    let changes = open_with(envelope, &old_key)?;

    let signed_assertion =
        SenderAssertion::seal(new_sender.name(), envelope.created_at, new_sender)?;
    let aad = assertion_aad(&signed_assertion)?;
    let new_key = new_sender.shared_with(recipient)?;
    let payload = encrypt_aad(&encode_changes(&changes)?, &aad, &new_key)?;

    Ok(ChangeEnvelopeRecord {
        payload,
        signed_assertion,
        ..envelope.clone()
    })
}

/// Open an envelope the session itself sealed earlier.
///
/// The pairwise secret is symmetric, so the sender can always recover
/// a pending payload to merge further changes into it.
pub fn open_as_sender(
    envelope: &ChangeEnvelopeRecord,
    sender: &Session,
    recipient: &UserIdentity,
) -> Result<FieldChanges> {
    SenderAssertion::open(
        &envelope.signed_assertion,
        sender.name(),
        sender.identity(),
    )?;
    let key = sender.shared_with(recipient)?;
    open_with(envelope, &key)
}

#[cfg(test)]
mod tests {
    use super::*;
    use strongroom_core::{derive_keys, encode_public_key, KdfParams, UserId};

    const TEST_PARAMS: KdfParams = KdfParams { rounds: 16 };

    fn test_user(id: i64, name: &str) -> (Session, UserIdentity) {
        let keys = derive_keys(name, b"csalt", b"ssalt", TEST_PARAMS).unwrap();
        let identity = UserIdentity {
            id: UserId(id),
            name: name.to_string(),
            crypto_salt: String::new(),
            signing_salt: String::new(),
            public_key: encode_public_key(&keys.verifying_key()),
            created_at: 0,
            updated_at: 0,
        };
        (Session::from_parts(identity.clone(), keys), identity)
    }

    fn changes(pairs: &[(FieldName, &str)]) -> FieldChanges {
        pairs
            .iter()
            .map(|(name, value)| (*name, value.as_bytes().to_vec()))
            .collect()
    }

    #[test]
    fn test_seal_open_roundtrip() {
        let (alice, _) = test_user(1, "alice");
        let (bob, bob_id) = test_user(2, "bob");
        let entry = EntryId::from_string("e1");

        let sent = changes(&[(FieldName::Password, "s3cret"), (FieldName::Url, "http://x")]);
        let envelope = seal(&alice, &bob_id, &entry, &sent, 1000).unwrap();

        assert_eq!(envelope.sender_id, UserId(1));
        assert_eq!(envelope.recipient_id, UserId(2));
        assert_eq!(envelope.fields.len(), 2);

        let opened = open(&envelope, &bob, alice.identity()).unwrap();
        assert_eq!(opened, sent);
    }

    #[test]
    fn test_sender_can_reopen() {
        let (alice, _) = test_user(1, "alice");
        let (_, bob_id) = test_user(2, "bob");
        let entry = EntryId::from_string("e1");

        let sent = changes(&[(FieldName::Title, "new title")]);
        let envelope = seal(&alice, &bob_id, &entry, &sent, 1000).unwrap();

        let reopened = open_as_sender(&envelope, &alice, &bob_id).unwrap();
        assert_eq!(reopened, sent);
    }

    #[test]
    fn test_migrate_recipient_key() {
        let (alice, alice_id) = test_user(1, "alice");
        let (bob, bob_id) = test_user(2, "bob");
        let entry = EntryId::from_string("e1");

        let sent = changes(&[(FieldName::Comment, "note")]);
        let envelope = seal(&alice, &bob_id, &entry, &sent, 1000).unwrap();

        // Bob's password changes, giving him a fresh scalar.
        let new_keys = derive_keys("new password", b"csalt2", b"ssalt2", TEST_PARAMS).unwrap();
        let mut new_identity = bob_id.clone();
        new_identity.public_key = encode_public_key(&new_keys.verifying_key());
        let new_bob = Session::from_parts(new_identity, new_keys);

        let migrated = migrate_recipient_key(&envelope, &bob, &new_bob, &alice_id).unwrap();

        assert!(open(&envelope, &new_bob, &alice_id).is_err());
        assert_eq!(open(&migrated, &new_bob, &alice_id).unwrap(), sent);
    }

    #[test]
    fn test_migrate_sender_key() {
        let (alice, alice_id) = test_user(1, "alice");
        let (bob, bob_id) = test_user(2, "bob");
        let entry = EntryId::from_string("e1");

        let sent = changes(&[(FieldName::Username, "al")]);
        let envelope = seal(&alice, &bob_id, &entry, &sent, 1000).unwrap();

        // Alice's password changes, giving her a fresh scalar.
        let new_keys = derive_keys("rotated", b"csalt3", b"ssalt3", TEST_PARAMS).unwrap();
        let mut new_identity = alice_id.clone();
        new_identity.public_key = encode_public_key(&new_keys.verifying_key());
        let new_alice = Session::from_parts(new_identity.clone(), new_keys);

        let migrated = migrate_sender_key(&envelope, &alice, &new_alice, &bob_id).unwrap();
        assert_eq!(migrated.created_at, envelope.created_at);

        // Against alice's new identity the old envelope is dead but the
        // migrated one opens.
        assert!(open(&envelope, &bob, &new_identity).is_err());
        assert_eq!(open(&migrated, &bob, &new_identity).unwrap(), sent);
    }

    #[test]
    fn test_third_party_cannot_open() {
        let (alice, alice_id) = test_user(1, "alice");
        let (_, bob_id) = test_user(2, "bob");
        let (carol, _) = test_user(3, "carol");
        let entry = EntryId::from_string("e1");

        let envelope = seal(&alice, &bob_id, &entry, &changes(&[(FieldName::Url, "u")]), 0)
            .unwrap();
        assert!(open(&envelope, &carol, &alice_id).is_err());
    }

    #[test]
    fn test_swapped_assertion_fails() {
        let (alice, alice_id) = test_user(1, "alice");
        let (bob, bob_id) = test_user(2, "bob");
        let entry = EntryId::from_string("e1");

        let mut envelope =
            seal(&alice, &bob_id, &entry, &changes(&[(FieldName::Url, "u")]), 0).unwrap();
        // A fresh assertion from the same sender still cannot stand in:
        // the original's bytes are baked into the AAD.
        envelope.signed_assertion = SenderAssertion::seal("alice", 999, &alice).unwrap();

        assert!(open(&envelope, &bob, &alice_id).is_err());
    }
}
