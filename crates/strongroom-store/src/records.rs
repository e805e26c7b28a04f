//! Persisted record shapes.
//!
//! Everything crossing the storage boundary is one of these. Ciphertext
//! fields hold base64 `nonce ‖ ct ‖ tag`; signatures and permission
//! blobs are self-contained base64 signed blobs.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use strongroom_core::{EntryId, FieldName, UserId};
use strongroom_perms::Grant;

/// Input for creating a user; the store assigns id and timestamps.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewUser {
    pub name: String,
    pub crypto_salt: String,
    pub signing_salt: String,
    pub public_key: String,
}

/// One user's view of one entry.
///
/// Every field value is ciphertext under the viewing user's own key
/// (or, for `userdata`, only ever theirs). `permissions` is the signed
/// blob checked against `authority_id`'s public key. `modified` names
/// the fields written since the last commit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryViewRecord {
    pub entry_id: EntryId,
    pub user_id: UserId,
    pub authority_id: UserId,
    pub permissions: String,
    pub fields: BTreeMap<FieldName, String>,
    pub modified: BTreeSet<FieldName>,
    pub created_at: i64,
    pub updated_at: i64,
}

impl EntryViewRecord {
    /// Ciphertext for a field, if present.
    pub fn field(&self, name: FieldName) -> Option<&str> {
        self.fields.get(&name).map(String::as_str)
    }

    /// Set a field's ciphertext and mark it modified.
    pub fn set_field(&mut self, name: FieldName, ciphertext: String) {
        self.fields.insert(name, ciphertext);
        self.modified.insert(name);
    }
}

/// A pending change envelope in a recipient's mailbox.
///
/// At most one exists per `(entry_id, recipient_id)`; newer changes
/// replace it with a merged field set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeEnvelopeRecord {
    pub entry_id: EntryId,
    pub recipient_id: UserId,
    pub sender_id: UserId,
    /// Names of the fields the payload carries. Kept outside the
    /// ciphertext so a later sender can compute the union merge without
    /// being able to open the pending payload.
    pub fields: BTreeSet<FieldName>,
    /// base64 `nonce ‖ ct ‖ tag` over the CBOR field map.
    pub payload: String,
    /// The sender's signed identity+timestamp assertion; its raw bytes
    /// are the AAD of `payload`.
    pub signed_assertion: String,
    pub created_at: i64,
}

/// A stored delegation grant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GrantRecord {
    pub grant: Grant,
    pub created_at: i64,
}

/// A re-signed permission blob destined for someone else's view.
///
/// Produced during rekey or user removal when the authority's signing
/// key changes; `authority_id` is the new authority.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PermissionUpdate {
    pub entry_id: EntryId,
    pub user_id: UserId,
    pub authority_id: UserId,
    pub permissions: String,
}

/// Everything a key migration touches, staged for one atomic commit.
///
/// The store applies the whole batch or none of it; a user must never
/// end up with a mix of old- and new-key ciphertext.
#[derive(Debug, Clone)]
pub struct RekeyBatch {
    pub user_id: UserId,
    /// The user's new public key, or `None` when the signing key is
    /// unchanged.
    pub public_key: Option<String>,
    /// Views re-encrypted under the new key, replacing the stored ones.
    pub views: Vec<EntryViewRecord>,
    /// Inbox envelopes migrated to the new pairwise secrets.
    pub envelopes: Vec<ChangeEnvelopeRecord>,
    /// Permission blobs on other users' views, re-signed.
    pub permissions: Vec<PermissionUpdate>,
    /// Grants re-issued under the new (or admin) signing key.
    pub grants: Vec<GrantRecord>,
}

impl RekeyBatch {
    /// An empty batch for the given user.
    pub fn new(user_id: UserId) -> Self {
        Self {
            user_id,
            public_key: None,
            views: Vec::new(),
            envelopes: Vec::new(),
            permissions: Vec::new(),
            grants: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_field_marks_modified() {
        let mut view = EntryViewRecord {
            entry_id: EntryId::from_string("e1"),
            user_id: UserId(1),
            authority_id: UserId(1),
            permissions: String::new(),
            fields: BTreeMap::new(),
            modified: BTreeSet::new(),
            created_at: 0,
            updated_at: 0,
        };

        assert!(view.field(FieldName::Title).is_none());
        view.set_field(FieldName::Title, "ct".into());
        assert_eq!(view.field(FieldName::Title), Some("ct"));
        assert!(view.modified.contains(&FieldName::Title));
    }
}
