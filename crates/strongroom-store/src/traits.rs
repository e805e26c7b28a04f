//! Store trait: the abstract interface for vault persistence.
//!
//! This trait keeps the vault storage-agnostic. Implementations include
//! SQLite (primary) and in-memory (for tests).

use strongroom_core::{EntryId, UserId, UserIdentity};

use crate::error::Result;
use crate::records::{ChangeEnvelopeRecord, EntryViewRecord, GrantRecord, NewUser, RekeyBatch};

/// Synchronous persistence interface for users, views, envelopes, and
/// grants.
///
/// # Design Notes
///
/// - **User names are unique**: `create_user` fails with
///   `AlreadyExists` on a duplicate name.
/// - **Views are keyed `(entry_id, user_id)`**: `upsert_view` replaces
///   the existing record wholesale.
/// - **Mailbox slots are keyed `(entry_id, recipient_id)`**: at most
///   one envelope per slot; `upsert_envelope` implements the replace
///   half of dedup (the merge half lives in the change queue).
/// - **`apply_rekey` is the atomic commit point**: the whole batch
///   lands or none of it does.
pub trait Store: Send + Sync {
    // ─────────────────────────────────────────────────────────────────
    // Users
    // ─────────────────────────────────────────────────────────────────

    /// Create a user, assigning an id and timestamps.
    fn create_user(&self, user: &NewUser) -> Result<UserIdentity>;

    /// Look up a user by unique name.
    fn user_by_name(&self, name: &str) -> Result<Option<UserIdentity>>;

    /// Look up a user by id.
    fn user_by_id(&self, id: UserId) -> Result<Option<UserIdentity>>;

    /// Delete a user row. Views, envelopes, and grants are cleaned up
    /// by the caller first.
    fn delete_user(&self, id: UserId) -> Result<()>;

    // ─────────────────────────────────────────────────────────────────
    // Entry views
    // ─────────────────────────────────────────────────────────────────

    /// Insert or replace a view, refreshing `updated_at`.
    fn upsert_view(&self, view: &EntryViewRecord) -> Result<()>;

    /// Fetch one user's view of one entry.
    fn view(&self, entry_id: &EntryId, user_id: UserId) -> Result<Option<EntryViewRecord>>;

    /// All views belonging to a user.
    fn views_for_user(&self, user_id: UserId) -> Result<Vec<EntryViewRecord>>;

    /// All views of an entry, across users.
    fn views_for_entry(&self, entry_id: &EntryId) -> Result<Vec<EntryViewRecord>>;

    /// All views whose permission blob was signed by the given user.
    fn views_authored_by(&self, authority_id: UserId) -> Result<Vec<EntryViewRecord>>;

    /// Remove one user's view of one entry.
    fn delete_view(&self, entry_id: &EntryId, user_id: UserId) -> Result<()>;

    // ─────────────────────────────────────────────────────────────────
    // Change envelopes
    // ─────────────────────────────────────────────────────────────────

    /// Insert or replace the envelope in a `(entry, recipient)` slot.
    fn upsert_envelope(&self, envelope: &ChangeEnvelopeRecord) -> Result<()>;

    /// Fetch the pending envelope for a slot, if any.
    fn envelope(
        &self,
        entry_id: &EntryId,
        recipient_id: UserId,
    ) -> Result<Option<ChangeEnvelopeRecord>>;

    /// All pending envelopes addressed to a recipient.
    fn envelopes_for(&self, recipient_id: UserId) -> Result<Vec<ChangeEnvelopeRecord>>;

    /// All pending envelopes sealed by a sender, across recipients.
    fn envelopes_from(&self, sender_id: UserId) -> Result<Vec<ChangeEnvelopeRecord>>;

    /// Remove the envelope in a slot.
    fn delete_envelope(&self, entry_id: &EntryId, recipient_id: UserId) -> Result<()>;

    /// Remove every envelope sent by or addressed to a user.
    fn delete_envelopes_involving(&self, user_id: UserId) -> Result<()>;

    // ─────────────────────────────────────────────────────────────────
    // Grants
    // ─────────────────────────────────────────────────────────────────

    /// Insert or replace the grant for `(entry_id, grantee)`.
    fn upsert_grant(&self, record: &GrantRecord) -> Result<()>;

    /// Fetch the grant for an entry and grantee.
    fn grant(&self, entry_id: &EntryId, grantee: &str) -> Result<Option<GrantRecord>>;

    /// All grants issued by a signer.
    fn grants_by_signer(&self, signer: &str) -> Result<Vec<GrantRecord>>;

    /// Remove every grant naming a user as grantee.
    fn delete_grants_for_grantee(&self, grantee: &str) -> Result<()>;

    // ─────────────────────────────────────────────────────────────────
    // Rekey
    // ─────────────────────────────────────────────────────────────────

    /// Apply a staged key migration atomically.
    fn apply_rekey(&self, batch: &RekeyBatch) -> Result<()>;
}
