//! The change queue: per-recipient mailboxes with dedup and replay.
//!
//! Each `(entry, recipient)` slot holds at most one pending envelope.
//! Publishing into an occupied slot replaces the envelope with one
//! carrying the union of the pending field set and the new changes, so
//! intermediate changes survive even though only the newest ciphertext
//! does. Replay drains a recipient's mailbox once; envelopes that fail
//! to open are dropped, never retried, since no other key could
//! legitimately apply.

use std::collections::BTreeSet;
use std::sync::{Arc, Mutex};

use tracing::{debug, warn};

use strongroom_core::{EntryId, FieldName, Session, UserIdentity};
use strongroom_store::{ChangeEnvelopeRecord, Store};

use crate::envelope::{self, FieldChanges};
use crate::error::{Result, SyncError};

/// Counts from one replay pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReplayReport {
    /// Envelopes decrypted, authenticated, and applied.
    pub applied: usize,
    /// Envelopes that failed to open or apply and were discarded.
    pub dropped: usize,
}

/// Mailbox front-end over a [`Store`].
pub struct ChangeQueue<S: Store> {
    store: Arc<S>,
    /// Serializes read-merge-replace cycles so concurrent publishes to
    /// the same slot cannot lose each other's fields.
    publish_lock: Mutex<()>,
}

impl<S: Store> ChangeQueue<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self {
            store,
            publish_lock: Mutex::new(()),
        }
    }

    /// Enqueue changed fields for one recipient.
    ///
    /// `changed` names the fields this commit touched; `snapshot` holds
    /// the sender's current plaintext for every field they can read.
    /// The sealed envelope carries values for `changed` unioned with
    /// whatever a pending envelope in the slot already announced.
    pub fn publish(
        &self,
        sender: &Session,
        recipient: &UserIdentity,
        entry_id: &EntryId,
        changed: &BTreeSet<FieldName>,
        snapshot: &FieldChanges,
        now: i64,
    ) -> Result<()> {
        let _guard = self.publish_lock.lock().unwrap_or_else(|e| e.into_inner());

        let mut union: BTreeSet<FieldName> = changed.clone();
        if let Some(pending) = self.store.envelope(entry_id, recipient.id)? {
            union.extend(pending.fields.iter().copied());
        }
        // Viewer-only data never travels.
        union.remove(&FieldName::Userdata);

        let mut changes = FieldChanges::new();
        for name in &union {
            match snapshot.get(name) {
                Some(value) => {
                    changes.insert(*name, value.clone());
                }
                None => {
                    warn!(
                        entry = %entry_id,
                        field = name.as_str(),
                        "sender has no value for pending field, dropping it from envelope"
                    );
                }
            }
        }
        if changes.is_empty() {
            return Ok(());
        }

        let record = envelope::seal(sender, recipient, entry_id, &changes, now)?;
        self.store.upsert_envelope(&record)?;
        debug!(
            entry = %entry_id,
            recipient = recipient.id.as_i64(),
            fields = changes.len(),
            "change envelope enqueued"
        );
        Ok(())
    }

    /// Drain the recipient's mailbox.
    ///
    /// `apply` receives each envelope's entry and decrypted field
    /// values. Every envelope leaves the mailbox exactly once whether
    /// it applies or not.
    pub fn replay<F>(&self, recipient: &Session, mut apply: F) -> Result<ReplayReport>
    where
        F: FnMut(&EntryId, &FieldChanges) -> Result<()>,
    {
        let mut report = ReplayReport::default();

        for record in self.store.envelopes_for(recipient.user_id())? {
            match self.open_and_apply(recipient, &record, &mut apply) {
                Ok(()) => report.applied += 1,
                Err(e) => {
                    warn!(
                        entry = %record.entry_id,
                        sender = record.sender_id.as_i64(),
                        error = %e,
                        "dropping change envelope"
                    );
                    report.dropped += 1;
                }
            }
            self.store
                .delete_envelope(&record.entry_id, recipient.user_id())?;
        }

        Ok(report)
    }

    fn open_and_apply<F>(
        &self,
        recipient: &Session,
        record: &ChangeEnvelopeRecord,
        apply: &mut F,
    ) -> Result<()>
    where
        F: FnMut(&EntryId, &FieldChanges) -> Result<()>,
    {
        let sender = self
            .store
            .user_by_id(record.sender_id)?
            .ok_or_else(|| SyncError::UnknownSender(record.sender_id.to_string()))?;
        let changes = envelope::open(record, recipient, &sender)?;
        apply(&record.entry_id, &changes)
    }
}
