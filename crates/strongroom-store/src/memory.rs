//! In-memory implementation of the Store trait.
//!
//! Primarily for testing. Same semantics as SQLite but nothing is
//! persisted; data is lost when the store is dropped.

use std::collections::HashMap;
use std::sync::RwLock;

use strongroom_core::{EntryId, UserId, UserIdentity};

use crate::error::{Result, StoreError};
use crate::records::{ChangeEnvelopeRecord, EntryViewRecord, GrantRecord, NewUser, RekeyBatch};
use crate::traits::Store;

/// In-memory store. Thread-safe via RwLock.
pub struct MemoryStore {
    inner: RwLock<MemoryStoreInner>,
}

struct MemoryStoreInner {
    /// Users indexed by id.
    users: HashMap<UserId, UserIdentity>,

    /// Name uniqueness index.
    names: HashMap<String, UserId>,

    /// Views keyed by (entry, viewer).
    views: HashMap<(EntryId, UserId), EntryViewRecord>,

    /// Pending envelopes keyed by (entry, recipient).
    envelopes: HashMap<(EntryId, UserId), ChangeEnvelopeRecord>,

    /// Grants keyed by (entry, grantee name).
    grants: HashMap<(EntryId, String), GrantRecord>,

    next_user_id: i64,
}

impl MemoryStore {
    /// Create a new empty in-memory store.
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(MemoryStoreInner {
                users: HashMap::new(),
                names: HashMap::new(),
                views: HashMap::new(),
                envelopes: HashMap::new(),
                grants: HashMap::new(),
                next_user_id: 1,
            }),
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl Store for MemoryStore {
    fn create_user(&self, user: &NewUser) -> Result<UserIdentity> {
        let mut inner = self.inner.write().unwrap();

        if inner.names.contains_key(&user.name) {
            return Err(StoreError::AlreadyExists(format!("user {}", user.name)));
        }

        let id = UserId(inner.next_user_id);
        inner.next_user_id += 1;
        let now = now_millis();

        let identity = UserIdentity {
            id,
            name: user.name.clone(),
            crypto_salt: user.crypto_salt.clone(),
            signing_salt: user.signing_salt.clone(),
            public_key: user.public_key.clone(),
            created_at: now,
            updated_at: now,
        };

        inner.names.insert(identity.name.clone(), id);
        inner.users.insert(id, identity.clone());
        Ok(identity)
    }

    fn user_by_name(&self, name: &str) -> Result<Option<UserIdentity>> {
        let inner = self.inner.read().unwrap();
        Ok(inner
            .names
            .get(name)
            .and_then(|id| inner.users.get(id))
            .cloned())
    }

    fn user_by_id(&self, id: UserId) -> Result<Option<UserIdentity>> {
        let inner = self.inner.read().unwrap();
        Ok(inner.users.get(&id).cloned())
    }

    fn delete_user(&self, id: UserId) -> Result<()> {
        let mut inner = self.inner.write().unwrap();
        if let Some(user) = inner.users.remove(&id) {
            inner.names.remove(&user.name);
        }
        Ok(())
    }

    fn upsert_view(&self, view: &EntryViewRecord) -> Result<()> {
        let mut inner = self.inner.write().unwrap();
        let key = (view.entry_id.clone(), view.user_id);

        let mut record = view.clone();
        record.updated_at = now_millis();
        if let Some(existing) = inner.views.get(&key) {
            record.created_at = existing.created_at;
        }
        inner.views.insert(key, record);
        Ok(())
    }

    fn view(&self, entry_id: &EntryId, user_id: UserId) -> Result<Option<EntryViewRecord>> {
        let inner = self.inner.read().unwrap();
        Ok(inner.views.get(&(entry_id.clone(), user_id)).cloned())
    }

    fn views_for_user(&self, user_id: UserId) -> Result<Vec<EntryViewRecord>> {
        let inner = self.inner.read().unwrap();
        let mut views: Vec<_> = inner
            .views
            .values()
            .filter(|v| v.user_id == user_id)
            .cloned()
            .collect();
        views.sort_by(|a, b| a.entry_id.cmp(&b.entry_id));
        Ok(views)
    }

    fn views_for_entry(&self, entry_id: &EntryId) -> Result<Vec<EntryViewRecord>> {
        let inner = self.inner.read().unwrap();
        let mut views: Vec<_> = inner
            .views
            .values()
            .filter(|v| &v.entry_id == entry_id)
            .cloned()
            .collect();
        views.sort_by_key(|v| v.user_id);
        Ok(views)
    }

    fn views_authored_by(&self, authority_id: UserId) -> Result<Vec<EntryViewRecord>> {
        let inner = self.inner.read().unwrap();
        let mut views: Vec<_> = inner
            .views
            .values()
            .filter(|v| v.authority_id == authority_id)
            .cloned()
            .collect();
        views.sort_by(|a, b| (&a.entry_id, a.user_id).cmp(&(&b.entry_id, b.user_id)));
        Ok(views)
    }

    fn delete_view(&self, entry_id: &EntryId, user_id: UserId) -> Result<()> {
        let mut inner = self.inner.write().unwrap();
        inner.views.remove(&(entry_id.clone(), user_id));
        Ok(())
    }

    fn upsert_envelope(&self, envelope: &ChangeEnvelopeRecord) -> Result<()> {
        let mut inner = self.inner.write().unwrap();
        inner.envelopes.insert(
            (envelope.entry_id.clone(), envelope.recipient_id),
            envelope.clone(),
        );
        Ok(())
    }

    fn envelope(
        &self,
        entry_id: &EntryId,
        recipient_id: UserId,
    ) -> Result<Option<ChangeEnvelopeRecord>> {
        let inner = self.inner.read().unwrap();
        Ok(inner
            .envelopes
            .get(&(entry_id.clone(), recipient_id))
            .cloned())
    }

    fn envelopes_for(&self, recipient_id: UserId) -> Result<Vec<ChangeEnvelopeRecord>> {
        let inner = self.inner.read().unwrap();
        let mut envelopes: Vec<_> = inner
            .envelopes
            .values()
            .filter(|e| e.recipient_id == recipient_id)
            .cloned()
            .collect();
        envelopes.sort_by(|a, b| a.entry_id.cmp(&b.entry_id));
        Ok(envelopes)
    }

    fn envelopes_from(&self, sender_id: UserId) -> Result<Vec<ChangeEnvelopeRecord>> {
        let inner = self.inner.read().unwrap();
        let mut envelopes: Vec<_> = inner
            .envelopes
            .values()
            .filter(|e| e.sender_id == sender_id)
            .cloned()
            .collect();
        envelopes.sort_by(|a, b| (&a.entry_id, a.recipient_id).cmp(&(&b.entry_id, b.recipient_id)));
        Ok(envelopes)
    }

    fn delete_envelope(&self, entry_id: &EntryId, recipient_id: UserId) -> Result<()> {
        let mut inner = self.inner.write().unwrap();
        inner.envelopes.remove(&(entry_id.clone(), recipient_id));
        Ok(())
    }

    fn delete_envelopes_involving(&self, user_id: UserId) -> Result<()> {
        let mut inner = self.inner.write().unwrap();
        inner
            .envelopes
            .retain(|_, e| e.recipient_id != user_id && e.sender_id != user_id);
        Ok(())
    }

    fn upsert_grant(&self, record: &GrantRecord) -> Result<()> {
        let mut inner = self.inner.write().unwrap();
        inner.grants.insert(
            (record.grant.entry_id.clone(), record.grant.grantee.clone()),
            record.clone(),
        );
        Ok(())
    }

    fn grant(&self, entry_id: &EntryId, grantee: &str) -> Result<Option<GrantRecord>> {
        let inner = self.inner.read().unwrap();
        Ok(inner
            .grants
            .get(&(entry_id.clone(), grantee.to_string()))
            .cloned())
    }

    fn grants_by_signer(&self, signer: &str) -> Result<Vec<GrantRecord>> {
        let inner = self.inner.read().unwrap();
        let mut grants: Vec<_> = inner
            .grants
            .values()
            .filter(|g| g.grant.signer == signer)
            .cloned()
            .collect();
        grants.sort_by(|a, b| {
            (&a.grant.entry_id, &a.grant.grantee).cmp(&(&b.grant.entry_id, &b.grant.grantee))
        });
        Ok(grants)
    }

    fn delete_grants_for_grantee(&self, grantee: &str) -> Result<()> {
        let mut inner = self.inner.write().unwrap();
        inner.grants.retain(|_, g| g.grant.grantee != grantee);
        Ok(())
    }

    fn apply_rekey(&self, batch: &RekeyBatch) -> Result<()> {
        // A single write lock makes the whole swap atomic: nothing can
        // observe a partially applied batch.
        let mut inner = self.inner.write().unwrap();
        let now = now_millis();

        if !inner.users.contains_key(&batch.user_id) {
            return Err(StoreError::NotFound(format!("user {}", batch.user_id)));
        }

        if let Some(public_key) = &batch.public_key {
            if let Some(user) = inner.users.get_mut(&batch.user_id) {
                user.public_key = public_key.clone();
                user.updated_at = now;
            }
        }

        for view in &batch.views {
            let mut record = view.clone();
            record.updated_at = now;
            inner
                .views
                .insert((record.entry_id.clone(), record.user_id), record);
        }

        for envelope in &batch.envelopes {
            inner.envelopes.insert(
                (envelope.entry_id.clone(), envelope.recipient_id),
                envelope.clone(),
            );
        }

        for update in &batch.permissions {
            if let Some(view) = inner
                .views
                .get_mut(&(update.entry_id.clone(), update.user_id))
            {
                view.permissions = update.permissions.clone();
                view.authority_id = update.authority_id;
                view.updated_at = now;
            }
        }

        for record in &batch.grants {
            inner.grants.insert(
                (record.grant.entry_id.clone(), record.grant.grantee.clone()),
                record.clone(),
            );
        }

        Ok(())
    }
}

/// Get current time in milliseconds.
fn now_millis() -> i64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}
