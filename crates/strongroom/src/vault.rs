//! The Vault: unified API for the strongroom system.
//!
//! The Vault brings together identity, permissions, storage, and change
//! propagation into a cohesive interface: users, entries, field-level
//! reads and writes, sharing, and inbox replay.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, RwLock};

use tracing::debug;

use strongroom_core::{
    EntryId, FieldClass, FieldName, KdfParams, Session, UserId, UserIdentity,
};
use strongroom_perms::{can, Grant};
use strongroom_store::{
    EntryViewRecord, GrantRecord, NewUser, Store, StoreError,
};
use strongroom_sync::{ChangeQueue, FieldChanges, ReplayReport, SyncError};

use crate::error::{Result, VaultError};

/// Configuration for the Vault.
#[derive(Debug, Clone)]
pub struct VaultConfig {
    /// Key-derivation parameters applied to every password.
    pub kdf: KdfParams,
    /// Name of the fallback delegate-only authority.
    pub admin_name: String,
}

impl Default for VaultConfig {
    fn default() -> Self {
        Self {
            kdf: KdfParams::default(),
            admin_name: strongroom_perms::ADMIN_NAME.to_string(),
        }
    }
}

/// Permission query a read of this field must satisfy, if any.
fn read_gate(field: FieldName) -> Option<&'static str> {
    match field.class() {
        FieldClass::Shared => Some(strongroom_perms::ANY),
        FieldClass::Secret => Some("r"),
        FieldClass::Private => None,
    }
}

/// Permission query a write of this field must satisfy, if any.
fn write_gate(field: FieldName) -> Option<&'static str> {
    match field.class() {
        FieldClass::Private => None,
        _ => Some("w"),
    }
}

/// The main vault struct.
///
/// Generic over the storage backend. All operations are synchronous;
/// per-entry readers-writer locks guard field access, and a coarse
/// per-user lock lets a key migration exclude every concurrent write.
pub struct Vault<S: Store> {
    pub(crate) store: Arc<S>,
    pub(crate) queue: ChangeQueue<S>,
    pub(crate) config: VaultConfig,
    entry_locks: Mutex<HashMap<EntryId, Arc<RwLock<()>>>>,
    user_locks: Mutex<HashMap<UserId, Arc<RwLock<()>>>>,
}

impl<S: Store> Vault<S> {
    /// Create a vault over the given store.
    pub fn new(store: S, config: VaultConfig) -> Self {
        let store = Arc::new(store);
        Self {
            queue: ChangeQueue::new(store.clone()),
            store,
            config,
            entry_locks: Mutex::new(HashMap::new()),
            user_locks: Mutex::new(HashMap::new()),
        }
    }

    /// Get the store reference.
    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn config(&self) -> &VaultConfig {
        &self.config
    }

    pub(crate) fn entry_lock(&self, entry_id: &EntryId) -> Arc<RwLock<()>> {
        let mut locks = self.entry_locks.lock().unwrap_or_else(|e| e.into_inner());
        locks.entry(entry_id.clone()).or_default().clone()
    }

    pub(crate) fn user_lock(&self, user_id: UserId) -> Arc<RwLock<()>> {
        let mut locks = self.user_locks.lock().unwrap_or_else(|e| e.into_inner());
        locks.entry(user_id).or_default().clone()
    }

    /// Drop the lock slot of a deleted user. Entry locks stay for the
    /// life of the vault since entries are never deleted.
    pub(crate) fn forget_user_lock(&self, user_id: UserId) {
        let mut locks = self.user_locks.lock().unwrap_or_else(|e| e.into_inner());
        locks.remove(&user_id);
    }

    // ─────────────────────────────────────────────────────────────────
    // Users
    // ─────────────────────────────────────────────────────────────────

    /// Register a new user, deriving their key material from the
    /// password.
    pub fn create_user(&self, name: &str, password: &str) -> Result<UserIdentity> {
        let wrap = |e| VaultError::crypto(name, "create_user", e);

        let (crypto_salt, signing_salt) = strongroom_core::new_salts().map_err(wrap)?;
        let session = Session::unlock(
            UserIdentity {
                id: UserId(0),
                name: name.to_string(),
                crypto_salt: crypto_salt.clone(),
                signing_salt: signing_salt.clone(),
                public_key: String::new(),
                created_at: 0,
                updated_at: 0,
            },
            password,
            self.config.kdf,
        )
        .map_err(wrap)?;

        let identity = self
            .store
            .create_user(&NewUser {
                name: name.to_string(),
                crypto_salt,
                signing_salt,
                public_key: session.derived_public_key(),
            })
            .map_err(|e| match e {
                StoreError::AlreadyExists(_) => VaultError::UserExists(name.to_string()),
                other => other.into(),
            })?;

        debug!(user = name, id = identity.id.as_i64(), "user created");
        Ok(identity)
    }

    /// Open a session by re-deriving keys from the password.
    ///
    /// The password is right exactly when the derived public key
    /// reproduces the stored one.
    pub fn login(&self, name: &str, password: &str) -> Result<Session> {
        let identity = self
            .store
            .user_by_name(name)?
            .ok_or_else(|| VaultError::UserNotFound(name.to_string()))?;

        let session = Session::unlock(identity, password, self.config.kdf)
            .map_err(|e| VaultError::crypto(name, "login", e))?;
        if session.derived_public_key() != session.identity().public_key {
            return Err(VaultError::BadCredentials(name.to_string()));
        }
        Ok(session)
    }

    /// Create the fallback admin identity if it does not exist yet.
    pub fn ensure_admin(&self, password: &str) -> Result<UserIdentity> {
        if let Some(identity) = self.store.user_by_name(&self.config.admin_name)? {
            return Ok(identity);
        }
        self.create_user(&self.config.admin_name.clone(), password)
    }

    // ─────────────────────────────────────────────────────────────────
    // Entries
    // ─────────────────────────────────────────────────────────────────

    /// Create a new entry owned by the session's user.
    ///
    /// The creator signs their own full `rwd` permissions and becomes
    /// the entry's initial authority.
    pub fn create_entry(&self, session: &Session) -> Result<EntryId> {
        let user = session.name();
        let entry_id = EntryId::generate()
            .map_err(|e| VaultError::crypto(user, "create_entry", e))?;
        let permissions = strongroom_perms::mint("rwd", session)?;

        let _user_guard = self.user_lock(session.user_id());
        let _user_read = _user_guard.read().unwrap_or_else(|e| e.into_inner());

        let view = EntryViewRecord {
            entry_id: entry_id.clone(),
            user_id: session.user_id(),
            authority_id: session.user_id(),
            permissions,
            fields: Default::default(),
            modified: Default::default(),
            created_at: 0,
            updated_at: 0,
        };
        self.store.upsert_view(&view)?;

        debug!(user, entry = %entry_id, "entry created");
        Ok(entry_id)
    }

    fn view_of(&self, entry_id: &EntryId, user_id: UserId) -> Result<EntryViewRecord> {
        self.store
            .view(entry_id, user_id)?
            .ok_or_else(|| VaultError::EntryNotFound(entry_id.to_string()))
    }

    fn authority_of(&self, view: &EntryViewRecord) -> Result<UserIdentity> {
        self.store
            .user_by_id(view.authority_id)?
            .ok_or_else(|| VaultError::UserNotFound(view.authority_id.to_string()))
    }

    /// Whether a view's holder still has any verified permission.
    ///
    /// Revoked holders keep their row (and their old ciphertexts) but
    /// must not receive anything new.
    fn holds_any_permission(&self, view: &EntryViewRecord) -> Result<bool> {
        let authority = self.authority_of(view)?;
        Ok(can(strongroom_perms::ANY, &view.permissions, &authority))
    }

    /// Evaluate a permission gate against the session's own view.
    fn check_gate(
        &self,
        session: &Session,
        view: &EntryViewRecord,
        query: &str,
        op: impl Into<String>,
    ) -> Result<()> {
        let authority = self.authority_of(view)?;
        if can(query, &view.permissions, &authority) {
            Ok(())
        } else {
            Err(VaultError::denied(session.name(), op))
        }
    }

    /// Read one field of an entry.
    ///
    /// Shared fields need any permission, secret fields need `r`, and
    /// `userdata` is gated only by possession of the view. Returns
    /// `None` when the field was never set.
    pub fn read_field(
        &self,
        session: &Session,
        entry_id: &EntryId,
        field: FieldName,
    ) -> Result<Option<Vec<u8>>> {
        let user_guard = self.user_lock(session.user_id());
        let _user_read = user_guard.read().unwrap_or_else(|e| e.into_inner());
        let entry_guard = self.entry_lock(entry_id);
        let _entry_read = entry_guard.read().unwrap_or_else(|e| e.into_inner());

        let view = self.view_of(entry_id, session.user_id())?;
        if let Some(query) = read_gate(field) {
            self.check_gate(session, &view, query, format!("read {}", field.as_str()))?;
        }

        match view.field(field) {
            Some(ciphertext) => {
                let plaintext = strongroom_core::Encryptor::decrypt(session, ciphertext)
                    .map_err(|e| VaultError::crypto(session.name(), "read_field", e))?;
                Ok(Some(plaintext))
            }
            None => Ok(None),
        }
    }

    /// Write one field of an entry.
    ///
    /// Requires `w` except for `userdata`. The value is encrypted under
    /// the writer's own key and the field is marked for the next
    /// commit. The permission check happens under the entry's exclusive
    /// lock so a concurrent revocation cannot race the write.
    pub fn write_field(
        &self,
        session: &Session,
        entry_id: &EntryId,
        field: FieldName,
        value: &[u8],
    ) -> Result<()> {
        let user_guard = self.user_lock(session.user_id());
        let _user_read = user_guard.read().unwrap_or_else(|e| e.into_inner());
        let entry_guard = self.entry_lock(entry_id);
        let _entry_write = entry_guard.write().unwrap_or_else(|e| e.into_inner());

        let mut view = self.view_of(entry_id, session.user_id())?;
        if let Some(query) = write_gate(field) {
            self.check_gate(
                session,
                &view,
                query,
                format!("write {}", field.as_str()),
            )?;
        }

        let ciphertext = strongroom_core::Encryptor::encrypt(session, value)
            .map_err(|e| VaultError::crypto(session.name(), "write_field", e))?;
        view.set_field(field, ciphertext);
        self.store.upsert_view(&view)?;
        Ok(())
    }

    /// Decrypt every shareable field of a view with the session's key.
    fn plaintext_snapshot(&self, session: &Session, view: &EntryViewRecord) -> Result<FieldChanges> {
        let mut snapshot = FieldChanges::new();
        for (name, ciphertext) in &view.fields {
            if *name == FieldName::Userdata {
                continue;
            }
            let plaintext = strongroom_core::Encryptor::decrypt(session, ciphertext)
                .map_err(|e| VaultError::crypto(session.name(), "snapshot", e))?;
            snapshot.insert(*name, plaintext);
        }
        Ok(snapshot)
    }

    /// Publish the view's modified fields to every other holder of the
    /// entry, then clear the modified set.
    ///
    /// Returns the number of recipients notified.
    pub fn commit(&self, session: &Session, entry_id: &EntryId) -> Result<usize> {
        let user_guard = self.user_lock(session.user_id());
        let _user_read = user_guard.read().unwrap_or_else(|e| e.into_inner());
        let entry_guard = self.entry_lock(entry_id);
        let _entry_write = entry_guard.write().unwrap_or_else(|e| e.into_inner());

        let mut view = self.view_of(entry_id, session.user_id())?;
        let mut changed = view.modified.clone();
        changed.remove(&FieldName::Userdata);
        if changed.is_empty() {
            view.modified.clear();
            self.store.upsert_view(&view)?;
            return Ok(0);
        }

        let snapshot = self.plaintext_snapshot(session, &view)?;
        let now = now_millis();

        let mut notified = 0;
        for other in self.store.views_for_entry(entry_id)? {
            if other.user_id == session.user_id() {
                continue;
            }
            if !self.holds_any_permission(&other)? {
                continue;
            }
            let Some(recipient) = self.store.user_by_id(other.user_id)? else {
                continue;
            };
            self.queue
                .publish(session, &recipient, entry_id, &changed, &snapshot, now)?;
            notified += 1;
        }

        view.modified.clear();
        self.store.upsert_view(&view)?;
        debug!(
            user = session.name(),
            entry = %entry_id,
            recipients = notified,
            "commit published"
        );
        Ok(notified)
    }

    /// Share an entry with another user.
    ///
    /// Requires `d` on the entry. Signs the grantee's permission string
    /// and a grant token, creates (or re-permissions) their view, and
    /// enqueues the current field values so the grantee's view fills in
    /// on their next replay.
    pub fn share_entry(
        &self,
        session: &Session,
        entry_id: &EntryId,
        grantee_name: &str,
        permissions: &str,
    ) -> Result<()> {
        let user_guard = self.user_lock(session.user_id());
        let _user_read = user_guard.read().unwrap_or_else(|e| e.into_inner());
        let entry_guard = self.entry_lock(entry_id);
        let _entry_write = entry_guard.write().unwrap_or_else(|e| e.into_inner());

        let own_view = self.view_of(entry_id, session.user_id())?;
        self.check_gate(session, &own_view, "d", format!("share with {grantee_name}"))?;

        let grantee = self
            .store
            .user_by_name(grantee_name)?
            .ok_or_else(|| VaultError::UserNotFound(grantee_name.to_string()))?;

        let blob = strongroom_perms::mint(permissions, session)?;
        let grant = Grant::mint(entry_id.clone(), grantee_name, session.name(), session)?;
        let now = now_millis();
        self.store.upsert_grant(&GrantRecord {
            grant,
            created_at: now,
        })?;

        let mut grantee_view = self
            .store
            .view(entry_id, grantee.id)?
            .unwrap_or(EntryViewRecord {
                entry_id: entry_id.clone(),
                user_id: grantee.id,
                authority_id: session.user_id(),
                permissions: String::new(),
                fields: Default::default(),
                modified: Default::default(),
                created_at: 0,
                updated_at: 0,
            });
        grantee_view.permissions = blob;
        grantee_view.authority_id = session.user_id();
        self.store.upsert_view(&grantee_view)?;

        // Hand the grantee the current values through their mailbox. An
        // empty permission string is a revocation and seeds nothing.
        if self.holds_any_permission(&grantee_view)? {
            let snapshot = self.plaintext_snapshot(session, &own_view)?;
            if !snapshot.is_empty() {
                let changed = snapshot.keys().copied().collect();
                self.queue
                    .publish(session, &grantee, entry_id, &changed, &snapshot, now)?;
            }
        }

        debug!(
            user = session.name(),
            entry = %entry_id,
            grantee = grantee_name,
            permissions,
            "entry shared"
        );
        Ok(())
    }

    /// Drain the session's mailbox, folding received changes into the
    /// user's own views re-encrypted under their own key.
    pub fn replay_inbox(&self, session: &Session) -> Result<ReplayReport> {
        let user_guard = self.user_lock(session.user_id());
        let _user_read = user_guard.read().unwrap_or_else(|e| e.into_inner());

        let report = self.queue.replay(session, |entry_id, changes| {
            let entry_guard = self.entry_lock(entry_id);
            let _entry_write = entry_guard.write().unwrap_or_else(|e| e.into_inner());

            let mut view = self
                .store
                .view(entry_id, session.user_id())?
                .ok_or_else(|| {
                    SyncError::Store(StoreError::NotFound(format!("view of {entry_id}")))
                })?;

            for (name, value) in changes {
                if *name == FieldName::Userdata {
                    continue;
                }
                let ciphertext = strongroom_core::Encryptor::encrypt(session, value)?;
                // Received values are not local modifications; they
                // must not re-propagate on the next commit.
                view.fields.insert(*name, ciphertext);
            }
            self.store.upsert_view(&view)?;
            Ok(())
        })?;

        Ok(report)
    }
}

/// Get current time in milliseconds.
pub(crate) fn now_millis() -> i64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}
