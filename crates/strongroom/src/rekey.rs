//! Key migration: password changes and user removal.
//!
//! Both operations rebuild every artifact tied to a signing or
//! encryption key and commit the result through the store's atomic
//! [`apply_rekey`](strongroom_store::Store::apply_rekey). All crypto is
//! staged first; the store never holds a mix of old- and new-key
//! ciphertext.

use tracing::{debug, warn};

use strongroom_core::{
    derive_keys, encode_public_key, Encryptor as _, Session, UserIdentity, Verifier as _,
};
use strongroom_store::{GrantRecord, PermissionUpdate, RekeyBatch, Store};

use crate::error::{Result, VaultError};
use crate::vault::Vault;

impl<S: Store> Vault<S> {
    /// Change the session's password, re-keying everything the old
    /// keys protected.
    ///
    /// Re-encrypts all of the user's view fields, migrates pending
    /// inbox envelopes to the new pairwise secrets, and re-signs every
    /// permission blob and grant the user authored. The whole migration
    /// commits atomically; on any failure the stored state is untouched
    /// and still opens under the old password.
    ///
    /// Returns the session for the new password.
    pub fn change_password(&self, session: &Session, new_password: &str) -> Result<Session> {
        let user = session.name().to_string();
        let rekey_err = |reason: String| VaultError::Rekey {
            user: user.clone(),
            reason,
        };

        // Exclusive over everything this user owns for the duration.
        let user_guard = self.user_lock(session.user_id());
        let _excl = user_guard.write().unwrap_or_else(|e| e.into_inner());

        let identity = session.identity().clone();
        let keys = derive_keys(
            new_password,
            &identity
                .crypto_salt_bytes()
                .map_err(|e| rekey_err(e.to_string()))?,
            &identity
                .signing_salt_bytes()
                .map_err(|e| rekey_err(e.to_string()))?,
            self.config.kdf,
        )
        .map_err(|e| rekey_err(e.to_string()))?;

        let new_public_key = encode_public_key(&keys.verifying_key());
        let new_identity = UserIdentity {
            public_key: new_public_key.clone(),
            ..identity
        };
        let new_session = Session::from_parts(new_identity, keys);

        let mut batch = RekeyBatch::new(session.user_id());
        batch.public_key = Some(new_public_key);

        // Stage every owned field re-encrypted under the new key.
        for mut view in self.store.views_for_user(session.user_id())? {
            for (name, ciphertext) in view.fields.clone() {
                let plaintext = session
                    .decrypt(&ciphertext)
                    .map_err(|e| rekey_err(format!("field {}: {e}", name.as_str())))?;
                let reencrypted = new_session
                    .encrypt(&plaintext)
                    .map_err(|e| rekey_err(e.to_string()))?;
                view.fields.insert(name, reencrypted);
            }
            batch.views.push(view);
        }

        // Stage pending inbox envelopes under the new pairwise secrets.
        for record in self.store.envelopes_for(session.user_id())? {
            let Some(sender) = self.store.user_by_id(record.sender_id)? else {
                warn!(
                    entry = %record.entry_id,
                    sender = record.sender_id.as_i64(),
                    "dropping envelope from unknown sender during rekey"
                );
                continue;
            };
            let migrated =
                strongroom_sync::migrate_recipient_key(&record, session, &new_session, &sender)
                    .map_err(|e| rekey_err(format!("envelope {}: {e}", record.entry_id)))?;
            batch.envelopes.push(migrated);
        }

        // Outbound envelopes are sealed with the old scalar and carry
        // an assertion under the old signing key; re-seal both.
        for record in self.store.envelopes_from(session.user_id())? {
            let Some(recipient) = self.store.user_by_id(record.recipient_id)? else {
                continue;
            };
            let migrated =
                strongroom_sync::migrate_sender_key(&record, session, &new_session, &recipient)
                    .map_err(|e| rekey_err(format!("envelope {}: {e}", record.entry_id)))?;
            batch.envelopes.push(migrated);
        }

        // Re-sign permission blobs this user authored.
        batch.permissions = self.resign_authored_permissions(
            session.identity(),
            &new_session,
            session.user_id(),
            None,
        )?;

        // Re-issue grants this user signed.
        for record in self.store.grants_by_signer(session.name())? {
            let grant = record
                .grant
                .reissue(session.name(), &new_session)
                .map_err(|e| rekey_err(e.to_string()))?;
            batch.grants.push(GrantRecord {
                grant,
                created_at: record.created_at,
            });
        }

        self.store
            .apply_rekey(&batch)
            .map_err(|e| rekey_err(e.to_string()))?;

        debug!(user = session.name(), "password changed");
        Ok(new_session)
    }

    /// Remove a user, transferring their authorship to the admin.
    ///
    /// Permission blobs and grants the removed user signed for others
    /// are re-issued under the admin identity so dependent views remain
    /// verifiable. The user's own views, mailbox, and received grants
    /// are deleted.
    pub fn remove_user(&self, admin: &Session, name: &str) -> Result<()> {
        if admin.name() != self.config.admin_name {
            return Err(VaultError::NotAdmin(admin.name().to_string()));
        }
        if name == self.config.admin_name {
            return Err(VaultError::denied(admin.name(), "remove the admin identity"));
        }
        let target = self
            .store
            .user_by_name(name)?
            .ok_or_else(|| VaultError::UserNotFound(name.to_string()))?;

        let user_guard = self.user_lock(target.id);
        let _excl = user_guard.write().unwrap_or_else(|e| e.into_inner());

        // Re-issue the target's authored artifacts under the admin key,
        // committed first so no dependent view is ever orphaned.
        let mut batch = RekeyBatch::new(admin.user_id());
        batch.permissions =
            self.resign_authored_permissions(&target, admin, admin.user_id(), Some(target.id))?;
        for record in self.store.grants_by_signer(name)? {
            if record.grant.grantee == name {
                continue;
            }
            let grant = record.grant.reissue(admin.name(), admin)?;
            batch.grants.push(GrantRecord {
                grant,
                created_at: record.created_at,
            });
        }
        self.store.apply_rekey(&batch)?;

        for view in self.store.views_for_user(target.id)? {
            self.store.delete_view(&view.entry_id, target.id)?;
        }
        self.store.delete_envelopes_involving(target.id)?;
        self.store.delete_grants_for_grantee(name)?;
        self.store.delete_user(target.id)?;

        drop(_excl);
        self.forget_user_lock(target.id);

        debug!(user = name, "user removed, authorship moved to admin");
        Ok(())
    }

    /// Re-sign every permission blob `old_authority` authored, using
    /// `new_signer`'s key. Blobs that no longer verify are skipped with
    /// a warning; they already deny everything.
    fn resign_authored_permissions(
        &self,
        old_authority: &UserIdentity,
        new_signer: &Session,
        new_authority: strongroom_core::UserId,
        skip_user: Option<strongroom_core::UserId>,
    ) -> Result<Vec<PermissionUpdate>> {
        let mut updates = Vec::new();

        for view in self.store.views_authored_by(old_authority.id)? {
            if skip_user == Some(view.user_id) {
                continue;
            }
            let verification = match old_authority.verify(&view.permissions) {
                Ok(v) if v.valid => v,
                _ => {
                    warn!(
                        entry = %view.entry_id,
                        user = view.user_id.as_i64(),
                        "skipping unverifiable permission blob during re-sign"
                    );
                    continue;
                }
            };
            let Ok(granted) = String::from_utf8(verification.data) else {
                warn!(
                    entry = %view.entry_id,
                    user = view.user_id.as_i64(),
                    "skipping non-text permission payload during re-sign"
                );
                continue;
            };

            let blob = strongroom_perms::mint(&granted, new_signer)?;
            updates.push(PermissionUpdate {
                entry_id: view.entry_id,
                user_id: view.user_id,
                authority_id: new_authority,
                permissions: blob,
            });
        }

        Ok(updates)
    }
}
