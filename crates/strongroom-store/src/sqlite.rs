//! SQLite implementation of the Store trait.
//!
//! This is the primary storage backend. It uses rusqlite with bundled
//! SQLite behind an internal mutex; all operations are synchronous.

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use std::sync::{Arc, Mutex};

use rusqlite::{params, Connection, OptionalExtension};

use strongroom_core::{EntryId, FieldName, UserId, UserIdentity};
use strongroom_perms::Grant;

use crate::error::{Result, StoreError};
use crate::migration;
use crate::records::{ChangeEnvelopeRecord, EntryViewRecord, GrantRecord, NewUser, RekeyBatch};
use crate::traits::Store;

/// SQLite-based store implementation.
///
/// Thread-safe via internal Mutex around the single connection.
pub struct SqliteStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteStore {
    /// Open a SQLite database at the given path.
    ///
    /// Creates the file and runs migrations if it doesn't exist.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let mut conn = Connection::open(path)?;
        migration::migrate(&mut conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Open an in-memory SQLite database.
    ///
    /// Useful for testing.
    pub fn open_memory() -> Result<Self> {
        let mut conn = Connection::open_in_memory()?;
        migration::migrate(&mut conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    fn with_conn<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> Result<T>,
    {
        let conn = self.conn.lock().map_err(|e| {
            StoreError::Database(rusqlite::Error::SqliteFailure(
                rusqlite::ffi::Error::new(rusqlite::ffi::SQLITE_LOCKED),
                Some(format!("mutex poisoned: {}", e)),
            ))
        })?;
        f(&conn)
    }

    fn with_conn_mut<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut Connection) -> Result<T>,
    {
        let mut conn = self.conn.lock().map_err(|e| {
            StoreError::Database(rusqlite::Error::SqliteFailure(
                rusqlite::ffi::Error::new(rusqlite::ffi::SQLITE_LOCKED),
                Some(format!("mutex poisoned: {}", e)),
            ))
        })?;
        f(&mut conn)
    }
}

// Helper to convert a row to UserIdentity
fn row_to_user(row: &rusqlite::Row<'_>) -> rusqlite::Result<UserIdentity> {
    Ok(UserIdentity {
        id: UserId(row.get("id")?),
        name: row.get("name")?,
        crypto_salt: row.get("crypto_salt")?,
        signing_salt: row.get("signing_salt")?,
        public_key: row.get("public_key")?,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    })
}

// Helper to convert a row to EntryViewRecord
fn row_to_view(row: &rusqlite::Row<'_>) -> rusqlite::Result<EntryViewRecord> {
    let mut fields = BTreeMap::new();
    for name in FieldName::ALL {
        let value: Option<String> = row.get(name.as_str())?;
        if let Some(ciphertext) = value {
            fields.insert(name, ciphertext);
        }
    }

    let modified_cbor: Vec<u8> = row.get("modified")?;
    let modified: BTreeSet<FieldName> = if modified_cbor.is_empty() {
        BTreeSet::new()
    } else {
        ciborium::from_reader(&modified_cbor[..]).unwrap_or_default()
    };

    Ok(EntryViewRecord {
        entry_id: EntryId::from_string(row.get::<_, String>("entry_id")?),
        user_id: UserId(row.get("user_id")?),
        authority_id: UserId(row.get("authority_id")?),
        permissions: row.get("permissions")?,
        fields,
        modified,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    })
}

fn row_to_envelope(row: &rusqlite::Row<'_>) -> rusqlite::Result<ChangeEnvelopeRecord> {
    let fields_cbor: Vec<u8> = row.get("fields")?;
    let fields: BTreeSet<FieldName> = if fields_cbor.is_empty() {
        BTreeSet::new()
    } else {
        ciborium::from_reader(&fields_cbor[..]).unwrap_or_default()
    };

    Ok(ChangeEnvelopeRecord {
        entry_id: EntryId::from_string(row.get::<_, String>("entry_id")?),
        recipient_id: UserId(row.get("recipient_id")?),
        sender_id: UserId(row.get("sender_id")?),
        fields,
        payload: row.get("payload")?,
        signed_assertion: row.get("signed_assertion")?,
        created_at: row.get("created_at")?,
    })
}

fn row_to_grant(row: &rusqlite::Row<'_>) -> rusqlite::Result<GrantRecord> {
    Ok(GrantRecord {
        grant: Grant {
            entry_id: EntryId::from_string(row.get::<_, String>("entry_id")?),
            grantee: row.get("grantee")?,
            signer: row.get("signer")?,
            signature: row.get("signature")?,
        },
        created_at: row.get("created_at")?,
    })
}

// Helper to encode a field-name set to CBOR
fn encode_field_set(modified: &BTreeSet<FieldName>) -> Vec<u8> {
    let mut buf = Vec::new();
    ciborium::into_writer(modified, &mut buf).unwrap_or_default();
    buf
}

const VIEW_COLUMNS: &str = r#"entry_id, user_id, authority_id, permissions,
    "group", icon, title, username, password, url, comment, expiry, extras,
    userdata, modified, created_at, updated_at"#;

fn upsert_view_in(conn: &Connection, view: &EntryViewRecord, now: i64) -> Result<()> {
    conn.execute(
        r#"INSERT INTO entry_views (
            entry_id, user_id, authority_id, permissions,
            "group", icon, title, username, password, url, comment,
            expiry, extras, userdata, modified, created_at, updated_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17)
        ON CONFLICT (entry_id, user_id) DO UPDATE SET
            authority_id = excluded.authority_id,
            permissions = excluded.permissions,
            "group" = excluded."group",
            icon = excluded.icon,
            title = excluded.title,
            username = excluded.username,
            password = excluded.password,
            url = excluded.url,
            comment = excluded.comment,
            expiry = excluded.expiry,
            extras = excluded.extras,
            userdata = excluded.userdata,
            modified = excluded.modified,
            updated_at = excluded.updated_at"#,
        params![
            view.entry_id.as_str(),
            view.user_id.as_i64(),
            view.authority_id.as_i64(),
            view.permissions,
            view.field(FieldName::Group),
            view.field(FieldName::Icon),
            view.field(FieldName::Title),
            view.field(FieldName::Username),
            view.field(FieldName::Password),
            view.field(FieldName::Url),
            view.field(FieldName::Comment),
            view.field(FieldName::Expiry),
            view.field(FieldName::Extras),
            view.field(FieldName::Userdata),
            encode_field_set(&view.modified),
            now,
            now,
        ],
    )?;
    Ok(())
}

fn upsert_envelope_in(conn: &Connection, envelope: &ChangeEnvelopeRecord, now: i64) -> Result<()> {
    conn.execute(
        "INSERT INTO change_envelopes (
            entry_id, recipient_id, sender_id, fields, payload, signed_assertion, created_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
        ON CONFLICT (entry_id, recipient_id) DO UPDATE SET
            sender_id = excluded.sender_id,
            fields = excluded.fields,
            payload = excluded.payload,
            signed_assertion = excluded.signed_assertion,
            created_at = excluded.created_at",
        params![
            envelope.entry_id.as_str(),
            envelope.recipient_id.as_i64(),
            envelope.sender_id.as_i64(),
            encode_field_set(&envelope.fields),
            envelope.payload,
            envelope.signed_assertion,
            now,
        ],
    )?;
    Ok(())
}

fn upsert_grant_in(conn: &Connection, record: &GrantRecord, now: i64) -> Result<()> {
    conn.execute(
        "INSERT INTO grants (entry_id, grantee, signer, signature, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5)
         ON CONFLICT (entry_id, grantee) DO UPDATE SET
            signer = excluded.signer,
            signature = excluded.signature",
        params![
            record.grant.entry_id.as_str(),
            record.grant.grantee,
            record.grant.signer,
            record.grant.signature,
            now,
        ],
    )?;
    Ok(())
}

fn is_constraint_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(e, _)
            if e.code == rusqlite::ErrorCode::ConstraintViolation
    )
}

impl Store for SqliteStore {
    fn create_user(&self, user: &NewUser) -> Result<UserIdentity> {
        self.with_conn(|conn| {
            let now = now_millis();
            let result = conn.execute(
                "INSERT INTO users (name, crypto_salt, signing_salt, public_key, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    user.name,
                    user.crypto_salt,
                    user.signing_salt,
                    user.public_key,
                    now,
                    now,
                ],
            );
            match result {
                Ok(_) => {}
                Err(e) if is_constraint_violation(&e) => {
                    return Err(StoreError::AlreadyExists(format!("user {}", user.name)));
                }
                Err(e) => return Err(e.into()),
            }

            Ok(UserIdentity {
                id: UserId(conn.last_insert_rowid()),
                name: user.name.clone(),
                crypto_salt: user.crypto_salt.clone(),
                signing_salt: user.signing_salt.clone(),
                public_key: user.public_key.clone(),
                created_at: now,
                updated_at: now,
            })
        })
    }

    fn user_by_name(&self, name: &str) -> Result<Option<UserIdentity>> {
        self.with_conn(|conn| {
            conn.query_row(
                "SELECT * FROM users WHERE name = ?1",
                params![name],
                row_to_user,
            )
            .optional()
            .map_err(StoreError::from)
        })
    }

    fn user_by_id(&self, id: UserId) -> Result<Option<UserIdentity>> {
        self.with_conn(|conn| {
            conn.query_row(
                "SELECT * FROM users WHERE id = ?1",
                params![id.as_i64()],
                row_to_user,
            )
            .optional()
            .map_err(StoreError::from)
        })
    }

    fn delete_user(&self, id: UserId) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute("DELETE FROM users WHERE id = ?1", params![id.as_i64()])?;
            Ok(())
        })
    }

    fn upsert_view(&self, view: &EntryViewRecord) -> Result<()> {
        self.with_conn(|conn| upsert_view_in(conn, view, now_millis()))
    }

    fn view(&self, entry_id: &EntryId, user_id: UserId) -> Result<Option<EntryViewRecord>> {
        self.with_conn(|conn| {
            conn.query_row(
                &format!(
                    "SELECT {VIEW_COLUMNS} FROM entry_views WHERE entry_id = ?1 AND user_id = ?2"
                ),
                params![entry_id.as_str(), user_id.as_i64()],
                row_to_view,
            )
            .optional()
            .map_err(StoreError::from)
        })
    }

    fn views_for_user(&self, user_id: UserId) -> Result<Vec<EntryViewRecord>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {VIEW_COLUMNS} FROM entry_views WHERE user_id = ?1 ORDER BY entry_id"
            ))?;
            let views = stmt
                .query_map(params![user_id.as_i64()], row_to_view)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(views)
        })
    }

    fn views_for_entry(&self, entry_id: &EntryId) -> Result<Vec<EntryViewRecord>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {VIEW_COLUMNS} FROM entry_views WHERE entry_id = ?1 ORDER BY user_id"
            ))?;
            let views = stmt
                .query_map(params![entry_id.as_str()], row_to_view)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(views)
        })
    }

    fn views_authored_by(&self, authority_id: UserId) -> Result<Vec<EntryViewRecord>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {VIEW_COLUMNS} FROM entry_views
                 WHERE authority_id = ?1 ORDER BY entry_id, user_id"
            ))?;
            let views = stmt
                .query_map(params![authority_id.as_i64()], row_to_view)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(views)
        })
    }

    fn delete_view(&self, entry_id: &EntryId, user_id: UserId) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "DELETE FROM entry_views WHERE entry_id = ?1 AND user_id = ?2",
                params![entry_id.as_str(), user_id.as_i64()],
            )?;
            Ok(())
        })
    }

    fn upsert_envelope(&self, envelope: &ChangeEnvelopeRecord) -> Result<()> {
        self.with_conn(|conn| upsert_envelope_in(conn, envelope, now_millis()))
    }

    fn envelope(
        &self,
        entry_id: &EntryId,
        recipient_id: UserId,
    ) -> Result<Option<ChangeEnvelopeRecord>> {
        self.with_conn(|conn| {
            conn.query_row(
                "SELECT * FROM change_envelopes WHERE entry_id = ?1 AND recipient_id = ?2",
                params![entry_id.as_str(), recipient_id.as_i64()],
                row_to_envelope,
            )
            .optional()
            .map_err(StoreError::from)
        })
    }

    fn envelopes_for(&self, recipient_id: UserId) -> Result<Vec<ChangeEnvelopeRecord>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT * FROM change_envelopes WHERE recipient_id = ?1 ORDER BY entry_id",
            )?;
            let envelopes = stmt
                .query_map(params![recipient_id.as_i64()], row_to_envelope)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(envelopes)
        })
    }

    fn envelopes_from(&self, sender_id: UserId) -> Result<Vec<ChangeEnvelopeRecord>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT * FROM change_envelopes WHERE sender_id = ?1
                 ORDER BY entry_id, recipient_id",
            )?;
            let envelopes = stmt
                .query_map(params![sender_id.as_i64()], row_to_envelope)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(envelopes)
        })
    }

    fn delete_envelope(&self, entry_id: &EntryId, recipient_id: UserId) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "DELETE FROM change_envelopes WHERE entry_id = ?1 AND recipient_id = ?2",
                params![entry_id.as_str(), recipient_id.as_i64()],
            )?;
            Ok(())
        })
    }

    fn delete_envelopes_involving(&self, user_id: UserId) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "DELETE FROM change_envelopes WHERE recipient_id = ?1 OR sender_id = ?1",
                params![user_id.as_i64()],
            )?;
            Ok(())
        })
    }

    fn upsert_grant(&self, record: &GrantRecord) -> Result<()> {
        self.with_conn(|conn| upsert_grant_in(conn, record, now_millis()))
    }

    fn grant(&self, entry_id: &EntryId, grantee: &str) -> Result<Option<GrantRecord>> {
        self.with_conn(|conn| {
            conn.query_row(
                "SELECT * FROM grants WHERE entry_id = ?1 AND grantee = ?2",
                params![entry_id.as_str(), grantee],
                row_to_grant,
            )
            .optional()
            .map_err(StoreError::from)
        })
    }

    fn grants_by_signer(&self, signer: &str) -> Result<Vec<GrantRecord>> {
        self.with_conn(|conn| {
            let mut stmt = conn
                .prepare("SELECT * FROM grants WHERE signer = ?1 ORDER BY entry_id, grantee")?;
            let grants = stmt
                .query_map(params![signer], row_to_grant)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(grants)
        })
    }

    fn delete_grants_for_grantee(&self, grantee: &str) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute("DELETE FROM grants WHERE grantee = ?1", params![grantee])?;
            Ok(())
        })
    }

    fn apply_rekey(&self, batch: &RekeyBatch) -> Result<()> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            let now = now_millis();

            let exists: Option<i64> = tx
                .query_row(
                    "SELECT id FROM users WHERE id = ?1",
                    params![batch.user_id.as_i64()],
                    |row| row.get(0),
                )
                .optional()?;
            if exists.is_none() {
                return Err(StoreError::NotFound(format!("user {}", batch.user_id)));
            }

            if let Some(public_key) = &batch.public_key {
                tx.execute(
                    "UPDATE users SET public_key = ?1, updated_at = ?2 WHERE id = ?3",
                    params![public_key, now, batch.user_id.as_i64()],
                )?;
            }

            for view in &batch.views {
                upsert_view_in(&tx, view, now)?;
            }
            for envelope in &batch.envelopes {
                upsert_envelope_in(&tx, envelope, now)?;
            }
            for update in &batch.permissions {
                tx.execute(
                    "UPDATE entry_views SET permissions = ?1, authority_id = ?2, updated_at = ?3
                     WHERE entry_id = ?4 AND user_id = ?5",
                    params![
                        update.permissions,
                        update.authority_id.as_i64(),
                        now,
                        update.entry_id.as_str(),
                        update.user_id.as_i64(),
                    ],
                )?;
            }
            for record in &batch.grants {
                upsert_grant_in(&tx, record, now)?;
            }

            tx.commit()?;
            Ok(())
        })
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

#[cfg(test)]
mod tests {
    use super::*;

    fn new_user(name: &str) -> NewUser {
        NewUser {
            name: name.to_string(),
            crypto_salt: "cs".into(),
            signing_salt: "ss".into(),
            public_key: "pk".into(),
        }
    }

    fn view(entry: &str, user: UserId) -> EntryViewRecord {
        EntryViewRecord {
            entry_id: EntryId::from_string(entry),
            user_id: user,
            authority_id: user,
            permissions: "blob".into(),
            fields: BTreeMap::new(),
            modified: BTreeSet::new(),
            created_at: 0,
            updated_at: 0,
        }
    }

    #[test]
    fn test_user_roundtrip() {
        let store = SqliteStore::open_memory().unwrap();
        let alice = store.create_user(&new_user("alice")).unwrap();

        let by_name = store.user_by_name("alice").unwrap().unwrap();
        assert_eq!(by_name, alice);
        assert!(store.user_by_name("nobody").unwrap().is_none());

        assert!(matches!(
            store.create_user(&new_user("alice")),
            Err(StoreError::AlreadyExists(_))
        ));

        store.delete_user(alice.id).unwrap();
        assert!(store.user_by_id(alice.id).unwrap().is_none());
    }

    #[test]
    fn test_view_roundtrip_preserves_fields_and_modified() {
        let store = SqliteStore::open_memory().unwrap();
        let entry = EntryId::from_string("e1");

        let mut v = view("e1", UserId(1));
        v.set_field(FieldName::Group, "g-ct".into());
        v.set_field(FieldName::Password, "p-ct".into());
        v.set_field(FieldName::Userdata, "u-ct".into());
        store.upsert_view(&v).unwrap();

        let loaded = store.view(&entry, UserId(1)).unwrap().unwrap();
        assert_eq!(loaded.field(FieldName::Group), Some("g-ct"));
        assert_eq!(loaded.field(FieldName::Password), Some("p-ct"));
        assert_eq!(loaded.field(FieldName::Userdata), Some("u-ct"));
        assert!(loaded.field(FieldName::Title).is_none());
        assert_eq!(loaded.modified, v.modified);
    }

    #[test]
    fn test_view_upsert_replaces() {
        let store = SqliteStore::open_memory().unwrap();
        let entry = EntryId::from_string("e1");

        let mut v = view("e1", UserId(1));
        v.set_field(FieldName::Title, "ct1".into());
        store.upsert_view(&v).unwrap();

        let mut v2 = v.clone();
        v2.modified.clear();
        v2.fields.insert(FieldName::Title, "ct2".into());
        store.upsert_view(&v2).unwrap();

        let loaded = store.view(&entry, UserId(1)).unwrap().unwrap();
        assert_eq!(loaded.field(FieldName::Title), Some("ct2"));
        assert!(loaded.modified.is_empty());
        assert_eq!(store.views_for_entry(&entry).unwrap().len(), 1);
    }

    #[test]
    fn test_views_queries() {
        let store = SqliteStore::open_memory().unwrap();
        let mut v1 = view("e1", UserId(1));
        v1.authority_id = UserId(9);
        store.upsert_view(&v1).unwrap();
        store.upsert_view(&view("e1", UserId(2))).unwrap();
        store.upsert_view(&view("e2", UserId(1))).unwrap();

        assert_eq!(store.views_for_user(UserId(1)).unwrap().len(), 2);
        assert_eq!(
            store
                .views_for_entry(&EntryId::from_string("e1"))
                .unwrap()
                .len(),
            2
        );
        assert_eq!(store.views_authored_by(UserId(9)).unwrap().len(), 1);
    }

    #[test]
    fn test_envelope_slot_and_cleanup() {
        let store = SqliteStore::open_memory().unwrap();
        let entry = EntryId::from_string("e1");

        let env = ChangeEnvelopeRecord {
            entry_id: entry.clone(),
            recipient_id: UserId(2),
            sender_id: UserId(1),
            fields: BTreeSet::new(),
            payload: "p1".into(),
            signed_assertion: "a1".into(),
            created_at: 0,
        };
        store.upsert_envelope(&env).unwrap();
        store
            .upsert_envelope(&ChangeEnvelopeRecord {
                payload: "p2".into(),
                ..env.clone()
            })
            .unwrap();

        let loaded = store.envelope(&entry, UserId(2)).unwrap().unwrap();
        assert_eq!(loaded.payload, "p2");
        assert_eq!(store.envelopes_for(UserId(2)).unwrap().len(), 1);

        store.delete_envelopes_involving(UserId(1)).unwrap();
        assert!(store.envelope(&entry, UserId(2)).unwrap().is_none());
    }

    #[test]
    fn test_grant_roundtrip() {
        let store = SqliteStore::open_memory().unwrap();
        let entry = EntryId::from_string("e1");
        let record = GrantRecord {
            grant: Grant {
                entry_id: entry.clone(),
                grantee: "bob".into(),
                signer: "alice".into(),
                signature: "sig".into(),
            },
            created_at: 0,
        };
        store.upsert_grant(&record).unwrap();

        let loaded = store.grant(&entry, "bob").unwrap().unwrap();
        assert_eq!(loaded.grant, record.grant);
        assert_eq!(store.grants_by_signer("alice").unwrap().len(), 1);

        store.delete_grants_for_grantee("bob").unwrap();
        assert!(store.grant(&entry, "bob").unwrap().is_none());
    }

    #[test]
    fn test_apply_rekey_is_transactional() {
        let store = SqliteStore::open_memory().unwrap();
        let alice = store.create_user(&new_user("alice")).unwrap();

        let mut v = view("e1", alice.id);
        v.set_field(FieldName::Title, "old-ct".into());
        store.upsert_view(&v).unwrap();

        let mut batch = RekeyBatch::new(alice.id);
        batch.public_key = Some("new-pk".into());
        let mut rekeyed = v.clone();
        rekeyed.fields.insert(FieldName::Title, "new-ct".into());
        batch.views.push(rekeyed);
        store.apply_rekey(&batch).unwrap();

        assert_eq!(
            store.user_by_id(alice.id).unwrap().unwrap().public_key,
            "new-pk"
        );
        let loaded = store
            .view(&EntryId::from_string("e1"), alice.id)
            .unwrap()
            .unwrap();
        assert_eq!(loaded.field(FieldName::Title), Some("new-ct"));

        // Unknown user leaves everything untouched.
        let bad = RekeyBatch::new(UserId(99));
        assert!(store.apply_rekey(&bad).is_err());
    }

    #[test]
    fn test_open_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("vault.db");

        {
            let store = SqliteStore::open(&path).unwrap();
            store.create_user(&new_user("alice")).unwrap();
        }

        let reopened = SqliteStore::open(&path).unwrap();
        assert!(reopened.user_by_name("alice").unwrap().is_some());
    }
}
