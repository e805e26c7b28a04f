//! Database schema migrations for SQLite.
//!
//! We use a simple versioned migration system. Each migration is a SQL
//! string that transforms the schema from version N to N+1.

use rusqlite::Connection;
use tracing::debug;

use crate::error::{Result, StoreError};

/// Current schema version.
pub const CURRENT_VERSION: u32 = 1;

/// Initialize or migrate the database schema.
///
/// This function is idempotent - it can be called multiple times safely.
pub fn migrate(conn: &mut Connection) -> Result<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS schema_migrations (
            version INTEGER PRIMARY KEY,
            applied_at INTEGER NOT NULL
        )",
        [],
    )?;

    let current: u32 = conn
        .query_row(
            "SELECT COALESCE(MAX(version), 0) FROM schema_migrations",
            [],
            |row| row.get(0),
        )
        .unwrap_or(0);

    if current < CURRENT_VERSION {
        let tx = conn.transaction()?;

        for version in (current + 1)..=CURRENT_VERSION {
            apply_migration(&tx, version)?;
            debug!(version, "applied schema migration");

            tx.execute(
                "INSERT INTO schema_migrations (version, applied_at) VALUES (?1, ?2)",
                rusqlite::params![version, now_millis()],
            )?;
        }

        tx.commit()?;
    }

    Ok(())
}

/// Apply a specific migration version.
fn apply_migration(conn: &Connection, version: u32) -> Result<()> {
    match version {
        1 => apply_v1(conn),
        _ => Err(StoreError::Migration(format!(
            "unknown migration version: {}",
            version
        ))),
    }
}

/// Migration v1: Initial schema.
fn apply_v1(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        -- Users: one row per identity; salts/keys are base64 text
        CREATE TABLE users (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL UNIQUE,
            crypto_salt TEXT NOT NULL,
            signing_salt TEXT NOT NULL,
            public_key TEXT NOT NULL,       -- base64 SEC1 point
            created_at INTEGER NOT NULL,    -- Unix ms
            updated_at INTEGER NOT NULL
        );

        -- Entry views: one row per (entry, viewing user); one column
        -- per field, each base64 nonce||ct||tag or NULL when unset
        CREATE TABLE entry_views (
            entry_id TEXT NOT NULL,
            user_id INTEGER NOT NULL,
            authority_id INTEGER NOT NULL,  -- whose key signed `permissions`
            permissions TEXT NOT NULL,      -- signed permission blob
            "group" TEXT,
            icon TEXT,
            title TEXT,
            username TEXT,
            password TEXT,
            url TEXT,
            comment TEXT,
            expiry TEXT,
            extras TEXT,
            userdata TEXT,
            modified BLOB NOT NULL,         -- CBOR array of field names
            created_at INTEGER NOT NULL,
            updated_at INTEGER NOT NULL,

            PRIMARY KEY (entry_id, user_id)
        );

        -- Change envelopes: at most one pending per (entry, recipient)
        CREATE TABLE change_envelopes (
            entry_id TEXT NOT NULL,
            recipient_id INTEGER NOT NULL,
            sender_id INTEGER NOT NULL,
            fields BLOB NOT NULL,           -- CBOR array of carried field names
            payload TEXT NOT NULL,          -- base64 nonce||ct||tag
            signed_assertion TEXT NOT NULL, -- sender's signed blob, its bytes are the AAD
            created_at INTEGER NOT NULL,

            PRIMARY KEY (entry_id, recipient_id)
        );

        -- Delegation grants
        CREATE TABLE grants (
            entry_id TEXT NOT NULL,
            grantee TEXT NOT NULL,
            signer TEXT NOT NULL,
            signature TEXT NOT NULL,
            created_at INTEGER NOT NULL,

            PRIMARY KEY (entry_id, grantee)
        );

        -- Indexes for common queries
        CREATE INDEX idx_views_user ON entry_views(user_id);
        CREATE INDEX idx_views_authority ON entry_views(authority_id);
        CREATE INDEX idx_envelopes_recipient ON change_envelopes(recipient_id);
        CREATE INDEX idx_envelopes_sender ON change_envelopes(sender_id);
        CREATE INDEX idx_grants_signer ON grants(signer);
        "#,
    )?;

    Ok(())
}

/// Get current time in milliseconds.
fn now_millis() -> i64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}
