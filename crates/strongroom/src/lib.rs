//! # Strongroom
//!
//! The unified API for the Strongroom credential vault - per-user
//! encrypted entry views, signed permissions, and change propagation.
//!
//! ## Overview
//!
//! Strongroom provides a portable, offline-first library for:
//!
//! - **Identities**: Password-derived AES and ECDSA P-521 keys; the
//!   server never holds a decryption key
//! - **Entry views**: Each user holds their own copy of an entry,
//!   field-encrypted under their personal key
//! - **Permissions**: Access control as signed permission strings,
//!   verified against the granting authority's public key
//! - **Change queue**: Edits travel to other holders as envelopes
//!   sealed under pairwise ECDH secrets, applied on next login
//!
//! ## Key Concepts
//!
//! - **View**: One user's encrypted copy of an entry. Never shared raw.
//! - **Gate**: A field group's required permission (shared/secret/private).
//! - **Grant**: A signed record that one user shared an entry with another.
//! - **Rekey**: A password change re-encrypts and re-signs everything
//!   the old keys protected, atomically.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use strongroom::{FieldName, Vault, VaultConfig};
//! use strongroom::store::MemoryStore;
//!
//! fn example() -> strongroom::Result<()> {
//!     let vault = Vault::new(MemoryStore::new(), VaultConfig::default());
//!
//!     vault.create_user("alice", "correct horse battery staple")?;
//!     let alice = vault.login("alice", "correct horse battery staple")?;
//!
//!     let entry = vault.create_entry(&alice)?;
//!     vault.write_field(&alice, &entry, FieldName::Password, b"hunter2")?;
//!     vault.commit(&alice, &entry)?;
//!     Ok(())
//! }
//! ```
//!
//! ## Re-exports
//!
//! This crate re-exports the component crates for convenience:
//!
//! - `strongroom::core` - Crypto primitives (Session, keys, AEAD)
//! - `strongroom::store` - Storage abstraction, memory and SQLite
//! - `strongroom::sync` - Change envelopes and the queue
//! - `strongroom::perms` - Permission strings and grants

pub mod error;
pub mod rekey;
pub mod vault;

// Re-export component crates
pub use strongroom_core as core;
pub use strongroom_perms as perms;
pub use strongroom_store as store;
pub use strongroom_sync as sync;

// Re-export main types for convenience
pub use error::{Result, VaultError};
pub use vault::{Vault, VaultConfig};

// Re-export commonly used core types
pub use strongroom_core::{
    EntryId, FieldClass, FieldName, KdfParams, Session, UserId, UserIdentity,
};
pub use strongroom_sync::ReplayReport;
