//! # Strongroom Store
//!
//! Persistence for users, entry views, change envelopes, and grants.
//!
//! ## Overview
//!
//! The [`Store`] trait is the synchronous persistence seam of the
//! vault. [`SqliteStore`] is the primary backend (rusqlite, bundled);
//! [`MemoryStore`] mirrors its semantics for tests.
//!
//! Everything stored here is ciphertext or signed material; the store
//! never sees a plaintext field value or a private key.
//!
//! ## Key invariants
//!
//! - User names are unique.
//! - One view row per `(entry, user)`, one envelope per
//!   `(entry, recipient)`, one grant per `(entry, grantee)`.
//! - [`Store::apply_rekey`] commits a whole key migration atomically.

pub mod error;
pub mod memory;
pub mod migration;
pub mod records;
pub mod sqlite;
pub mod traits;

pub use error::{Result, StoreError};
pub use memory::MemoryStore;
pub use records::{
    ChangeEnvelopeRecord, EntryViewRecord, GrantRecord, NewUser, PermissionUpdate, RekeyBatch,
};
pub use sqlite::SqliteStore;
pub use traits::Store;
