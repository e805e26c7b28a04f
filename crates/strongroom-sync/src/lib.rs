//! # Strongroom Sync
//!
//! Cross-user propagation of shared-secret changes.
//!
//! ## Overview
//!
//! When a user commits changes to an entry they share, every other
//! holder of that entry gets a change envelope in their mailbox: the
//! changed values AEAD-encrypted under the pairwise ECDH secret of
//! sender and recipient, with the sender's signed assertion as AAD.
//!
//! ## Key Properties
//!
//! - **One envelope per `(entry, recipient)`**: newer changes replace
//!   the pending envelope with a union of the announced field sets
//! - **Last write wins** on values; field sets merge
//! - **Drop, never retry**: an envelope that fails to open is reported
//!   and discarded, since no other key could legitimately apply it

pub mod assertion;
pub mod envelope;
pub mod error;
pub mod queue;

pub use assertion::SenderAssertion;
pub use envelope::{
    migrate_recipient_key, migrate_sender_key, open, open_as_sender, seal, FieldChanges,
};
pub use error::{Result, SyncError};
pub use queue::{ChangeQueue, ReplayReport};
