//! Error types for the vault facade.

use thiserror::Error;

use strongroom_core::CryptoError;

/// Errors surfaced by vault operations.
///
/// Cryptographic failures carry the acting user and the operation that
/// triggered them so audit logs can attribute the failure.
#[derive(Debug, Error)]
pub enum VaultError {
    /// A cryptographic or encoding failure during an operation.
    #[error("crypto failure for user {user} in {op}: {source}")]
    Crypto {
        user: String,
        op: &'static str,
        #[source]
        source: CryptoError,
    },

    /// The acting user lacks the permission the operation requires.
    #[error("permission denied for user {user}: {op}")]
    PermissionDenied { user: String, op: String },

    /// No user with the given name or id.
    #[error("unknown user: {0}")]
    UserNotFound(String),

    /// A user with that name already exists.
    #[error("user already exists: {0}")]
    UserExists(String),

    /// The acting user has no view of the entry.
    #[error("no view of entry {0}")]
    EntryNotFound(String),

    /// Password did not reproduce the stored public key.
    #[error("bad credentials for user {0}")]
    BadCredentials(String),

    /// Operation reserved to the admin identity.
    #[error("operation requires the admin identity, not {0}")]
    NotAdmin(String),

    /// Key migration failed; everything was rolled back.
    #[error("rekey failed for user {user}: {reason}")]
    Rekey { user: String, reason: String },

    /// Invalid permission string supplied by the caller.
    #[error(transparent)]
    Perms(#[from] strongroom_perms::PermsError),

    /// Storage failure.
    #[error(transparent)]
    Store(#[from] strongroom_store::StoreError),

    /// Change propagation failure.
    #[error(transparent)]
    Sync(#[from] strongroom_sync::SyncError),
}

impl VaultError {
    /// Wrap a crypto error with the acting user and operation.
    pub(crate) fn crypto(user: &str, op: &'static str, source: CryptoError) -> Self {
        Self::Crypto {
            user: user.to_string(),
            op,
            source,
        }
    }

    pub(crate) fn denied(user: &str, op: impl Into<String>) -> Self {
        Self::PermissionDenied {
            user: user.to_string(),
            op: op.into(),
        }
    }
}

/// Result alias for vault operations.
pub type Result<T> = std::result::Result<T, VaultError>;
