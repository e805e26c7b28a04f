//! Strong type definitions for Strongroom.
//!
//! Identifiers are newtypes to prevent misuse at compile time.

use rand::rngs::OsRng;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{CryptoError, Result};

/// Database-assigned user identifier.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct UserId(pub i64);

impl UserId {
    /// Get the raw value.
    pub const fn as_i64(&self) -> i64 {
        self.0
    }
}

impl fmt::Debug for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "UserId({})", self.0)
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for UserId {
    fn from(id: i64) -> Self {
        Self(id)
    }
}

/// Identifier correlating every per-user view of one logical entry.
///
/// Random 16-byte value, hex-encoded.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntryId(pub String);

impl EntryId {
    /// Generate a fresh random entry identifier.
    pub fn generate() -> Result<Self> {
        let mut bytes = [0u8; 16];
        OsRng
            .try_fill_bytes(&mut bytes)
            .map_err(|e| CryptoError::Rng(e.to_string()))?;
        Ok(Self(hex::encode(bytes)))
    }

    /// Wrap an existing identifier string.
    pub fn from_string(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    /// Get the identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for EntryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EntryId({})", self.0)
    }
}

impl fmt::Display for EntryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The content fields a credential entry carries.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum FieldName {
    /// Group the entry is displayed under (shared).
    Group,
    /// Icon image bytes, treated as an opaque blob (shared).
    Icon,
    /// Entry title (shared).
    Title,
    /// Stored username (secret).
    Username,
    /// Stored password (secret).
    Password,
    /// Associated URL (secret).
    Url,
    /// Free-form comment (secret).
    Comment,
    /// Password expiry, RFC 3339 text (secret).
    Expiry,
    /// Extra structured data (secret).
    Extras,
    /// Viewer-only data; never propagated to other users (private).
    Userdata,
}

/// Visibility class of a field, which decides its permission gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldClass {
    /// Visible to any holder of any permission.
    Shared,
    /// Requires read permission.
    Secret,
    /// Viewer-only; no permission gate and never shared.
    Private,
}

impl FieldName {
    /// All fields, in canonical order.
    pub const ALL: [FieldName; 10] = [
        FieldName::Group,
        FieldName::Icon,
        FieldName::Title,
        FieldName::Username,
        FieldName::Password,
        FieldName::Url,
        FieldName::Comment,
        FieldName::Expiry,
        FieldName::Extras,
        FieldName::Userdata,
    ];

    /// The visibility class of this field.
    pub fn class(&self) -> FieldClass {
        match self {
            FieldName::Group | FieldName::Icon | FieldName::Title => FieldClass::Shared,
            FieldName::Username
            | FieldName::Password
            | FieldName::Url
            | FieldName::Comment
            | FieldName::Expiry
            | FieldName::Extras => FieldClass::Secret,
            FieldName::Userdata => FieldClass::Private,
        }
    }

    /// Stable lowercase name, used as a storage column and map key.
    pub fn as_str(&self) -> &'static str {
        match self {
            FieldName::Group => "group",
            FieldName::Icon => "icon",
            FieldName::Title => "title",
            FieldName::Username => "username",
            FieldName::Password => "password",
            FieldName::Url => "url",
            FieldName::Comment => "comment",
            FieldName::Expiry => "expiry",
            FieldName::Extras => "extras",
            FieldName::Userdata => "userdata",
        }
    }

    /// Parse from the stable lowercase name.
    pub fn from_str_name(s: &str) -> Option<Self> {
        FieldName::ALL.iter().copied().find(|f| f.as_str() == s)
    }
}

impl fmt::Display for FieldName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entry_id_generate_unique() {
        let a = EntryId::generate().unwrap();
        let b = EntryId::generate().unwrap();
        assert_ne!(a, b);
        assert_eq!(a.as_str().len(), 32);
    }

    #[test]
    fn test_field_name_roundtrip() {
        for field in FieldName::ALL {
            assert_eq!(FieldName::from_str_name(field.as_str()), Some(field));
        }
    }

    #[test]
    fn test_field_classes() {
        assert_eq!(FieldName::Title.class(), FieldClass::Shared);
        assert_eq!(FieldName::Password.class(), FieldClass::Secret);
        assert_eq!(FieldName::Userdata.class(), FieldClass::Private);
    }

    #[test]
    fn test_field_name_serializes_to_stable_name() {
        // The serde encoding and the storage key must never diverge.
        for field in FieldName::ALL {
            let json = serde_json::to_string(&field).unwrap();
            assert_eq!(json, format!("{:?}", field.as_str()));
            assert_eq!(serde_json::from_str::<FieldName>(&json).unwrap(), field);
        }
    }
}
