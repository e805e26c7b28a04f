//! The fixed fallback authority.
//!
//! One pre-provisioned identity holds delegate rights on every entry
//! but can neither read nor write. When a user who signed grants or
//! permissions is removed, their artifacts are re-issued under this
//! identity so dependent views stay verifiable.

/// Reserved name of the fallback authority.
pub const ADMIN_NAME: &str = "admin";

/// The only permission string the admin ever holds.
pub const ADMIN_PERMISSIONS: &str = "d";

/// Whether a user name is the reserved admin identity.
pub fn is_admin(name: &str) -> bool {
    name == ADMIN_NAME
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::permission::{is_valid_permission_string, DELEGATE, READ, WRITE};

    #[test]
    fn test_admin_holds_delegate_only() {
        assert!(is_valid_permission_string(ADMIN_PERMISSIONS));
        assert!(ADMIN_PERMISSIONS.contains(DELEGATE));
        assert!(!ADMIN_PERMISSIONS.contains(READ));
        assert!(!ADMIN_PERMISSIONS.contains(WRITE));
    }

    #[test]
    fn test_is_admin() {
        assert!(is_admin("admin"));
        assert!(!is_admin("alice"));
    }
}
