//! Proptest generators for property-based testing.

use proptest::prelude::*;

use strongroom_core::{EntryId, FieldName};

/// Generate any content field name.
pub fn field_name() -> impl Strategy<Value = FieldName> {
    prop::sample::select(FieldName::ALL.to_vec())
}

/// Generate a field name that travels to other holders (not userdata).
pub fn shareable_field_name() -> impl Strategy<Value = FieldName> {
    field_name().prop_filter("userdata never travels", |f| *f != FieldName::Userdata)
}

/// Generate a random entry identifier.
pub fn entry_id() -> impl Strategy<Value = EntryId> {
    any::<[u8; 16]>().prop_map(|bytes| EntryId::from_string(hex::encode(bytes)))
}

/// Generate a well-formed permission string over the `rwd` alphabet.
pub fn permission_string() -> impl Strategy<Value = String> {
    "[rwd]{0,6}".prop_map(String::from)
}

/// Generate a permission query: `*` or a string over the alphabet.
pub fn permission_query() -> impl Strategy<Value = String> {
    prop_oneof![Just("*".to_string()), permission_string()]
}

/// Generate an arbitrary string that may or may not be a valid
/// permission string.
pub fn permission_like_string() -> impl Strategy<Value = String> {
    prop_oneof![
        permission_string(),
        "[a-z*]{0,8}".prop_map(String::from),
    ]
}

/// Generate field plaintext of up to `max_len` bytes.
pub fn plaintext(max_len: usize) -> impl Strategy<Value = Vec<u8>> {
    prop::collection::vec(any::<u8>(), 0..=max_len)
}

/// Generate a user name.
pub fn user_name() -> impl Strategy<Value = String> {
    "[a-z][a-z0-9-]{0,15}".prop_map(String::from)
}

#[cfg(test)]
mod tests {
    use super::*;
    use strongroom_perms::is_valid_permission_string;

    proptest! {
        #[test]
        fn test_permission_strings_are_valid(s in permission_string()) {
            prop_assert!(is_valid_permission_string(&s));
        }

        #[test]
        fn test_shareable_fields_exclude_userdata(f in shareable_field_name()) {
            prop_assert_ne!(f, FieldName::Userdata);
        }
    }
}
