//! # Strongroom Permissions
//!
//! Access control as signed artifacts rather than mutable flags.
//!
//! ## Overview
//!
//! A user's rights on an entry are a permission string over `{r, w, d}`
//! signed by the granting authority, checked by the pure [`can`]
//! predicate. Delegation between users is recorded as a [`Grant`] token
//! whose signature binds entry, grantee, and signer together.
//!
//! ## Key Concepts
//!
//! - **Permission string**: `r` read, `w` write, `d` delegate; `"*"` as
//!   a query matches any non-empty grant
//! - **Grant**: a signed token delegating access to another user
//! - **Admin**: fixed delegate-only identity that inherits authorship
//!   when a signer is removed
//!
//! Forged artifacts are detectable (signatures fail), not impossible to
//! construct; callers gate minting on `can(signer, "d", ...)`.

pub mod admin;
pub mod error;
pub mod grant;
pub mod permission;

pub use admin::{is_admin, ADMIN_NAME, ADMIN_PERMISSIONS};
pub use error::{PermsError, Result};
pub use grant::Grant;
pub use permission::{can, is_valid_permission_string, mint, ANY, DELEGATE, READ, WRITE};
