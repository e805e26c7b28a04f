//! # Strongroom Testkit
//!
//! Testing utilities for Strongroom.
//!
//! ## Overview
//!
//! This crate provides:
//!
//! - **Fixtures**: Pre-wired vaults and sessions for integration tests,
//!   using a key-derivation round count cheap enough for test loops
//! - **Generators**: Proptest strategies for property-based testing
//!
//! ## Test Fixtures
//!
//! Quickly set up test scenarios:
//!
//! ```rust
//! use strongroom_testkit::fixtures::alice_and_bob;
//!
//! let (tv, alice, bob) = alice_and_bob();
//! let entry = tv.vault.create_entry(&alice).unwrap();
//! ```
//!
//! ## Property Testing
//!
//! Use the generators with proptest:
//!
//! ```rust,ignore
//! use proptest::prelude::*;
//! use strongroom_testkit::generators::{field_name, plaintext};
//!
//! proptest! {
//!     #[test]
//!     fn field_round_trips(f in field_name(), value in plaintext(256)) {
//!         // ...
//!     }
//! }
//! ```

pub mod fixtures;
pub mod generators;

pub use fixtures::{alice_and_bob, standalone_session, test_config, TestVault, TEST_KDF};
