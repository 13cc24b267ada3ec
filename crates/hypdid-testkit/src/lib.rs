//! # hypdid Testkit
//!
//! Testing utilities for the hypdid workspace.
//!
//! ## Overview
//!
//! This crate provides:
//!
//! - **Golden vectors**: known key/DID pairs for cross-implementation
//!   verification of the key codec
//! - **Generators**: proptest strategies for keys, DIDs, and events
//! - **Fixtures**: helper structs for setting up ledger test scenarios
//!
//! ## Test Fixtures
//!
//! Quickly set up a writable ledger:
//!
//! ```rust,ignore
//! use hypdid_testkit::fixtures::TestFixture;
//!
//! let fixture = TestFixture::new();
//! let mut ledger = fixture.initialized_ledger("profile").await?;
//! ledger.append(vec![fixture.payload_event("name", "Alice")]).await?;
//! ```

pub mod fixtures;
pub mod generators;
pub mod vectors;

pub use fixtures::{multi_party_fixtures, TestFixture};
pub use generators::{did, event, keypair, public_key};
pub use vectors::{all_vectors, verify_all_vectors, GoldenDid};
