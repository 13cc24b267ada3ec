//! # hypdid Core
//!
//! Pure primitives for the hypdid registry: the DID codec, identity keys,
//! and the record format for per-DID event logs.
//!
//! This crate contains no I/O, no storage, no networking. It is pure
//! computation over identifiers and serialized records.
//!
//! ## Key Types
//!
//! - [`Did`] - A decentralized identifier bound to one public key
//! - [`PublicKey`] - A 32-byte Ed25519 public key
//! - [`Record`] - One immutable, versioned element of a DID's log
//! - [`Header`] - The mandatory record at index 0 of every log

pub mod crypto;
pub mod did;
pub mod error;
pub mod record;

pub use crypto::{derive_seed, verify_keypair, Keypair, PublicKey, Signature};
pub use did::{decode_key, encode_key, Did, DID_PREFIX, ENCODED_KEY_LEN};
pub use error::{CoreError, DidError};
pub use record::{header_event, Event, Header, Record, FORMAT_VERSION, INIT_EVENT_TYPE};
