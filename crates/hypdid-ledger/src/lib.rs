//! The event-sourced ledger for a single DID.
//!
//! A [`Ledger`] binds one identifier to one append-only log and derives the
//! resolvable document state by folding the log's event sequence. It
//! enforces the key binding between DID and log, single initialization, and
//! the deterministic payload-merge fold.

pub mod error;
pub mod ledger;

pub use error::{LedgerError, Result};
pub use ledger::Ledger;
