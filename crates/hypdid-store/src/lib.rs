//! Storage abstraction for hypdid.
//!
//! The registry core never owns its logs. It borrows them from a
//! [`LogStore`]: a multi-log container addressing one append-only,
//! single-writer log per public key. Production deployments plug in a
//! persistent replicated-log engine; this crate ships the in-memory
//! reference implementation used throughout the test suite.

pub mod error;
pub mod memory;
pub mod traits;

pub use error::{Result, StoreError};
pub use memory::{MemoryLog, MemoryLogStore};
pub use traits::{Log, LogInfo, LogStore};
