//! Storage contract and reference store for the SQRL server.
//!
//! The engine consumes a deliberately narrow, synchronous contract: a
//! [`Persistence`] hands out scoped [`Transaction`]s that roll back on drop
//! unless committed, so every exit path releases its unit of work.
//!
//! ## Records
//!
//! - [`Identity`] — one registered authenticator key with its capability
//!   flags and extension data
//! - [`Correlator`] — one browser login attempt and its polled status
//!
//! ## Implementations
//!
//! - [`MemoryStore`] — snapshot-rollback in-memory store used by tests and
//!   small embeddings; production deployments implement the contract over
//!   their own database
mod contract;
mod correlator;
mod identity;
mod memory;

pub use contract::*;
pub use correlator::*;
pub use identity::*;
pub use memory::*;
