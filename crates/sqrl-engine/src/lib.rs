//! The SQRL protocol engine.
//!
//! Wires the leaf types from `sqrl-core` and the storage contract from
//! `sqrl-store` into the full request/reply cycle. One inbound backchannel
//! call runs through two independent storage transactions: process the
//! command, then compose and persist the reply.
//!
//! ## Components
//!
//! - [`SqrlContext`] — config, nut codec, and the process-wide mint counter
//! - [`resolve`] — identity state resolution (idk first, pidk fallback)
//! - [`RequestProcessor`] — the command state machine
//! - [`validate_nut`] — expiry and mark-then-allow replay protection
//! - [`build_reply`] — success and error-path reply construction
//! - [`status_changes`] — browser poll reconciliation
//! - [`AuthStateMonitor`] — pushes status changes to an injected listener
//! - [`SqrlOperations`] — the top-level session orchestrator
mod context;
mod error;
mod listener;
mod poll;
mod processor;
mod reply;
mod resolver;
mod session;
mod validate;

pub use context::*;
pub use error::*;
pub use listener::*;
pub use poll::*;
pub use processor::*;
pub use reply::*;
pub use resolver::*;
pub use session::*;
pub use validate::*;
