//! SQRL protocol leaf types.
//!
//! Everything in this crate is a pure data type or codec with no storage or
//! transport dependencies. The engine crate composes these into the request
//! state machine.
//!
//! ## Token
//!
//! - [`NutToken`] — the single-use, time-bound login token
//! - [`NutCodec`] — encrypted wire encoding of nut tokens
//!
//! ## Protocol Vocabulary
//!
//! - [`Command`] — the five client commands plus the unsupported catch-all
//! - [`Opt`] — client-declared options (`cps`, `suk`, `hardlock`, ...)
//! - [`IdentityFlag`] — server-side capability flags with opt equivalents
//! - [`AuthStatus`] — correlator lifecycle states polled by the browser
//! - [`UserState`] — resolved identity state for one request
//!
//! ## Wire Formats
//!
//! - [`ClientRequest`] — parsed backchannel request parameters
//! - [`ServerReply`] — ordered name=value reply, base64url encoded whole
//! - [`Tif`] / [`TifBuilder`] — transaction information flag accumulation
mod codec;
mod command;
mod config;
mod error;
mod flag;
mod nut;
mod opt;
mod reply;
mod request;
mod status;
mod state;
mod tif;
pub mod util;

pub use codec::*;
pub use command::*;
pub use config::*;
pub use error::*;
pub use flag::*;
pub use nut::*;
pub use opt::*;
pub use reply::*;
pub use request::*;
pub use status::*;
pub use state::*;
pub use tif::*;

/// Literal placed in the nut and correlator reply fields when the request
/// failed, so a client that mistakenly continues the conversation is
/// detected immediately.
pub const ERROR_SENTINEL: &str = "error";

/// Transient correlator slot holding the exact last reply string sent,
/// echoed back by the client on its next request.
pub const TRANSIENT_SERVER_PARROT: &str = "server_parrot";

/// Identity data key for the server unlock key extension.
pub const DATA_SUK: &str = "suk";
