//! Protocol Module
//!
//! The boundary between the engine and whatever request layer fronts it.
//! A request layer turns its wire format into a [`Command`], hands it to
//! `Engine::execute`, and renders the [`Response`].
//!
//! ### Commands
//! - SET    - key, value (both non-empty)
//! - GET    - key
//! - DEL    - key
//! - GETALL - no arguments
//!
//! ### Status Codes
//! - 0x00: OK
//! - 0x01: NOT_FOUND
//! - 0x02: ERROR        (I/O failure, corrupt segment)
//! - 0x03: BAD_REQUEST  (empty or oversize key/value)

mod command;
mod response;

pub use command::{Command, CommandType};
pub use response::{Response, Status};
