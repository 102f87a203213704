// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Request/response protocol for the printq scheduler.
//!
//! Wire format: 4-byte length prefix (big-endian) + JSON payload. A request
//! whose `body_len` is nonzero is followed by that many raw document bytes,
//! which the listener stages into a spool temp file before dispatch. The
//! scheduler core consumes only these parsed shapes; tag-level encoding is
//! somebody else's problem.

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

mod operation;
mod request;
mod response;
mod wire;

pub use operation::Operation;
pub use request::Request;
pub use response::Response;
pub use wire::{
    decode, encode, read_body, read_request, read_response, write_request, write_response,
    ProtocolError, MAX_MESSAGE,
};
