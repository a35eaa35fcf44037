// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! IPC protocol for control-plane communication.
//!
//! Wire format: 4-byte length prefix (big-endian) + JSON payload

mod request;
mod response;
mod types;
mod wire;

pub use request::Request;
pub use response::Response;
pub use types::{StatusEntry, WorkloadEntry};
pub use wire::{
    decode, encode, read_message, read_request, write_message, write_response, ProtocolError,
};
