//! Per-payload failure kinds.
//!
//! None of these abort a run: the verifier records them against the payload
//! that produced them and moves on. A digest mismatch is an outcome, not an
//! error, and has no variant here.

use std::io;
use std::time::Duration;

#[derive(Debug, thiserror::Error)]
pub enum CheckError {
    /// Stream connection could not be established or used.
    #[error("{0}")]
    Connection(#[from] io::Error),

    /// ZeroMQ socket setup, send or receive failed.
    #[error("{0}")]
    Messaging(#[from] zmq::Error),

    /// No reply (or no connection) within the configured timeout.
    #[error("timed out after {}ms", .0.as_millis())]
    Timeout(Duration),

    /// Reply was not UTF-8, not JSON, or not a JSON object.
    #[error("{0}")]
    Parse(String),
}
