//! Transports that carry one payload to the server and bring one reply back.
//!
//! - `stream`: plain TCP, a fresh connection per payload
//! - `reqrep`: a ZeroMQ REQ socket kept for the whole run
//!
//! Both expose a single `exchange` call. Sending and receiving are never
//! separate operations, so a REQ socket can't be driven out of its
//! send/receive alternation.

mod reqrep;
mod stream;

pub use reqrep::ReqRepTransport;
pub use stream::StreamTransport;

use bytes::Bytes;

use crate::config::{Config, TransportKind};
use crate::error::CheckError;

/// One request, one reply.
pub trait Transport {
    /// Send `payload` as a single write/message and block for the reply.
    fn exchange(&mut self, payload: &[u8]) -> Result<Bytes, CheckError>;
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn exchange(&mut self, payload: &[u8]) -> Result<Bytes, CheckError> {
        (**self).exchange(payload)
    }
}

/// Build the transport selected by `config`.
///
/// Nothing is connected yet; both transports connect on first exchange.
pub fn from_config(config: &Config) -> Box<dyn Transport> {
    match config.transport {
        TransportKind::Stream => Box::new(StreamTransport::new(
            config.target.clone(),
            config.timeout,
            config.read_buffer_size,
        )),
        TransportKind::ReqRep => Box::new(ReqRepTransport::new(
            config.target.clone(),
            config.timeout,
        )),
    }
}
