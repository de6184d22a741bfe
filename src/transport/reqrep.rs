//! ZeroMQ REQ transport.
//!
//! One REQ socket serves the whole run. It is opened on the first exchange
//! and dropped after any failed one, so the next exchange starts from a
//! fresh socket instead of one still waiting on a reply.

use bytes::Bytes;
use std::time::Duration;
use tracing::{debug, trace};

use super::Transport;
use crate::error::CheckError;

pub struct ReqRepTransport {
    // Declared before `context` so it is closed first.
    socket: Option<zmq::Socket>,
    context: zmq::Context,
    endpoint: String,
    timeout: Option<Duration>,
}

impl ReqRepTransport {
    pub fn new(endpoint: impl Into<String>, timeout: Option<Duration>) -> Self {
        Self {
            socket: None,
            context: zmq::Context::new(),
            endpoint: endpoint.into(),
            timeout,
        }
    }

    fn open(&self) -> Result<zmq::Socket, CheckError> {
        let socket = self.context.socket(zmq::REQ)?;

        // -1 blocks forever.
        let timeout_ms = self
            .timeout
            .map_or(-1, |t| i32::try_from(t.as_millis()).unwrap_or(i32::MAX));
        socket.set_rcvtimeo(timeout_ms)?;
        socket.set_sndtimeo(timeout_ms)?;
        socket.set_linger(0)?;
        socket.connect(&self.endpoint)?;

        debug!(endpoint = %self.endpoint, "REQ socket connected");
        Ok(socket)
    }

    fn round_trip(&self, socket: &zmq::Socket, payload: &[u8]) -> Result<Bytes, CheckError> {
        socket.send(payload, 0).map_err(|e| self.classify(e))?;
        trace!(bytes = payload.len(), "Request sent");

        let reply = socket.recv_bytes(0).map_err(|e| self.classify(e))?;
        trace!(bytes = reply.len(), "Reply received");

        Ok(Bytes::from(reply))
    }

    fn classify(&self, e: zmq::Error) -> CheckError {
        match (e, self.timeout) {
            (zmq::Error::EAGAIN, Some(timeout)) => CheckError::Timeout(timeout),
            (e, _) => CheckError::Messaging(e),
        }
    }

    #[cfg(test)]
    fn is_open(&self) -> bool {
        self.socket.is_some()
    }
}

impl Transport for ReqRepTransport {
    fn exchange(&mut self, payload: &[u8]) -> Result<Bytes, CheckError> {
        let socket = match self.socket.take() {
            Some(socket) => socket,
            None => self.open()?,
        };

        let result = self.round_trip(&socket, payload);
        if result.is_ok() {
            self.socket = Some(socket);
        } else {
            debug!(endpoint = %self.endpoint, "Discarding REQ socket after failed exchange");
        }
        result
    }
}
