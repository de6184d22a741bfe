//! Plain TCP transport.
//!
//! Request is the raw payload bytes with no framing. The reply is whatever a
//! single read returns, capped at the configured buffer size. Replies larger
//! than the buffer are truncated.

use bytes::{Bytes, BytesMut};
use std::io::{self, Read, Write};
use std::net::{SocketAddr, TcpStream, ToSocketAddrs};
use std::time::Duration;
use tracing::{debug, trace, warn};

use super::Transport;
use crate::error::CheckError;

/// Connects to `target` once per exchange.
#[derive(Debug, Clone)]
pub struct StreamTransport {
    target: String,
    timeout: Option<Duration>,
    read_buffer_size: usize,
}

impl StreamTransport {
    pub fn new(
        target: impl Into<String>,
        timeout: Option<Duration>,
        read_buffer_size: usize,
    ) -> Self {
        Self {
            target: target.into(),
            timeout,
            read_buffer_size,
        }
    }

    /// Try each resolved address in turn, returning the first that connects.
    fn connect(&self) -> Result<TcpStream, CheckError> {
        let mut last_err = None;

        for addr in self.target.to_socket_addrs()? {
            match self.connect_addr(addr) {
                Ok(stream) => {
                    debug!(peer = %addr, "Connected");
                    return Ok(stream);
                }
                Err(e) => {
                    trace!(peer = %addr, error = %e, "Connect attempt failed");
                    last_err = Some(e);
                }
            }
        }

        Err(self.classify(last_err.unwrap_or_else(|| {
            io::Error::new(
                io::ErrorKind::AddrNotAvailable,
                format!("'{}' did not resolve to any address", self.target),
            )
        })))
    }

    fn connect_addr(&self, addr: SocketAddr) -> io::Result<TcpStream> {
        let socket = socket2::Socket::new(
            socket2::Domain::for_address(addr),
            socket2::Type::STREAM,
            Some(socket2::Protocol::TCP),
        )?;

        socket.set_nodelay(true)?;
        match self.timeout {
            Some(timeout) => socket.connect_timeout(&addr.into(), timeout)?,
            None => socket.connect(&addr.into())?,
        }
        socket.set_read_timeout(self.timeout)?;
        socket.set_write_timeout(self.timeout)?;

        Ok(socket.into())
    }

    /// Socket timeouts surface as `WouldBlock` or `TimedOut` depending on platform.
    fn classify(&self, e: io::Error) -> CheckError {
        match (e.kind(), self.timeout) {
            (io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut, Some(timeout)) => {
                CheckError::Timeout(timeout)
            }
            _ => CheckError::Connection(e),
        }
    }
}

impl Transport for StreamTransport {
    fn exchange(&mut self, payload: &[u8]) -> Result<Bytes, CheckError> {
        // Dropped at the end of this call on every path, closing the connection.
        let mut stream = self.connect()?;

        stream.write_all(payload).map_err(|e| self.classify(e))?;
        trace!(bytes = payload.len(), "Payload sent");

        let mut buffer = BytesMut::zeroed(self.read_buffer_size);
        let n = stream.read(&mut buffer).map_err(|e| self.classify(e))?;
        buffer.truncate(n);

        if n == self.read_buffer_size {
            warn!(bytes = n, "Reply filled the read buffer and may be truncated");
        } else {
            trace!(bytes = n, "Reply received");
        }

        Ok(buffer.freeze())
    }
}
