//! One-shot TCP transport for the bridging protocol.
//!
//! Every call opens a fresh connection, writes exactly one newline-terminated
//! JSON line, reads until a newline is observed (or the peer closes), and
//! closes the connection. No connection outlives a single exchange.

use std::io::{ErrorKind, Read, Write};
use std::net::{Ipv4Addr, SocketAddr, TcpStream};
use std::time::Duration;

use thiserror::Error;
use tracing::{debug, trace};

use crate::endpoint::Endpoint;

/// Transport-level failures, each scoped to the single call that produced it.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("cannot connect to Godot {endpoint} on port {port}; is it running?")]
    Unreachable { endpoint: &'static str, port: u16 },

    #[error("timeout waiting for response on port {port}")]
    Timeout { port: u16 },

    #[error("empty response from Godot")]
    EmptyResponse,

    #[error("connection error: {0}")]
    Io(String),
}

/// Seam between the command dispatcher and the wire. The production
/// implementation is [`TcpTransport`]; tests substitute a recording mock.
pub trait Transport {
    /// Send one already-framed request line and return the raw response bytes.
    fn call(
        &self,
        endpoint: &Endpoint,
        line: &str,
        timeout: Duration,
    ) -> Result<Vec<u8>, TransportError>;
}

/// Production transport: one TCP connection per call to 127.0.0.1.
pub struct TcpTransport;

impl Transport for TcpTransport {
    fn call(
        &self,
        endpoint: &Endpoint,
        line: &str,
        timeout: Duration,
    ) -> Result<Vec<u8>, TransportError> {
        let addr = SocketAddr::from((Ipv4Addr::LOCALHOST, endpoint.port));
        let mut stream =
            TcpStream::connect_timeout(&addr, timeout).map_err(|e| map_io(e, endpoint))?;
        stream
            .set_read_timeout(Some(timeout))
            .map_err(|e| TransportError::Io(e.to_string()))?;
        stream
            .set_write_timeout(Some(timeout))
            .map_err(|e| TransportError::Io(e.to_string()))?;

        trace!(port = endpoint.port, bytes = line.len(), "sending request line");
        stream
            .write_all(line.as_bytes())
            .map_err(|e| map_io(e, endpoint))?;

        // Read until the first newline or peer close. The wire format carries
        // exactly one newline per message, at the end; a response body with an
        // embedded raw newline would end this loop early. Known framing
        // limitation, kept deliberately.
        let mut data = Vec::new();
        let mut buf = [0u8; 65536];
        loop {
            match stream.read(&mut buf) {
                Ok(0) => break,
                Ok(n) => {
                    data.extend_from_slice(&buf[..n]);
                    if data.contains(&b'\n') {
                        break;
                    }
                }
                Err(e) if matches!(e.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut) => {
                    return Err(TransportError::Timeout {
                        port: endpoint.port,
                    });
                }
                Err(e) => return Err(TransportError::Io(e.to_string())),
            }
        }

        if data.is_empty() {
            return Err(TransportError::EmptyResponse);
        }
        debug!(port = endpoint.port, bytes = data.len(), "received response");
        Ok(data)
    }
}

fn map_io(e: std::io::Error, endpoint: &Endpoint) -> TransportError {
    match e.kind() {
        ErrorKind::ConnectionRefused => TransportError::Unreachable {
            endpoint: endpoint.name,
            port: endpoint.port,
        },
        ErrorKind::WouldBlock | ErrorKind::TimedOut => TransportError::Timeout {
            port: endpoint.port,
        },
        _ => TransportError::Io(e.to_string()),
    }
}
