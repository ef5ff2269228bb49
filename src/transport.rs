//! Unicast request/response transport to a bulb.

use std::io;
use std::net::SocketAddr;
use std::time::Duration;

use log::debug;
use tokio::net::UdpSocket;

/// Transport-level failure, split so callers can tell the retryable
/// timeout apart from a hard fault.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// No response arrived within the allowed window.
    #[error("request timed out")]
    Timeout,
    /// The socket failed outright (bind, send, refused, ...).
    #[error("transport io error: {0:?}")]
    Io(#[from] io::Error),
}

/// Request/response exchange with a single device.
///
/// The production implementation is [`UdpTransport`]; tests substitute
/// a recording fake so dispatch logic runs without sockets.
pub trait Transport: Send + Sync {
    /// Send `payload` to `addr` and await one reply, bounded by `timeout`.
    fn request(
        &self,
        addr: SocketAddr,
        payload: &[u8],
        timeout: Duration,
    ) -> impl Future<Output = Result<Vec<u8>, TransportError>> + Send;
}

/// UDP transport speaking the Wiz request/response protocol.
///
/// Each request binds a fresh ephemeral socket, so a reply that arrives
/// after the timeout dies with the socket instead of poisoning a later
/// exchange.
#[derive(Debug, Default, Clone, Copy)]
pub struct UdpTransport;

impl Transport for UdpTransport {
    async fn request(
        &self,
        addr: SocketAddr,
        payload: &[u8],
        timeout: Duration,
    ) -> Result<Vec<u8>, TransportError> {
        let socket = UdpSocket::bind("0.0.0.0:0").await?;
        socket.connect(addr).await?;
        socket.send(payload).await?;

        let mut buffer = [0u8; 4096];
        let bytes = tokio::time::timeout(timeout, socket.recv(&mut buffer))
            .await
            .map_err(|_| TransportError::Timeout)??;

        debug!("UDP response from {addr}: {} bytes", bytes);
        Ok(buffer[..bytes].to_vec())
    }
}
