use std::net::{Ipv4Addr, Ipv6Addr, SocketAddr, ToSocketAddrs as _, UdpSocket};

use parking_lot::RwLock;
use tracing::debug;

use super::{Transport, TransportError};

/// A UDP transport to a single StatsD server.
///
/// The socket lives behind a reader/writer lock: sends only need shared access, so they never queue up behind each
/// other, while opening and closing the socket take exclusive access.
pub struct UdpTransport {
    host: String,
    port: u16,
    socket: RwLock<Option<UdpSocket>>,
}

impl UdpTransport {
    /// Creates a new `UdpTransport` for the given remote host and port.
    ///
    /// No resolution or socket setup happens until [`open`][Transport::open] is called.
    pub fn new<H>(host: H, port: u16) -> Self
    where
        H: Into<String>,
    {
        Self { host: host.into(), port, socket: RwLock::new(None) }
    }

    fn remote_addr(&self) -> String {
        if self.host.contains(':') {
            format!("[{}]:{}", self.host, self.port)
        } else {
            format!("{}:{}", self.host, self.port)
        }
    }

    fn dial(&self) -> Result<UdpSocket, TransportError> {
        let addr = self.remote_addr();
        let dial_error = |source| TransportError::Dial { addr: addr.clone(), source };

        let addrs: Vec<SocketAddr> =
            (self.host.as_str(), self.port).to_socket_addrs().map_err(dial_error)?.collect();

        // Bind in the address family of the first candidate, since a socket can only connect within its own family.
        let bind_addr = match addrs.first() {
            Some(SocketAddr::V6(_)) => SocketAddr::from((Ipv6Addr::UNSPECIFIED, 0)),
            _ => SocketAddr::from((Ipv4Addr::UNSPECIFIED, 0)),
        };

        UdpSocket::bind(bind_addr)
            .and_then(|socket| {
                socket.connect(&addrs[..])?;
                Ok(socket)
            })
            .map_err(dial_error)
    }

    /// Returns `true` if the socket is currently open.
    pub fn is_connected(&self) -> bool {
        self.socket.read().is_some()
    }
}

impl Transport for UdpTransport {
    fn open(&self) -> Result<(), TransportError> {
        let mut socket = self.socket.write();
        if socket.is_some() {
            return Ok(());
        }

        let dialed = self.dial()?;
        debug!(remote_addr = %self.remote_addr(), local_addr = ?dialed.local_addr().ok(), "Opened UDP socket.");
        *socket = Some(dialed);
        Ok(())
    }

    fn send(&self, payload: &[u8]) -> Result<usize, TransportError> {
        let socket = self.socket.read();
        let socket = socket.as_ref().ok_or(TransportError::NotConnected)?;

        let written = socket.send(payload).map_err(|source| TransportError::Send { source })?;
        if written != payload.len() {
            return Err(TransportError::ShortWrite { written, expected: payload.len() });
        }

        Ok(written)
    }

    fn close(&self) {
        if self.socket.write().take().is_some() {
            debug!(remote_addr = %self.remote_addr(), "Closed UDP socket.");
        }
    }

    fn transport_id(&self) -> &'static str {
        "udp"
    }
}
