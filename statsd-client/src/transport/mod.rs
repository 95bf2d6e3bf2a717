use std::io;

use thiserror::Error;

mod udp;
pub use self::udp::UdpTransport;

/// Errors that could occur while opening or writing to a transport.
///
/// The client never surfaces these to callers emitting metrics: they are logged and the affected payload is dropped.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The remote address could not be resolved, or the socket could not be created or connected.
    #[error("failed to dial {addr}: {source}")]
    Dial {
        /// Address that was being dialed.
        addr: String,

        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// Writing a payload to the socket failed.
    #[error("failed to send payload: {source}")]
    Send {
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// Only part of a payload was written to the socket.
    #[error("short write: sent {written} of {expected} bytes")]
    ShortWrite {
        /// Bytes actually written.
        written: usize,

        /// Length of the payload.
        expected: usize,
    },

    /// No socket is open.
    #[error("transport is not connected")]
    NotConnected,
}

/// A datagram transport that payloads are handed to.
///
/// Each call to [`send`][Transport::send] carries exactly one complete payload, which is written as a single datagram.
/// Implementations must never retry: a failed send is reported once and the payload is gone.
pub trait Transport: Send + Sync {
    /// Opens the transport.
    ///
    /// # Errors
    ///
    /// If the underlying socket cannot be established, an error is returned and the transport stays closed.
    fn open(&self) -> Result<(), TransportError>;

    /// Sends a single payload.
    ///
    /// # Errors
    ///
    /// If the transport is not open, or the write fails or is incomplete, an error is returned.
    fn send(&self, payload: &[u8]) -> Result<usize, TransportError>;

    /// Closes the transport, releasing the underlying socket.
    fn close(&self);

    /// Returns a short identifier for the transport, such as `udp`.
    fn transport_id(&self) -> &'static str;
}
