//! Error types for the client and its WebSocket transport.
//!
//! [`Error`] covers everything that can go wrong on the wire (RFC 6455
//! violations, handshake failures, I/O). [`ClientError`] is the client's own
//! taxonomy: which phase of the session a transport error surfaced in.

use thiserror::Error;

/// Result type alias for transport operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur on a WebSocket connection.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum Error {
    /// Invalid frame structure or header.
    #[error("Invalid frame: {0}")]
    InvalidFrame(String),

    /// Protocol violation detected.
    #[error("Protocol violation: {0}")]
    ProtocolViolation(String),

    /// Invalid UTF-8 in text message.
    #[error("Invalid UTF-8 in text message")]
    InvalidUtf8,

    /// Frame size exceeds configured maximum.
    #[error("Frame too large: {size} bytes (max: {max})")]
    FrameTooLarge {
        /// Actual frame size.
        size: usize,
        /// Maximum allowed size.
        max: usize,
    },

    /// Frame length does not fit in this platform's address space.
    #[error("Payload too large for platform: {size} bytes (max: {max})")]
    PayloadTooLargeForPlatform {
        /// Declared payload length.
        size: u64,
        /// Largest representable length.
        max: u64,
    },

    /// Message size exceeds configured maximum.
    #[error("Message too large: {size} bytes (max: {max})")]
    MessageTooLarge {
        /// Actual message size.
        size: usize,
        /// Maximum allowed size.
        max: usize,
    },

    /// Too many fragments in a single message.
    #[error("Too many fragments: {count} (max: {max})")]
    TooManyFragments {
        /// Actual fragment count.
        count: usize,
        /// Maximum allowed fragments.
        max: usize,
    },

    /// Connection has been closed, with the peer's close code if one was sent.
    #[error("Connection closed: {0:?}")]
    ConnectionClosed(Option<u16>),

    /// Invalid WebSocket handshake.
    #[error("Invalid handshake: {0}")]
    InvalidHandshake(String),

    /// Handshake response head exceeds the configured maximum.
    #[error("Handshake too large: {size} bytes (max: {max})")]
    HandshakeTooLarge {
        /// Bytes received so far.
        size: usize,
        /// Maximum allowed size.
        max: usize,
    },

    /// Handshake did not complete in time.
    #[error("Handshake timed out after {0:?}")]
    HandshakeTimeout(std::time::Duration),

    /// I/O error occurred.
    #[error("I/O error: {0}")]
    Io(String),

    /// Endpoint could not be parsed or resolved.
    #[error("Invalid endpoint: {0}")]
    InvalidEndpoint(String),

    /// Endpoint scheme this client cannot speak.
    #[error("Unsupported scheme: {0}")]
    UnsupportedScheme(String),

    /// Invalid close code.
    #[error("Invalid close code: {0}")]
    InvalidCloseCode(u16),

    /// Reserved opcode used.
    #[error("Reserved opcode: {0:#x}")]
    ReservedOpcode(u8),

    /// Control frame fragmented (RFC violation).
    #[error("Control frames cannot be fragmented")]
    FragmentedControlFrame,

    /// Control frame payload too large (>125 bytes).
    #[error("Control frame payload too large: {0} bytes (max: 125)")]
    ControlFrameTooLarge(usize),

    /// Masked frame received from the server.
    #[error("Server frame must not be masked")]
    MaskedServerFrame,

    /// Reserved bits set without extension.
    #[error("Reserved bits set without negotiated extension")]
    ReservedBitsSet,

    /// Incomplete frame data.
    #[error("Incomplete frame: need {needed} more bytes")]
    IncompleteFrame {
        /// Number of additional bytes needed.
        needed: usize,
    },

    /// Invalid opcode value.
    #[error("Invalid opcode: {0:#x}")]
    InvalidOpcode(u8),
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Io(err.to_string())
    }
}

impl From<std::str::Utf8Error> for Error {
    fn from(_: std::str::Utf8Error) -> Self {
        Error::InvalidUtf8
    }
}

impl From<url::ParseError> for Error {
    fn from(err: url::ParseError) -> Self {
        Error::InvalidEndpoint(err.to_string())
    }
}

/// Failures of a client session, by the phase they occurred in.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ClientError {
    /// Dial or handshake failed. Fatal: no message is exchanged.
    #[error("dial {endpoint}: {source}")]
    Connect {
        /// The endpoint being dialed.
        endpoint: String,
        /// Underlying cause.
        #[source]
        source: Error,
    },

    /// Writing an outbound message failed.
    #[error("write: {0}")]
    Write(#[source] Error),

    /// Reading the next inbound message failed, including a peer-initiated close.
    #[error("read: {0}")]
    Read(#[source] Error),
}

impl ClientError {
    /// The transport error underneath.
    #[must_use]
    pub fn cause(&self) -> &Error {
        match self {
            ClientError::Connect { source, .. } => source,
            ClientError::Write(source) | ClientError::Read(source) => source,
        }
    }

    /// Returns `true` if this error ends the process.
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        matches!(self, ClientError::Connect { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::FrameTooLarge {
            size: 20_000_000,
            max: 16_000_000,
        };
        assert_eq!(
            err.to_string(),
            "Frame too large: 20000000 bytes (max: 16000000)"
        );
    }

    #[test]
    fn test_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::BrokenPipe, "pipe broken");
        let ws_err: Error = io_err.into();
        assert!(matches!(ws_err, Error::Io(_)));
    }

    #[test]
    fn test_error_from_url() {
        let err: Error = url::Url::parse("not a url").unwrap_err().into();
        assert!(matches!(err, Error::InvalidEndpoint(_)));
    }

    #[test]
    fn test_connect_error_display() {
        let err = ClientError::Connect {
            endpoint: "ws://127.0.0.1:1/ws".into(),
            source: Error::Io("connection refused".into()),
        };
        assert_eq!(
            err.to_string(),
            "dial ws://127.0.0.1:1/ws: I/O error: connection refused"
        );
        assert!(err.is_fatal());
    }

    #[test]
    fn test_read_error_is_not_fatal() {
        let err = ClientError::Read(Error::ConnectionClosed(Some(1000)));
        assert_eq!(err.to_string(), "read: Connection closed: Some(1000)");
        assert!(!err.is_fatal());
        assert_eq!(err.cause(), &Error::ConnectionClosed(Some(1000)));
    }

    #[test]
    fn test_write_error_source() {
        use std::error::Error as _;
        let err = ClientError::Write(Error::ConnectionClosed(None));
        assert!(err.source().is_some());
    }
}
