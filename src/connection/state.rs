//! Close-handshake state of an established connection (RFC 6455 Section 7).

/// WebSocket connection state.
///
/// A connection handed out by the connector starts `Open`; the handshake
/// itself is not modelled here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ConnectionState {
    /// Ready for data transfer in both directions.
    #[default]
    Open,
    /// We sent a Close frame and are waiting for the peer's.
    Closing,
    /// Close handshake finished, or the stream failed or was shut down.
    Closed,
}

impl ConnectionState {
    /// Returns `true` only for `Open`.
    #[must_use]
    #[inline]
    pub const fn can_send(&self) -> bool {
        matches!(self, ConnectionState::Open)
    }

    /// State after a Close frame arrives from the peer.
    ///
    /// Returns the new state and whether a Close frame must be echoed.
    #[must_use]
    pub const fn on_peer_close(self) -> (Self, bool) {
        match self {
            ConnectionState::Open => (ConnectionState::Closed, true),
            ConnectionState::Closing | ConnectionState::Closed => (ConnectionState::Closed, false),
        }
    }
}

impl std::fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConnectionState::Open => write!(f, "Open"),
            ConnectionState::Closing => write!(f, "Closing"),
            ConnectionState::Closed => write!(f, "Closed"),
        }
    }
}
