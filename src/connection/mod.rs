//! Message-level WebSocket connection.
//!
//! A [`Connection`] wraps a stream on which the opening handshake has
//! already completed. It splits into a [`MessageReader`], which owns the
//! inbound half, and a cloneable [`MessageWriter`] shared by everything
//! that writes (the sender, the tick hook, and the reader's own Pong and
//! Close replies).
//!
//! ## Close handshake
//!
//! 1. **Open** - after the upgrade
//! 2. **Closing** - our Close sent, waiting for the peer's
//! 3. **Closed** - handshake finished, stream failed, or shut down

#[allow(clippy::module_inception)]
mod connection;
mod fragmenter;
mod state;

pub use connection::{Connection, MessageReader, MessageWriter};
pub use fragmenter::{MessageFragmenter, frame_count};
pub use state::ConnectionState;
