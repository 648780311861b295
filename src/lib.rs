//! # wsburst - one-shot WebSocket burst client
//!
//! `wsburst` connects to a WebSocket server, writes a single large text
//! message, and then drains whatever the server sends back until the
//! connection ends. It carries its own compact RFC 6455 client: handshake,
//! masked framing, fragmentation and reassembly.
//!
//! ## Layout
//!
//! - [`protocol`]: frames, opcodes, masking, handshake, reassembly
//! - [`codec`]: frame reader and writer over the halves of a stream
//! - [`connection`]: message-level reader and shared writer
//! - [`client`]: connector, sender, receiver, completion signal,
//!   lifecycle loop, and the [`Client`] that ties them together
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use wsburst::{Client, Config, Endpoint};
//!
//! wsburst::logging::init();
//! let endpoint = Endpoint::ws("127.0.0.1:8500", "/ws");
//! let report = Client::new(endpoint, Config::new()).run().await?;
//! ```

pub mod client;
pub mod codec;
pub mod config;
pub mod connection;
pub mod endpoint;
pub mod error;
pub mod logging;
pub mod message;
pub mod protocol;

pub use client::{
    Client, CompletionSignal, IdleHook, LifecycleReport, ReceiveReport, Session, SessionReport,
    TickAction, TickHook,
};
pub use config::{Config, Limits, WritePolicy};
pub use connection::{Connection, ConnectionState, MessageReader, MessageWriter};
pub use endpoint::{Endpoint, Scheme};
pub use error::{ClientError, Error, Result};
pub use message::{CloseCode, CloseFrame, Message};
pub use protocol::{HandshakeRequest, HandshakeResponse, OpCode, WS_GUID, compute_accept_key};

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::DuplexStream;

    fn assert_send<T: Send>() {}
    fn assert_sync<T: Sync>() {}

    #[test]
    fn test_public_types_are_send() {
        assert_send::<Error>();
        assert_send::<ClientError>();
        assert_send::<Config>();
        assert_send::<Limits>();
        assert_send::<Endpoint>();
        assert_send::<Message>();
        assert_send::<CloseFrame>();
        assert_send::<ConnectionState>();
        assert_send::<CompletionSignal>();
        assert_send::<Client>();
        assert_send::<Session<DuplexStream>>();
        assert_send::<MessageReader<DuplexStream>>();
        assert_send::<MessageWriter<DuplexStream>>();
    }

    #[test]
    fn test_public_types_are_sync() {
        assert_sync::<Error>();
        assert_sync::<ClientError>();
        assert_sync::<Config>();
        assert_sync::<Limits>();
        assert_sync::<Endpoint>();
        assert_sync::<Message>();
        assert_sync::<CompletionSignal>();
        assert_sync::<MessageWriter<DuplexStream>>();
    }
}
