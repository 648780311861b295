//! The burst client.
//!
//! A [`Client`] dials its endpoint, writes one large text message, then
//! runs two things side by side until the peer is done:
//!
//! - a spawned receiver that drains and logs inbound messages, and
//! - the lifecycle loop, which ticks and waits for the receiver to signal.
//!
//! ```rust,ignore
//! use wsburst::{Client, Config, Endpoint};
//!
//! let endpoint = Endpoint::ws("127.0.0.1:8500", "/ws");
//! let report = Client::new(endpoint, Config::new()).run().await?;
//! println!("{} messages", report.receive.messages);
//! ```

pub mod connector;
pub mod lifecycle;
pub mod receiver;
pub mod sender;
pub mod signal;

use std::fmt;

use tokio::io::{AsyncRead, AsyncWrite};
use tracing::{debug, warn};

use crate::config::{Config, WritePolicy};
use crate::connection::{Connection, MessageWriter};
use crate::endpoint::Endpoint;
use crate::error::{ClientError, Error};

pub use connector::{connect, handshake};
pub use lifecycle::{
    IdleHook, LifecycleController, LifecycleReport, LifecycleState, TickAction, TickHook,
};
pub use receiver::{ReceiveReport, receive, spawn_receiver};
pub use sender::{build_payload, send_payload};
pub use signal::{CompletionSignal, FireGuard};

/// Outcome of a session that ran to completion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionReport {
    /// The initial write's failure, kept under [`WritePolicy::Lenient`].
    pub write_error: Option<ClientError>,
    pub lifecycle: LifecycleReport,
    pub receive: ReceiveReport,
}

/// Everything after the handshake, over one established connection.
pub struct Session<T> {
    connection: Connection<T>,
    config: Config,
    hook: Box<dyn TickHook>,
}

impl<T> fmt::Debug for Session<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl<T> Session<T>
where
    T: AsyncRead + AsyncWrite + Send + 'static,
{
    #[must_use]
    pub fn new(connection: Connection<T>, config: Config) -> Self {
        Self {
            connection,
            config,
            hook: Box::new(IdleHook),
        }
    }

    /// Replace the default no-op tick hook.
    #[must_use]
    pub fn with_hook(mut self, hook: impl TickHook + 'static) -> Self {
        self.hook = Box::new(hook);
        self
    }

    /// Send the payload, then receive and tick until the receiver finishes.
    ///
    /// The receiver is spawned only after the write attempt returns, and is
    /// always joined before this returns.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Write`] if the initial write fails under
    /// [`WritePolicy::Strict`]. The receiver is not started in that case.
    pub async fn run(self) -> Result<SessionReport, ClientError> {
        let Self {
            connection,
            config,
            hook,
        } = self;
        let (reader, writer) = connection.split();

        let write_error = send_payload(&writer, config.payload_len).await.err();
        if let Some(e) = &write_error {
            warn!("{e}");
            if config.write_policy == WritePolicy::Strict {
                drop(reader);
                shutdown(&writer).await;
                return Err(e.clone());
            }
        }

        let signal = CompletionSignal::new();
        let receiver = spawn_receiver(reader, signal.clone());
        let mut controller = LifecycleController::new(config.tick_interval, hook);
        let lifecycle = controller.run(&signal, &writer).await;

        let receive = match receiver.await {
            Ok(report) => report,
            Err(e) if e.is_panic() => std::panic::resume_unwind(e.into_panic()),
            Err(e) => ReceiveReport {
                messages: 0,
                bytes: 0,
                cause: ClientError::Read(Error::Io(e.to_string())),
            },
        };
        shutdown(&writer).await;

        Ok(SessionReport {
            write_error,
            lifecycle,
            receive,
        })
    }
}

async fn shutdown<T: AsyncWrite>(writer: &MessageWriter<T>) {
    match writer.shutdown().await {
        Ok(()) => debug!("connection shut down"),
        Err(e) => debug!("shutdown: {e}"),
    }
}

/// Dials an endpoint and runs a [`Session`] on the connection.
pub struct Client {
    endpoint: Endpoint,
    config: Config,
    hook: Box<dyn TickHook>,
}

impl fmt::Debug for Client {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Client")
            .field("endpoint", &self.endpoint)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl Client {
    #[must_use]
    pub fn new(endpoint: Endpoint, config: Config) -> Self {
        Self {
            endpoint,
            config,
            hook: Box::new(IdleHook),
        }
    }

    /// Replace the default no-op tick hook.
    #[must_use]
    pub fn with_hook(mut self, hook: impl TickHook + 'static) -> Self {
        self.hook = Box::new(hook);
        self
    }

    #[must_use]
    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    /// Connect, then run the session.
    ///
    /// # Errors
    ///
    /// [`ClientError::Connect`] if the handshake fails; nothing is sent in
    /// that case. Otherwise as [`Session::run`].
    pub async fn run(self) -> Result<SessionReport, ClientError> {
        let connection = connect(&self.endpoint, &self.config).await?;
        Session {
            connection,
            config: self.config,
            hook: self.hook,
        }
        .run()
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::Message;
    use crate::protocol::Frame;
    use bytes::BytesMut;
    use std::time::Duration;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    fn server_bytes(frame: Frame) -> Vec<u8> {
        let mut buf = BytesMut::new();
        frame.encode(&mut buf, None);
        buf.to_vec()
    }

    fn small_config() -> Config {
        Config::new()
            .with_payload_len(64)
            .with_tick_interval(Duration::from_millis(10))
    }

    #[tokio::test]
    async fn test_write_precedes_receive() {
        let (client, mut peer) = tokio::io::duplex(64 * 1024);
        let session = Session::new(Connection::new(client, &small_config()), small_config());

        let peer_task = tokio::spawn(async move {
            // The first bytes the peer sees are the payload frame.
            let mut header = [0u8; 2];
            peer.read_exact(&mut header).await.unwrap();
            assert_eq!(header, [0x81, 0x80 | 64]);
            let mut rest = [0u8; 4 + 64];
            peer.read_exact(&mut rest).await.unwrap();

            peer.write_all(&server_bytes(Frame::text(vec![b'r'; 10])))
                .await
                .unwrap();
            peer.write_all(&server_bytes(Frame::close(Some(1000), "")))
                .await
                .unwrap();
            peer
        });

        let report = session.run().await.unwrap();
        assert_eq!(report.write_error, None);
        assert_eq!(report.receive.messages, 1);
        assert_eq!(report.receive.bytes, 10);
        assert_eq!(
            report.receive.cause,
            ClientError::Read(Error::ConnectionClosed(Some(1000)))
        );
        peer_task.await.unwrap();
    }

    #[tokio::test]
    async fn test_lenient_write_failure_still_waits() {
        let (client, peer) = tokio::io::duplex(1024);
        drop(peer);
        let session = Session::new(Connection::new(client, &small_config()), small_config());

        let report = session.run().await.unwrap();
        assert!(matches!(report.write_error, Some(ClientError::Write(_))));
        assert!(matches!(report.receive.cause, ClientError::Read(_)));
    }

    #[tokio::test]
    async fn test_strict_write_failure_ends_session() {
        let (client, peer) = tokio::io::duplex(1024);
        drop(peer);
        let config = small_config().with_write_policy(WritePolicy::Strict);
        let session = Session::new(Connection::new(client, &config), config);

        let err = session.run().await.unwrap_err();
        assert!(matches!(err, ClientError::Write(Error::Io(_))));
    }

    #[tokio::test]
    async fn test_hook_runs_until_peer_closes() {
        let (client, mut peer) = tokio::io::duplex(64 * 1024);
        let config = small_config();
        let session = Session::new(Connection::new(client, &config), config)
            .with_hook(|tick: u64| TickAction::Send(Message::text(format!("{tick}"))));

        let peer_task = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            peer.write_all(&server_bytes(Frame::close(None, "")))
                .await
                .unwrap();
            let mut sink = Vec::new();
            let _ = peer.read_to_end(&mut sink).await;
            sink
        });

        let report = session.run().await.unwrap();
        assert!(report.lifecycle.ticks >= 1);
        assert_eq!(
            report.receive.cause,
            ClientError::Read(Error::ConnectionClosed(None))
        );
        let sink = peer_task.await.unwrap();
        assert!(!sink.is_empty());
    }

    #[test]
    fn test_client_debug_names_endpoint() {
        let client = Client::new(Endpoint::ws("127.0.0.1:8500", "/ws"), Config::new());
        assert_eq!(client.endpoint().to_string(), "ws://127.0.0.1:8500/ws");
        assert!(format!("{client:?}").contains("127.0.0.1:8500"));
    }
}
