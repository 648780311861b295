//! Background task draining inbound messages.

use tokio::io::{AsyncRead, AsyncWrite};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::client::signal::CompletionSignal;
use crate::connection::MessageReader;
use crate::error::{ClientError, Error};
use crate::message::Message;

/// What the receiver saw before its terminal read condition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReceiveReport {
    /// Data messages received.
    pub messages: u64,
    /// Sum of their payload lengths.
    pub bytes: u64,
    /// Always [`ClientError::Read`].
    pub cause: ClientError,
}

/// Read until the connection closes or fails, logging each data message's
/// length, then fire `signal`.
///
/// The signal fires even if the returned future is dropped unpolled, is
/// aborted, or panics.
pub fn receive<T>(
    mut reader: MessageReader<T>,
    signal: CompletionSignal,
) -> impl Future<Output = ReceiveReport>
where
    T: AsyncRead + AsyncWrite,
{
    let guard = signal.fire_on_drop();
    async move {
        let _guard = guard;
        let mut messages = 0u64;
        let mut bytes = 0u64;

        let cause = loop {
            let message = match reader.recv().await {
                Ok(message) => message,
                Err(e) => break e,
            };
            match message {
                Message::Close(close) => {
                    break Error::ConnectionClosed(close.map(|cf| cf.code.as_u16()));
                }
                Message::Ping(payload) => debug!(len = payload.len(), "ping"),
                Message::Pong(payload) => debug!(len = payload.len(), "pong"),
                data => {
                    let len = data.len();
                    info!("recv: {len}");
                    messages += 1;
                    bytes += len as u64;
                }
            }
        };

        let cause = ClientError::Read(cause);
        warn!("{cause}");
        ReceiveReport {
            messages,
            bytes,
            cause,
        }
    }
}

/// Run [`receive`] on its own task.
pub fn spawn_receiver<T>(reader: MessageReader<T>, signal: CompletionSignal) -> JoinHandle<ReceiveReport>
where
    T: AsyncRead + AsyncWrite + Send + 'static,
{
    tokio::spawn(receive(reader, signal))
}
