//! The single large write made right after the handshake.

use tokio::io::AsyncWrite;
use tracing::info;

use crate::connection::MessageWriter;
use crate::error::ClientError;
use crate::message::Message;

/// Character the payload is made of.
pub const PAYLOAD_BYTE: u8 = b'h';

/// A text payload of `len` repeated `'h'` characters.
#[must_use]
pub fn build_payload(len: usize) -> String {
    "h".repeat(len)
}

/// Build the payload and write it as one text message.
///
/// Returns the number of payload bytes written.
///
/// # Errors
///
/// Returns [`ClientError::Write`] if the connection rejects the message.
pub async fn send_payload<T: AsyncWrite>(
    writer: &MessageWriter<T>,
    len: usize,
) -> Result<usize, ClientError> {
    let message = Message::Text(build_payload(len));
    let n = message.len();
    writer.send(message).await.map_err(ClientError::Write)?;
    info!("send: {n} bytes");
    Ok(n)
}
