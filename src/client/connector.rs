//! Dialing an endpoint and performing the opening handshake.

use bytes::BytesMut;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time;
use tracing::{debug, info};

use crate::config::{Config, Limits};
use crate::connection::Connection;
use crate::endpoint::{Endpoint, Scheme};
use crate::error::{ClientError, Error, Result};
use crate::protocol::handshake::find_head_end;
use crate::protocol::{HandshakeRequest, HandshakeResponse};

/// Dial `endpoint` over TCP and upgrade the connection.
///
/// One attempt, bounded by `config.handshake_timeout`. Logs
/// `connecting to <endpoint>` first.
///
/// # Errors
///
/// Every failure (unsupported scheme, resolution, refusal, a rejected or
/// malformed upgrade, timeout) is returned as [`ClientError::Connect`].
pub async fn connect(
    endpoint: &Endpoint,
    config: &Config,
) -> std::result::Result<Connection<TcpStream>, ClientError> {
    info!("connecting to {endpoint}");
    let attempt = async {
        let stream = dial(endpoint).await?;
        handshake(stream, endpoint, config).await
    };
    let result = match time::timeout(config.handshake_timeout, attempt).await {
        Ok(result) => result,
        Err(_) => Err(Error::HandshakeTimeout(config.handshake_timeout)),
    };
    result.map_err(|source| ClientError::Connect {
        endpoint: endpoint.to_string(),
        source,
    })
}

async fn dial(endpoint: &Endpoint) -> Result<TcpStream> {
    if endpoint.scheme() != Scheme::Ws {
        return Err(Error::UnsupportedScheme(endpoint.scheme().to_string()));
    }
    let (host, port) = endpoint.socket_target()?;
    let stream = TcpStream::connect((host.as_str(), port)).await?;
    stream.set_nodelay(true)?;
    debug!(peer = ?stream.peer_addr().ok(), "tcp connected");
    Ok(stream)
}

/// Run the client handshake over an already connected stream.
///
/// # Errors
///
/// - `Error::InvalidHandshake` if the server does not upgrade correctly
/// - `Error::HandshakeTooLarge` if the response head exceeds the limit
/// - `Error::Io` on socket failure
pub async fn handshake<S>(mut stream: S, endpoint: &Endpoint, config: &Config) -> Result<Connection<S>>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let request = HandshakeRequest::new(endpoint)?;
    let mut buf = Vec::with_capacity(256);
    request.write(&mut buf)?;
    stream.write_all(&buf).await?;
    stream.flush().await?;

    let (head, leftover) = read_response_head(&mut stream, &config.limits).await?;
    HandshakeResponse::parse(&head)?.verify(&request)?;
    debug!(buffered = leftover.len(), "handshake complete");

    Ok(Connection::with_buffered(stream, leftover, config))
}

/// Read up to the end of the response head. Bytes past it belong to the
/// first frames and are returned separately.
async fn read_response_head<S>(stream: &mut S, limits: &Limits) -> Result<(BytesMut, BytesMut)>
where
    S: AsyncRead + Unpin,
{
    let mut head = BytesMut::with_capacity(1024);
    loop {
        if let Some(end) = find_head_end(&head) {
            limits.check_handshake_size(end)?;
            let leftover = head.split_off(end);
            return Ok((head, leftover));
        }
        limits.check_handshake_size(head.len())?;

        head.reserve(1024);
        if stream.read_buf(&mut head).await? == 0 {
            return Err(Error::InvalidHandshake(
                "connection closed during handshake".into(),
            ));
        }
    }
}
