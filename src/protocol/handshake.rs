//! Client side of the WebSocket opening handshake (RFC 6455 Section 4.1).
//!
//! The client sends an HTTP/1.1 `GET` with `Upgrade: websocket` and a random
//! `Sec-WebSocket-Key`; the server must answer `101 Switching Protocols`
//! with the matching `Sec-WebSocket-Accept`.

use std::collections::HashMap;

use base64::{Engine as _, engine::general_purpose::STANDARD as BASE64};
use sha1::{Digest, Sha1};

use crate::endpoint::Endpoint;
use crate::error::{Error, Result};

/// The WebSocket GUID used in the Sec-WebSocket-Accept calculation (RFC 6455).
pub const WS_GUID: &str = "258EAFA5-E914-47DA-95CA-C5AB0DC85B11";

/// End of an HTTP message head.
const HEAD_TERMINATOR: &[u8] = b"\r\n\r\n";

/// Parse header lines into a map keyed by lowercase name.
fn parse_headers<'a, I>(lines: I) -> HashMap<String, String>
where
    I: Iterator<Item = &'a str>,
{
    let mut headers = HashMap::new();
    for line in lines {
        if line.is_empty() {
            break;
        }
        if let Some((name, value)) = line.split_once(':') {
            headers.insert(name.trim().to_lowercase(), value.trim().to_string());
        }
    }
    headers
}

fn validate_header_value(header_name: &str, value: &str) -> Result<()> {
    if value.contains('\r') || value.contains('\n') {
        return Err(Error::InvalidHandshake(format!(
            "{header_name} contains CR or LF characters"
        )));
    }
    Ok(())
}

/// Computes the Sec-WebSocket-Accept value from the client's Sec-WebSocket-Key.
///
/// The accept key is calculated as: Base64(SHA-1(key + GUID))
///
/// ```
/// use wsburst::protocol::handshake::compute_accept_key;
///
/// let accept = compute_accept_key("dGhlIHNhbXBsZSBub25jZQ==");
/// assert_eq!(accept, "s3pPLMBiTxaQ9kYGzzhZRbK+xOo=");
/// ```
pub fn compute_accept_key(key: &str) -> String {
    let mut hasher = Sha1::new();
    hasher.update(key.as_bytes());
    hasher.update(WS_GUID.as_bytes());
    BASE64.encode(hasher.finalize())
}

/// A fresh Sec-WebSocket-Key: 16 random bytes, base64 encoded.
///
/// # Errors
///
/// Returns `Error::Io` if the OS random source is unavailable.
pub fn generate_key() -> Result<String> {
    let mut nonce = [0u8; 16];
    getrandom::getrandom(&mut nonce).map_err(|e| Error::Io(e.to_string()))?;
    Ok(BASE64.encode(nonce))
}

/// Offset just past the blank line ending an HTTP head, if present.
#[must_use]
pub fn find_head_end(buf: &[u8]) -> Option<usize> {
    buf.windows(HEAD_TERMINATOR.len())
        .position(|w| w == HEAD_TERMINATOR)
        .map(|pos| pos + HEAD_TERMINATOR.len())
}

/// The upgrade request sent by the client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandshakeRequest {
    /// Request target, e.g. `/ws`.
    pub target: String,
    /// Host header value.
    pub host: String,
    /// Sec-WebSocket-Key header value.
    pub key: String,
}

impl HandshakeRequest {
    /// Build a request for `endpoint` with a freshly generated key.
    ///
    /// # Errors
    ///
    /// Returns `Error::Io` if no key could be generated.
    pub fn new(endpoint: &Endpoint) -> Result<Self> {
        Ok(Self::with_key(endpoint, generate_key()?))
    }

    /// Build a request for `endpoint` with a caller-chosen key.
    #[must_use]
    pub fn with_key(endpoint: &Endpoint, key: impl Into<String>) -> Self {
        Self {
            target: endpoint.request_target(),
            host: endpoint.host().to_string(),
            key: key.into(),
        }
    }

    /// Write the HTTP request to a buffer.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidHandshake` if the target or host contain CR/LF.
    pub fn write(&self, buf: &mut Vec<u8>) -> Result<()> {
        validate_header_value("Request target", &self.target)?;
        validate_header_value("Host", &self.host)?;

        buf.extend_from_slice(format!("GET {} HTTP/1.1\r\n", self.target).as_bytes());
        buf.extend_from_slice(format!("Host: {}\r\n", self.host).as_bytes());
        buf.extend_from_slice(b"Upgrade: websocket\r\n");
        buf.extend_from_slice(b"Connection: Upgrade\r\n");
        buf.extend_from_slice(format!("Sec-WebSocket-Key: {}\r\n", self.key).as_bytes());
        buf.extend_from_slice(b"Sec-WebSocket-Version: 13\r\n");
        buf.extend_from_slice(b"\r\n");
        Ok(())
    }

    /// The accept value a conforming server must return.
    #[must_use]
    pub fn expected_accept(&self) -> String {
        compute_accept_key(&self.key)
    }
}

/// WebSocket handshake response from server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandshakeResponse {
    /// The Sec-WebSocket-Accept value.
    pub accept: String,
    /// The selected Sec-WebSocket-Protocol, if any.
    pub protocol: Option<String>,
    /// The negotiated Sec-WebSocket-Extensions.
    pub extensions: Vec<String>,
}

impl HandshakeResponse {
    /// Parse a WebSocket handshake response head.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidHandshake`] if:
    /// - The data is not valid UTF-8.
    /// - The status is not `101`.
    /// - `Upgrade`, `Connection` or `Sec-WebSocket-Accept` are missing or wrong.
    pub fn parse(data: &[u8]) -> Result<Self> {
        let text = std::str::from_utf8(data)
            .map_err(|_| Error::InvalidHandshake("Invalid UTF-8".into()))?;
        let mut lines = text.lines();

        let status_line = lines
            .next()
            .ok_or_else(|| Error::InvalidHandshake("Empty response".into()))?;
        if !status_line.starts_with("HTTP/1.1 101") {
            return Err(Error::InvalidHandshake(format!(
                "Expected 101 status, got: {}",
                status_line
            )));
        }

        let headers = parse_headers(lines);

        let upgrade = headers
            .get("upgrade")
            .ok_or_else(|| Error::InvalidHandshake("Missing Upgrade header in response".into()))?;
        if !upgrade.eq_ignore_ascii_case("websocket") {
            return Err(Error::InvalidHandshake(format!(
                "Invalid Upgrade header: {}",
                upgrade
            )));
        }

        let connection = headers.get("connection").ok_or_else(|| {
            Error::InvalidHandshake("Missing Connection header in response".into())
        })?;
        if !connection.to_lowercase().contains("upgrade") {
            return Err(Error::InvalidHandshake(format!(
                "Invalid Connection header: {}",
                connection
            )));
        }

        let accept = headers
            .get("sec-websocket-accept")
            .ok_or_else(|| Error::InvalidHandshake("Missing Sec-WebSocket-Accept header".into()))?
            .clone();

        let protocol = headers.get("sec-websocket-protocol").cloned();
        let extensions = headers
            .get("sec-websocket-extensions")
            .map(|e| e.split(',').map(|s| s.trim().to_string()).collect())
            .unwrap_or_default();

        Ok(Self {
            accept,
            protocol,
            extensions,
        })
    }

    /// Check this response against the request that produced it.
    ///
    /// The client offers no subprotocols or extensions, so a server that
    /// selects one is rejected.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidHandshake`] on an accept mismatch or an
    /// unrequested protocol or extension.
    pub fn verify(&self, request: &HandshakeRequest) -> Result<()> {
        if self.accept != request.expected_accept() {
            return Err(Error::InvalidHandshake(
                "Sec-WebSocket-Accept does not match key".into(),
            ));
        }
        if let Some(protocol) = &self.protocol {
            return Err(Error::InvalidHandshake(format!(
                "Unrequested subprotocol: {protocol}"
            )));
        }
        if let Some(extension) = self.extensions.first() {
            return Err(Error::InvalidHandshake(format!(
                "Unrequested extension: {extension}"
            )));
        }
        Ok(())
    }
}
