//! Remote endpoint identification.

use std::fmt;
use std::str::FromStr;

use url::{Host, Url};

use crate::error::{Error, Result};

/// URL scheme of a WebSocket endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Scheme {
    /// Plain `ws://`.
    Ws,
    /// TLS `wss://`. Representable, but the connector refuses it.
    Wss,
}

impl Scheme {
    /// The scheme as it appears in a URL.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Scheme::Ws => "ws",
            Scheme::Wss => "wss",
        }
    }

    /// Port used when the host carries none.
    #[must_use]
    pub const fn default_port(self) -> u16 {
        match self {
            Scheme::Ws => 80,
            Scheme::Wss => 443,
        }
    }
}

impl fmt::Display for Scheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A scheme/host/path triple naming a WebSocket server.
///
/// `host` is the URL authority and may carry a port (`"127.0.0.1:8500"`).
/// An endpoint is immutable once built.
///
/// ```
/// use wsburst::{Endpoint, Scheme};
///
/// let endpoint = Endpoint::new(Scheme::Ws, "127.0.0.1:8500", "/ws");
/// assert_eq!(endpoint.to_string(), "ws://127.0.0.1:8500/ws");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Endpoint {
    scheme: Scheme,
    host: String,
    path: String,
}

impl Endpoint {
    /// Build an endpoint from its parts.
    #[must_use]
    pub fn new(scheme: Scheme, host: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            scheme,
            host: host.into(),
            path: path.into(),
        }
    }

    /// Shorthand for a plain `ws://` endpoint.
    #[must_use]
    pub fn ws(host: impl Into<String>, path: impl Into<String>) -> Self {
        Self::new(Scheme::Ws, host, path)
    }

    #[must_use]
    pub fn scheme(&self) -> Scheme {
        self.scheme
    }

    /// The authority, port included when one was given.
    #[must_use]
    pub fn host(&self) -> &str {
        &self.host
    }

    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Request target for the upgrade request line.
    #[must_use]
    pub fn request_target(&self) -> String {
        if self.path.starts_with('/') {
            self.path.clone()
        } else {
            format!("/{}", self.path)
        }
    }

    /// Host and port to open the TCP connection to.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidEndpoint`] if the authority does not parse or
    /// carries no host.
    pub fn socket_target(&self) -> Result<(String, u16)> {
        let url = Url::parse(&self.to_string())?;
        let host = match url.host() {
            Some(Host::Domain(domain)) => domain.to_owned(),
            Some(Host::Ipv4(addr)) => addr.to_string(),
            Some(Host::Ipv6(addr)) => addr.to_string(),
            None => return Err(Error::InvalidEndpoint(format!("{self}: missing host"))),
        };
        let port = url
            .port_or_known_default()
            .unwrap_or_else(|| self.scheme.default_port());
        Ok((host, port))
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}://{}{}", self.scheme, self.host, self.request_target())
    }
}

impl FromStr for Endpoint {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let url = Url::parse(s)?;
        let scheme = match url.scheme() {
            "ws" => Scheme::Ws,
            "wss" => Scheme::Wss,
            other => return Err(Error::UnsupportedScheme(other.to_owned())),
        };
        let host = url
            .host_str()
            .ok_or_else(|| Error::InvalidEndpoint(format!("{s}: missing host")))?;
        let host = match url.port() {
            Some(port) => format!("{host}:{port}"),
            None => host.to_owned(),
        };
        let path = match url.query() {
            Some(query) => format!("{}?{}", url.path(), query),
            None => url.path().to_owned(),
        };
        Ok(Self::new(scheme, host, path))
    }
}
