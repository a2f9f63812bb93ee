//! Control host address.
//!
//! The host serves the controlling page over HTTP and accepts WebSocket
//! connections on a separate port. A page learns that port from its own
//! `?port=` query parameter, falling back to [`DEFAULT_PORT`].

// ============================================================================
// Imports
// ============================================================================

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{Error, Result};

// ============================================================================
// Constants
// ============================================================================

/// WebSocket port the control host listens on unless told otherwise.
pub const DEFAULT_PORT: u16 = 49152;

/// Query parameter carrying a non-default WebSocket port.
const PORT_PARAM: &str = "port";

// ============================================================================
// Endpoint
// ============================================================================

/// WebSocket address of a control host.
///
/// # Example
///
/// ```ignore
/// use hostlink::transport::Endpoint;
///
/// let endpoint = Endpoint::from_page_url("http://192.168.1.20:8080/?port=50000")?;
/// assert_eq!(endpoint.ws_url(), "ws://192.168.1.20:50000");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Endpoint {
    /// Host name or IP address.
    pub host: String,
    /// WebSocket port.
    pub port: u16,
}

impl Endpoint {
    /// Creates an endpoint.
    #[inline]
    #[must_use]
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }

    /// Returns `127.0.0.1` on the default port.
    #[inline]
    #[must_use]
    pub fn localhost() -> Self {
        Self::new("127.0.0.1", DEFAULT_PORT)
    }

    /// Resolves the endpoint for a page served by the control host.
    ///
    /// The host is the page's host; the port comes from the `port` query
    /// parameter or defaults to [`DEFAULT_PORT`].
    ///
    /// # Errors
    ///
    /// - [`Error::Url`] if `page_url` does not parse
    /// - [`Error::Config`] if the URL has no host
    /// - [`Error::InvalidArgument`] if the `port` parameter is not a port number
    pub fn from_page_url(page_url: &str) -> Result<Self> {
        let url = Url::parse(page_url)?;

        let host = url
            .host_str()
            .ok_or_else(|| Error::config(format!("page URL has no host: {page_url}")))?
            .trim_start_matches('[')
            .trim_end_matches(']')
            .to_string();

        let port = match url.query_pairs().find(|(key, _)| *key == PORT_PARAM) {
            Some((_, value)) => value.parse::<u16>().map_err(|_| {
                Error::invalid_argument(format!("invalid port parameter: {value}"))
            })?,
            None => DEFAULT_PORT,
        };

        Ok(Self { host, port })
    }

    /// Returns the WebSocket URL.
    ///
    /// Format: `ws://{host}:{port}`
    #[must_use]
    pub fn ws_url(&self) -> String {
        if self.host.contains(':') {
            format!("ws://[{}]:{}", self.host, self.port)
        } else {
            format!("ws://{}:{}", self.host, self.port)
        }
    }
}

impl Default for Endpoint {
    fn default() -> Self {
        Self::localhost()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_localhost_default() {
        let endpoint = Endpoint::default();
        assert_eq!(endpoint.ws_url(), "ws://127.0.0.1:49152");
    }

    #[test]
    fn test_page_url_without_port_param() {
        let endpoint = Endpoint::from_page_url("http://studio.local:8080/index.html").expect("valid");
        assert_eq!(endpoint, Endpoint::new("studio.local", DEFAULT_PORT));
    }

    #[test]
    fn test_page_url_with_port_param() {
        let endpoint =
            Endpoint::from_page_url("http://192.168.1.20:8080/?theme=dark&port=50000").expect("valid");
        assert_eq!(endpoint.ws_url(), "ws://192.168.1.20:50000");
    }

    #[test]
    fn test_page_url_ipv6() {
        let endpoint = Endpoint::from_page_url("http://[::1]:8080/?port=1234").expect("valid");
        assert_eq!(endpoint.host, "::1");
        assert_eq!(endpoint.ws_url(), "ws://[::1]:1234");
    }

    #[test]
    fn test_page_url_invalid_port() {
        let err = Endpoint::from_page_url("http://localhost/?port=99999").unwrap_err();
        assert!(matches!(err, Error::InvalidArgument { .. }));
    }

    #[test]
    fn test_page_url_without_host() {
        let err = Endpoint::from_page_url("data:text/plain,hello").unwrap_err();
        assert!(matches!(err, Error::Config { .. }));
    }

    #[test]
    fn test_page_url_unparsable() {
        let err = Endpoint::from_page_url("not a url").unwrap_err();
        assert!(matches!(err, Error::Url(_)));
    }

    #[test]
    fn test_serde() {
        let endpoint = Endpoint::new("10.0.0.2", 4000);
        let json = serde_json::to_string(&endpoint).expect("serialize");
        assert_eq!(json, r#"{"host":"10.0.0.2","port":4000}"#);

        let back: Endpoint = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(back, endpoint);
    }
}
