//! Run configuration, fixed before the connection is made.

use std::time::Duration;

use log::trace;
use tokio_tungstenite::tungstenite::http::{HeaderMap, HeaderName, HeaderValue, Uri};

use crate::error::Error;

/// Everything a session needs to know, built once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    /// The WebSocket endpoint to dial.
    pub endpoint: Uri,
    /// Extra headers sent with the handshake request, in flag order.
    pub headers: HeaderMap,
    /// Stop after the first inbound message.
    pub one_only: bool,
    /// How long to wait for the peer to acknowledge our close.
    ///
    /// Zero sends the close and leaves immediately.
    pub close_timeout: Duration,
}

impl Config {
    /// Create a configuration, parsing each raw `name:value` header.
    ///
    /// Fails on the first malformed header;
    /// nothing is dialed until this succeeds.
    pub fn new<S: AsRef<str>>(
        endpoint: Uri,
        raw_headers: &[S],
        one_only: bool,
        close_timeout: Duration,
    ) -> Result<Self, Error> {
        let mut headers = HeaderMap::new();
        for raw in raw_headers {
            let (name, value) = parse_header(raw.as_ref())?;
            trace!("Adding header {}: {:?}", name, value);
            headers.append(name, value);
        }

        Ok(Self {
            endpoint,
            headers,
            one_only,
            close_timeout,
        })
    }
}

/// Parse a single `name:value` header flag.
///
/// There must be exactly one `:`.
/// Whitespace around the name and value is ignored.
pub fn parse_header(raw: &str) -> Result<(HeaderName, HeaderValue), Error> {
    let invalid = || Error::InvalidHeader(raw.to_owned());

    let mut bits = raw.split(':');
    let (name, value) = match (bits.next(), bits.next(), bits.next()) {
        (Some(name), Some(value), None) => (name.trim(), value.trim()),
        _ => return Err(invalid()),
    };

    let name = HeaderName::from_bytes(name.as_bytes()).map_err(|_| invalid())?;
    let value = HeaderValue::from_str(value).map_err(|_| invalid())?;
    Ok((name, value))
}
