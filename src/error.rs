//! Errors that end a bridging session.
//!
//! Every variant is fatal: the binary reports it on standard error
//! and exits with a non-zero status. Nothing is retried.

use std::{fmt, io};

use tokio_tungstenite::tungstenite::{self, protocol::CloseFrame};

/// Error type shared by the connection, the pumps and the coordinator.
#[derive(Debug)]
pub enum Error {
    /// A `-H` value was not a single `name:value` pair.
    InvalidHeader(String),
    /// The WebSocket handshake with `endpoint` failed.
    Connect {
        endpoint: String,
        source: tungstenite::Error,
    },
    /// The transport failed while receiving.
    Read(tungstenite::Error),
    /// The peer closed with anything other than a normal closure.
    ///
    /// `None` means no status code was given,
    /// or the stream ended without a close frame at all.
    UnexpectedClose(Option<CloseFrame<'static>>),
    /// Sending the local close notification failed.
    Close(tungstenite::Error),
    /// Writing a received message to the output failed.
    Output(io::Error),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::InvalidHeader(ref raw) => write!(f, "invalid header format: {}", raw),
            Error::Connect { ref endpoint, .. } => write!(f, "failed to connect to {:?}", endpoint),
            Error::Read(ref err) => write!(f, "unexpected read error: {}", err),
            Error::UnexpectedClose(Some(ref frame)) if frame.reason.is_empty() => {
                write!(f, "unexpected close: code {}", u16::from(frame.code))
            }
            Error::UnexpectedClose(Some(ref frame)) => write!(
                f,
                "unexpected close: code {} ({})",
                u16::from(frame.code),
                frame.reason
            ),
            Error::UnexpectedClose(None) => write!(f, "unexpected close: no status code"),
            Error::Close(ref err) => write!(f, "unexpected close error: {}", err),
            Error::Output(ref err) => write!(f, "could not write message: {}", err),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Connect { ref source, .. } => Some(source),
            Error::Read(ref err) | Error::Close(ref err) => Some(err),
            Error::Output(ref err) => Some(err),
            Error::InvalidHeader(_) | Error::UnexpectedClose(_) => None,
        }
    }
}

impl From<io::Error> for Error {
    fn from(err: io::Error) -> Self {
        Self::Output(err)
    }
}
