//! Opening the WebSocket connection and owning it until the session ends.

use std::time::Duration;

use futures::{
    stream::{SplitSink, SplitStream},
    Sink, SinkExt, Stream, StreamExt,
};
use log::{debug, info, trace};
use tokio::{net::TcpStream, time};
use tokio_tungstenite::{
    connect_async,
    tungstenite::{
        self,
        client::IntoClientRequest,
        error::ProtocolError,
        protocol::{frame::coding::CloseCode, CloseFrame},
        Message,
    },
    MaybeTlsStream, WebSocketStream,
};

use crate::{config::Config, error::Error};

/// A live connection made by [`connect`].
pub type Socket = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Dial the configured endpoint, sending the configured headers with the handshake.
///
/// Any failure, from a bad URL to a rejected upgrade,
/// is reported as [`Error::Connect`].
pub async fn connect(config: &Config) -> Result<Socket, Error> {
    let endpoint = config.endpoint.to_string();
    let connect_error = |source: tungstenite::Error| Error::Connect {
        endpoint: endpoint.clone(),
        source,
    };

    let mut request = config
        .endpoint
        .clone()
        .into_client_request()
        .map_err(connect_error)?;
    request.headers_mut().extend(config.headers.clone());

    debug!("Connecting to {} with {} extra header(s)", endpoint, config.headers.len());
    let (socket, response) = connect_async(request).await.map_err(connect_error)?;
    info!("Connected to {} ({})", endpoint, response.status());

    Ok(socket)
}

/// Sole owner of a connection for the length of a session.
///
/// The read half goes to the inbound pump
/// and the write half to the outbound pump, each as a plain borrow.
/// Dropping this releases the connection.
pub struct Connection<S: Sink<Message>> {
    pub(crate) sink: SplitSink<S, Message>,
    pub(crate) stream: SplitStream<S>,
}

impl<S> Connection<S>
where
    S: Stream<Item = Result<Message, tungstenite::Error>> + Sink<Message, Error = tungstenite::Error>,
{
    /// Take ownership of `socket`.
    pub fn new(socket: S) -> Self {
        let (sink, stream) = socket.split();
        Self { sink, stream }
    }

    /// Send a normal-closure notification with an empty reason.
    ///
    /// Errors that only say the connection is already closing are not reported.
    pub async fn send_close(&mut self) -> Result<(), Error> {
        let frame = CloseFrame {
            code: CloseCode::Normal,
            reason: "".into(),
        };

        match self.sink.send(Message::Close(Some(frame))).await {
            Ok(()) => {
                debug!("Sent close notification");
                Ok(())
            }
            Err(tungstenite::Error::ConnectionClosed)
            | Err(tungstenite::Error::AlreadyClosed)
            | Err(tungstenite::Error::Protocol(ProtocolError::SendAfterClosing)) => {
                debug!("Connection was already closing");
                Ok(())
            }
            Err(e) => Err(Error::Close(e)),
        }
    }

    /// Wait up to `timeout` for the peer to answer our close.
    ///
    /// Payloads that arrive in the meantime are discarded.
    /// A zero `timeout` returns at once.
    pub async fn await_close_ack(&mut self, timeout: Duration) {
        if timeout.is_zero() {
            return;
        }

        let stream = &mut self.stream;
        let drain = async move {
            while let Some(msg) = stream.next().await {
                match msg {
                    Ok(Message::Close(frame)) => {
                        debug!("Peer acknowledged close: {:?}", frame);
                        return;
                    }
                    Ok(other) => trace!("Discarding {:?} while closing", other),
                    Err(e) => {
                        debug!("Connection ended while closing: {}", e);
                        return;
                    }
                }
            }
        };

        if time::timeout(timeout, drain).await.is_err() {
            debug!("No close acknowledgment within {:?}", timeout);
        }
    }

    /// Flush anything still queued, such as our reply to the peer's close.
    pub async fn flush_close(&mut self, timeout: Duration) {
        match time::timeout(timeout, self.sink.close()).await {
            Ok(Ok(())) => trace!("Connection flushed"),
            Ok(Err(e)) => debug!("Could not flush connection: {}", e),
            Err(_) => debug!("Timed out flushing connection"),
        }
    }
}

impl<S: Sink<Message>> Drop for Connection<S> {
    fn drop(&mut self) {
        debug!("Connection released");
    }
}
