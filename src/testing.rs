//! Scripted WebSocket peers for tests.
//!
//! Each peer is a [`warp`] server on an ephemeral local port
//! which runs a script against every connection it accepts.

use std::{
    future::Future,
    net::{SocketAddr, TcpListener},
    pin::Pin,
    task::{Context, Poll},
    time::Duration,
};

use futures::{sink, Sink, SinkExt, Stream, StreamExt};
use tokio_tungstenite::tungstenite::{self, http::Uri, Message};
use warp::{http::HeaderMap, ws::WebSocket, Filter};

use crate::config::Config;

/// Start a peer running `script` on each upgraded connection.
///
/// The script also gets the handshake request headers.
pub fn spawn_peer<F, Fut>(script: F) -> SocketAddr
where
    F: Fn(WebSocket, HeaderMap) -> Fut + Clone + Send + Sync + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    let route = warp::ws()
        .and(warp::header::headers_cloned())
        .map(move |ws: warp::ws::Ws, headers: HeaderMap| {
            let script = script.clone();
            ws.on_upgrade(move |socket| script(socket, headers))
        });

    let (addr, server) = warp::serve(route).bind_ephemeral(([127, 0, 0, 1], 0));
    tokio::spawn(server);
    addr
}

/// An address nothing is listening on.
pub fn closed_addr() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").expect("Couldn't bind to address");
    listener.local_addr().expect("No local address")
}

pub fn endpoint_for(addr: SocketAddr) -> Uri {
    format!("ws://{}/", addr).parse().expect("Bad endpoint")
}

/// A plain configuration for talking to `addr`.
pub fn config_for(addr: SocketAddr) -> Config {
    let no_headers: [&str; 0] = [];
    Config::new(endpoint_for(addr), &no_headers, false, Duration::from_secs(1))
        .expect("Bad configuration")
}

/// What a peer saw from the client.
#[derive(Debug, Default)]
pub struct Received {
    /// Text payloads, in order.
    pub texts: Vec<String>,
    /// Close frames as `(code, reason)`; no status is recorded as 1005.
    pub closes: Vec<(u16, String)>,
}

/// Read from the client until the connection ends.
pub async fn collect(socket: &mut WebSocket) -> Received {
    let mut received = Received::default();

    while let Some(Ok(msg)) = socket.next().await {
        if let Some((code, reason)) = msg.close_frame() {
            received.closes.push((code, reason.to_owned()));
        } else if msg.is_close() {
            received.closes.push((1005, String::new()));
        } else if let Ok(text) = msg.to_str() {
            received.texts.push(text.to_owned());
        }
    }

    received
}

/// A sink whose every send fails with `err()`.
pub fn failing_sink(
    err: fn() -> tungstenite::Error,
) -> impl Sink<Message, Error = tungstenite::Error> + Unpin {
    Box::pin(sink::unfold((), move |(), _: Message| async move { Err(err()) }))
}

/// Glues an arbitrary stream and sink into one duplex value.
pub struct Joined<St, Si> {
    pub stream: St,
    pub sink: Si,
}

impl<St: Stream + Unpin, Si: Unpin> Stream for Joined<St, Si> {
    type Item = St::Item;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.stream.poll_next_unpin(cx)
    }
}

impl<St: Unpin, Si: Sink<Message> + Unpin> Sink<Message> for Joined<St, Si> {
    type Error = Si::Error;

    fn poll_ready(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.sink.poll_ready_unpin(cx)
    }

    fn start_send(mut self: Pin<&mut Self>, item: Message) -> Result<(), Self::Error> {
        self.sink.start_send_unpin(item)
    }

    fn poll_flush(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.sink.poll_flush_unpin(cx)
    }

    fn poll_close(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.sink.poll_close_unpin(cx)
    }
}
