//! Runs one bridging session from connection to release.
//!
//! A session goes through three phases:
//!
//! - **Running**: both pumps are active, and we wait for the inbound pump
//!   to finish or for an interrupt, whichever comes first.
//! - **Closing**: we send a single normal-closure notification
//!   and give the peer a bounded time to acknowledge it.
//! - **Done**: the connection is released.
//!
//! Peer-initiated closes and errors skip straight from Running to Done.
//! An interrupt, or the one message of single-message mode, goes through Closing.

use std::time::Duration;

use futures::{Future, Sink, Stream};
use log::{debug, info};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio_tungstenite::tungstenite::{self, Message};

use crate::{config::Config, connection::Connection, error::Error, pump};

/// Why a session finished cleanly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ending {
    /// The peer closed the connection normally.
    Closed,
    /// Single-message mode got its message.
    OneMessage,
    /// The user asked us to stop.
    Interrupted,
}

/// Whatever ended the Running phase first.
#[derive(Debug)]
enum Trigger {
    Inbound(Result<Ending, Error>),
    Interrupt,
}

/// Bridge `socket` with `input` and `output` until the session ends.
///
/// Lines from `input` go to the peer, messages from the peer go to `output`.
/// Resolving `interrupt` starts a close handshake;
/// it is polled only while the session is running,
/// so it takes effect at most once.
///
/// The connection is released before this returns, whatever the outcome.
pub async fn run<S, R, W, I>(
    socket: S,
    input: R,
    mut output: W,
    config: &Config,
    interrupt: I,
) -> Result<Ending, Error>
where
    S: Stream<Item = Result<Message, tungstenite::Error>> + Sink<Message, Error = tungstenite::Error>,
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
    I: Future<Output = ()>,
{
    let mut connection = Connection::new(socket);

    let trigger = running(&mut connection, input, &mut output, config.one_only, interrupt).await;
    debug!("Session stopped running: {:?}", trigger);

    let result = match trigger {
        Trigger::Interrupt => closing(&mut connection, config.close_timeout)
            .await
            .map(|()| Ending::Interrupted),
        Trigger::Inbound(Ok(Ending::OneMessage)) => closing(&mut connection, config.close_timeout)
            .await
            .map(|()| Ending::OneMessage),
        Trigger::Inbound(Ok(ending)) => {
            // answer the peer's close before letting go
            connection.flush_close(config.close_timeout).await;
            Ok(ending)
        }
        Trigger::Inbound(Err(e)) => Err(e),
    };

    drop(connection);
    result
}

/// Run both pumps until inbound finishes or `interrupt` resolves.
///
/// The outbound pump finishing on its own changes nothing.
/// Whatever is still running is dropped on return.
async fn running<S, R, W, I>(
    connection: &mut Connection<S>,
    input: R,
    output: &mut W,
    one_only: bool,
    interrupt: I,
) -> Trigger
where
    S: Stream<Item = Result<Message, tungstenite::Error>> + Sink<Message, Error = tungstenite::Error>,
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
    I: Future<Output = ()>,
{
    let inbound = pump::inbound(&mut connection.stream, output, one_only);
    let outbound = pump::outbound(input, &mut connection.sink);
    tokio::pin!(inbound, outbound, interrupt);

    let mut outbound_done = false;
    loop {
        tokio::select! {
            result = &mut inbound => return Trigger::Inbound(result),
            () = &mut interrupt => {
                info!("Interrupt requested, closing connection");
                return Trigger::Interrupt;
            }
            () = &mut outbound, if !outbound_done => {
                debug!("Input finished, still listening to the peer");
                outbound_done = true;
            }
        }
    }
}

/// Start the close handshake and wait, within `timeout`, for it to finish.
async fn closing<S>(connection: &mut Connection<S>, timeout: Duration) -> Result<(), Error>
where
    S: Stream<Item = Result<Message, tungstenite::Error>> + Sink<Message, Error = tungstenite::Error>,
{
    connection.send_close().await?;
    connection.await_close_ack(timeout).await;
    Ok(())
}
