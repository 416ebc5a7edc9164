//! The two message pumps: peer to output, and input to peer.
//!
//! Neither pump knows about the other.
//! Each borrows only its own half of the connection.

use futures::{Sink, SinkExt, Stream, StreamExt};
use log::{debug, trace, warn};
use tokio::io::{
    AsyncBufReadExt, AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufReader,
};
use tokio_tungstenite::tungstenite::{self, protocol::frame::coding::CloseCode, Message};

use crate::{error::Error, session::Ending};

/// Longest input line forwarded to the peer.
///
/// Input stops at the first longer line.
pub const MAX_LINE_LENGTH: usize = 64 * 1024;

/// Print messages from `stream` to `output`, one line each, in the order received.
///
/// Finishes cleanly when the peer sends a normal closure,
/// or after the first message if `one_only` is set.
/// Every other way the stream can end is an error.
pub async fn inbound<S, W>(stream: &mut S, output: &mut W, one_only: bool) -> Result<Ending, Error>
where
    S: Stream<Item = Result<Message, tungstenite::Error>> + Unpin,
    W: AsyncWrite + Unpin,
{
    loop {
        let line = match stream.next().await {
            Some(Ok(Message::Text(text))) => text,
            Some(Ok(Message::Binary(data))) => String::from_utf8_lossy(&data).into_owned(),
            Some(Ok(Message::Close(Some(frame)))) if frame.code == CloseCode::Normal => {
                debug!("Peer closed the connection normally");
                return Ok(Ending::Closed);
            }
            Some(Ok(Message::Close(frame))) => return Err(Error::UnexpectedClose(frame)),
            Some(Ok(other)) => {
                trace!("Ignoring control message {:?}", other);
                continue;
            }
            Some(Err(e)) => return Err(Error::Read(e)),
            None => return Err(Error::UnexpectedClose(None)),
        };

        output.write_all(line.as_bytes()).await?;
        output.write_all(b"\n").await?;
        output.flush().await?;

        if one_only {
            debug!("Received the one message requested");
            return Ok(Ending::OneMessage);
        }
    }
}

/// Send each line of `input` to the peer as a text message.
///
/// Lines end at `\n`, with any trailing `\r` dropped,
/// and bytes that aren't UTF-8 are replaced rather than rejected.
/// Returns at end of input, on a bad read, on an overlong line,
/// or once the peer stops accepting messages.
/// None of these end the session by themselves.
pub async fn outbound<R, S>(input: R, sink: &mut S)
where
    R: AsyncRead + Unpin,
    S: Sink<Message, Error = tungstenite::Error> + Unpin,
{
    let mut input = BufReader::new(input);
    let mut buf = Vec::new();
    // one extra byte to tell a full-length line from an overlong one
    let limit = MAX_LINE_LENGTH as u64 + 1;

    loop {
        buf.clear();
        match (&mut input).take(limit).read_until(b'\n', &mut buf).await {
            Ok(0) => break,
            Ok(_) => {}
            Err(e) => {
                warn!("Stopped reading input: {}", e);
                return;
            }
        }

        if buf.last() == Some(&b'\n') {
            buf.pop();
            if buf.last() == Some(&b'\r') {
                buf.pop();
            }
        } else if buf.len() > MAX_LINE_LENGTH {
            warn!("Stopped reading input: line longer than {} bytes", MAX_LINE_LENGTH);
            return;
        }

        let line = String::from_utf8_lossy(&buf).into_owned();
        trace!("Sending {:?}", line);
        if let Err(e) = sink.send(Message::Text(line)).await {
            // the coordinator is already tearing the connection down
            debug!("Stopped sending input: {}", e);
            return;
        }
    }

    debug!("Reached end of input");
}
