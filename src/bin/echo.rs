//! A WebSocket echo server to try `wsbridge` against.
//!
//! Every text or binary message is sent straight back,
//! and closes are answered as usual.

use std::net::SocketAddr;

use futures::{SinkExt, StreamExt};
use log::{debug, info, warn};
use structopt::StructOpt;
use tokio::signal;
use warp::{ws::WebSocket, Filter};

/// Echo WebSocket messages back to whoever sent them.
#[derive(Debug, StructOpt)]
#[structopt(name = "echo", version_short = "v")]
struct Opts {
    /// Address to listen on.
    #[structopt(short, long, default_value = "127.0.0.1:49999", value_name = "ADDRESS")]
    addr: SocketAddr,
}

#[tokio::main]
async fn main() {
    env_logger::Builder::new()
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .init();

    let Opts { addr } = Opts::from_args();

    let echo = warp::ws()
        .and(warp::addr::remote())
        .map(|ws: warp::ws::Ws, remote: Option<SocketAddr>| {
            ws.on_upgrade(move |socket| async move {
                info!("Echoing for {:?}", remote);
                echo(socket).await;
                info!("Finished with {:?}", remote);
            })
        });

    let (addr, server) = warp::serve(echo).bind_with_graceful_shutdown(addr, async {
        let _ = signal::ctrl_c().await;
        debug!("Echo server shutting down");
    });
    info!("Listening on ws://{}", addr);

    server.await;
}

/// Send back everything received on `socket` until it closes.
async fn echo(socket: WebSocket) {
    let (mut sink, mut stream) = socket.split();

    while let Some(msg) = stream.next().await {
        let msg = match msg {
            Ok(msg) => msg,
            Err(e) => {
                warn!("Read error: {}", e);
                break;
            }
        };

        if msg.is_close() {
            debug!("Peer closed: {:?}", msg.close_frame());
            break;
        }
        if !(msg.is_text() || msg.is_binary()) {
            continue;
        }

        if let Err(e) = sink.send(msg).await {
            warn!("Write error: {}", e);
            break;
        }
    }

    // flushes our reply to the peer's close
    let _ = sink.close().await;
}
