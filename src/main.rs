//! An interactive bridge between the terminal and a WebSocket server.
//!
//! Each line typed on standard input is sent to the server as a text message,
//! and every message from the server is printed on standard output
//! as a line of its own.
//! Pressing Ctrl-C closes the connection politely with a close handshake.
//!
//! ## Configuration
//!
//! Everything is given on the command line, as described by [`Opts`];
//! run `./wsbridge --help` for details.
//! The options are turned into a single [`config::Config`] before anything else happens,
//! so a malformed `--header` is reported without ever touching the network.
//!
//! ## Code layout
//!
//! [`connection`] dials the server and owns the connection while a session lasts.
//! [`pump`] holds the two loops that move messages in each direction,
//! and [`session`] runs them together and decides when and how the session ends.
//!
//! ## Logging
//!
//! Logs go to standard error through [`env_logger`],
//! so they never mix with received messages;
//! only warnings are shown unless `RUST_LOG` says otherwise.

#![allow(rustdoc::private_intra_doc_links)]

mod config;
mod connection;
mod error;
mod pump;
mod session;

#[cfg(test)]
mod testing;

use std::time::Duration;

use anyhow::{Context, Result};
use futures::future;
use log::{debug, warn};
use structopt::{clap::AppSettings, StructOpt};
use tokio::{io, runtime::Runtime, signal};
use tokio_tungstenite::tungstenite::http::Uri;

use config::Config;

/// Talk to a WebSocket server from the terminal.
///
/// Lines read from standard input are sent as text messages;
/// messages received are printed one per line.
/// Ctrl-C closes the connection.
#[derive(Debug, StructOpt)]
#[structopt(
    name = "wsbridge",
    version_short = "v",
    setting(AppSettings::UnifiedHelpMessage),
    setting(AppSettings::DeriveDisplayOrder)
)]
struct Opts {
    /// WebSocket URL to connect to, e.g. ws://127.0.0.1:49999/
    url: Uri,

    /// HTTP header to send with the handshake, as "Name:Value". May be repeated.
    #[structopt(short = "H", long = "header", value_name = "NAME:VALUE", number_of_values = 1)]
    headers: Vec<String>,

    /// Exit after the first message received.
    #[structopt(short = "1", long)]
    one: bool,

    /// How long to wait for the server to acknowledge a close; 0 exits straight away.
    #[structopt(
        short = "t",
        long,
        default_value = "1",
        value_name = "SECONDS",
        parse(try_from_str = parse_seconds)
    )]
    close_timeout: Duration,
}

fn main() -> Result<()> {
    env_logger::Builder::new()
        .filter_level(log::LevelFilter::Warn)
        .parse_default_env()
        .init();

    let Opts {
        url,
        headers,
        one,
        close_timeout,
    } = Opts::from_args();

    let config = Config::new(url, &headers, one, close_timeout)?;

    let runtime = Runtime::new().context("Could not start the async runtime")?;
    let result = runtime.block_on(bridge(&config));

    // standard input is read on a blocking thread that may never return
    runtime.shutdown_background();

    result
}

/// Connect and run a single session on the terminal's standard streams.
async fn bridge(config: &Config) -> Result<()> {
    let socket = connection::connect(config).await?;

    let ending = session::run(socket, io::stdin(), io::stdout(), config, interrupted()).await?;
    debug!("Session ended: {:?}", ending);

    Ok(())
}

/// Resolves on Ctrl-C.
///
/// Never resolves if interrupts can't be watched,
/// since that must not look like an interrupt.
async fn interrupted() {
    if let Err(e) = signal::ctrl_c().await {
        warn!("Could not listen for interrupts: {}", e);
        future::pending::<()>().await;
    }
}

/// Parse a non-negative, possibly fractional, number of seconds.
fn parse_seconds(raw: &str) -> std::result::Result<Duration, String> {
    let secs: f64 = raw.parse().map_err(|e| format!("{}: {}", raw, e))?;
    if secs.is_finite() && secs >= 0.0 && secs <= f64::from(u32::MAX) {
        Ok(Duration::from_secs_f64(secs))
    } else {
        Err(format!("{} is not a usable number of seconds", raw))
    }
}
