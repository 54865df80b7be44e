//! econn-demo — wires `econn`'s `Transport`/`Timer` traits to a real
//! WebSocket so the signaling engine can be driven against actual I/O.
//!
//! This binary is a demonstration harness, not a signaling server: it
//! dials one peer, drives a single `Connection` from stdin-triggered
//! commands, and logs every callback. See the `server`/`ws.rs` handler
//! this crate is modeled on for how a real multi-connection service would
//! route inbound frames to the right `Connection` by session id.

mod ws_transport;

use std::env;
use std::time::Duration;

use econn::{Callbacks, Config, Connection, EconnError, Props, TokioTimer};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{error, info, warn};

use ws_transport::WsTransport;

/// Logs every callback rather than doing anything with the payloads —
/// this binary exists to exercise the wire path, not to run a call.
struct LoggingCallbacks;

impl Callbacks for LoggingCallbacks {
    fn on_connect(
        &mut self,
        time: i64,
        user_id_sender: &str,
        client_id_sender: &str,
        age: i64,
        sdp: &str,
        props: Option<&Props>,
    ) {
        info!(time, user_id_sender, client_id_sender, age, sdp, ?props, "on_connect");
    }

    fn on_answer(&mut self, is_from_conflict: bool, sdp: &str, props: Option<&Props>) {
        info!(is_from_conflict, sdp, ?props, "on_answer");
    }

    fn on_update_req(
        &mut self,
        user_id_sender: &str,
        client_id_sender: &str,
        sdp: &str,
        props: Option<&Props>,
        should_reset: bool,
    ) {
        info!(user_id_sender, client_id_sender, sdp, ?props, should_reset, "on_update_req");
    }

    fn on_update_resp(&mut self, sdp: &str, props: Option<&Props>) {
        info!(sdp, ?props, "on_update_resp");
    }

    fn on_close(&mut self, err: Option<&EconnError>) {
        match err {
            Some(e) => warn!(error = %e, "on_close"),
            None => info!("on_close (clean)"),
        }
    }
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_target(true)
        .init();

    let url = env::args().nth(1).unwrap_or_else(|| "ws://127.0.0.1:9000/ws".into());
    let user_id = env::var("ECONN_USER_ID").unwrap_or_else(|_| "demo-user".into());
    let client_id = env::var("ECONN_CLIENT_ID").unwrap_or_else(|_| "demo-client".into());
    // This demo dials exactly one fixed peer — a real embedding would learn
    // the sender's identity from whatever routed the frame here; the core
    // itself does no peer authentication (see econn::Connection::recv).
    let peer_user_id = env::var("ECONN_PEER_USER_ID").unwrap_or_else(|_| "peer-user".into());
    let peer_client_id = env::var("ECONN_PEER_CLIENT_ID").unwrap_or_else(|_| "peer-client".into());

    info!(url, user_id, client_id, peer_user_id, peer_client_id, "connecting");

    let (transport, mut ws_reader) = match ws_transport::connect(&url).await {
        Ok(t) => t,
        Err(e) => {
            error!(error = %e, "failed to connect, exiting");
            return;
        }
    };

    let config = Config::from_env();
    let (timer, mut timer_feed) = TokioTimer::new();
    let mut conn = Connection::new(user_id, client_id, config, timer, transport, LoggingCallbacks);

    info!("type 'start <sdp>' to place a call, 'hangup' to end it, or 'quit'");
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    // `ws_reader` and `timer_feed` are owned here, separately from `conn`
    // (which only holds the write-side `WsTransport` and the timer-arming
    // `TokioTimer`), so the two branches below never hold two simultaneous
    // `&mut conn` borrows inside `select!`.
    loop {
        tokio::select! {
            line = lines.next_line() => {
                match line {
                    Ok(Some(line)) => {
                        if !handle_command(&mut conn, &line) {
                            break;
                        }
                    }
                    _ => break,
                }
            }
            incoming = ws_transport::recv_frame(&mut ws_reader) => {
                match incoming {
                    Some(bytes) => {
                        let now = now_ms();
                        if let Err(e) = conn.recv(&peer_user_id, &peer_client_id, now, now, &bytes) {
                            warn!(error = %e, "dropping malformed inbound frame");
                        }
                    }
                    None => {
                        info!("peer closed the socket");
                        break;
                    }
                }
            }
            Some(token) = timer_feed.fired() => {
                conn.on_timer(token);
                if conn.is_closed() {
                    break;
                }
            }
        }
    }
}

fn handle_command(conn: &mut Connection<TokioTimer, WsTransport, LoggingCallbacks>, line: &str) -> bool {
    let mut parts = line.trim().splitn(2, ' ');
    match parts.next().unwrap_or("") {
        "start" => {
            let sdp = parts.next().unwrap_or("v=0 demo-sdp");
            if let Err(e) = conn.start(sdp, None) {
                warn!(error = %e, "start() failed");
            }
        }
        "hangup" | "end" => conn.end(),
        "quit" | "exit" => return false,
        "" => {}
        other => warn!(command = other, "unrecognized command"),
    }
    true
}

fn now_ms() -> i64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or(Duration::ZERO)
        .as_millis() as i64
}
