//! econn — an end-to-end call signaling engine.
//!
//! Negotiates and tears down a peer-to-peer media/data session between two
//! (userId, clientId) endpoints: exchanges opaque SDP + properties,
//! resolves glare when both sides initiate simultaneously, and runs the
//! setup/termination timers. The actual transport (push channel, mailbox,
//! relay) and the media/data channel itself are external collaborators —
//! this crate only sees them through the [`Transport`] and
//! [`TokioTimer`]/[`Timer`] traits, and notifies the application through
//! [`Callbacks`].
//!
//! ```no_run
//! // `no_run`: `TokioTimer::start` spawns onto the tokio runtime, which
//! // this snippet doesn't bring up — see a real runtime entrypoint (e.g.
//! // `demo`'s `main`) for a version that actually drives `conn` to
//! // completion.
//! use econn::{Callbacks, Config, Connection, EconnError, Props, TokioTimer};
//! use econn::transport::LoopbackTransport;
//!
//! struct Logger;
//! impl Callbacks for Logger {
//!     fn on_connect(&mut self, _t: i64, _u: &str, _c: &str, _a: i64, _sdp: &str, _p: Option<&Props>) {}
//!     fn on_answer(&mut self, _from_conflict: bool, _sdp: &str, _p: Option<&Props>) {}
//!     fn on_update_req(&mut self, _u: &str, _c: &str, _sdp: &str, _p: Option<&Props>, _reset: bool) {}
//!     fn on_update_resp(&mut self, _sdp: &str, _p: Option<&Props>) {}
//!     fn on_close(&mut self, _err: Option<&EconnError>) {}
//! }
//!
//! let (timer, _timer_feed) = TokioTimer::new();
//! let mut conn = Connection::new(
//!     "alice", "phone-1", Config::default(), timer, LoopbackTransport::new(), Logger,
//! );
//! conn.start("v=0...", None).unwrap();
//! assert_eq!(conn.state(), econn::State::PendingOutgoing);
//! ```

mod callbacks;
mod config;
mod connection;
mod error;
mod glare;
pub mod message;
mod props;
pub mod timer;
pub mod transport;

pub use callbacks::Callbacks;
pub use config::{Config, DEFAULT_CONFIG, DEFAULT_TIMEOUT_SETUP_MS, DEFAULT_TIMEOUT_TERM_MS};
pub use connection::{Conflict, Connection, Direction, State};
pub use error::EconnError;
pub use glare::is_winner;
pub use message::Message;
pub use props::Props;
pub use timer::{Timer, TimerFeed, TimerToken, TokioTimer};
pub use transport::Transport;
