//! Timer service binding.
//!
//! The connection keeps at most one outstanding timer at a time, identified
//! by a single opaque [`TimerToken`] — starting a new one first cancels
//! whatever was armed before. The timer source itself is external and
//! monotonic; this module only defines the contract ([`Timer`]) and ships
//! one concrete binding ([`TokioTimer`]/[`TimerFeed`]).

use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::mpsc;

/// Opaque handle to one armed (or already-fired/canceled) timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimerToken(u64);

impl TimerToken {
    /// Construct a token from a raw id. Custom [`Timer`] implementations
    /// (outside the one shipped here) use this to mint their own tokens;
    /// [`TokioTimer`] manages its ids internally and doesn't need it.
    pub fn from_raw(id: u64) -> Self {
        Self(id)
    }

    pub fn raw(&self) -> u64 {
        self.0
    }
}

/// An external monotonic timer source.
///
/// Implementations must guarantee: a token returned by `start` fires
/// exactly once, unless `cancel`ed first, in which case it never fires.
pub trait Timer {
    /// Arm a one-shot timer for `after`. Returns a token identifying it.
    fn start(&mut self, after: Duration) -> TimerToken;

    /// Cancel a previously started timer. A no-op if it already fired or
    /// was already canceled — callers don't need to track liveness.
    fn cancel(&mut self, token: TimerToken);
}

/// Tokio-backed [`Timer`]. Each `start` spawns a sleep task; firing is
/// delivered over an internal channel rather than by calling back into the
/// connection directly, so the application pumps the paired [`TimerFeed`]
/// and calls `Connection::on_timer` synchronously — the same shape as
/// pumping inbound transport messages into `Connection::recv`. This keeps
/// every core operation free of suspension points.
///
/// `TokioTimer` holds only the sending half of that channel. The receiving
/// half lives in the separate [`TimerFeed`] returned alongside it by
/// [`TokioTimer::new`], following `client-rust`'s `ws_task` split — the
/// socket's read half is kept out of the handle the rest of the app holds
/// onto, so an event loop can poll the feed directly, in the same
/// `tokio::select!`, without also holding a `&mut` borrow on whatever owns
/// the `TokioTimer` (e.g. a `Connection`).
pub struct TokioTimer {
    next_id: u64,
    live: Arc<Mutex<HashSet<u64>>>,
    fired_tx: mpsc::UnboundedSender<TimerToken>,
}

/// The receiving half of a [`TokioTimer`]'s firing channel. Owned directly
/// by the application's event loop, not by the `Connection` the paired
/// `TokioTimer` is bound into.
pub struct TimerFeed {
    fired_rx: mpsc::UnboundedReceiver<TimerToken>,
}

impl TokioTimer {
    /// Construct a `TokioTimer`/`TimerFeed` pair sharing one firing
    /// channel.
    pub fn new() -> (Self, TimerFeed) {
        let (fired_tx, fired_rx) = mpsc::unbounded_channel();
        (
            Self {
                next_id: 0,
                live: Arc::new(Mutex::new(HashSet::new())),
                fired_tx,
            },
            TimerFeed { fired_rx },
        )
    }
}

impl TimerFeed {
    /// Await the next timer to fire. Resolves to `None` only once the
    /// paired `TokioTimer` (and every clone of its sender) has been
    /// dropped.
    pub async fn fired(&mut self) -> Option<TimerToken> {
        self.fired_rx.recv().await
    }
}

impl Timer for TokioTimer {
    fn start(&mut self, after: Duration) -> TimerToken {
        self.next_id += 1;
        let id = self.next_id;
        self.live.lock().unwrap().insert(id);

        let live = Arc::clone(&self.live);
        let tx = self.fired_tx.clone();
        tokio::spawn(async move {
            tokio::time::sleep(after).await;
            let fired = {
                let mut guard = live.lock().unwrap();
                guard.remove(&id)
            };
            if fired {
                let _ = tx.send(TimerToken(id));
            }
        });

        TimerToken(id)
    }

    fn cancel(&mut self, token: TimerToken) {
        self.live.lock().unwrap().remove(&token.0);
    }
}
