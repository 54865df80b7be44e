//! Shared test harness for the integration suite.
//!
//! `FakeTimer` hands out tokens in the same way [`econn::TokioTimer`] does,
//! but never actually sleeps — a test fires one by calling `Connection::on_timer`
//! directly, which is what lets the S4/S5-style scenarios below run without a
//! tokio runtime at all.

use std::collections::HashSet;
use std::time::Duration;

use econn::{Callbacks, EconnError, Props, Timer, TimerToken};

#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    Connect {
        user: String,
        client: String,
        sdp: String,
        props: Option<Props>,
    },
    Answer {
        from_conflict: bool,
        sdp: String,
        props: Option<Props>,
    },
    UpdateReq {
        user: String,
        client: String,
        sdp: String,
        props: Option<Props>,
        should_reset: bool,
    },
    UpdateResp {
        sdp: String,
        props: Option<Props>,
    },
    Close {
        err: Option<String>,
    },
}

/// Records every callback invocation in order, for assertion.
#[derive(Debug, Default)]
pub struct FakeCallbacks {
    pub events: Vec<Event>,
}

impl FakeCallbacks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn close_count(&self) -> usize {
        self.events.iter().filter(|e| matches!(e, Event::Close { .. })).count()
    }
}

impl Callbacks for FakeCallbacks {
    fn on_connect(
        &mut self,
        _time: i64,
        user_id_sender: &str,
        client_id_sender: &str,
        _age: i64,
        sdp: &str,
        props: Option<&Props>,
    ) {
        self.events.push(Event::Connect {
            user: user_id_sender.to_string(),
            client: client_id_sender.to_string(),
            sdp: sdp.to_string(),
            props: props.cloned(),
        });
    }

    fn on_answer(&mut self, is_from_conflict: bool, sdp: &str, props: Option<&Props>) {
        self.events.push(Event::Answer {
            from_conflict: is_from_conflict,
            sdp: sdp.to_string(),
            props: props.cloned(),
        });
    }

    fn on_update_req(
        &mut self,
        user_id_sender: &str,
        client_id_sender: &str,
        sdp: &str,
        props: Option<&Props>,
        should_reset: bool,
    ) {
        self.events.push(Event::UpdateReq {
            user: user_id_sender.to_string(),
            client: client_id_sender.to_string(),
            sdp: sdp.to_string(),
            props: props.cloned(),
            should_reset,
        });
    }

    fn on_update_resp(&mut self, sdp: &str, props: Option<&Props>) {
        self.events.push(Event::UpdateResp {
            sdp: sdp.to_string(),
            props: props.cloned(),
        });
    }

    fn on_close(&mut self, err: Option<&EconnError>) {
        self.events.push(Event::Close {
            err: err.map(|e| format!("{e:?}")),
        });
    }
}

/// A manually-driven [`Timer`]. Tracks every arm/cancel so a test can
/// assert on timer bookkeeping, and lets a test fire a token by simply
/// handing it back to `Connection::on_timer` — no runtime, no sleeping.
#[derive(Debug, Default)]
pub struct FakeTimer {
    next_id: u64,
    pub armed: Vec<(TimerToken, Duration)>,
    pub canceled: Vec<TimerToken>,
}

impl FakeTimer {
    pub fn new() -> Self {
        Self::default()
    }

    /// The token most recently armed, if it hasn't since been canceled.
    pub fn last_armed(&self) -> Option<TimerToken> {
        let canceled: HashSet<TimerToken> = self.canceled.iter().copied().collect();
        self.armed
            .iter()
            .rev()
            .map(|(t, _)| *t)
            .find(|t| !canceled.contains(t))
    }

    /// Number of tokens armed but not yet canceled — should never exceed 1
    /// across a well-behaved `Connection` (spec invariant 6).
    pub fn outstanding(&self) -> usize {
        let canceled: HashSet<TimerToken> = self.canceled.iter().copied().collect();
        self.armed.iter().filter(|(t, _)| !canceled.contains(t)).count()
    }
}

impl Timer for FakeTimer {
    fn start(&mut self, after: Duration) -> TimerToken {
        self.next_id += 1;
        let token = TimerToken::from_raw(self.next_id);
        self.armed.push((token, after));
        token
    }

    fn cancel(&mut self, token: TimerToken) {
        self.canceled.push(token);
    }
}
