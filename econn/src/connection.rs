//! The per-call state machine.
//!
//! One [`Connection`] per call. It owns the state variable, the session
//! identifiers, and a single pending timer token; it borrows a [`Timer`],
//! a [`Transport`], and a [`Callbacks`] implementation supplied by the
//! embedding application.

use std::time::Duration;

use rand::distributions::Alphanumeric;
use rand::Rng;

use crate::callbacks::Callbacks;
use crate::config::Config;
use crate::error::EconnError;
use crate::glare;
use crate::message::{self, Message, MessageKind};
use crate::props::Props;
use crate::timer::{Timer, TimerToken};
use crate::transport::Transport;

/// The closed, exhaustive state enumeration. `TERMINATING` is
/// absorbing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    Idle,
    PendingOutgoing,
    PendingIncoming,
    ConflictResolution,
    Answered,
    DatachanEstablished,
    UpdateSent,
    UpdateRecv,
    HangupSent,
    HangupRecv,
    Terminating,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Unknown,
    Incoming,
    Outgoing,
}

/// Glare outcome, kept for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Conflict {
    None,
    Winner,
    Loser,
}

/// What an armed timer means, so `on_timer` knows how to react when it
/// fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TimerPurpose {
    /// Setup timer: no answer/response arrived in time.
    Setup,
    /// Term timer: HANGUP(req) sent, no response arrived in time.
    Term,
    /// `end()`'s 1ms defer-to-next-tick, so close fires after the caller
    /// returns rather than re-entrantly inside `end()` itself.
    EndTick,
}

/// One call's signaling state machine.
pub struct Connection<T: Timer, X: Transport, A: Callbacks> {
    state: State,
    direction: Direction,

    user_id_self: String,
    client_id_self: String,
    client_id_remote: Option<String>,

    session_id_local: String,
    session_id_remote: Option<String>,

    conflict: Conflict,
    setup_error: Option<EconnError>,
    closed: bool,

    timer_token: Option<TimerToken>,
    timer_purpose: Option<TimerPurpose>,

    config: Config,
    timer: T,
    transport: X,
    callbacks: A,
}

impl<T: Timer, X: Transport, A: Callbacks> Connection<T, X, A> {
    pub fn new(
        user_id_self: impl Into<String>,
        client_id_self: impl Into<String>,
        config: Config,
        timer: T,
        transport: X,
        callbacks: A,
    ) -> Self {
        Self {
            state: State::Idle,
            direction: Direction::Unknown,
            user_id_self: user_id_self.into(),
            client_id_self: client_id_self.into(),
            client_id_remote: None,
            session_id_local: generate_session_id(),
            session_id_remote: None,
            conflict: Conflict::None,
            setup_error: None,
            closed: false,
            timer_token: None,
            timer_purpose: None,
            config,
            timer,
            transport,
            callbacks,
        }
    }

    pub fn state(&self) -> State {
        self.state
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    pub fn conflict(&self) -> Conflict {
        self.conflict
    }

    /// Fixed for the lifetime of the record.
    pub fn session_id_local(&self) -> &str {
        &self.session_id_local
    }

    pub fn session_id_remote(&self) -> Option<&str> {
        self.session_id_remote.as_deref()
    }

    pub fn client_id_remote(&self) -> Option<&str> {
        self.client_id_remote.as_deref()
    }

    pub fn setup_error(&self) -> Option<&EconnError> {
        self.setup_error.as_ref()
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Borrow the injected transport. Mainly useful for a [`Transport`]
    /// like [`crate::transport::LoopbackTransport`] that queues what was
    /// sent rather than delivering it immediately.
    pub fn transport_mut(&mut self) -> &mut X {
        &mut self.transport
    }

    /// Borrow the injected timer, e.g. to drive it manually in tests.
    pub fn timer_mut(&mut self) -> &mut T {
        &mut self.timer
    }

    /// Borrow the injected callbacks sink.
    pub fn callbacks(&self) -> &A {
        &self.callbacks
    }

    // ── Timer bookkeeping ────────────────────────────────────────

    fn arm_timer(&mut self, after: Duration, purpose: TimerPurpose) {
        self.cancel_timer();
        let token = self.timer.start(after);
        tracing::debug!(sess = %self.session_id_local, ms = after.as_millis() as u64, purpose = ?purpose, "timer armed");
        self.timer_token = Some(token);
        self.timer_purpose = Some(purpose);
    }

    fn cancel_timer(&mut self) {
        if let Some(token) = self.timer_token.take() {
            self.timer.cancel(token);
        }
        self.timer_purpose = None;
    }

    /// Called by the application when its `Timer` reports `token` fired.
    /// A no-op if `token` doesn't match the currently armed one (already
    /// superseded or canceled).
    pub fn on_timer(&mut self, token: TimerToken) {
        if self.timer_token != Some(token) {
            tracing::debug!(sess = %self.session_id_local, "stale timer token ignored");
            return;
        }
        let purpose = self.timer_purpose.take();
        self.timer_token = None;

        match purpose {
            Some(TimerPurpose::Setup) => self.close(Some(EconnError::TimedOut)),
            Some(TimerPurpose::Term) => {
                let saved = self.setup_error.take();
                self.close(saved);
            }
            Some(TimerPurpose::EndTick) => self.close(None),
            None => {}
        }
    }

    // ── Outbound operations ──────────────────────────────────────

    /// Initiate a call. Precondition: state ∈ {IDLE, PENDING_OUTGOING}.
    pub fn start(&mut self, sdp: impl Into<String>, props: Option<Props>) -> Result<(), EconnError> {
        if !matches!(self.state, State::Idle | State::PendingOutgoing) {
            return Err(EconnError::Protocol(format!(
                "start() invalid in state {:?}",
                self.state
            )));
        }
        self.direction = Direction::Outgoing;
        self.state = State::PendingOutgoing;
        let msg = Message::setup(self.session_id_local.clone(), false, sdp.into(), props);
        self.send_setup(msg)?;
        self.arm_timer(Duration::from_millis(self.config.timeout_setup_ms), TimerPurpose::Setup);
        Ok(())
    }

    /// Answer an inbound call (or a re-answer after losing glare).
    /// Precondition: state ∈ {PENDING_INCOMING, CONFLICT_RESOLUTION}.
    pub fn answer(&mut self, sdp: impl Into<String>, props: Option<Props>) -> Result<(), EconnError> {
        if !matches!(self.state, State::PendingIncoming | State::ConflictResolution) {
            return Err(EconnError::Protocol(format!(
                "answer() invalid in state {:?}",
                self.state
            )));
        }
        self.cancel_timer();
        let msg = Message::setup(self.session_id_local.clone(), true, sdp.into(), props);
        self.send_setup(msg)?;
        self.state = State::Answered;
        Ok(())
    }

    /// Request an SDP/props update mid-call.
    ///
    /// Precondition: state ∈ {ANSWERED, DATACHAN_ESTABLISHED}. Rejects
    /// other states with `PROTOCOL` rather than logging and proceeding
    /// anyway (see DESIGN.md).
    pub fn update_req(&mut self, sdp: impl Into<String>, props: Option<Props>) -> Result<(), EconnError> {
        if !matches!(self.state, State::Answered | State::DatachanEstablished) {
            return Err(EconnError::Protocol(format!(
                "update_req() invalid in state {:?}",
                self.state
            )));
        }
        self.state = State::UpdateSent;
        let msg = Message::update(self.session_id_local.clone(), false, sdp.into(), props);
        let encoded = message::encode(&msg)?;
        self.transport.send(&encoded)?;
        self.arm_timer(Duration::from_millis(self.config.timeout_setup_ms), TimerPurpose::Setup);
        Ok(())
    }

    /// Answer an inbound UPDATE request. Precondition: state == UPDATE_RECV.
    pub fn update_resp(&mut self, sdp: impl Into<String>, props: Option<Props>) -> Result<(), EconnError> {
        if self.state != State::UpdateRecv {
            return Err(EconnError::Protocol(format!(
                "update_resp() invalid in state {:?}",
                self.state
            )));
        }
        self.cancel_timer();
        let msg = Message::update(self.session_id_local.clone(), true, sdp.into(), props);
        let encoded = message::encode(&msg)?;
        self.transport.send(&encoded)?;
        self.state = State::Answered;
        Ok(())
    }

    /// Send an out-of-band property sync. Precondition: state ==
    /// DATACHAN_ESTABLISHED.
    pub fn send_propsync(&mut self, props: Props, is_response: bool) -> Result<(), EconnError> {
        if self.state != State::DatachanEstablished {
            return Err(EconnError::Protocol(
                "send_propsync() requires DATACHAN_ESTABLISHED".into(),
            ));
        }
        let msg = Message::propsync(self.session_id_local.clone(), is_response, props);
        let encoded = message::encode(&msg)?;
        self.transport.send(&encoded)?;
        Ok(())
    }

    /// Informs the state machine that the data/media channel is up.
    /// Precondition: state == ANSWERED; otherwise a no-op (logged).
    pub fn set_datachan_established(&mut self) {
        if self.state == State::Answered {
            self.state = State::DatachanEstablished;
        } else {
            tracing::warn!(
                sess = %self.session_id_local,
                state = ?self.state,
                "set_datachan_established() ignored outside ANSWERED"
            );
        }
    }

    /// Tear the call down. Behavior depends on the state at entry;
    /// never fails.
    pub fn end(&mut self) {
        match self.state {
            State::PendingIncoming => {
                self.state = State::Terminating;
                self.arm_timer(Duration::from_millis(1), TimerPurpose::EndTick);
            }
            State::PendingOutgoing | State::Answered | State::ConflictResolution => {
                self.best_effort_send(Message::cancel(self.session_id_local.clone(), false));
                self.state = State::Terminating;
                self.arm_timer(Duration::from_millis(1), TimerPurpose::EndTick);
            }
            State::DatachanEstablished => {
                self.best_effort_send(Message::hangup(self.session_id_local.clone(), false));
                self.state = State::HangupSent;
                self.arm_timer(
                    Duration::from_millis(self.config.timeout_term_ms),
                    TimerPurpose::Term,
                );
            }
            other => {
                tracing::warn!(sess = %self.session_id_local, state = ?other, "end() ignored in this state");
            }
        }
    }

    // ── Inbound dispatch ─────────────────────────────────────────

    /// Decode and dispatch an inbound wire message.
    ///
    /// `curr_time`/`msg_time` feed the codec's `age` calculation.
    /// Identity (`sender_user_id`, `sender_client_id`) is supplied
    /// by the caller, not carried on the wire — the core trusts whatever
    /// the transport layer already used to route this message here
    /// (the core has no peer authentication of its own).
    ///
    /// Codec failures (`BAD_MESSAGE`, `PROTOCOL`) are returned to the
    /// caller. Dispatch-level validation failures (wrong clientId,
    /// session id, or state) are logged and silently dropped — this
    /// always returns `Ok(())` past the decode step.
    pub fn recv(
        &mut self,
        sender_user_id: &str,
        sender_client_id: &str,
        curr_time: i64,
        msg_time: i64,
        bytes: &[u8],
    ) -> Result<(), EconnError> {
        let msg = message::decode(curr_time, msg_time, bytes)?;

        if self.closed {
            tracing::debug!(sess = %self.session_id_local, "dropping inbound message on closed connection");
            return Ok(());
        }

        match msg.kind.clone() {
            MessageKind::Setup { sdp, props } => {
                self.recv_setup(sender_user_id, sender_client_id, &msg, sdp, props)
            }
            MessageKind::Update { sdp, props } => {
                self.recv_update(sender_user_id, sender_client_id, &msg, sdp, props)
            }
            MessageKind::Cancel => self.recv_cancel(sender_client_id, &msg),
            MessageKind::Hangup => self.recv_hangup(&msg),
            MessageKind::Propsync { .. } => {
                // `send_propsync` is outbound-only; there is no inbound
                // dispatch rule or callback for PROPSYNC (the five-method
                // Callbacks surface has no slot for it). Validate by
                // symmetry with the outbound precondition and otherwise
                // stay inert.
                if self.state == State::DatachanEstablished {
                    tracing::debug!(sess = %self.session_id_local, "propsync received, no callback defined");
                } else {
                    tracing::warn!(sess = %self.session_id_local, state = ?self.state, "propsync dropped outside DATACHAN_ESTABLISHED");
                }
                Ok(())
            }
        }
    }

    fn recv_setup(
        &mut self,
        sender_user_id: &str,
        sender_client_id: &str,
        msg: &Message,
        sdp: String,
        props: Option<Props>,
    ) -> Result<(), EconnError> {
        let mismatch = self
            .client_id_remote
            .as_deref()
            .is_some_and(|id| id != sender_client_id);
        if mismatch {
            tracing::warn!(sess = %self.session_id_local, "setup from unexpected clientId dropped");
            return Ok(());
        }
        if self.client_id_remote.is_none() {
            self.client_id_remote = Some(sender_client_id.to_string());
        }

        if msg.is_response {
            match self.state {
                State::PendingOutgoing | State::ConflictResolution => {
                    self.cancel_timer();
                    self.session_id_remote = Some(msg.session_id_sender.clone());
                    self.state = State::Answered;
                    self.callbacks.on_answer(false, &sdp, props.as_ref());
                }
                _ => {
                    tracing::warn!(sess = %self.session_id_local, state = ?self.state, "unexpected SETUP response dropped");
                }
            }
            return Ok(());
        }

        match self.state {
            State::Idle => {
                self.session_id_remote = Some(msg.session_id_sender.clone());
                self.state = State::PendingIncoming;
                self.direction = Direction::Incoming;
                self.arm_timer(Duration::from_millis(self.config.timeout_setup_ms), TimerPurpose::Setup);
                self.callbacks
                    .on_connect(msg.time, sender_user_id, sender_client_id, msg.age, &sdp, props.as_ref());
            }
            State::PendingOutgoing => {
                // Glare: both sides sent SETUP(req) concurrently.
                let we_win = glare::is_winner(&self.user_id_self, &self.client_id_self, sender_user_id, sender_client_id);
                self.session_id_remote = Some(msg.session_id_sender.clone());
                if we_win {
                    self.conflict = Conflict::Winner;
                    // Ignore the remote offer; the peer will re-answer
                    // after it loses glare on its own side.
                } else {
                    self.conflict = Conflict::Loser;
                    self.state = State::ConflictResolution;
                    self.callbacks.on_answer(true, &sdp, props.as_ref());
                }
            }
            _ => {
                tracing::warn!(sess = %self.session_id_local, state = ?self.state, "unexpected SETUP request dropped");
            }
        }
        Ok(())
    }

    fn recv_update(
        &mut self,
        sender_user_id: &str,
        sender_client_id: &str,
        msg: &Message,
        sdp: String,
        props: Option<Props>,
    ) -> Result<(), EconnError> {
        if self.client_id_remote.as_deref() != Some(sender_client_id) {
            tracing::warn!(sess = %self.session_id_local, "update from unexpected clientId dropped");
            return Ok(());
        }
        if self.session_id_remote.as_deref() != Some(msg.session_id_sender.as_str()) {
            tracing::warn!(sess = %self.session_id_local, "update with unexpected sessionId dropped");
            return Ok(());
        }

        if msg.is_response {
            if self.state != State::UpdateSent {
                tracing::warn!(sess = %self.session_id_local, state = ?self.state, "unexpected UPDATE response dropped");
                return Ok(());
            }
            self.cancel_timer();
            self.state = State::Answered;
            self.callbacks.on_update_resp(&sdp, props.as_ref());
            return Ok(());
        }

        let mut should_reset = false;
        match self.state {
            State::Answered | State::DatachanEstablished => {
                self.state = State::UpdateRecv;
            }
            State::UpdateSent => {
                let we_win = glare::is_winner(&self.user_id_self, &self.client_id_self, sender_user_id, sender_client_id);
                if we_win {
                    // No `conflict` set, no callback on the winning side —
                    // asymmetric with SETUP glare but preserved as-is (see
                    // DESIGN.md).
                    tracing::debug!(sess = %self.session_id_local, "update glare won, remote request dropped");
                    return Ok(());
                }
                self.state = State::UpdateRecv;
                should_reset = true;
            }
            _ => {
                tracing::warn!(sess = %self.session_id_local, state = ?self.state, "unexpected UPDATE request dropped");
                return Ok(());
            }
        }

        self.arm_timer(Duration::from_millis(self.config.timeout_setup_ms), TimerPurpose::Setup);
        self.callbacks
            .on_update_req(sender_user_id, sender_client_id, &sdp, props.as_ref(), should_reset);
        Ok(())
    }

    fn recv_cancel(&mut self, sender_client_id: &str, msg: &Message) -> Result<(), EconnError> {
        if self.client_id_remote.as_deref() != Some(sender_client_id)
            || self.session_id_remote.as_deref() != Some(msg.session_id_sender.as_str())
        {
            tracing::warn!(sess = %self.session_id_local, "cancel with unexpected identity dropped");
            return Ok(());
        }
        match self.state {
            State::PendingIncoming | State::Answered | State::DatachanEstablished => {
                self.close(Some(EconnError::Canceled));
            }
            _ => {
                tracing::warn!(sess = %self.session_id_local, state = ?self.state, "unexpected CANCEL dropped");
            }
        }
        Ok(())
    }

    fn recv_hangup(&mut self, msg: &Message) -> Result<(), EconnError> {
        if self.session_id_remote.as_deref() != Some(msg.session_id_sender.as_str()) {
            tracing::warn!(sess = %self.session_id_local, "hangup with unexpected sessionId dropped");
            return Ok(());
        }
        match self.state {
            State::DatachanEstablished | State::HangupSent => {
                self.state = State::HangupRecv;
                if !msg.is_response {
                    self.best_effort_send(Message::hangup(self.session_id_local.clone(), true));
                }
                self.close(None);
            }
            _ => {
                tracing::warn!(sess = %self.session_id_local, state = ?self.state, "unexpected HANGUP dropped");
            }
        }
        Ok(())
    }

    // ── Close procedure ───────────────────────────────────────────

    fn close(&mut self, err: Option<EconnError>) {
        self.cancel_timer();

        if self.state == State::PendingOutgoing {
            self.best_effort_send(Message::cancel(self.session_id_local.clone(), false));
        }

        self.setup_error = err;
        self.state = State::Terminating;

        if !self.closed {
            self.closed = true;
            tracing::info!(sess = %self.session_id_local, err = ?self.setup_error, "connection closed");
            self.callbacks.on_close(self.setup_error.as_ref());
        }
    }

    // ── Send helpers ─────────────────────────────────────────────────

    /// Send a SETUP (request or response). A transport failure here
    /// advances the connection straight to TERMINATING with `setupError`
    /// set.
    fn send_setup(&mut self, msg: Message) -> Result<(), EconnError> {
        let encoded = message::encode(&msg)?;
        if let Err(e) = self.transport.send(&encoded) {
            tracing::warn!(sess = %self.session_id_local, error = %e, "setup send failed, closing");
            self.close(Some(e.clone()));
            return Err(e);
        }
        Ok(())
    }

    /// Send without surfacing a failure — used for CANCEL/HANGUP emitted
    /// as a courtesy during teardown, where the core has nothing useful
    /// to do with a transport error.
    fn best_effort_send(&mut self, msg: Message) {
        match message::encode(&msg) {
            Ok(encoded) => {
                if let Err(e) = self.transport.send(&encoded) {
                    tracing::debug!(sess = %self.session_id_local, error = %e, "best-effort send failed");
                }
            }
            Err(e) => {
                tracing::debug!(sess = %self.session_id_local, error = %e, "best-effort encode failed");
            }
        }
    }
}

fn generate_session_id() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(5)
        .map(char::from)
        .collect()
}
