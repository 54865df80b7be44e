//! Application callback surface.
//!
//! A fixed, typed set of five notifications — not an open extension point.
//! All five are invoked synchronously from inside a `Connection` operation,
//! after the state variable has already been updated, so a callback
//! observing `Connection::state()` sees the new state. The application
//! must not re-enter the same connection from inside a callback except
//! through its documented operations.

use crate::error::EconnError;
use crate::props::Props;

/// Application notifications raised by a [`crate::Connection`].
pub trait Callbacks {
    /// SETUP(req) accepted from IDLE — an inbound call.
    fn on_connect(
        &mut self,
        time: i64,
        user_id_sender: &str,
        client_id_sender: &str,
        age: i64,
        sdp: &str,
        props: Option<&Props>,
    );

    /// SETUP(resp) accepted, or CONFLICT_RESOLUTION entered after losing
    /// glare. `is_from_conflict` distinguishes the two.
    fn on_answer(&mut self, is_from_conflict: bool, sdp: &str, props: Option<&Props>);

    /// UPDATE(req) accepted. `should_reset` is set when this arrived via
    /// UPDATE glare that the local side lost.
    fn on_update_req(
        &mut self,
        user_id_sender: &str,
        client_id_sender: &str,
        sdp: &str,
        props: Option<&Props>,
        should_reset: bool,
    );

    /// UPDATE(resp) accepted.
    fn on_update_resp(&mut self, sdp: &str, props: Option<&Props>);

    /// The connection has terminated. Fires exactly once, last, for a
    /// given connection. `err` is `None` for a clean close, `Some` for a
    /// fatal cause.
    fn on_close(&mut self, err: Option<&EconnError>);
}
