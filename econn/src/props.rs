//! The properties dictionary carried alongside SDP.

use serde_json::{Map, Value};

/// A small untyped dictionary of out-of-band session properties.
///
/// Keys are strings; values are arbitrary JSON (string, number, object…).
/// Shipped inside SETUP, UPDATE, and PROPSYNC payloads.
pub type Props = Map<String, Value>;

/// An empty props dictionary, for call sites that don't carry any.
pub fn empty() -> Props {
    Map::new()
}
