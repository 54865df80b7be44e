//! Message envelope & codec.
//!
//! Wire format is a flat JSON object, version `"3.0"`:
//!
//! ```json
//! { "version": "3.0", "type": "setup", "sessid": "ab3F9",
//!   "resp": false, "sdp": "...", "props": { } }
//! ```

use serde_json::Value;

use crate::error::EconnError;
use crate::props::Props;

pub const WIRE_VERSION: &str = "3.0";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageType {
    Setup,
    Update,
    Cancel,
    Hangup,
    Propsync,
}

impl MessageType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Setup => "setup",
            Self::Update => "update",
            Self::Cancel => "cancel",
            Self::Hangup => "hangup",
            Self::Propsync => "propsync",
        }
    }

    fn parse(s: &str) -> Option<Self> {
        match s {
            "setup" => Some(Self::Setup),
            "update" => Some(Self::Update),
            "cancel" => Some(Self::Cancel),
            "hangup" => Some(Self::Hangup),
            "propsync" => Some(Self::Propsync),
            _ => None,
        }
    }
}

/// The per-type payload.
#[derive(Debug, Clone, PartialEq)]
pub enum MessageKind {
    Setup { sdp: String, props: Option<Props> },
    Update { sdp: String, props: Option<Props> },
    Cancel,
    Hangup,
    Propsync { props: Props },
}

impl MessageKind {
    pub fn message_type(&self) -> MessageType {
        match self {
            Self::Setup { .. } => MessageType::Setup,
            Self::Update { .. } => MessageType::Update,
            Self::Cancel => MessageType::Cancel,
            Self::Hangup => MessageType::Hangup,
            Self::Propsync { .. } => MessageType::Propsync,
        }
    }
}

/// A decoded (or about-to-be-encoded) signaling message.
#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    pub kind: MessageKind,
    /// The sender's own `sessionIdLocal`.
    pub session_id_sender: String,
    /// Request (false) vs response (true).
    pub is_response: bool,
    /// Populated on decode from the caller-supplied `msg_time`; ignored on
    /// encode (this side doesn't know its own age).
    pub time: i64,
    /// `msg_time > curr_time ? 0 : curr_time - msg_time`, populated on
    /// decode.
    pub age: i64,
}

impl Message {
    pub fn setup(session_id_sender: impl Into<String>, is_response: bool, sdp: impl Into<String>, props: Option<Props>) -> Self {
        Self {
            kind: MessageKind::Setup { sdp: sdp.into(), props },
            session_id_sender: session_id_sender.into(),
            is_response,
            time: 0,
            age: 0,
        }
    }

    pub fn update(session_id_sender: impl Into<String>, is_response: bool, sdp: impl Into<String>, props: Option<Props>) -> Self {
        Self {
            kind: MessageKind::Update { sdp: sdp.into(), props },
            session_id_sender: session_id_sender.into(),
            is_response,
            time: 0,
            age: 0,
        }
    }

    pub fn cancel(session_id_sender: impl Into<String>, is_response: bool) -> Self {
        Self {
            kind: MessageKind::Cancel,
            session_id_sender: session_id_sender.into(),
            is_response,
            time: 0,
            age: 0,
        }
    }

    pub fn hangup(session_id_sender: impl Into<String>, is_response: bool) -> Self {
        Self {
            kind: MessageKind::Hangup,
            session_id_sender: session_id_sender.into(),
            is_response,
            time: 0,
            age: 0,
        }
    }

    pub fn propsync(session_id_sender: impl Into<String>, is_response: bool, props: Props) -> Self {
        Self {
            kind: MessageKind::Propsync { props },
            session_id_sender: session_id_sender.into(),
            is_response,
            time: 0,
            age: 0,
        }
    }

    pub fn message_type(&self) -> MessageType {
        self.kind.message_type()
    }
}

/// Encode a message to its wire JSON form.
///
/// Fails with [`EconnError::InvalidArg`] if `session_id_sender` is empty,
/// or if a SETUP/UPDATE's `sdp` is empty. `PROPSYNC` without props isn't
/// representable in the first place — [`Message::propsync`] requires a
/// [`Props`] argument, so the type system subsumes that check (see
/// DESIGN.md).
pub fn encode(msg: &Message) -> Result<String, EconnError> {
    if msg.session_id_sender.is_empty() {
        return Err(EconnError::InvalidArg("session_id_sender is empty".into()));
    }

    let mut obj = serde_json::Map::new();
    obj.insert("version".into(), Value::String(WIRE_VERSION.into()));
    obj.insert("type".into(), Value::String(msg.message_type().as_str().into()));
    obj.insert("sessid".into(), Value::String(msg.session_id_sender.clone()));
    obj.insert("resp".into(), Value::Bool(msg.is_response));

    match &msg.kind {
        MessageKind::Setup { sdp, props } | MessageKind::Update { sdp, props } => {
            if sdp.is_empty() {
                return Err(EconnError::InvalidArg("sdp is empty".into()));
            }
            obj.insert("sdp".into(), Value::String(sdp.clone()));
            if let Some(p) = props {
                obj.insert("props".into(), Value::Object(p.clone()));
            }
        }
        MessageKind::Cancel | MessageKind::Hangup => {}
        MessageKind::Propsync { props } => {
            obj.insert("props".into(), Value::Object(props.clone()));
        }
    }

    Ok(serde_json::to_string(&Value::Object(obj)).expect("Value serialization is infallible"))
}

/// Decode a wire message.
///
/// `curr_time`/`msg_time` are caller-supplied epoch milliseconds, used only
/// to derive `age` — the codec itself has no clock.
pub fn decode(curr_time: i64, msg_time: i64, bytes: &[u8]) -> Result<Message, EconnError> {
    let value: Value = serde_json::from_slice(bytes)
        .map_err(|e| EconnError::BadMessage(format!("invalid JSON: {e}")))?;
    let obj = value
        .as_object()
        .ok_or_else(|| EconnError::BadMessage("message is not a JSON object".into()))?;

    let version = obj
        .get("version")
        .and_then(Value::as_str)
        .ok_or_else(|| EconnError::BadMessage("missing version".into()))?;
    if version != WIRE_VERSION {
        return Err(EconnError::Protocol(format!(
            "unsupported wire version {version}"
        )));
    }

    let type_str = obj
        .get("type")
        .and_then(Value::as_str)
        .ok_or_else(|| EconnError::BadMessage("missing type".into()))?;
    let message_type = MessageType::parse(type_str)
        .ok_or_else(|| EconnError::BadMessage(format!("unknown message type '{type_str}'")))?;

    let sessid = obj
        .get("sessid")
        .and_then(Value::as_str)
        .ok_or_else(|| EconnError::BadMessage("missing sessid".into()))?
        .to_string();

    let is_response = obj
        .get("resp")
        .and_then(Value::as_bool)
        .ok_or_else(|| EconnError::BadMessage("missing resp".into()))?;

    let kind = match message_type {
        MessageType::Setup | MessageType::Update => {
            let sdp = obj
                .get("sdp")
                .and_then(Value::as_str)
                .ok_or_else(|| EconnError::BadMessage("missing sdp".into()))?
                .to_string();
            let props = obj.get("props").and_then(Value::as_object).cloned();
            if message_type == MessageType::Setup {
                MessageKind::Setup { sdp, props }
            } else {
                MessageKind::Update { sdp, props }
            }
        }
        MessageType::Cancel => MessageKind::Cancel,
        MessageType::Hangup => MessageKind::Hangup,
        MessageType::Propsync => {
            let props = obj
                .get("props")
                .and_then(Value::as_object)
                .cloned()
                .ok_or_else(|| EconnError::BadMessage("propsync missing props".into()))?;
            MessageKind::Propsync { props }
        }
    };

    let age = if msg_time > curr_time { 0 } else { curr_time - msg_time };

    Ok(Message {
        kind,
        session_id_sender: sessid,
        is_response,
        time: msg_time,
        age,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encode_decode_setup_roundtrip() {
        let mut props = Props::new();
        props.insert("codec".into(), Value::String("opus".into()));
        let msg = Message::setup("sA123", false, "v=0...", Some(props));
        let wire = encode(&msg).unwrap();
        let decoded = decode(1_000, 1_000, wire.as_bytes()).unwrap();

        assert_eq!(decoded.kind, msg.kind);
        assert_eq!(decoded.session_id_sender, msg.session_id_sender);
        assert_eq!(decoded.is_response, msg.is_response);
        assert_eq!(decoded.time, 1_000);
        assert_eq!(decoded.age, 0);
    }

    #[test]
    fn decode_rejects_wrong_version() {
        let wire = r#"{"version":"2.0","type":"hangup","sessid":"aaaaa","resp":false}"#;
        let err = decode(0, 0, wire.as_bytes()).unwrap_err();
        assert!(matches!(err, EconnError::Protocol(_)));
    }

    #[test]
    fn decode_rejects_missing_field() {
        let wire = r#"{"version":"3.0","type":"setup","sessid":"aaaaa","resp":false}"#;
        let err = decode(0, 0, wire.as_bytes()).unwrap_err();
        assert!(matches!(err, EconnError::BadMessage(_)));
    }

    #[test]
    fn decode_rejects_unknown_type() {
        let wire = r#"{"version":"3.0","type":"frobnicate","sessid":"aaaaa","resp":false}"#;
        let err = decode(0, 0, wire.as_bytes()).unwrap_err();
        assert!(matches!(err, EconnError::BadMessage(_)));
    }

    #[test]
    fn decode_propsync_requires_props() {
        let wire = r#"{"version":"3.0","type":"propsync","sessid":"aaaaa","resp":false}"#;
        let err = decode(0, 0, wire.as_bytes()).unwrap_err();
        assert!(matches!(err, EconnError::BadMessage(_)));
    }

    #[test]
    fn age_is_zero_for_future_message() {
        let wire = r#"{"version":"3.0","type":"hangup","sessid":"aaaaa","resp":false}"#;
        let decoded = decode(1_000, 5_000, wire.as_bytes()).unwrap();
        assert_eq!(decoded.age, 0);
        assert_eq!(decoded.time, 5_000);
    }

    #[test]
    fn encode_rejects_empty_session_id() {
        let msg = Message::hangup("", false);
        let err = encode(&msg).unwrap_err();
        assert!(matches!(err, EconnError::InvalidArg(_)));
    }

    #[test]
    fn encode_rejects_empty_sdp() {
        let msg = Message::setup("sA123", false, "", None);
        let err = encode(&msg).unwrap_err();
        assert!(matches!(err, EconnError::InvalidArg(_)));
    }
}
