use serde::{Serialize, Serializer};
use serde_json::{json, Value};

use crate::error::{FrameError, Result};
use crate::ids::{classify_id, IdKind, IdSpace, NOTIFICATION_ID};

/// Tag that opens every invocation payload.
pub const INVOKE_TAG: &str = "invoke";

/// One `[id, payload]` envelope.
#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    /// Correlation id; [`NOTIFICATION_ID`] for notifications.
    pub id: i64,
    /// Invocation descriptor or reply pair.
    pub payload: Value,
}

impl Message {
    pub fn new(id: i64, payload: Value) -> Self {
        Self { id, payload }
    }

    /// A message that expects no reply.
    pub fn notification(payload: Value) -> Self {
        Self::new(NOTIFICATION_ID, payload)
    }

    /// A reply envelope answering `id`.
    pub fn reply(id: i64, reply: &Reply) -> Self {
        Self::new(id, reply.to_value())
    }

    pub fn is_notification(&self) -> bool {
        self.id == NOTIFICATION_ID
    }

    /// What this inbound message means to an endpoint whose own calls use
    /// `outbound` ids.
    ///
    /// An invocation payload is a request whatever its id: ids are chosen by
    /// the sender and only the payload says whether one is being asked for.
    /// Any other payload is a reply when its id lies in `outbound`.
    pub fn kind(&self, outbound: IdSpace) -> IdKind {
        if self.is_notification() {
            IdKind::Notification
        } else if is_invocation(&self.payload) {
            IdKind::Request
        } else {
            classify_id(self.id, outbound)
        }
    }

    /// Interpret a decoded JSON value as an envelope.
    pub fn from_value(value: Value) -> Result<Self> {
        let items = match value {
            Value::Array(items) if items.len() == 2 => items,
            other => {
                return Err(FrameError::InvalidEnvelope(format!(
                    "expected [id, payload], got {other}"
                )))
            }
        };

        let mut items = items.into_iter();
        let (Some(id), Some(payload)) = (items.next(), items.next()) else {
            return Err(FrameError::InvalidEnvelope(
                "expected [id, payload]".to_string(),
            ));
        };
        let id = id.as_i64().ok_or_else(|| {
            FrameError::InvalidEnvelope(format!("message id must be an integer, got {id}"))
        })?;

        Ok(Self { id, payload })
    }

    pub fn to_value(&self) -> Value {
        json!([self.id, self.payload])
    }
}

impl Serialize for Message {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        (self.id, &self.payload).serialize(serializer)
    }
}

/// An `["invoke", method, args]` descriptor.
#[derive(Debug, Clone, PartialEq)]
pub struct Invocation {
    pub method: String,
    pub args: Vec<Value>,
}

impl Invocation {
    pub fn new(method: impl Into<String>, args: Vec<Value>) -> Self {
        Self {
            method: method.into(),
            args,
        }
    }

    /// Parse a payload, accepting exactly the 3-element invoke shape.
    pub fn from_value(payload: Value) -> Result<Self> {
        let items = match payload {
            Value::Array(items) => items,
            other => return Err(FrameError::MalformedInvocation(other.to_string())),
        };
        match <[Value; 3]>::try_from(items) {
            Ok([Value::String(tag), Value::String(method), Value::Array(args)])
                if tag == INVOKE_TAG =>
            {
                Ok(Self { method, args })
            }
            Ok(items) => Err(FrameError::MalformedInvocation(
                Value::Array(Vec::from(items)).to_string(),
            )),
            Err(items) => Err(FrameError::MalformedInvocation(
                Value::Array(items).to_string(),
            )),
        }
    }

    pub fn to_value(&self) -> Value {
        json!([INVOKE_TAG, self.method, self.args])
    }
}

/// Returns true if `value` is exactly `["invoke", <string>, <array>]`.
pub fn is_invocation(value: &Value) -> bool {
    match value.as_array() {
        Some(items) => {
            items.len() == 3
                && items[0].as_str() == Some(INVOKE_TAG)
                && items[1].is_string()
                && items[2].is_array()
        }
        None => false,
    }
}

/// Outcome of a call: success XOR failure.
///
/// Encoded as `[ok, null]` or `[null, err]`.
#[derive(Debug, Clone, PartialEq)]
pub enum Reply {
    Ok(Value),
    Err(Value),
}

impl Reply {
    pub fn is_ok(&self) -> bool {
        matches!(self, Reply::Ok(_))
    }

    /// Decode an `[ok, err]` pair.
    ///
    /// A null error slot means success, even when the ok slot is null too
    /// (a handler that returns nothing). Two populated slots are rejected.
    pub fn from_value(payload: Value) -> Result<Self> {
        let items = match payload {
            Value::Array(items) if items.len() == 2 => items,
            other => {
                return Err(FrameError::MalformedReply(format!(
                    "expected [ok, err], got {other}"
                )))
            }
        };
        let mut items = items.into_iter();
        match (items.next(), items.next()) {
            (Some(ok), Some(Value::Null)) => Ok(Reply::Ok(ok)),
            (Some(Value::Null), Some(err)) => Ok(Reply::Err(err)),
            (Some(ok), Some(err)) => Err(FrameError::MalformedReply(format!(
                "both slots populated: [{ok}, {err}]"
            ))),
            _ => Err(FrameError::MalformedReply(
                "expected [ok, err]".to_string(),
            )),
        }
    }

    pub fn to_value(&self) -> Value {
        match self {
            Reply::Ok(value) => json!([value, null]),
            Reply::Err(err) => json!([null, err]),
        }
    }

    pub fn into_result(self) -> std::result::Result<Value, Value> {
        match self {
            Reply::Ok(value) => Ok(value),
            Reply::Err(err) => Err(err),
        }
    }
}

impl From<std::result::Result<Value, Value>> for Reply {
    fn from(result: std::result::Result<Value, Value>) -> Self {
        match result {
            Ok(value) => Reply::Ok(value),
            Err(err) => Reply::Err(err),
        }
    }
}
