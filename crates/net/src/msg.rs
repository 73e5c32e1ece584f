//! The protocol message envelope handled by the transport.

use crate::error::WireError;
use crate::registry::TypeRegistry;
use bytes::Bytes;
use hagall_messages::{is_zero_timestamp, Envelope, ProtocolMessage};
use prost::Message;
use std::sync::Arc;
use std::time::SystemTime;

/// A protocol message as it travels through the transport.
///
/// Only the envelope (type and timestamp) is decoded; the payload stays in
/// its wire form until a consumer asks for a concrete message with
/// [`Msg::data_to`].
#[derive(Debug, Clone, PartialEq)]
pub struct Msg {
    msg_type: i32,
    time: SystemTime,
    body: Bytes,
}

impl Msg {
    /// Frame a typed protocol message.
    ///
    /// The timestamp is taken from the message itself. Messages without one
    /// are refused since no receiver would accept them.
    pub fn from_proto<M: ProtocolMessage>(msg: &M) -> Result<Self, WireError> {
        let msg_type = msg.type_tag();
        let time = envelope_time(msg_type, msg.timestamp())?;

        let mut body = Vec::with_capacity(msg.encoded_len());
        msg.encode(&mut body)?;

        Ok(Self {
            msg_type,
            time,
            body: Bytes::from(body),
        })
    }

    /// Parse the envelope of a serialized message, keeping the bytes as-is.
    pub fn from_bytes(body: impl Into<Bytes>) -> Result<Self, WireError> {
        let body = body.into();
        let envelope = Envelope::decode(body.clone()).map_err(WireError::MalformedEnvelope)?;
        let time = envelope_time(envelope.r#type, envelope.timestamp.as_ref())?;

        Ok(Self {
            msg_type: envelope.r#type,
            time,
            body,
        })
    }

    /// Decode the payload into a concrete message.
    pub fn data_to<M: ProtocolMessage>(&self) -> Result<M, WireError> {
        Ok(M::decode(self.body.clone())?)
    }

    /// Raw value of the message type.
    pub fn msg_type(&self) -> i32 {
        self.msg_type
    }

    /// Whether the message is of type `t`.
    pub fn is(&self, t: impl Into<i32>) -> bool {
        self.msg_type == t.into()
    }

    /// Time the message claims to have been sent.
    pub fn time(&self) -> SystemTime {
        self.time
    }

    /// Serialized message, exactly as sent on the wire.
    pub fn body(&self) -> &Bytes {
        &self.body
    }

    /// Payload size in bytes.
    pub fn len(&self) -> usize {
        self.body.len()
    }

    /// Whether the payload is empty.
    pub fn is_empty(&self) -> bool {
        self.body.is_empty()
    }

    /// Display name of the message type.
    pub fn type_name(&self, registry: &TypeRegistry) -> Arc<str> {
        registry.type_name(self.msg_type)
    }
}

fn envelope_time(
    msg_type: i32,
    timestamp: Option<&prost_types::Timestamp>,
) -> Result<SystemTime, WireError> {
    match timestamp {
        Some(ts) if !is_zero_timestamp(Some(ts)) => Ok(SystemTime::try_from(ts.clone())?),
        _ => Err(WireError::MissingTimestamp(msg_type)),
    }
}
