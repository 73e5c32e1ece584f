//! Error types of the transport layer.
//!
//! Every error exposes a stable `kind()` tag so logs and metrics can group
//! failures without matching on display strings.

use std::fmt;
use thiserror::Error;
use tokio_tungstenite::tungstenite;

/// Tag for messages that could not be serialized.
pub const ERR_TYPE_MSG_ENCODE_FAIL: &str = "msg_encode_fail";
/// Tag for payloads that do not decode into the requested message.
pub const ERR_TYPE_MSG_DECODE_FAIL: &str = "msg_decode_fail";
/// Tag for failed writes.
pub const ERR_TYPE_MSG_SEND_FAIL: &str = "msg_send_fail";
/// Tag for failed reads.
pub const ERR_TYPE_MSG_RECEIVE_FAIL: &str = "msg_receive_fail";
/// Tag for messages without a timestamp.
pub const ERR_TYPE_MSG_MISSING_TIMESTAMP: &str = "msg_missing_timestamp";
/// Tag for frames that are not binary.
pub const ERR_TYPE_MSG_INVALID_PAYLOAD_TYPE: &str = "msg_invalid_payload_type";
/// Tag for updates dropped by the scheduler.
pub const ERR_TYPE_MSG_DROPPED: &str = "msg_dropped";
/// Tag for operations interrupted by cancellation.
pub const ERR_TYPE_CANCELLED: &str = "cancelled";
/// Tag for operations on a closed scheduler.
pub const ERR_TYPE_SCHEDULER_CLOSED: &str = "scheduler_closed";

/// Kind of WebSocket frame a payload arrived in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayloadType {
    /// UTF-8 text frame.
    Text,
    /// Binary frame.
    Binary,
    /// Raw frame surfaced without interpretation.
    Raw,
}

impl fmt::Display for PayloadType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PayloadType::Text => "text",
            PayloadType::Binary => "binary",
            PayloadType::Raw => "raw",
        };
        f.write_str(name)
    }
}

/// Errors raised while framing, sending or receiving protocol messages.
#[derive(Debug, Error)]
pub enum WireError {
    /// prost could not serialize the message.
    #[error("encoding protobuf message failed: {0}")]
    Encoding(#[from] prost::EncodeError),
    /// The payload does not match the requested message structure.
    #[error("decoding protobuf message failed: {0}")]
    Decode(#[from] prost::DecodeError),
    /// Writing the frame failed.
    #[error("sending {msg_type} message failed: {source}")]
    SendFailure {
        /// Display name of the message type.
        msg_type: String,
        /// Transport error.
        #[source]
        source: tungstenite::Error,
    },
    /// Reading a frame failed.
    #[error("receiving message failed: {0}")]
    Receive(#[source] tungstenite::Error),
    /// The peer closed the connection.
    #[error("receiving message failed: connection closed")]
    Closed,
    /// The frame does not start with a valid envelope.
    #[error("receiving message failed: malformed envelope: {0}")]
    MalformedEnvelope(#[source] prost::DecodeError),
    /// The frame is not binary.
    #[error("received invalid websocket payload type: {0}")]
    InvalidPayloadType(PayloadType),
    /// The message carries no timestamp, or a zero one.
    #[error("missing message timestamp (msg_type: {0})")]
    MissingTimestamp(i32),
    /// The timestamp is outside the range `SystemTime` can represent.
    #[error("invalid message timestamp: {0}")]
    InvalidTimestamp(#[from] prost_types::TimestampError),
}

impl WireError {
    /// Stable tag describing the failure class.
    pub fn kind(&self) -> &'static str {
        match self {
            WireError::Encoding(_) => ERR_TYPE_MSG_ENCODE_FAIL,
            WireError::Decode(_) => ERR_TYPE_MSG_DECODE_FAIL,
            WireError::SendFailure { .. } => ERR_TYPE_MSG_SEND_FAIL,
            WireError::Receive(_) | WireError::Closed | WireError::MalformedEnvelope(_) => {
                ERR_TYPE_MSG_RECEIVE_FAIL
            }
            WireError::InvalidPayloadType(_) => ERR_TYPE_MSG_INVALID_PAYLOAD_TYPE,
            WireError::MissingTimestamp(_) | WireError::InvalidTimestamp(_) => {
                ERR_TYPE_MSG_MISSING_TIMESTAMP
            }
        }
    }

    /// Whether the error means the connection is gone rather than a bad frame.
    pub fn is_disconnect(&self) -> bool {
        match self {
            WireError::Closed => true,
            WireError::Receive(err) | WireError::SendFailure { source: err, .. } => matches!(
                err,
                tungstenite::Error::ConnectionClosed
                    | tungstenite::Error::AlreadyClosed
                    | tungstenite::Error::Io(_)
                    | tungstenite::Error::Protocol(
                        tungstenite::error::ProtocolError::ResetWithoutClosingHandshake
                    )
            ),
            _ => false,
        }
    }
}

/// Errors raised by the scheduler.
#[derive(Debug, Error)]
pub enum ScheduleError {
    /// A coalesced update whose key could not be decoded. The update is dropped.
    #[error("malformed update dropped (msg_type: {msg_type}): {source}")]
    MalformedUpdate {
        /// Raw type of the dropped message.
        msg_type: i32,
        /// Decoding error.
        #[source]
        source: WireError,
    },
    /// The cancellation token fired while waiting.
    #[error("operation cancelled")]
    Cancelled,
    /// The message queue is closed.
    #[error("scheduler closed")]
    Closed,
}

impl ScheduleError {
    /// Stable tag describing the failure class.
    pub fn kind(&self) -> &'static str {
        match self {
            ScheduleError::MalformedUpdate { .. } => ERR_TYPE_MSG_DROPPED,
            ScheduleError::Cancelled => ERR_TYPE_CANCELLED,
            ScheduleError::Closed => ERR_TYPE_SCHEDULER_CLOSED,
        }
    }
}
