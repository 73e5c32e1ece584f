#![warn(missing_docs)]
//! Protocol message families spoken over Hagall WebSocket connections.
//!
//! Every family shares the same header: field 1 carries the message type
//! discriminator and field 2 the time the message was sent. That header is
//! what [`Envelope`] decodes, which lets the transport route a frame without
//! knowing which concrete message it carries.

use prost_types::Timestamp;
use std::time::SystemTime;

macro_rules! impl_protocol_message {
    ($($ty:ty),* $(,)?) => {
        $(
            impl $crate::ProtocolMessage for $ty {
                fn type_tag(&self) -> i32 {
                    self.r#type
                }

                fn timestamp(&self) -> Option<&::prost_types::Timestamp> {
                    self.timestamp.as_ref()
                }
            }
        )*
    };
}

pub mod hagall;
pub mod odal;

/// Capabilities the transport needs from a protocol message.
///
/// Implemented by every message of every family, so a value can be framed
/// without knowing its concrete type.
pub trait ProtocolMessage: prost::Message + Default {
    /// Raw value of the message's `type` field.
    fn type_tag(&self) -> i32;

    /// Time the message claims to have been produced.
    fn timestamp(&self) -> Option<&Timestamp>;
}

/// A family of protocol messages sharing one type enumeration.
pub trait MessageFamily {
    /// Short family name, used in logs.
    const NAME: &'static str;

    /// Canonical name of `number` if the family defines it.
    fn type_name(number: i32) -> Option<&'static str>;
}

/// Header shared by every protocol message.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Envelope {
    /// The type of the message.
    #[prost(int32, tag = "1")]
    pub r#type: i32,
    /// The time the message is sent.
    #[prost(message, optional, tag = "2")]
    pub timestamp: ::core::option::Option<Timestamp>,
}

impl_protocol_message!(Envelope);

/// Current wall-clock time as a protobuf timestamp.
pub fn timestamp_now() -> Timestamp {
    Timestamp::from(SystemTime::now())
}

/// Whether `ts` is absent or the zero value.
pub fn is_zero_timestamp(ts: Option<&Timestamp>) -> bool {
    match ts {
        Some(ts) => ts.seconds == 0 && ts.nanos == 0,
        None => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use prost::Message;

    #[test]
    fn envelope_reads_header_of_any_family() {
        let pose = hagall::EntityUpdatePose {
            r#type: hagall::MsgType::EntityUpdatePose as i32,
            timestamp: Some(timestamp_now()),
            entity_id: 42,
            pose: Some(hagall::Pose::at(1.0, 2.0, 3.0)),
        };
        let envelope = Envelope::decode(pose.encode_to_vec().as_slice()).unwrap();
        assert_eq!(envelope.r#type, hagall::MsgType::EntityUpdatePose as i32);
        assert_eq!(envelope.timestamp, pose.timestamp);

        let state = odal::State {
            r#type: odal::MsgType::OdalState as i32,
            timestamp: Some(timestamp_now()),
            asset_instances: vec![],
        };
        let envelope = Envelope::decode(state.encode_to_vec().as_slice()).unwrap();
        assert_eq!(envelope.type_tag(), 200);
    }

    #[test]
    fn zero_timestamp_detection() {
        assert!(is_zero_timestamp(None));
        assert!(is_zero_timestamp(Some(&Timestamp::default())));
        assert!(!is_zero_timestamp(Some(&timestamp_now())));
    }
}
