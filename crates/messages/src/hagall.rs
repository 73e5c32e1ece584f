//! Core Hagall session messages.

use crate::MessageFamily;
use prost_types::Timestamp;

/// Type discriminator of Hagall messages.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
#[repr(i32)]
pub enum MsgType {
    /// An error returned in response to a request.
    ErrorResponse = 0,
    /// Latency probe.
    PingRequest = 1,
    /// Answer to a latency probe.
    PingResponse = 2,
    /// Request to join a session.
    ParticipantJoinRequest = 3,
    /// Answer to a join request.
    ParticipantJoinResponse = 4,
    /// Notifies that a participant joined.
    ParticipantJoinBroadcast = 5,
    /// Notifies that a participant left.
    ParticipantLeaveBroadcast = 6,
    /// Request to add an entity.
    EntityAddRequest = 7,
    /// Answer to an entity add request.
    EntityAddResponse = 8,
    /// Notifies that an entity was added.
    EntityAddBroadcast = 9,
    /// Request to delete an entity.
    EntityDeleteRequest = 10,
    /// Answer to an entity delete request.
    EntityDeleteResponse = 11,
    /// Notifies that an entity was deleted.
    EntityDeleteBroadcast = 12,
    /// Pose update for an entity. Coalesced per entity.
    EntityUpdatePose = 13,
    /// Notifies other participants of a pose update.
    EntityUpdatePoseBroadcast = 14,
    /// Component data update for an entity. Coalesced per component type and entity.
    EntityComponentUpdate = 15,
    /// Notifies other participants of a component update.
    EntityComponentUpdateBroadcast = 16,
}

impl MsgType {
    /// Name of the value as written in the protocol definition.
    pub fn as_str_name(&self) -> &'static str {
        match self {
            MsgType::ErrorResponse => "MSG_TYPE_ERROR_RESPONSE",
            MsgType::PingRequest => "MSG_TYPE_PING_REQUEST",
            MsgType::PingResponse => "MSG_TYPE_PING_RESPONSE",
            MsgType::ParticipantJoinRequest => "MSG_TYPE_PARTICIPANT_JOIN_REQUEST",
            MsgType::ParticipantJoinResponse => "MSG_TYPE_PARTICIPANT_JOIN_RESPONSE",
            MsgType::ParticipantJoinBroadcast => "MSG_TYPE_PARTICIPANT_JOIN_BROADCAST",
            MsgType::ParticipantLeaveBroadcast => "MSG_TYPE_PARTICIPANT_LEAVE_BROADCAST",
            MsgType::EntityAddRequest => "MSG_TYPE_ENTITY_ADD_REQUEST",
            MsgType::EntityAddResponse => "MSG_TYPE_ENTITY_ADD_RESPONSE",
            MsgType::EntityAddBroadcast => "MSG_TYPE_ENTITY_ADD_BROADCAST",
            MsgType::EntityDeleteRequest => "MSG_TYPE_ENTITY_DELETE_REQUEST",
            MsgType::EntityDeleteResponse => "MSG_TYPE_ENTITY_DELETE_RESPONSE",
            MsgType::EntityDeleteBroadcast => "MSG_TYPE_ENTITY_DELETE_BROADCAST",
            MsgType::EntityUpdatePose => "MSG_TYPE_ENTITY_UPDATE_POSE",
            MsgType::EntityUpdatePoseBroadcast => "MSG_TYPE_ENTITY_UPDATE_POSE_BROADCAST",
            MsgType::EntityComponentUpdate => "MSG_TYPE_ENTITY_COMPONENT_UPDATE",
            MsgType::EntityComponentUpdateBroadcast => {
                "MSG_TYPE_ENTITY_COMPONENT_UPDATE_BROADCAST"
            }
        }
    }
}

impl MessageFamily for MsgType {
    const NAME: &'static str = "hagall";

    fn type_name(number: i32) -> Option<&'static str> {
        MsgType::try_from(number).ok().map(|t| t.as_str_name())
    }
}

/// Position and orientation of an entity.
#[derive(Clone, Copy, PartialEq, ::prost::Message)]
pub struct Pose {
    /// X position.
    #[prost(float, tag = "1")]
    pub px: f32,
    /// Y position.
    #[prost(float, tag = "2")]
    pub py: f32,
    /// Z position.
    #[prost(float, tag = "3")]
    pub pz: f32,
    /// X component of the rotation quaternion.
    #[prost(float, tag = "4")]
    pub rx: f32,
    /// Y component of the rotation quaternion.
    #[prost(float, tag = "5")]
    pub ry: f32,
    /// Z component of the rotation quaternion.
    #[prost(float, tag = "6")]
    pub rz: f32,
    /// W component of the rotation quaternion.
    #[prost(float, tag = "7")]
    pub rw: f32,
}

impl Pose {
    /// Pose at the given position with identity rotation.
    pub fn at(px: f32, py: f32, pz: f32) -> Self {
        Self {
            px,
            py,
            pz,
            rx: 0.0,
            ry: 0.0,
            rz: 0.0,
            rw: 1.0,
        }
    }
}

/// Error returned in response to a request.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ErrorResponse {
    /// The type of the message.
    #[prost(enumeration = "MsgType", tag = "1")]
    pub r#type: i32,
    /// The time the message is sent.
    #[prost(message, optional, tag = "2")]
    pub timestamp: ::core::option::Option<Timestamp>,
    /// HTTP-like status code describing the failure.
    #[prost(uint32, tag = "3")]
    pub code: u32,
    /// Id of the request that failed.
    #[prost(uint32, tag = "1337")]
    pub request_id: u32,
}

/// Latency probe.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct PingRequest {
    /// The type of the message.
    #[prost(enumeration = "MsgType", tag = "1")]
    pub r#type: i32,
    /// The time the message is sent.
    #[prost(message, optional, tag = "2")]
    pub timestamp: ::core::option::Option<Timestamp>,
    /// Request id echoed by the response.
    #[prost(uint32, tag = "1337")]
    pub request_id: u32,
}

/// Answer to a latency probe.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct PingResponse {
    /// The type of the message.
    #[prost(enumeration = "MsgType", tag = "1")]
    pub r#type: i32,
    /// The time the message is sent.
    #[prost(message, optional, tag = "2")]
    pub timestamp: ::core::option::Option<Timestamp>,
    /// Id of the answered request.
    #[prost(uint32, tag = "1337")]
    pub request_id: u32,
}

/// Request to join a session.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ParticipantJoinRequest {
    /// The type of the message.
    #[prost(enumeration = "MsgType", tag = "1")]
    pub r#type: i32,
    /// The time the message is sent.
    #[prost(message, optional, tag = "2")]
    pub timestamp: ::core::option::Option<Timestamp>,
    /// Session to join. Empty creates a new session.
    #[prost(string, tag = "3")]
    pub session_id: ::prost::alloc::string::String,
    /// Request id echoed by the response.
    #[prost(uint32, tag = "1337")]
    pub request_id: u32,
}

/// Answer to a join request.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ParticipantJoinResponse {
    /// The type of the message.
    #[prost(enumeration = "MsgType", tag = "1")]
    pub r#type: i32,
    /// The time the message is sent.
    #[prost(message, optional, tag = "2")]
    pub timestamp: ::core::option::Option<Timestamp>,
    /// Joined session.
    #[prost(string, tag = "3")]
    pub session_id: ::prost::alloc::string::String,
    /// Id assigned to the participant.
    #[prost(uint32, tag = "4")]
    pub participant_id: u32,
    /// Id of the answered request.
    #[prost(uint32, tag = "1337")]
    pub request_id: u32,
}

/// Request to add an entity.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct EntityAddRequest {
    /// The type of the message.
    #[prost(enumeration = "MsgType", tag = "1")]
    pub r#type: i32,
    /// The time the message is sent.
    #[prost(message, optional, tag = "2")]
    pub timestamp: ::core::option::Option<Timestamp>,
    /// Initial pose.
    #[prost(message, optional, tag = "3")]
    pub pose: ::core::option::Option<Pose>,
    /// Whether the entity survives its creator leaving.
    #[prost(bool, tag = "4")]
    pub persist: bool,
    /// Request id echoed by the response.
    #[prost(uint32, tag = "1337")]
    pub request_id: u32,
}

/// Answer to an entity add request.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct EntityAddResponse {
    /// The type of the message.
    #[prost(enumeration = "MsgType", tag = "1")]
    pub r#type: i32,
    /// The time the message is sent.
    #[prost(message, optional, tag = "2")]
    pub timestamp: ::core::option::Option<Timestamp>,
    /// Id of the created entity.
    #[prost(uint32, tag = "3")]
    pub entity_id: u32,
    /// Id of the answered request.
    #[prost(uint32, tag = "1337")]
    pub request_id: u32,
}

/// Pose update for an entity.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct EntityUpdatePose {
    /// The type of the message.
    #[prost(enumeration = "MsgType", tag = "1")]
    pub r#type: i32,
    /// The time the message is sent.
    #[prost(message, optional, tag = "2")]
    pub timestamp: ::core::option::Option<Timestamp>,
    /// Updated entity.
    #[prost(uint32, tag = "3")]
    pub entity_id: u32,
    /// New pose.
    #[prost(message, optional, tag = "4")]
    pub pose: ::core::option::Option<Pose>,
}

/// Component data update for an entity.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct EntityComponentUpdate {
    /// The type of the message.
    #[prost(enumeration = "MsgType", tag = "1")]
    pub r#type: i32,
    /// The time the message is sent.
    #[prost(message, optional, tag = "2")]
    pub timestamp: ::core::option::Option<Timestamp>,
    /// Component type the data belongs to.
    #[prost(uint32, tag = "3")]
    pub entity_component_type_id: u32,
    /// Updated entity.
    #[prost(uint32, tag = "4")]
    pub entity_id: u32,
    /// Opaque component data.
    #[prost(bytes = "vec", tag = "5")]
    pub data: ::prost::alloc::vec::Vec<u8>,
}

impl_protocol_message!(
    ErrorResponse,
    PingRequest,
    PingResponse,
    ParticipantJoinRequest,
    ParticipantJoinResponse,
    EntityAddRequest,
    EntityAddResponse,
    EntityUpdatePose,
    EntityComponentUpdate,
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn type_names_follow_protocol_definition() {
        assert_eq!(
            MsgType::type_name(13),
            Some("MSG_TYPE_ENTITY_UPDATE_POSE")
        );
        assert_eq!(MsgType::type_name(0), Some("MSG_TYPE_ERROR_RESPONSE"));
        assert_eq!(MsgType::type_name(666), None);
    }

    #[test]
    fn typed_accessor_reads_raw_field() {
        let msg = EntityComponentUpdate {
            r#type: MsgType::EntityComponentUpdate as i32,
            ..Default::default()
        };
        assert_eq!(msg.r#type(), MsgType::EntityComponentUpdate);
    }
}
