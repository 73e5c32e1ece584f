//! Odal module messages: asset instances attached to session entities.

use crate::MessageFamily;
use prost_types::Timestamp;

/// Type discriminator of Odal messages.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
#[repr(i32)]
pub enum MsgType {
    /// An error returned in response to a request.
    ErrorResponse = 0,
    /// Full Odal state of a session.
    OdalState = 200,
    /// Request to add an asset instance.
    OdalAssetInstanceAddRequest = 201,
    /// Answer to an asset instance add request.
    OdalAssetInstanceAddResponse = 202,
    /// Notifies that an asset instance was added.
    OdalAssetInstanceAddBroadcast = 203,
}

impl MsgType {
    /// Name of the value as written in the protocol definition.
    pub fn as_str_name(&self) -> &'static str {
        match self {
            MsgType::ErrorResponse => "MSG_TYPE_ERROR_RESPONSE",
            MsgType::OdalState => "MSG_TYPE_ODAL_STATE",
            MsgType::OdalAssetInstanceAddRequest => "MSG_TYPE_ODAL_ASSET_INSTANCE_ADD_REQUEST",
            MsgType::OdalAssetInstanceAddResponse => "MSG_TYPE_ODAL_ASSET_INSTANCE_ADD_RESPONSE",
            MsgType::OdalAssetInstanceAddBroadcast => {
                "MSG_TYPE_ODAL_ASSET_INSTANCE_ADD_BROADCAST"
            }
        }
    }
}

impl MessageFamily for MsgType {
    const NAME: &'static str = "odal";

    fn type_name(number: i32) -> Option<&'static str> {
        MsgType::try_from(number).ok().map(|t| t.as_str_name())
    }
}

/// An asset placed on an entity.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct AssetInstance {
    /// Asset instance id.
    #[prost(uint32, tag = "1")]
    pub id: u32,
    /// Id of the instantiated asset.
    #[prost(string, tag = "2")]
    pub asset_id: ::prost::alloc::string::String,
    /// Participant that added the instance.
    #[prost(uint32, tag = "3")]
    pub participant_id: u32,
    /// Entity the instance is attached to.
    #[prost(uint32, tag = "4")]
    pub entity_id: u32,
}

/// Full Odal state of a session.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct State {
    /// The type of the message.
    #[prost(enumeration = "MsgType", tag = "1")]
    pub r#type: i32,
    /// The time the message is sent.
    #[prost(message, optional, tag = "2")]
    pub timestamp: ::core::option::Option<Timestamp>,
    /// Every asset instance of the session.
    #[prost(message, repeated, tag = "3")]
    pub asset_instances: ::prost::alloc::vec::Vec<AssetInstance>,
}

/// Request to add an asset instance to an entity.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct AssetInstanceAddRequest {
    /// The type of the message.
    #[prost(enumeration = "MsgType", tag = "1")]
    pub r#type: i32,
    /// The time the message is sent.
    #[prost(message, optional, tag = "2")]
    pub timestamp: ::core::option::Option<Timestamp>,
    /// Request id echoed by the response.
    #[prost(uint32, tag = "1337")]
    pub request_id: u32,
    /// Entity receiving the instance.
    #[prost(uint32, tag = "3")]
    pub entity_id: u32,
    /// Asset to instantiate.
    #[prost(string, tag = "4")]
    pub asset_id: ::prost::alloc::string::String,
}

/// Answer to an asset instance add request.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct AssetInstanceAddResponse {
    /// The type of the message.
    #[prost(enumeration = "MsgType", tag = "1")]
    pub r#type: i32,
    /// The time the message is sent.
    #[prost(message, optional, tag = "2")]
    pub timestamp: ::core::option::Option<Timestamp>,
    /// Id of the answered request.
    #[prost(uint32, tag = "1337")]
    pub request_id: u32,
    /// Id of the created instance.
    #[prost(uint32, tag = "3")]
    pub asset_instance_id: u32,
}

/// Notifies that an asset instance was added.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct AssetInstanceAddBroadcast {
    /// The type of the message.
    #[prost(enumeration = "MsgType", tag = "1")]
    pub r#type: i32,
    /// The time the message is sent.
    #[prost(message, optional, tag = "2")]
    pub timestamp: ::core::option::Option<Timestamp>,
    /// Time the originating request was sent.
    #[prost(message, optional, tag = "3")]
    pub origin_timestamp: ::core::option::Option<Timestamp>,
    /// The added instance.
    #[prost(message, optional, tag = "4")]
    pub asset_instance: ::core::option::Option<AssetInstance>,
}

impl_protocol_message!(
    State,
    AssetInstanceAddRequest,
    AssetInstanceAddResponse,
    AssetInstanceAddBroadcast,
);
