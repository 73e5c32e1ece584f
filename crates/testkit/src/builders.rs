use hagall_messages::{hagall, odal, timestamp_now};
use prost_types::Timestamp;

/// Timestamp `seconds` after the Unix epoch.
pub fn timestamp_at(seconds: i64) -> Timestamp {
    Timestamp { seconds, nanos: 0 }
}

/// Ping request stamped now.
pub fn ping_request(request_id: u32) -> hagall::PingRequest {
    hagall::PingRequest {
        r#type: hagall::MsgType::PingRequest as i32,
        timestamp: Some(timestamp_now()),
        request_id,
    }
}

/// Request to join `session_id`, stamped now.
pub fn join_request(request_id: u32, session_id: &str) -> hagall::ParticipantJoinRequest {
    hagall::ParticipantJoinRequest {
        r#type: hagall::MsgType::ParticipantJoinRequest as i32,
        timestamp: Some(timestamp_now()),
        session_id: session_id.to_owned(),
        request_id,
    }
}

/// Request to add a non-persistent entity at the origin, stamped now.
pub fn entity_add_request(request_id: u32) -> hagall::EntityAddRequest {
    hagall::EntityAddRequest {
        r#type: hagall::MsgType::EntityAddRequest as i32,
        timestamp: Some(timestamp_now()),
        pose: Some(hagall::Pose::at(0.0, 0.0, 0.0)),
        persist: false,
        request_id,
    }
}

/// Pose update moving `entity_id` to `position`, stamped now.
pub fn pose_update(entity_id: u32, position: [f32; 3]) -> hagall::EntityUpdatePose {
    let [px, py, pz] = position;
    hagall::EntityUpdatePose {
        r#type: hagall::MsgType::EntityUpdatePose as i32,
        timestamp: Some(timestamp_now()),
        entity_id,
        pose: Some(hagall::Pose::at(px, py, pz)),
    }
}

/// Component update carrying `data`, stamped now.
pub fn component_update(
    entity_component_type_id: u32,
    entity_id: u32,
    data: Vec<u8>,
) -> hagall::EntityComponentUpdate {
    hagall::EntityComponentUpdate {
        r#type: hagall::MsgType::EntityComponentUpdate as i32,
        timestamp: Some(timestamp_now()),
        entity_component_type_id,
        entity_id,
        data,
    }
}

/// Odal request to attach `asset_id` to `entity_id`, stamped now.
pub fn asset_instance_add_request(
    request_id: u32,
    entity_id: u32,
    asset_id: &str,
) -> odal::AssetInstanceAddRequest {
    odal::AssetInstanceAddRequest {
        r#type: odal::MsgType::OdalAssetInstanceAddRequest as i32,
        timestamp: Some(timestamp_now()),
        request_id,
        entity_id,
        asset_id: asset_id.to_owned(),
    }
}
