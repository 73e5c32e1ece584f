//! Framing of protocol messages onto WebSocket connections.
//!
//! Frame format: one binary WebSocket frame per message, holding the protobuf
//! encoding of the message. Field 1 of every message is its type and field 2
//! its timestamp, which is all the receiving side decodes up front.

use crate::error::{PayloadType, WireError};
use crate::msg::Msg;
use crate::registry::TypeRegistry;
use futures::{Sink, SinkExt, Stream, StreamExt};
use std::sync::Arc;
use tokio_tungstenite::tungstenite::{self, Message};
use tracing::trace;

/// Sends and receives [`Msg`] values over a WebSocket.
///
/// Works with a whole `WebSocketStream` as well as with its split halves.
#[derive(Debug, Clone)]
pub struct WireCodec {
    registry: Arc<TypeRegistry>,
}

impl WireCodec {
    /// Create a codec naming message types through `registry`.
    pub fn new(registry: Arc<TypeRegistry>) -> Self {
        Self { registry }
    }

    /// Registry used to name message types.
    pub fn registry(&self) -> &Arc<TypeRegistry> {
        &self.registry
    }

    /// Write `msg` as a single binary frame.
    ///
    /// Returns the number of payload bytes written.
    pub async fn send<S>(&self, ws: &mut S, msg: &Msg) -> Result<usize, WireError>
    where
        S: Sink<Message, Error = tungstenite::Error> + Unpin,
    {
        let written = msg.len();

        ws.send(Message::Binary(msg.body().to_vec()))
            .await
            .map_err(|source| WireError::SendFailure {
                msg_type: msg.type_name(&self.registry).to_string(),
                source,
            })?;

        trace!(
            msg_type = %msg.type_name(&self.registry),
            bytes = written,
            "sent message"
        );
        Ok(written)
    }

    /// Read the next message.
    ///
    /// Ping and pong frames are skipped. Text frames are rejected, and the
    /// connection closing is reported as [`WireError::Closed`]. The returned
    /// message keeps the frame bytes untouched. Dropping the returned future
    /// before it completes loses no frame.
    pub async fn receive<S>(&self, ws: &mut S) -> Result<(Msg, usize), WireError>
    where
        S: Stream<Item = Result<Message, tungstenite::Error>> + Unpin,
    {
        loop {
            let frame = match ws.next().await {
                Some(frame) => frame.map_err(WireError::Receive)?,
                None => return Err(WireError::Closed),
            };

            match frame {
                Message::Binary(data) => {
                    let read = data.len();
                    let msg = Msg::from_bytes(data)?;
                    trace!(
                        msg_type = %msg.type_name(&self.registry),
                        bytes = read,
                        "received message"
                    );
                    return Ok((msg, read));
                }
                Message::Ping(_) | Message::Pong(_) => continue,
                Message::Close(_) => return Err(WireError::Closed),
                Message::Text(_) => return Err(WireError::InvalidPayloadType(PayloadType::Text)),
                Message::Frame(_) => return Err(WireError::InvalidPayloadType(PayloadType::Raw)),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::stream;
    use hagall_messages::{hagall, timestamp_now};
    use prost::Message as _;

    fn codec() -> WireCodec {
        WireCodec::new(Arc::new(TypeRegistry::standard()))
    }

    fn ping_frame(request_id: u32) -> Message {
        let ping = hagall::PingRequest {
            r#type: hagall::MsgType::PingRequest as i32,
            timestamp: Some(timestamp_now()),
            request_id,
        };
        Message::Binary(ping.encode_to_vec())
    }

    #[tokio::test]
    async fn receive_skips_control_frames() {
        let mut ws = stream::iter(vec![
            Ok(Message::Ping(vec![1])),
            Ok(Message::Pong(vec![])),
            Ok(ping_frame(5)),
        ]);

        let (msg, read) = codec().receive(&mut ws).await.unwrap();
        assert!(msg.is(hagall::MsgType::PingRequest));
        assert_eq!(read, msg.len());
        let ping: hagall::PingRequest = msg.data_to().unwrap();
        assert_eq!(ping.request_id, 5);
    }

    #[tokio::test]
    async fn receive_rejects_text_frames() {
        let mut ws = stream::iter(vec![Ok(Message::Text("hello".into()))]);
        let err = codec().receive(&mut ws).await.unwrap_err();
        assert!(matches!(err, WireError::InvalidPayloadType(PayloadType::Text)));
    }

    #[tokio::test]
    async fn receive_reports_closed_stream() {
        let mut ws = stream::iter(Vec::<Result<Message, tungstenite::Error>>::new());
        let err = codec().receive(&mut ws).await.unwrap_err();
        assert!(matches!(err, WireError::Closed));

        let mut ws = stream::iter(vec![Ok(Message::Close(None))]);
        let err = codec().receive(&mut ws).await.unwrap_err();
        assert!(matches!(err, WireError::Closed));
    }

    #[tokio::test]
    async fn receive_wraps_transport_errors() {
        let mut ws = stream::iter(vec![Err(tungstenite::Error::ConnectionClosed)]);
        let err = codec().receive(&mut ws).await.unwrap_err();
        assert!(matches!(err, WireError::Receive(_)));
        assert!(err.is_disconnect());
    }

    #[tokio::test]
    async fn send_writes_one_binary_frame() {
        let (mut tx, rx) = futures::channel::mpsc::unbounded::<Message>();
        let ping = hagall::PingRequest {
            r#type: hagall::MsgType::PingRequest as i32,
            timestamp: Some(timestamp_now()),
            request_id: 9,
        };
        let msg = Msg::from_proto(&ping).unwrap();

        let mut sink = (&mut tx).sink_map_err(|_| tungstenite::Error::ConnectionClosed);
        let written = codec().send(&mut sink, &msg).await.unwrap();
        assert_eq!(written, ping.encoded_len());

        drop(sink);
        tx.close_channel();
        let frames: Vec<_> = rx.collect().await;
        assert_eq!(frames, vec![Message::Binary(ping.encode_to_vec())]);
    }

    #[tokio::test]
    async fn send_failure_names_message_type() {
        let (mut tx, rx) = futures::channel::mpsc::unbounded::<Message>();
        drop(rx);
        let ping = hagall::PingRequest {
            r#type: hagall::MsgType::PingRequest as i32,
            timestamp: Some(timestamp_now()),
            request_id: 9,
        };
        let msg = Msg::from_proto(&ping).unwrap();

        let mut sink = (&mut tx).sink_map_err(|_| tungstenite::Error::AlreadyClosed);
        let err = codec().send(&mut sink, &msg).await.unwrap_err();
        match err {
            WireError::SendFailure { msg_type, .. } => {
                assert_eq!(msg_type, "MSG_TYPE_PING_REQUEST")
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
