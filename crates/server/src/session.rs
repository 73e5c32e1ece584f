//! One WebSocket connection from accept to close.
//!
//! A session runs four loops sharing one cancellation token:
//! - the reader decodes frames and dispatches them to the scheduler,
//! - the frame driver releases coalesced updates once per frame,
//! - the consumer hands scheduled messages to the [`MessageHandler`],
//! - the writer sends whatever handlers queue through their [`Responder`].
//!
//! The reader stopping, for any reason, ends the session. The writer is the
//! last to stop: it drains replies already queued before closing the socket,
//! giving up after [`WRITER_SHUTDOWN_GRACE`] if the peer is not reading.

use crate::frame::FrameDriver;
use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use hagall_net::messages::ProtocolMessage;
use hagall_net::{Consumer, Dispatcher, Msg, ScheduleError, Scheduler, WireCodec, WireError};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::mpsc;
use tokio::time;
use tokio_tungstenite::WebSocketStream;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn, Instrument};

/// Tag for messages a handler chose not to process.
pub const ERR_TYPE_MODULE_MSG_SKIP: &str = "module_msg_skip";
/// Tag for messages that require a joined session.
pub const ERR_TYPE_SESSION_NOT_JOINED: &str = "session_not_joined";

/// Why a handler did not process a message.
#[derive(Debug, Error)]
pub enum HandleError {
    /// The handler has no interest in this message.
    #[error("message skipped: {0}")]
    Skipped(String),
    /// The message needs the participant to have joined a session first.
    #[error("participant has not joined a session")]
    SessionNotJoined,
    /// A reply could not be framed.
    #[error(transparent)]
    Wire(#[from] WireError),
    /// The connection is shutting down; no reply can be sent.
    #[error("session closed")]
    Closed,
}

impl HandleError {
    /// Stable tag describing the failure class.
    pub fn kind(&self) -> &'static str {
        match self {
            HandleError::Skipped(_) => ERR_TYPE_MODULE_MSG_SKIP,
            HandleError::SessionNotJoined => ERR_TYPE_SESSION_NOT_JOINED,
            HandleError::Wire(err) => err.kind(),
            HandleError::Closed => hagall_net::ERR_TYPE_SCHEDULER_CLOSED,
        }
    }
}

/// Time the writer keeps draining queued replies once the session is cancelled.
pub const WRITER_SHUTDOWN_GRACE: Duration = Duration::from_secs(1);

/// Queues replies for the connection a message arrived on.
///
/// Waiting for room in a full outbound queue stops when the session shuts
/// down.
#[derive(Debug, Clone)]
pub struct Responder {
    outbound: mpsc::Sender<Msg>,
    cancel: CancellationToken,
}

impl Responder {
    /// Responder feeding `outbound` until `cancel` fires.
    pub fn new(outbound: mpsc::Sender<Msg>, cancel: CancellationToken) -> Self {
        Self { outbound, cancel }
    }

    /// Frame and queue a typed message.
    pub async fn send<M: ProtocolMessage>(&self, msg: &M) -> Result<(), HandleError> {
        self.send_msg(Msg::from_proto(msg)?).await
    }

    /// Queue an already framed message.
    pub async fn send_msg(&self, msg: Msg) -> Result<(), HandleError> {
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(HandleError::Closed),
            sent = self.outbound.send(msg) => sent.map_err(|_| HandleError::Closed),
        }
    }
}

/// Server logic invoked for every scheduled message.
#[async_trait]
pub trait MessageHandler: Send + Sync + 'static {
    /// Process `msg`, replying through `responder`.
    async fn handle(&self, msg: Msg, responder: &Responder) -> Result<(), HandleError>;
}

/// Counters reported when a session ends.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionSummary {
    /// Messages read from the socket.
    pub received: u64,
    /// Messages the handler processed successfully.
    pub handled: u64,
    /// Messages written to the socket.
    pub sent: u64,
    /// Frames run.
    pub frames: u64,
    /// Scheduled messages dropped unhandled at shutdown.
    pub discarded: u64,
}

/// Per-connection settings.
///
/// Zero capacities are raised to one.
#[derive(Debug, Clone)]
pub struct SessionSettings {
    /// Capacity of the scheduler queue.
    pub queue_capacity: usize,
    /// Capacity of the outbound queue.
    pub outbound_capacity: usize,
    /// Time between frames.
    pub frame_duration: Duration,
}

/// A connected peer.
pub struct Session {
    id: u64,
    peer: SocketAddr,
    codec: WireCodec,
    handler: Arc<dyn MessageHandler>,
    settings: SessionSettings,
}

impl Session {
    /// Session `id` for `peer`.
    pub fn new(
        id: u64,
        peer: SocketAddr,
        codec: WireCodec,
        handler: Arc<dyn MessageHandler>,
        mut settings: SessionSettings,
    ) -> Self {
        settings.queue_capacity = settings.queue_capacity.max(1);
        settings.outbound_capacity = settings.outbound_capacity.max(1);
        Self {
            id,
            peer,
            codec,
            handler,
            settings,
        }
    }

    /// Serve `ws` until the peer leaves or `cancel` fires.
    #[instrument(skip_all, fields(session_id = self.id, peer = %self.peer))]
    pub async fn serve<S>(self, ws: WebSocketStream<S>, cancel: CancellationToken) -> SessionSummary
    where
        S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
    {
        let cancel = cancel.child_token();
        let (mut sink, mut stream) = ws.split();
        let (scheduler, mut consumer) = Scheduler::with_capacity(self.settings.queue_capacity);
        let (outbound_tx, mut outbound_rx) = mpsc::channel::<Msg>(self.settings.outbound_capacity);
        let responder = Responder::new(outbound_tx, cancel.clone());

        info!("Session started");

        let frames =
            FrameDriver::new(scheduler.clone(), self.settings.frame_duration).spawn(cancel.clone());

        let writer = {
            let codec = self.codec.clone();
            let cancel = cancel.clone();
            tokio::spawn(
                async move {
                    let mut sent = 0u64;
                    {
                        let drain = async {
                            while let Some(msg) = outbound_rx.recv().await {
                                if let Err(err) = codec.send(&mut sink, &msg).await {
                                    warn!(error = %err, kind = err.kind(), "Failed to send message");
                                    break;
                                }
                                sent += 1;
                            }
                            if let Err(err) = sink.close().await {
                                debug!(error = %err, "Closing websocket failed");
                            }
                        };
                        let deadline = async {
                            cancel.cancelled().await;
                            time::sleep(WRITER_SHUTDOWN_GRACE).await;
                        };
                        tokio::select! {
                            _ = drain => {}
                            _ = deadline => {
                                debug!("Peer not reading, dropping connection");
                            }
                        }
                    }
                    sent
                }
                .in_current_span(),
            )
        };

        let handling = {
            let handler = Arc::clone(&self.handler);
            let registry = Arc::clone(self.codec.registry());
            let cancel = cancel.clone();
            tokio::spawn(
                async move {
                    let mut handled = 0u64;
                    while let Ok(msg) = consumer.consume(&cancel).await {
                        let msg_type = msg.type_name(&registry);
                        let outcome = tokio::select! {
                            biased;
                            _ = cancel.cancelled() => break,
                            outcome = handler.handle(msg, &responder) => outcome,
                        };
                        match outcome {
                            Ok(()) => handled += 1,
                            Err(err @ HandleError::Skipped(_)) => {
                                debug!(%msg_type, kind = err.kind(), "{err}");
                            }
                            Err(HandleError::Closed) => {
                                cancel.cancel();
                                break;
                            }
                            Err(err) => {
                                warn!(%msg_type, kind = err.kind(), "Handling message failed: {err}");
                            }
                        }
                    }
                    consumer.close();
                    let mut discarded = 0u64;
                    while consumer.messages().try_recv().is_ok() {
                        discarded += 1;
                    }
                    if discarded > 0 {
                        debug!(discarded, "Discarded scheduled messages on shutdown");
                    }
                    (handled, discarded)
                }
                .in_current_span(),
            )
        };

        let mut received = 0u64;
        loop {
            let msg = tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                next = self.codec.receive(&mut stream) => match next {
                    Ok((msg, _)) => msg,
                    Err(err) if err.is_disconnect() => {
                        debug!(error = %err, "Peer disconnected");
                        break;
                    }
                    Err(err) => {
                        warn!(error = %err, kind = err.kind(), "Failed to receive message");
                        break;
                    }
                },
            };
            received += 1;

            match scheduler.dispatch(msg, &cancel).await {
                Ok(()) => {}
                Err(err @ ScheduleError::MalformedUpdate { .. }) => {
                    warn!(kind = err.kind(), "{err}");
                }
                Err(_) => break,
            }
        }
        cancel.cancel();

        let (handled, discarded) = handling.await.unwrap_or_default();
        let summary = SessionSummary {
            received,
            handled,
            discarded,
            frames: frames.await.unwrap_or_default(),
            sent: writer.await.unwrap_or_default(),
        };
        info!(
            received = summary.received,
            handled = summary.handled,
            discarded = summary.discarded,
            sent = summary.sent,
            frames = summary.frames,
            "Session ended"
        );
        summary
    }
}

/// Relays every message back to its sender and answers pings.
#[derive(Debug, Default, Clone, Copy)]
pub struct EchoHandler;

#[async_trait]
impl MessageHandler for EchoHandler {
    async fn handle(&self, msg: Msg, responder: &Responder) -> Result<(), HandleError> {
        use hagall_net::messages::{hagall, timestamp_now};

        if msg.is(hagall::MsgType::PingRequest) {
            let ping: hagall::PingRequest = msg.data_to()?;
            return responder
                .send(&hagall::PingResponse {
                    r#type: hagall::MsgType::PingResponse as i32,
                    timestamp: Some(timestamp_now()),
                    request_id: ping.request_id,
                })
                .await;
        }
        responder.send_msg(msg).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hagall_net::messages::hagall;
    use hagall_net::TypeRegistry;
    use hagall_testkit::{
        component_update, entity_add_request, loopback_pair, ping_request, pose_update,
    };

    fn settings() -> SessionSettings {
        SessionSettings {
            queue_capacity: 16,
            outbound_capacity: 16,
            frame_duration: Duration::from_millis(5),
        }
    }

    fn session(handler: Arc<dyn MessageHandler>) -> Session {
        Session::new(
            1,
            SocketAddr::from(([127, 0, 0, 1], 0)),
            WireCodec::new(Arc::new(TypeRegistry::standard())),
            handler,
            settings(),
        )
    }

    struct SkipAll;

    struct Slow(Duration);

    #[async_trait]
    impl MessageHandler for Slow {
        async fn handle(&self, _: Msg, _: &Responder) -> Result<(), HandleError> {
            time::sleep(self.0).await;
            Ok(())
        }
    }

    #[async_trait]
    impl MessageHandler for SkipAll {
        async fn handle(&self, msg: Msg, _: &Responder) -> Result<(), HandleError> {
            Err(HandleError::Skipped(format!("type {}", msg.msg_type())))
        }
    }

    #[test]
    fn handle_error_kinds() {
        assert_eq!(HandleError::Skipped(String::new()).kind(), "module_msg_skip");
        assert_eq!(HandleError::SessionNotJoined.kind(), "session_not_joined");
        assert_eq!(
            HandleError::Wire(WireError::MissingTimestamp(1)).kind(),
            "msg_missing_timestamp"
        );
    }

    #[tokio::test]
    async fn responder_reports_closed_connection() {
        let (tx, rx) = mpsc::channel(1);
        drop(rx);
        let err = Responder::new(tx, CancellationToken::new())
            .send(&ping_request(1))
            .await
            .unwrap_err();
        assert!(matches!(err, HandleError::Closed));
    }

    #[tokio::test]
    async fn responder_gives_up_on_full_queue_when_cancelled() {
        let (tx, _rx) = mpsc::channel(1);
        let cancel = CancellationToken::new();
        let responder = Responder::new(tx, cancel.clone());
        responder.send(&ping_request(1)).await.unwrap();

        let blocked = {
            let responder = responder.clone();
            tokio::spawn(async move { responder.send(&ping_request(2)).await })
        };
        tokio::task::yield_now().await;
        cancel.cancel();

        let err = blocked.await.unwrap().unwrap_err();
        assert!(matches!(err, HandleError::Closed));
    }

    #[test]
    fn zero_capacities_are_raised() {
        let session = Session::new(
            1,
            SocketAddr::from(([127, 0, 0, 1], 0)),
            WireCodec::new(Arc::new(TypeRegistry::standard())),
            Arc::new(EchoHandler),
            SessionSettings {
                queue_capacity: 0,
                outbound_capacity: 0,
                frame_duration: Duration::from_millis(5),
            },
        );
        assert_eq!(session.settings.queue_capacity, 1);
        assert_eq!(session.settings.outbound_capacity, 1);
    }

    #[tokio::test]
    async fn echo_session_replies_in_order() {
        let (server, mut client) = loopback_pair().await;
        let codec = WireCodec::new(Arc::new(TypeRegistry::standard()));
        let cancel = CancellationToken::new();
        let serving = tokio::spawn(session(Arc::new(EchoHandler)).serve(server, cancel.clone()));

        codec
            .send(&mut client, &Msg::from_proto(&ping_request(5)).unwrap())
            .await
            .unwrap();
        codec
            .send(&mut client, &Msg::from_proto(&entity_add_request(6)).unwrap())
            .await
            .unwrap();

        let (pong, _) = codec.receive(&mut client).await.unwrap();
        assert!(pong.is(hagall::MsgType::PingResponse));
        assert_eq!(pong.data_to::<hagall::PingResponse>().unwrap().request_id, 5);

        let (echo, _) = codec.receive(&mut client).await.unwrap();
        assert_eq!(
            echo.data_to::<hagall::EntityAddRequest>().unwrap().request_id,
            6
        );

        client.close(None).await.unwrap();
        let summary = serving.await.unwrap();
        assert_eq!(summary.received, 2);
        assert_eq!(summary.handled, 2);
        assert_eq!(summary.sent, 2);
    }

    #[tokio::test]
    async fn echo_session_coalesces_poses() {
        let (server, mut client) = loopback_pair().await;
        let codec = WireCodec::new(Arc::new(TypeRegistry::standard()));
        let cancel = CancellationToken::new();
        let serving = tokio::spawn(session(Arc::new(EchoHandler)).serve(server, cancel.clone()));

        for x in 1..=3 {
            let pose = pose_update(9, [x as f32, x as f32, x as f32]);
            codec
                .send(&mut client, &Msg::from_proto(&pose).unwrap())
                .await
                .unwrap();
        }

        // Poses may be split across frames, but the last one always arrives.
        loop {
            let (msg, _) = codec.receive(&mut client).await.unwrap();
            let update: hagall::EntityUpdatePose = msg.data_to().unwrap();
            if update.pose.unwrap().px == 3.0 {
                break;
            }
        }

        cancel.cancel();
        serving.await.unwrap();
    }

    #[tokio::test]
    async fn skipped_messages_are_not_counted() {
        let (server, mut client) = loopback_pair().await;
        let codec = WireCodec::new(Arc::new(TypeRegistry::standard()));
        let cancel = CancellationToken::new();
        let serving = tokio::spawn(session(Arc::new(SkipAll)).serve(server, cancel.clone()));

        codec
            .send(&mut client, &Msg::from_proto(&entity_add_request(1)).unwrap())
            .await
            .unwrap();
        drop(client);

        let summary = serving.await.unwrap();
        assert!(summary.received <= 1);
        assert_eq!(summary.handled, 0);
        assert_eq!(summary.sent, 0);
    }

    #[tokio::test]
    async fn session_stops_when_peer_stops_reading() {
        let (server, mut client) = loopback_pair().await;
        let codec = WireCodec::new(Arc::new(TypeRegistry::standard()));
        let cancel = CancellationToken::new();
        let session = Session::new(
            1,
            SocketAddr::from(([127, 0, 0, 1], 0)),
            codec.clone(),
            Arc::new(EchoHandler),
            SessionSettings {
                outbound_capacity: 4,
                ..settings()
            },
        );
        let serving = tokio::spawn(session.serve(server, cancel.clone()));

        // Floods the server without ever reading its echoes.
        let flooding = tokio::spawn(async move {
            for entity_id in 0..200 {
                let update = component_update(1, entity_id, vec![0; 16 * 1024]);
                let msg = Msg::from_proto(&update).unwrap();
                if codec.send(&mut client, &msg).await.is_err() {
                    break;
                }
            }
            client
        });

        time::sleep(Duration::from_millis(500)).await;
        cancel.cancel();

        let summary = time::timeout(Duration::from_secs(3), serving)
            .await
            .expect("session did not stop")
            .unwrap();
        assert!(summary.received > 0);
        flooding.abort();
    }

    #[tokio::test]
    async fn unhandled_messages_are_counted_on_shutdown() {
        let (server, mut client) = loopback_pair().await;
        let codec = WireCodec::new(Arc::new(TypeRegistry::standard()));
        let cancel = CancellationToken::new();
        let serving = tokio::spawn(
            session(Arc::new(Slow(Duration::from_millis(200)))).serve(server, cancel.clone()),
        );

        for request_id in 0..10 {
            codec
                .send(&mut client, &Msg::from_proto(&entity_add_request(request_id)).unwrap())
                .await
                .unwrap();
        }
        client.close(None).await.unwrap();

        let summary = serving.await.unwrap();
        assert_eq!(summary.received, 10);
        assert!(summary.discarded > 0);
        assert!(summary.handled + summary.discarded <= summary.received);
    }
}
