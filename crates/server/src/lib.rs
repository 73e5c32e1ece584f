#![warn(missing_docs)]
//! Frame-paced WebSocket relay server.

mod config;
mod frame;
mod logging;
mod session;

pub use config::{ServerConfig, DEFAULT_CONFIG_PATH};
pub use frame::FrameDriver;
pub use logging::{
    init_logging, LogFormat, TAG_APP_KEY, TAG_CLIENT_ID, TAG_PARTICIPANT_ID, TAG_SESSION_ID,
};
pub use session::{
    EchoHandler, HandleError, MessageHandler, Responder, Session, SessionSettings,
    SessionSummary, ERR_TYPE_MODULE_MSG_SKIP, ERR_TYPE_SESSION_NOT_JOINED, WRITER_SHUTDOWN_GRACE,
};

use anyhow::{Context, Result};
use hagall_net::{TypeRegistry, WireCodec};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinSet;
use tokio_tungstenite::tungstenite::protocol::WebSocketConfig;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

/// Accepts WebSocket connections and serves each one as a [`Session`].
pub struct Server {
    listener: TcpListener,
    config: ServerConfig,
    codec: WireCodec,
    handler: Arc<dyn MessageHandler>,
}

impl Server {
    /// Bind the listener described by `config`, replacing unusable values
    /// with defaults.
    pub async fn bind(config: ServerConfig, handler: Arc<dyn MessageHandler>) -> Result<Self> {
        let config = config.sanitized();
        let listener = TcpListener::bind(config.listen_addr)
            .await
            .with_context(|| format!("Failed to bind {}", config.listen_addr))?;
        info!("Server bound to {}", listener.local_addr()?);

        Ok(Self {
            listener,
            config,
            codec: WireCodec::new(Arc::new(TypeRegistry::standard())),
            handler,
        })
    }

    /// Replace the registry used to name message types in logs.
    pub fn with_registry(mut self, registry: Arc<TypeRegistry>) -> Self {
        self.codec = WireCodec::new(registry);
        self
    }

    /// Effective configuration.
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Address the listener is bound to.
    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Accept connections until `cancel` fires, then wait for open sessions to end.
    #[instrument(skip_all, fields(addr = %self.config.listen_addr))]
    pub async fn run(self, cancel: CancellationToken) -> Result<()> {
        let mut sessions = JoinSet::new();
        let mut next_id = 0u64;

        loop {
            let accepted = tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                accepted = self.listener.accept() => accepted,
                Some(done) = sessions.join_next(), if !sessions.is_empty() => {
                    if let Err(err) = done {
                        warn!("Session task failed: {err}");
                    }
                    continue;
                }
            };

            let (stream, peer) = match accepted {
                Ok(conn) => conn,
                Err(err) => {
                    warn!("Failed to accept connection: {err}");
                    continue;
                }
            };

            next_id += 1;
            debug!(session_id = next_id, %peer, "Accepted connection");
            let session = Session::new(
                next_id,
                peer,
                self.codec.clone(),
                Arc::clone(&self.handler),
                self.session_settings(),
            );
            let ws_config = self.websocket_config();
            let cancel = cancel.clone();
            sessions.spawn(async move {
                if let Err(err) = serve_connection(session, stream, ws_config, cancel).await {
                    warn!(%peer, "{err:#}");
                }
            });
        }

        info!(open = sessions.len(), "Server shutting down");
        while let Some(done) = sessions.join_next().await {
            if let Err(err) = done {
                warn!("Session task failed: {err}");
            }
        }
        Ok(())
    }

    fn session_settings(&self) -> SessionSettings {
        SessionSettings {
            queue_capacity: self.config.queue_capacity,
            outbound_capacity: self.config.outbound_capacity,
            frame_duration: self.config.frame_duration(),
        }
    }

    fn websocket_config(&self) -> WebSocketConfig {
        let mut ws_config = WebSocketConfig::default();
        ws_config.max_frame_size = Some(self.config.max_frame_size);
        ws_config.max_message_size = Some(self.config.max_frame_size);
        ws_config
    }
}

async fn serve_connection(
    session: Session,
    stream: TcpStream,
    ws_config: WebSocketConfig,
    cancel: CancellationToken,
) -> Result<()> {
    if let Err(err) = stream.set_nodelay(true) {
        debug!("Failed to disable Nagle: {err}");
    }
    let ws = tokio_tungstenite::accept_async_with_config(stream, Some(ws_config))
        .await
        .context("WebSocket handshake failed")?;
    session.serve(ws, cancel).await;
    Ok(())
}
