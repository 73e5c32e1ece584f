#![warn(missing_docs)]
//! Test surfaces for the Hagall transport: in-memory WebSocket pairs and
//! builders for the messages tests exchange most.

mod builders;

pub use builders::*;

use tokio::io::DuplexStream;
use tokio_tungstenite::tungstenite::protocol::Role;
use tokio_tungstenite::WebSocketStream;

/// Bytes buffered in each direction of a loopback pair.
pub const LOOPBACK_BUFFER: usize = 64 * 1024;

/// WebSocket end of a loopback pair.
pub type LoopbackSocket = WebSocketStream<DuplexStream>;

/// Two connected WebSockets over an in-memory pipe, as `(server, client)`.
///
/// No handshake takes place; both ends start in the open state.
pub async fn loopback_pair() -> (LoopbackSocket, LoopbackSocket) {
    let (server_io, client_io) = tokio::io::duplex(LOOPBACK_BUFFER);
    tokio::join!(
        WebSocketStream::from_raw_socket(server_io, Role::Server, None),
        WebSocketStream::from_raw_socket(client_io, Role::Client, None),
    )
}
