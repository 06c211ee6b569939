use anyhow::Result;

use crate::{
    peer::{
        PeerConfig,
        WebSocketConnectorFactory,
        peer::Peer,
    },
    transport::web_socket_transport::{
        WebSocketClientStream,
        WebSocketTransportFactory,
    },
};

/// A WAMP peer over a WebSocket stream.
pub type WebSocketPeer = Peer<WebSocketClientStream>;

/// Creates a new [`WebSocketPeer`].
pub fn new_web_socket_peer(config: PeerConfig) -> Result<WebSocketPeer> {
    Peer::new(
        config,
        Box::new(WebSocketConnectorFactory::default()),
        Box::new(WebSocketTransportFactory::default()),
    )
}
