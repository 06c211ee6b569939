use std::time::Duration;

use ahash::{
    HashMap,
    HashSet,
};
use anyhow::{
    Error,
    Result,
};

use crate::{
    core::roles::PeerRole,
    serializer::serializer::SerializerType,
};

const DEFAULT_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "-", env!("CARGO_PKG_VERSION"));

/// Configuration for WebSocket-specific WAMP connections.
#[derive(Debug, Default, Clone)]
pub struct WebSocketConfig {
    /// Additional headers to include in the WebSocket handshake request.
    pub headers: HashMap<String, String>,
}

/// Configuration for a [`crate::peer::Peer`].
#[derive(Debug, Clone)]
pub struct PeerConfig {
    /// Name of the peer, mostly for logging.
    pub name: String,
    /// Agent name, communicated to the router.
    pub agent: String,
    /// Roles implemented by the peer.
    pub roles: HashSet<PeerRole>,
    /// Allowed serializers, in order of preference.
    ///
    /// The actual serializer will be selected when the connection with the router is established.
    pub serializers: Vec<SerializerType>,
    /// Additional configuration for WebSocket-specific connections.
    pub web_socket: Option<WebSocketConfig>,
    /// A connection that receives nothing for this long is considered broken.
    pub idle_timeout: Duration,
}

impl PeerConfig {
    pub fn validate(&self) -> Result<()> {
        if self.serializers.is_empty() {
            return Err(Error::msg("at least one serializer is required"));
        }
        if self.roles.is_empty() {
            return Err(Error::msg("at least one role is required"));
        }
        if self.idle_timeout.is_zero() {
            return Err(Error::msg("idle timeout must be positive"));
        }
        Ok(())
    }
}

impl Default for PeerConfig {
    fn default() -> Self {
        Self {
            name: DEFAULT_AGENT.to_owned(),
            agent: DEFAULT_AGENT.to_owned(),
            roles: HashSet::from_iter(PeerRole::ALL),
            serializers: Vec::from_iter([SerializerType::Json, SerializerType::MessagePack]),
            web_socket: None,
            idle_timeout: Duration::from_secs(300),
        }
    }
}
