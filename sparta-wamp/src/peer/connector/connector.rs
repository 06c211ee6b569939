use anyhow::Result;
use async_trait::async_trait;

use crate::{
    peer::config::PeerConfig,
    serializer::serializer::SerializerType,
};

/// A stream to a WAMP router produced by a [`Connector`].
#[derive(Debug)]
pub struct ConnectedStream<S> {
    pub stream: S,
    /// The serializer negotiated with the router.
    pub serializer: SerializerType,
}

/// A type for initiating a connection to a router.
#[async_trait]
pub trait Connector<S> {
    async fn connect(&self, config: &PeerConfig, address: &str) -> Result<ConnectedStream<S>>;
}

/// A type for generating a new [`Connector`].
pub trait ConnectorFactory<S>: Send + Sync {
    /// Creates a new [`Connector`].
    fn new_connector(&self) -> Box<dyn Connector<S> + Send + Sync>;
}
