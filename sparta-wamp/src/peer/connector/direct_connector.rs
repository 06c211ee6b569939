use anyhow::{
    Error,
    Result,
};
use async_trait::async_trait;
use tokio::sync::mpsc::{
    UnboundedReceiver,
    UnboundedSender,
    unbounded_channel,
};

use crate::{
    peer::{
        config::PeerConfig,
        connector::connector::{
            ConnectedStream,
            Connector,
            ConnectorFactory,
        },
    },
    transport::direct::{
        DirectTransport,
        direct_transport_pair,
    },
};

/// Creates a connector factory for in-memory connections, along with the listener that accepts
/// them.
pub fn direct_listener() -> (DirectConnectorFactory, DirectListener) {
    let (stream_tx, stream_rx) = unbounded_channel();
    (
        DirectConnectorFactory { stream_tx },
        DirectListener { stream_rx },
    )
}

/// The accepting side of in-memory connections.
pub struct DirectListener {
    stream_rx: UnboundedReceiver<DirectTransport>,
}

impl DirectListener {
    /// Waits for the next connection.
    ///
    /// Returns `None` once every connector factory is gone.
    pub async fn accept(&mut self) -> Option<DirectTransport> {
        self.stream_rx.recv().await
    }
}

struct DirectConnector {
    stream_tx: UnboundedSender<DirectTransport>,
}

#[async_trait]
impl Connector<DirectTransport> for DirectConnector {
    async fn connect(
        &self,
        config: &PeerConfig,
        _address: &str,
    ) -> Result<ConnectedStream<DirectTransport>> {
        // There is no handshake, so the most preferred serializer is used.
        let serializer = config
            .serializers
            .first()
            .copied()
            .ok_or_else(|| Error::msg("at least one serializer is required"))?;
        let (stream, remote) = direct_transport_pair();
        self.stream_tx
            .send(remote)
            .map_err(|_| Error::msg("direct listener is gone"))?;
        Ok(ConnectedStream { stream, serializer })
    }
}

/// A factory for generating [`Connector`]s for in-memory connections.
#[derive(Clone)]
pub struct DirectConnectorFactory {
    stream_tx: UnboundedSender<DirectTransport>,
}

impl ConnectorFactory<DirectTransport> for DirectConnectorFactory {
    fn new_connector(&self) -> Box<dyn Connector<DirectTransport> + Send + Sync> {
        Box::new(DirectConnector {
            stream_tx: self.stream_tx.clone(),
        })
    }
}

#[cfg(test)]
mod direct_connector_test {
    use crate::{
        peer::{
            config::PeerConfig,
            connector::{
                connector::ConnectorFactory,
                direct_connector::direct_listener,
            },
        },
        serializer::serializer::SerializerType,
    };

    #[tokio::test]
    async fn hands_remote_end_to_listener() {
        let (factory, mut listener) = direct_listener();
        let connector = factory.new_connector();
        let connected = connector
            .connect(&PeerConfig::default(), "local")
            .await
            .unwrap();
        assert_eq!(connected.serializer, SerializerType::Json);
        assert_matches::assert_matches!(listener.accept().await, Some(_));
    }

    #[tokio::test]
    async fn fails_without_listener() {
        let (factory, listener) = direct_listener();
        drop(listener);
        let connector = factory.new_connector();
        assert_matches::assert_matches!(
            connector.connect(&PeerConfig::default(), "local").await,
            Err(_)
        );
    }
}
