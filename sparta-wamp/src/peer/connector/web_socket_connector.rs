use anyhow::{
    Error,
    Result,
};
use async_trait::async_trait;
use log::debug;
use tokio_tungstenite::{
    connect_async,
    tungstenite::{
        ClientRequestBuilder,
        http::header::SEC_WEBSOCKET_PROTOCOL,
    },
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
    serializer::serializer::SerializerType,
    transport::web_socket_transport::WebSocketClientStream,
};

#[derive(Default)]
struct WebSocketConnector {}

#[async_trait]
impl Connector<WebSocketClientStream> for WebSocketConnector {
    async fn connect(
        &self,
        config: &PeerConfig,
        address: &str,
    ) -> Result<ConnectedStream<WebSocketClientStream>> {
        let mut request = ClientRequestBuilder::new(address.try_into()?);
        if !config.agent.is_empty() {
            request = request.with_header("User-Agent", &config.agent);
        }
        for serializer in &config.serializers {
            request = request.with_sub_protocol(serializer.uri().to_string());
        }
        if let Some(web_socket) = &config.web_socket {
            for (key, value) in &web_socket.headers {
                request = request.with_header(key, value);
            }
        }

        let (stream, response) = connect_async(request).await?;
        let serializer = match response.headers().get(SEC_WEBSOCKET_PROTOCOL) {
            Some(protocol) => SerializerType::try_from(protocol.to_str()?).map_err(Error::msg)?,
            None => return Err(Error::msg("handshake did not produce a sub-protocol")),
        };
        debug!(
            "Peer {} negotiated {} with {address}",
            config.name,
            serializer.uri()
        );

        Ok(ConnectedStream { stream, serializer })
    }
}

/// A factory for generating [`Connector`]s for WebSocket connections.
#[derive(Default)]
pub struct WebSocketConnectorFactory {}

impl ConnectorFactory<WebSocketClientStream> for WebSocketConnectorFactory {
    fn new_connector(&self) -> Box<dyn Connector<WebSocketClientStream> + Send + Sync> {
        Box::new(WebSocketConnector::default())
    }
}
