mod connector;
mod direct_connector;
mod web_socket_connector;

pub use connector::{
    ConnectedStream,
    Connector,
    ConnectorFactory,
};
pub use direct_connector::{
    DirectConnectorFactory,
    DirectListener,
    direct_listener,
};
pub use web_socket_connector::WebSocketConnectorFactory;
