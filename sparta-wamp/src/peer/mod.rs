pub mod config;
mod connector;
mod direct_peer;
mod peer;
mod web_socket_peer;

pub use config::{
    PeerConfig,
    WebSocketConfig,
};
pub use connector::{
    ConnectedStream,
    Connector,
    ConnectorFactory,
    DirectConnectorFactory,
    DirectListener,
    WebSocketConnectorFactory,
    direct_listener,
};
pub use direct_peer::{
    DirectPeer,
    new_direct_peer,
};
pub use peer::Peer;
pub use web_socket_peer::{
    WebSocketPeer,
    new_web_socket_peer,
};

pub use crate::role::{
    callee::{
        Invocation,
        Procedure,
        RpcYield,
    },
    caller::{
        CallOptions,
        RpcResult,
    },
    publisher::Publication,
    subscriber::{
        Event,
        Subscription,
    },
};
