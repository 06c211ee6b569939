use anyhow::Result;

use crate::{
    peer::{
        DirectConnectorFactory,
        PeerConfig,
        peer::Peer,
    },
    transport::direct::{
        DirectTransport,
        DirectTransportFactory,
    },
};

/// A WAMP peer over an in-memory stream, mostly for testing against a local router.
pub type DirectPeer = Peer<DirectTransport>;

/// Creates a new [`DirectPeer`] that connects through the given factory.
///
/// The other side of each connection is handed to the factory's
/// [`crate::peer::DirectListener`].
pub fn new_direct_peer(
    config: PeerConfig,
    connector_factory: DirectConnectorFactory,
) -> Result<DirectPeer> {
    Peer::new(
        config,
        Box::new(connector_factory),
        Box::new(DirectTransportFactory::default()),
    )
}
