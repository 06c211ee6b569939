use std::fmt::Debug;

use anyhow::{
    Error,
    Result,
};
use futures_util::{
    Sink,
    Stream,
};
use log::debug;
use tokio::sync::mpsc::{
    UnboundedReceiver,
    UnboundedSender,
    unbounded_channel,
};

use crate::{
    message::message::Message,
    serializer::serializer::SerializerType,
};

/// Data received from a [`Transport`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportData {
    /// Data that should be perceived as a health check and immediately sent back to the sender.
    Ping(Vec<u8>),
    /// Data representing a meaningful WAMP message.
    Message(Vec<u8>),
}

/// A transport, over which WAMP messages can be sent and received.
///
/// Implemented as a [`Stream`] and [`Sink`] that extracts out meaningful data and reports protocol
/// violations to be handled at higher layers. The end of the stream means the other side
/// disconnected.
pub trait Transport:
    Send + Stream<Item = Result<TransportData>> + Sink<TransportData, Error = Error> + Unpin + Debug
{
}

/// A factory for creating a new [`Transport`].
pub trait TransportFactory<S>: Send + Sync {
    /// Creates a new [`Transport`] for WAMP messaging.
    fn new_transport(&self, stream: S, serializer_type: SerializerType) -> Box<dyn Transport>;
}

/// A request from the connection to whatever drives its transport.
#[derive(Debug, Clone, PartialEq)]
pub enum TransportCommand {
    /// Connect to the given address.
    Connect(String),
    /// Close the current transport connection.
    Disconnect,
    /// Send a message over the current transport connection.
    Send(Message),
    /// Send a reply that belongs to the given session generation. Dropped if that session is no
    /// longer current.
    Reply { generation: u64, message: Message },
}

/// The connection's side of the transport contract.
///
/// Commands are queued and performed in order by the transport driver, which reports back
/// through the connection's `on_transport_*` methods.
#[derive(Debug, Clone)]
pub struct TransportHandle {
    command_tx: UnboundedSender<TransportCommand>,
}

impl TransportHandle {
    /// Creates a new handle, along with the receiver the transport driver reads commands from.
    pub fn new() -> (Self, UnboundedReceiver<TransportCommand>) {
        let (command_tx, command_rx) = unbounded_channel();
        (Self { command_tx }, command_rx)
    }

    pub fn connect(&self, address: String) {
        self.command(TransportCommand::Connect(address))
    }

    pub fn disconnect(&self) {
        self.command(TransportCommand::Disconnect)
    }

    pub fn send(&self, message: Message) {
        self.command(TransportCommand::Send(message))
    }

    pub fn reply(&self, generation: u64, message: Message) {
        self.command(TransportCommand::Reply {
            generation,
            message,
        })
    }

    fn command(&self, command: TransportCommand) {
        if let Err(err) = self.command_tx.send(command) {
            debug!("Transport driver is gone, dropping {:?}", err.0);
        }
    }
}
