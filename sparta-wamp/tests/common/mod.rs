//! A scripted router on the other end of an in-memory transport.

#![allow(dead_code)]

use std::time::Duration;

use futures_util::{
    SinkExt,
    StreamExt,
};
use sparta_wamp::{
    core::{
        id::Id,
        types::{
            Dictionary,
            Value,
        },
        uri::Uri,
    },
    message::message::{
        HelloMessage,
        Message,
        WelcomeMessage,
    },
    peer::{
        DirectListener,
        DirectPeer,
        PeerConfig,
        direct_listener,
        new_direct_peer,
    },
    serializer::{
        json::JsonSerializer,
        serializer::Serializer,
    },
    transport::{
        direct::DirectTransport,
        transport::TransportData,
    },
};

pub const REALM: &str = "com.sparta.test";

const TIMEOUT: Duration = Duration::from_secs(5);

pub fn id(value: u64) -> Id {
    Id::try_from(value).unwrap()
}

pub fn uri(value: &str) -> Uri {
    Uri::try_from(value).unwrap()
}

pub fn create_peer() -> (DirectPeer, DirectListener) {
    let (connector_factory, listener) = direct_listener();
    let peer = new_direct_peer(PeerConfig::default(), connector_factory).unwrap();
    (peer, listener)
}

/// The router's end of a connection, which the test drives message by message.
pub struct ScriptedRouter {
    transport: DirectTransport,
    serializer: JsonSerializer,
}

impl ScriptedRouter {
    pub async fn accept(listener: &mut DirectListener) -> Self {
        let transport = tokio::time::timeout(TIMEOUT, listener.accept())
            .await
            .unwrap()
            .unwrap();
        Self {
            transport,
            serializer: JsonSerializer::default(),
        }
    }

    /// Receives the next message from the peer.
    pub async fn receive(&mut self) -> Message {
        let data = tokio::time::timeout(TIMEOUT, self.transport.next())
            .await
            .unwrap()
            .unwrap()
            .unwrap();
        match data {
            TransportData::Message(bytes) => {
                Message::try_from(self.serializer.deserialize(&bytes).unwrap()).unwrap()
            }
            TransportData::Ping(_) => panic!("unexpected ping"),
        }
    }

    pub async fn send(&mut self, message: Message) {
        let bytes = self.serializer.serialize(message).unwrap();
        self.transport
            .send(TransportData::Message(bytes))
            .await
            .unwrap();
    }

    /// Sends raw JSON, which may not be a valid message.
    pub async fn send_raw(&mut self, json: &str) {
        self.transport
            .send(TransportData::Message(json.as_bytes().to_vec()))
            .await
            .unwrap();
    }

    /// Waits for the peer to close the transport.
    pub async fn closed(&mut self) {
        loop {
            match tokio::time::timeout(TIMEOUT, self.transport.next())
                .await
                .unwrap()
            {
                None => return,
                Some(Ok(TransportData::Message(_))) => continue,
                data => panic!("unexpected data while waiting for close: {data:?}"),
            }
        }
    }

    /// Answers the peer's HELLO with a WELCOME.
    pub async fn welcome(&mut self, session: u64) -> HelloMessage {
        let hello = match self.receive().await {
            Message::Hello(message) => message,
            message => panic!("expected HELLO, got {message:?}"),
        };
        self.send(Message::Welcome(WelcomeMessage {
            session: id(session),
            details: Dictionary::from_iter([(
                "roles".to_owned(),
                Value::Dictionary(Dictionary::from_iter([(
                    "broker".to_owned(),
                    Value::Dictionary(Dictionary::default()),
                )])),
            )]),
        }))
        .await;
        hello
    }
}

/// Connects a new peer and joins [`REALM`] as the given session.
pub async fn joined_peer(session: u64) -> (DirectPeer, ScriptedRouter, DirectListener) {
    let (peer, mut listener) = create_peer();
    peer.connect("local").await.unwrap();
    let mut router = ScriptedRouter::accept(&mut listener).await;
    let (welcome, _) = tokio::join!(peer.join_realm(uri(REALM)), router.welcome(session));
    assert_eq!(welcome.unwrap().session, id(session));
    (peer, router, listener)
}
