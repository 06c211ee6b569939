use std::{
    future,
    marker::PhantomData,
};

use anyhow::{
    Error,
    Result,
};
use futures_util::{
    SinkExt,
    StreamExt,
};
use log::{
    debug,
    error,
    info,
    trace,
};
use tokio::{
    sync::{
        mpsc::{
            UnboundedReceiver,
            UnboundedSender,
            unbounded_channel,
        },
        oneshot,
    },
    task::{
        JoinError,
        JoinHandle,
    },
    time::Instant,
};

use crate::{
    connection::{
        Connection,
        ConnectionState,
        Session,
        Welcome,
    },
    core::{
        close::CloseReason,
        completion::PendingResult,
        error::WampError,
        id::Id,
        types::{
            Dictionary,
            List,
        },
        uri::Uri,
    },
    message::message::Message,
    peer::{
        config::PeerConfig,
        connector::{
            ConnectedStream,
            ConnectorFactory,
        },
    },
    role::{
        callee::{
            Procedure,
            RegisterRequest,
            UnregisterRequest,
        },
        caller::{
            CallOptions,
            CallRequest,
            RpcResult,
        },
        publisher::{
            Publication,
            PublishRequest,
        },
        subscriber::{
            SubscribeRequest,
            Subscription,
            UnsubscribeRequest,
        },
    },
    serializer::serializer::{
        Serializer,
        new_serializer,
    },
    transport::transport::{
        Transport,
        TransportCommand,
        TransportData,
        TransportFactory,
        TransportHandle,
    },
};

type ConnectionCall = Box<dyn FnOnce(&mut Connection) + Send>;

/// A WAMP client peer.
///
/// The peer owns a [`Connection`] on a background task, which also drives the transport. Every
/// method is marshaled onto that task, so the peer can be shared freely between tasks.
///
/// Most operations come in two forms. The `create_*` and `send_*` pairs return a
/// [`PendingResult`] that can be awaited later or dropped to ignore the outcome. The one-shot
/// forms wait for the result directly.
///
/// Dropping the peer closes the transport and fails everything still pending with
/// [`WampError::ConnectionClosed`].
#[derive(Debug)]
pub struct Peer<S> {
    name: String,
    call_tx: UnboundedSender<ConnectionCall>,
    _stream: PhantomData<fn() -> S>,
}

impl<S> Peer<S>
where
    S: Send + 'static,
{
    /// Creates a new peer.
    ///
    /// Must be called from within a Tokio runtime, which the peer's background task is spawned
    /// on.
    pub fn new(
        config: PeerConfig,
        connector_factory: Box<dyn ConnectorFactory<S>>,
        transport_factory: Box<dyn TransportFactory<S>>,
    ) -> Result<Self> {
        config.validate()?;
        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|_| Error::msg("peer must be created within a Tokio runtime"))?;

        let (transport, command_rx) = TransportHandle::new();
        let (call_tx, call_rx) = unbounded_channel();
        let name = config.name.clone();
        let driver = Driver {
            connection: Connection::new(&config, transport),
            config,
            connector_factory,
            transport_factory,
            call_rx,
            command_rx,
            connecting: None,
            active: None,
        };
        runtime.spawn(driver.run());

        Ok(Self {
            name,
            call_tx,
            _stream: PhantomData,
        })
    }

    /// Name of the peer.
    pub fn name(&self) -> &str {
        &self.name
    }

    async fn with_connection<F, T>(&self, f: F) -> Result<T, WampError>
    where
        F: FnOnce(&mut Connection) -> T + Send + 'static,
        T: Send + 'static,
    {
        let (result_tx, result_rx) = oneshot::channel();
        self.call_tx
            .send(Box::new(move |connection| {
                result_tx.send(f(connection)).ok();
            }))
            .map_err(|_| WampError::ConnectionClosed)?;
        result_rx.await.map_err(|_| WampError::ConnectionClosed)
    }

    async fn pending<F, T>(&self, f: F) -> PendingResult<T>
    where
        F: FnOnce(&mut Connection) -> PendingResult<T> + Send + 'static,
        T: Send + 'static,
    {
        self.with_connection(f)
            .await
            .unwrap_or_else(|err| PendingResult::ready(Err(err)))
    }

    async fn try_pending<F, T>(&self, f: F) -> Result<PendingResult<T>, WampError>
    where
        F: FnOnce(&mut Connection) -> Result<PendingResult<T>, WampError> + Send + 'static,
        T: Send + 'static,
    {
        self.with_connection(f).await?
    }

    /// The current state of the underlying connection.
    pub async fn state(&self) -> ConnectionState {
        self.with_connection(|connection| connection.state())
            .await
            .unwrap_or_default()
    }

    /// The current session, if one is established.
    pub async fn session(&self) -> Option<Session> {
        self.with_connection(|connection| connection.session().cloned())
            .await
            .ok()
            .flatten()
    }

    /// Number of requests waiting for a response from the router.
    pub async fn pending_requests(&self) -> usize {
        self.with_connection(|connection| connection.pending_requests())
            .await
            .unwrap_or_default()
    }

    /// Starts connecting to a router.
    ///
    /// This only establishes the transport. It does not establish any WAMP session, so the
    /// transport can be reused across multiple sessions.
    pub async fn start(&self, address: &str) -> PendingResult<()> {
        let address = address.to_owned();
        self.pending(move |connection| connection.start(address))
            .await
    }

    /// Connects to a router, waiting for the transport to be established.
    pub async fn connect(&self, address: &str) -> Result<(), WampError> {
        self.start(address).await.await
    }

    /// Starts disconnecting from the router.
    pub async fn stop(&self) -> PendingResult<()> {
        self.pending(|connection| connection.stop()).await
    }

    /// Disconnects from the router, waiting for the transport to close.
    pub async fn disconnect(&self) -> Result<(), WampError> {
        self.stop().await.await
    }

    /// Starts joining a realm.
    pub async fn join(
        &self,
        realm: Uri,
        details: Dictionary,
    ) -> Result<PendingResult<Welcome>, WampError> {
        self.try_pending(move |connection| connection.join(realm, details))
            .await
    }

    /// Joins a realm, establishing a WAMP session.
    ///
    /// The session exists until [`Self::leave_realm`] is called, the router ends it, or the
    /// transport is lost.
    pub async fn join_realm(&self, realm: Uri) -> Result<Welcome, WampError> {
        self.join(realm, Dictionary::default()).await?.await
    }

    /// Aborts a join that is waiting for the router.
    ///
    /// Returns `false` if no join is in progress.
    pub async fn abort_join(&self) -> bool {
        self.with_connection(|connection| connection.abort_join())
            .await
            .unwrap_or(false)
    }

    /// Starts leaving the current session.
    pub async fn leave(&self, reason: CloseReason) -> Result<PendingResult<String>, WampError> {
        self.try_pending(move |connection| connection.leave(reason))
            .await
    }

    /// Leaves the current session normally, returning the router's closing reason.
    pub async fn leave_realm(&self) -> Result<String, WampError> {
        self.leave(CloseReason::Normal).await?.await
    }

    pub async fn create_subscribe(&self, topic: Uri) -> Result<SubscribeRequest, WampError> {
        self.with_connection(move |connection| connection.create_subscribe(topic))
            .await?
    }

    pub async fn send_subscribe(&self, request: SubscribeRequest) -> PendingResult<Subscription> {
        self.pending(move |connection| connection.send_subscribe(request))
            .await
    }

    /// Subscribes to a topic.
    ///
    /// The subscription's event channel closes when the peer unsubscribes or the session ends.
    pub async fn subscribe(&self, topic: Uri) -> Result<Subscription, WampError> {
        let request = self.create_subscribe(topic).await?;
        self.send_subscribe(request).await.await
    }

    pub async fn create_unsubscribe(
        &self,
        subscription: Id,
    ) -> Result<UnsubscribeRequest, WampError> {
        self.with_connection(move |connection| connection.create_unsubscribe(subscription))
            .await?
    }

    pub async fn send_unsubscribe(&self, request: UnsubscribeRequest) -> PendingResult<()> {
        self.pending(move |connection| connection.send_unsubscribe(request))
            .await
    }

    /// Removes a subscription.
    pub async fn unsubscribe(&self, subscription: Id) -> Result<(), WampError> {
        let request = self.create_unsubscribe(subscription).await?;
        self.send_unsubscribe(request).await.await
    }

    /// Receives events for a subscription the router created on the peer's behalf.
    pub async fn auto_subscribe(&self, id: Id, topic: Uri) -> Result<Subscription, WampError> {
        self.with_connection(move |connection| connection.auto_subscribe(id, topic))
            .await?
    }

    pub async fn create_publish(
        &self,
        topic: Uri,
        arguments: Option<List>,
        arguments_keyword: Option<Dictionary>,
        acknowledge: bool,
    ) -> Result<PublishRequest, WampError> {
        self.with_connection(move |connection| {
            connection.create_publish(topic, arguments, arguments_keyword, acknowledge)
        })
        .await?
    }

    pub async fn send_publish(
        &self,
        request: PublishRequest,
    ) -> Result<Option<PendingResult<Publication>>, WampError> {
        self.with_connection(move |connection| connection.send_publish(request))
            .await?
    }

    /// Publishes an event to a topic, without waiting for the router.
    pub async fn publish(
        &self,
        topic: Uri,
        arguments: Option<List>,
        arguments_keyword: Option<Dictionary>,
    ) -> Result<(), WampError> {
        let request = self
            .create_publish(topic, arguments, arguments_keyword, false)
            .await?;
        self.send_publish(request).await?;
        Ok(())
    }

    /// Publishes an event to a topic, waiting for the router to acknowledge it.
    pub async fn publish_acknowledged(
        &self,
        topic: Uri,
        arguments: Option<List>,
        arguments_keyword: Option<Dictionary>,
    ) -> Result<Publication, WampError> {
        let request = self
            .create_publish(topic, arguments, arguments_keyword, true)
            .await?;
        match self.send_publish(request).await? {
            Some(pending) => pending.await,
            None => Err(WampError::ConnectionClosed),
        }
    }

    pub async fn create_call(
        &self,
        procedure: Uri,
        arguments: Option<List>,
        arguments_keyword: Option<Dictionary>,
        options: CallOptions,
    ) -> Result<CallRequest, WampError> {
        self.with_connection(move |connection| {
            connection.create_call(procedure, arguments, arguments_keyword, options)
        })
        .await?
    }

    pub async fn send_call(&self, request: CallRequest) -> PendingResult<RpcResult> {
        self.pending(move |connection| connection.send_call(request))
            .await
    }

    /// Calls a procedure, waiting for its result.
    pub async fn call(
        &self,
        procedure: Uri,
        arguments: Option<List>,
        arguments_keyword: Option<Dictionary>,
    ) -> Result<RpcResult, WampError> {
        self.call_with_options(procedure, arguments, arguments_keyword, CallOptions::default())
            .await
    }

    /// Calls a procedure with additional options, waiting for its result.
    pub async fn call_with_options(
        &self,
        procedure: Uri,
        arguments: Option<List>,
        arguments_keyword: Option<Dictionary>,
        options: CallOptions,
    ) -> Result<RpcResult, WampError> {
        let request = self
            .create_call(procedure, arguments, arguments_keyword, options)
            .await?;
        self.send_call(request).await.await
    }

    pub async fn create_register(&self, procedure: Uri) -> Result<RegisterRequest, WampError> {
        self.with_connection(move |connection| connection.create_register(procedure))
            .await?
    }

    pub async fn send_register(&self, request: RegisterRequest) -> PendingResult<Procedure> {
        self.pending(move |connection| connection.send_register(request))
            .await
    }

    /// Registers a procedure.
    ///
    /// The procedure's invocation channel closes when the peer unregisters or the session ends.
    pub async fn register(&self, procedure: Uri) -> Result<Procedure, WampError> {
        let request = self.create_register(procedure).await?;
        self.send_register(request).await.await
    }

    pub async fn create_unregister(
        &self,
        registration: Id,
    ) -> Result<UnregisterRequest, WampError> {
        self.with_connection(move |connection| connection.create_unregister(registration))
            .await?
    }

    pub async fn send_unregister(&self, request: UnregisterRequest) -> PendingResult<()> {
        self.pending(move |connection| connection.send_unregister(request))
            .await
    }

    /// Removes a registration.
    pub async fn unregister(&self, registration: Id) -> Result<(), WampError> {
        let request = self.create_unregister(registration).await?;
        self.send_unregister(request).await.await
    }
}

struct ActiveTransport {
    transport: Box<dyn Transport>,
    serializer: Box<dyn Serializer>,
    last_received: Instant,
}

/// The background task that owns the connection and performs its transport commands.
struct Driver<S> {
    config: PeerConfig,
    connector_factory: Box<dyn ConnectorFactory<S>>,
    transport_factory: Box<dyn TransportFactory<S>>,
    connection: Connection,
    call_rx: UnboundedReceiver<ConnectionCall>,
    command_rx: UnboundedReceiver<TransportCommand>,
    connecting: Option<JoinHandle<Result<ConnectedStream<S>>>>,
    active: Option<ActiveTransport>,
}

async fn connected<S>(
    connecting: &mut Option<JoinHandle<Result<ConnectedStream<S>>>>,
) -> Result<Result<ConnectedStream<S>>, JoinError> {
    match connecting {
        Some(handle) => handle.await,
        None => future::pending().await,
    }
}

async fn next_data(active: &mut Option<ActiveTransport>) -> Option<Result<TransportData>> {
    match active {
        Some(active) => active.transport.next().await,
        None => future::pending().await,
    }
}

async fn idle(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => future::pending().await,
    }
}

impl<S> Driver<S>
where
    S: Send + 'static,
{
    async fn run(mut self) {
        loop {
            let idle_deadline = self
                .active
                .as_ref()
                .map(|active| active.last_received + self.config.idle_timeout);
            tokio::select! {
                call = self.call_rx.recv() => match call {
                    Some(call) => call(&mut self.connection),
                    None => break,
                },
                command = self.command_rx.recv() => match command {
                    Some(command) => self.perform(command).await,
                    None => break,
                },
                result = connected(&mut self.connecting) => {
                    self.connecting = None;
                    self.finish_connect(result);
                }
                data = next_data(&mut self.active) => self.handle_data(data).await,
                _ = idle(idle_deadline) => {
                    self.fail_transport(Error::msg("connection timed out")).await;
                }
            }
        }

        debug!("Peer {} dropped, shutting down", self.config.name);
        if let Some(connecting) = self.connecting.take() {
            connecting.abort();
        }
        self.close_transport().await;
    }

    async fn perform(&mut self, command: TransportCommand) {
        match command {
            TransportCommand::Connect(address) => {
                if let Some(connecting) = self.connecting.take() {
                    connecting.abort();
                }
                self.close_transport().await;
                let connector = self.connector_factory.new_connector();
                let config = self.config.clone();
                self.connecting = Some(tokio::spawn(async move {
                    connector.connect(&config, &address).await
                }));
            }
            TransportCommand::Disconnect => {
                if let Some(connecting) = self.connecting.take() {
                    connecting.abort();
                }
                self.close_transport().await;
                if self.connection.state() != ConnectionState::Disconnected {
                    self.connection.on_transport_disconnected();
                }
            }
            TransportCommand::Send(message) => self.send(message).await,
            TransportCommand::Reply {
                generation,
                message,
            } => {
                if self.connection.is_current_session(generation) {
                    self.send(message).await;
                } else {
                    debug!(
                        "Peer {} dropping {} reply from an earlier session",
                        self.config.name,
                        message.message_name()
                    );
                }
            }
        }
    }

    async fn send(&mut self, message: Message) {
        let active = match &mut self.active {
            Some(active) => active,
            None => {
                debug!(
                    "Peer {} has no transport, dropping {} message",
                    self.config.name,
                    message.message_name()
                );
                return;
            }
        };
        let bytes = match active.serializer.serialize(message) {
            Ok(bytes) => bytes,
            Err(err) => {
                error!("Peer {} failed to serialize message: {err:#}", self.config.name);
                return;
            }
        };
        if let Err(err) = active.transport.send(TransportData::Message(bytes)).await {
            self.fail_transport(err).await;
        }
    }

    fn finish_connect(&mut self, result: Result<Result<ConnectedStream<S>>, JoinError>) {
        let connected = match result.map_err(Error::new).and_then(|result| result) {
            Ok(connected) => connected,
            Err(err) => {
                self.connection.on_transport_error(&err);
                return;
            }
        };
        info!(
            "Peer {} established transport with {}",
            self.config.name,
            connected.serializer.uri()
        );
        let serializer = new_serializer(connected.serializer);
        let transport = self
            .transport_factory
            .new_transport(connected.stream, connected.serializer);
        self.active = Some(ActiveTransport {
            transport,
            serializer,
            last_received: Instant::now(),
        });
        self.connection.on_transport_connected();
    }

    async fn handle_data(&mut self, data: Option<Result<TransportData>>) {
        let active = match &mut self.active {
            Some(active) => active,
            None => return,
        };
        active.last_received = Instant::now();
        match data {
            Some(Ok(TransportData::Ping(data))) => {
                trace!("Peer {} echoing ping", self.config.name);
                if let Err(err) = active.transport.send(TransportData::Ping(data)).await {
                    self.fail_transport(err).await;
                }
            }
            Some(Ok(TransportData::Message(bytes))) => {
                match active.serializer.deserialize(&bytes) {
                    Ok(frame) => self.connection.handle_frame(frame),
                    Err(err) => {
                        error!(
                            "Peer {} received a frame that could not be deserialized: {err:#}",
                            self.config.name
                        );
                    }
                }
            }
            Some(Err(err)) => self.fail_transport(err).await,
            None => {
                self.active = None;
                if self.connection.state() != ConnectionState::Disconnected {
                    self.connection.on_transport_disconnected();
                }
            }
        }
    }

    async fn fail_transport(&mut self, err: Error) {
        self.close_transport().await;
        self.connection.on_transport_error(&err);
    }

    async fn close_transport(&mut self) {
        if let Some(mut active) = self.active.take() {
            if let Err(err) = active.transport.close().await {
                debug!(
                    "Peer {} failed to close transport cleanly: {err:#}",
                    self.config.name
                );
            }
        }
    }
}
