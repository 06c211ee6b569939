use ahash::HashSet;
use anyhow::{
    Error,
    Result,
};
use log::{
    debug,
    error,
    info,
    trace,
    warn,
};

use crate::{
    connection::state::{
        ConnectionState,
        Session,
        SessionState,
        Welcome,
    },
    core::{
        close::CloseReason,
        completion::{
            Completion,
            PendingResult,
            completion,
        },
        error::WampError,
        id::{
            Id,
            IdAllocator,
            SequentialIdAllocator,
        },
        roles::{
            PeerRole,
            role_details,
        },
        types::{
            Dictionary,
            List,
            Value,
        },
        uri::Uri,
    },
    message::{
        common::{
            client_abort,
            goodbye_and_out,
            goodbye_with_close_reason,
        },
        message::{
            AbortMessage,
            ErrorMessage,
            HelloMessage,
            Message,
            WelcomeMessage,
            tag,
        },
    },
    peer::PeerConfig,
    role::{
        Role,
        callee::{
            Callee,
            Procedure,
            RegisterRequest,
            UnregisterRequest,
        },
        caller::{
            CallOptions,
            CallRequest,
            Caller,
            RpcResult,
        },
        publisher::{
            Publication,
            PublishRequest,
            Publisher,
        },
        subscriber::{
            SubscribeRequest,
            Subscriber,
            Subscription,
            UnsubscribeRequest,
        },
    },
    transport::transport::TransportHandle,
};

fn abort_description(message: &AbortMessage) -> String {
    match message.details.get("message").and_then(|message| message.string()) {
        Some(description) => format!("{description} ({})", message.reason),
        None => message.reason.to_string(),
    }
}

/// The client side of a WAMP connection.
///
/// A synchronous state machine that owns the session lifecycle, request ID allocation, and every
/// role's table of in-flight requests. All protocol state is mutated through `&mut self`, so the
/// connection must be driven by a single owner, which performs the [`TransportHandle`]'s commands
/// and reports transport events back through the `on_transport_*` methods and
/// [`Self::handle_frame`].
///
/// Asynchronous operations return a [`PendingResult`] that resolves exactly once, when the
/// matching response arrives or the connection resets.
pub struct Connection {
    name: String,
    agent: String,
    roles: HashSet<PeerRole>,
    transport: TransportHandle,

    state: ConnectionState,
    session: SessionState,
    // Bumped for every established session. Requests and invocation replies carry the
    // generation they were created in.
    generation: u64,
    stopped: bool,
    id_allocator: SequentialIdAllocator,

    starts: Vec<Completion<()>>,
    stops: Vec<Completion<()>>,
    join: Option<Completion<Welcome>>,
    leave: Option<Completion<String>>,

    subscriber: Subscriber,
    publisher: Publisher,
    caller: Caller,
    callee: Callee,
}

impl Connection {
    /// Creates a new, disconnected connection.
    pub fn new(config: &PeerConfig, transport: TransportHandle) -> Self {
        Self {
            name: config.name.clone(),
            agent: config.agent.clone(),
            roles: config.roles.clone(),
            transport,
            state: ConnectionState::default(),
            session: SessionState::default(),
            generation: 0,
            stopped: false,
            id_allocator: SequentialIdAllocator::default(),
            starts: Vec::new(),
            stops: Vec::new(),
            join: None,
            leave: None,
            subscriber: Subscriber::new(),
            publisher: Publisher::new(),
            caller: Caller::new(),
            callee: Callee::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn session_state(&self) -> &SessionState {
        &self.session
    }

    /// The current session, if one is established.
    pub fn session(&self) -> Option<&Session> {
        self.session.session()
    }

    /// The number of requests across all roles waiting for a response.
    pub fn pending_requests(&self) -> usize {
        self.subscriber.pending_requests()
            + self.publisher.pending_requests()
            + self.caller.pending_requests()
            + self.callee.pending_requests()
    }

    /// Connects the transport to the given address.
    ///
    /// Resolves when the transport reports it is connected. Dropping the result only suppresses
    /// the notification; the connection attempt continues.
    pub fn start(&mut self, address: String) -> PendingResult<()> {
        self.stopped = false;
        match self.state {
            ConnectionState::Connected => return PendingResult::ready(Ok(())),
            ConnectionState::Closing => {
                return PendingResult::ready(Err(WampError::ConnectionClosed));
            }
            ConnectionState::Connecting => (),
            ConnectionState::Disconnected => {
                info!("Connection {} connecting to {address}", self.name);
                self.transition_connection(ConnectionState::Connecting);
                self.transport.connect(address);
            }
        }
        let (completion, pending) = completion();
        self.starts.push(completion);
        pending
    }

    /// Disconnects the transport.
    ///
    /// Frames received after stopping are ignored. Resolves when the transport reports it is
    /// disconnected.
    pub fn stop(&mut self) -> PendingResult<()> {
        self.stopped = true;
        match self.state {
            ConnectionState::Disconnected => return PendingResult::ready(Ok(())),
            ConnectionState::Closing => (),
            ConnectionState::Connecting | ConnectionState::Connected => {
                info!("Connection {} stopping", self.name);
                self.transition_connection(ConnectionState::Closing);
                self.transport.disconnect();
            }
        }
        let (completion, pending) = completion();
        self.stops.push(completion);
        pending
    }

    /// Joins a realm by sending HELLO.
    ///
    /// The peer's roles and agent are added to `details`. Resolves with the router's WELCOME, or
    /// fails with [`WampError::SessionAborted`] if the router refuses.
    pub fn join(
        &mut self,
        realm: Uri,
        mut details: Dictionary,
    ) -> Result<PendingResult<Welcome>, WampError> {
        if self.state != ConnectionState::Connected {
            return Err(WampError::NoSession);
        }
        match self.session {
            SessionState::Closed => (),
            SessionState::Establishing { .. } => return Err(WampError::JoinInProgress),
            SessionState::Established(_) => return Err(WampError::AlreadyJoined),
            SessionState::Closing(_) => return Err(WampError::LeaveInProgress),
        }

        details.insert(
            "roles".to_owned(),
            Value::Dictionary(role_details(self.roles.iter().copied())),
        );
        details
            .entry("agent".to_owned())
            .or_insert_with(|| Value::String(self.agent.clone()));

        self.send_message(Message::Hello(HelloMessage {
            realm: realm.clone(),
            details,
        }));
        self.transition_session(SessionState::Establishing { realm });

        let (completion, pending) = completion();
        self.join = Some(completion);
        Ok(pending)
    }

    /// Aborts a join that is waiting for WELCOME.
    ///
    /// Returns `false` if no join is in progress.
    pub fn abort_join(&mut self) -> bool {
        if !matches!(self.session, SessionState::Establishing { .. }) {
            return false;
        }
        info!("Connection {} aborting join", self.name);
        self.send_message(client_abort());
        self.transition_session(SessionState::Closed);
        if let Some(join) = self.join.take() {
            join.complete(Err(WampError::SessionAborted(
                CloseReason::ClientAborting.uri().to_string(),
            )));
        }
        true
    }

    /// Leaves the current session by sending GOODBYE.
    ///
    /// Resolves with the reason of the router's GOODBYE.
    pub fn leave(&mut self, reason: CloseReason) -> Result<PendingResult<String>, WampError> {
        let session = match &self.session {
            SessionState::Established(session) => session.clone(),
            SessionState::Closing(_) => return Err(WampError::LeaveInProgress),
            _ => return Err(WampError::NoSession),
        };
        info!(
            "Connection {} leaving session {} on realm {}",
            self.name, session.id, session.realm
        );
        self.send_message(goodbye_with_close_reason(reason));
        self.transition_session(SessionState::Closing(session));

        let (completion, pending) = completion();
        self.leave = Some(completion);
        Ok(pending)
    }

    /// Generates a new request ID, shared by all roles.
    pub fn generate_request_id(&mut self) -> Id {
        self.id_allocator.generate_id()
    }

    /// Hands a message to the transport.
    pub fn send_message(&self, message: Message) {
        trace!("Connection {} sending message: {message:?}", self.name);
        self.transport.send(message);
    }

    /// Whether a reply bound to `generation` may still be sent.
    ///
    /// Replies are allowed while the session that produced them is established or leaving.
    pub fn is_current_session(&self, generation: u64) -> bool {
        generation == self.generation
            && matches!(
                self.session,
                SessionState::Established(_) | SessionState::Closing(_)
            )
    }

    fn require_session(&self) -> Result<(), WampError> {
        match self.session {
            SessionState::Established(_) => Ok(()),
            _ => Err(WampError::NoSession),
        }
    }

    fn require_request_session(&self, kind: &str, generation: u64) -> Result<(), WampError> {
        self.require_session()?;
        if generation != self.generation {
            debug!(
                "Connection {} rejected {kind} request created in an earlier session",
                self.name
            );
            return Err(WampError::NoSession);
        }
        Ok(())
    }

    pub fn create_subscribe(&mut self, topic: Uri) -> Result<SubscribeRequest, WampError> {
        self.require_session()?;
        let request_id = self.generate_request_id();
        let mut request = self.subscriber.create_subscribe(request_id, topic);
        request.generation = self.generation;
        Ok(request)
    }

    pub fn send_subscribe(&mut self, request: SubscribeRequest) -> PendingResult<Subscription> {
        if let Err(err) = self.require_request_session("SUBSCRIBE", request.generation) {
            return PendingResult::ready(Err(err));
        }
        let (message, pending) = self.subscriber.send_subscribe(request);
        self.send_message(message);
        pending
    }

    pub fn create_unsubscribe(&mut self, subscription: Id) -> Result<UnsubscribeRequest, WampError> {
        self.require_session()?;
        let request_id = self.generate_request_id();
        let mut request = self.subscriber.create_unsubscribe(request_id, subscription)?;
        request.generation = self.generation;
        Ok(request)
    }

    pub fn send_unsubscribe(&mut self, request: UnsubscribeRequest) -> PendingResult<()> {
        if let Err(err) = self.require_request_session("UNSUBSCRIBE", request.generation) {
            return PendingResult::ready(Err(err));
        }
        let (message, pending) = self.subscriber.send_unsubscribe(request);
        self.send_message(message);
        pending
    }

    /// Receives events for a subscription the router already has for this session.
    pub fn auto_subscribe(&mut self, id: Id, topic: Uri) -> Result<Subscription, WampError> {
        self.require_session()?;
        self.subscriber.auto_subscribe(id, topic)
    }

    pub fn create_publish(
        &mut self,
        topic: Uri,
        arguments: Option<List>,
        arguments_keyword: Option<Dictionary>,
        acknowledge: bool,
    ) -> Result<PublishRequest, WampError> {
        self.require_session()?;
        let request_id = self.generate_request_id();
        let mut request = self.publisher.create_publish(
            request_id,
            topic,
            arguments,
            arguments_keyword,
            acknowledge,
        );
        request.generation = self.generation;
        Ok(request)
    }

    /// Sends a publication.
    ///
    /// Only acknowledged publications produce a result.
    pub fn send_publish(
        &mut self,
        request: PublishRequest,
    ) -> Result<Option<PendingResult<Publication>>, WampError> {
        self.require_request_session("PUBLISH", request.generation)?;
        let (message, pending) = self.publisher.send_publish(request);
        self.send_message(message);
        Ok(pending)
    }

    pub fn create_call(
        &mut self,
        procedure: Uri,
        arguments: Option<List>,
        arguments_keyword: Option<Dictionary>,
        options: CallOptions,
    ) -> Result<CallRequest, WampError> {
        self.require_session()?;
        let request_id = self.generate_request_id();
        let mut request = self.caller.create_call(
            request_id,
            procedure,
            arguments,
            arguments_keyword,
            options,
        );
        request.generation = self.generation;
        Ok(request)
    }

    pub fn send_call(&mut self, request: CallRequest) -> PendingResult<RpcResult> {
        if let Err(err) = self.require_request_session("CALL", request.generation) {
            return PendingResult::ready(Err(err));
        }
        let (message, pending) = self.caller.send_call(request);
        self.send_message(message);
        pending
    }

    pub fn create_register(&mut self, procedure: Uri) -> Result<RegisterRequest, WampError> {
        self.require_session()?;
        let request_id = self.generate_request_id();
        let mut request = self.callee.create_register(request_id, procedure);
        request.generation = self.generation;
        Ok(request)
    }

    pub fn send_register(&mut self, request: RegisterRequest) -> PendingResult<Procedure> {
        if let Err(err) = self.require_request_session("REGISTER", request.generation) {
            return PendingResult::ready(Err(err));
        }
        let (message, pending) = self.callee.send_register(request);
        self.send_message(message);
        pending
    }

    pub fn create_unregister(&mut self, registration: Id) -> Result<UnregisterRequest, WampError> {
        self.require_session()?;
        let request_id = self.generate_request_id();
        let mut request = self.callee.create_unregister(request_id, registration)?;
        request.generation = self.generation;
        Ok(request)
    }

    pub fn send_unregister(&mut self, request: UnregisterRequest) -> PendingResult<()> {
        if let Err(err) = self.require_request_session("UNREGISTER", request.generation) {
            return PendingResult::ready(Err(err));
        }
        let (message, pending) = self.callee.send_unregister(request);
        self.send_message(message);
        pending
    }

    /// Handles a deserialized frame from the transport.
    ///
    /// Malformed messages are logged and dropped.
    pub fn handle_frame(&mut self, frame: Value) {
        if self.stopped {
            trace!("Connection {} is stopped, ignoring frame", self.name);
            return;
        }
        match Message::try_from(frame) {
            Ok(message) => self.handle_message(message),
            Err(err) => error!("Connection {} dropped malformed message: {err}", self.name),
        }
    }

    /// Handles a message from the router.
    ///
    /// Messages that are unexpected for the current state are logged and dropped.
    pub fn handle_message(&mut self, message: Message) {
        trace!("Connection {} received message: {message:?}", self.name);
        if let Err(err) = self.handle_message_on_state_machine(message) {
            error!("Connection {} dropped message: {err:#}", self.name);
        }
    }

    fn handle_message_on_state_machine(&mut self, message: Message) -> Result<()> {
        match self.session {
            SessionState::Closed => Err(Error::msg(format!(
                "received {} message without a session",
                message.message_name()
            ))),
            SessionState::Establishing { .. } => self.handle_establishing(message),
            SessionState::Established(_) => self.handle_established(message),
            SessionState::Closing(_) => self.handle_closing(message),
        }
    }

    fn handle_establishing(&mut self, message: Message) -> Result<()> {
        match message {
            Message::Welcome(message) => {
                self.establish_session(message);
                Ok(())
            }
            Message::Abort(message) => {
                let description = abort_description(&message);
                warn!(
                    "Connection {} failed to join: {description}",
                    self.name
                );
                self.transition_session(SessionState::Closed);
                if let Some(join) = self.join.take() {
                    join.complete(Err(WampError::SessionAborted(description)));
                }
                Ok(())
            }
            message => Err(Error::msg(format!(
                "received {} message on an establishing session",
                message.message_name()
            ))),
        }
    }

    fn establish_session(&mut self, message: WelcomeMessage) {
        let realm = match &self.session {
            SessionState::Establishing { realm } => realm.clone(),
            _ => return,
        };
        info!(
            "Connection {} started session {} on realm {realm}",
            self.name, message.session
        );
        self.generation += 1;
        self.transition_session(SessionState::Established(Session {
            id: message.session,
            realm,
            details: message.details.clone(),
        }));
        if let Some(join) = self.join.take() {
            join.complete(Ok(Welcome {
                session: message.session,
                details: message.details,
            }));
        }
    }

    fn handle_established(&mut self, message: Message) -> Result<()> {
        match message {
            Message::Abort(message) => {
                warn!(
                    "Connection {} session aborted by peer: {}",
                    self.name,
                    abort_description(&message)
                );
                self.end_session();
                Ok(())
            }
            Message::Goodbye(message) => {
                info!(
                    "Connection {} session closed by peer: {}",
                    self.name, message.reason
                );
                self.send_message(goodbye_and_out());
                self.end_session();
                Ok(())
            }
            message => self.dispatch_to_role(message),
        }
    }

    fn handle_closing(&mut self, message: Message) -> Result<()> {
        match message {
            Message::Goodbye(message) => {
                info!("Connection {} left session", self.name);
                self.end_session();
                if let Some(leave) = self.leave.take() {
                    leave.complete(Ok(message.reason.into()));
                }
                Ok(())
            }
            Message::Abort(message) => {
                let description = abort_description(&message);
                warn!(
                    "Connection {} session aborted by peer while leaving: {description}",
                    self.name
                );
                self.end_session();
                if let Some(leave) = self.leave.take() {
                    leave.complete(Err(WampError::SessionAborted(description)));
                }
                Ok(())
            }
            // Responses to requests sent before leaving may still arrive.
            message => self.dispatch_to_role(message),
        }
    }

    fn dispatch_to_role(&mut self, message: Message) -> Result<()> {
        match message {
            Message::Error(message) => return self.route_error(message),
            Message::Subscribed(message) => self.subscriber.process_subscribed(message),
            Message::Unsubscribed(message) => self.subscriber.process_unsubscribed(message),
            Message::Event(message) => self.subscriber.process_event(message),
            Message::Published(message) => self.publisher.process_published(message),
            Message::Result(message) => self.caller.process_result(message),
            Message::Registered(message) => self.callee.process_registered(message),
            Message::Unregistered(message) => self.callee.process_unregistered(message),
            Message::Invocation(message) => {
                self.callee
                    .process_invocation(message, &self.transport, self.generation)
            }
            message => {
                return Err(Error::msg(format!(
                    "received unexpected {} message",
                    message.message_name()
                )));
            }
        }
        Ok(())
    }

    fn route_error(&mut self, message: ErrorMessage) -> Result<()> {
        match message.request_type {
            tag::SUBSCRIBE => self.subscriber.process_subscribe_error(message),
            tag::UNSUBSCRIBE => self.subscriber.process_unsubscribe_error(message),
            tag::PUBLISH => self.publisher.process_publish_error(message),
            tag::CALL => self.caller.process_call_error(message),
            tag::REGISTER => self.callee.process_register_error(message),
            tag::UNREGISTER => self.callee.process_unregister_error(message),
            request_type => {
                return Err(Error::msg(format!(
                    "received ERROR for unsupported request type {request_type}"
                )));
            }
        }
        Ok(())
    }

    fn end_session(&mut self) {
        self.transition_session(SessionState::Closed);
        self.reset_roles();
    }

    /// Handles the transport connecting.
    pub fn on_transport_connected(&mut self) {
        if self.state != ConnectionState::Connecting {
            debug!(
                "Connection {} ignoring transport connection in state {:?}",
                self.name, self.state
            );
            return;
        }
        info!("Connection {} connected", self.name);
        self.transition_connection(ConnectionState::Connected);
        for start in self.starts.drain(..) {
            start.complete(Ok(()));
        }
    }

    /// Handles the transport disconnecting, for any reason.
    ///
    /// Every pending request fails with [`WampError::ConnectionClosed`].
    pub fn on_transport_disconnected(&mut self) {
        info!("Connection {} disconnected", self.name);
        self.transition_connection(ConnectionState::Disconnected);
        for start in self.starts.drain(..) {
            start.complete(Err(WampError::ConnectionClosed));
        }
        for stop in self.stops.drain(..) {
            stop.complete(Ok(()));
        }
        self.reset_to_initial_state();
    }

    /// Handles a transport failure by giving up on the transport.
    pub fn on_transport_error(&mut self, err: &Error) {
        error!("Connection {} transport failed: {err:#}", self.name);
        if matches!(
            self.state,
            ConnectionState::Connecting | ConnectionState::Connected
        ) {
            self.transition_connection(ConnectionState::Closing);
            self.transport.disconnect();
        }
        self.reset_to_initial_state();
    }

    /// Forgets the session and fails every pending request with
    /// [`WampError::ConnectionClosed`].
    ///
    /// Subscriptions and registrations are dropped, which closes their channels. Request IDs
    /// start over.
    pub fn reset_to_initial_state(&mut self) {
        if let Some(join) = self.join.take() {
            join.complete(Err(WampError::ConnectionClosed));
        }
        if let Some(leave) = self.leave.take() {
            leave.complete(Err(WampError::ConnectionClosed));
        }
        self.transition_session(SessionState::Closed);
        self.reset_roles();
        self.id_allocator.reset();
    }

    fn reset_roles(&mut self) {
        let roles: [&mut dyn Role; 4] = [
            &mut self.subscriber,
            &mut self.publisher,
            &mut self.caller,
            &mut self.callee,
        ];
        for role in roles {
            role.reset_to_initial_state();
        }
    }

    fn transition_connection(&mut self, state: ConnectionState) {
        if state == self.state {
            return;
        }
        if !self.state.allowed_state_transition(&state) {
            error!(
                "Connection {} cannot transition from {:?} to {state:?}",
                self.name, self.state
            );
            return;
        }
        trace!(
            "Connection {} transitioned from {:?} to {state:?}",
            self.name, self.state
        );
        self.state = state;
    }

    fn transition_session(&mut self, state: SessionState) {
        if state == self.session {
            return;
        }
        if !self.session.allowed_state_transition(&state) {
            error!(
                "Connection {} session cannot transition from {:?} to {state:?}",
                self.name, self.session
            );
            return;
        }
        trace!(
            "Connection {} session transitioned from {:?} to {state:?}",
            self.name, self.session
        );
        self.session = state;
    }
}
