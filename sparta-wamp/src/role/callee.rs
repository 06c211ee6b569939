use ahash::HashMap;
use log::{
    debug,
    warn,
};
use tokio::sync::mpsc::{
    UnboundedReceiver,
    UnboundedSender,
    unbounded_channel,
};

use crate::{
    core::{
        completion::PendingResult,
        error::{
            ErrorDetails,
            InvocationError,
            WampError,
        },
        id::Id,
        types::{
            Dictionary,
            List,
        },
        uri::Uri,
    },
    message::{
        common::invocation_error,
        message::{
            ErrorMessage,
            InvocationMessage,
            Message,
            RegisterMessage,
            RegisteredMessage,
            UnregisterMessage,
            UnregisteredMessage,
            YieldMessage,
        },
    },
    role::{
        PendingRequests,
        Role,
    },
    transport::transport::TransportHandle,
};

/// The result of a procedure invocation, produced by the callee.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct RpcYield {
    pub arguments: Option<List>,
    pub arguments_keyword: Option<Dictionary>,
}

/// An invocation of a registered procedure.
///
/// Must be answered with [`Self::respond`]. An invocation dropped without a response is
/// answered with a `wamp.error.runtime_error`.
#[derive(Debug)]
pub struct Invocation {
    pub request_id: Id,
    pub registration: Id,
    pub details: Dictionary,
    pub arguments: Option<List>,
    pub arguments_keyword: Option<Dictionary>,
    generation: u64,
    reply: Option<TransportHandle>,
}

impl Invocation {
    /// Sends the result of the invocation back to the router, as a YIELD or ERROR.
    pub fn respond(mut self, result: Result<RpcYield, InvocationError>) {
        if let Some(reply) = self.reply.take() {
            reply.reply(self.generation, Self::response(self.request_id, result));
        }
    }

    fn response(request_id: Id, result: Result<RpcYield, InvocationError>) -> Message {
        match result {
            Ok(rpc_yield) => Message::Yield(YieldMessage {
                invocation_request: request_id,
                options: Dictionary::default(),
                arguments: rpc_yield.arguments,
                arguments_keyword: rpc_yield.arguments_keyword,
            }),
            Err(err) => invocation_error(request_id, err),
        }
    }
}

impl Drop for Invocation {
    fn drop(&mut self) {
        if let Some(reply) = self.reply.take() {
            debug!(
                "Invocation {} dropped without a response",
                self.request_id
            );
            reply.reply(
                self.generation,
                invocation_error(
                    self.request_id,
                    InvocationError::runtime_error("invocation dropped without a response"),
                ),
            );
        }
    }
}

/// A registered procedure.
///
/// Invocations are received on [`Self::invocations`]. The channel closes when the procedure is
/// unregistered or the connection is lost.
#[derive(Debug)]
pub struct Procedure {
    /// Registration ID assigned by the router.
    pub id: Id,
    pub procedure: Uri,
    pub invocations: UnboundedReceiver<Invocation>,
}

/// A REGISTER request that has not been sent yet.
#[derive(Debug, Clone, PartialEq)]
pub struct RegisterRequest {
    pub request_id: Id,
    /// Session the request was created in, stamped by the connection.
    pub(crate) generation: u64,
    pub procedure: Uri,
}

impl RegisterRequest {
    pub fn message(&self) -> Message {
        Message::Register(RegisterMessage {
            request: self.request_id,
            options: Dictionary::default(),
            procedure: self.procedure.clone(),
        })
    }
}

/// An UNREGISTER request that has not been sent yet.
#[derive(Debug, Clone, PartialEq)]
pub struct UnregisterRequest {
    pub request_id: Id,
    /// Session the request was created in, stamped by the connection.
    pub(crate) generation: u64,
    pub registration: Id,
}

impl UnregisterRequest {
    pub fn message(&self) -> Message {
        Message::Unregister(UnregisterMessage {
            request: self.request_id,
            registered_registration: self.registration,
        })
    }
}

struct Registration {
    procedure: Uri,
    invocation_tx: UnboundedSender<Invocation>,
}

/// The callee role, which handles invocations of registered procedures.
pub struct Callee {
    registers: PendingRequests<Uri, Procedure>,
    unregisters: PendingRequests<Id, ()>,
    registrations: HashMap<Id, Registration>,
}

impl Callee {
    pub fn new() -> Self {
        Self {
            registers: PendingRequests::new("REGISTER"),
            unregisters: PendingRequests::new("UNREGISTER"),
            registrations: HashMap::default(),
        }
    }

    pub fn create_register(&self, request_id: Id, procedure: Uri) -> RegisterRequest {
        RegisterRequest {
            request_id,
            generation: 0,
            procedure,
        }
    }

    pub fn send_register(&mut self, request: RegisterRequest) -> (Message, PendingResult<Procedure>) {
        let message = request.message();
        let pending = self.registers.insert(request.request_id, request.procedure);
        (message, pending)
    }

    pub fn create_unregister(
        &self,
        request_id: Id,
        registration: Id,
    ) -> Result<UnregisterRequest, WampError> {
        if !self.registrations.contains_key(&registration) {
            return Err(WampError::UnregisterError(ErrorDetails::local(format!(
                "registration {registration} does not exist"
            ))));
        }
        Ok(UnregisterRequest {
            request_id,
            generation: 0,
            registration,
        })
    }

    pub fn send_unregister(&mut self, request: UnregisterRequest) -> (Message, PendingResult<()>) {
        let message = request.message();
        let pending = self
            .unregisters
            .insert(request.request_id, request.registration);
        (message, pending)
    }

    /// The procedure of an active registration.
    pub fn registered_procedure(&self, id: Id) -> Option<&Uri> {
        self.registrations
            .get(&id)
            .map(|registration| &registration.procedure)
    }

    pub fn process_registered(&mut self, message: RegisteredMessage) {
        let request = match self.registers.take(message.register_request) {
            Some(request) => request,
            None => return,
        };
        let (invocation_tx, invocations) = unbounded_channel();
        // A canceled registration is still kept, so that its invocations are answered.
        self.registrations.insert(
            message.registration,
            Registration {
                procedure: request.context.clone(),
                invocation_tx,
            },
        );
        request.completion.complete(Ok(Procedure {
            id: message.registration,
            procedure: request.context,
            invocations,
        }));
    }

    pub fn process_unregistered(&mut self, message: UnregisteredMessage) {
        if let Some(request) = self.unregisters.take(message.unregister_request) {
            self.registrations.remove(&request.context);
            request.completion.complete(Ok(()));
        }
    }

    /// Delivers an invocation to its procedure.
    ///
    /// Invocations that cannot be delivered are answered with an ERROR immediately. Replies are
    /// bound to `generation`, the session the invocation arrived in.
    pub fn process_invocation(
        &mut self,
        message: InvocationMessage,
        reply: &TransportHandle,
        generation: u64,
    ) {
        let registration = match self.registrations.get(&message.registered_registration) {
            Some(registration) => registration,
            None => {
                warn!(
                    "Received INVOCATION for unknown registration {}",
                    message.registered_registration
                );
                reply.reply(
                    generation,
                    invocation_error(
                        message.request,
                        InvocationError::new(
                            Uri::from_known("wamp.error.no_such_registration"),
                            format!(
                                "registration {} does not exist",
                                message.registered_registration
                            ),
                        ),
                    ),
                );
                return;
            }
        };
        let invocation = Invocation {
            request_id: message.request,
            registration: message.registered_registration,
            details: message.details,
            arguments: message.call_arguments,
            arguments_keyword: message.call_arguments_keyword,
            generation,
            reply: Some(reply.clone()),
        };
        if let Err(err) = registration.invocation_tx.send(invocation) {
            debug!(
                "Procedure {} is no longer handled",
                registration.procedure
            );
            err.0.respond(Err(InvocationError::new(
                Uri::from_known("wamp.error.unavailable"),
                format!("procedure {} is no longer handled", registration.procedure),
            )));
        }
    }

    pub fn process_register_error(&mut self, message: ErrorMessage) {
        if let Some(request) = self.registers.take(message.request) {
            request
                .completion
                .complete(Err(WampError::RegisterError(ErrorDetails::from_peer(
                    &message.details,
                    message.error,
                    message.arguments,
                    message.arguments_keyword,
                ))));
        }
    }

    pub fn process_unregister_error(&mut self, message: ErrorMessage) {
        if let Some(request) = self.unregisters.take(message.request) {
            request
                .completion
                .complete(Err(WampError::UnregisterError(ErrorDetails::from_peer(
                    &message.details,
                    message.error,
                    message.arguments,
                    message.arguments_keyword,
                ))));
        }
    }
}

impl Default for Callee {
    fn default() -> Self {
        Self::new()
    }
}

impl Role for Callee {
    fn reset_to_initial_state(&mut self) {
        self.registers.reset();
        self.unregisters.reset();
        self.registrations.clear();
    }

    fn pending_requests(&self) -> usize {
        self.registers.len() + self.unregisters.len()
    }
}
