use std::time::Duration;

use crate::{
    core::{
        completion::PendingResult,
        error::{
            ErrorDetails,
            WampError,
        },
        id::Id,
        types::{
            Dictionary,
            Integer,
            List,
            Value,
        },
        uri::Uri,
    },
    message::message::{
        CallMessage,
        ErrorMessage,
        Message,
        ResultMessage,
    },
    role::{
        PendingRequests,
        Role,
    },
};

/// Options for calling a procedure.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CallOptions {
    /// Asks the router to cancel the call if it takes longer than this.
    pub timeout: Option<Duration>,
}

impl CallOptions {
    fn details(&self) -> Dictionary {
        let mut options = Dictionary::default();
        if let Some(timeout) = self.timeout {
            options.insert(
                "timeout".to_owned(),
                Value::Integer(Integer::try_from(timeout.as_millis()).unwrap_or(Integer::MAX)),
            );
        }
        options
    }
}

/// A CALL request that has not been sent yet.
#[derive(Debug, Clone, PartialEq)]
pub struct CallRequest {
    pub request_id: Id,
    /// Session the request was created in, stamped by the connection.
    pub(crate) generation: u64,
    pub procedure: Uri,
    pub arguments: Option<List>,
    pub arguments_keyword: Option<Dictionary>,
    pub options: CallOptions,
}

impl CallRequest {
    pub fn message(&self) -> Message {
        Message::Call(CallMessage {
            request: self.request_id,
            options: self.options.details(),
            procedure: self.procedure.clone(),
            arguments: self.arguments.clone(),
            arguments_keyword: self.arguments_keyword.clone(),
        })
    }
}

/// The result of a procedure call.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct RpcResult {
    pub details: Dictionary,
    pub arguments: Option<List>,
    pub arguments_keyword: Option<Dictionary>,
}

/// The caller role, which calls procedures.
pub struct Caller {
    calls: PendingRequests<Uri, RpcResult>,
}

impl Caller {
    pub fn new() -> Self {
        Self {
            calls: PendingRequests::new("CALL"),
        }
    }

    pub fn create_call(
        &self,
        request_id: Id,
        procedure: Uri,
        arguments: Option<List>,
        arguments_keyword: Option<Dictionary>,
        options: CallOptions,
    ) -> CallRequest {
        CallRequest {
            request_id,
            generation: 0,
            procedure,
            arguments,
            arguments_keyword,
            options,
        }
    }

    pub fn send_call(&mut self, request: CallRequest) -> (Message, PendingResult<RpcResult>) {
        let message = request.message();
        let pending = self.calls.insert(request.request_id, request.procedure);
        (message, pending)
    }

    pub fn process_result(&mut self, message: ResultMessage) {
        if let Some(request) = self.calls.take(message.call_request) {
            request.completion.complete(Ok(RpcResult {
                details: message.details,
                arguments: message.yield_arguments,
                arguments_keyword: message.yield_arguments_keyword,
            }));
        }
    }

    pub fn process_call_error(&mut self, message: ErrorMessage) {
        if let Some(request) = self.calls.take(message.request) {
            request
                .completion
                .complete(Err(WampError::CallError(ErrorDetails::from_peer(
                    &message.details,
                    message.error,
                    message.arguments,
                    message.arguments_keyword,
                ))));
        }
    }
}

impl Default for Caller {
    fn default() -> Self {
        Self::new()
    }
}

impl Role for Caller {
    fn reset_to_initial_state(&mut self) {
        self.calls.reset();
    }

    fn pending_requests(&self) -> usize {
        self.calls.len()
    }
}
