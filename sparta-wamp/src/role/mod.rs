//! Client roles.
//!
//! Each role owns its tables of in-flight requests, keyed by request ID, and resolves each
//! request exactly once when its response arrives or when the connection resets.

pub mod callee;
pub mod caller;
pub mod publisher;
pub mod subscriber;

use ahash::HashMap;
use log::error;

use crate::core::{
    completion::{
        Completion,
        PendingResult,
        completion,
    },
    error::WampError,
    id::Id,
};

/// Request state owned by a connection on behalf of one role.
pub trait Role {
    /// Fails every pending request with [`WampError::ConnectionClosed`] and forgets everything the
    /// role knows about the session.
    fn reset_to_initial_state(&mut self);

    /// The number of requests waiting for a response.
    fn pending_requests(&self) -> usize;
}

/// An in-flight request waiting for its response.
#[derive(Debug)]
pub(crate) struct PendingRequest<C, T> {
    /// What the request was about, needed to build the result.
    pub context: C,
    pub completion: Completion<T>,
}

/// In-flight requests of one kind, keyed by request ID.
pub(crate) struct PendingRequests<C, T> {
    kind: &'static str,
    requests: HashMap<Id, PendingRequest<C, T>>,
}

impl<C, T> PendingRequests<C, T> {
    pub fn new(kind: &'static str) -> Self {
        Self {
            kind,
            requests: HashMap::default(),
        }
    }

    /// Starts tracking a request, returning the caller's handle to it.
    pub fn insert(&mut self, request_id: Id, context: C) -> PendingResult<T> {
        let (completion, pending) = completion();
        if let Some(previous) = self
            .requests
            .insert(request_id, PendingRequest { context, completion })
        {
            // Request IDs only repeat after a reset, which clears this table.
            error!(
                "Duplicate {} request {request_id}, failing the previous request",
                self.kind
            );
            previous
                .completion
                .complete(Err(WampError::ConnectionClosed));
        }
        pending
    }

    /// Stops tracking a request.
    pub fn take(&mut self, request_id: Id) -> Option<PendingRequest<C, T>> {
        let request = self.requests.remove(&request_id);
        if request.is_none() {
            error!(
                "Received response for unknown {} request {request_id}",
                self.kind
            );
        }
        request
    }

    pub fn contains(&self, request_id: Id) -> bool {
        self.requests.contains_key(&request_id)
    }

    pub fn len(&self) -> usize {
        self.requests.len()
    }

    /// Fails every request with [`WampError::ConnectionClosed`].
    pub fn reset(&mut self) {
        for (_, request) in self.requests.drain() {
            request
                .completion
                .complete(Err(WampError::ConnectionClosed));
        }
    }
}
