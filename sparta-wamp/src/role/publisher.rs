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
            List,
            Value,
        },
        uri::Uri,
    },
    message::message::{
        ErrorMessage,
        Message,
        PublishMessage,
        PublishedMessage,
    },
    role::{
        PendingRequests,
        Role,
    },
};

/// An acknowledged publication.
#[derive(Debug, Clone, PartialEq)]
pub struct Publication {
    /// Publication ID assigned by the router.
    pub id: Id,
    pub topic: Uri,
}

/// A PUBLISH request that has not been sent yet.
#[derive(Debug, Clone, PartialEq)]
pub struct PublishRequest {
    pub request_id: Id,
    /// Session the request was created in, stamped by the connection.
    pub(crate) generation: u64,
    pub topic: Uri,
    pub arguments: Option<List>,
    pub arguments_keyword: Option<Dictionary>,
    /// The router should confirm the publication with PUBLISHED.
    pub acknowledge: bool,
}

impl PublishRequest {
    pub fn message(&self) -> Message {
        let mut options = Dictionary::default();
        if self.acknowledge {
            options.insert("acknowledge".to_owned(), Value::Bool(true));
        }
        Message::Publish(PublishMessage {
            request: self.request_id,
            options,
            topic: self.topic.clone(),
            arguments: self.arguments.clone(),
            arguments_keyword: self.arguments_keyword.clone(),
        })
    }
}

/// The publisher role, which publishes events to topics.
pub struct Publisher {
    publishes: PendingRequests<Uri, Publication>,
}

impl Publisher {
    pub fn new() -> Self {
        Self {
            publishes: PendingRequests::new("PUBLISH"),
        }
    }

    pub fn create_publish(
        &self,
        request_id: Id,
        topic: Uri,
        arguments: Option<List>,
        arguments_keyword: Option<Dictionary>,
        acknowledge: bool,
    ) -> PublishRequest {
        PublishRequest {
            request_id,
            generation: 0,
            topic,
            arguments,
            arguments_keyword,
            acknowledge,
        }
    }

    /// Returns the message to send.
    ///
    /// Only acknowledged publications are tracked and resolved. Everything else is fire and
    /// forget.
    pub fn send_publish(
        &mut self,
        request: PublishRequest,
    ) -> (Message, Option<PendingResult<Publication>>) {
        let message = request.message();
        let pending = request
            .acknowledge
            .then(|| self.publishes.insert(request.request_id, request.topic));
        (message, pending)
    }

    pub fn process_published(&mut self, message: PublishedMessage) {
        if let Some(request) = self.publishes.take(message.publish_request) {
            request.completion.complete(Ok(Publication {
                id: message.publication,
                topic: request.context,
            }));
        }
    }

    pub fn process_publish_error(&mut self, message: ErrorMessage) {
        if let Some(request) = self.publishes.take(message.request) {
            request
                .completion
                .complete(Err(WampError::PublishError(ErrorDetails::from_peer(
                    &message.details,
                    message.error,
                    message.arguments,
                    message.arguments_keyword,
                ))));
        }
    }
}

impl Default for Publisher {
    fn default() -> Self {
        Self::new()
    }
}

impl Role for Publisher {
    fn reset_to_initial_state(&mut self) {
        self.publishes.reset();
    }

    fn pending_requests(&self) -> usize {
        self.publishes.len()
    }
}
