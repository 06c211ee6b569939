use ahash::HashMap;
use log::{
    debug,
    trace,
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
            WampError,
        },
        id::Id,
        types::{
            Dictionary,
            List,
        },
        uri::Uri,
    },
    message::message::{
        ErrorMessage,
        EventMessage,
        Message,
        SubscribeMessage,
        SubscribedMessage,
        UnsubscribeMessage,
        UnsubscribedMessage,
    },
    role::{
        PendingRequests,
        Role,
    },
};

/// An event published to a subscribed topic.
#[derive(Debug, Clone, PartialEq)]
pub struct Event {
    pub publication: Id,
    pub details: Dictionary,
    pub arguments: Option<List>,
    pub arguments_keyword: Option<Dictionary>,
}

/// An active subscription to a topic.
///
/// Events are received on [`Self::events`]. The channel closes when the subscription ends,
/// either by unsubscribing or by losing the connection.
#[derive(Debug)]
pub struct Subscription {
    /// Subscription ID assigned by the router.
    pub id: Id,
    pub topic: Uri,
    pub events: UnboundedReceiver<Event>,
}

/// A SUBSCRIBE request that has not been sent yet.
#[derive(Debug, Clone, PartialEq)]
pub struct SubscribeRequest {
    pub request_id: Id,
    /// Session the request was created in, stamped by the connection.
    pub(crate) generation: u64,
    pub topic: Uri,
}

impl SubscribeRequest {
    pub fn message(&self) -> Message {
        Message::Subscribe(SubscribeMessage {
            request: self.request_id,
            options: Dictionary::default(),
            topic: self.topic.clone(),
        })
    }
}

/// An UNSUBSCRIBE request that has not been sent yet.
#[derive(Debug, Clone, PartialEq)]
pub struct UnsubscribeRequest {
    pub request_id: Id,
    /// Session the request was created in, stamped by the connection.
    pub(crate) generation: u64,
    pub subscription: Id,
}

impl UnsubscribeRequest {
    pub fn message(&self) -> Message {
        Message::Unsubscribe(UnsubscribeMessage {
            request: self.request_id,
            subscribed_subscription: self.subscription,
        })
    }
}

struct ActiveSubscription {
    topic: Uri,
    // The router hands out the same subscription for repeated subscriptions to a topic.
    event_txs: Vec<UnboundedSender<Event>>,
}

impl ActiveSubscription {
    fn attach(&mut self) -> UnboundedReceiver<Event> {
        let (event_tx, event_rx) = unbounded_channel();
        self.event_txs.push(event_tx);
        event_rx
    }
}

/// The subscriber role, which receives events for topics.
pub struct Subscriber {
    subscribes: PendingRequests<Uri, Subscription>,
    unsubscribes: PendingRequests<Id, ()>,
    subscriptions: HashMap<Id, ActiveSubscription>,
}

impl Subscriber {
    pub fn new() -> Self {
        Self {
            subscribes: PendingRequests::new("SUBSCRIBE"),
            unsubscribes: PendingRequests::new("UNSUBSCRIBE"),
            subscriptions: HashMap::default(),
        }
    }

    pub fn create_subscribe(&self, request_id: Id, topic: Uri) -> SubscribeRequest {
        SubscribeRequest {
            request_id,
            generation: 0,
            topic,
        }
    }

    /// Starts tracking the request, returning the message to send.
    pub fn send_subscribe(
        &mut self,
        request: SubscribeRequest,
    ) -> (Message, PendingResult<Subscription>) {
        let message = request.message();
        let pending = self.subscribes.insert(request.request_id, request.topic);
        (message, pending)
    }

    /// Creates an UNSUBSCRIBE request for a subscription this role knows about.
    pub fn create_unsubscribe(
        &self,
        request_id: Id,
        subscription: Id,
    ) -> Result<UnsubscribeRequest, WampError> {
        if !self.subscriptions.contains_key(&subscription) {
            return Err(WampError::UnsubscribeError(ErrorDetails::local(format!(
                "subscription {subscription} does not exist"
            ))));
        }
        Ok(UnsubscribeRequest {
            request_id,
            generation: 0,
            subscription,
        })
    }

    pub fn send_unsubscribe(&mut self, request: UnsubscribeRequest) -> (Message, PendingResult<()>) {
        let message = request.message();
        let pending = self
            .unsubscribes
            .insert(request.request_id, request.subscription);
        (message, pending)
    }

    /// Attaches to a subscription that the router already knows about, without sending a
    /// SUBSCRIBE.
    pub fn auto_subscribe(&mut self, id: Id, topic: Uri) -> Result<Subscription, WampError> {
        if self.subscriptions.contains_key(&id) {
            return Err(WampError::SubscribeError(ErrorDetails::local(format!(
                "subscription {id} already exists"
            ))));
        }
        let mut subscription = ActiveSubscription {
            topic: topic.clone(),
            event_txs: Vec::new(),
        };
        let events = subscription.attach();
        self.subscriptions.insert(id, subscription);
        Ok(Subscription { id, topic, events })
    }

    /// The topic of an active subscription.
    pub fn subscription_topic(&self, id: Id) -> Option<&Uri> {
        self.subscriptions
            .get(&id)
            .map(|subscription| &subscription.topic)
    }

    pub fn process_subscribed(&mut self, message: SubscribedMessage) {
        let request = match self.subscribes.take(message.subscribe_request) {
            Some(request) => request,
            None => return,
        };
        if request.completion.canceled() {
            debug!(
                "Subscribe request {} was canceled, not attaching to subscription {}",
                message.subscribe_request, message.subscription
            );
            return;
        }
        let topic = request.context;
        let events = self
            .subscriptions
            .entry(message.subscription)
            .or_insert_with(|| ActiveSubscription {
                topic: topic.clone(),
                event_txs: Vec::new(),
            })
            .attach();
        request.completion.complete(Ok(Subscription {
            id: message.subscription,
            topic,
            events,
        }));
    }

    pub fn process_unsubscribed(&mut self, message: UnsubscribedMessage) {
        if let Some(request) = self.unsubscribes.take(message.unsubscribe_request) {
            // Dropping the senders closes every event channel for the subscription.
            self.subscriptions.remove(&request.context);
            request.completion.complete(Ok(()));
        }
    }

    pub fn process_event(&mut self, message: EventMessage) {
        let subscription = match self.subscriptions.get_mut(&message.subscribed_subscription) {
            Some(subscription) => subscription,
            None => {
                debug!(
                    "Ignoring EVENT for unknown subscription {}",
                    message.subscribed_subscription
                );
                return;
            }
        };
        let event = Event {
            publication: message.published_publication,
            details: message.details,
            arguments: message.publish_arguments,
            arguments_keyword: message.publish_arguments_keyword,
        };
        subscription
            .event_txs
            .retain(|event_tx| event_tx.send(event.clone()).is_ok());
        if subscription.event_txs.is_empty() {
            trace!(
                "No receivers left for subscription {} on {}",
                message.subscribed_subscription, subscription.topic
            );
        }
    }

    pub fn process_subscribe_error(&mut self, message: ErrorMessage) {
        if let Some(request) = self.subscribes.take(message.request) {
            request
                .completion
                .complete(Err(WampError::SubscribeError(ErrorDetails::from_peer(
                    &message.details,
                    message.error,
                    message.arguments,
                    message.arguments_keyword,
                ))));
        }
    }

    pub fn process_unsubscribe_error(&mut self, message: ErrorMessage) {
        if let Some(request) = self.unsubscribes.take(message.request) {
            request
                .completion
                .complete(Err(WampError::UnsubscribeError(ErrorDetails::from_peer(
                    &message.details,
                    message.error,
                    message.arguments,
                    message.arguments_keyword,
                ))));
        }
    }
}

impl Default for Subscriber {
    fn default() -> Self {
        Self::new()
    }
}

impl Role for Subscriber {
    fn reset_to_initial_state(&mut self) {
        self.subscribes.reset();
        self.unsubscribes.reset();
        self.subscriptions.clear();
    }

    fn pending_requests(&self) -> usize {
        self.subscribes.len() + self.unsubscribes.len()
    }
}

#[cfg(test)]
mod subscriber_test {
    use crate::{
        core::{
            error::WampError,
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
            EventMessage,
            Message,
            SubscribedMessage,
            UnsubscribedMessage,
            tag,
        },
        role::{
            Role,
            subscriber::{
                Event,
                Subscriber,
            },
        },
    };

    fn id(value: u64) -> Id {
        Id::try_from(value).unwrap()
    }

    fn event(subscription: u64, publication: u64) -> EventMessage {
        EventMessage {
            subscribed_subscription: id(subscription),
            published_publication: id(publication),
            details: Dictionary::default(),
            publish_arguments: Some(List::from_iter([Value::Integer(1), Value::Integer(2)])),
            publish_arguments_keyword: None,
        }
    }

    #[test]
    fn resolves_subscription_and_delivers_events() {
        let mut subscriber = Subscriber::new();
        let request = subscriber.create_subscribe(id(1), Uri::try_from("topic.a").unwrap());
        let (message, mut pending) = subscriber.send_subscribe(request);
        assert_matches::assert_matches!(message, Message::Subscribe(message) => {
            assert_eq!(message.request, id(1));
            assert_eq!(message.topic.as_ref(), "topic.a");
        });

        subscriber.process_subscribed(SubscribedMessage {
            subscribe_request: id(1),
            subscription: id(555),
        });
        let mut subscription = match pending.try_result() {
            Some(Ok(subscription)) => subscription,
            result => panic!("unexpected subscribe result: {result:?}"),
        };
        assert_eq!(subscription.id, id(555));
        assert_eq!(subscription.topic.as_ref(), "topic.a");

        subscriber.process_event(event(555, 1));
        pretty_assertions::assert_eq!(
            subscription.events.try_recv().ok(),
            Some(Event {
                publication: id(1),
                details: Dictionary::default(),
                arguments: Some(List::from_iter([Value::Integer(1), Value::Integer(2)])),
                arguments_keyword: None,
            })
        );
        assert_eq!(subscriber.pending_requests(), 0);
    }

    #[test]
    fn drops_duplicate_responses() {
        let mut subscriber = Subscriber::new();
        let request = subscriber.create_subscribe(id(1), Uri::try_from("topic.a").unwrap());
        let (_, mut pending) = subscriber.send_subscribe(request);
        subscriber.process_subscribed(SubscribedMessage {
            subscribe_request: id(1),
            subscription: id(555),
        });
        subscriber.process_subscribed(SubscribedMessage {
            subscribe_request: id(1),
            subscription: id(556),
        });
        assert_matches::assert_matches!(pending.try_result(), Some(Ok(subscription)) => {
            assert_eq!(subscription.id, id(555));
        });
        assert_eq!(subscriber.subscription_topic(id(556)), None);
    }

    #[test]
    fn ignores_events_for_unknown_subscriptions() {
        let mut subscriber = Subscriber::new();
        subscriber.process_event(event(555, 1));
        assert_eq!(subscriber.pending_requests(), 0);
    }

    #[test]
    fn unsubscribe_requires_known_subscription() {
        let mut subscriber = Subscriber::new();
        assert_matches::assert_matches!(
            subscriber.create_unsubscribe(id(2), id(555)),
            Err(WampError::UnsubscribeError(_))
        );

        let mut subscription = subscriber
            .auto_subscribe(id(555), Uri::try_from("topic.a").unwrap())
            .unwrap();
        assert_matches::assert_matches!(
            subscriber.auto_subscribe(id(555), Uri::try_from("topic.a").unwrap()),
            Err(WampError::SubscribeError(_))
        );
        let request = subscriber.create_unsubscribe(id(2), id(555)).unwrap();
        let (_, mut pending) = subscriber.send_unsubscribe(request);
        subscriber.process_unsubscribed(UnsubscribedMessage {
            unsubscribe_request: id(2),
        });
        assert_matches::assert_matches!(pending.try_result(), Some(Ok(())));
        assert_eq!(subscriber.subscription_topic(id(555)), None);
        assert_matches::assert_matches!(
            subscription.events.try_recv(),
            Err(tokio::sync::mpsc::error::TryRecvError::Disconnected)
        );
    }

    #[test]
    fn subscribe_error_carries_peer_description() {
        let mut subscriber = Subscriber::new();
        let request = subscriber.create_subscribe(id(1), Uri::try_from("topic.a").unwrap());
        let (_, mut pending) = subscriber.send_subscribe(request);
        subscriber.process_subscribe_error(ErrorMessage {
            request_type: tag::SUBSCRIBE,
            request: id(1),
            details: Dictionary::from_iter([(
                "message".to_owned(),
                Value::String("not allowed".to_owned()),
            )]),
            error: Uri::try_from("wamp.error.not_authorized").unwrap(),
            arguments: None,
            arguments_keyword: None,
        });
        assert_matches::assert_matches!(
            pending.try_result(),
            Some(Err(WampError::SubscribeError(details))) => {
                assert_eq!(details.description, "not allowed");
            }
        );
    }

    #[test]
    fn reset_fails_requests_and_closes_subscriptions() {
        let mut subscriber = Subscriber::new();
        let mut subscription = subscriber
            .auto_subscribe(id(555), Uri::try_from("topic.a").unwrap())
            .unwrap();
        let request = subscriber.create_subscribe(id(1), Uri::try_from("topic.b").unwrap());
        let (_, mut pending) = subscriber.send_subscribe(request);

        subscriber.reset_to_initial_state();
        assert_matches::assert_matches!(pending.try_result(), Some(Err(WampError::ConnectionClosed)));
        assert_matches::assert_matches!(
            subscription.events.try_recv(),
            Err(tokio::sync::mpsc::error::TryRecvError::Disconnected)
        );

        subscriber.process_event(event(555, 2));
        subscriber.process_subscribed(SubscribedMessage {
            subscribe_request: id(1),
            subscription: id(556),
        });
        assert_eq!(subscriber.subscription_topic(id(556)), None);
    }
}
