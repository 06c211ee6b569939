use std::ops::RangeInclusive;

use thiserror::Error;

use crate::core::{
    id::Id,
    types::{
        Dictionary,
        Integer,
        List,
        Value,
        WampDeserialize,
    },
    uri::Uri,
};

/// Error for a frame that is not a well-formed WAMP message.
#[derive(Debug, Error)]
#[error("invalid {message} message: {reason}")]
pub struct InvalidMessage {
    message: &'static str,
    reason: String,
}

impl InvalidMessage {
    fn new<S>(message: &'static str, reason: S) -> Self
    where
        S: Into<String>,
    {
        Self {
            message,
            reason: reason.into(),
        }
    }
}

/// Cursor over the fields of a message, after the type code.
struct Fields {
    message: &'static str,
    values: std::vec::IntoIter<Value>,
}

impl Fields {
    fn next<T>(&mut self, field: &'static str) -> Result<T, InvalidMessage>
    where
        T: WampDeserialize,
    {
        match self.values.next() {
            Some(value) => T::wamp_deserialize(value)
                .map_err(|err| InvalidMessage::new(self.message, format!("{field}: {err}"))),
            None => Err(InvalidMessage::new(
                self.message,
                format!("{field} is missing"),
            )),
        }
    }

    fn optional<T>(&mut self, field: &'static str) -> Result<Option<T>, InvalidMessage>
    where
        T: WampDeserialize,
    {
        match self.values.len() {
            0 => Ok(None),
            _ => self.next(field).map(Some),
        }
    }
}

/// A message type that can be decoded from and encoded to its list form.
trait WireMessage: Sized {
    const NAME: &'static str;
    const TAG: Integer;
    /// Allowed message lengths, including the type code.
    const ARITY: RangeInclusive<usize>;

    fn decode(fields: &mut Fields) -> Result<Self, InvalidMessage>;
    fn encode(self, list: &mut List);

    fn decode_list(values: std::vec::IntoIter<Value>) -> Result<Self, InvalidMessage> {
        let len = values.len() + 1;
        if !Self::ARITY.contains(&len) {
            return Err(InvalidMessage::new(
                Self::NAME,
                format!(
                    "length must be in [{}, {}], got {len}",
                    Self::ARITY.start(),
                    Self::ARITY.end()
                ),
            ));
        }
        Self::decode(&mut Fields {
            message: Self::NAME,
            values,
        })
    }

    fn encode_list(self) -> List {
        let mut list = List::from_iter([Value::Integer(Self::TAG)]);
        self.encode(&mut list);
        list
    }
}

/// Appends optional trailing payloads.
///
/// Keyword arguments can only be present after positional arguments, so an empty list is
/// inserted if needed.
fn push_payload(list: &mut List, arguments: Option<List>, arguments_keyword: Option<Dictionary>) {
    match (arguments, arguments_keyword) {
        (arguments, Some(arguments_keyword)) => {
            list.push(Value::List(arguments.unwrap_or_default()));
            list.push(Value::Dictionary(arguments_keyword));
        }
        (Some(arguments), None) => list.push(Value::List(arguments)),
        (None, None) => (),
    }
}

/// A HELLO message for a peer to initiate a WAMP session in a realm.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct HelloMessage {
    pub realm: Uri,
    pub details: Dictionary,
}

impl WireMessage for HelloMessage {
    const NAME: &'static str = "HELLO";
    const TAG: Integer = 1;
    const ARITY: RangeInclusive<usize> = 3..=3;

    fn decode(fields: &mut Fields) -> Result<Self, InvalidMessage> {
        Ok(Self {
            realm: fields.next("Realm")?,
            details: fields.next("Details")?,
        })
    }

    fn encode(self, list: &mut List) {
        list.push(self.realm.into());
        list.push(Value::Dictionary(self.details));
    }
}

/// A WELCOME message for a router to confirm a peer's WAMP session in a realm.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct WelcomeMessage {
    pub session: Id,
    pub details: Dictionary,
}

impl WireMessage for WelcomeMessage {
    const NAME: &'static str = "WELCOME";
    const TAG: Integer = 2;
    const ARITY: RangeInclusive<usize> = 3..=3;

    fn decode(fields: &mut Fields) -> Result<Self, InvalidMessage> {
        Ok(Self {
            session: fields.next("Session")?,
            details: fields.next("Details")?,
        })
    }

    fn encode(self, list: &mut List) {
        list.push(self.session.into());
        list.push(Value::Dictionary(self.details));
    }
}

/// An ABORT message for quickly terminating a WAMP session.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct AbortMessage {
    pub details: Dictionary,
    pub reason: Uri,
}

impl WireMessage for AbortMessage {
    const NAME: &'static str = "ABORT";
    const TAG: Integer = 3;
    const ARITY: RangeInclusive<usize> = 3..=3;

    fn decode(fields: &mut Fields) -> Result<Self, InvalidMessage> {
        Ok(Self {
            details: fields.next("Details")?,
            reason: fields.next("Reason")?,
        })
    }

    fn encode(self, list: &mut List) {
        list.push(Value::Dictionary(self.details));
        list.push(self.reason.into());
    }
}

/// A GOODBYE message for ending a WAMP session with a two-way handshake.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct GoodbyeMessage {
    pub details: Dictionary,
    pub reason: Uri,
}

impl WireMessage for GoodbyeMessage {
    const NAME: &'static str = "GOODBYE";
    const TAG: Integer = 6;
    const ARITY: RangeInclusive<usize> = 3..=3;

    fn decode(fields: &mut Fields) -> Result<Self, InvalidMessage> {
        Ok(Self {
            details: fields.next("Details")?,
            reason: fields.next("Reason")?,
        })
    }

    fn encode(self, list: &mut List) {
        list.push(Value::Dictionary(self.details));
        list.push(self.reason.into());
    }
}

/// An ERROR message for communicating an error in response to a single request.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct ErrorMessage {
    pub request_type: Integer,
    pub request: Id,
    pub details: Dictionary,
    pub error: Uri,
    pub arguments: Option<List>,
    pub arguments_keyword: Option<Dictionary>,
}

impl WireMessage for ErrorMessage {
    const NAME: &'static str = "ERROR";
    const TAG: Integer = 8;
    const ARITY: RangeInclusive<usize> = 5..=7;

    fn decode(fields: &mut Fields) -> Result<Self, InvalidMessage> {
        Ok(Self {
            request_type: fields.next("REQUEST.Type")?,
            request: fields.next("REQUEST.Request")?,
            details: fields.next("Details")?,
            error: fields.next("Error")?,
            arguments: fields.optional("Arguments")?,
            arguments_keyword: fields.optional("ArgumentsKw")?,
        })
    }

    fn encode(self, list: &mut List) {
        list.push(Value::Integer(self.request_type));
        list.push(self.request.into());
        list.push(Value::Dictionary(self.details));
        list.push(self.error.into());
        push_payload(list, self.arguments, self.arguments_keyword);
    }
}

/// A PUBLISH message for publishing an event to a topic.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct PublishMessage {
    pub request: Id,
    pub options: Dictionary,
    pub topic: Uri,
    pub arguments: Option<List>,
    pub arguments_keyword: Option<Dictionary>,
}

impl WireMessage for PublishMessage {
    const NAME: &'static str = "PUBLISH";
    const TAG: Integer = 16;
    const ARITY: RangeInclusive<usize> = 4..=6;

    fn decode(fields: &mut Fields) -> Result<Self, InvalidMessage> {
        Ok(Self {
            request: fields.next("Request")?,
            options: fields.next("Options")?,
            topic: fields.next("Topic")?,
            arguments: fields.optional("Arguments")?,
            arguments_keyword: fields.optional("ArgumentsKw")?,
        })
    }

    fn encode(self, list: &mut List) {
        list.push(self.request.into());
        list.push(Value::Dictionary(self.options));
        list.push(self.topic.into());
        push_payload(list, self.arguments, self.arguments_keyword);
    }
}

/// A PUBLISHED message for confirming an event was published.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct PublishedMessage {
    pub publish_request: Id,
    pub publication: Id,
}

impl WireMessage for PublishedMessage {
    const NAME: &'static str = "PUBLISHED";
    const TAG: Integer = 17;
    const ARITY: RangeInclusive<usize> = 3..=3;

    fn decode(fields: &mut Fields) -> Result<Self, InvalidMessage> {
        Ok(Self {
            publish_request: fields.next("PUBLISH.Request")?,
            publication: fields.next("Publication")?,
        })
    }

    fn encode(self, list: &mut List) {
        list.push(self.publish_request.into());
        list.push(self.publication.into());
    }
}

/// A SUBSCRIBE message for subscribing to a topic.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct SubscribeMessage {
    pub request: Id,
    pub options: Dictionary,
    pub topic: Uri,
}

impl WireMessage for SubscribeMessage {
    const NAME: &'static str = "SUBSCRIBE";
    const TAG: Integer = 32;
    const ARITY: RangeInclusive<usize> = 4..=4;

    fn decode(fields: &mut Fields) -> Result<Self, InvalidMessage> {
        Ok(Self {
            request: fields.next("Request")?,
            options: fields.next("Options")?,
            topic: fields.next("Topic")?,
        })
    }

    fn encode(self, list: &mut List) {
        list.push(self.request.into());
        list.push(Value::Dictionary(self.options));
        list.push(self.topic.into());
    }
}

/// A SUBSCRIBED message for confirming a peer has subscribed to a topic.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct SubscribedMessage {
    pub subscribe_request: Id,
    pub subscription: Id,
}

impl WireMessage for SubscribedMessage {
    const NAME: &'static str = "SUBSCRIBED";
    const TAG: Integer = 33;
    const ARITY: RangeInclusive<usize> = 3..=3;

    fn decode(fields: &mut Fields) -> Result<Self, InvalidMessage> {
        Ok(Self {
            subscribe_request: fields.next("SUBSCRIBE.Request")?,
            subscription: fields.next("Subscription")?,
        })
    }

    fn encode(self, list: &mut List) {
        list.push(self.subscribe_request.into());
        list.push(self.subscription.into());
    }
}

/// An UNSUBSCRIBE message for unsubscribing from a topic.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct UnsubscribeMessage {
    pub request: Id,
    pub subscribed_subscription: Id,
}

impl WireMessage for UnsubscribeMessage {
    const NAME: &'static str = "UNSUBSCRIBE";
    const TAG: Integer = 34;
    const ARITY: RangeInclusive<usize> = 3..=3;

    fn decode(fields: &mut Fields) -> Result<Self, InvalidMessage> {
        Ok(Self {
            request: fields.next("Request")?,
            subscribed_subscription: fields.next("SUBSCRIBED.Subscription")?,
        })
    }

    fn encode(self, list: &mut List) {
        list.push(self.request.into());
        list.push(self.subscribed_subscription.into());
    }
}

/// An UNSUBSCRIBED message for confirming a peer has unsubscribed from a topic.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct UnsubscribedMessage {
    pub unsubscribe_request: Id,
}

impl WireMessage for UnsubscribedMessage {
    const NAME: &'static str = "UNSUBSCRIBED";
    const TAG: Integer = 35;
    const ARITY: RangeInclusive<usize> = 2..=2;

    fn decode(fields: &mut Fields) -> Result<Self, InvalidMessage> {
        Ok(Self {
            unsubscribe_request: fields.next("UNSUBSCRIBE.Request")?,
        })
    }

    fn encode(self, list: &mut List) {
        list.push(self.unsubscribe_request.into());
    }
}

/// An EVENT message for relaying a published event to subscribers.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct EventMessage {
    pub subscribed_subscription: Id,
    pub published_publication: Id,
    pub details: Dictionary,
    pub publish_arguments: Option<List>,
    pub publish_arguments_keyword: Option<Dictionary>,
}

impl WireMessage for EventMessage {
    const NAME: &'static str = "EVENT";
    const TAG: Integer = 36;
    const ARITY: RangeInclusive<usize> = 4..=6;

    fn decode(fields: &mut Fields) -> Result<Self, InvalidMessage> {
        Ok(Self {
            subscribed_subscription: fields.next("SUBSCRIBED.Subscription")?,
            published_publication: fields.next("PUBLISHED.Publication")?,
            details: fields.next("Details")?,
            publish_arguments: fields.optional("PUBLISH.Arguments")?,
            publish_arguments_keyword: fields.optional("PUBLISH.ArgumentsKw")?,
        })
    }

    fn encode(self, list: &mut List) {
        list.push(self.subscribed_subscription.into());
        list.push(self.published_publication.into());
        list.push(Value::Dictionary(self.details));
        push_payload(
            list,
            self.publish_arguments,
            self.publish_arguments_keyword,
        );
    }
}

/// A CALL message for invoking a procedure.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct CallMessage {
    pub request: Id,
    pub options: Dictionary,
    pub procedure: Uri,
    pub arguments: Option<List>,
    pub arguments_keyword: Option<Dictionary>,
}

impl WireMessage for CallMessage {
    const NAME: &'static str = "CALL";
    const TAG: Integer = 48;
    const ARITY: RangeInclusive<usize> = 4..=6;

    fn decode(fields: &mut Fields) -> Result<Self, InvalidMessage> {
        Ok(Self {
            request: fields.next("Request")?,
            options: fields.next("Options")?,
            procedure: fields.next("Procedure")?,
            arguments: fields.optional("Arguments")?,
            arguments_keyword: fields.optional("ArgumentsKw")?,
        })
    }

    fn encode(self, list: &mut List) {
        list.push(self.request.into());
        list.push(Value::Dictionary(self.options));
        list.push(self.procedure.into());
        push_payload(list, self.arguments, self.arguments_keyword);
    }
}

/// A RESULT message for sending the result of a procedure invocation.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct ResultMessage {
    pub call_request: Id,
    pub details: Dictionary,
    pub yield_arguments: Option<List>,
    pub yield_arguments_keyword: Option<Dictionary>,
}

impl WireMessage for ResultMessage {
    const NAME: &'static str = "RESULT";
    const TAG: Integer = 50;
    const ARITY: RangeInclusive<usize> = 3..=5;

    fn decode(fields: &mut Fields) -> Result<Self, InvalidMessage> {
        Ok(Self {
            call_request: fields.next("CALL.Request")?,
            details: fields.next("Details")?,
            yield_arguments: fields.optional("YIELD.Arguments")?,
            yield_arguments_keyword: fields.optional("YIELD.ArgumentsKw")?,
        })
    }

    fn encode(self, list: &mut List) {
        list.push(self.call_request.into());
        list.push(Value::Dictionary(self.details));
        push_payload(list, self.yield_arguments, self.yield_arguments_keyword);
    }
}

/// A REGISTER message for registering a procedure in the realm.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct RegisterMessage {
    pub request: Id,
    pub options: Dictionary,
    pub procedure: Uri,
}

impl WireMessage for RegisterMessage {
    const NAME: &'static str = "REGISTER";
    const TAG: Integer = 64;
    const ARITY: RangeInclusive<usize> = 4..=4;

    fn decode(fields: &mut Fields) -> Result<Self, InvalidMessage> {
        Ok(Self {
            request: fields.next("Request")?,
            options: fields.next("Options")?,
            procedure: fields.next("Procedure")?,
        })
    }

    fn encode(self, list: &mut List) {
        list.push(self.request.into());
        list.push(Value::Dictionary(self.options));
        list.push(self.procedure.into());
    }
}

/// A REGISTERED message for confirming a procedure has been registered.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct RegisteredMessage {
    pub register_request: Id,
    pub registration: Id,
}

impl WireMessage for RegisteredMessage {
    const NAME: &'static str = "REGISTERED";
    const TAG: Integer = 65;
    const ARITY: RangeInclusive<usize> = 3..=3;

    fn decode(fields: &mut Fields) -> Result<Self, InvalidMessage> {
        Ok(Self {
            register_request: fields.next("REGISTER.Request")?,
            registration: fields.next("Registration")?,
        })
    }

    fn encode(self, list: &mut List) {
        list.push(self.register_request.into());
        list.push(self.registration.into());
    }
}

/// An UNREGISTER message for unregistering a procedure in the realm.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct UnregisterMessage {
    pub request: Id,
    pub registered_registration: Id,
}

impl WireMessage for UnregisterMessage {
    const NAME: &'static str = "UNREGISTER";
    const TAG: Integer = 66;
    const ARITY: RangeInclusive<usize> = 3..=3;

    fn decode(fields: &mut Fields) -> Result<Self, InvalidMessage> {
        Ok(Self {
            request: fields.next("Request")?,
            registered_registration: fields.next("REGISTERED.Registration")?,
        })
    }

    fn encode(self, list: &mut List) {
        list.push(self.request.into());
        list.push(self.registered_registration.into());
    }
}

/// An UNREGISTERED message for confirming a procedure has been unregistered.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct UnregisteredMessage {
    pub unregister_request: Id,
}

impl WireMessage for UnregisteredMessage {
    const NAME: &'static str = "UNREGISTERED";
    const TAG: Integer = 67;
    const ARITY: RangeInclusive<usize> = 2..=2;

    fn decode(fields: &mut Fields) -> Result<Self, InvalidMessage> {
        Ok(Self {
            unregister_request: fields.next("UNREGISTER.Request")?,
        })
    }

    fn encode(self, list: &mut List) {
        list.push(self.unregister_request.into());
    }
}

/// An INVOCATION message for invoking a procedure on its callee.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct InvocationMessage {
    pub request: Id,
    pub registered_registration: Id,
    pub details: Dictionary,
    pub call_arguments: Option<List>,
    pub call_arguments_keyword: Option<Dictionary>,
}

impl WireMessage for InvocationMessage {
    const NAME: &'static str = "INVOCATION";
    const TAG: Integer = 68;
    const ARITY: RangeInclusive<usize> = 4..=6;

    fn decode(fields: &mut Fields) -> Result<Self, InvalidMessage> {
        Ok(Self {
            request: fields.next("Request")?,
            registered_registration: fields.next("REGISTERED.Registration")?,
            details: fields.next("Details")?,
            call_arguments: fields.optional("CALL.Arguments")?,
            call_arguments_keyword: fields.optional("CALL.ArgumentsKw")?,
        })
    }

    fn encode(self, list: &mut List) {
        list.push(self.request.into());
        list.push(self.registered_registration.into());
        list.push(Value::Dictionary(self.details));
        push_payload(list, self.call_arguments, self.call_arguments_keyword);
    }
}

/// A YIELD message for yielding the result of an invocation from the callee.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct YieldMessage {
    pub invocation_request: Id,
    pub options: Dictionary,
    pub arguments: Option<List>,
    pub arguments_keyword: Option<Dictionary>,
}

impl WireMessage for YieldMessage {
    const NAME: &'static str = "YIELD";
    const TAG: Integer = 70;
    const ARITY: RangeInclusive<usize> = 3..=5;

    fn decode(fields: &mut Fields) -> Result<Self, InvalidMessage> {
        Ok(Self {
            invocation_request: fields.next("INVOCATION.Request")?,
            options: fields.next("Options")?,
            arguments: fields.optional("Arguments")?,
            arguments_keyword: fields.optional("ArgumentsKw")?,
        })
    }

    fn encode(self, list: &mut List) {
        list.push(self.invocation_request.into());
        list.push(Value::Dictionary(self.options));
        push_payload(list, self.arguments, self.arguments_keyword);
    }
}

/// A WAMP message.
#[derive(Debug, Clone, PartialEq)]
pub enum Message {
    Hello(HelloMessage),
    Welcome(WelcomeMessage),
    Abort(AbortMessage),
    Goodbye(GoodbyeMessage),
    Error(ErrorMessage),
    Publish(PublishMessage),
    Published(PublishedMessage),
    Subscribe(SubscribeMessage),
    Subscribed(SubscribedMessage),
    Unsubscribe(UnsubscribeMessage),
    Unsubscribed(UnsubscribedMessage),
    Event(EventMessage),
    Call(CallMessage),
    Result(ResultMessage),
    Register(RegisterMessage),
    Registered(RegisteredMessage),
    Unregister(UnregisterMessage),
    Unregistered(UnregisteredMessage),
    Invocation(InvocationMessage),
    Yield(YieldMessage),
}

/// Message type codes.
pub mod tag {
    use crate::core::types::Integer;

    pub const HELLO: Integer = 1;
    pub const WELCOME: Integer = 2;
    pub const ABORT: Integer = 3;
    pub const GOODBYE: Integer = 6;
    pub const ERROR: Integer = 8;
    pub const PUBLISH: Integer = 16;
    pub const PUBLISHED: Integer = 17;
    pub const SUBSCRIBE: Integer = 32;
    pub const SUBSCRIBED: Integer = 33;
    pub const UNSUBSCRIBE: Integer = 34;
    pub const UNSUBSCRIBED: Integer = 35;
    pub const EVENT: Integer = 36;
    pub const CALL: Integer = 48;
    pub const RESULT: Integer = 50;
    pub const REGISTER: Integer = 64;
    pub const REGISTERED: Integer = 65;
    pub const UNREGISTER: Integer = 66;
    pub const UNREGISTERED: Integer = 67;
    pub const INVOCATION: Integer = 68;
    pub const YIELD: Integer = 70;
}

impl Message {
    /// The message type code.
    pub fn tag(&self) -> Integer {
        match self {
            Self::Hello(_) => HelloMessage::TAG,
            Self::Welcome(_) => WelcomeMessage::TAG,
            Self::Abort(_) => AbortMessage::TAG,
            Self::Goodbye(_) => GoodbyeMessage::TAG,
            Self::Error(_) => ErrorMessage::TAG,
            Self::Publish(_) => PublishMessage::TAG,
            Self::Published(_) => PublishedMessage::TAG,
            Self::Subscribe(_) => SubscribeMessage::TAG,
            Self::Subscribed(_) => SubscribedMessage::TAG,
            Self::Unsubscribe(_) => UnsubscribeMessage::TAG,
            Self::Unsubscribed(_) => UnsubscribedMessage::TAG,
            Self::Event(_) => EventMessage::TAG,
            Self::Call(_) => CallMessage::TAG,
            Self::Result(_) => ResultMessage::TAG,
            Self::Register(_) => RegisterMessage::TAG,
            Self::Registered(_) => RegisteredMessage::TAG,
            Self::Unregister(_) => UnregisterMessage::TAG,
            Self::Unregistered(_) => UnregisteredMessage::TAG,
            Self::Invocation(_) => InvocationMessage::TAG,
            Self::Yield(_) => YieldMessage::TAG,
        }
    }

    /// The message name, mostly for logging.
    pub fn message_name(&self) -> &'static str {
        match self {
            Self::Hello(_) => HelloMessage::NAME,
            Self::Welcome(_) => WelcomeMessage::NAME,
            Self::Abort(_) => AbortMessage::NAME,
            Self::Goodbye(_) => GoodbyeMessage::NAME,
            Self::Error(_) => ErrorMessage::NAME,
            Self::Publish(_) => PublishMessage::NAME,
            Self::Published(_) => PublishedMessage::NAME,
            Self::Subscribe(_) => SubscribeMessage::NAME,
            Self::Subscribed(_) => SubscribedMessage::NAME,
            Self::Unsubscribe(_) => UnsubscribeMessage::NAME,
            Self::Unsubscribed(_) => UnsubscribedMessage::NAME,
            Self::Event(_) => EventMessage::NAME,
            Self::Call(_) => CallMessage::NAME,
            Self::Result(_) => ResultMessage::NAME,
            Self::Register(_) => RegisterMessage::NAME,
            Self::Registered(_) => RegisteredMessage::NAME,
            Self::Unregister(_) => UnregisterMessage::NAME,
            Self::Unregistered(_) => UnregisteredMessage::NAME,
            Self::Invocation(_) => InvocationMessage::NAME,
            Self::Yield(_) => YieldMessage::NAME,
        }
    }

    /// The request ID on the message.
    pub fn request_id(&self) -> Option<Id> {
        match self {
            Self::Error(message) => Some(message.request),
            Self::Publish(message) => Some(message.request),
            Self::Published(message) => Some(message.publish_request),
            Self::Subscribe(message) => Some(message.request),
            Self::Subscribed(message) => Some(message.subscribe_request),
            Self::Unsubscribe(message) => Some(message.request),
            Self::Unsubscribed(message) => Some(message.unsubscribe_request),
            Self::Call(message) => Some(message.request),
            Self::Result(message) => Some(message.call_request),
            Self::Register(message) => Some(message.request),
            Self::Registered(message) => Some(message.register_request),
            Self::Unregister(message) => Some(message.request),
            Self::Unregistered(message) => Some(message.unregister_request),
            Self::Invocation(message) => Some(message.request),
            Self::Yield(message) => Some(message.invocation_request),
            _ => None,
        }
    }

    /// Encodes the message into its list form.
    pub fn into_list(self) -> List {
        match self {
            Self::Hello(message) => message.encode_list(),
            Self::Welcome(message) => message.encode_list(),
            Self::Abort(message) => message.encode_list(),
            Self::Goodbye(message) => message.encode_list(),
            Self::Error(message) => message.encode_list(),
            Self::Publish(message) => message.encode_list(),
            Self::Published(message) => message.encode_list(),
            Self::Subscribe(message) => message.encode_list(),
            Self::Subscribed(message) => message.encode_list(),
            Self::Unsubscribe(message) => message.encode_list(),
            Self::Unsubscribed(message) => message.encode_list(),
            Self::Event(message) => message.encode_list(),
            Self::Call(message) => message.encode_list(),
            Self::Result(message) => message.encode_list(),
            Self::Register(message) => message.encode_list(),
            Self::Registered(message) => message.encode_list(),
            Self::Unregister(message) => message.encode_list(),
            Self::Unregistered(message) => message.encode_list(),
            Self::Invocation(message) => message.encode_list(),
            Self::Yield(message) => message.encode_list(),
        }
    }
}

impl From<Message> for Value {
    fn from(value: Message) -> Self {
        Value::List(value.into_list())
    }
}

impl TryFrom<Value> for Message {
    type Error = InvalidMessage;

    fn try_from(value: Value) -> Result<Self, InvalidMessage> {
        let list = match value {
            Value::List(list) => list,
            other => {
                return Err(InvalidMessage::new(
                    "WAMP",
                    format!("message must be a list, got {}", other.type_name()),
                ));
            }
        };
        let mut values = list.into_iter();
        let tag = match values.next() {
            Some(Value::Integer(tag)) => tag,
            Some(other) => {
                return Err(InvalidMessage::new(
                    "WAMP",
                    format!("message type must be an integer, got {}", other.type_name()),
                ));
            }
            None => return Err(InvalidMessage::new("WAMP", "message type is missing")),
        };
        match tag {
            tag::HELLO => HelloMessage::decode_list(values).map(Self::Hello),
            tag::WELCOME => WelcomeMessage::decode_list(values).map(Self::Welcome),
            tag::ABORT => AbortMessage::decode_list(values).map(Self::Abort),
            tag::GOODBYE => GoodbyeMessage::decode_list(values).map(Self::Goodbye),
            tag::ERROR => ErrorMessage::decode_list(values).map(Message::Error),
            tag::PUBLISH => PublishMessage::decode_list(values).map(Self::Publish),
            tag::PUBLISHED => PublishedMessage::decode_list(values).map(Self::Published),
            tag::SUBSCRIBE => SubscribeMessage::decode_list(values).map(Self::Subscribe),
            tag::SUBSCRIBED => SubscribedMessage::decode_list(values).map(Self::Subscribed),
            tag::UNSUBSCRIBE => UnsubscribeMessage::decode_list(values).map(Self::Unsubscribe),
            tag::UNSUBSCRIBED => {
                UnsubscribedMessage::decode_list(values).map(Self::Unsubscribed)
            }
            tag::EVENT => EventMessage::decode_list(values).map(Self::Event),
            tag::CALL => CallMessage::decode_list(values).map(Self::Call),
            tag::RESULT => ResultMessage::decode_list(values).map(Self::Result),
            tag::REGISTER => RegisterMessage::decode_list(values).map(Self::Register),
            tag::REGISTERED => RegisteredMessage::decode_list(values).map(Self::Registered),
            tag::UNREGISTER => UnregisterMessage::decode_list(values).map(Self::Unregister),
            tag::UNREGISTERED => {
                UnregisteredMessage::decode_list(values).map(Self::Unregistered)
            }
            tag::INVOCATION => InvocationMessage::decode_list(values).map(Self::Invocation),
            tag::YIELD => YieldMessage::decode_list(values).map(Self::Yield),
            _ => Err(InvalidMessage::new(
                "WAMP",
                format!("unsupported message type {tag}"),
            )),
        }
    }
}
