use std::fmt::Display;

use thiserror::Error;

use crate::core::{
    types::{
        Dictionary,
        List,
        Value,
        WampDeserialize,
    },
    uri::Uri,
};

/// Details of a failed request, as reported by the other side or produced locally.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct ErrorDetails {
    /// Human-readable description of the error.
    pub description: String,
    /// The error URI, if the error was reported by the peer.
    pub uri: Option<Uri>,
    /// Application-specific error code from the peer's details, if any.
    pub code: Option<i64>,
    pub arguments: Option<List>,
    pub arguments_keyword: Option<Dictionary>,
}

impl ErrorDetails {
    /// Error details for a failure detected locally, before anything was sent.
    pub fn local<S>(description: S) -> Self
    where
        S: Into<String>,
    {
        Self {
            description: description.into(),
            ..Default::default()
        }
    }

    /// Error details reported by the peer in an ERROR message.
    ///
    /// The description is read from `details.message`, falling back to the error URI. The code
    /// is read from `details.code`.
    pub fn from_peer(
        details: &Dictionary,
        uri: Uri,
        arguments: Option<List>,
        arguments_keyword: Option<Dictionary>,
    ) -> Self {
        let description = match details.get("message") {
            Some(Value::String(message)) => message.clone(),
            _ => uri.to_string(),
        };
        let code = details
            .get("code")
            .cloned()
            .and_then(|code| i64::wamp_deserialize(code).ok())
            .filter(|code| *code != 0);
        Self {
            description,
            uri: Some(uri),
            code,
            arguments,
            arguments_keyword,
        }
    }
}

impl Display for ErrorDetails {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.uri {
            Some(uri) if uri.as_ref() != self.description => {
                write!(f, "{} ({uri})", self.description)
            }
            _ => f.write_str(&self.description),
        }
    }
}

/// Numeric codes for [`WampError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i64)]
pub enum ErrorCode {
    NoSession = 1001,
    JoinInProgress = 1002,
    LeaveInProgress = 1003,
    SessionAborted = 1004,
    CallError = 1005,
    PublishError = 1006,
    SubscribeError = 1007,
    UnsubscribeError = 1008,
    ConnectionClosed = 1009,
    RegisterError = 1010,
    UnregisterError = 1011,
    AlreadyJoined = 1012,
}

/// The outcome of a failed WAMP operation.
///
/// Every request resolves exactly once, either with its result or with one of these errors.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum WampError {
    /// The operation requires a connection or session that does not exist.
    #[error("no current session")]
    NoSession,
    #[error("another join is already in progress")]
    JoinInProgress,
    #[error("another leave is already in progress")]
    LeaveInProgress,
    #[error("a session is already established")]
    AlreadyJoined,
    /// The peer refused or aborted the session, or joining was aborted locally.
    #[error("session aborted: {0}")]
    SessionAborted(String),
    #[error("call failed: {0}")]
    CallError(ErrorDetails),
    #[error("publish failed: {0}")]
    PublishError(ErrorDetails),
    #[error("subscribe failed: {0}")]
    SubscribeError(ErrorDetails),
    #[error("unsubscribe failed: {0}")]
    UnsubscribeError(ErrorDetails),
    #[error("register failed: {0}")]
    RegisterError(ErrorDetails),
    #[error("unregister failed: {0}")]
    UnregisterError(ErrorDetails),
    /// The request was pending when the connection was reset.
    #[error("connection reset")]
    ConnectionClosed,
}

impl WampError {
    /// The numeric error code.
    ///
    /// Call errors carry the code supplied by the peer, if there is one.
    pub fn code(&self) -> i64 {
        let code = match self {
            Self::NoSession => ErrorCode::NoSession,
            Self::JoinInProgress => ErrorCode::JoinInProgress,
            Self::LeaveInProgress => ErrorCode::LeaveInProgress,
            Self::AlreadyJoined => ErrorCode::AlreadyJoined,
            Self::SessionAborted(_) => ErrorCode::SessionAborted,
            Self::CallError(details) => match details.code {
                Some(code) => return code,
                None => ErrorCode::CallError,
            },
            Self::PublishError(_) => ErrorCode::PublishError,
            Self::SubscribeError(_) => ErrorCode::SubscribeError,
            Self::UnsubscribeError(_) => ErrorCode::UnsubscribeError,
            Self::RegisterError(_) => ErrorCode::RegisterError,
            Self::UnregisterError(_) => ErrorCode::UnregisterError,
            Self::ConnectionClosed => ErrorCode::ConnectionClosed,
        };
        code as i64
    }

    /// The error details, for errors that carry them.
    pub fn details(&self) -> Option<&ErrorDetails> {
        match self {
            Self::CallError(details)
            | Self::PublishError(details)
            | Self::SubscribeError(details)
            | Self::UnsubscribeError(details)
            | Self::RegisterError(details)
            | Self::UnregisterError(details) => Some(details),
            _ => None,
        }
    }
}

/// An error produced by a callee while handling an invocation.
///
/// Sent back to the caller in an ERROR message.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{message}")]
pub struct InvocationError {
    pub uri: Uri,
    pub message: String,
    pub arguments: Option<List>,
    pub arguments_keyword: Option<Dictionary>,
}

impl InvocationError {
    /// Creates a new error with the given URI and message.
    pub fn new<S>(uri: Uri, message: S) -> Self
    where
        S: Into<String>,
    {
        Self {
            uri,
            message: message.into(),
            arguments: None,
            arguments_keyword: None,
        }
    }

    /// A `wamp.error.invalid_argument` error.
    pub fn invalid_argument<S>(message: S) -> Self
    where
        S: Into<String>,
    {
        Self::new(Uri::from_known("wamp.error.invalid_argument"), message)
    }

    /// A `wamp.error.runtime_error` error.
    pub fn runtime_error<S>(message: S) -> Self
    where
        S: Into<String>,
    {
        Self::new(Uri::from_known("wamp.error.runtime_error"), message)
    }
}
