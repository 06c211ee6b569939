use crate::{
    core::{
        close::CloseReason,
        error::InvocationError,
        id::Id,
        types::{
            Dictionary,
            Value,
        },
    },
    message::message::{
        AbortMessage,
        ErrorMessage,
        GoodbyeMessage,
        Message,
        tag,
    },
};

/// ABORT sent when the client gives up on joining a realm.
pub fn client_abort() -> Message {
    Message::Abort(AbortMessage {
        details: Dictionary::from_iter([(
            "message".to_owned(),
            Value::String("Joining aborted by client.".to_owned()),
        )]),
        reason: CloseReason::ClientAborting.uri(),
    })
}

pub fn goodbye_with_close_reason(close_reason: CloseReason) -> Message {
    Message::Goodbye(GoodbyeMessage {
        details: Dictionary::default(),
        reason: close_reason.uri(),
    })
}

/// GOODBYE reply to a GOODBYE initiated by the router.
pub fn goodbye_and_out() -> Message {
    goodbye_with_close_reason(CloseReason::GoodbyeAndOut)
}

/// ERROR reply to an INVOCATION.
pub fn invocation_error(request: Id, error: InvocationError) -> Message {
    Message::Error(ErrorMessage {
        request_type: tag::INVOCATION,
        request,
        details: Dictionary::from_iter([("message".to_owned(), Value::String(error.message))]),
        error: error.uri,
        arguments: error.arguments,
        arguments_keyword: error.arguments_keyword,
    })
}

#[cfg(test)]
mod common_test {
    use crate::{
        core::{
            close::CloseReason,
            error::InvocationError,
            id::Id,
            types::Value,
        },
        message::{
            common::{
                client_abort,
                goodbye_and_out,
                goodbye_with_close_reason,
                invocation_error,
            },
            message::Message,
        },
    };

    #[test]
    fn client_abort_matches_wire_format() {
        assert_matches::assert_matches!(
            serde_json::to_string(&Value::from(client_abort())),
            Ok(json) => {
                assert_eq!(
                    json,
                    r#"[3,{"message":"Joining aborted by client."},"wamp.error.client_aborting"]"#
                );
            }
        );
    }

    #[test]
    fn goodbye_messages_carry_reason() {
        assert_matches::assert_matches!(goodbye_and_out(), Message::Goodbye(message) => {
            assert_eq!(message.reason.as_ref(), "wamp.error.goodbye_and_out");
        });
        assert_matches::assert_matches!(
            goodbye_with_close_reason(CloseReason::SystemShutdown),
            Message::Goodbye(message) => {
                assert_eq!(message.reason.as_ref(), "wamp.close.system_shutdown");
            }
        );
    }

    #[test]
    fn invocation_error_replies_to_invocation() {
        let message = invocation_error(
            Id::try_from(9).unwrap(),
            InvocationError::invalid_argument("bad input"),
        );
        assert_matches::assert_matches!(
            serde_json::to_string(&Value::from(message)),
            Ok(json) => {
                assert_eq!(
                    json,
                    r#"[8,68,9,{"message":"bad input"},"wamp.error.invalid_argument"]"#
                );
            }
        );
    }
}
