mod common;

use std::time::Duration;

use common::{
    REALM,
    ScriptedRouter,
    id,
    joined_peer,
    uri,
};
use sparta_wamp::{
    core::{
        error::{
            InvocationError,
            WampError,
        },
        types::{
            Dictionary,
            List,
            Value,
        },
    },
    message::message::{
        ErrorMessage,
        InvocationMessage,
        Message,
        RegisteredMessage,
        ResultMessage,
        UnregisteredMessage,
        tag,
    },
    peer::{
        CallOptions,
        DirectPeer,
        Procedure,
        RpcYield,
    },
};

async fn register(
    peer: &DirectPeer,
    router: &mut ScriptedRouter,
    procedure: &str,
    registration: u64,
) -> Procedure {
    let (result, _) = tokio::join!(peer.register(uri(procedure)), async {
        let request = match router.receive().await {
            Message::Register(message) => {
                assert_eq!(message.procedure, uri(procedure));
                message.request
            }
            message => panic!("expected REGISTER, got {message:?}"),
        };
        router
            .send(Message::Registered(RegisteredMessage {
                register_request: request,
                registration: id(registration),
            }))
            .await;
    });
    result.unwrap()
}

fn invocation(request: u64, registration: u64, arguments: Option<List>) -> Message {
    Message::Invocation(InvocationMessage {
        request: id(request),
        registered_registration: id(registration),
        details: Dictionary::default(),
        call_arguments: arguments,
        call_arguments_keyword: None,
    })
}

#[tokio::test]
async fn caller_receives_result() {
    test_utils::setup::setup_test_environment();

    let (peer, mut router, _listener) = joined_peer(1).await;
    let (result, _) = tokio::join!(
        peer.call(
            uri("com.sparta.add"),
            Some(List::from_iter([Value::Integer(2), Value::Integer(3)])),
            None,
        ),
        async {
            let request = match router.receive().await {
                Message::Call(message) => {
                    assert_eq!(message.procedure, uri("com.sparta.add"));
                    assert_eq!(
                        message.arguments,
                        Some(List::from_iter([Value::Integer(2), Value::Integer(3)]))
                    );
                    message.request
                }
                message => panic!("expected CALL, got {message:?}"),
            };
            router
                .send(Message::Result(ResultMessage {
                    call_request: request,
                    details: Dictionary::default(),
                    yield_arguments: Some(List::from_iter([Value::Integer(5)])),
                    yield_arguments_keyword: None,
                }))
                .await;
        }
    );
    assert_matches::assert_matches!(result, Ok(result) => {
        assert_eq!(result.arguments, Some(List::from_iter([Value::Integer(5)])));
        assert_eq!(result.arguments_keyword, None);
    });
}

#[tokio::test]
async fn results_are_matched_by_request_id() {
    test_utils::setup::setup_test_environment();

    let (peer, mut router, _listener) = joined_peer(1).await;
    let first = peer
        .send_call(
            peer.create_call(uri("com.sparta.a"), None, None, CallOptions::default())
                .await
                .unwrap(),
        )
        .await;
    let second = peer
        .send_call(
            peer.create_call(uri("com.sparta.b"), None, None, CallOptions::default())
                .await
                .unwrap(),
        )
        .await;
    let first_request = match router.receive().await {
        Message::Call(message) => message.request,
        message => panic!("expected CALL, got {message:?}"),
    };
    let second_request = match router.receive().await {
        Message::Call(message) => message.request,
        message => panic!("expected CALL, got {message:?}"),
    };
    assert_ne!(first_request, second_request);

    // Answer out of order.
    for (request, value) in [(second_request, "b"), (first_request, "a")] {
        router
            .send(Message::Result(ResultMessage {
                call_request: request,
                details: Dictionary::default(),
                yield_arguments: Some(List::from_iter([Value::String(value.to_owned())])),
                yield_arguments_keyword: None,
            }))
            .await;
    }
    assert_matches::assert_matches!(first.await, Ok(result) => {
        assert_eq!(result.arguments, Some(List::from_iter([Value::String("a".to_owned())])));
    });
    assert_matches::assert_matches!(second.await, Ok(result) => {
        assert_eq!(result.arguments, Some(List::from_iter([Value::String("b".to_owned())])));
    });
}

#[tokio::test]
async fn call_error_fails_call() {
    test_utils::setup::setup_test_environment();

    let (peer, mut router, _listener) = joined_peer(1).await;
    let (result, _) = tokio::join!(
        peer.call_with_options(
            uri("com.sparta.slow"),
            None,
            None,
            CallOptions {
                timeout: Some(Duration::from_millis(1500)),
            },
        ),
        async {
            let request = match router.receive().await {
                Message::Call(message) => {
                    assert_eq!(message.options.get("timeout"), Some(&Value::Integer(1500)));
                    message.request
                }
                message => panic!("expected CALL, got {message:?}"),
            };
            router
                .send(Message::Error(ErrorMessage {
                    request_type: tag::CALL,
                    request,
                    details: Dictionary::from_iter([("code".to_owned(), Value::Integer(42))]),
                    error: uri("wamp.error.canceled"),
                    arguments: None,
                    arguments_keyword: None,
                }))
                .await;
        }
    );
    assert_matches::assert_matches!(result, Err(err) => {
        assert_eq!(err.code(), 42);
        assert_matches::assert_matches!(err, WampError::CallError(details) => {
            assert_eq!(details.description, "wamp.error.canceled");
        });
    });
}

#[tokio::test]
async fn callee_yields_result() {
    test_utils::setup::setup_test_environment();

    let (peer, mut router, _listener) = joined_peer(1).await;
    let mut procedure = register(&peer, &mut router, "com.sparta.echo", 20).await;
    assert_eq!(procedure.id, id(20));

    router
        .send(invocation(
            7,
            20,
            Some(List::from_iter([Value::String("hi".to_owned())])),
        ))
        .await;
    let invocation = procedure.invocations.recv().await.unwrap();
    assert_eq!(invocation.request_id, id(7));
    assert_eq!(invocation.registration, id(20));
    let arguments = invocation.arguments.clone();
    invocation.respond(Ok(RpcYield {
        arguments,
        arguments_keyword: None,
    }));

    assert_matches::assert_matches!(router.receive().await, Message::Yield(message) => {
        assert_eq!(message.invocation_request, id(7));
        assert_eq!(message.arguments, Some(List::from_iter([Value::String("hi".to_owned())])));
    });
}

#[tokio::test]
async fn callee_reports_invocation_errors() {
    test_utils::setup::setup_test_environment();

    let (peer, mut router, _listener) = joined_peer(1).await;
    let mut procedure = register(&peer, &mut router, "com.sparta.strict", 20).await;

    router.send(invocation(1, 20, None)).await;
    procedure
        .invocations
        .recv()
        .await
        .unwrap()
        .respond(Err(InvocationError::invalid_argument("missing argument")));
    assert_matches::assert_matches!(router.receive().await, Message::Error(message) => {
        assert_eq!(message.request_type, tag::INVOCATION);
        assert_eq!(message.request, id(1));
        assert_eq!(message.error, uri("wamp.error.invalid_argument"));
        assert_eq!(
            message.details.get("message"),
            Some(&Value::String("missing argument".to_owned()))
        );
    });

    // Dropping an invocation still answers the router.
    router.send(invocation(2, 20, None)).await;
    drop(procedure.invocations.recv().await.unwrap());
    assert_matches::assert_matches!(router.receive().await, Message::Error(message) => {
        assert_eq!(message.request, id(2));
        assert_eq!(message.error, uri("wamp.error.runtime_error"));
    });
}

#[tokio::test]
async fn invocation_for_unknown_registration_is_rejected() {
    test_utils::setup::setup_test_environment();

    let (_peer, mut router, _listener) = joined_peer(1).await;
    router.send(invocation(3, 99, None)).await;
    assert_matches::assert_matches!(router.receive().await, Message::Error(message) => {
        assert_eq!(message.request_type, tag::INVOCATION);
        assert_eq!(message.request, id(3));
        assert_eq!(message.error, uri("wamp.error.no_such_registration"));
    });
}

#[tokio::test]
async fn unregister_closes_invocation_channel() {
    test_utils::setup::setup_test_environment();

    let (peer, mut router, _listener) = joined_peer(1).await;
    let mut procedure = register(&peer, &mut router, "com.sparta.echo", 20).await;

    let (result, _) = tokio::join!(peer.unregister(procedure.id), async {
        let request = match router.receive().await {
            Message::Unregister(message) => {
                assert_eq!(message.registered_registration, id(20));
                message.request
            }
            message => panic!("expected UNREGISTER, got {message:?}"),
        };
        router
            .send(Message::Unregistered(UnregisteredMessage {
                unregister_request: request,
            }))
            .await;
    });
    assert_matches::assert_matches!(result, Ok(()));
    assert_matches::assert_matches!(procedure.invocations.recv().await, None);

    assert_matches::assert_matches!(
        peer.unregister(id(20)).await,
        Err(WampError::UnregisterError(_))
    );
}

#[tokio::test]
async fn register_error_fails_registration() {
    test_utils::setup::setup_test_environment();

    let (peer, mut router, _listener) = joined_peer(1).await;
    let (result, _) = tokio::join!(peer.register(uri("com.sparta.taken")), async {
        let request = match router.receive().await {
            Message::Register(message) => message.request,
            message => panic!("expected REGISTER, got {message:?}"),
        };
        router
            .send(Message::Error(ErrorMessage {
                request_type: tag::REGISTER,
                request,
                details: Dictionary::default(),
                error: uri("wamp.error.procedure_already_exists"),
                arguments: None,
                arguments_keyword: None,
            }))
            .await;
    });
    assert_matches::assert_matches!(result, Err(WampError::RegisterError(details)) => {
        assert_eq!(details.uri, Some(uri("wamp.error.procedure_already_exists")));
    });
}

#[tokio::test]
async fn calls_fail_when_session_is_lost() {
    test_utils::setup::setup_test_environment();

    let (peer, mut router, _listener) = joined_peer(1).await;
    let mut procedure = register(&peer, &mut router, "com.sparta.echo", 20).await;
    let pending = peer
        .send_call(
            peer.create_call(uri("com.sparta.a"), None, None, CallOptions::default())
                .await
                .unwrap(),
        )
        .await;
    assert_matches::assert_matches!(router.receive().await, Message::Call(_));

    drop(router);
    assert_matches::assert_matches!(pending.await, Err(WampError::ConnectionClosed));
    assert_matches::assert_matches!(procedure.invocations.recv().await, None);
    assert_matches::assert_matches!(
        peer.call(uri("com.sparta.a"), None, None).await,
        Err(WampError::NoSession)
    );
}

#[tokio::test]
async fn replies_from_lost_session_are_dropped() {
    test_utils::setup::setup_test_environment();

    let (peer, mut router, mut listener) = joined_peer(1).await;
    let mut procedure = register(&peer, &mut router, "com.sparta.echo", 20).await;
    router.send(invocation(9, 20, None)).await;
    router.send(invocation(10, 20, None)).await;
    let answered = procedure.invocations.recv().await.unwrap();
    let dropped = procedure.invocations.recv().await.unwrap();

    drop(router);
    assert_matches::assert_matches!(procedure.invocations.recv().await, None);
    peer.connect("local").await.unwrap();
    let mut router = ScriptedRouter::accept(&mut listener).await;
    let (welcome, _) = tokio::join!(peer.join_realm(uri(REALM)), router.welcome(2));
    assert_matches::assert_matches!(welcome, Ok(_));

    answered.respond(Ok(RpcYield::default()));
    drop(dropped);
    let pending = peer
        .send_call(
            peer.create_call(uri("com.sparta.a"), None, None, CallOptions::default())
                .await
                .unwrap(),
        )
        .await;
    // Commands are performed in order, so stale replies would arrive before the CALL.
    assert_matches::assert_matches!(router.receive().await, Message::Call(message) => {
        assert_eq!(message.procedure, uri("com.sparta.a"));
    });
    drop(pending);
}
