use agent_chat_stream::config::StreamConfig;
use agent_chat_stream::source::{ByteStream, ConnectFuture};
use agent_chat_stream::streaming::{
    ChatFormat, ChatSession, ProgressFormat, ProgressSession, SessionState, StreamEvent,
    StreamSession,
};
use agent_chat_stream::{Result, StreamError};
use bytes::Bytes;
use futures::StreamExt;
use serde_json::json;
use std::time::Duration;

fn stream_of(items: Vec<Result<Bytes>>) -> ByteStream {
    Box::pin(futures::stream::iter(items))
}

fn chunk(text: &'static str) -> Result<Bytes> {
    Ok(Bytes::from_static(text.as_bytes()))
}

#[tokio::test]
async fn test_cancel_after_first_event() {
    let mut session = ChatSession::from_stream(
        stream_of(vec![
            chunk("data: {\"token\":\"Hel"),
            chunk("lo\"}\n\ndata: {\"done\":true}\n\n"),
        ]),
        ChatFormat,
        StreamConfig::default(),
    );

    let first = session.next_event().await.unwrap().unwrap();
    assert_eq!(first.as_data().unwrap().payload, json!({"token": "Hello"}));

    // the done payload is already buffered but must not be delivered
    session.cancel();
    assert!(session.next_event().await.is_none());
    assert_eq!(session.state(), SessionState::Cancelled);
    assert!(session.next_event().await.is_none());
}

#[tokio::test]
async fn test_cancel_from_other_task_while_waiting() {
    let body = futures::stream::iter(vec![chunk("{\"completed\":1}\n")])
        .chain(futures::stream::pending());
    let mut session =
        ProgressSession::from_stream(Box::pin(body), ProgressFormat, StreamConfig::default());
    let handle = session.cancel_handle();

    assert!(session.next_event().await.unwrap().is_ok());

    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(20)).await;
        handle.cancel();
    });

    let next = tokio::time::timeout(Duration::from_secs(5), session.next_event())
        .await
        .unwrap();
    assert!(next.is_none());
    assert_eq!(session.state(), SessionState::Cancelled);
}

#[tokio::test]
async fn test_cancel_while_connecting() {
    let connect: ConnectFuture = Box::pin(futures::future::pending());
    let mut session = StreamSession::new(connect, ChatFormat, StreamConfig::default());
    let handle = session.cancel_handle();

    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(20)).await;
        handle.cancel();
    });

    let next = tokio::time::timeout(Duration::from_secs(5), session.next_event())
        .await
        .unwrap();
    assert!(next.is_none());
    assert_eq!(session.state(), SessionState::Cancelled);
    assert_eq!(session.metrics().chunks, 0);
}

#[tokio::test]
async fn test_partial_frame_discarded_on_cancel() {
    let body = futures::stream::iter(vec![chunk("{\"completed\":1}\n{\"compl")])
        .chain(futures::stream::pending());
    let mut session =
        ProgressSession::from_stream(Box::pin(body), ProgressFormat, StreamConfig::default());

    assert!(session.next_event().await.unwrap().is_ok());
    session.cancel();
    assert!(session.next_event().await.is_none());
    assert_eq!(session.metrics().events, 1);
}

#[tokio::test]
async fn test_transport_error_mid_stream() {
    let mut session = ChatSession::from_stream(
        stream_of(vec![
            chunk("data: {\"token\":\"a\"}\n\ndata: {\"tok"),
            Err(StreamError::Transport("connection reset".to_string())),
            chunk("data: {\"token\":\"never\"}\n\n"),
        ]),
        ChatFormat,
        StreamConfig::default(),
    );

    let first = session.next_event().await.unwrap().unwrap();
    assert_eq!(first.as_data().unwrap().payload, json!({"token": "a"}));

    let err = session.next_event().await.unwrap().unwrap_err();
    assert!(err.is_transport());
    assert_eq!(session.state(), SessionState::Errored);
    assert!(session.next_event().await.is_none());
}

#[tokio::test]
async fn test_truncated_multibyte_at_end_is_fatal() {
    let euro = "€".as_bytes();
    let mut session = ChatSession::from_stream(
        stream_of(vec![
            chunk("data: {\"token\":\"ok\"}\n\ndata: {\"token\":\""),
            Ok(Bytes::copy_from_slice(&euro[..2])),
        ]),
        ChatFormat,
        StreamConfig::default(),
    );

    assert!(session.next_event().await.unwrap().is_ok());
    let err = session.next_event().await.unwrap().unwrap_err();
    assert!(matches!(err, StreamError::DecodeIntegrity { pending_bytes: 2 }));
    assert_eq!(session.state(), SessionState::Errored);
}

#[tokio::test]
async fn test_empty_body_completes() {
    let mut session =
        ChatSession::from_stream(stream_of(vec![]), ChatFormat, StreamConfig::default());

    assert_eq!(session.next_event().await.unwrap().unwrap(), StreamEvent::Done);
    assert_eq!(session.state(), SessionState::Completed);
    assert_eq!(session.metrics().chunks, 0);
}

#[tokio::test]
async fn test_into_stream_collects_in_order() {
    let session = ChatSession::from_stream(
        stream_of(vec![
            chunk("data: {\"token\":\"1\"}\n\ndata: {\"token\":\"2\"}\n\n"),
            chunk("data: {\"token\":\"3\"}\n\n"),
        ]),
        ChatFormat,
        StreamConfig::default(),
    );

    let events: Vec<StreamEvent> = session
        .into_stream()
        .map(|event| event.unwrap())
        .collect()
        .await;

    let tokens: Vec<&str> = events
        .iter()
        .filter_map(StreamEvent::as_data)
        .map(|event| event.payload["token"].as_str().unwrap())
        .collect();
    assert_eq!(tokens, vec!["1", "2", "3"]);
    assert_eq!(events.last(), Some(&StreamEvent::Done));
}
