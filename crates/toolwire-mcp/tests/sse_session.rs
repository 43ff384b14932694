use std::time::Duration;

use serde_json::json;

use toolwire_core::config::RemoteConfig;
use toolwire_core::traits::ToolInvoker;
use toolwire_core::Error;
use toolwire_mcp::SseDispatcher;


fn dispatcher(base: String, token: &str) -> SseDispatcher {
    let config = RemoteConfig::new(base, Some(token.to_string()))
        .unwrap()
        .with_reply_timeout(Duration::from_secs(2));
    SseDispatcher::new(config)
}

#[tokio::test]
async fn session_id_from_endpoint_event() {
    let addr = mock_server::spawn().await;
    let session = dispatcher(format!("http://{addr}"), mock_server::TOKEN)
        .connect_session()
        .await
        .unwrap();

    assert_eq!(session.id(), mock_server::SESSION_ID);
    assert!(session
        .message_url()
        .query_pairs()
        .any(|(k, v)| k == "session_id" && v == mock_server::SESSION_ID));
}

#[tokio::test]
async fn call_returns_result_unchanged() {
    let addr = mock_server::spawn().await;
    let session = dispatcher(format!("http://{addr}"), mock_server::TOKEN)
        .connect_session()
        .await
        .unwrap();

    let args = json!({"text": "hello", "nested": {"n": [1, 2]}});
    let result = session.call("echo", args.clone(), 1).await.unwrap();
    assert_eq!(result, args);
}

#[tokio::test]
async fn embedded_error_is_raised() {
    let addr = mock_server::spawn().await;
    let session = dispatcher(format!("http://{addr}"), mock_server::TOKEN)
        .connect_session()
        .await
        .unwrap();

    let err = session.call("fail", json!({}), 2).await.unwrap_err();
    assert!(matches!(err, Error::ToolInvocation(ref m) if m.contains("boom")));
}

#[tokio::test]
async fn unrelated_replies_are_skipped() {
    let addr = mock_server::spawn().await;
    let session = dispatcher(format!("http://{addr}"), mock_server::TOKEN)
        .connect_session()
        .await
        .unwrap();

    let result = session.call("noisy", json!({}), "req-1").await.unwrap();
    assert_eq!(result, json!({"ok": true}));
}

#[tokio::test]
async fn sequential_calls_share_the_stream() {
    let addr = mock_server::spawn().await;
    let session = dispatcher(format!("http://{addr}"), mock_server::TOKEN)
        .connect_session()
        .await
        .unwrap();

    let tools = session.list_tools().await.unwrap();
    assert_eq!(tools[0].name, "echo");

    let first = session.call_tool("echo", json!({"text": "a"})).await.unwrap();
    let second = session.call_tool("echo", json!({"text": "b"})).await.unwrap();
    assert_eq!(first["text"], "a");
    assert_eq!(second["text"], "b");
}

#[tokio::test]
async fn rejected_post_is_http_status() {
    let addr = mock_server::spawn().await;
    let session = dispatcher(format!("http://{addr}"), "wrong-token")
        .connect_session()
        .await
        .unwrap();

    let err = session.call("echo", json!({}), 1).await.unwrap_err();
    assert!(matches!(err, Error::HttpStatus { status: 401, .. }));
}

#[tokio::test]
async fn missing_reply_times_out() {
    let addr = mock_server::spawn().await;
    let config = RemoteConfig::new(format!("http://{addr}"), Some(mock_server::TOKEN.to_string()))
        .unwrap()
        .with_reply_timeout(Duration::from_millis(300));
    let session = SseDispatcher::new(config).connect_session().await.unwrap();

    let err = session.call("silent", json!({}), 5).await.unwrap_err();
    assert!(matches!(err, Error::ReplyTimeout { .. }));
}

#[tokio::test]
async fn stream_without_session_is_no_session() {
    let addr = mock_server::spawn().await;
    let err = dispatcher(format!("http://{addr}/closed"), mock_server::TOKEN)
        .connect_session()
        .await
        .err()
        .unwrap();

    assert!(matches!(err, Error::NoSession(_)));
}

#[tokio::test]
async fn refused_stream_is_http_status() {
    let addr = mock_server::spawn().await;
    let err = dispatcher(format!("http://{addr}/denied"), mock_server::TOKEN)
        .connect_session()
        .await
        .err()
        .unwrap();

    assert!(matches!(err, Error::HttpStatus { status: 401, .. }));
}

#[tokio::test]
async fn stalled_post_is_bounded_by_reply_timeout() {
    let addr = mock_server::spawn().await;
    let config = RemoteConfig::new(
        format!("http://{addr}/stalled"),
        Some(mock_server::TOKEN.to_string()),
    )
    .unwrap()
    .with_reply_timeout(Duration::from_millis(200));
    let session = SseDispatcher::new(config).connect_session().await.unwrap();

    let outcome = tokio::time::timeout(Duration::from_secs(3), session.call("echo", json!({}), 1))
        .await
        .expect("call should give up on its own");
    assert!(matches!(outcome, Err(Error::ReplyTimeout { .. })));
}
