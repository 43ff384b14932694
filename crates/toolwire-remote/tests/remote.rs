
use serde_json::json;

use toolwire_core::config::{DatasetConfig, LlmConfig};
use toolwire_core::{ChatMessage, Error, FunctionTool};
use toolwire_remote::{ChatClient, DatasetClient};

use mock_api::{MockApi, TOKEN};

async fn chat_client(api: &MockApi, key: &str) -> ChatClient {
    let addr = mock_api::spawn(api.clone()).await;
    let config = LlmConfig::new(format!("http://{addr}/"), Some(key.to_string()), "test-model")
        .unwrap();
    ChatClient::new(config)
}

async fn dataset_client(api: &MockApi, page_size: usize) -> DatasetClient {
    let addr = mock_api::spawn(api.clone()).await;
    let config = DatasetConfig::new(format!("http://{addr}"), Some(TOKEN.to_string()))
        .unwrap()
        .with_page_size(page_size);
    DatasetClient::new(config)
}

#[tokio::test]
async fn chat_returns_first_choice() {
    let api = MockApi::default();
    let client = chat_client(&api, TOKEN).await;

    let reply = client.chat(&[ChatMessage::user("hello")], &[], None).await.unwrap();
    assert_eq!(reply.content.as_deref(), Some("echo: hello"));

    let sent = &api.chat_requests()[0];
    assert_eq!(sent["model"], "test-model");
    assert!(sent.get("tools").is_none());
    assert!(sent.get("max_tokens").is_none());
}

#[tokio::test]
async fn chat_sends_tools_and_token_cap() {
    let api = MockApi::default();
    let client = chat_client(&api, TOKEN).await;
    let tools = vec![FunctionTool::new("add", "Add numbers", json!({"type": "object"}))];

    let reply = client
        .chat(&[ChatMessage::user("use tool")], &tools, Some(1000))
        .await
        .unwrap();
    assert_eq!(reply.tool_calls.len(), 1);
    assert_eq!(reply.tool_calls[0].function.name, "add");
    assert_eq!(reply.tool_calls[0].function.arguments, r#"{"a": 1}"#);

    let sent = &api.chat_requests()[0];
    assert_eq!(sent["tools"][0]["type"], "function");
    assert_eq!(sent["max_tokens"], 1000);
}

#[tokio::test]
async fn chat_rejected_key_is_http_status() {
    let api = MockApi::default();
    let client = chat_client(&api, "wrong").await;

    let err = client.chat(&[ChatMessage::user("hi")], &[], None).await.unwrap_err();
    assert!(matches!(err, Error::HttpStatus { status: 401, ref body } if body.contains("bad key")));
}

#[tokio::test]
async fn chat_without_choices_is_malformed() {
    let api = MockApi::default();
    let client = chat_client(&api, TOKEN).await;

    let err = client
        .chat(&[ChatMessage::user("no choices")], &[], None)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::MalformedReply(_)));
}

#[tokio::test]
async fn chat_error_body_is_reported() {
    let api = MockApi::default();
    let client = chat_client(&api, TOKEN).await;

    let err = client
        .chat(&[ChatMessage::user("provider error")], &[], None)
        .await
        .unwrap_err();
    assert!(err.to_string().contains("upstream overloaded"));
}

#[tokio::test]
async fn dataset_pages_until_short_page() {
    let api = MockApi::with_items(5);
    let client = dataset_client(&api, 2).await;

    let items = client.items("ds1").await.unwrap();
    assert_eq!(items.len(), 5);
    assert_eq!(items[4]["text"], "item 4");
    assert_eq!(api.pages(), vec![(2, 0), (2, 2), (2, 4)]);
}

#[tokio::test]
async fn dataset_exact_multiple_ends_on_empty_page() {
    let api = MockApi::with_items(4);
    let client = dataset_client(&api, 2).await;

    let items = client.items("ds1").await.unwrap();
    assert_eq!(items.len(), 4);
    assert_eq!(api.pages(), vec![(2, 0), (2, 2), (2, 4)]);
}

#[tokio::test]
async fn empty_dataset_is_empty() {
    let api = MockApi::with_items(0);
    let client = dataset_client(&api, 1000).await;

    assert!(client.items("ds1").await.unwrap().is_empty());
    assert_eq!(api.pages(), vec![(1000, 0)]);
}

#[tokio::test]
async fn non_array_page_is_malformed() {
    let api = MockApi::with_items(1);
    let client = dataset_client(&api, 10).await;

    let err = client.items("broken").await.unwrap_err();
    assert!(matches!(err, Error::MalformedReply(_)));
}

#[tokio::test]
async fn dataset_rejected_token_is_http_status() {
    let api = MockApi::with_items(1);
    let addr = mock_api::spawn(api).await;
    let config = DatasetConfig::new(format!("http://{addr}"), Some("wrong".to_string())).unwrap();

    let err = DatasetClient::new(config).items("ds1").await.unwrap_err();
    assert!(matches!(err, Error::HttpStatus { status: 401, .. }));
}

#[tokio::test]
async fn dataset_id_travels_as_one_path_segment() {
    let api = MockApi::with_items(1);
    let client = dataset_client(&api, 10).await;

    let items = client.items("run/1?x=y").await.unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(api.dataset_ids(), vec!["run/1?x=y"]);
}
