use anyhow::Context;
use serde_json::Value;

use toolwire_core::config::{DatasetConfig, LlmConfig, RemoteConfig};
use toolwire_core::prompt::{item_line, summary_prompt};
use toolwire_core::ChatMessage;
use toolwire_mcp::SseDispatcher;
use toolwire_remote::{ChatClient, DatasetClient};

/// Run `actor` with `input`, print its dataset and optionally summarize it.
pub async fn run(
    remote: RemoteConfig,
    dataset: DatasetConfig,
    actor: &str,
    input: Value,
    summarize: Option<(String, LlmConfig)>,
) -> anyhow::Result<()> {
    let session = SseDispatcher::new(remote).connect_session().await?;
    tracing::info!(session = session.id(), actor, "session established");

    let run = session.call(actor, input, 1).await?;
    println!("Actor run result: {run}");

    let dataset_id = dataset_id(&run).context("actor run result has no defaultDatasetId")?;
    println!("Dataset ID: {dataset_id}");

    let items = DatasetClient::new(dataset).items(&dataset_id).await?;
    for item in &items {
        println!("{}", item_line(item));
    }

    if let Some((instruction, llm)) = summarize {
        let prompt = summary_prompt(&instruction, &items);
        let reply = ChatClient::new(llm)
            .chat(&[ChatMessage::user(prompt)], &[], None)
            .await?;
        println!("\n{}", reply.content.unwrap_or_default());
    }

    Ok(())
}

/// The run's dataset id, either at the top level of the result or inside
/// a JSON text item of its `content`.
fn dataset_id(run: &Value) -> Option<String> {
    if let Some(id) = run.get("defaultDatasetId").and_then(Value::as_str) {
        return Some(id.to_string());
    }

    run.get("content")?
        .as_array()?
        .iter()
        .filter_map(|item| item.get("text").and_then(Value::as_str))
        .filter_map(|text| serde_json::from_str::<Value>(text).ok())
        .find_map(|parsed| {
            parsed
                .get("defaultDatasetId")
                .and_then(Value::as_str)
                .map(str::to_string)
        })
}
