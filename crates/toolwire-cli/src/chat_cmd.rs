use std::io::Write;
use std::path::Path;
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, BufReader};

use toolwire_core::config::LlmConfig;
use toolwire_core::traits::{ChatModel, ToolInvoker};
use toolwire_core::{ChatMessage, Conversation, FunctionTool};
use toolwire_mcp::{StdioClient, ToolDefinition};
use toolwire_remote::ChatClient;

/// Start the local server, then chat until `quit` or end of input.
pub async fn run(script: &Path, llm: LlmConfig, timeout: Duration) -> anyhow::Result<()> {
    let client = StdioClient::spawn(script, timeout).await?;

    let tools: Vec<FunctionTool> = client
        .peer()
        .list_tools()
        .await?
        .iter()
        .map(ToolDefinition::to_function_tool)
        .collect();
    let names: Vec<&str> = tools.iter().map(FunctionTool::name).collect();
    println!("Connected with tools: {names:?}");

    let max_tokens = llm.max_tokens;
    let mut convo = Conversation::new(ChatClient::new(llm), client, tools, max_tokens);
    let result = chat_loop(&mut convo).await;

    convo.into_invoker().shutdown().await?;
    result
}

async fn chat_loop<M: ChatModel, T: ToolInvoker>(
    convo: &mut Conversation<M, T>,
) -> anyhow::Result<()> {
    println!("\nMCP client started!");
    println!("Type your queries or 'quit' to exit.");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("\nQuery: ");
        std::io::stdout().flush()?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        let query = line.trim();
        if query.eq_ignore_ascii_case("quit") {
            break;
        }
        if query.is_empty() {
            continue;
        }

        match convo.process_query(query).await {
            Ok(text) => println!("\n{text}"),
            Err(e) => {
                tracing::warn!(error = %e, "query failed");
                println!("\nError: {e}");
            }
        }
    }

    Ok(())
}

/// One completion without tools.
pub async fn ask(llm: LlmConfig, prompt: &str) -> anyhow::Result<()> {
    let reply = ChatClient::new(llm)
        .chat(&[ChatMessage::user(prompt)], &[], None)
        .await?;
    println!("{}", reply.content.unwrap_or_default());
    Ok(())
}
