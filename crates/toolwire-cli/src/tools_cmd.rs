use toolwire_core::config::RemoteConfig;
use toolwire_mcp::SseDispatcher;

/// Connect to the remote server and print its tool list.
pub async fn run(remote: RemoteConfig) -> anyhow::Result<()> {
    let session = SseDispatcher::new(remote).connect_session().await?;
    let tools = session.list_tools().await?;

    for tool in &tools {
        match &tool.description {
            Some(desc) => println!("{}: {}", tool.name, desc.lines().next().unwrap_or_default()),
            None => println!("{}", tool.name),
        }
    }
    println!("{} tools", tools.len());

    Ok(())
}
