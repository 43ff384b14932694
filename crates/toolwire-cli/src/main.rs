use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use toolwire_core::config::{DatasetConfig, LlmConfig, RemoteConfig};

mod chat_cmd;
mod scrape_cmd;
mod tools_cmd;

#[derive(Parser)]
#[command(name = "toolwire", about = "Toolwire - MCP tool client for local and remote servers")]
struct Cli {
    /// Remote MCP server base URL
    #[arg(long, env = "MCP_BASE_URL", default_value = "https://actors-mcp-server.apify.actor")]
    mcp_url: String,

    /// Token for the remote MCP server and dataset API
    #[arg(long, env = "APIFY_TOKEN", hide_env_values = true)]
    apify_token: Option<String>,

    /// Dataset API root
    #[arg(long, env = "DATASET_API_URL", default_value = "https://api.apify.com/v2")]
    dataset_url: String,

    /// LLM API URL (OpenAI-compatible)
    #[arg(long, env = "LLM_URL", default_value = "https://openrouter.ai/api/v1")]
    llm_url: String,

    /// LLM API key
    #[arg(long, env = "OPENROUTER_API_KEY", hide_env_values = true)]
    llm_key: Option<String>,

    /// LLM model name
    #[arg(long, env = "LLM_MODEL", default_value = "mistralai/mistral-7b-instruct:free")]
    model: String,

    /// Token cap for the completion that follows a tool call
    #[arg(long, env = "LLM_MAX_TOKENS", default_value_t = 1000)]
    max_tokens: u32,

    /// Seconds to wait for a reply before giving up
    #[arg(long, env = "REPLY_TIMEOUT_SECS", default_value_t = 120)]
    timeout_secs: u64,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Chat with an LLM that can call tools of a local MCP server
    Chat {
        /// Path to the server script (.py or .js)
        server_script: Option<PathBuf>,
    },

    /// Run an actor through the remote MCP server and print its dataset
    Scrape {
        /// Actor to load as a tool and call
        #[arg(long, env = "ACTOR_ID", default_value = "apidojo/twitter-scraper-lite")]
        actor: String,

        /// Actor input as a JSON object
        #[arg(long)]
        input: String,

        /// Ask the LLM to summarize the items with this instruction
        #[arg(long)]
        summarize: Option<String>,
    },

    /// List the tools of a remote MCP session
    Tools {
        /// Extra actors to load into the session
        #[arg(long = "actor")]
        actors: Vec<String>,
    },

    /// Send a single prompt to the LLM and print the answer
    Ask {
        /// Prompt text
        prompt: String,
    },
}

impl Cli {
    fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    fn remote_config(&self, actors: Vec<String>) -> anyhow::Result<RemoteConfig> {
        Ok(RemoteConfig::new(&self.mcp_url, self.apify_token.clone())?
            .with_actors(actors)
            .with_reply_timeout(self.timeout()))
    }

    fn dataset_config(&self) -> anyhow::Result<DatasetConfig> {
        Ok(DatasetConfig::new(&self.dataset_url, self.apify_token.clone())?)
    }

    fn llm_config(&self) -> anyhow::Result<LlmConfig> {
        Ok(
            LlmConfig::new(&self.llm_url, self.llm_key.clone(), &self.model)?
                .with_max_tokens(self.max_tokens),
        )
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match &cli.command {
        Commands::Chat { server_script } => {
            let Some(script) = server_script else {
                eprintln!("Usage: toolwire chat <path_to_server_script>");
                std::process::exit(1);
            };
            chat_cmd::run(script, cli.llm_config()?, cli.timeout()).await?;
        }
        Commands::Scrape {
            actor,
            input,
            summarize,
        } => {
            let input: serde_json::Value = serde_json::from_str(input)?;
            let summary = match summarize {
                Some(instruction) => Some((instruction.clone(), cli.llm_config()?)),
                None => None,
            };
            scrape_cmd::run(
                cli.remote_config(vec![actor.clone()])?,
                cli.dataset_config()?,
                actor,
                input,
                summary,
            )
            .await?;
        }
        Commands::Tools { actors } => {
            tools_cmd::run(cli.remote_config(actors.clone())?).await?;
        }
        Commands::Ask { prompt } => {
            chat_cmd::ask(cli.llm_config()?, prompt).await?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn chat_script_is_optional_for_clap() {
        let cli = Cli::try_parse_from(["toolwire", "chat"]).unwrap();
        assert!(matches!(cli.command, Commands::Chat { server_script: None }));
    }

    #[test]
    fn tools_accepts_repeated_actors() {
        let cli = Cli::try_parse_from(["toolwire", "tools", "--actor", "a/b", "--actor", "c/d"])
            .unwrap();
        let Commands::Tools { actors } = cli.command else {
            panic!("expected tools command");
        };
        assert_eq!(actors, vec!["a/b", "c/d"]);
    }

    #[test]
    fn configs_carry_cli_values() {
        let cli = Cli::try_parse_from([
            "toolwire",
            "--apify-token",
            "tok",
            "--llm-key",
            "key",
            "--timeout-secs",
            "5",
            "ask",
            "hi",
        ])
        .unwrap();

        let remote = cli.remote_config(vec!["x/y".to_string()]).unwrap();
        assert_eq!(remote.token, "tok");
        assert_eq!(remote.actors, vec!["x/y"]);
        assert_eq!(remote.reply_timeout, Duration::from_secs(5));
        assert_eq!(cli.llm_config().unwrap().api_key, "key");
    }
}
