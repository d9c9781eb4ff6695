//! dashscope-chat: 向通义千问发送一次对话请求的命令行工具
//!
//! Usage:
//!   dashscope-chat [--stream] <prompt...>
//!
//! Configuration is read from the YAML file named by `DASHSCOPE_CONFIG`, or
//! from defaults plus `DASHSCOPE_*` environment variables.

use anyhow::{bail, Context};
use dashscope_ai::chat::{
    ChatClient, DashScopeChatOptions, EmptyContentPolicy, Prompt, StreamingChatClient,
};
use dashscope_ai::config::DashScopeProperties;
use dashscope_ai::tools::ToolRegistry;
use futures::StreamExt;
use std::io::Write;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

fn print_usage() {
    println!(
        r#"dashscope-chat: DashScope 对话命令行工具

USAGE:
    dashscope-chat [--stream] <prompt...>

OPTIONS:
    --stream        Print the answer incrementally as it arrives
    -h, --help      Show this help message
    -V, --version   Show version information

ENVIRONMENT:
    DASHSCOPE_CONFIG            YAML configuration file
    DASHSCOPE_API_KEY           API key
    DASHSCOPE_CHAT_MODEL        Chat model (default qwen-turbo)
    RUST_LOG                    Log filter (default warn)"#
    );
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let mut stream = false;
    let mut words = Vec::new();
    for arg in std::env::args().skip(1) {
        match arg.as_str() {
            "--stream" => stream = true,
            "help" | "--help" | "-h" => {
                print_usage();
                return Ok(());
            }
            "--version" | "-V" => {
                println!("dashscope-chat {}", env!("CARGO_PKG_VERSION"));
                return Ok(());
            }
            _ => words.push(arg),
        }
    }
    if words.is_empty() {
        print_usage();
        std::process::exit(1);
    }

    let mut properties = match std::env::var("DASHSCOPE_CONFIG") {
        Ok(path) => DashScopeProperties::from_yaml_file(&path)
            .with_context(|| format!("loading {path}"))?,
        Err(_) => DashScopeProperties::from_env(),
    };
    if stream {
        // Incremental streams end with an empty closing chunk.
        properties.chat.empty_content = EmptyContentPolicy::Allow;
    }
    let Some(client) = properties.chat_client(Arc::new(ToolRegistry::new()))? else {
        bail!("chat is disabled in the configuration");
    };

    let prompt = Prompt::user(words.join(" "));
    if stream {
        // Each chunk carries only the new text.
        let prompt = prompt
            .with_options(DashScopeChatOptions::builder().incremental_output(true).build());
        let mut chunks = client.stream(&prompt).await?;
        let mut stdout = std::io::stdout();
        while let Some(chunk) = chunks.next().await {
            write!(stdout, "{}", chunk?.text())?;
            stdout.flush()?;
        }
        writeln!(stdout)?;
    } else {
        let response = client.call(&prompt).await?;
        println!("{}", response.text());
    }
    Ok(())
}
