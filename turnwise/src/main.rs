use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};
use turnwise::{TurnwiseConfig, TurnwiseError, classify, in_memory_orchestrator, run_chat};
use turnwise_loop::TurnRequest;
use turnwise_provider_anthropic::Anthropic;

#[derive(Debug, Parser)]
#[command(
    name = "turnwise",
    version,
    about = "Run chat turns against a tool-using agent"
)]
struct Cli {
    /// Config file. Defaults to ./turnwise.json when present.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Emit logs as JSON on stderr.
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run one turn and stream channel events to stdout.
    Chat(ChatArgs),
    /// Print the run configuration a prompt would get.
    Classify(ClassifyArgs),
}

#[derive(Debug, Args)]
struct ChatArgs {
    /// The user utterance.
    #[arg(long)]
    prompt: String,

    /// Agent type.
    #[arg(long, default_value = "general")]
    agent: String,

    /// Continue this conversation.
    #[arg(long)]
    conversation: Option<String>,

    /// User the turn runs for.
    #[arg(long, default_value = "local")]
    user: String,
}

#[derive(Debug, Args)]
struct ClassifyArgs {
    /// The user utterance.
    #[arg(long)]
    prompt: String,

    /// Agent type.
    #[arg(long, default_value = "general")]
    agent: String,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    turnwise::init_tracing(cli.json_logs);
    if let Err(err) = run(cli).await {
        eprintln!("turnwise error: {err}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), TurnwiseError> {
    let config = TurnwiseConfig::load(cli.config.as_deref())?;
    match cli.command {
        Command::Classify(args) => {
            let resolved = classify(&config, &args.agent, &args.prompt)?;
            let json = serde_json::to_string_pretty(&resolved)
                .map_err(|e| TurnwiseError::Output(e.to_string()))?;
            println!("{json}");
            Ok(())
        }
        Command::Chat(args) => {
            let agent = config.agent(&args.agent)?.clone();
            let provider = Anthropic::new(config.api_key()?)
                .base_url(config.provider.base_url.clone())
                .model(config.provider.default_model.clone())
                .connect_timeout(Duration::from_secs(config.provider.connect_timeout_secs));
            let orchestrator = in_memory_orchestrator(provider, &config);
            let request = TurnRequest {
                conversation_id: args.conversation,
                user_id: args.user,
                agent,
                utterance: args.prompt,
            };
            let mut stdout = std::io::stdout().lock();
            let outcome = run_chat(&orchestrator, request, &mut stdout).await?;
            tracing::debug!(
                conversation_id = %outcome.conversation_id,
                round_trips = outcome.round_trips,
                "turnwise.cli.chat_done"
            );
            Ok(())
        }
    }
}
