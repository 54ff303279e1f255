//! Conductor CLI - chat with a manager agent that delegates to worker agents
//!
//! The manager decides per request whether to answer directly or hand the
//! work to the active worker agents, then merges their saved results.

mod repl;

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use console::style;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing_subscriber::EnvFilter;

use conductor_core::config::{ConfigManager, OrchestratorConfig};
use conductor_core::provider::{catalog, get_api_key};
use conductor_core::{
    create_engine_from_config, AgentRegistry, ChannelSink, Manager, ProgressEvent,
    ReasoningEngine,
};

use repl::ChatRepl;

#[derive(Parser)]
#[command(name = "conductor")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Manager agent that delegates research to specialized worker agents", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,

    /// LLM Provider (anthropic, openai, gemini, etc.) - defaults to config setting
    #[arg(short, long)]
    provider: Option<String>,

    /// Model for ordinary turns (defaults to provider's balanced tier)
    #[arg(short, long)]
    model: Option<String>,

    /// Comma-separated agent ids to activate (defaults to config setting)
    #[arg(short, long, value_delimiter = ',')]
    agents: Option<Vec<String>>,

    /// Directory for saved agent results
    #[arg(short, long)]
    output_dir: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Interactive chat mode
    Chat,

    /// Send a single request and exit
    Ask {
        /// The request for the manager
        prompt: String,
    },

    /// List registered agents
    Agents,

    /// Show configuration
    Config,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config_manager = ConfigManager::new()?;

    // Warn by default so logs stay out of the chat prompt; RUST_LOG wins
    let default_filter = if cli.verbose {
        "info,conductor_core=debug".to_string()
    } else {
        config_manager.config().general.log_level.clone()
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .with_writer(std::io::stderr)
        .init();

    let orchestrator = orchestrator_settings(&cli, &config_manager);

    match &cli.command {
        Some(Commands::Agents) => show_agents(&orchestrator),
        Some(Commands::Config) => show_config(&config_manager, &orchestrator),
        Some(Commands::Ask { prompt }) => {
            let Some(session) = start_session(&cli, &config_manager, &orchestrator)? else {
                return Ok(());
            };
            run_ask(session, prompt).await?;
        }
        Some(Commands::Chat) | None => {
            let Some(session) = start_session(&cli, &config_manager, &orchestrator)? else {
                return Ok(());
            };
            run_chat(session, &orchestrator).await?;
        }
    }

    Ok(())
}

/// Config file settings with command-line overrides applied
fn orchestrator_settings(cli: &Cli, config_manager: &ConfigManager) -> OrchestratorConfig {
    let mut settings = config_manager.config().orchestrator.clone();
    if let Some(agents) = &cli.agents {
        settings.active_agents = agents
            .iter()
            .map(|a| a.trim().to_string())
            .filter(|a| !a.is_empty())
            .collect();
    }
    if let Some(dir) = &cli.output_dir {
        settings.output_dir = dir.clone();
    }
    settings
}

/// A live manager plus the task printing its progress events
struct Session {
    manager: Manager,
    printer: JoinHandle<()>,
}

impl Session {
    /// Drop the manager so the event channel closes, then drain the printer
    async fn finish(self) {
        drop(self.manager);
        let _ = self.printer.await;
    }
}

fn start_session(
    cli: &Cli,
    config_manager: &ConfigManager,
    orchestrator: &OrchestratorConfig,
) -> anyhow::Result<Option<Session>> {
    let provider_id = cli
        .provider
        .as_deref()
        .unwrap_or(config_manager.default_provider());

    if catalog::api_key_env(provider_id).is_some()
        && get_api_key(config_manager, provider_id).is_none()
    {
        show_setup_instructions(provider_id);
        return Ok(None);
    }

    let engine: Arc<dyn ReasoningEngine> = Arc::new(create_engine_from_config(
        config_manager,
        Some(provider_id),
        cli.model.as_deref(),
    )?);

    let (sink, events) = ChannelSink::channel(64);
    let printer = spawn_progress_printer(events);
    let manager = Manager::from_config(engine, orchestrator, Arc::new(sink))?;
    tracing::info!(
        provider = %provider_id,
        agents = ?manager.list_active_agents(),
        output_dir = %orchestrator.output_dir.display(),
        "Session started"
    );

    Ok(Some(Session { manager, printer }))
}

fn spawn_progress_printer(mut events: mpsc::Receiver<ProgressEvent>) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            println!(
                "  {} {}",
                style(format!("[{}]", event.agent)).dim(),
                style(&event.message).cyan()
            );
        }
    })
}

async fn run_ask(mut session: Session, prompt: &str) -> anyhow::Result<()> {
    let result = session.manager.generate_response(prompt).await;
    session.finish().await;

    let response = result.inspect_err(|e| tracing::debug!("Request failed: {}", e))?;
    println!("{}: {}", style("Manager").bold().green(), response);
    Ok(())
}

async fn run_chat(session: Session, orchestrator: &OrchestratorConfig) -> anyhow::Result<()> {
    let Session { manager, printer } = session;
    let mut repl = ChatRepl::new(manager, orchestrator.output_dir.clone());
    repl.run().await?;

    drop(repl);
    let _ = printer.await;
    Ok(())
}

fn show_agents(orchestrator: &OrchestratorConfig) {
    println!("{}", style("Registered Agents:").bold());
    println!();

    for agent in AgentRegistry::with_default_agents().descriptors() {
        let status = if orchestrator.active_agents.contains(&agent.id) {
            style("active").green()
        } else {
            style("inactive").dim()
        };
        println!(
            "  {} {} [{}]",
            style("•").cyan(),
            style(&agent.id).bold(),
            status
        );
        println!("    {}", style(&agent.description).dim());
    }
}

fn show_config(config_manager: &ConfigManager, orchestrator: &OrchestratorConfig) {
    let config = config_manager.config();

    println!("{}", style("Configuration:").bold());
    println!();
    println!(
        "  Config file: {}",
        style(config_manager.config_path().display()).dim()
    );
    println!(
        "  Default provider: {}",
        style(&config.default_provider).green()
    );
    if let Some(provider) = config.get_default_provider() {
        println!("  Model: {}", style(&provider.model).green());
    }
    let mut known: Vec<&str> = catalog::ids().collect();
    known.sort_unstable();
    println!("  Known providers: {}", style(known.join(", ")).dim());
    println!(
        "  Active agents: {}",
        style(orchestrator.active_agents.join(", ")).green()
    );
    println!(
        "  Output dir: {}",
        style(orchestrator.output_dir.display()).green()
    );
    println!("  Max turn steps: {}", orchestrator.max_turn_steps);
    println!(
        "  History file: {}",
        style(
            repl::history_path()
                .map(|p| p.display().to_string())
                .unwrap_or_else(|| "N/A".to_string())
        )
        .dim()
    );
}

fn show_setup_instructions(provider_id: &str) {
    let env_var = catalog::api_key_env(provider_id).unwrap_or("API_KEY");

    println!("{}", style("Setup Required").bold().yellow());
    println!("No API key configured for '{}'.", provider_id);
    println!();

    println!("{}", style("Option 1: Environment Variable (Quick)").bold());
    println!("  export {}=\"your-api-key-here\"", style(env_var).cyan());
    println!();

    println!("{}", style("Option 2: Config File (Persistent)").bold());
    let config_path = ConfigManager::default_config_path()
        .map(|p| p.display().to_string())
        .unwrap_or_else(|_| "~/.config/conductor/config.toml".to_string());
    println!("  Edit: {}", style(&config_path).cyan());
    println!();
    println!("  Example config:");
    println!("  {}", style("─".repeat(50)).dim());
    println!(
        r#"  default_provider = "{provider_id}"

  [providers.{provider_id}]
  provider_type = "{provider_id}"
  api_key = "your-api-key-here"

  [orchestrator]
  active_agents = ["wikipedia_agent", "steam_agent", "reddit_agent"]"#
    );
    println!("  {}", style("─".repeat(50)).dim());
    println!();

    println!("{}", style("After configuring, run 'conductor' again to start.").dim());
}
