//! proact CLI: a proactive, tool-using agent.

use std::io::{BufRead, Write};
use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use miette::{IntoDiagnostic, Result};
use serde_json::Value;

use proactive_agent::agent::llm::error_sentinel;
use proactive_agent::agent::{
    AuditSink, CapabilityInput, ChatClient, CompletionGateway, MemoryAuditSink, Orchestrator,
    OrchestratorBuilder,
};
use proactive_agent::config::AgentSettings;
use proactive_agent::paths::AgentPaths;

#[derive(Parser)]
#[command(name = "proact", version, about = "Proactive tool-using agent")]
struct Cli {
    /// Config file (default: $XDG_CONFIG_HOME/proactive-agent/config.toml).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Only log warnings and errors.
    #[arg(long, short, global = true)]
    quiet: bool,

    /// Keep the audit log in memory instead of appending to the log file.
    #[arg(long, global = true)]
    no_audit_file: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Handle one instruction and print the outcome.
    Run {
        /// Natural-language instruction.
        instruction: String,
    },

    /// Interactive loop. Type `exit` or `quit` to stop.
    Chat,

    /// Invoke a single capability directly.
    Tool {
        /// Capability name, e.g. `calculator`.
        name: String,

        /// Parameter as key=value. Values parse as JSON when possible.
        #[arg(long = "param", short, value_parser = parse_param)]
        params: Vec<(String, Value)>,
    },

    /// List registered capabilities.
    Tools,

    /// Print the effective configuration as TOML.
    Config,
}

fn parse_param(raw: &str) -> std::result::Result<(String, Value), String> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected key=value, got \"{raw}\""))?;
    let key = key.trim();
    if key.is_empty() {
        return Err(format!("empty parameter name in \"{raw}\""));
    }
    let value = serde_json::from_str(value).unwrap_or_else(|_| Value::String(value.to_string()));
    Ok((key.to_string(), value))
}

fn main() -> Result<()> {
    miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new()
                .terminal_links(true)
                .unicode(true)
                .context_lines(3)
                .build(),
        )
    }))
    .ok(); // Ignore error if hook already set (e.g., in tests)

    let cli = Cli::parse();

    let default_level = if cli.quiet { "warn" } else { "info" };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level)),
        )
        .init();

    let paths = AgentPaths::resolve()?;
    let config_path = cli.config.clone().unwrap_or_else(|| paths.config_file());
    let settings = AgentSettings::load_or_default(&config_path)?;

    match &cli.command {
        Commands::Config => {
            print!("{}", settings.to_toml()?);
        }

        Commands::Tools => {
            // Listing never calls the model, so no credential is needed.
            let offline: Arc<dyn CompletionGateway> =
                Arc::new(|_: &str| error_sentinel("no model configured"));
            let agent = builder(&cli, &settings, &paths, offline).build();
            for (signature, safety) in agent.capabilities() {
                let opt_in = safety
                    .opt_in_flag
                    .as_deref()
                    .map(|flag| format!(" (opt-in: {flag})"))
                    .unwrap_or_default();
                println!(
                    "{:<14} [{}]{} {}",
                    signature.name, safety.level, opt_in, signature.description
                );
            }
        }

        Commands::Run { instruction } => {
            let agent = connect(&cli, &settings, &paths)?;
            print_json(&agent.handle(instruction))?;
        }

        Commands::Chat => {
            let agent = connect(&cli, &settings, &paths)?;
            chat_loop(&agent)?;
        }

        Commands::Tool { name, params } => {
            let agent = connect(&cli, &settings, &paths)?;
            let input: CapabilityInput = params.iter().cloned().collect();
            print_json(&agent.dispatch(name, input))?;
        }
    }

    Ok(())
}

/// Build the orchestrator against the configured model. A missing
/// credential stops the process here.
fn connect(cli: &Cli, settings: &AgentSettings, paths: &AgentPaths) -> Result<Orchestrator> {
    let client = ChatClient::from_env(settings.model.clone())?;
    tracing::info!(model = client.model(), "connected completion gateway");
    paths.ensure_dirs()?;
    Ok(builder(cli, settings, paths, Arc::new(client)).build())
}

fn builder(
    cli: &Cli,
    settings: &AgentSettings,
    paths: &AgentPaths,
    gateway: Arc<dyn CompletionGateway>,
) -> OrchestratorBuilder {
    let builder = OrchestratorBuilder::from_settings(settings, paths, gateway);
    if cli.no_audit_file {
        let sink: Arc<dyn AuditSink> = Arc::new(MemoryAuditSink::new());
        builder.audit(sink)
    } else {
        builder
    }
}

fn chat_loop(agent: &Orchestrator) -> Result<()> {
    let stdin = std::io::stdin();
    let mut stdout = std::io::stdout();
    let mut line = String::new();

    loop {
        print!("You: ");
        stdout.flush().into_diagnostic()?;

        line.clear();
        if stdin.lock().read_line(&mut line).into_diagnostic()? == 0 {
            break;
        }
        let instruction = line.trim();
        if instruction.is_empty() {
            continue;
        }
        if matches!(instruction.to_lowercase().as_str(), "exit" | "quit") {
            break;
        }

        let outcome = agent.handle(instruction);
        let rendered = serde_json::to_string_pretty(&outcome).into_diagnostic()?;
        println!("Agent: {rendered}");
    }

    Ok(())
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    println!(
        "{}",
        serde_json::to_string_pretty(value).into_diagnostic()?
    );
    Ok(())
}
